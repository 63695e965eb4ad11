//! Class discovery using tree-sitter for Python.
//!
//! This module parses Python source into a syntax tree and extracts
//! top-level class definitions, their annotated fields, constructor
//! attributes and the module's imports. Nothing is imported or executed,
//! so partially broken modules still yield whatever classes parse.

use std::fs;
use std::path::Path;

use log::{debug, trace, warn};
use thiserror::Error;
use tree_sitter::{Node, Parser, Tree, TreeCursor};

use super::types::{
    last_segment, ClassDef, DefaultValue, ImportBinding, ParsedModule, RawField, TypeExpr,
};

/// Errors that can occur during source discovery.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Failed to read file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse file: {path}")]
    Syntax { path: String },

    #[error("No Python module, package or directory matches '{0}'")]
    UnknownTarget(String),

    #[error("{path} is outside the source root {root}")]
    OutsideRoot { path: String, root: String },

    #[error("Tree-sitter language initialization failed")]
    LanguageInit,
}

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// Parser for extracting class definitions from Python source files.
pub struct PythonParser {
    parser: Parser,
}

impl PythonParser {
    /// Create a new PythonParser.
    pub fn new() -> ParseResult<Self> {
        Ok(Self {
            parser: python_parser()?,
        })
    }

    /// Parse a single file as the given module.
    pub fn parse_file(&mut self, path: &Path, module: &str) -> ParseResult<ParsedModule> {
        let content = fs::read_to_string(path)?;
        self.parse_source(&content, module, path)
    }

    /// Parse source code directly.
    pub fn parse_source(
        &mut self,
        source: &str,
        module: &str,
        path: &Path,
    ) -> ParseResult<ParsedModule> {
        let tree = self
            .parser
            .parse(source, None)
            .ok_or_else(|| ParseError::Syntax {
                path: path.display().to_string(),
            })?;

        if tree.root_node().has_error() {
            warn!(path = path.display().to_string(); "Source has syntax errors, extracting what parses");
        }

        let is_package = path
            .file_stem()
            .is_some_and(|stem| stem == "__init__");

        let mut parsed = ParsedModule {
            name: module.to_string(),
            path: path.to_path_buf(),
            is_package,
            ..ParsedModule::default()
        };

        self.extract_module(&tree, source, &mut parsed);
        debug!(
            module = module,
            classes = parsed.class_count(),
            imports = parsed.imports.len();
            "Parsed module"
        );
        Ok(parsed)
    }

    /// Extract classes and imports from a parsed tree.
    fn extract_module(&self, tree: &Tree, source: &str, module: &mut ParsedModule) {
        let root = tree.root_node();
        let mut cursor = root.walk();

        for child in root.named_children(&mut cursor) {
            match child.kind() {
                "class_definition" => {
                    if let Some(class) = parse_class(&child, &[], source) {
                        module.classes.push(class);
                    }
                }
                "decorated_definition" => {
                    if let Some(class) = parse_decorated_class(&child, source) {
                        module.classes.push(class);
                    }
                }
                _ => {}
            }
        }

        let mut cursor = root.walk();
        visit_imports(&mut cursor, source, module);
    }
}

impl Default for PythonParser {
    fn default() -> Self {
        Self::new().expect("Failed to initialize PythonParser")
    }
}

fn python_parser() -> ParseResult<Parser> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_python::LANGUAGE.into())
        .map_err(|_| ParseError::LanguageInit)?;
    Ok(parser)
}

/// Parse a standalone annotation such as the body of a string forward
/// reference. Text that is not a single expression is kept verbatim.
pub fn parse_annotation(text: &str) -> TypeExpr {
    let fallback = || TypeExpr::Other(text.trim().to_string());

    let Ok(mut parser) = python_parser() else {
        return fallback();
    };
    let Some(tree) = parser.parse(text.trim(), None) else {
        return fallback();
    };
    let root = tree.root_node();
    if root.has_error() || root.named_child_count() != 1 {
        return fallback();
    }

    let source = text.trim();
    root.named_child(0)
        .filter(|stmt| stmt.kind() == "expression_statement" && stmt.named_child_count() == 1)
        .and_then(|stmt| stmt.named_child(0))
        .map(|expr| type_expr(&expr, source))
        .unwrap_or_else(fallback)
}

/// Resolve a relative import (`from ..models import User`) to an absolute
/// module name. `level` is the number of leading dots.
pub fn resolve_relative(
    module: &str,
    is_package: bool,
    level: usize,
    name: Option<&str>,
) -> Option<String> {
    let mut parts: Vec<&str> = if module.is_empty() {
        Vec::new()
    } else {
        module.split('.').collect()
    };
    if !is_package {
        parts.pop();
    }
    for _ in 1..level {
        parts.pop()?;
    }

    let mut resolved = parts.join(".");
    if let Some(name) = name.filter(|n| !n.is_empty()) {
        if !resolved.is_empty() {
            resolved.push('.');
        }
        resolved.push_str(name);
    }

    if resolved.is_empty() {
        None
    } else {
        Some(resolved)
    }
}

/// Extract the text content of a node.
fn node_text<'a>(node: &Node, source: &'a str) -> &'a str {
    source.get(node.start_byte()..node.end_byte()).unwrap_or("")
}

fn parse_decorated_class(node: &Node, source: &str) -> Option<ClassDef> {
    let definition = node.child_by_field_name("definition")?;
    if definition.kind() != "class_definition" {
        return None;
    }

    let mut decorators = Vec::new();
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        if child.kind() == "decorator" {
            if let Some(expr) = child.named_child(0) {
                // `@dataclass(frozen=True)` is recorded as `dataclass`
                let target = if expr.kind() == "call" {
                    expr.child_by_field_name("function").unwrap_or(expr)
                } else {
                    expr
                };
                decorators.push(node_text(&target, source).to_string());
            }
        }
    }

    parse_class(&definition, &decorators, source)
}

fn parse_class(node: &Node, decorators: &[String], source: &str) -> Option<ClassDef> {
    let name = node_text(&node.child_by_field_name("name")?, source);
    let mut class = ClassDef::new(name, node.start_position().row + 1);
    class.decorators = decorators.to_vec();

    if let Some(superclasses) = node.child_by_field_name("superclasses") {
        let mut cursor = superclasses.walk();
        for base in superclasses.named_children(&mut cursor) {
            match base.kind() {
                "identifier" | "attribute" => class.bases.push(node_text(&base, source).to_string()),
                // `Generic[T]`, `BaseModel[T]`
                "subscript" => {
                    if let Some(value) = base.child_by_field_name("value") {
                        class.bases.push(node_text(&value, source).to_string());
                    }
                }
                _ => {}
            }
        }
    }

    if let Some(body) = node.child_by_field_name("body") {
        let mut cursor = body.walk();
        for stmt in body.named_children(&mut cursor) {
            match stmt.kind() {
                "expression_statement" => parse_class_statement(&stmt, source, &mut class),
                "function_definition" => parse_method(&stmt, source, &mut class),
                "decorated_definition" => {
                    if let Some(def) = stmt.child_by_field_name("definition") {
                        if def.kind() == "function_definition" {
                            parse_method(&def, source, &mut class);
                        }
                    }
                }
                _ => {}
            }
        }
    }

    trace!(
        class = class.name.as_str(),
        fields = class.annotated.len(),
        assignments = class.assignments.len();
        "Extracted class"
    );
    Some(class)
}

/// Handle `name: T`, `name: T = v` and `name = v` in a class body.
fn parse_class_statement(stmt: &Node, source: &str, class: &mut ClassDef) {
    let Some(assignment) = stmt.named_child(0).filter(|n| n.kind() == "assignment") else {
        return;
    };
    let Some(left) = assignment.child_by_field_name("left") else {
        return;
    };
    if left.kind() != "identifier" {
        return;
    }
    let name = node_text(&left, source);

    match assignment.child_by_field_name("type") {
        Some(annotation) => {
            let annotation = type_expr(&annotation, source);
            if is_class_var(&annotation) {
                return;
            }
            let default = assignment
                .child_by_field_name("right")
                .and_then(|right| extract_default(&right, source));
            class
                .annotated
                .push(RawField::new(name, Some(annotation), default));
        }
        None => class.assignments.push(name.to_string()),
    }
}

fn is_class_var(expr: &TypeExpr) -> bool {
    match expr {
        TypeExpr::Name(name) => last_segment(name) == "ClassVar",
        TypeExpr::Generic { base, .. } => last_segment(base) == "ClassVar",
        _ => false,
    }
}

/// Collect `self.x` attributes from `__init__`.
fn parse_method(def: &Node, source: &str, class: &mut ClassDef) {
    let is_init = def
        .child_by_field_name("name")
        .is_some_and(|name| node_text(&name, source) == "__init__");
    if !is_init {
        return;
    }

    let params = def
        .child_by_field_name("parameters")
        .map(|p| typed_parameters(&p, source))
        .unwrap_or_default();

    if let Some(body) = def.child_by_field_name("body") {
        let mut cursor = body.walk();
        collect_self_assignments(&mut cursor, source, &params, &mut class.init_fields);
    }
}

/// Map parameter name -> annotation for annotated `__init__` parameters.
fn typed_parameters(params: &Node, source: &str) -> Vec<(String, TypeExpr)> {
    let mut typed = Vec::new();
    let mut cursor = params.walk();
    for param in params.named_children(&mut cursor) {
        let (name, annotation) = match param.kind() {
            "typed_parameter" => (param.named_child(0), param.child_by_field_name("type")),
            "typed_default_parameter" => (
                param.child_by_field_name("name"),
                param.child_by_field_name("type"),
            ),
            _ => continue,
        };
        if let (Some(name), Some(annotation)) = (name, annotation) {
            if name.kind() == "identifier" {
                typed.push((
                    node_text(&name, source).to_string(),
                    type_expr(&annotation, source),
                ));
            }
        }
    }
    typed
}

fn collect_self_assignments(
    cursor: &mut TreeCursor,
    source: &str,
    params: &[(String, TypeExpr)],
    fields: &mut Vec<RawField>,
) {
    let node = cursor.node();

    match node.kind() {
        // Nested scopes have their own `self`
        "function_definition" | "class_definition" | "lambda" => return,
        "assignment" => {
            if let Some(field) = self_assignment(&node, source, params) {
                if !fields.iter().any(|f| f.name == field.name) {
                    fields.push(field);
                }
            }
        }
        _ => {}
    }

    if cursor.goto_first_child() {
        loop {
            collect_self_assignments(cursor, source, params, fields);
            if !cursor.goto_next_sibling() {
                break;
            }
        }
        cursor.goto_parent();
    }
}

fn self_assignment(node: &Node, source: &str, params: &[(String, TypeExpr)]) -> Option<RawField> {
    let left = node.child_by_field_name("left")?;
    if left.kind() != "attribute" {
        return None;
    }
    let object = left.child_by_field_name("object")?;
    if node_text(&object, source) != "self" {
        return None;
    }
    let name = node_text(&left.child_by_field_name("attribute")?, source);

    let right = node.child_by_field_name("right");
    let annotation = match node.child_by_field_name("type") {
        Some(annotation) => Some(type_expr(&annotation, source)),
        None => right
            .filter(|r| r.kind() == "identifier")
            .and_then(|r| {
                let param = node_text(&r, source);
                params
                    .iter()
                    .find(|(name, _)| name == param)
                    .map(|(_, ty)| ty.clone())
            }),
    };

    Some(RawField::new(name, annotation, None))
}

/// Work out the default of a field from the right-hand side of its
/// assignment, looking through `Field(...)` and `field(...)` calls.
fn extract_default(right: &Node, source: &str) -> Option<DefaultValue> {
    if right.kind() != "call" {
        return Some(DefaultValue::value(node_text(right, source)));
    }

    let is_field_call = right
        .child_by_field_name("function")
        .is_some_and(|f| matches!(last_segment(node_text(&f, source)), "Field" | "field"));
    if !is_field_call {
        return Some(DefaultValue::value(node_text(right, source)));
    }

    let args = right.child_by_field_name("arguments")?;
    let mut positional = None;
    let mut cursor = args.walk();
    for arg in args.named_children(&mut cursor) {
        match arg.kind() {
            "keyword_argument" => {
                let key = arg
                    .child_by_field_name("name")
                    .map(|n| node_text(&n, source))
                    .unwrap_or("");
                match key {
                    "default_factory" => return Some(DefaultValue::Factory),
                    "default" => {
                        let value = arg.child_by_field_name("value")?;
                        if value.kind() == "ellipsis" {
                            return None;
                        }
                        return Some(DefaultValue::value(node_text(&value, source)));
                    }
                    _ => {}
                }
            }
            "comment" => {}
            _ => {
                if positional.is_none() {
                    positional = Some(arg);
                }
            }
        }
    }

    positional
        .filter(|p| p.kind() != "ellipsis")
        .map(|p| DefaultValue::value(node_text(&p, source)))
}

/// Convert an annotation node into a [`TypeExpr`].
fn type_expr(node: &Node, source: &str) -> TypeExpr {
    let text = || node_text(node, source).to_string();

    match node.kind() {
        "type" | "parenthesized_expression" => {
            if node.named_child_count() == 1 {
                node.named_child(0)
                    .map(|inner| type_expr(&inner, source))
                    .unwrap_or_else(|| TypeExpr::Other(text()))
            } else {
                TypeExpr::Other(text())
            }
        }
        "identifier" | "attribute" | "member_type" => TypeExpr::Name(text()),
        "none" => TypeExpr::NoneType,
        "subscript" => {
            let Some(value) = node.child_by_field_name("value") else {
                return TypeExpr::Other(text());
            };
            if !matches!(value.kind(), "identifier" | "attribute") {
                return TypeExpr::Other(text());
            }
            let mut cursor = node.walk();
            let args = node
                .children_by_field_name("subscript", &mut cursor)
                .map(|arg| type_expr(&arg, source))
                .collect();
            TypeExpr::generic(node_text(&value, source), args)
        }
        "generic_type" => {
            let mut base = None;
            let mut args = Vec::new();
            let mut cursor = node.walk();
            for child in node.named_children(&mut cursor) {
                match child.kind() {
                    "identifier" | "attribute" => base = Some(node_text(&child, source)),
                    "type_parameter" => {
                        let mut inner = child.walk();
                        args.extend(
                            child
                                .named_children(&mut inner)
                                .map(|arg| type_expr(&arg, source)),
                        );
                    }
                    _ => {}
                }
            }
            match base {
                Some(base) => TypeExpr::generic(base, args),
                None => TypeExpr::Other(text()),
            }
        }
        "union_type" => {
            let mut cursor = node.walk();
            let members = node
                .named_children(&mut cursor)
                .map(|member| type_expr(&member, source))
                .collect();
            flatten_union(members)
        }
        "binary_operator" => {
            let is_union = node
                .child_by_field_name("operator")
                .is_some_and(|op| op.kind() == "|");
            match (
                is_union,
                node.child_by_field_name("left"),
                node.child_by_field_name("right"),
            ) {
                (true, Some(left), Some(right)) => {
                    flatten_union(vec![type_expr(&left, source), type_expr(&right, source)])
                }
                _ => TypeExpr::Other(text()),
            }
        }
        "string" => {
            let raw = text();
            match string_content(node, source) {
                Some(content) => TypeExpr::Forward {
                    inner: Box::new(parse_annotation(content)),
                    raw,
                },
                None => TypeExpr::Other(raw),
            }
        }
        "integer" | "float" | "true" | "false" | "ellipsis" | "unary_operator" => {
            TypeExpr::Literal(text())
        }
        _ => TypeExpr::Other(text()),
    }
}

fn flatten_union(members: Vec<TypeExpr>) -> TypeExpr {
    let mut flat = Vec::with_capacity(members.len());
    for member in members {
        match member {
            TypeExpr::Union(inner) => flat.extend(inner),
            other => flat.push(other),
        }
    }
    TypeExpr::Union(flat)
}

/// Returns the body of a plain string literal, or None for f-strings and
/// byte strings.
fn string_content<'a>(node: &Node, source: &'a str) -> Option<&'a str> {
    let mut content = "";
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        match child.kind() {
            "string_start" => {
                let prefix = node_text(&child, source).to_ascii_lowercase();
                if prefix.contains('f') || prefix.contains('b') {
                    return None;
                }
            }
            "string_content" => content = node_text(&child, source),
            "interpolation" => return None,
            _ => {}
        }
    }
    Some(content)
}

/// Recursively visit module-level nodes to find imports. Function and class
/// bodies are skipped.
fn visit_imports(cursor: &mut TreeCursor, source: &str, module: &mut ParsedModule) {
    let node = cursor.node();

    match node.kind() {
        "function_definition" | "class_definition" => return,
        "import_from_statement" => {
            parse_import_from(&node, source, module);
            return;
        }
        "import_statement" => {
            parse_import(&node, source, module);
            return;
        }
        _ => {}
    }

    if cursor.goto_first_child() {
        loop {
            visit_imports(cursor, source, module);
            if !cursor.goto_next_sibling() {
                break;
            }
        }
        cursor.goto_parent();
    }
}

/// Parse `from m import a, b as c` and `from m import *`.
fn parse_import_from(node: &Node, source: &str, module: &mut ParsedModule) {
    let Some(module_node) = node.child_by_field_name("module_name") else {
        return;
    };

    let source_module = match module_node.kind() {
        "relative_import" => {
            let mut level = 0;
            let mut name = None;
            let mut cursor = module_node.walk();
            for child in module_node.named_children(&mut cursor) {
                match child.kind() {
                    "import_prefix" => level = node_text(&child, source).matches('.').count(),
                    "dotted_name" => name = Some(node_text(&child, source)),
                    _ => {}
                }
            }
            resolve_relative(&module.name, module.is_package, level, name)
        }
        _ => Some(node_text(&module_node, source).to_string()),
    };
    let Some(source_module) = source_module else {
        warn!(module = module.name.as_str(); "Relative import escapes the source root");
        return;
    };

    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        if child.kind() == "wildcard_import" {
            module.star_imports.push(source_module.clone());
            return;
        }
    }

    let mut cursor = node.walk();
    for name in node.children_by_field_name("name", &mut cursor) {
        let (original, local) = match name.kind() {
            "aliased_import" => {
                let original = name
                    .child_by_field_name("name")
                    .map(|n| node_text(&n, source));
                let alias = name
                    .child_by_field_name("alias")
                    .map(|n| node_text(&n, source));
                match (original, alias) {
                    (Some(original), Some(alias)) => (original, alias),
                    _ => continue,
                }
            }
            _ => {
                let text = node_text(&name, source);
                (text, text)
            }
        };
        module.imports.insert(
            local.to_string(),
            ImportBinding::new(source_module.clone(), original),
        );
    }
}

/// Parse `import a.b` and `import a.b as c`.
fn parse_import(node: &Node, source: &str, module: &mut ParsedModule) {
    let mut cursor = node.walk();
    for name in node.children_by_field_name("name", &mut cursor) {
        match name.kind() {
            "aliased_import" => {
                let target = name.child_by_field_name("name");
                let alias = name.child_by_field_name("alias");
                if let (Some(target), Some(alias)) = (target, alias) {
                    module.module_aliases.insert(
                        node_text(&alias, source).to_string(),
                        node_text(&target, source).to_string(),
                    );
                }
            }
            _ => {
                let dotted = node_text(&name, source);
                module
                    .module_aliases
                    .insert(dotted.to_string(), dotted.to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> ParsedModule {
        parse_as(source, "schemas.user", "schemas/user.py")
    }

    fn parse_as(source: &str, module: &str, path: &str) -> ParsedModule {
        let mut parser = PythonParser::new().unwrap();
        parser
            .parse_source(source, module, Path::new(path))
            .unwrap()
    }

    // ===== Class Discovery Tests =====

    #[test]
    fn test_pydantic_model_fields() {
        let source = r#"
from pydantic import BaseModel

class Address(BaseModel):
    """Address schema."""

    street: str
    city: str
    zipcode: str = "00000"
"#;
        let module = parse(source);

        assert_eq!(module.classes.len(), 1);
        let class = &module.classes[0];
        assert_eq!(class.name, "Address");
        assert_eq!(class.line, 4);
        assert_eq!(class.bases, vec!["BaseModel"]);
        assert_eq!(class.annotated.len(), 3);
        assert_eq!(class.annotated[0].name, "street");
        assert_eq!(class.annotated[0].annotation, Some(TypeExpr::name("str")));
        assert_eq!(class.annotated[0].default, None);
        assert_eq!(
            class.annotated[2].default,
            Some(DefaultValue::value("\"00000\""))
        );
    }

    #[test]
    fn test_enum_assignments() {
        let source = r#"
from enum import StrEnum

class Health(StrEnum):
    healthy = "healthy"
    unhealthy = "unhealthy"
    unknown = "unknown"
"#;
        let module = parse(source);
        let class = &module.classes[0];

        assert_eq!(class.bases, vec!["StrEnum"]);
        assert_eq!(class.assignments, vec!["healthy", "unhealthy", "unknown"]);
        assert!(class.annotated.is_empty());
    }

    #[test]
    fn test_dataclass_decorator() {
        let source = r#"
import dataclasses
from dataclasses import dataclass, field

@dataclass(frozen=True)
class Point:
    x: int
    y: int = 0
    tags: list[str] = field(default_factory=list)

@dataclasses.dataclass
class Line:
    start: Point
    end: Point
"#;
        let module = parse(source);

        assert_eq!(module.classes.len(), 2);
        assert!(module.classes[0].has_decorator("dataclass"));
        assert!(module.classes[1].has_decorator("dataclass"));
        assert_eq!(
            module.classes[0].annotated[2].default,
            Some(DefaultValue::Factory)
        );
    }

    #[test]
    fn test_nested_classes_ignored() {
        let source = r#"
class Outer:
    value: int

    class Config:
        frozen = True
"#;
        let module = parse(source);
        assert_eq!(module.classes.len(), 1);
        assert!(module.classes[0].assignments.is_empty());
    }

    #[test]
    fn test_class_var_skipped() {
        let source = r#"
from typing import ClassVar

class Settings:
    registry: ClassVar[dict] = {}
    name: str
"#;
        let module = parse(source);
        let names: Vec<_> = module.classes[0]
            .annotated
            .iter()
            .map(|f| f.name.as_str())
            .collect();
        assert_eq!(names, vec!["name"]);
    }

    #[test]
    fn test_init_attributes() {
        let source = r#"
class Session:
    def __init__(self, user: User, token: str, retries=3):
        self.user = user
        self.token: Optional[str] = token
        self.retries = retries
        if token:
            self.active = True
        def inner(self):
            self.hidden = 1
"#;
        let module = parse(source);
        let fields = &module.classes[0].init_fields;

        let names: Vec<_> = fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["user", "token", "retries", "active"]);
        assert_eq!(fields[0].annotation, Some(TypeExpr::name("User")));
        assert!(matches!(
            &fields[1].annotation,
            Some(TypeExpr::Generic { base, .. }) if base == "Optional"
        ));
        assert_eq!(fields[2].annotation, None);
    }

    // ===== Default Value Tests =====

    #[test]
    fn test_field_call_defaults() {
        let source = r#"
class Item(BaseModel):
    a: int = Field(default=5)
    b: int = Field(...)
    c: list = Field(default_factory=list)
    d: str = Field("x", description="d")
    e: int = Field(description="no default")
    f: Status = Status.ACTIVE
"#;
        let module = parse(source);
        let defaults: Vec<_> = module.classes[0]
            .annotated
            .iter()
            .map(|f| f.default.clone())
            .collect();

        assert_eq!(
            defaults,
            vec![
                Some(DefaultValue::value("5")),
                None,
                Some(DefaultValue::Factory),
                Some(DefaultValue::value("\"x\"")),
                None,
                Some(DefaultValue::value("Status.ACTIVE")),
            ]
        );
    }

    // ===== Annotation Tests =====

    #[test]
    fn test_optional_and_union_annotations() {
        let source = r#"
class Post(BaseModel):
    title: Optional[str]
    content: Union[str, None]
    author: User | None
    tags: List[str]
    meta: Dict[str, "User"]
"#;
        let module = parse(source);
        let fields = &module.classes[0].annotated;

        assert_eq!(
            fields[0].annotation,
            Some(TypeExpr::generic("Optional", vec![TypeExpr::name("str")]))
        );
        assert_eq!(
            fields[1].annotation,
            Some(TypeExpr::generic(
                "Union",
                vec![TypeExpr::name("str"), TypeExpr::NoneType]
            ))
        );
        assert_eq!(
            fields[2].annotation,
            Some(TypeExpr::Union(vec![TypeExpr::name("User"), TypeExpr::NoneType]))
        );
        assert_eq!(
            fields[3].annotation,
            Some(TypeExpr::generic("List", vec![TypeExpr::name("str")]))
        );
        match &fields[4].annotation {
            Some(TypeExpr::Generic { base, args }) => {
                assert_eq!(base, "Dict");
                assert!(matches!(
                    &args[1],
                    TypeExpr::Forward { inner, .. } if **inner == TypeExpr::name("User")
                ));
            }
            other => panic!("unexpected annotation: {:?}", other),
        }
    }

    #[test]
    fn test_parse_annotation() {
        assert_eq!(parse_annotation("User"), TypeExpr::name("User"));
        assert_eq!(
            parse_annotation("typing.List[models.User]"),
            TypeExpr::generic("typing.List", vec![TypeExpr::name("models.User")])
        );
        assert_eq!(
            parse_annotation("Tuple[int, ...]"),
            TypeExpr::generic(
                "Tuple",
                vec![TypeExpr::name("int"), TypeExpr::Literal("...".to_string())]
            )
        );
    }

    #[test]
    fn test_parse_annotation_rejects_statements() {
        assert!(matches!(parse_annotation("x = 1"), TypeExpr::Other(_)));
    }

    // ===== Import Tests =====

    #[test]
    fn test_from_imports() {
        let source = r#"
from schemas.post import Post
from schemas.user import User as Author
from typing import *
import datetime
import schemas.tags as tags
"#;
        let module = parse_as(source, "schemas.comment", "schemas/comment.py");

        assert_eq!(
            module.imports.get("Post"),
            Some(&ImportBinding::new("schemas.post", "Post"))
        );
        assert_eq!(
            module.imports.get("Author"),
            Some(&ImportBinding::new("schemas.user", "User"))
        );
        assert_eq!(module.star_imports, vec!["typing"]);
        assert_eq!(module.module_aliases.get("datetime").map(String::as_str), Some("datetime"));
        assert_eq!(module.module_aliases.get("tags").map(String::as_str), Some("schemas.tags"));
    }

    #[test]
    fn test_relative_imports() {
        let source = r#"
from .user import User
from .. import shared
from . import Post
"#;
        let module = parse_as(source, "app.schemas.comment", "app/schemas/comment.py");

        assert_eq!(
            module.imports.get("User"),
            Some(&ImportBinding::new("app.schemas.user", "User"))
        );
        assert_eq!(
            module.imports.get("shared"),
            Some(&ImportBinding::new("app", "shared"))
        );
        assert_eq!(
            module.imports.get("Post"),
            Some(&ImportBinding::new("app.schemas", "Post"))
        );
    }

    #[test]
    fn test_imports_inside_functions_ignored() {
        let source = r#"
def load():
    from heavy import Thing

try:
    from fast import Speedy
except ImportError:
    Speedy = None
"#;
        let module = parse(source);
        assert!(!module.imports.contains_key("Thing"));
        assert!(module.imports.contains_key("Speedy"));
    }

    #[test]
    fn test_resolve_relative() {
        assert_eq!(
            resolve_relative("a.b.c", false, 1, Some("d")),
            Some("a.b.d".to_string())
        );
        assert_eq!(
            resolve_relative("a.b", true, 1, Some("d")),
            Some("a.b.d".to_string())
        );
        assert_eq!(
            resolve_relative("a.b.c", false, 2, None),
            Some("a".to_string())
        );
        assert_eq!(resolve_relative("a", false, 2, Some("x")), None);
    }

    #[test]
    fn test_package_init_detected() {
        let module = parse_as("class A: pass", "schemas", "schemas/__init__.py");
        assert!(module.is_package);
        assert_eq!(module.classes[0].name, "A");
    }

    #[test]
    fn test_broken_source_still_yields_classes() {
        let source = r#"
class Good(BaseModel):
    name: str

def broken(:
    pass
"#;
        let module = parse(source);
        assert!(module.class("Good").is_some());
    }
}
