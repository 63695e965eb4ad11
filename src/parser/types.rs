//! Shared types for Python source discovery.
//!
//! This module defines the syntax-level view of a Python module: the
//! classes it defines, their raw fields and annotations, and the names it
//! imports. Nothing here knows about class kinds or graph edges yet; that is
//! the job of [`crate::analysis`].

use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// A parsed type annotation.
///
/// Annotations are kept close to their source shape so the resolver can
/// decide how to display them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum TypeExpr {
    /// A plain or dotted name: `int`, `User`, `typing.Any`.
    Name(String),
    /// The `None` singleton.
    NoneType,
    /// A subscripted generic: `List[int]`, `Dict[str, User]`.
    Generic { base: String, args: Vec<TypeExpr> },
    /// A PEP 604 union: `str | None`.
    Union(Vec<TypeExpr>),
    /// A string forward reference, e.g. `"User"`, with its raw literal text.
    Forward { raw: String, inner: Box<TypeExpr> },
    /// Numbers, booleans and `...` appearing as type arguments.
    Literal(String),
    /// Anything else, kept as source text.
    Other(String),
}

impl TypeExpr {
    /// Convenience constructor for a name.
    pub fn name(name: impl Into<String>) -> Self {
        TypeExpr::Name(name.into())
    }

    /// Convenience constructor for a subscripted generic.
    pub fn generic(base: impl Into<String>, args: Vec<TypeExpr>) -> Self {
        TypeExpr::Generic {
            base: base.into(),
            args,
        }
    }

    /// Returns the raw source text of the expression, as far as it is known.
    pub fn source_text(&self) -> String {
        match self {
            TypeExpr::Name(name) => name.clone(),
            TypeExpr::NoneType => "None".to_string(),
            TypeExpr::Generic { base, args } => {
                let args: Vec<String> = args.iter().map(|a| a.source_text()).collect();
                format!("{}[{}]", base, args.join(", "))
            }
            TypeExpr::Union(members) => members
                .iter()
                .map(|m| m.source_text())
                .collect::<Vec<_>>()
                .join(" | "),
            TypeExpr::Forward { raw, .. } => raw.clone(),
            TypeExpr::Literal(raw) | TypeExpr::Other(raw) => raw.clone(),
        }
    }
}

/// Returns the last segment of a dotted name (`typing.List` -> `List`).
pub fn last_segment(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}

/// A field's default value as written in the class body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum DefaultValue {
    /// A literal default, holding the expression source text.
    Value(String),
    /// A `default_factory=...` default.
    Factory,
}

impl DefaultValue {
    /// Creates a literal default from expression text.
    pub fn value(text: impl Into<String>) -> Self {
        DefaultValue::Value(text.into())
    }
}

impl fmt::Display for DefaultValue {
    /// Formats the default the way Python's `repr` would show it for
    /// simple literals: strings are single-quoted.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultValue::Factory => write!(f, "<default_factory>"),
            DefaultValue::Value(text) => write!(f, "{}", repr_literal(text)),
        }
    }
}

/// Rewrites a plain double-quoted string literal in single quotes.
fn repr_literal(text: &str) -> String {
    let is_plain_double = text.len() >= 2
        && text.starts_with('"')
        && text.ends_with('"')
        && !text.starts_with("\"\"\"");
    if is_plain_double {
        let inner = &text[1..text.len() - 1];
        if !inner.contains('\'') && !inner.contains('"') {
            return format!("'{}'", inner);
        }
    }
    text.to_string()
}

/// A field as it appears in the source, before type resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawField {
    /// The attribute name.
    pub name: String,
    /// The annotation, if one was written.
    pub annotation: Option<TypeExpr>,
    /// The default value, if one was given.
    pub default: Option<DefaultValue>,
}

impl RawField {
    /// Creates a new field.
    pub fn new(
        name: impl Into<String>,
        annotation: Option<TypeExpr>,
        default: Option<DefaultValue>,
    ) -> Self {
        Self {
            name: name.into(),
            annotation,
            default,
        }
    }
}

/// A top-level class definition.
#[derive(Debug, Clone, Default)]
pub struct ClassDef {
    /// The class name.
    pub name: String,
    /// Line of the `class` keyword (1-indexed).
    pub line: usize,
    /// Base class expressions as written (`BaseModel`, `enum.Enum`).
    pub bases: Vec<String>,
    /// Decorator names without arguments (`dataclass`, `dataclasses.dataclass`).
    pub decorators: Vec<String>,
    /// Annotated class-level attributes, in source order.
    pub annotated: Vec<RawField>,
    /// Targets of plain class-level assignments (`healthy = "healthy"`).
    pub assignments: Vec<String>,
    /// Attributes assigned on `self` inside `__init__`.
    pub init_fields: Vec<RawField>,
}

impl ClassDef {
    /// Creates an empty class definition.
    pub fn new(name: impl Into<String>, line: usize) -> Self {
        Self {
            name: name.into(),
            line,
            ..Self::default()
        }
    }

    /// Returns true if a decorator with the given last segment is present.
    pub fn has_decorator(&self, name: &str) -> bool {
        self.decorators.iter().any(|d| last_segment(d) == name)
    }

    /// Returns true if an annotated class-level field has this name.
    pub fn declares(&self, field: &str) -> bool {
        self.annotated.iter().any(|f| f.name == field)
    }
}

/// Where an imported name comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportBinding {
    /// The absolute dotted source module.
    pub module: String,
    /// The name as defined in the source module.
    pub name: String,
}

impl ImportBinding {
    /// Creates a new binding.
    pub fn new(module: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            name: name.into(),
        }
    }
}

/// A parsed Python module.
#[derive(Debug, Clone, Default)]
pub struct ParsedModule {
    /// Dotted module name (`schemas.comment`).
    pub name: String,
    /// The file the module was read from.
    pub path: PathBuf,
    /// Whether this module is a package `__init__.py`.
    pub is_package: bool,
    /// Top-level classes in source order.
    pub classes: Vec<ClassDef>,
    /// `from m import x as y` bindings, keyed by local name.
    pub imports: IndexMap<String, ImportBinding>,
    /// `import a.b as c` bindings: local alias -> module.
    pub module_aliases: IndexMap<String, String>,
    /// Modules pulled in with `from m import *`.
    pub star_imports: Vec<String>,
}

impl ParsedModule {
    /// Looks up a class defined directly in this module.
    pub fn class(&self, name: &str) -> Option<&ClassDef> {
        self.classes.iter().find(|c| c.name == name)
    }

    /// Returns the number of classes defined in this module.
    pub fn class_count(&self) -> usize {
        self.classes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_segment() {
        assert_eq!(last_segment("typing.List"), "List");
        assert_eq!(last_segment("User"), "User");
        assert_eq!(last_segment("a.b.c"), "c");
    }

    #[test]
    fn test_default_display_quotes_strings() {
        assert_eq!(DefaultValue::value("\"active\"").to_string(), "'active'");
        assert_eq!(DefaultValue::value("'x'").to_string(), "'x'");
        assert_eq!(DefaultValue::value("0").to_string(), "0");
        assert_eq!(
            DefaultValue::value("Health.unknown").to_string(),
            "Health.unknown"
        );
        assert_eq!(DefaultValue::Factory.to_string(), "<default_factory>");
    }

    #[test]
    fn test_default_display_keeps_quotes_inside() {
        assert_eq!(
            DefaultValue::value("\"it's\"").to_string(),
            "\"it's\""
        );
    }

    #[test]
    fn test_source_text() {
        let expr = TypeExpr::generic(
            "Dict",
            vec![
                TypeExpr::name("str"),
                TypeExpr::Union(vec![TypeExpr::name("User"), TypeExpr::NoneType]),
            ],
        );
        assert_eq!(expr.source_text(), "Dict[str, User | None]");
    }

    #[test]
    fn test_class_def_decorators() {
        let mut class = ClassDef::new("Point", 3);
        class.decorators.push("dataclasses.dataclass".to_string());
        assert!(class.has_decorator("dataclass"));
        assert!(!class.has_decorator("total_ordering"));
    }
}
