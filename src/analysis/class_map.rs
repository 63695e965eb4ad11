//! Class map construction.
//!
//! Starting from the classes of the target modules, every referenced class
//! is located through the module's imports and processed in turn. A visited
//! set keyed by class name keeps self- and mutually-referential models from
//! recursing forever.

use std::collections::HashSet;
use std::fmt;

use indexmap::{IndexMap, IndexSet};
use log::{debug, trace};
use serde::Serialize;

use super::resolve::{resolve_type, BuiltinTypes, TypeInfo};
use crate::parser::{last_segment, ClassDef, DefaultValue, ParseResult, SourceTree};

/// Base classes that make a class an enumeration.
const ENUM_BASES: &[&str] = &["Enum", "IntEnum", "StrEnum", "Flag", "IntFlag"];

/// Base classes that make a class a validation model.
const MODEL_BASES: &[&str] = &["BaseModel", "RootModel", "BaseSettings", "SQLModel"];

/// How far `from a import X` chains are followed through re-exports.
const MAX_IMPORT_DEPTH: usize = 8;

/// What kind of class a definition is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassKind {
    /// A schema-validation model (`BaseModel` subclass).
    Model,
    /// A `@dataclass` record.
    Dataclass,
    /// An enumeration; its fields are members.
    Enum,
    /// Any other class; fields come from annotations and `__init__`.
    Plain,
}

impl fmt::Display for ClassKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Model => write!(f, "model"),
            Self::Dataclass => write!(f, "dataclass"),
            Self::Enum => write!(f, "enum"),
            Self::Plain => write!(f, "class"),
        }
    }
}

/// A resolved field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldInfo {
    /// The resolved type.
    #[serde(rename = "type")]
    pub type_info: TypeInfo,
    /// The default value, if the field has one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<DefaultValue>,
}

impl FieldInfo {
    /// Creates a new field.
    pub fn new(type_info: TypeInfo, default: Option<DefaultValue>) -> Self {
        Self { type_info, default }
    }

    /// The type display with ` = <default>` appended when a default exists.
    ///
    /// ```rust
    /// use schemaviz::analysis::{FieldInfo, TypeInfo};
    /// use schemaviz::parser::DefaultValue;
    ///
    /// let field = FieldInfo::new(TypeInfo::leaf("str"), Some(DefaultValue::value("\"active\"")));
    /// assert_eq!(field.display(), "str = 'active'");
    /// ```
    pub fn display(&self) -> String {
        match &self.default {
            Some(default) => format!("{} = {}", self.type_info.display, default),
            None => self.type_info.display.clone(),
        }
    }
}

/// Everything known about one class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassInfo {
    /// The class name.
    pub name: String,
    /// The dotted module the class comes from, if known.
    pub module: Option<String>,
    /// Whether the class is defined in one of the target modules.
    pub local: bool,
    /// The class kind, or None for placeholders whose source was not found.
    pub kind: Option<ClassKind>,
    /// Fields (or enum members) in declaration order.
    pub fields: IndexMap<String, FieldInfo>,
}

impl ClassInfo {
    /// Creates a placeholder for a class whose definition is unknown.
    pub fn placeholder(name: impl Into<String>, module: Option<String>) -> Self {
        Self {
            name: name.into(),
            module,
            local: false,
            kind: None,
            fields: IndexMap::new(),
        }
    }

    /// Returns true if this class is an enumeration.
    pub fn is_enum(&self) -> bool {
        self.kind == Some(ClassKind::Enum)
    }

    /// Returns true if the class definition was never found.
    pub fn is_placeholder(&self) -> bool {
        self.kind.is_none()
    }
}

/// All discovered classes keyed by name, in discovery order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ClassMap {
    classes: IndexMap<String, ClassInfo>,
}

impl ClassMap {
    /// Creates an empty class map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a class, replacing any entry with the same name.
    pub fn insert(&mut self, class: ClassInfo) {
        self.classes.insert(class.name.clone(), class);
    }

    /// Looks up a class by name.
    pub fn get(&self, name: &str) -> Option<&ClassInfo> {
        self.classes.get(name)
    }

    /// Returns true if a class with this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    /// Iterates over classes in discovery order.
    pub fn iter(&self) -> impl Iterator<Item = &ClassInfo> {
        self.classes.values()
    }

    /// Returns the number of classes.
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Returns true if no classes were found.
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Distinct modules of all classes, sorted.
    pub fn modules(&self) -> Vec<&str> {
        let mut modules: Vec<&str> = self
            .classes
            .values()
            .filter_map(|c| c.module.as_deref())
            .collect();
        modules.sort_unstable();
        modules.dedup();
        modules
    }
}

/// Builds a [`ClassMap`] by walking from target modules through references.
pub struct ClassMapBuilder<'a> {
    tree: &'a mut SourceTree,
    builtins: &'a BuiltinTypes,
    follow_imports: bool,
    targets: IndexSet<String>,
    visited: HashSet<String>,
    map: ClassMap,
}

impl<'a> ClassMapBuilder<'a> {
    /// Creates a builder over a source tree.
    pub fn new(tree: &'a mut SourceTree, builtins: &'a BuiltinTypes) -> Self {
        Self {
            tree,
            builtins,
            follow_imports: true,
            targets: IndexSet::new(),
            visited: HashSet::new(),
            map: ClassMap::new(),
        }
    }

    /// Whether modules outside the targets may be parsed to resolve
    /// references. When disabled, such references become placeholders.
    pub fn follow_imports(mut self, follow: bool) -> Self {
        self.follow_imports = follow;
        self
    }

    /// Process every class of the target modules and everything they
    /// reference.
    pub fn build(mut self, targets: &[String]) -> ParseResult<ClassMap> {
        for target in targets {
            self.tree.load_target(target)?;
            self.targets.insert(target.clone());
        }

        for target in targets {
            let names: Vec<String> = self
                .tree
                .get(target)
                .map(|m| m.classes.iter().map(|c| c.name.clone()).collect())
                .unwrap_or_default();
            for name in names {
                self.process_class(target, &name);
            }
        }

        debug!(classes = self.map.len(); "Built class map");
        Ok(self.map)
    }

    fn process_class(&mut self, module: &str, class_name: &str) {
        if self.visited.contains(class_name) || self.builtins.contains(class_name) {
            return;
        }
        self.visited.insert(class_name.to_string());

        let Some(class) = self
            .tree
            .get(module)
            .and_then(|m| m.class(class_name))
            .cloned()
        else {
            self.map
                .insert(ClassInfo::placeholder(class_name, Some(module.to_string())));
            return;
        };

        let kind = self.classify(module, &class, &mut HashSet::new());
        debug!(class = class_name, module = module, kind = kind.to_string(); "Processing class");

        // Each field remembers the module it was declared in; inherited
        // dataclass fields resolve their references from the base's module.
        let mut fields = if kind == ClassKind::Dataclass {
            self.dataclass_fields(module, &class, &mut HashSet::new())
        } else {
            collect_fields(&class, kind)
                .into_iter()
                .map(|(name, field)| (name, (module.to_string(), field)))
                .collect()
        };

        // Leaf names are rewritten to the names classes are registered under,
        // so `from m import User as Author` still draws an edge to `User`.
        let mut pending = Vec::new();
        if kind != ClassKind::Enum {
            for (field_name, (origin, field)) in fields.iter_mut() {
                let mut canonical = IndexSet::new();
                for leaf in &field.type_info.types {
                    if self.builtins.contains(leaf) {
                        canonical.insert(leaf.clone());
                        continue;
                    }
                    let target = self.resolve_reference(origin, leaf);
                    let name = target
                        .as_ref()
                        .map(|(_, name)| name.clone())
                        .unwrap_or_else(|| leaf.clone());
                    trace!(field = field_name.as_str(), reference = name.as_str(); "Field reference");
                    canonical.insert(name);
                    pending.push((origin.clone(), leaf.clone(), target));
                }
                field.type_info.types = canonical;
            }
        }

        self.map.insert(ClassInfo {
            name: class_name.to_string(),
            module: Some(module.to_string()),
            local: self.targets.contains(module),
            kind: Some(kind),
            fields: fields
                .into_iter()
                .map(|(name, (_, field))| (name, field))
                .collect(),
        });

        for (origin, leaf, target) in pending {
            match target {
                Some((target_module, target_name)) => {
                    self.process_class(&target_module, &target_name)
                }
                None => self.add_placeholder(&origin, &leaf),
            }
        }
    }

    fn add_placeholder(&mut self, module: &str, name: &str) {
        if self.visited.contains(name) {
            return;
        }
        self.visited.insert(name.to_string());

        let source = self
            .tree
            .get(module)
            .and_then(|m| m.imports.get(name))
            .map(|binding| binding.module.clone());
        debug!(class = name, source = source.clone().unwrap_or_default(); "Unresolved class, adding placeholder");
        self.map.insert(ClassInfo::placeholder(name, source));
    }

    /// Work out the kind of a class, following base classes through the
    /// source tree.
    fn classify(&mut self, module: &str, class: &ClassDef, seen: &mut HashSet<String>) -> ClassKind {
        if class.has_decorator("dataclass") {
            return ClassKind::Dataclass;
        }

        for base in &class.bases {
            let base_name = last_segment(base);
            if ENUM_BASES.contains(&base_name) {
                return ClassKind::Enum;
            }
            if MODEL_BASES.contains(&base_name) {
                return ClassKind::Model;
            }
        }

        for base in &class.bases {
            let base_name = last_segment(base);
            let Some((base_module, resolved)) = self.resolve_reference(module, base_name) else {
                continue;
            };
            if !seen.insert(format!("{}.{}", base_module, resolved)) {
                continue;
            }
            let Some(base_class) = self
                .tree
                .get(&base_module)
                .and_then(|m| m.class(&resolved))
                .cloned()
            else {
                continue;
            };
            match self.classify(&base_module, &base_class, seen) {
                ClassKind::Plain => {}
                kind => return kind,
            }
        }

        ClassKind::Plain
    }

    /// Collect the fields of a dataclass including those of dataclass
    /// bases. Bases are visited in reverse declaration order so the result
    /// follows the method resolution order, and a redeclared field keeps its
    /// first position while taking the subclass's type. An undecorated
    /// subclass contributes no fields of its own.
    fn dataclass_fields(
        &mut self,
        module: &str,
        class: &ClassDef,
        seen: &mut HashSet<String>,
    ) -> IndexMap<String, (String, FieldInfo)> {
        let mut fields = IndexMap::new();

        for base in class.bases.iter().rev() {
            let Some((base_module, resolved)) = self.resolve_reference(module, last_segment(base))
            else {
                continue;
            };
            if !seen.insert(format!("{}.{}", base_module, resolved)) {
                continue;
            }
            let Some(base_class) = self
                .tree
                .get(&base_module)
                .and_then(|m| m.class(&resolved))
                .cloned()
            else {
                continue;
            };
            if self.classify(&base_module, &base_class, &mut HashSet::new()) != ClassKind::Dataclass {
                continue;
            }
            trace!(class = class.name.as_str(), base = resolved.as_str(); "Inheriting dataclass fields");
            fields.extend(self.dataclass_fields(&base_module, &base_class, seen));
        }

        if class.has_decorator("dataclass") {
            for (name, field) in collect_fields(class, ClassKind::Dataclass) {
                fields.insert(name, (module.to_string(), field));
            }
        }

        fields
    }

    /// Find the module and name a reference resolves to.
    fn resolve_reference(&mut self, module: &str, name: &str) -> Option<(String, String)> {
        if let Some(found) = self.lookup(module, name, 0) {
            return Some(found);
        }

        // Names with an import we could not follow stay unresolved rather
        // than matching an unrelated class of the same name.
        let imported = self
            .tree
            .get(module)
            .is_some_and(|m| m.imports.contains_key(name));
        if imported {
            return None;
        }

        self.tree
            .loaded()
            .into_iter()
            .find(|m| m.class(name).is_some())
            .map(|m| (m.name.clone(), name.to_string()))
    }

    fn lookup(&mut self, module: &str, name: &str, depth: usize) -> Option<(String, String)> {
        if depth > MAX_IMPORT_DEPTH {
            return None;
        }

        let (binding, stars, aliases) = {
            let parsed = self.tree.get(module)?;
            if parsed.class(name).is_some() {
                return Some((module.to_string(), name.to_string()));
            }
            (
                parsed.imports.get(name).cloned(),
                parsed.star_imports.clone(),
                parsed.module_aliases.values().cloned().collect::<Vec<_>>(),
            )
        };

        if let Some(binding) = binding {
            if self.ensure_loaded(&binding.module) {
                if let Some(found) = self.lookup(&binding.module, &binding.name, depth + 1) {
                    return Some(found);
                }
            }
            return None;
        }

        for star in stars {
            if self.ensure_loaded(&star) {
                if let Some(found) = self.lookup(&star, name, depth + 1) {
                    return Some(found);
                }
            }
        }

        for alias in aliases {
            if self.ensure_loaded(&alias)
                && self.tree.get(&alias).is_some_and(|m| m.class(name).is_some())
            {
                return Some((alias, name.to_string()));
            }
        }

        None
    }

    fn ensure_loaded(&mut self, module: &str) -> bool {
        if self.follow_imports {
            self.tree.load(module).is_some()
        } else {
            self.tree.get(module).is_some()
        }
    }
}

/// Turn a class definition's raw fields into resolved fields.
fn collect_fields(class: &ClassDef, kind: ClassKind) -> IndexMap<String, FieldInfo> {
    let mut fields = IndexMap::new();

    if kind == ClassKind::Enum {
        for member in class.assignments.iter().filter(|m| !m.starts_with('_')) {
            fields.insert(member.clone(), FieldInfo::new(TypeInfo::empty(), None));
        }
        return fields;
    }

    for raw in &class.annotated {
        let type_info = raw
            .annotation
            .as_ref()
            .map(resolve_type)
            .unwrap_or_default();
        fields.insert(raw.name.clone(), FieldInfo::new(type_info, raw.default.clone()));
    }

    if kind == ClassKind::Plain {
        for raw in &class.init_fields {
            if class.declares(&raw.name) || fields.contains_key(&raw.name) {
                continue;
            }
            let type_info = raw
                .annotation
                .as_ref()
                .map(resolve_type)
                .unwrap_or_default();
            fields.insert(raw.name.clone(), FieldInfo::new(type_info, raw.default.clone()));
        }
    }

    fields
}

/// Build a class map for the given target modules.
pub fn build_class_map(
    tree: &mut SourceTree,
    targets: &[String],
    builtins: &BuiltinTypes,
    follow_imports: bool,
) -> ParseResult<ClassMap> {
    ClassMapBuilder::new(tree, builtins)
        .follow_imports(follow_imports)
        .build(targets)
}
