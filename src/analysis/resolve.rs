//! Type-display resolution.
//!
//! Turns a parsed annotation into the string shown in the diagram and the
//! set of leaf class names it references. Leaf names are what graph edges
//! are drawn to.

use std::collections::HashSet;

use indexmap::IndexSet;
use serde::Serialize;

use crate::parser::{last_segment, TypeExpr};

/// Names that never become nodes or edges.
const DEFAULT_BUILTINS: &[&str] = &[
    // primitives and builtins
    "int",
    "str",
    "float",
    "bool",
    "complex",
    "bytes",
    "bytearray",
    "memoryview",
    "list",
    "dict",
    "set",
    "frozenset",
    "tuple",
    "object",
    "type",
    "property",
    "staticmethod",
    "classmethod",
    "function",
    "None",
    "NoneType",
    // typing constructs
    "Any",
    "Optional",
    "Union",
    "Callable",
    "Type",
    "Iterable",
    "Iterator",
    "Sequence",
    "MutableSequence",
    "Mapping",
    "MutableMapping",
    "Collection",
    "AbstractSet",
    "ByteString",
    "Text",
    "Complex",
    "Number",
    "List",
    "Dict",
    "Set",
    "FrozenSet",
    "Tuple",
    "Literal",
    "Annotated",
    "ClassVar",
    "Final",
    "Required",
    "NotRequired",
    "Generator",
    "AsyncIterator",
    "AsyncIterable",
    "Awaitable",
    "Coroutine",
    "TypeVar",
    "Generic",
    "Protocol",
    "Self",
    "Never",
    "NoReturn",
    // interpreter built-in modules
    "builtins",
    "sys",
    "time",
    "math",
    "itertools",
    "errno",
    "gc",
    "marshal",
    "posix",
    "atexit",
];

/// Container generics with a canonical display name.
const CONTAINERS: &[(&str, &str)] = &[
    ("list", "List"),
    ("List", "List"),
    ("dict", "Dict"),
    ("Dict", "Dict"),
    ("set", "Set"),
    ("Set", "Set"),
    ("frozenset", "FrozenSet"),
    ("FrozenSet", "FrozenSet"),
    ("tuple", "Tuple"),
    ("Tuple", "Tuple"),
];

/// Wrappers that resolve to their single argument.
const TRANSPARENT_WRAPPERS: &[&str] = &["ClassVar", "Final", "Required", "NotRequired", "ReadOnly"];

/// The set of type names treated as built-in.
#[derive(Debug, Clone)]
pub struct BuiltinTypes {
    names: HashSet<String>,
}

impl Default for BuiltinTypes {
    fn default() -> Self {
        Self {
            names: DEFAULT_BUILTINS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl BuiltinTypes {
    /// Creates the default set extended with extra names.
    pub fn with_extra<I, S>(extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut builtins = Self::default();
        builtins.names.extend(extra.into_iter().map(Into::into));
        builtins
    }

    /// Returns true if `name` (or its last dotted segment) is built-in.
    pub fn contains(&self, name: &str) -> bool {
        name.is_empty() || self.names.contains(last_segment(name))
    }

    /// Number of names in the set.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns true if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// The resolved form of an annotation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct TypeInfo {
    /// Human-readable type, e.g. `Optional[List[User]]`.
    pub display: String,
    /// Leaf class names referenced, in first-seen order, without duplicates.
    pub types: IndexSet<String>,
}

impl TypeInfo {
    /// A type with no display and no references (enum members, unannotated
    /// attributes).
    pub fn empty() -> Self {
        Self::default()
    }

    /// A display-only type with no references.
    pub fn opaque(display: impl Into<String>) -> Self {
        Self {
            display: display.into(),
            types: IndexSet::new(),
        }
    }

    /// A single named type referencing itself.
    pub fn leaf(name: &str) -> Self {
        let mut types = IndexSet::new();
        types.insert(name.to_string());
        Self {
            display: name.to_string(),
            types,
        }
    }

    /// Leaf names that are not built-in.
    pub fn references<'a>(&'a self, builtins: &'a BuiltinTypes) -> impl Iterator<Item = &'a str> {
        self.types
            .iter()
            .map(String::as_str)
            .filter(move |name| !builtins.contains(name))
    }
}

/// Resolve an annotation into its display string and leaf types.
///
/// # Example
///
/// ```rust
/// use schemaviz::analysis::resolve_type;
/// use schemaviz::parser::TypeExpr;
///
/// let expr = TypeExpr::generic("Optional", vec![TypeExpr::name("User")]);
/// let info = resolve_type(&expr);
/// assert_eq!(info.display, "Optional[User]");
/// assert!(info.types.contains("User"));
/// ```
pub fn resolve_type(expr: &TypeExpr) -> TypeInfo {
    match expr {
        TypeExpr::Name(name) => TypeInfo::leaf(last_segment(name)),
        TypeExpr::NoneType => TypeInfo::opaque("None"),
        TypeExpr::Generic { base, args } => resolve_generic(last_segment(base), args),
        TypeExpr::Union(members) => resolve_union(members),
        TypeExpr::Forward { inner, .. } => resolve_type(inner),
        TypeExpr::Literal(raw) | TypeExpr::Other(raw) => TypeInfo::opaque(raw.clone()),
    }
}

fn resolve_generic(base: &str, args: &[TypeExpr]) -> TypeInfo {
    match base {
        "Optional" => {
            let mut members = args.to_vec();
            members.push(TypeExpr::NoneType);
            resolve_union(&members)
        }
        "Union" => resolve_union(args),
        "Annotated" => match args.first() {
            Some(inner) => resolve_type(inner),
            None => TypeInfo::opaque(base),
        },
        "Literal" => {
            let raw: Vec<String> = args.iter().map(TypeExpr::source_text).collect();
            TypeInfo::opaque(format!("Literal[{}]", raw.join(", ")))
        }
        wrapper if TRANSPARENT_WRAPPERS.contains(&wrapper) && args.len() == 1 => {
            resolve_type(&args[0])
        }
        _ => {
            let container = CONTAINERS
                .iter()
                .find(|(name, _)| *name == base)
                .map(|(_, canonical)| *canonical);

            let mut info = match container {
                Some(canonical) => TypeInfo::opaque(canonical),
                None => TypeInfo::leaf(base),
            };
            if args.is_empty() {
                return info;
            }

            let resolved: Vec<TypeInfo> = args.iter().map(resolve_type).collect();
            let displays: Vec<&str> = resolved.iter().map(|r| r.display.as_str()).collect();
            info.display = format!("{}[{}]", info.display, displays.join(", "));
            for arg in resolved {
                info.types.extend(arg.types);
            }
            info
        }
    }
}

/// Flatten nested unions and optionals into a member list. Forward
/// references are unwrapped first so `User` and `'User'` are one member.
fn flatten_members(members: &[TypeExpr], out: &mut Vec<TypeExpr>) {
    for member in members {
        match member {
            TypeExpr::Union(inner) => flatten_members(inner, out),
            TypeExpr::Generic { base, args } if last_segment(base) == "Union" => {
                flatten_members(args, out)
            }
            TypeExpr::Generic { base, args } if last_segment(base) == "Optional" => {
                flatten_members(args, out);
                flatten_members(&[TypeExpr::NoneType], out);
            }
            TypeExpr::Forward { inner, .. } => {
                flatten_members(std::slice::from_ref(inner.as_ref()), out)
            }
            other => {
                if !out.contains(other) {
                    out.push(other.clone());
                }
            }
        }
    }
}

fn resolve_union(members: &[TypeExpr]) -> TypeInfo {
    let mut flat = Vec::with_capacity(members.len());
    flatten_members(members, &mut flat);

    let has_none = flat.contains(&TypeExpr::NoneType);
    let non_none: Vec<&TypeExpr> = flat.iter().filter(|m| **m != TypeExpr::NoneType).collect();

    match (non_none.as_slice(), has_none) {
        ([], _) => TypeInfo::opaque("None"),
        ([single], false) => resolve_type(single),
        ([single], true) => {
            let inner = resolve_type(single);
            TypeInfo {
                display: format!("Optional[{}]", inner.display),
                types: inner.types,
            }
        }
        _ => {
            let mut types = IndexSet::new();
            let mut displays = Vec::with_capacity(flat.len());
            for member in &flat {
                let resolved = resolve_type(member);
                displays.push(resolved.display);
                types.extend(resolved.types);
            }
            TypeInfo {
                display: format!("Union[{}]", displays.join(", ")),
                types,
            }
        }
    }
}
