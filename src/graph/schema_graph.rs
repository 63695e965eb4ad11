//! Schema graph implementation using petgraph.
//!
//! Provides a directed graph of classes where an edge points from a class
//! to each known class referenced by one of its fields, with support for
//! cycle detection and traversal.

use petgraph::algo::is_cyclic_directed;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use log::{debug, warn};
use serde::Serialize;

use crate::analysis::{BuiltinTypes, ClassInfo, ClassKind, ClassMap, FieldInfo};

/// Replace everything outside `[A-Za-z0-9_]` so names are safe as Graphviz
/// identifiers and port names.
///
/// ```rust
/// use schemaviz::graph::sanitize_name;
///
/// assert_eq!(sanitize_name("my-field.v2"), "my_field_v2");
/// ```
pub fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

/// Represents a node in the schema graph.
///
/// Each node carries everything needed to draw one class.
#[derive(Debug, Clone, Serialize)]
pub struct SchemaNode {
    /// Class name as written in the source
    pub name: String,
    /// Sanitized identifier used in the rendered graph
    pub id: String,
    /// Module the class was found in, if known
    pub module: Option<String>,
    /// Whether the class belongs to one of the target modules
    pub local: bool,
    /// Class kind; None for placeholders
    pub kind: Option<ClassKind>,
    /// Fields (or enum members) in declaration order
    pub fields: IndexMap<String, FieldInfo>,
}

impl SchemaNode {
    /// Creates a node from a class map entry.
    pub fn from_class(class: &ClassInfo) -> Self {
        Self {
            name: class.name.clone(),
            id: sanitize_name(&class.name),
            module: class.module.clone(),
            local: class.local,
            kind: class.kind,
            fields: class.fields.clone(),
        }
    }

    /// Returns true if this node is drawn as a field table rather than a
    /// placeholder box.
    pub fn has_fields(&self) -> bool {
        !self.fields.is_empty()
    }

    /// Returns true if this node is an enumeration.
    pub fn is_enum(&self) -> bool {
        self.kind == Some(ClassKind::Enum)
    }
}

/// Represents an edge in the schema graph.
///
/// Edges connect the referencing class to the referenced class through
/// one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldEdge {
    /// The field holding the reference
    pub field: String,
}

impl FieldEdge {
    /// Creates a new edge for a field.
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
        }
    }
}

/// A borrowed view of one edge.
#[derive(Debug, Clone, Copy)]
pub struct EdgeView<'a> {
    /// The referencing class
    pub source: &'a SchemaNode,
    /// The referenced class
    pub target: &'a SchemaNode,
    /// The field holding the reference
    pub field: &'a str,
}

/// A directed graph of classes and their field references.
///
/// The graph uses petgraph's `DiGraph` internally. Edges point from the
/// class declaring a field to the class the field references.
///
/// # Example
///
/// ```rust
/// use schemaviz::analysis::ClassInfo;
/// use schemaviz::graph::SchemaGraph;
///
/// let mut graph = SchemaGraph::new();
/// graph.add_class(&ClassInfo::placeholder("Comment", None));
/// graph.add_class(&ClassInfo::placeholder("User", None));
///
/// assert!(graph.add_edge("Comment", "User", "author"));
/// assert!(!graph.add_edge("Comment", "Missing", "post"));
/// assert_eq!(graph.edge_count(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct SchemaGraph {
    /// The underlying directed graph
    graph: DiGraph<SchemaNode, FieldEdge>,
    /// Maps class names to their node indices for O(1) lookup
    node_indices: HashMap<String, NodeIndex>,
}

impl Default for SchemaGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaGraph {
    /// Creates a new empty schema graph.
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            node_indices: HashMap::new(),
        }
    }

    /// Creates a new graph with pre-allocated capacity.
    pub fn with_capacity(nodes: usize, edges: usize) -> Self {
        Self {
            graph: DiGraph::with_capacity(nodes, edges),
            node_indices: HashMap::with_capacity(nodes),
        }
    }

    /// Builds the graph for a class map.
    ///
    /// Every class becomes a node before any edge is added, so an edge is
    /// only drawn to a node that already exists. Built-in leaf types never
    /// produce edges; references to unknown classes are logged and skipped.
    pub fn from_class_map(map: &ClassMap, builtins: &BuiltinTypes) -> Self {
        let mut graph = Self::with_capacity(map.len(), map.len() * 2);

        for class in map.iter() {
            graph.add_class(class);
            debug!(node = class.name.as_str(); "Added node");
        }

        for class in map.iter().filter(|c| !c.is_enum()) {
            for (field_name, field) in &class.fields {
                for target in field.type_info.references(builtins) {
                    if graph.add_edge(&class.name, target, field_name) {
                        debug!(from = class.name.as_str(), field = field_name.as_str(), to = target; "Added edge");
                    } else {
                        warn!(from = class.name.as_str(), to = target; "Referenced class has no node, skipping edge");
                    }
                }
            }
        }

        graph
    }

    /// Adds a class to the graph.
    ///
    /// If a class with the same name already exists, returns its existing
    /// node index without modification.
    pub fn add_class(&mut self, class: &ClassInfo) -> NodeIndex {
        if let Some(&idx) = self.node_indices.get(&class.name) {
            return idx;
        }

        let idx = self.graph.add_node(SchemaNode::from_class(class));
        self.node_indices.insert(class.name.clone(), idx);
        idx
    }

    /// Adds a reference edge from `from` to `to` through `field`.
    ///
    /// # Returns
    ///
    /// `true` if the edge was added, `false` if either node doesn't exist.
    pub fn add_edge(&mut self, from: &str, to: &str, field: &str) -> bool {
        let (Some(&from_idx), Some(&to_idx)) = (self.node_indices.get(from), self.node_indices.get(to))
        else {
            return false;
        };

        self.graph.add_edge(from_idx, to_idx, FieldEdge::new(field));
        true
    }

    /// Gets a reference to a node by class name.
    pub fn get_node(&self, name: &str) -> Option<&SchemaNode> {
        self.node_indices
            .get(name)
            .and_then(|&idx| self.graph.node_weight(idx))
    }

    /// Gets the classes referenced by a class (outgoing edges).
    pub fn references(&self, name: &str) -> Vec<&SchemaNode> {
        let Some(&idx) = self.node_indices.get(name) else {
            return Vec::new();
        };

        self.graph
            .edges_directed(idx, Direction::Outgoing)
            .filter_map(|edge| self.graph.node_weight(edge.target()))
            .collect()
    }

    /// Gets the classes that reference a class (incoming edges).
    pub fn referenced_by(&self, name: &str) -> Vec<&SchemaNode> {
        let Some(&idx) = self.node_indices.get(name) else {
            return Vec::new();
        };

        self.graph
            .edges_directed(idx, Direction::Incoming)
            .filter_map(|edge| self.graph.node_weight(edge.source()))
            .collect()
    }

    /// Gets all nodes in insertion order.
    pub fn nodes(&self) -> Vec<&SchemaNode> {
        self.graph.node_weights().collect()
    }

    /// Gets all edges in insertion order.
    pub fn edges(&self) -> Vec<EdgeView<'_>> {
        self.graph
            .edge_references()
            .filter_map(|edge| {
                Some(EdgeView {
                    source: self.graph.node_weight(edge.source())?,
                    target: self.graph.node_weight(edge.target())?,
                    field: edge.weight().field.as_str(),
                })
            })
            .collect()
    }

    /// Distinct modules of all nodes, sorted.
    pub fn modules(&self) -> Vec<&str> {
        let mut modules: Vec<&str> = self
            .graph
            .node_weights()
            .filter_map(|n| n.module.as_deref())
            .collect();
        modules.sort_unstable();
        modules.dedup();
        modules
    }

    /// Checks if any class reaches itself through its fields.
    pub fn has_cycles(&self) -> bool {
        is_cyclic_directed(&self.graph)
    }

    /// Detects and returns all reference cycles in the graph.
    ///
    /// Uses Tarjan's algorithm to find strongly connected components; a
    /// single class with a self-referencing field counts as a cycle.
    pub fn detect_cycles(&self) -> Vec<Vec<String>> {
        use petgraph::algo::tarjan_scc;

        let sccs = tarjan_scc(&self.graph);
        let mut cycles = Vec::new();

        for scc in sccs {
            if scc.len() > 1 {
                let mut cycle: Vec<(NodeIndex, String)> = scc
                    .iter()
                    .filter_map(|&idx| self.graph.node_weight(idx).map(|n| (idx, n.name.clone())))
                    .collect();
                // Insertion order keeps output stable across runs
                cycle.sort_by_key(|(idx, _)| *idx);
                cycles.push(cycle.into_iter().map(|(_, name)| name).collect());
            } else if scc.len() == 1 {
                let idx = scc[0];
                if self.graph.contains_edge(idx, idx) {
                    if let Some(node) = self.graph.node_weight(idx) {
                        cycles.push(vec![node.name.clone()]);
                    }
                }
            }
        }

        cycles.sort();
        cycles
    }

    /// Returns the names of classes that are part of any cycle.
    pub fn get_nodes_in_cycles(&self) -> HashSet<String> {
        self.detect_cycles().into_iter().flatten().collect()
    }

    /// Returns detailed cycle information.
    pub fn get_cycle_details(&self) -> Vec<CycleInfo> {
        self.detect_cycles()
            .into_iter()
            .map(|nodes| CycleInfo { nodes })
            .collect()
    }

    /// Returns the number of nodes in the graph.
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Returns the number of edges in the graph.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Checks if the graph is empty.
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Checks if a node exists in the graph.
    pub fn contains(&self, name: &str) -> bool {
        self.node_indices.contains_key(name)
    }
}

/// Information about a detected reference cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleInfo {
    /// The class names in the cycle (the last connects back to the first)
    pub nodes: Vec<String>,
}

impl CycleInfo {
    /// Returns a formatted string representation of the cycle path.
    ///
    /// For example: "a -> b -> c -> a"
    pub fn cycle_path(&self) -> String {
        if self.nodes.is_empty() {
            return String::new();
        }
        let mut path = self.nodes.join(" -> ");
        path.push_str(" -> ");
        path.push_str(&self.nodes[0]);
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::TypeInfo;
    use indexmap::IndexSet;

    fn field(display: &str, types: &[&str]) -> FieldInfo {
        FieldInfo::new(
            TypeInfo {
                display: display.to_string(),
                types: types.iter().map(|t| t.to_string()).collect::<IndexSet<_>>(),
            },
            None,
        )
    }

    fn class(name: &str, kind: ClassKind, fields: &[(&str, FieldInfo)]) -> ClassInfo {
        ClassInfo {
            name: name.to_string(),
            module: Some("schemas".to_string()),
            local: true,
            kind: Some(kind),
            fields: fields
                .iter()
                .map(|(n, f)| (n.to_string(), f.clone()))
                .collect(),
        }
    }

    fn sample_map() -> ClassMap {
        let mut map = ClassMap::new();
        map.insert(class(
            "Comment",
            ClassKind::Model,
            &[
                ("id", field("int", &["int"])),
                ("author", field("User", &["User"])),
                ("post", field("Post", &["Post"])),
            ],
        ));
        map.insert(class(
            "Post",
            ClassKind::Model,
            &[
                ("author", field("User", &["User"])),
                ("tags", field("List[str]", &["str"])),
            ],
        ));
        map.insert(class(
            "User",
            ClassKind::Model,
            &[("name", field("str", &["str"]))],
        ));
        map
    }

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("User"), "User");
        assert_eq!(sanitize_name("my-field"), "my_field");
        assert_eq!(sanitize_name("a.b c"), "a_b_c");
    }

    #[test]
    fn test_from_class_map() {
        let graph = SchemaGraph::from_class_map(&sample_map(), &BuiltinTypes::default());

        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 3);
        let references = graph.references("Comment");
        let targets: Vec<_> = references
            .iter()
            .map(|n| n.name.as_str())
            .collect();
        assert!(targets.contains(&"User"));
        assert!(targets.contains(&"Post"));
        assert_eq!(graph.referenced_by("User").len(), 2);
    }

    #[test]
    fn test_builtin_fields_produce_no_edges() {
        let graph = SchemaGraph::from_class_map(&sample_map(), &BuiltinTypes::default());

        assert!(graph.references("User").is_empty());
        for edge in graph.edges() {
            assert_ne!(edge.field, "id");
            assert_ne!(edge.field, "tags");
        }
    }

    #[test]
    fn test_edges_only_to_existing_nodes() {
        let mut map = sample_map();
        map.insert(class(
            "Orphan",
            ClassKind::Model,
            &[("ghost", field("Ghost", &["Ghost"]))],
        ));
        let graph = SchemaGraph::from_class_map(&map, &BuiltinTypes::default());

        assert!(!graph.contains("Ghost"));
        assert!(graph.references("Orphan").is_empty());
        for edge in graph.edges() {
            assert!(graph.contains(&edge.target.name));
        }
    }

    #[test]
    fn test_enum_nodes_have_no_edges() {
        let mut map = sample_map();
        map.insert(class(
            "User",
            ClassKind::Enum,
            &[("Post", field("", &["Post"]))],
        ));
        let graph = SchemaGraph::from_class_map(&map, &BuiltinTypes::default());
        assert!(graph.references("User").is_empty());
    }

    #[test]
    fn test_add_class_is_idempotent() {
        let mut graph = SchemaGraph::new();
        let first = graph.add_class(&ClassInfo::placeholder("User", None));
        let second = graph.add_class(&ClassInfo::placeholder("User", None));
        assert_eq!(first, second);
        assert_eq!(graph.node_count(), 1);
    }

    #[test]
    fn test_detect_cycles() {
        let mut map = sample_map();
        map.insert(class(
            "User",
            ClassKind::Model,
            &[("latest", field("Comment", &["Comment"]))],
        ));
        map.insert(class(
            "Node",
            ClassKind::Model,
            &[("parent", field("Optional[Node]", &["Node"]))],
        ));
        let graph = SchemaGraph::from_class_map(&map, &BuiltinTypes::default());

        assert!(graph.has_cycles());
        let cycles = graph.get_cycle_details();
        assert_eq!(cycles.len(), 2);
        assert!(cycles.contains(&CycleInfo {
            nodes: vec!["Node".to_string()]
        }));

        let in_cycles = graph.get_nodes_in_cycles();
        assert!(in_cycles.contains("Comment"));
        assert!(in_cycles.contains("User"));
        assert!(in_cycles.contains("Node"));
    }

    #[test]
    fn test_no_cycles() {
        let graph = SchemaGraph::from_class_map(&sample_map(), &BuiltinTypes::default());
        assert!(!graph.has_cycles());
        assert!(graph.detect_cycles().is_empty());
    }

    #[test]
    fn test_cycle_path() {
        let cycle = CycleInfo {
            nodes: vec!["A".to_string(), "B".to_string()],
        };
        assert_eq!(cycle.cycle_path(), "A -> B -> A");
        assert_eq!(CycleInfo { nodes: vec![] }.cycle_path(), "");
    }

    #[test]
    fn test_modules() {
        let mut map = sample_map();
        map.insert(ClassInfo::placeholder("datetime", Some("datetime".to_string())));
        map.insert(ClassInfo::placeholder("Mystery", None));
        let graph = SchemaGraph::from_class_map(&map, &BuiltinTypes::default());
        assert_eq!(graph.modules(), vec!["datetime", "schemas"]);
    }
}
