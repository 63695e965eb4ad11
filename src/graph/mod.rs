//! Graph module for class reference modeling.
//!
//! This module provides the [`SchemaGraph`] struct: one node per discovered
//! class and one directed edge per (field, referenced class) pair.
//!
//! # Example
//!
//! ```rust
//! use schemaviz::analysis::ClassInfo;
//! use schemaviz::graph::SchemaGraph;
//!
//! let mut graph = SchemaGraph::new();
//! graph.add_class(&ClassInfo::placeholder("Post", None));
//! graph.add_class(&ClassInfo::placeholder("User", None));
//! graph.add_edge("Post", "User", "author");
//!
//! assert_eq!(graph.node_count(), 2);
//! assert_eq!(graph.edge_count(), 1);
//! ```

mod schema_graph;

pub use schema_graph::{sanitize_name, CycleInfo, EdgeView, FieldEdge, SchemaGraph, SchemaNode};
