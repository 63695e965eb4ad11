//! schemaviz - class diagrams for Python schema modules
//!
//! This crate statically parses Python sources, resolves the field types of
//! validation models, dataclasses, enums and plain classes, builds a graph of
//! which class references which through its fields, and renders that graph
//! with Graphviz.
//!
//! The pipeline is [`parser`] → [`analysis`] → [`graph`] → [`export`]:
//!
//! ```no_run
//! use schemaviz::analysis::{build_class_map, BuiltinTypes};
//! use schemaviz::export::{export_to_string, DiagramStyle, ExportData, ExportFormat};
//! use schemaviz::graph::SchemaGraph;
//! use schemaviz::parser::SourceTree;
//!
//! # fn main() -> anyhow::Result<()> {
//! let mut tree = SourceTree::new(".")?;
//! let builtins = BuiltinTypes::default();
//! let map = build_class_map(&mut tree, &["schemas.comment".to_string()], &builtins, true)?;
//! let graph = SchemaGraph::from_class_map(&map, &builtins);
//!
//! let data = ExportData::new(&graph, DiagramStyle::default());
//! println!("{}", export_to_string(ExportFormat::Dot, &data)?);
//! # Ok(())
//! # }
//! ```

pub mod analysis;
pub mod cli;
pub mod config;
pub mod export;
pub mod graph;
pub mod parser;
