//! Parser module for schemaviz.
//!
//! This module discovers class definitions by parsing Python source into a
//! syntax tree. No code is imported or executed, so the tool tolerates
//! modules with missing third-party dependencies or syntax errors.
//!
//! # Example
//!
//! ```ignore
//! use schemaviz::parser::SourceTree;
//!
//! let mut tree = SourceTree::new("src")?;
//! for module in tree.expand_target("schemas")? {
//!     let parsed = tree.load_target(&module)?;
//!     println!("{}: {} classes", parsed.name, parsed.class_count());
//! }
//! ```

pub mod python;
pub mod source_tree;
pub mod types;

// Re-export commonly used types for convenience
pub use python::{parse_annotation, resolve_relative, ParseError, ParseResult, PythonParser};
pub use source_tree::SourceTree;
pub use types::{
    last_segment, ClassDef, DefaultValue, ImportBinding, ParsedModule, RawField, TypeExpr,
};
