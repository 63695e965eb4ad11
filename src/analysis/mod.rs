//! Type resolution and class map construction for schemaviz.
//!
//! This module turns parsed class definitions into the class map the
//! diagram is drawn from.
//!
//! # Features
//!
//! - Resolve annotations (`Optional`, `Union`, `List`, `Dict`, `Set`,
//!   `Tuple`, `Annotated`, `Literal`, forward references) into a display
//!   string and the leaf class names they reference
//! - Classify classes as validation models, dataclasses, enums or plain
//!   classes, following base classes through the source tree
//! - Follow field references across modules via imports, with a visited set
//!   so cyclic models terminate
//!
//! # Example
//!
//! ```ignore
//! use schemaviz::analysis::{build_class_map, BuiltinTypes};
//! use schemaviz::parser::SourceTree;
//!
//! let mut tree = SourceTree::new(".")?;
//! let targets = tree.expand_target("schemas.comment")?;
//! let map = build_class_map(&mut tree, &targets, &BuiltinTypes::default(), true)?;
//!
//! for class in map.iter() {
//!     println!("{} ({} fields)", class.name, class.fields.len());
//! }
//! ```

pub mod class_map;
pub mod resolve;

// Re-export main types for convenience
pub use class_map::{build_class_map, ClassInfo, ClassKind, ClassMap, ClassMapBuilder, FieldInfo};
pub use resolve::{resolve_type, BuiltinTypes, TypeInfo};
