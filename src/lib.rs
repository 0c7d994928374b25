//! treeindex: precomputed tree index over parent-referencing records.
//!
//! A flat list of records, each carrying an `id` and a `parent` (`"root"` or
//! another record's id), is indexed once into lookup tables so that item,
//! direct-children and ancestor-chain queries never walk the tree.
//!
//! Layers:
//! - `domain`: records, the index and its builder (no I/O)
//! - `application`: loading records and building indexes
//! - `infrastructure`: filesystem seam and service wiring
//! - `cli`: argument parsing, command dispatch, terminal output

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;

pub use domain::{IndexBuilder, IndexError, IndexResult, NodeId, Record, TreeIndex};
