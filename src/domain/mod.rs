//! Domain layer: records and the tree index
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod builder;
pub mod error;
pub mod index;
pub mod record;

pub use builder::{BuildOrder, DuplicatePolicy, IndexBuilder};
pub use error::{IndexError, IndexResult};
pub use index::{RecordSlice, Records, TreeIndex};
pub use record::{NodeId, NodeKey, NodeRef, Record, ID_FIELD, PARENT_FIELD, ROOT_SENTINEL};
