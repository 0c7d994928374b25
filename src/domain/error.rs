//! Domain-level errors (no external dependencies)

use std::fmt::Display;

use thiserror::Error;

use crate::domain::record::{NodeId, NodeRef};

/// Errors raised while building or querying a tree index.
///
/// Every error aborts the operation it occurred in. Construction is
/// all-or-nothing: no index exists unless every record validated and linked.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IndexError {
    #[error("record #{position} has no '{field}' field")]
    MissingField { field: &'static str, position: usize },

    #[error("record #{position} is not an object")]
    NotAnObject { position: usize },

    #[error("id must be an integer or 'root', got: {value}")]
    InvalidIdType { value: String },

    #[error("record {id} references unknown parent {parent}")]
    DanglingParent { id: NodeId, parent: NodeId },

    #[error("no record with id {0}")]
    NotFound(NodeRef),

    #[error("duplicate record id: {0}")]
    DuplicateId(NodeId),

    #[error("cycle detected in parent chain of record {0}")]
    CycleDetected(NodeId),
}

impl IndexError {
    pub fn invalid_id_type(value: impl Display) -> Self {
        Self::InvalidIdType {
            value: value.to_string(),
        }
    }

    /// Stable kind name; message wording may change, kinds do not.
    pub fn kind(&self) -> &'static str {
        match self {
            IndexError::MissingField { .. } => "MissingFieldError",
            IndexError::NotAnObject { .. } => "NotAnObjectError",
            IndexError::InvalidIdType { .. } => "InvalidIdTypeError",
            IndexError::DanglingParent { .. } => "DanglingParentError",
            IndexError::NotFound(_) => "NotFoundError",
            IndexError::DuplicateId(_) => "DuplicateIdError",
            IndexError::CycleDetected(_) => "CycleDetectedError",
        }
    }
}

/// Result type for index operations.
pub type IndexResult<T> = Result<T, IndexError>;
