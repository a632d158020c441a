//! Error types for the task graph

use thiserror::Error;

use crate::types::NodeIndex;
use crate::value::TypeTag;

/// Result type alias using TaskGraphError
pub type Result<T> = std::result::Result<T, TaskGraphError>;

/// Broad failure category of a [`TaskGraphError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Self-loop, direction conflict, exhausted index space
    Structural,
    /// Slot or context type mismatch, write of the unspecified type
    Type,
    /// Mutation after freeze, double assignment, duplicate registration
    State,
    /// Unknown name, out-of-range index, missing value
    Lookup,
    /// A malformed argument such as an empty name
    Argument,
}

/// Errors that can occur while building a graph or exchanging slot data
#[derive(Debug, Error)]
pub enum TaskGraphError {
    /// The registry cannot hand out another node index
    #[error("Node capacity exhausted: limit is {limit} nodes")]
    Capacity { limit: usize },

    /// A node index does not refer to a stored node
    #[error("Node {index} not found (node count is {count})")]
    NodeNotFound { index: NodeIndex, count: usize },

    /// Attempt to link a node to itself
    #[error("Cannot link node {0} to itself")]
    SelfLoop(NodeIndex),

    /// The reverse of the requested edge already exists
    #[error("Cannot link {from} -> {to}: edge {to} -> {from} already exists")]
    DirectionConflict { from: NodeIndex, to: NodeIndex },

    /// Malformed argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A write carried the unspecified (void) type tag
    #[error("Cannot write unspecified type to '{0}'")]
    UnspecifiedType(String),

    /// Declared and actual type tags differ
    #[error("Type mismatch for '{name}': expected {expected}, got {actual}")]
    TypeMismatch {
        name: String,
        expected: TypeTag,
        actual: TypeTag,
    },

    /// Structural change attempted on a frozen slot set
    #[error("Slot set is frozen, cannot add slot '{0}'")]
    Frozen(String),

    /// The same slot instance was registered twice
    #[error("Slot '{0}' is already registered in this set")]
    DuplicateSlot(String),

    /// A typed output was written twice without a release in between
    #[error("Slot '{0}' already holds a value")]
    AlreadyAssigned(String),

    /// Slot position outside `[0, count)`
    #[error("Slot index {index} out of range (slot count is {count})")]
    SlotIndexOutOfRange { index: usize, count: usize },

    /// Name not registered in the shared context
    #[error("Context name '{0}' is not registered")]
    UnknownName(String),

    /// Registered context name that has never been written
    #[error("No data has been written for '{0}'")]
    NullData(String),

    /// Typed read of a slot that holds no value
    #[error("Slot '{0}' holds no value")]
    EmptySlot(String),
}

impl TaskGraphError {
    /// Create an invalid argument error with a message
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// The failure category this error belongs to
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Capacity { .. } | Self::SelfLoop(_) | Self::DirectionConflict { .. } => {
                ErrorKind::Structural
            }
            Self::UnspecifiedType(_) | Self::TypeMismatch { .. } => ErrorKind::Type,
            Self::Frozen(_) | Self::DuplicateSlot(_) | Self::AlreadyAssigned(_) => {
                ErrorKind::State
            }
            Self::NodeNotFound { .. }
            | Self::SlotIndexOutOfRange { .. }
            | Self::UnknownName(_)
            | Self::NullData(_)
            | Self::EmptySlot(_) => ErrorKind::Lookup,
            Self::InvalidArgument(_) => ErrorKind::Argument,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        assert_eq!(
            TaskGraphError::SelfLoop(NodeIndex::new(3)).kind(),
            ErrorKind::Structural
        );
        assert_eq!(
            TaskGraphError::NodeNotFound {
                index: NodeIndex::new(9),
                count: 2
            }
            .kind(),
            ErrorKind::Lookup
        );
        assert_eq!(
            TaskGraphError::Frozen("a".into()).kind(),
            ErrorKind::State
        );
        assert_eq!(
            TaskGraphError::UnspecifiedType("a".into()).kind(),
            ErrorKind::Type
        );
        assert_eq!(TaskGraphError::invalid("empty").kind(), ErrorKind::Argument);
    }

    #[test]
    fn test_display_names_both_directions() {
        let err = TaskGraphError::DirectionConflict {
            from: NodeIndex::new(3),
            to: NodeIndex::new(2),
        };
        assert_eq!(
            err.to_string(),
            "Cannot link 3 -> 2: edge 2 -> 3 already exists"
        );
    }
}
