//! Error types for document operations

use crate::node::NodeId;

/// Errors raised by structural document operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomError {
    /// Handle refers to a node that was removed
    #[error("stale node handle: {0}")]
    StaleNode(NodeId),

    /// Insertion would make a node its own ancestor
    #[error("cannot insert {child} under its own descendant {parent}")]
    HierarchyRequest { parent: NodeId, child: NodeId },

    /// Reference node for `insert_before` is not a child of the parent
    #[error("{reference} is not a child of {parent}")]
    NotAChild { parent: NodeId, reference: NodeId },

    /// The document root cannot be moved or removed
    #[error("the document root cannot be detached")]
    RootImmutable,

    /// Selector text could not be parsed
    #[error("invalid selector {input:?}: {reason}")]
    InvalidSelector { input: String, reason: String },
}

/// Result type alias for document operations
pub type DomResult<T> = Result<T, DomError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hierarchy_error_display() {
        let err = DomError::HierarchyRequest {
            parent: NodeId::from_raw(3),
            child: NodeId::from_raw(1),
        };
        assert_eq!(err.to_string(), "cannot insert #1 under its own descendant #3");
    }
}
