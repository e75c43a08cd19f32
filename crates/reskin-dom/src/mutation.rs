//! Mutation records
//!
//! The document appends one record per effective write. Each record carries
//! the origin that was active when the write happened, which is how the
//! engine tells its own writes apart from the host page's.

use crate::node::NodeId;
use serde::{Deserialize, Serialize};

/// Who performed a write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MutationOrigin {
    /// The host page (anything outside a reconciliation pass)
    #[default]
    Host,
    /// The engine, inside a guarded reconciliation pass
    Engine,
}

/// What changed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MutationKind {
    /// Children were added to or removed from the target
    ChildList {
        added: Vec<NodeId>,
        removed: Vec<NodeId>,
    },
    /// An attribute (including `class` and `style`) changed
    Attribute { name: String },
    /// Own text changed
    Text,
}

/// One observed change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationRecord {
    pub target: NodeId,
    pub kind: MutationKind,
    pub origin: MutationOrigin,
}

impl MutationRecord {
    /// Whether the engine produced this record
    #[inline]
    #[must_use]
    pub fn is_engine(&self) -> bool {
        self.origin == MutationOrigin::Engine
    }
}
