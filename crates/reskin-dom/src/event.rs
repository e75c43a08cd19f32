//! Delegated event registration and dispatch
//!
//! Listeners are keyed registrations rather than closures: dispatch reports
//! which keys fire along the propagation path and the owner of a key
//! decides what to do. Registration is counted so duplicate handlers are
//! observable.

use crate::node::NodeId;
use serde::{Deserialize, Serialize};

/// Event types the engine reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    Click,
    DragStart,
    DragEnd,
    Drop,
}

/// Propagation phase a listener is registered for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    Capture,
    Bubble,
}

/// Registration handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub(crate) usize);

/// One registered listener
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listener {
    pub node: NodeId,
    pub event: EventKind,
    pub phase: Phase,
    pub key: &'static str,
}

/// A listener reached during dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchHit {
    /// Listener key
    pub key: &'static str,
    /// Node the listener is registered on
    pub current_target: NodeId,
    /// Phase in which it fired
    pub phase: Phase,
}
