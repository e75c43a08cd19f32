//! Host page document model
//!
//! An arena DOM standing in for the third-party page: elements with
//! classes, attributes, inline style and text; mutation records stamped
//! with their origin; typed selectors; and keyed delegated listeners.

pub mod builder;
pub mod document;
pub mod error;
pub mod event;
pub mod mutation;
pub mod node;
mod parse;
pub mod selector;

pub use builder::{render_card, CardSpec, Page, PageBuilder, PageLayout};
pub use document::Document;
pub use error::{DomError, DomResult};
pub use event::{DispatchHit, EventKind, Listener, ListenerId, Phase};
pub use mutation::{MutationKind, MutationOrigin, MutationRecord};
pub use node::NodeId;
pub use selector::Selector;
