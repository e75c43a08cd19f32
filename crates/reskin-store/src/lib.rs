//! Reskin Store
//!
//! Asynchronous key-value persistence with two tiers (fast local, then
//! replicated sync) and cross-context change notifications.
//!
//! # Architecture
//!
//! ```text
//! PersistedStore ──get/set──▶ primary (local) ──error──▶ secondary (sync) ──error──▶ defaults / drop
//!        │                        │                          │
//!        └──── subscribe ◀──── ChangeHub ◀───────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use reskin_store::{PersistedStore, StoreKey};
//!
//! let store = PersistedStore::in_memory();
//! store.save::<ViewModeKey>(&ViewMode::List).await;
//! let mode = store.load::<ViewModeKey>().await;
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod backend;
pub mod change;
pub mod error;
pub mod file;
pub mod store;

pub use backend::{MemoryBackend, Record, StorageBackend};
pub use change::{ChangeHub, ChangeSubscription, Drained, StoreArea, StoreChange};
pub use error::{StoreError, StoreResult};
pub use file::JsonFileBackend;
pub use store::{PersistedStore, StoreKey};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
