//! Reskin Engine
//!
//! Keeps an LMS course listing re-skinned while the host page keeps
//! re-rendering it:
//! - Batches host mutations into at most one reconciliation pass per frame
//! - Injects thumbnails, accents and controls into every course card, once
//! - Orders favorites first without feeding its own writes back to itself
//! - Keeps a versioned weekly schedule with an editor, a save lane and a view
//! - Caches assignment lookups and runs at most one bulk scan at a time
//! - Keeps user calendar events and a per-day view over them and the assignments
//!
//! # Example
//!
//! ```rust,ignore
//! use reskin_engine::{Engine, EngineConfig, SystemClock, Unattended};
//! use reskin_store::PersistedStore;
//! use std::sync::Arc;
//!
//! # async fn example(doc: &mut reskin_dom::Document) -> reskin_engine::Result<()> {
//! let engine = Engine::start(
//!     EngineConfig::default(),
//!     PersistedStore::in_memory(),
//!     Arc::new(SystemClock),
//!     Arc::new(Unattended),
//! )
//! .await?;
//! engine.attach(doc, "https://lms.example/").await;
//!
//! // once per animation frame
//! engine.sync_from_store().await;
//! engine.tick(doc);
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod calendar;
pub mod carousel;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod favorites;
pub mod fetch;
pub mod host;
pub mod keys;
pub mod messaging;
pub mod observer;
pub mod palette;
pub mod prefs;
pub mod prompt;
pub mod reconcile;
pub mod schedule;

pub use calendar::{CustomEvent, DayEvent, EventDraft};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::EngineConfig;
pub use engine::{AppState, AssignmentRow, DeleteAllOutcome, DragPayload, DropOutcome, Engine, UiAction};
pub use error::{CalendarError, EngineError, FetchError, Result, ScheduleError};
pub use favorites::FavoritesSet;
pub use host::{CompiledContract, HostContract};
pub use messaging::{BackgroundRouter, MessageResponse, OptionsOpener, RuntimeMessage};
pub use observer::{BatchPhase, BatchStats, MutationBatcher, ReconcileGuard};
pub use palette::{Hsl, Palette, YearSemester};
pub use prefs::{CardStyle, ColumnCount, ViewMode, ViewPreferences};
pub use prompt::{TimeChoice, Unattended, UserPrompt};
pub use reconcile::{PassInput, PassReport};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
