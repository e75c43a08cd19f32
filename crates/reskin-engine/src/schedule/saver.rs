//! Serialised schedule saves
//!
//! Only one write is in flight at a time. A save requested meanwhile waits
//! on a retry timer instead of racing; when it gets its turn it writes the
//! newest snapshot, so a waiter already covered by a newer write returns
//! without writing again.

use super::migrate::CURRENT_SCHEMA_VERSION;
use super::model::ScheduleBook;
use crate::keys::{self, CourseSchedules, CourseSchedulesSchemaVersion};
use parking_lot::Mutex;
use reskin_store::{PersistedStore, Record};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// What a save call did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// This call performed the write
    Written,
    /// A later snapshot was written on this call's behalf
    Coalesced,
}

#[derive(Debug, Default)]
struct Pending {
    generation: u64,
    book: ScheduleBook,
}

/// Single-writer lane for `courseSchedules`
#[derive(Debug, Clone)]
pub struct ScheduleSaver {
    store: PersistedStore,
    retry: Duration,
    is_saving: Arc<AtomicBool>,
    requested: Arc<AtomicU64>,
    written: Arc<AtomicU64>,
    latest: Arc<Mutex<Pending>>,
}

impl ScheduleSaver {
    /// Create lane writing through `store`, retrying every `retry`
    #[must_use]
    pub fn new(store: PersistedStore, retry: Duration) -> Self {
        Self {
            store,
            retry,
            is_saving: Arc::new(AtomicBool::new(false)),
            requested: Arc::new(AtomicU64::new(0)),
            written: Arc::new(AtomicU64::new(0)),
            latest: Arc::new(Mutex::new(Pending::default())),
        }
    }

    /// Whether a write is in flight
    #[must_use]
    pub fn is_saving(&self) -> bool {
        self.is_saving.load(Ordering::SeqCst)
    }

    /// Persist `book`. Never fails; store errors are logged by the store.
    pub async fn save(&self, book: ScheduleBook) -> SaveOutcome {
        let generation = self.requested.fetch_add(1, Ordering::SeqCst) + 1;
        {
            let mut latest = self.latest.lock();
            if generation > latest.generation {
                *latest = Pending { generation, book };
            }
        }

        loop {
            if self.written.load(Ordering::SeqCst) >= generation {
                return SaveOutcome::Coalesced;
            }
            if self
                .is_saving
                .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                let (snapshot_gen, snapshot) = {
                    let latest = self.latest.lock();
                    (latest.generation, latest.book.clone())
                };
                self.write(&snapshot).await;
                self.written.fetch_max(snapshot_gen, Ordering::SeqCst);
                self.is_saving.store(false, Ordering::SeqCst);
                tracing::debug!(generation = snapshot_gen, courses = snapshot.len(), "schedules saved");
                return SaveOutcome::Written;
            }
            tracing::trace!(generation, "schedule save in flight, retrying");
            tokio::time::sleep(self.retry).await;
        }
    }

    async fn write(&self, book: &ScheduleBook) {
        let mut items = Record::new();
        for (key, value) in [
            keys::encode::<CourseSchedules>(book),
            keys::encode::<CourseSchedulesSchemaVersion>(&CURRENT_SCHEMA_VERSION),
        ]
        .into_iter()
        .flatten()
        {
            items.insert(key, value);
        }
        self.store.set(items).await;
    }
}
