//! Assignment lookups on top of the caches
//!
//! Three caches with different lifetimes: per-course lists refresh after a
//! short TTL, due dates are cached forever (negative results included) and
//! submission statuses are read from cache unless a refresh is forced.

use super::assignments::{Assignment, StatusStamp, SubmissionStatus};
use super::cache::FetchCache;
use super::source::AssignmentSource;
use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::keys::{CourseAssignments, DueDateCache, SubmissionStatusCache};
use reskin_store::PersistedStore;
use std::sync::Arc;
use std::time::Duration;

/// Cached assignment queries
#[derive(Debug, Clone)]
pub struct AssignmentLookup {
    store: PersistedStore,
    clock: Arc<dyn Clock>,
    courses: FetchCache<CourseAssignments, Vec<Assignment>>,
    quick_ttl: Duration,
    submission_ttl: Duration,
}

impl AssignmentLookup {
    /// Create lookups sharing `store` and `clock`
    #[must_use]
    pub fn new(store: PersistedStore, clock: Arc<dyn Clock>, config: &EngineConfig) -> Self {
        Self {
            courses: FetchCache::new(store.clone(), clock.clone(), config.front_cache_capacity),
            store,
            clock,
            quick_ttl: Duration::from_millis(config.quick_ttl_ms),
            submission_ttl: Duration::from_millis(config.submission_ttl_ms),
        }
    }

    /// Per-course cache
    #[must_use]
    pub fn courses(&self) -> &FetchCache<CourseAssignments, Vec<Assignment>> {
        &self.courses
    }

    /// Assignments of `course_id`, refreshed after the quick TTL
    pub async fn course_assignments(&self, source: &dyn AssignmentSource, course_id: &str) -> Vec<Assignment> {
        if course_id.is_empty() {
            return Vec::new();
        }
        self.courses
            .fetch_with_cache(course_id, self.quick_ttl, || source.course_assignments(course_id))
            .await
            .unwrap_or_default()
    }

    /// Due date of an assignment. A cached miss is an answer too.
    pub async fn due_date(
        &self,
        source: &dyn AssignmentSource,
        assignment_id: &str,
        url: &str,
        force_refresh: bool,
    ) -> Option<i64> {
        if !force_refresh {
            if let Some(cached) = self.store.load::<DueDateCache>().await.get(assignment_id) {
                return *cached;
            }
        }
        let due = match source.due_date(url).await {
            Ok(due) => due,
            Err(e) => {
                tracing::warn!(assignment_id, error = %e, "due date fetch failed");
                None
            }
        };
        let mut cache = self.store.load::<DueDateCache>().await;
        cache.insert(assignment_id.to_string(), due);
        self.store.save::<DueDateCache>(&cache).await;
        due
    }

    /// Submission status, from cache unless stale and `force_refresh` is set
    pub async fn submission_status(
        &self,
        source: &dyn AssignmentSource,
        assignment_id: &str,
        url: &str,
        force_refresh: bool,
    ) -> Option<SubmissionStatus> {
        if url.is_empty() {
            return None;
        }
        let key = status_key(assignment_id);
        let now = self.clock.now_ms();
        let ttl_ms = i64::try_from(self.submission_ttl.as_millis()).unwrap_or(i64::MAX);
        if let Some(stamp) = self.store.load::<SubmissionStatusCache>().await.get(&key) {
            if now.saturating_sub(stamp.timestamp) < ttl_ms {
                return Some(stamp.status);
            }
        }
        if !force_refresh {
            return None;
        }

        match source.submission_status(url).await {
            Ok(status) => {
                let mut cache = self.store.load::<SubmissionStatusCache>().await;
                cache.insert(
                    key,
                    StatusStamp {
                        status,
                        timestamp: self.clock.now_ms(),
                    },
                );
                self.store.save::<SubmissionStatusCache>(&cache).await;
                Some(status)
            }
            Err(e) => {
                tracing::warn!(assignment_id, error = %e, "submission status fetch failed");
                None
            }
        }
    }

    /// Drop the cached submission status of an assignment, so the next
    /// forced lookup refetches it. Returns whether an entry was removed.
    pub async fn forget_status(&self, assignment_id: &str) -> bool {
        let mut cache = self.store.load::<SubmissionStatusCache>().await;
        if cache.remove(&status_key(assignment_id)).is_none() {
            return false;
        }
        self.store.save::<SubmissionStatusCache>(&cache).await;
        tracing::debug!(assignment_id, "submission status forgotten");
        true
    }
}

/// Key of an assignment in `submissionStatusCache`
#[must_use]
pub fn status_key(assignment_id: &str) -> String {
    format!("submission_status_{assignment_id}")
}
