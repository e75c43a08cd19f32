//! Whole-site assignment scan
//!
//! At most one bulk scan runs at a time across every context sharing the
//! store. The mutex is a persisted flag with a start timestamp: a second
//! caller polls until the flag clears and then serves the fresh cache, and
//! a flag older than the stale window is treated as abandoned.

use super::source::AssignmentSource;
use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::error::FetchError;
use crate::host::id_param;
use crate::keys::{
    self, AssignmentsCache, AssignmentsCacheTimestamp, AssignmentsScanStartedAt,
    AssignmentsScanningInProgress,
};
use crate::palette::parse_year_semester;
use reskin_dom::{Document, NodeId, Selector};
use reskin_store::{PersistedStore, Record};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// A course found on the page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseLink {
    pub course_id: String,
    pub course_name: String,
    pub course_url: String,
}

/// One assignment found by the bulk scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScannedAssignment {
    pub course_id: String,
    pub course_name: String,
    pub assignment_id: String,
    pub assignment_name: String,
    pub assignment_url: String,
    pub course_url: String,
}

/// Bulk scan output, persisted as `assignmentsCache`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScanResult {
    pub assignments: Vec<ScannedAssignment>,
    /// Every scanned course, including those without assignments
    pub courses: Vec<(String, CourseLink)>,
}

/// Cooperative cancellation, checked between courses
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// Unraised flag
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the flag
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether the flag is raised
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Scan parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScanRequest {
    /// Ignore the cache and any scan in flight
    pub force_refresh: bool,
    /// Only courses of this Hebrew year
    pub filter_year: Option<u16>,
    /// Only courses of this semester column
    pub filter_semester: Option<u8>,
}

impl ScanRequest {
    /// Whether a course name passes the year and semester filters
    #[must_use]
    pub fn admits(&self, course_name: &str) -> bool {
        let ys = parse_year_semester(course_name);
        self.filter_year.map_or(true, |y| ys.year == Some(y))
            && self.filter_semester.map_or(true, |s| ys.sem_idx == Some(s))
    }
}

/// Unique course links under `scope`, first occurrence wins
#[must_use]
pub fn collect_course_links(doc: &Document, scope: NodeId) -> Vec<CourseLink> {
    let links = Selector::tag("a").and(Selector::attr_contains("href", "/course/view.php"));
    let mut seen = HashSet::new();
    doc.query_all(scope, &links)
        .into_iter()
        .filter_map(|link| {
            let href = doc.attr(link, "href")?;
            let course_id = id_param(&href)?;
            if !seen.insert(course_id.clone()) {
                return None;
            }
            let text = doc.text_content(link);
            let course_name = if text.trim().is_empty() {
                format!("קורס {course_id}")
            } else {
                text.trim().to_string()
            };
            Some(CourseLink {
                course_id,
                course_name,
                course_url: href,
            })
        })
        .collect()
}

/// Bulk scanner guarded by the persisted scan flag
#[derive(Debug, Clone)]
pub struct BulkScanner {
    store: PersistedStore,
    clock: Arc<dyn Clock>,
    bulk_ttl_ms: i64,
    poll: Duration,
    stale_ms: i64,
    claim: Arc<Mutex<()>>,
}

impl BulkScanner {
    /// Create scanner over `store`
    #[must_use]
    pub fn new(store: PersistedStore, clock: Arc<dyn Clock>, config: &EngineConfig) -> Self {
        Self {
            store,
            clock,
            bulk_ttl_ms: i64::try_from(config.bulk_ttl_ms).unwrap_or(i64::MAX),
            poll: config.scan_poll(),
            stale_ms: i64::try_from(config.scan_stale_ms).unwrap_or(i64::MAX),
            claim: Arc::new(Mutex::new(())),
        }
    }

    /// Cached scan result while younger than the bulk TTL
    pub async fn cached(&self) -> Option<ScanResult> {
        let timestamp = self.store.load::<AssignmentsCacheTimestamp>().await;
        if self.clock.now_ms().saturating_sub(timestamp) >= self.bulk_ttl_ms {
            return None;
        }
        self.store.load::<AssignmentsCache>().await
    }

    /// Whether a scan holds the flag
    pub async fn in_progress(&self) -> bool {
        self.store.load::<AssignmentsScanningInProgress>().await
    }

    /// Scan `links`, or wait for the scan in flight and serve its result
    pub async fn scan(
        &self,
        request: ScanRequest,
        links: &[CourseLink],
        source: &dyn AssignmentSource,
        cancel: &CancelFlag,
    ) -> Result<ScanResult, FetchError> {
        loop {
            if cancel.is_cancelled() {
                return Err(FetchError::Cancelled);
            }
            let claim = self.claim.lock().await;
            if self.in_progress().await && !request.force_refresh {
                let started = self.store.load::<AssignmentsScanStartedAt>().await;
                if self.clock.now_ms().saturating_sub(started) < self.stale_ms {
                    drop(claim);
                    tracing::debug!("bulk scan in flight, waiting");
                    tokio::time::sleep(self.poll).await;
                    continue;
                }
                tracing::warn!(started, "abandoned scan flag, taking over");
            } else if !request.force_refresh {
                if let Some(cached) = self.cached().await {
                    tracing::debug!(courses = cached.courses.len(), "serving cached scan");
                    return Ok(cached);
                }
            }
            self.set_flag(true).await;
            break;
        }

        let result = self.run(request, links, source, cancel).await;
        match &result {
            Ok(scan) => {
                let now = self.clock.now_ms();
                let mut items = Record::new();
                items.extend(
                    [
                        keys::encode::<AssignmentsCache>(&Some(scan.clone())),
                        keys::encode::<AssignmentsCacheTimestamp>(&now),
                        keys::encode::<AssignmentsScanningInProgress>(&false),
                    ]
                    .into_iter()
                    .flatten(),
                );
                self.store.set(items).await;
                tracing::info!(
                    courses = scan.courses.len(),
                    assignments = scan.assignments.len(),
                    "bulk scan finished"
                );
            }
            Err(e) => {
                tracing::info!(error = %e, "bulk scan stopped");
                self.set_flag(false).await;
            }
        }
        result
    }

    async fn run(
        &self,
        request: ScanRequest,
        links: &[CourseLink],
        source: &dyn AssignmentSource,
        cancel: &CancelFlag,
    ) -> Result<ScanResult, FetchError> {
        let selected: Vec<&CourseLink> = links.iter().filter(|l| request.admits(&l.course_name)).collect();
        tracing::info!(found = links.len(), selected = selected.len(), "bulk scan started");

        let mut result = ScanResult::default();
        for link in selected {
            if cancel.is_cancelled() {
                return Err(FetchError::Cancelled);
            }
            result.courses.push((link.course_id.clone(), link.clone()));
            match source.scan_course(link).await {
                Ok(found) => {
                    let mut seen = HashSet::new();
                    result
                        .assignments
                        .extend(found.into_iter().filter(|a| seen.insert(a.assignment_id.clone())));
                }
                Err(e) => {
                    tracing::warn!(course_id = %link.course_id, error = %e, "course scan failed, skipping");
                }
            }
        }
        Ok(result)
    }

    async fn set_flag(&self, on: bool) {
        let mut items = Record::new();
        items.extend(
            [
                keys::encode::<AssignmentsScanningInProgress>(&on),
                on.then(|| keys::encode::<AssignmentsScanStartedAt>(&self.clock.now_ms()))
                    .flatten(),
            ]
            .into_iter()
            .flatten(),
        );
        self.store.set(items).await;
    }
}
