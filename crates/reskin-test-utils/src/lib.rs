//! Testing utilities for the reskin workspace
//!
//! Shared fixtures: tiered in-memory stores, a pinned clock, a scripted
//! prompt, a fake assignment source and LMS-shaped pages.

#![allow(missing_docs)]

use async_trait::async_trait;
use parking_lot::Mutex;
use reskin_dom::{CardSpec, Page, PageBuilder, PageLayout};
use reskin_engine::fetch::{Assignment, AssignmentSource, CourseLink, ScannedAssignment, SubmissionStatus};
use reskin_engine::keys::KEY_AREAS;
use reskin_engine::{Engine, EngineConfig, FetchError, TimeChoice, UserPrompt};
use reskin_store::{ChangeHub, MemoryBackend, PersistedStore, Record, StoreArea};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub use reskin_engine::ManualClock;

/// Fixed start time for pinned clocks
pub const T0: i64 = 1_700_000_000_000;

/// Store with both tiers exposed for fault injection
#[derive(Debug, Clone)]
pub struct TieredStore {
    pub store: PersistedStore,
    pub local: Arc<MemoryBackend>,
    pub sync: Arc<MemoryBackend>,
}

pub fn tiered_store() -> TieredStore {
    tiered_store_with(Record::new())
}

/// Tiered store seeded with `values`, each key in the tier it lives in.
/// Keys the engine does not know go to the local tier.
pub fn tiered_store_with(values: Record) -> TieredStore {
    let hub = ChangeHub::new();
    let (synced, local_values): (Record, Record) = values
        .into_iter()
        .partition(|(key, _)| KEY_AREAS.contains(&(key.as_str(), StoreArea::Sync)));
    let local = Arc::new(MemoryBackend::with_values(StoreArea::Local, hub.clone(), local_values));
    let sync = Arc::new(MemoryBackend::with_values(StoreArea::Sync, hub.clone(), synced));
    TieredStore {
        store: PersistedStore::new(local.clone(), sync.clone(), hub),
        local,
        sync,
    }
}

/// Build a record from a JSON object literal
pub fn record(value: Value) -> Record {
    match value {
        Value::Object(map) => map,
        other => panic!("record fixture must be an object, got {other}"),
    }
}

pub fn clock_at(ms: i64) -> Arc<ManualClock> {
    Arc::new(ManualClock::new(ms))
}

/// Config with short timers for paused-time tests
pub fn fast_config() -> EngineConfig {
    EngineConfig::default()
        .with_save_retry(Duration::from_millis(10))
        .with_scan_timing(Duration::from_millis(50), Duration::from_secs(60))
}

pub async fn start_engine(store: PersistedStore, clock: Arc<ManualClock>, prompt: Arc<ScriptedPrompt>) -> Engine {
    Engine::start(fast_config(), store, clock, prompt)
        .await
        .expect("engine starts with the default contract")
}

// ----------------------------------------------------------------------
// Pages
// ----------------------------------------------------------------------

/// Front page with cards `0..n`, ids equal to their index
pub fn frontpage(n: usize) -> Page {
    PageBuilder::new(PageLayout::Frontpage)
        .cards((0..n).map(|i| CardSpec::new(i.to_string(), format!("Course {i}"))))
        .build()
        .expect("front page builds")
}

/// Front page whose cards carry year and semester text
pub fn frontpage_with_terms(terms: &[(&str, &str)]) -> Page {
    PageBuilder::new(PageLayout::Frontpage)
        .cards(terms.iter().enumerate().map(|(i, (id, term))| {
            CardSpec::new(*id, format!("Course {i}")).with_text(*term)
        }))
        .build()
        .expect("front page builds")
}

pub fn dashboard(n: usize) -> Page {
    PageBuilder::new(PageLayout::Dashboard)
        .cards((0..n).map(|i| CardSpec::new(i.to_string(), format!("Course {i}"))))
        .build()
        .expect("dashboard builds")
}

// ----------------------------------------------------------------------
// Prompt
// ----------------------------------------------------------------------

/// Prompt that answers from queues and records what it was asked
///
/// Empty queues answer "no" to confirmations and dismiss the time picker.
#[derive(Debug, Default)]
pub struct ScriptedPrompt {
    confirms: Mutex<VecDeque<bool>>,
    times: Mutex<VecDeque<Option<TimeChoice>>>,
    pub asked: Mutex<Vec<String>>,
    pub alerts: Mutex<Vec<String>>,
}

impl ScriptedPrompt {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn confirming(answers: &[bool]) -> Arc<Self> {
        let prompt = Self::default();
        prompt.confirms.lock().extend(answers.iter().copied());
        Arc::new(prompt)
    }

    pub fn push_times(&self, choice: Option<TimeChoice>) {
        self.times.lock().push_back(choice);
    }

    pub fn asked(&self) -> Vec<String> {
        self.asked.lock().clone()
    }

    pub fn alerts(&self) -> Vec<String> {
        self.alerts.lock().clone()
    }
}

#[async_trait]
impl UserPrompt for ScriptedPrompt {
    async fn confirm(&self, message: &str) -> bool {
        self.asked.lock().push(message.to_string());
        self.confirms.lock().pop_front().unwrap_or(false)
    }

    async fn alert(&self, message: &str) {
        self.alerts.lock().push(message.to_string());
    }

    async fn pick_times(&self, course_name: &str) -> Option<TimeChoice> {
        self.asked.lock().push(format!("times for {course_name}"));
        self.times.lock().pop_front().flatten()
    }
}

// ----------------------------------------------------------------------
// Assignment source
// ----------------------------------------------------------------------

/// In-memory assignment source with call counters and optional latency
#[derive(Debug, Default)]
pub struct MockAssignmentSource {
    courses: Mutex<HashMap<String, Vec<Assignment>>>,
    scans: Mutex<HashMap<String, Vec<ScannedAssignment>>>,
    due_dates: Mutex<HashMap<String, Option<i64>>>,
    statuses: Mutex<HashMap<String, SubmissionStatus>>,
    failing: Mutex<Vec<String>>,
    latency: Mutex<Option<Duration>>,
    pub course_calls: AtomicUsize,
    pub scan_calls: AtomicUsize,
    pub due_calls: AtomicUsize,
    pub status_calls: AtomicUsize,
}

impl MockAssignmentSource {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_course(&self, course_id: &str, assignments: Vec<Assignment>) -> &Self {
        self.courses.lock().insert(course_id.to_string(), assignments);
        self
    }

    pub fn with_scan(&self, course_id: &str, assignments: Vec<ScannedAssignment>) -> &Self {
        self.scans.lock().insert(course_id.to_string(), assignments);
        self
    }

    pub fn with_due(&self, url: &str, due: Option<i64>) -> &Self {
        self.due_dates.lock().insert(url.to_string(), due);
        self
    }

    pub fn with_status(&self, url: &str, status: SubmissionStatus) -> &Self {
        self.statuses.lock().insert(url.to_string(), status);
        self
    }

    /// Fail every call about `key` (course id or assignment URL)
    pub fn fail(&self, key: &str) -> &Self {
        self.failing.lock().push(key.to_string());
        self
    }

    pub fn with_latency(&self, latency: Duration) -> &Self {
        *self.latency.lock() = Some(latency);
        self
    }

    pub fn calls(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    async fn enter(&self, counter: &AtomicUsize, key: &str) -> Result<(), FetchError> {
        counter.fetch_add(1, Ordering::SeqCst);
        let latency = *self.latency.lock();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        if self.failing.lock().iter().any(|k| k == key) {
            return Err(FetchError::source(key, "scripted failure"));
        }
        Ok(())
    }
}

#[async_trait]
impl AssignmentSource for MockAssignmentSource {
    async fn course_assignments(&self, course_id: &str) -> Result<Vec<Assignment>, FetchError> {
        self.enter(&self.course_calls, course_id).await?;
        self.courses
            .lock()
            .get(course_id)
            .cloned()
            .ok_or_else(|| FetchError::NotFound(course_id.to_string()))
    }

    async fn scan_course(&self, course: &CourseLink) -> Result<Vec<ScannedAssignment>, FetchError> {
        self.enter(&self.scan_calls, &course.course_id).await?;
        Ok(self.scans.lock().get(&course.course_id).cloned().unwrap_or_default())
    }

    async fn due_date(&self, assignment_url: &str) -> Result<Option<i64>, FetchError> {
        self.enter(&self.due_calls, assignment_url).await?;
        Ok(self.due_dates.lock().get(assignment_url).copied().flatten())
    }

    async fn submission_status(&self, assignment_url: &str) -> Result<SubmissionStatus, FetchError> {
        self.enter(&self.status_calls, assignment_url).await?;
        Ok(self
            .statuses
            .lock()
            .get(assignment_url)
            .copied()
            .unwrap_or_default())
    }
}

pub fn assignment(id: &str, due: Option<i64>, status: SubmissionStatus) -> Assignment {
    Assignment {
        id: id.to_string(),
        name: format!("Exercise {id}"),
        due_date_epoch: due,
        url: assignment_url(id),
        submission_status: status,
    }
}

pub fn scanned(course_id: &str, assignment_id: &str) -> ScannedAssignment {
    ScannedAssignment {
        course_id: course_id.to_string(),
        course_name: format!("Course {course_id}"),
        assignment_id: assignment_id.to_string(),
        assignment_name: format!("Exercise {assignment_id}"),
        assignment_url: assignment_url(assignment_id),
        course_url: format!("https://lms.example/course/view.php?id={course_id}"),
    }
}

pub fn assignment_url(id: &str) -> String {
    format!("https://lms.example/mod/assign/view.php?id={id}")
}
