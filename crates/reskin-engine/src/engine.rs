//! Page coordinator
//!
//! Owns the process-wide state loaded from the store, the mutation batcher
//! and the save lane, and routes delegated events to their actions. The
//! document itself belongs to the caller and is passed in per call; every
//! engine write happens under the reconcile guard with engine origin, so it
//! never re-arms the batcher.

use crate::calendar::{self, CustomEvent, DayEvent, DaySources, EventDraft};
use crate::carousel;
use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::error::{CalendarError, Result};
use crate::favorites::{FavoritesSet, GROUP_CLASS};
use crate::fetch::{
    active_assignments, collect_course_links, should_show, Assignment, AssignmentLookup, AssignmentSource,
    BulkScanner, CancelFlag, ScanRequest, ScanResult, ScannedAssignment, SubmissionStatus,
};
use crate::host::{id_param, CompiledContract};
use crate::keys::{
    AssignmentFilterSemester, AssignmentFilterYear, AssignmentsCache, CardStyleKey, ColumnCountKey,
    CourseAssignments, CourseSchedules, CourseSchedulesSchemaVersion, CustomEvents, DueDateCache,
    FavoriteCourseIds, HideSubmittedAssignments, MaxOverdueDays, PaletteByYearHeb, ScheduleViewVisible,
    SubmissionStatusCache, ViewModeKey, KEY_AREAS,
};
use crate::observer::{BatchStats, MutationBatcher};
use crate::prefs::ViewPreferences;
use crate::prompt::{
    UserPrompt, CONFIRM_DELETE_ALL, CONFIRM_DELETE_ALL_AGAIN, CONFIRM_DELETE_EVENT, DELETED_ALL, NOTHING_TO_DELETE,
};
use crate::reconcile::{
    self, PassInput, PassReport, CLICKABLE_CLASS, CLICK_KEY, DRAG_START_KEY, DROP_KEY, FAV_CLASS,
    SCHEDULE_BTN_CLASS,
};
use crate::schedule::{
    migrate, CourseRef, EditorOutcome, ScheduleBook, ScheduleEditor, ScheduleSaver, Session, Weekday,
    CURRENT_SCHEMA_VERSION, DAY_COURSES_CLASS, DELETE_ALL_CLASS, EDIT_CLASS, TOGGLE_ID,
};
use chrono::NaiveDate;
use parking_lot::{Mutex, RwLock};
use reskin_dom::{Document, EventKind, MutationOrigin, NodeId, Selector};
use reskin_store::{ChangeSubscription, PersistedStore, Record, StoreArea, StoreChange, StoreKey};
use serde_json::Value;
use std::sync::Arc;

/// What a schedule control hands to a drop target
pub type DragPayload = CourseRef;

/// State shared by every pass, mirrored from the store
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppState {
    pub favorites: FavoritesSet,
    pub prefs: ViewPreferences,
    pub schedules: ScheduleBook,
    pub schedule_visible: bool,
    pub max_overdue_days: u32,
    pub hide_submitted: bool,
    pub filter_year: Option<u16>,
    pub filter_semester: Option<u8>,
}

impl AppState {
    /// Number of mirrored fields that differ from `other`
    fn differing_fields(&self, other: &Self) -> usize {
        [
            self.favorites != other.favorites,
            self.prefs.view_mode != other.prefs.view_mode,
            self.prefs.card_style != other.prefs.card_style,
            self.prefs.column_count != other.prefs.column_count,
            self.prefs.color_palette != other.prefs.color_palette,
            self.schedules != other.schedules,
            self.schedule_visible != other.schedule_visible,
            self.max_overdue_days != other.max_overdue_days,
            self.hide_submitted != other.hide_submitted,
            self.filter_year != other.filter_year,
            self.filter_semester != other.filter_semester,
        ]
        .into_iter()
        .filter(|&d| d)
        .count()
    }
}

#[derive(Debug, Default)]
struct PageContext {
    url: String,
    dragging: Option<DragPayload>,
}

/// Action a delegated click resolves to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiAction {
    /// Flip a course's favorite flag
    ToggleFavorite(String),
    /// Open the schedule editor; the modal belongs to the caller
    OpenScheduleEditor(CourseRef),
    /// Follow a course link; navigation belongs to the caller
    Navigate(String),
    /// Show or hide the weekly schedule
    ToggleScheduleView,
    /// Clear every schedule after confirmation
    DeleteAllSchedules,
    /// Move a carousel strip by one card
    CarouselStep { strip: NodeId, delta: i64 },
    /// Move a carousel strip to a card
    CarouselJump { strip: NodeId, index: usize },
}

/// Result of delete-all
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteAllOutcome {
    /// The book was already empty
    NothingToDelete,
    /// The user declined one of the confirmations
    Declined,
    /// Every entry was removed
    Deleted(usize),
}

/// Result of a drop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropOutcome {
    /// A session was added
    Added { course_id: String, day: Weekday },
    /// The time picker was dismissed; nothing changed
    Cancelled,
    /// Nothing droppable under the pointer, or nothing being dragged
    Ignored,
}

/// One row of the assignments overview
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignmentRow {
    pub assignment: ScannedAssignment,
    pub due_date_epoch: Option<i64>,
    pub status: Option<SubmissionStatus>,
}

/// Engine for one page
#[derive(Debug)]
pub struct Engine {
    config: EngineConfig,
    contract: CompiledContract,
    store: PersistedStore,
    clock: Arc<dyn Clock>,
    prompt: Arc<dyn UserPrompt>,
    batcher: MutationBatcher,
    state: RwLock<AppState>,
    page: Mutex<PageContext>,
    changes: Mutex<ChangeSubscription>,
    saver: ScheduleSaver,
    lookup: AssignmentLookup,
    scanner: BulkScanner,
    calendar_lane: tokio::sync::Mutex<()>,
}

impl Engine {
    /// Load state from `store` and get ready to attach to a page
    ///
    /// Stored schedules are migrated before anything reads them, and written
    /// back when the migration changed them or they predate the current
    /// schema version.
    pub async fn start(
        config: EngineConfig,
        store: PersistedStore,
        clock: Arc<dyn Clock>,
        prompt: Arc<dyn UserPrompt>,
    ) -> Result<Self> {
        config.validate()?;
        let contract = config.host.compile()?;
        let changes = store.subscribe();
        let saver = ScheduleSaver::new(store.clone(), config.save_retry());

        let (state, needs_persist) = load_state(&store, &config).await;
        if needs_persist {
            tracing::info!(courses = state.schedules.len(), "persisting migrated schedules");
            saver.save(state.schedules.clone()).await;
        }
        tracing::info!(
            favorites = state.favorites.len(),
            schedules = state.schedules.len(),
            view_mode = ?state.prefs.view_mode,
            "engine started"
        );

        Ok(Self {
            lookup: AssignmentLookup::new(store.clone(), clock.clone(), &config),
            scanner: BulkScanner::new(store.clone(), clock.clone(), &config),
            config,
            contract,
            store,
            clock,
            prompt,
            batcher: MutationBatcher::new(),
            state: RwLock::new(state),
            page: Mutex::new(PageContext::default()),
            changes: Mutex::new(changes),
            saver,
            calendar_lane: tokio::sync::Mutex::new(()),
        })
    }

    /// Configuration in effect
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Compiled host selectors
    #[must_use]
    pub fn contract(&self) -> &CompiledContract {
        &self.contract
    }

    /// Store handle
    #[must_use]
    pub fn store(&self) -> &PersistedStore {
        &self.store
    }

    /// Snapshot of the shared state
    #[must_use]
    pub fn state(&self) -> AppState {
        self.state.read().clone()
    }

    /// Batching counters
    #[must_use]
    pub fn stats(&self) -> BatchStats {
        self.batcher.stats()
    }

    /// Cached assignment lookups
    #[must_use]
    pub fn lookup(&self) -> &AssignmentLookup {
        &self.lookup
    }

    /// Single-flight bulk scanner
    #[must_use]
    pub fn scanner(&self) -> &BulkScanner {
        &self.scanner
    }

    /// Bind to a page at `url` and run the first pass
    ///
    /// Visiting an assignment page forgets its cached submission status,
    /// since the visit may have changed it.
    pub async fn attach(&self, doc: &mut Document, url: &str) -> Option<PassReport> {
        self.page.lock().url = url.to_string();
        if url.contains("/mod/assign/view.php") {
            if let Some(assignment_id) = id_param(url) {
                self.lookup.forget_status(&assignment_id).await;
            }
        }
        self.batcher.request();
        self.tick(doc)
    }

    /// Feed queued host records to the batcher. Returns whether a pass got scheduled.
    pub fn observe(&self, doc: &mut Document) -> bool {
        let records = doc.take_records();
        if records.is_empty() {
            return false;
        }
        self.batcher.observe_in(doc, doc.body(), &records)
    }

    /// Frame callback: run the scheduled pass, if any
    pub fn tick(&self, doc: &mut Document) -> Option<PassReport> {
        self.observe(doc);
        if !self.batcher.take_scheduled() {
            return None;
        }
        Some(self.reconcile(doc))
    }

    /// Run one pass now. Failures are logged; the pass never errors out.
    pub fn reconcile(&self, doc: &mut Document) -> PassReport {
        let state = self.state.read().clone();
        let url = self.page.lock().url.clone();
        let input = PassInput {
            contract: &self.contract,
            favorites: &state.favorites,
            prefs: &state.prefs,
            schedules: &state.schedules,
            schedule_visible: state.schedule_visible,
            placeholder_url: &self.config.placeholder_url,
            url: &url,
        };
        match self.write(doc, |doc| reconcile::reconcile(doc, &input)) {
            Ok(report) => {
                tracing::debug!(cards = report.cards, grids = report.grids, "reconciled");
                report
            }
            Err(e) => {
                tracing::warn!(error = %e, "reconciliation pass failed");
                PassReport::default()
            }
        }
    }

    /// Apply engine writes under the guard, stamped as engine records
    fn write<R>(&self, doc: &mut Document, f: impl FnOnce(&mut Document) -> R) -> R {
        self.observe(doc);
        let _guard = self.batcher.enter();
        let out = doc.with_origin(MutationOrigin::Engine, f);
        let records = doc.take_records();
        self.batcher.observe(&records);
        out
    }

    // ------------------------------------------------------------------
    // Store synchronisation
    // ------------------------------------------------------------------

    /// Apply every queued store change. Returns how many affected the state.
    ///
    /// When the subscription fell behind, the missed changes cannot be
    /// replayed, so the whole state is reloaded from the store instead and
    /// the count is the number of state fields that differed.
    pub async fn sync_from_store(&self) -> usize {
        let drained = self.changes.lock().drain();
        if !drained.lagged() {
            return drained.changes.iter().filter(|c| self.apply_store_change(c)).count();
        }

        tracing::warn!(skipped = drained.skipped, "store changes missed, reloading state");
        self.lookup.courses().invalidate_front();
        let (fresh, needs_persist) = load_state(&self.store, &self.config).await;
        let differing = {
            let mut state = self.state.write();
            let differing = state.differing_fields(&fresh);
            *state = fresh;
            differing
        };
        if needs_persist {
            let book = self.state.read().schedules.clone();
            self.saver.save(book).await;
        }
        if differing > 0 {
            self.batcher.request();
        }
        differing
    }

    /// Mirror one change, from any context and any area, into the state
    pub fn apply_store_change(&self, change: &StoreChange) -> bool {
        let key = change.key.as_str();
        let value = change.new_value.as_ref();
        if is::<CourseAssignments>(key) {
            self.lookup.courses().invalidate_front();
            return false;
        }

        let mut state = self.state.write();
        if is::<FavoriteCourseIds>(key) {
            state.favorites = PersistedStore::decode::<FavoriteCourseIds>(value);
        } else if is::<CourseSchedules>(key) {
            state.schedules = migrate(value.unwrap_or(&Value::Null), CURRENT_SCHEMA_VERSION).book;
        } else if is::<ViewModeKey>(key) {
            state.prefs.view_mode = PersistedStore::decode::<ViewModeKey>(value);
        } else if is::<CardStyleKey>(key) {
            state.prefs.card_style = PersistedStore::decode::<CardStyleKey>(value);
        } else if is::<ColumnCountKey>(key) {
            state.prefs.column_count = PersistedStore::decode::<ColumnCountKey>(value);
        } else if is::<PaletteByYearHeb>(key) {
            state.prefs.color_palette = PersistedStore::decode::<PaletteByYearHeb>(value);
        } else if is::<ScheduleViewVisible>(key) {
            state.schedule_visible = PersistedStore::decode::<ScheduleViewVisible>(value);
        } else if is::<MaxOverdueDays>(key) {
            state.max_overdue_days = max_overdue(value, &self.config);
        } else if is::<HideSubmittedAssignments>(key) {
            state.hide_submitted = PersistedStore::decode::<HideSubmittedAssignments>(value);
        } else if is::<AssignmentFilterYear>(key) {
            state.filter_year = PersistedStore::decode::<AssignmentFilterYear>(value);
        } else if is::<AssignmentFilterSemester>(key) {
            state.filter_semester = PersistedStore::decode::<AssignmentFilterSemester>(value);
        } else {
            return false;
        }
        drop(state);
        tracing::debug!(key, area = %change.area, "store change applied");
        self.batcher.request();
        true
    }

    // ------------------------------------------------------------------
    // Delegated events
    // ------------------------------------------------------------------

    fn delegated(doc: &Document, event: EventKind, target: NodeId, key: &str) -> bool {
        doc.dispatch(event, target).iter().any(|hit| hit.key == key)
    }

    fn course_ref(&self, doc: &Document, card: NodeId) -> Option<CourseRef> {
        Some(CourseRef {
            id: self.contract.course_id(doc, card)?,
            name: self.contract.course_name(doc, card),
            url: self.contract.course_url(doc, card),
        })
    }

    /// Resolve a click on `target` without acting on it
    #[must_use]
    pub fn resolve_click(&self, doc: &Document, target: NodeId) -> Option<UiAction> {
        if !Self::delegated(doc, EventKind::Click, target, CLICK_KEY) {
            return None;
        }
        let contract = &self.contract;
        let near = |class: &str| doc.closest(target, &Selector::class(class));

        if let Some(button) = near(FAV_CLASS) {
            let card = doc.closest(button, &contract.cards)?;
            return contract.course_id(doc, card).map(UiAction::ToggleFavorite);
        }
        if let Some(button) = near(SCHEDULE_BTN_CLASS) {
            let card = doc.closest(button, &contract.cards)?;
            return self.course_ref(doc, card).map(UiAction::OpenScheduleEditor);
        }
        if let Some(button) = near(EDIT_CLASS) {
            let id = doc.attr(button, "data-course-id")?;
            let state = self.state.read();
            let entry = state.schedules.get(&id)?;
            return Some(UiAction::OpenScheduleEditor(CourseRef {
                name: entry.name.clone(),
                url: entry.url.clone(),
                id,
            }));
        }
        if doc.closest(target, &Selector::id(TOGGLE_ID)).is_some() {
            return Some(UiAction::ToggleScheduleView);
        }
        if near(DELETE_ALL_CLASS).is_some() {
            return Some(UiAction::DeleteAllSchedules);
        }
        for (class, delta) in [(carousel::PREV_CLASS, -1), (carousel::NEXT_CLASS, 1)] {
            if let Some(button) = near(class) {
                let strip = strip_of(doc, button)?;
                return Some(UiAction::CarouselStep { strip, delta });
            }
        }
        if let Some(dot) = near(carousel::DOT_CLASS) {
            let strip = strip_of(doc, dot)?;
            let index = doc.attr(dot, carousel::DOT_INDEX_ATTR)?.parse().ok()?;
            return Some(UiAction::CarouselJump { strip, index });
        }

        // Whole-card navigation, unless the click landed on something interactive
        let card = doc.closest(target, &contract.cards)?;
        let interactive = Selector::any_of(["a", "button", "input", "select", "textarea", "label"].map(Selector::tag));
        if !doc.has_class(card, CLICKABLE_CLASS) || doc.closest(target, &interactive).is_some() {
            return None;
        }
        let url = contract.course_url(doc, card);
        (url != "#").then_some(UiAction::Navigate(url))
    }

    /// Handle a click and perform the engine's part of the action
    ///
    /// State changes schedule a pass for the next [`tick`](Self::tick).
    pub async fn handle_click(&self, doc: &mut Document, target: NodeId) -> Option<UiAction> {
        let action = self.resolve_click(doc, target)?;
        match &action {
            UiAction::ToggleFavorite(course_id) => {
                self.toggle_favorite(course_id).await;
            }
            UiAction::ToggleScheduleView => {
                let visible = !self.state.read().schedule_visible;
                self.set_schedule_visible(visible).await;
            }
            UiAction::DeleteAllSchedules => {
                self.delete_all_schedules().await;
            }
            UiAction::CarouselStep { strip, delta } => {
                if let Err(e) = self.write(doc, |doc| carousel::step(doc, *strip, *delta)) {
                    tracing::warn!(error = %e, "carousel step failed");
                }
            }
            UiAction::CarouselJump { strip, index } => {
                if let Err(e) = self.write(doc, |doc| carousel::jump(doc, *strip, *index)) {
                    tracing::warn!(error = %e, "carousel jump failed");
                }
            }
            UiAction::OpenScheduleEditor(_) | UiAction::Navigate(_) => {}
        }
        Some(action)
    }

    /// Start dragging a schedule control. Expands the weekly view.
    pub async fn handle_drag_start(&self, doc: &Document, target: NodeId) -> Option<DragPayload> {
        if !Self::delegated(doc, EventKind::DragStart, target, DRAG_START_KEY) {
            return None;
        }
        let button = doc.closest(target, &Selector::class(SCHEDULE_BTN_CLASS))?;
        let card = doc.closest(button, &self.contract.cards)?;
        let payload = self.course_ref(doc, card)?;
        self.page.lock().dragging = Some(payload.clone());
        if !self.state.read().schedule_visible {
            self.set_schedule_visible(true).await;
        }
        Some(payload)
    }

    /// Drag ended without a drop, or after one
    pub fn handle_drag_end(&self) -> Option<DragPayload> {
        self.page.lock().dragging.take()
    }

    /// Drop the dragged course on a day column
    ///
    /// Asks for the times first; dismissing the picker leaves everything as
    /// it was.
    pub async fn handle_drop(&self, doc: &Document, target: NodeId) -> Result<DropOutcome> {
        if !Self::delegated(doc, EventKind::Drop, target, DROP_KEY) {
            return Ok(DropOutcome::Ignored);
        }
        let Some(column) = doc.closest(target, &Selector::class(DAY_COURSES_CLASS)) else {
            return Ok(DropOutcome::Ignored);
        };
        let Some(day) = doc.attr(column, "data-day") else {
            return Ok(DropOutcome::Ignored);
        };
        let day: Weekday = day.parse()?;
        let Some(payload) = self.page.lock().dragging.take() else {
            return Ok(DropOutcome::Ignored);
        };

        let Some(times) = self.prompt.pick_times(&payload.name).await else {
            tracing::debug!(course_id = %payload.id, "drop cancelled");
            return Ok(DropOutcome::Cancelled);
        };
        let session = Session::timed(day, &times.start, &times.end)?;
        let book = {
            let mut state = self.state.write();
            state
                .schedules
                .add_session(&payload.id, &payload.name, &payload.url, session);
            state.schedules.clone()
        };
        self.saver.save(book).await;
        self.batcher.request();
        tracing::info!(course_id = %payload.id, day = day.as_str(), "session added by drop");
        Ok(DropOutcome::Added {
            course_id: payload.id,
            day,
        })
    }

    // ------------------------------------------------------------------
    // User operations
    // ------------------------------------------------------------------

    /// Flip a favorite. Returns the new membership.
    pub async fn toggle_favorite(&self, course_id: &str) -> bool {
        let (on, snapshot) = {
            let mut state = self.state.write();
            let on = state.favorites.toggle(course_id);
            (on, state.favorites.clone())
        };
        self.store.save::<FavoriteCourseIds>(&snapshot).await;
        self.batcher.request();
        tracing::debug!(course_id, favorite = on, "favorite toggled");
        on
    }

    /// Show or hide the weekly schedule
    pub async fn set_schedule_visible(&self, visible: bool) {
        self.state.write().schedule_visible = visible;
        self.store.save::<ScheduleViewVisible>(&visible).await;
        self.batcher.request();
    }

    /// Open a draft for `course`
    #[must_use]
    pub fn open_editor(&self, course: CourseRef) -> ScheduleEditor {
        ScheduleEditor::open(&self.state.read().schedules, course)
    }

    /// Commit a draft; an empty draft deletes the course
    pub async fn save_editor(&self, editor: ScheduleEditor) -> Result<EditorOutcome> {
        let (outcome, book) = {
            let mut state = self.state.write();
            let outcome = editor.save(&mut state.schedules)?;
            (outcome, state.schedules.clone())
        };
        self.saver.save(book).await;
        self.batcher.request();
        Ok(outcome)
    }

    /// Delete the draft's course
    pub async fn remove_from_editor(&self, editor: ScheduleEditor) -> Result<EditorOutcome> {
        let (outcome, book) = {
            let mut state = self.state.write();
            let outcome = editor.remove(&mut state.schedules)?;
            (outcome, state.schedules.clone())
        };
        self.saver.save(book).await;
        self.batcher.request();
        Ok(outcome)
    }

    /// Discard a draft
    pub fn close_editor(&self, editor: ScheduleEditor) -> EditorOutcome {
        let left_in = editor.close();
        tracing::debug!(state = ?left_in, "schedule draft discarded");
        EditorOutcome::Discarded
    }

    /// Clear every schedule after two confirmations
    pub async fn delete_all_schedules(&self) -> DeleteAllOutcome {
        let count = self.state.read().schedules.len();
        if count == 0 {
            self.prompt.alert(NOTHING_TO_DELETE).await;
            return DeleteAllOutcome::NothingToDelete;
        }
        if !self.prompt.confirm(CONFIRM_DELETE_ALL).await || !self.prompt.confirm(CONFIRM_DELETE_ALL_AGAIN).await {
            return DeleteAllOutcome::Declined;
        }
        let book = {
            let mut state = self.state.write();
            state.schedules.clear();
            state.schedules.clone()
        };
        self.saver.save(book).await;
        self.batcher.request();
        self.prompt.alert(DELETED_ALL).await;
        tracing::info!(count, "all schedules deleted");
        DeleteAllOutcome::Deleted(count)
    }

    // ------------------------------------------------------------------
    // Assignments
    // ------------------------------------------------------------------

    /// Active assignments of one course, within the overdue window
    pub async fn course_assignments(&self, source: &dyn AssignmentSource, course_id: &str) -> Vec<Assignment> {
        let records = self.lookup.course_assignments(source, course_id).await;
        let max_overdue_days = self.state.read().max_overdue_days;
        active_assignments(&records, self.clock.now_ms(), max_overdue_days)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Bulk scan the courses linked from `doc`, honouring the stored filters
    pub async fn scan_assignments(
        &self,
        doc: &Document,
        source: &dyn AssignmentSource,
        force_refresh: bool,
        cancel: &CancelFlag,
    ) -> Result<ScanResult> {
        let request = {
            let state = self.state.read();
            ScanRequest {
                force_refresh,
                filter_year: state.filter_year,
                filter_semester: state.filter_semester,
            }
        };
        let links = collect_course_links(doc, doc.root());
        Ok(self.scanner.scan(request, &links, source, cancel).await?)
    }

    /// Overview rows for a scan: due dates and statuses from the caches,
    /// filtered by the overdue window and the hide-submitted preference,
    /// earliest due first and undated last
    pub async fn assignment_rows(&self, source: &dyn AssignmentSource, scan: &ScanResult) -> Vec<AssignmentRow> {
        let (max_overdue_days, hide_submitted) = {
            let state = self.state.read();
            (state.max_overdue_days, state.hide_submitted)
        };
        let now = self.clock.now_ms();
        let mut rows = Vec::with_capacity(scan.assignments.len());
        for assignment in &scan.assignments {
            let id = &assignment.assignment_id;
            let url = &assignment.assignment_url;
            let due = self.lookup.due_date(source, id, url, false).await;
            if !should_show(due, now, max_overdue_days) {
                continue;
            }
            let status = self.lookup.submission_status(source, id, url, false).await;
            if hide_submitted && status == Some(SubmissionStatus::Submitted) {
                continue;
            }
            rows.push(AssignmentRow {
                assignment: assignment.clone(),
                due_date_epoch: due,
                status,
            });
        }
        rows.sort_by_key(|row| (row.due_date_epoch.is_none(), row.due_date_epoch));
        rows
    }

    // ------------------------------------------------------------------
    // Calendar
    // ------------------------------------------------------------------

    /// Stored calendar events, in the order they were added
    pub async fn custom_events(&self) -> Vec<CustomEvent> {
        self.store.load::<CustomEvents>().await
    }

    /// Add an event. Its id is the current time in millis.
    pub async fn add_custom_event(&self, draft: &EventDraft) -> Result<CustomEvent> {
        let _lane = self.calendar_lane.lock().await;
        let mut events = self.store.load::<CustomEvents>().await;
        let event = calendar::add_event(&mut events, draft, self.clock.now_ms())?;
        self.store.save::<CustomEvents>(&events).await;
        tracing::debug!(id = %event.id, date = %event.date, "calendar event added");
        Ok(event)
    }

    /// Replace an event's title, date and description
    pub async fn edit_custom_event(&self, id: &str, draft: &EventDraft) -> Result<CustomEvent> {
        let _lane = self.calendar_lane.lock().await;
        let mut events = self.store.load::<CustomEvents>().await;
        let event = calendar::edit_event(&mut events, id, draft)?;
        self.store.save::<CustomEvents>(&events).await;
        Ok(event)
    }

    /// Delete an event after confirmation. Returns false when declined.
    pub async fn delete_custom_event(&self, id: &str) -> Result<bool> {
        let _lane = self.calendar_lane.lock().await;
        let mut events = self.store.load::<CustomEvents>().await;
        if !events.iter().any(|e| e.id == id) {
            return Err(CalendarError::UnknownEvent(id.to_string()).into());
        }
        if !self.prompt.confirm(CONFIRM_DELETE_EVENT).await {
            return Ok(false);
        }
        calendar::remove_event(&mut events, id)?;
        self.store.save::<CustomEvents>(&events).await;
        tracing::debug!(id, "calendar event deleted");
        Ok(true)
    }

    /// Assignments due on `date` and the user's events that day, read from
    /// the caches without fetching
    pub async fn day_events(&self, date: NaiveDate) -> Vec<DayEvent> {
        let scan = self.store.load::<AssignmentsCache>().await;
        let due_dates = self.store.load::<DueDateCache>().await;
        let statuses = self.store.load::<SubmissionStatusCache>().await;
        let events = self.store.load::<CustomEvents>().await;
        let sources = DaySources {
            scan: scan.as_ref(),
            due_dates: &due_dates,
            statuses: &statuses,
            events: &events,
            offset: self.config.utc_offset(),
        };
        calendar::day_events(date, &sources)
    }

    /// Calendar day of the engine clock
    #[must_use]
    pub fn today(&self) -> NaiveDate {
        calendar::local_date(self.clock.now_ms(), self.config.utc_offset()).unwrap_or_default()
    }

    /// [`day_events`](Self::day_events) for [`today`](Self::today)
    pub async fn today_events(&self) -> Vec<DayEvent> {
        self.day_events(self.today()).await
    }
}

fn is<K: StoreKey>(key: &str) -> bool {
    key == K::NAME
}

fn strip_of(doc: &Document, control: NodeId) -> Option<NodeId> {
    let section = doc.closest(control, &Selector::class(GROUP_CLASS))?;
    doc.query(section, &Selector::class(carousel::CONTAINER_CLASS))
}

fn max_overdue(raw: Option<&Value>, config: &EngineConfig) -> u32 {
    match raw {
        None | Some(Value::Null) => config.default_max_overdue_days,
        Some(_) => PersistedStore::decode::<MaxOverdueDays>(raw),
    }
}

/// Read every key, one call per tier, and decode the state. Also reports whether
/// the schedules must be written back after migration.
async fn load_state(store: &PersistedStore, config: &EngineConfig) -> (AppState, bool) {
    let mut raw = Record::new();
    for area in [StoreArea::Local, StoreArea::Sync] {
        let defaults: Record = KEY_AREAS
            .iter()
            .filter(|(_, home)| *home == area)
            .map(|(name, _)| ((*name).to_string(), Value::Null))
            .collect();
        raw.extend(store.get_preferring(area, defaults).await);
    }
    let get = |name: &str| raw.get(name).filter(|v| !v.is_null());

    let version = PersistedStore::decode::<CourseSchedulesSchemaVersion>(get(CourseSchedulesSchemaVersion::NAME));
    let migration = migrate(get(CourseSchedules::NAME).unwrap_or(&Value::Null), version);
    if migration.changed {
        tracing::info!(from = version, to = CURRENT_SCHEMA_VERSION, "schedules migrated");
    }

    let state = AppState {
        favorites: PersistedStore::decode::<FavoriteCourseIds>(get(FavoriteCourseIds::NAME)),
        prefs: ViewPreferences {
            view_mode: PersistedStore::decode::<ViewModeKey>(get(ViewModeKey::NAME)),
            card_style: PersistedStore::decode::<CardStyleKey>(get(CardStyleKey::NAME)),
            column_count: PersistedStore::decode::<ColumnCountKey>(get(ColumnCountKey::NAME)),
            color_palette: PersistedStore::decode::<PaletteByYearHeb>(get(PaletteByYearHeb::NAME)),
        },
        schedules: migration.book,
        schedule_visible: PersistedStore::decode::<ScheduleViewVisible>(get(ScheduleViewVisible::NAME)),
        max_overdue_days: max_overdue(get(MaxOverdueDays::NAME), config),
        hide_submitted: PersistedStore::decode::<HideSubmittedAssignments>(get(HideSubmittedAssignments::NAME)),
        filter_year: PersistedStore::decode::<AssignmentFilterYear>(get(AssignmentFilterYear::NAME)),
        filter_semester: PersistedStore::decode::<AssignmentFilterSemester>(get(AssignmentFilterSemester::NAME)),
    };
    (state, migration.needs_persist)
}
