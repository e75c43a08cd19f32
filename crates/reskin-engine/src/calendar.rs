//! Calendar events
//!
//! Users keep their own dated events next to the assignments found by the
//! bulk scan. Events are edited as a whole list and persisted under
//! `customEvents`; a day's view merges them with the assignment caches.

use crate::error::CalendarError;
use crate::fetch::{status_key, ScanResult, ScannedAssignment, StatusStamp, SubmissionStatus};
use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Date format of event drafts and stored events
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A user-created calendar entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomEvent {
    pub id: String,
    pub title: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub description: String,
}

/// Form input for adding or editing an event
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EventDraft {
    pub title: String,
    /// `YYYY-MM-DD`
    pub date: String,
    pub description: String,
}

impl EventDraft {
    /// Draft with a title and a date
    #[must_use]
    pub fn new(title: impl Into<String>, date: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            date: date.into(),
            description: String::new(),
        }
    }

    /// Set the description
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Trimmed title, parsed date and trimmed description
    fn validate(&self) -> Result<(String, NaiveDate, String), CalendarError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(CalendarError::MissingTitle);
        }
        let date = NaiveDate::parse_from_str(self.date.trim(), DATE_FORMAT)
            .map_err(|_| CalendarError::InvalidDate(self.date.clone()))?;
        Ok((title.to_string(), date, self.description.trim().to_string()))
    }
}

/// Append an event built from `draft`, under `id` or the next free id after it
pub fn add_event(events: &mut Vec<CustomEvent>, draft: &EventDraft, id: i64) -> Result<CustomEvent, CalendarError> {
    let (title, date, description) = draft.validate()?;
    let mut id = id;
    while events.iter().any(|e| e.id == id.to_string()) {
        id += 1;
    }
    let event = CustomEvent {
        id: id.to_string(),
        title,
        date,
        description,
    };
    events.push(event.clone());
    Ok(event)
}

/// Replace the fields of event `id` with the draft's
pub fn edit_event(events: &mut [CustomEvent], id: &str, draft: &EventDraft) -> Result<CustomEvent, CalendarError> {
    let (title, date, description) = draft.validate()?;
    let event = events
        .iter_mut()
        .find(|e| e.id == id)
        .ok_or_else(|| CalendarError::UnknownEvent(id.to_string()))?;
    event.title = title;
    event.date = date;
    event.description = description;
    Ok(event.clone())
}

/// Remove event `id`
pub fn remove_event(events: &mut Vec<CustomEvent>, id: &str) -> Result<CustomEvent, CalendarError> {
    let index = events
        .iter()
        .position(|e| e.id == id)
        .ok_or_else(|| CalendarError::UnknownEvent(id.to_string()))?;
    Ok(events.remove(index))
}

/// One entry of a day's view
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DayEvent {
    /// A scanned assignment due that day
    Assignment {
        assignment: ScannedAssignment,
        due_date_epoch: i64,
        status: Option<SubmissionStatus>,
    },
    /// A user event on that day
    Custom(CustomEvent),
}

/// Calendar day of `epoch_ms` at `offset`
#[must_use]
pub fn local_date(epoch_ms: i64, offset: FixedOffset) -> Option<NaiveDate> {
    DateTime::from_timestamp_millis(epoch_ms).map(|utc| utc.with_timezone(&offset).date_naive())
}

/// Cached data a day's view is built from
#[derive(Debug, Clone, Copy)]
pub struct DaySources<'a> {
    pub scan: Option<&'a ScanResult>,
    pub due_dates: &'a BTreeMap<String, Option<i64>>,
    pub statuses: &'a BTreeMap<String, StatusStamp>,
    pub events: &'a [CustomEvent],
    pub offset: FixedOffset,
}

/// Everything on `date`: assignments due that day by due time, then user
/// events in the order they were added
///
/// Assignments without a cached due date are left out.
#[must_use]
pub fn day_events(date: NaiveDate, sources: &DaySources<'_>) -> Vec<DayEvent> {
    let mut due_that_day: Vec<(i64, &ScannedAssignment)> = sources
        .scan
        .map(|scan| scan.assignments.as_slice())
        .unwrap_or_default()
        .iter()
        .filter_map(|a| {
            let due = (*sources.due_dates.get(&a.assignment_id)?)?;
            (local_date(due, sources.offset)? == date).then_some((due, a))
        })
        .collect();
    due_that_day.sort_by_key(|(due, _)| *due);

    let assignments = due_that_day.into_iter().map(|(due, a)| DayEvent::Assignment {
        status: sources
            .statuses
            .get(&status_key(&a.assignment_id))
            .map(|stamp| stamp.status),
        assignment: a.clone(),
        due_date_epoch: due,
    });
    let custom = sources
        .events
        .iter()
        .filter(|e| e.date == date)
        .cloned()
        .map(DayEvent::Custom);
    assignments.chain(custom).collect()
}
