//! Versioned schedule migration
//!
//! Stored schedules went through three shapes:
//! - v0: a bare array of day names per course
//! - v1: `{days, name}`
//! - v2: `{name, url, sessions: [{day, startTime, endTime}]}`
//!
//! v3 is v2 sanitised: no saturday or unknown days, no malformed times, no
//! course without sessions. Every step runs on every load and rewrites only
//! entries still in the shape it handles, so a legacy entry written by an
//! older context under a newer version tag still converges. The stored
//! version only decides whether the result has to be written back.

use super::model::{ScheduleBook, SessionTime, Weekday};
use serde_json::{json, Map, Value};

/// Version written alongside migrated schedules
pub const CURRENT_SCHEMA_VERSION: u32 = 3;

/// Result of migrating a stored value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Migration {
    /// Migrated schedules
    pub book: ScheduleBook,
    /// The migrated value differs structurally from the stored one
    pub changed: bool,
    /// The caller must write the book and the current version back
    pub needs_persist: bool,
}

/// Migrate a raw stored `courseSchedules` value written at `stored_version`
#[must_use]
pub fn migrate(raw: &Value, stored_version: u32) -> Migration {
    let mut courses = match raw {
        Value::Object(map) => map.clone(),
        _ => Map::new(),
    };

    wrap_day_arrays(&mut courses);
    days_to_sessions(&mut courses);
    sanitize(&mut courses);

    let migrated = Value::Object(courses);
    let changed = migrated != *raw && !(raw.is_null() && migrated == json!({}));
    let book: ScheduleBook = match serde_json::from_value(migrated) {
        Ok(book) => book,
        Err(e) => {
            tracing::warn!(error = %e, "sanitised schedules failed to decode, starting empty");
            ScheduleBook::new()
        }
    };
    Migration {
        book,
        changed,
        needs_persist: changed || (stored_version < CURRENT_SCHEMA_VERSION && !raw.is_null()),
    }
}

/// v0 -> v1
fn wrap_day_arrays(courses: &mut Map<String, Value>) {
    for (course_id, entry) in courses.iter_mut() {
        if entry.is_array() {
            let days = entry.take();
            *entry = json!({ "days": days, "name": format!("קורס {course_id}") });
        }
    }
}

/// v1 -> v2
fn days_to_sessions(courses: &mut Map<String, Value>) {
    for entry in courses.values_mut() {
        let Value::Object(obj) = entry else { continue };
        if obj.contains_key("sessions") {
            continue;
        }
        let Some(Value::Array(days)) = obj.remove("days") else {
            continue;
        };
        let sessions: Vec<Value> = days
            .into_iter()
            .filter(|d| d.as_str() != Some("saturday"))
            .map(|day| json!({ "day": day, "startTime": "", "endTime": "" }))
            .collect();
        obj.insert("sessions".into(), Value::Array(sessions));
    }
}

/// v2 -> v3, always applied
fn sanitize(courses: &mut Map<String, Value>) {
    courses.retain(|course_id, entry| {
        let Value::Object(obj) = entry else {
            tracing::debug!(%course_id, "dropping non-object schedule entry");
            return false;
        };
        obj.remove("days");

        let sessions = match obj.remove("sessions") {
            Some(Value::Array(sessions)) => sessions,
            _ => Vec::new(),
        };
        let cleaned: Vec<Value> = sessions.into_iter().filter_map(clean_session).collect();
        if cleaned.is_empty() {
            return false;
        }
        obj.insert("sessions".into(), Value::Array(cleaned));

        if !obj.get("name").is_some_and(Value::is_string) {
            obj.insert("name".into(), Value::String(format!("קורס {course_id}")));
        }
        if !obj.get("url").is_some_and(Value::is_string) {
            obj.insert("url".into(), Value::String("#".into()));
        }
        true
    });
}

fn clean_session(session: Value) -> Option<Value> {
    let Value::Object(mut obj) = session else {
        return None;
    };
    let day = obj.get("day").and_then(Value::as_str)?;
    let day: Weekday = day.parse().ok()?;
    obj.insert("day".into(), Value::String(day.as_str().to_string()));
    for key in ["startTime", "endTime"] {
        let time = obj
            .get(key)
            .and_then(Value::as_str)
            .and_then(|t| SessionTime::parse(t).ok())
            .unwrap_or_default();
        obj.insert(key.into(), Value::String(time.to_string()));
    }
    Some(Value::Object(obj))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::model::Session;
    use pretty_assertions::assert_eq;

    #[test]
    fn legacy_day_array_becomes_sessions() {
        let raw = json!({ "12": ["sunday", "saturday", "tuesday"] });
        let m = migrate(&raw, 0);
        let entry = m.book.get("12").unwrap();
        assert_eq!(entry.name, "קורס 12");
        assert_eq!(entry.url, "#");
        assert_eq!(
            entry.sessions,
            vec![Session::on(Weekday::Sunday), Session::on(Weekday::Tuesday)]
        );
        assert!(m.changed && m.needs_persist);
    }

    #[test]
    fn saturday_only_course_is_deleted() {
        let raw = json!({
            "1": { "name": "A", "url": "#", "sessions": [{ "day": "saturday", "startTime": "", "endTime": "" }] },
            "2": { "days": ["saturday"], "name": "B" }
        });
        assert!(migrate(&raw, 0).book.is_empty());
    }

    #[test]
    fn current_data_is_left_alone() {
        let raw = json!({
            "5": { "name": "C", "url": "https://x/course/view.php?id=5",
                   "sessions": [{ "day": "monday", "startTime": "08:30", "endTime": "10:00" }] }
        });
        let m = migrate(&raw, CURRENT_SCHEMA_VERSION);
        assert!(!m.changed);
        assert!(!m.needs_persist);
        assert_eq!(m.book.len(), 1);
    }

    #[test]
    fn unversioned_clean_data_still_persists_version() {
        let raw = json!({
            "5": { "name": "C", "url": "#", "sessions": [{ "day": "monday", "startTime": "", "endTime": "" }] }
        });
        let m = migrate(&raw, 0);
        assert!(!m.changed);
        assert!(m.needs_persist);
    }

    #[test]
    fn malformed_times_are_cleared() {
        let raw = json!({
            "5": { "name": "C", "sessions": [{ "day": "monday", "startTime": "late", "endTime": "11:00" }] }
        });
        let m = migrate(&raw, CURRENT_SCHEMA_VERSION);
        let s = &m.book.get("5").unwrap().sessions[0];
        assert!(!s.start_time.is_set());
        assert_eq!(s.end_time.to_string(), "11:00");
        assert!(m.changed);
    }

    #[test]
    fn legacy_entries_under_a_current_version_are_migrated() {
        let raw = json!({
            "7": ["sunday"],
            "8": { "days": ["monday", "saturday"], "name": "B" }
        });
        let m = migrate(&raw, CURRENT_SCHEMA_VERSION);
        assert_eq!(m.book.len(), 2);
        assert_eq!(m.book.get("7").unwrap().sessions, vec![Session::on(Weekday::Sunday)]);
        let b = m.book.get("8").unwrap();
        assert_eq!(b.name, "B");
        assert_eq!(b.sessions, vec![Session::on(Weekday::Monday)]);
        assert!(m.changed && m.needs_persist);
    }

    #[test]
    fn missing_value_is_empty_and_unchanged() {
        let m = migrate(&Value::Null, 0);
        assert!(m.book.is_empty());
        assert!(!m.changed);
        assert!(!m.needs_persist);
    }
}
