//! Schedule data types

use crate::error::ScheduleError;
use chrono::NaiveTime;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Teaching day. Saturday is not a valid day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Weekday {
    Sunday,
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
}

impl Weekday {
    /// Days in week order
    pub const ALL: [Weekday; 6] = [
        Self::Sunday,
        Self::Monday,
        Self::Tuesday,
        Self::Wednesday,
        Self::Thursday,
        Self::Friday,
    ];

    /// Stored name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sunday => "sunday",
            Self::Monday => "monday",
            Self::Tuesday => "tuesday",
            Self::Wednesday => "wednesday",
            Self::Thursday => "thursday",
            Self::Friday => "friday",
        }
    }

    /// Column heading
    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Sunday => "ראשון",
            Self::Monday => "שני",
            Self::Tuesday => "שלישי",
            Self::Wednesday => "רביעי",
            Self::Thursday => "חמישי",
            Self::Friday => "שישי",
        }
    }
}

impl FromStr for Weekday {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|d| d.as_str() == s)
            .ok_or_else(|| ScheduleError::InvalidDay(s.to_string()))
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Optional `HH:MM` time; stored as `""` when unset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SessionTime(Option<NaiveTime>);

impl SessionTime {
    /// No time
    pub const UNSET: SessionTime = SessionTime(None);

    /// Parse `""`, `HH:MM` or `HH:MM:SS`
    pub fn parse(s: &str) -> Result<Self, ScheduleError> {
        let s = s.trim();
        if s.is_empty() {
            return Ok(Self::UNSET);
        }
        NaiveTime::parse_from_str(s, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
            .map(|t| Self(Some(t)))
            .map_err(|_| ScheduleError::InvalidTime(s.to_string()))
    }

    /// Time, if set
    #[must_use]
    pub fn get(self) -> Option<NaiveTime> {
        self.0
    }

    /// Whether a time is set
    #[must_use]
    pub fn is_set(self) -> bool {
        self.0.is_some()
    }

    /// Sort key placing unset times after every set time
    #[must_use]
    pub fn sort_key(self) -> (bool, Option<NaiveTime>) {
        (self.0.is_none(), self.0)
    }
}

impl fmt::Display for SessionTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(t) => write!(f, "{}", t.format("%H:%M")),
            None => Ok(()),
        }
    }
}

impl Serialize for SessionTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SessionTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Self::parse(raw.as_deref().unwrap_or("")).map_err(serde::de::Error::custom)
    }
}

/// One weekly time block
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub day: Weekday,
    #[serde(default)]
    pub start_time: SessionTime,
    #[serde(default)]
    pub end_time: SessionTime,
}

impl Session {
    /// Session on `day` with no times
    #[must_use]
    pub fn on(day: Weekday) -> Self {
        Self {
            day,
            start_time: SessionTime::UNSET,
            end_time: SessionTime::UNSET,
        }
    }

    /// Session with times
    pub fn timed(day: Weekday, start: &str, end: &str) -> Result<Self, ScheduleError> {
        Ok(Self {
            day,
            start_time: SessionTime::parse(start)?,
            end_time: SessionTime::parse(end)?,
        })
    }
}

/// Schedule of one course
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub name: String,
    #[serde(default = "default_url")]
    pub url: String,
    pub sessions: Vec<Session>,
}

fn default_url() -> String {
    "#".to_string()
}

/// Schedules keyed by course id. Never holds an entry without sessions.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScheduleBook(BTreeMap<String, ScheduleEntry>);

impl ScheduleBook {
    /// Empty book
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Entry for a course
    #[must_use]
    pub fn get(&self, course_id: &str) -> Option<&ScheduleEntry> {
        self.0.get(course_id)
    }

    /// Insert or replace; an entry without sessions deletes the course instead
    pub fn upsert(&mut self, course_id: impl Into<String>, entry: ScheduleEntry) {
        let course_id = course_id.into();
        if entry.sessions.is_empty() {
            self.0.remove(&course_id);
        } else {
            self.0.insert(course_id, entry);
        }
    }

    /// Append a session, creating the entry when absent
    pub fn add_session(&mut self, course_id: &str, name: &str, url: &str, session: Session) {
        self.0
            .entry(course_id.to_string())
            .or_insert_with(|| ScheduleEntry {
                name: name.to_string(),
                url: url.to_string(),
                sessions: Vec::new(),
            })
            .sessions
            .push(session);
    }

    /// Delete a course. Returns whether it existed.
    pub fn remove(&mut self, course_id: &str) -> bool {
        self.0.remove(course_id).is_some()
    }

    /// Delete everything
    pub fn clear(&mut self) {
        self.0.clear();
    }

    /// Number of courses
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// No courses
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Entries by course id
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ScheduleEntry)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn saturday_is_not_a_day() {
        assert_eq!("friday".parse::<Weekday>().unwrap(), Weekday::Friday);
        assert_eq!(
            "saturday".parse::<Weekday>().unwrap_err(),
            ScheduleError::InvalidDay("saturday".into())
        );
        assert!(serde_json::from_value::<Weekday>(json!("saturday")).is_err());
    }

    #[test]
    fn session_time_round_trips_through_strings() {
        let s: Session = serde_json::from_value(json!({"day": "monday", "startTime": "9:05", "endTime": ""}))
            .unwrap();
        assert_eq!(s.start_time.to_string(), "09:05");
        assert!(!s.end_time.is_set());
        assert_eq!(
            serde_json::to_value(&s).unwrap(),
            json!({"day": "monday", "startTime": "09:05", "endTime": ""})
        );
        assert!(SessionTime::parse("25:00").is_err());
    }

    #[test]
    fn empty_entry_is_never_kept() {
        let mut book = ScheduleBook::new();
        book.add_session("7", "Physics", "#", Session::on(Weekday::Sunday));
        assert_eq!(book.len(), 1);
        book.upsert("7", ScheduleEntry { name: "Physics".into(), url: "#".into(), sessions: vec![] });
        assert!(book.is_empty());
    }
}
