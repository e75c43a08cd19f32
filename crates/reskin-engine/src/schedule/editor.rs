//! Schedule editor working copy
//!
//! The editor never touches the book until it is saved or removed.
//! Closing drops the working copy.

use super::lifecycle::{validate_transition, EntryState};
use super::model::{ScheduleBook, ScheduleEntry, Session, SessionTime, Weekday};
use crate::error::ScheduleError;
use serde::{Deserialize, Serialize};

/// Course identity as read from a card or a weekly view item
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CourseRef {
    #[serde(rename = "courseId")]
    pub id: String,
    #[serde(rename = "courseName")]
    pub name: String,
    #[serde(rename = "courseUrl")]
    pub url: String,
}

/// How a draft ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorOutcome {
    /// Stored with the draft's sessions
    Saved,
    /// Deleted (explicitly, or saved with no sessions)
    Removed,
    /// Discarded without touching the book
    Discarded,
}

/// Draft of one course's schedule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleEditor {
    course: CourseRef,
    sessions: Vec<Session>,
    opened_from: EntryState,
    state: EntryState,
}

impl ScheduleEditor {
    /// Open a draft, copying the stored sessions if any
    #[must_use]
    pub fn open(book: &ScheduleBook, course: CourseRef) -> Self {
        let (sessions, opened_from) = match book.get(&course.id) {
            Some(entry) => (entry.sessions.clone(), EntryState::Saved),
            None => (Vec::new(), EntryState::Absent),
        };
        Self {
            course,
            sessions,
            opened_from,
            state: EntryState::Draft,
        }
    }

    /// Course being edited
    #[must_use]
    pub fn course(&self) -> &CourseRef {
        &self.course
    }

    /// Draft sessions
    #[must_use]
    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    /// Lifecycle state
    #[must_use]
    pub fn state(&self) -> EntryState {
        self.state
    }

    /// Append an untimed sunday session
    pub fn add_session(&mut self) -> usize {
        self.sessions.push(Session::on(Weekday::Sunday));
        self.sessions.len() - 1
    }

    /// Drop a session
    pub fn remove_session(&mut self, index: usize) -> Result<Session, ScheduleError> {
        self.check(index)?;
        Ok(self.sessions.remove(index))
    }

    /// Change a session's day
    pub fn set_day(&mut self, index: usize, day: &str) -> Result<(), ScheduleError> {
        self.check(index)?;
        self.sessions[index].day = day.parse()?;
        Ok(())
    }

    /// Change a session's start time (`""` clears)
    pub fn set_start(&mut self, index: usize, time: &str) -> Result<(), ScheduleError> {
        self.check(index)?;
        self.sessions[index].start_time = SessionTime::parse(time)?;
        Ok(())
    }

    /// Change a session's end time (`""` clears)
    pub fn set_end(&mut self, index: usize, time: &str) -> Result<(), ScheduleError> {
        self.check(index)?;
        self.sessions[index].end_time = SessionTime::parse(time)?;
        Ok(())
    }

    fn check(&self, index: usize) -> Result<(), ScheduleError> {
        if index < self.sessions.len() {
            Ok(())
        } else {
            Err(ScheduleError::SessionOutOfRange {
                index,
                len: self.sessions.len(),
            })
        }
    }

    /// Commit the draft. With no sessions this deletes the course.
    pub fn save(mut self, book: &mut ScheduleBook) -> Result<EditorOutcome, ScheduleError> {
        if self.sessions.is_empty() {
            return self.remove(book);
        }
        validate_transition(self.state, EntryState::Saved)?;
        self.state = EntryState::Saved;
        book.upsert(
            self.course.id.clone(),
            ScheduleEntry {
                name: self.course.name,
                url: self.course.url,
                sessions: self.sessions,
            },
        );
        Ok(EditorOutcome::Saved)
    }

    /// Delete the course
    pub fn remove(mut self, book: &mut ScheduleBook) -> Result<EditorOutcome, ScheduleError> {
        validate_transition(self.state, EntryState::Removed)?;
        self.state = EntryState::Removed;
        book.remove(&self.course.id);
        Ok(EditorOutcome::Removed)
    }

    /// Discard the draft. Returns the state the entry is left in.
    #[must_use]
    pub fn close(self) -> EntryState {
        match self.opened_from {
            EntryState::Saved => EntryState::Saved,
            _ => EntryState::Absent,
        }
    }
}
