//! User dialogs
//!
//! Only user-initiated destructive actions and the drop time picker talk to
//! the user. Background failures never do.

use async_trait::async_trait;
use std::fmt::Debug;

/// Shown when delete-all finds nothing
pub const NOTHING_TO_DELETE: &str = "אין קורסים במערכת למחיקה";
/// First delete-all confirmation
pub const CONFIRM_DELETE_ALL: &str =
    "⚠️ האם אתה בטוח שברצונך למחוק את כל הקורסים מהלוח זמנים?\n\nפעולה זו לא ניתנת לביטול!";
/// Second delete-all confirmation
pub const CONFIRM_DELETE_ALL_AGAIN: &str = "האם אתה בטוח לחלוטין? כל הקורסים יימחקו מהלוח זמנים.";
/// Shown after delete-all
pub const DELETED_ALL: &str = "כל הקורסים נמחקו מהלוח זמנים";
/// Confirmation before deleting a calendar event
pub const CONFIRM_DELETE_EVENT: &str = "האם אתה בטוח שברצונך למחוק אירוע זה?";

/// Times picked for a dropped course; empty strings when skipped
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TimeChoice {
    pub start: String,
    pub end: String,
}

impl TimeChoice {
    /// Choice with both times
    #[must_use]
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }

    /// The "skip" answer
    #[must_use]
    pub fn skipped() -> Self {
        Self::default()
    }
}

/// Modal dialogs
#[async_trait]
pub trait UserPrompt: Send + Sync + Debug {
    /// Yes/no question
    async fn confirm(&self, message: &str) -> bool;

    /// Notice
    async fn alert(&self, message: &str);

    /// Time picker; `None` when dismissed
    async fn pick_times(&self, course_name: &str) -> Option<TimeChoice>;
}

/// Prompt for headless runs: accepts every question and skips the times
#[derive(Debug, Clone, Copy, Default)]
pub struct Unattended;

#[async_trait]
impl UserPrompt for Unattended {
    async fn confirm(&self, message: &str) -> bool {
        tracing::info!(message, "auto-confirmed");
        true
    }

    async fn alert(&self, message: &str) {
        tracing::info!(message, "alert");
    }

    async fn pick_times(&self, course_name: &str) -> Option<TimeChoice> {
        tracing::info!(course_name, "time picker skipped");
        Some(TimeChoice::skipped())
    }
}
