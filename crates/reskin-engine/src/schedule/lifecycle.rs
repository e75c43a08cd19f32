//! Entry lifecycle
//!
//! `Absent -> Draft -> Saved | Removed`. Closing a draft returns to the
//! state it was opened from. A saved or removed entry can be reopened.

use crate::error::ScheduleError;
use serde::{Deserialize, Serialize};

/// Lifecycle state of one course's schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryState {
    /// No stored entry
    Absent,
    /// Open in the editor on a working copy
    Draft,
    /// Stored with at least one session
    Saved,
    /// Deleted by the user
    Removed,
}

/// Validate a lifecycle transition
pub fn validate_transition(from: EntryState, to: EntryState) -> Result<(), ScheduleError> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(ScheduleError::IllegalTransition { from, to })
    }
}

/// States reachable from `from`
#[must_use]
pub fn allowed_transitions(from: EntryState) -> Vec<EntryState> {
    use EntryState::{Absent, Draft, Removed, Saved};
    match from {
        Absent | Saved | Removed => vec![Draft],
        Draft => vec![Saved, Removed, Absent],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use EntryState::*;

    #[test]
    fn drafts_resolve_three_ways() {
        assert!(validate_transition(Absent, Draft).is_ok());
        assert!(validate_transition(Draft, Saved).is_ok());
        assert!(validate_transition(Draft, Removed).is_ok());
        assert!(validate_transition(Draft, Absent).is_ok());
    }

    #[test]
    fn no_direct_save_without_draft() {
        assert_eq!(
            validate_transition(Absent, Saved),
            Err(ScheduleError::IllegalTransition { from: Absent, to: Saved })
        );
        assert!(validate_transition(Saved, Removed).is_err());
    }
}
