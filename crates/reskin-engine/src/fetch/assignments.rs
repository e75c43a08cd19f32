//! Assignment records and the "active" projection

use serde::{Deserialize, Serialize};

const MS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Submission state of one assignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    Submitted,
    NotSubmitted,
    #[default]
    Unknown,
}

/// One assignment of one course
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub id: String,
    pub name: String,
    /// Due date, epoch millis
    #[serde(default)]
    pub due_date_epoch: Option<i64>,
    pub url: String,
    #[serde(default)]
    pub submission_status: SubmissionStatus,
}

/// Cached submission status with the time it was observed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusStamp {
    pub status: SubmissionStatus,
    pub timestamp: i64,
}

/// Whether an assignment due at `due` is still worth showing at `now`
///
/// Undated and upcoming assignments always show. Overdue ones show while
/// the whole days overdue stay within `max_overdue_days`; 0 disables the
/// window.
#[must_use]
pub fn should_show(due: Option<i64>, now: i64, max_overdue_days: u32) -> bool {
    let Some(due) = due else {
        return true;
    };
    if due >= now || max_overdue_days == 0 {
        return true;
    }
    (now - due) / MS_PER_DAY <= i64::from(max_overdue_days)
}

/// Assignments still needing attention, in input order
///
/// Submitted records are excluded whatever their due date.
#[must_use]
pub fn active_assignments(records: &[Assignment], now: i64, max_overdue_days: u32) -> Vec<&Assignment> {
    records
        .iter()
        .filter(|a| a.submission_status != SubmissionStatus::Submitted)
        .filter(|a| should_show(a.due_date_epoch, now, max_overdue_days))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assignment(id: &str, due: Option<i64>, status: SubmissionStatus) -> Assignment {
        Assignment {
            id: id.to_string(),
            name: format!("Exercise {id}"),
            due_date_epoch: due,
            url: format!("https://lms.example/mod/assign/view.php?id={id}"),
            submission_status: status,
        }
    }

    #[test]
    fn overdue_window() {
        let now = 100 * MS_PER_DAY;
        assert!(should_show(None, now, 30));
        assert!(should_show(Some(now + 1), now, 30));
        assert!(should_show(Some(now - 30 * MS_PER_DAY - 5), now, 30));
        assert!(!should_show(Some(now - 31 * MS_PER_DAY), now, 30));
        assert!(should_show(Some(now - 31 * MS_PER_DAY), now, 0));
    }

    #[test]
    fn submitted_never_active() {
        let now = 10 * MS_PER_DAY;
        let records = vec![
            assignment("1", Some(now + MS_PER_DAY), SubmissionStatus::Submitted),
            assignment("2", Some(now + MS_PER_DAY), SubmissionStatus::NotSubmitted),
            assignment("3", None, SubmissionStatus::Unknown),
        ];
        let ids: Vec<&str> = active_assignments(&records, now, 30)
            .into_iter()
            .map(|a| a.id.as_str())
            .collect();
        assert_eq!(ids, vec!["2", "3"]);
    }

    #[test]
    fn wire_names() {
        let json = serde_json::to_value(assignment("5", Some(7), SubmissionStatus::NotSubmitted)).unwrap();
        assert_eq!(json["dueDateEpoch"], 7);
        assert_eq!(json["submissionStatus"], "not_submitted");
    }
}
