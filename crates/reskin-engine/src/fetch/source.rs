//! Seam to the LMS scraper
//!
//! Network access and HTML scraping live behind this trait. The engine
//! only decides when to call it and what to cache.

use super::assignments::{Assignment, SubmissionStatus};
use super::scan::{CourseLink, ScannedAssignment};
use crate::error::FetchError;
use async_trait::async_trait;
use std::fmt::Debug;

/// Remote assignment data
#[async_trait]
pub trait AssignmentSource: Send + Sync + Debug {
    /// Assignments of one course, for the per-card badge
    async fn course_assignments(&self, course_id: &str) -> Result<Vec<Assignment>, FetchError>;

    /// Assignments reachable from one course page, for the bulk scan
    async fn scan_course(&self, course: &CourseLink) -> Result<Vec<ScannedAssignment>, FetchError>;

    /// Due date of one assignment, epoch millis
    async fn due_date(&self, assignment_url: &str) -> Result<Option<i64>, FetchError>;

    /// Submission status of one assignment
    async fn submission_status(&self, assignment_url: &str) -> Result<SubmissionStatus, FetchError>;
}
