//! Fetch-and-cache layer
//!
//! Remote assignment data behind [`AssignmentSource`], cached with TTLs
//! measured on the engine clock, plus the single-flight bulk scan.

mod assignments;
mod cache;
mod lookup;
mod scan;
mod source;

pub use assignments::{active_assignments, should_show, Assignment, StatusStamp, SubmissionStatus};
pub use cache::{CacheEnvelope, CacheTable, FetchCache};
pub use lookup::{status_key, AssignmentLookup};
pub use scan::{collect_course_links, BulkScanner, CancelFlag, CourseLink, ScanRequest, ScanResult, ScannedAssignment};
pub use source::AssignmentSource;
