//! Persisted store schema
//!
//! One zero-sized type per flat key. Every key carries its default, so a
//! missing or undecodable value never reaches business logic as a hole.
//! User settings (favorites, view preferences, assignment filters) live in
//! the sync tier so they follow the profile across devices; schedules and
//! caches live in the local tier.

use crate::calendar::CustomEvent;
use crate::favorites::FavoritesSet;
use crate::fetch::{Assignment, CacheTable, ScanResult, StatusStamp};
use crate::palette::Palette;
use crate::prefs::{CardStyle, ColumnCount, ViewMode};
use crate::schedule::ScheduleBook;
use reskin_store::{StoreArea, StoreKey};
use serde_json::Value;
use std::collections::BTreeMap;

macro_rules! key_area {
    () => {
        StoreArea::Local
    };
    (sync) => {
        StoreArea::Sync
    };
}

macro_rules! store_keys {
    ($( $(#[$meta:meta])* $ty:ident => $(@$area:ident)? $name:literal : $value:ty = $default:expr; )*) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
            pub struct $ty;

            impl StoreKey for $ty {
                const NAME: &'static str = $name;
                type Value = $value;
                const AREA: StoreArea = key_area!($($area)?);

                fn default_value() -> $value {
                    $default
                }
            }
        )*

        /// Every key name, in declaration order
        pub const ALL_KEYS: &[&str] = &[$($name),*];

        /// Every key name with the tier it lives in
        pub const KEY_AREAS: &[(&str, StoreArea)] = &[$(($name, key_area!($($area)?))),*];
    };
}

store_keys! {
    /// Favorite course ids
    FavoriteCourseIds => @sync "favoriteCourseIds": FavoritesSet = FavoritesSet::new();
    /// Weekly schedule book
    CourseSchedules => "courseSchedules": ScheduleBook = ScheduleBook::new();
    /// Schema version of `courseSchedules`; absent means pre-versioning
    CourseSchedulesSchemaVersion => "courseSchedulesSchemaVersion": u32 = 0;
    /// Per-course assignment lists with fetch timestamps
    CourseAssignments => "courseAssignments": CacheTable<Vec<Assignment>> = BTreeMap::new();
    /// Listing presentation
    ViewModeKey => @sync "viewMode": ViewMode = ViewMode::default();
    /// Card skin
    CardStyleKey => @sync "cardStyle": CardStyle = CardStyle::default();
    /// Grid columns
    ColumnCountKey => @sync "columnCount": ColumnCount = ColumnCount::default();
    /// Year × semester colour matrix; absent means the built-in palette
    PaletteByYearHeb => @sync "paletteByYearHeb": Option<Palette> = None;
    /// Whether the weekly schedule is expanded
    ScheduleViewVisible => "scheduleViewVisible": bool = false;
    /// Result of the last bulk scan
    AssignmentsCache => "assignmentsCache": Option<ScanResult> = None;
    /// When the last bulk scan finished, epoch millis
    AssignmentsCacheTimestamp => "assignmentsCacheTimestamp": i64 = 0;
    /// Assignment id → due date epoch millis, `null` when none was found
    DueDateCache => "dueDateCache": BTreeMap<String, Option<i64>> = BTreeMap::new();
    /// Submission status per assignment
    SubmissionStatusCache => "submissionStatusCache": BTreeMap<String, StatusStamp> = BTreeMap::new();
    /// Bulk scan mutex
    AssignmentsScanningInProgress => "assignmentsScanningInProgress": bool = false;
    /// When the current scan took the mutex, epoch millis
    AssignmentsScanStartedAt => "assignmentsScanStartedAt": i64 = 0;
    /// Overdue window in days; 0 shows every overdue assignment
    MaxOverdueDays => @sync "maxOverdueDays": u32 = 30;
    /// Hide assignments already submitted
    HideSubmittedAssignments => @sync "hideSubmittedAssignments": bool = false;
    /// Year filter of the bulk scan
    AssignmentFilterYear => @sync "assignmentFilterYear": Option<u16> = None;
    /// Semester column filter of the bulk scan
    AssignmentFilterSemester => @sync "assignmentFilterSemester": Option<u8> = None;
    /// User calendar events, in the order they were added
    CustomEvents => "customEvents": Vec<CustomEvent> = Vec::new();
}

/// Encode one typed value as a store record entry
pub fn encode<K: StoreKey>(value: &K::Value) -> Option<(String, Value)> {
    match serde_json::to_value(value) {
        Ok(encoded) => Some((K::NAME.to_string(), encoded)),
        Err(e) => {
            tracing::warn!(key = K::NAME, error = %e, "cannot encode store value");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reskin_store::PersistedStore;
    use serde_json::json;

    #[test]
    fn key_names_are_unique() {
        let mut names = ALL_KEYS.to_vec();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), ALL_KEYS.len());
    }

    #[test]
    fn settings_live_in_the_sync_tier() {
        assert_eq!(FavoriteCourseIds::AREA, StoreArea::Sync);
        assert_eq!(ViewModeKey::AREA, StoreArea::Sync);
        assert_eq!(CourseSchedules::AREA, StoreArea::Local);
        assert_eq!(DueDateCache::AREA, StoreArea::Local);
        assert_eq!(KEY_AREAS.len(), ALL_KEYS.len());
        assert!(KEY_AREAS.contains(&("maxOverdueDays", StoreArea::Sync)));
    }

    #[test]
    fn defaults_for_missing_values() {
        assert_eq!(PersistedStore::decode::<MaxOverdueDays>(None), 30);
        assert_eq!(PersistedStore::decode::<ColumnCountKey>(None).get(), 3);
        assert!(PersistedStore::decode::<FavoriteCourseIds>(Some(&Value::Null)).is_empty());
    }

    #[test]
    fn favorites_decode_from_list() {
        let set = PersistedStore::decode::<FavoriteCourseIds>(Some(&json!(["7", "3", "7"])));
        assert_eq!(set.iter().collect::<Vec<_>>(), vec!["3", "7"]);
    }

    #[test]
    fn encode_uses_flat_name() {
        let (name, value) = encode::<ViewModeKey>(&ViewMode::Carousel).unwrap();
        assert_eq!(name, "viewMode");
        assert_eq!(value, json!("carousel"));
    }
}
