//! Weekly schedule: data model, migration, editing, saving and rendering

mod editor;
mod lifecycle;
mod migrate;
mod model;
mod saver;
mod view;

pub use editor::{CourseRef, EditorOutcome, ScheduleEditor};
pub use lifecycle::{allowed_transitions, validate_transition, EntryState};
pub use migrate::{migrate, Migration, CURRENT_SCHEMA_VERSION};
pub use model::{ScheduleBook, ScheduleEntry, Session, SessionTime, Weekday};
pub use saver::{SaveOutcome, ScheduleSaver};
pub use view::{
    render_weekly, toggle_label, weekly_view, DayColumn, SlotView, DAY_COURSES_CLASS, DELETE_ALL_CLASS,
    EDIT_CLASS, SCHEDULE_ID, TOGGLE_ID,
};
