//! Weekly schedule projection and rendering

use super::model::{ScheduleBook, Session, Weekday};
use crate::host::CompiledContract;
use reskin_dom::{Document, DomResult, NodeId, Selector};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Id of the schedule container
pub const SCHEDULE_ID: &str = "jct-weekly-schedule";
/// Id of the show/hide button
pub const TOGGLE_ID: &str = "jct-schedule-toggle";
/// Class of the delete-all button
pub const DELETE_ALL_CLASS: &str = "jct-schedule-delete-all-btn";
/// Class of per-course edit buttons
pub const EDIT_CLASS: &str = "jct-schedule-edit-course";
/// Class of the drop targets
pub const DAY_COURSES_CLASS: &str = "jct-schedule-day-courses";

const SIGNATURE_ATTR: &str = "data-jct-sig";

/// One rendered session
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SlotView {
    pub course_id: String,
    pub name: String,
    pub url: String,
    pub session: Session,
}

impl SlotView {
    /// `"end - start"` when both times are set
    #[must_use]
    pub fn time_label(&self) -> Option<String> {
        let Session {
            start_time,
            end_time,
            ..
        } = &self.session;
        (start_time.is_set() && end_time.is_set()).then(|| format!("{end_time} - {start_time}"))
    }
}

/// Sessions of one day
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DayColumn {
    pub day: Weekday,
    pub slots: Vec<SlotView>,
}

/// Every teaching day with its sessions, earliest start first and untimed last
#[must_use]
pub fn weekly_view(book: &ScheduleBook) -> Vec<DayColumn> {
    Weekday::ALL
        .iter()
        .map(|&day| {
            let mut slots: Vec<SlotView> = book
                .iter()
                .flat_map(|(id, entry)| {
                    entry
                        .sessions
                        .iter()
                        .filter(move |s| s.day == day)
                        .map(move |s| SlotView {
                            course_id: id.to_string(),
                            name: entry.name.clone(),
                            url: entry.url.clone(),
                            session: s.clone(),
                        })
                })
                .collect();
            slots.sort_by_key(|slot| slot.session.start_time.sort_key());
            DayColumn { day, slots }
        })
        .collect()
}

/// Toggle button caption
#[must_use]
pub fn toggle_label(visible: bool) -> &'static str {
    if visible {
        "✕ סגור לוח זמנים"
    } else {
        "📅 לוח זמנים שבועי"
    }
}

fn signature(view: &[DayColumn]) -> String {
    let mut hasher = DefaultHasher::new();
    view.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

fn child(doc: &mut Document, parent: NodeId, tag: &str, class: &str) -> DomResult<NodeId> {
    let node = doc.create_element(tag);
    if !class.is_empty() {
        doc.add_class(node, class)?;
    }
    doc.append_child(parent, node)?;
    Ok(node)
}

/// Ensure the weekly schedule and its toggle exist on the front page and reflect `book`
///
/// The grid is rebuilt only when the projected content changed; visibility
/// is applied on every call. Returns the container, or `None` when the page
/// has no place for it.
pub fn render_weekly(
    doc: &mut Document,
    contract: &CompiledContract,
    book: &ScheduleBook,
    visible: bool,
) -> DomResult<Option<NodeId>> {
    if !contract.is_front_page(doc) {
        return Ok(None);
    }
    let Some(region) = doc
        .element_by_id("region-main")
        .or_else(|| doc.query(doc.root(), &Selector::tag("main")))
    else {
        return Ok(None);
    };

    let container = match doc.element_by_id(SCHEDULE_ID) {
        Some(existing) => existing,
        None => insert_container(doc, contract, region)?,
    };
    if doc.element_by_id(TOGGLE_ID).is_none() {
        let toggle = doc.create_element("button");
        doc.set_attr(toggle, "id", TOGGLE_ID)?;
        doc.add_class(toggle, TOGGLE_ID)?;
        doc.set_attr(toggle, "type", "button")?;
        match doc.parent(container) {
            Some(parent) => doc.insert_before(parent, toggle, Some(container))?,
            None => doc.prepend_child(region, toggle)?,
        }
    }
    if let Some(toggle) = doc.element_by_id(TOGGLE_ID) {
        doc.set_text(toggle, toggle_label(visible))?;
    }
    doc.set_style(container, "display", if visible { "block" } else { "none" })?;

    let view = weekly_view(book);
    let sig = signature(&view);
    if doc.attr(container, SIGNATURE_ATTR).as_deref() != Some(sig.as_str()) {
        build_grid(doc, container, &view)?;
        doc.set_attr(container, SIGNATURE_ATTR, &sig)?;
        tracing::debug!(courses = book.len(), "weekly schedule rendered");
    }
    Ok(Some(container))
}

fn insert_container(doc: &mut Document, contract: &CompiledContract, region: NodeId) -> DomResult<NodeId> {
    let container = doc.create_element("div");
    doc.set_attr(container, "id", SCHEDULE_ID)?;
    doc.add_class(container, SCHEDULE_ID)?;

    let anchor = doc
        .query(region, &contract.schedule_anchor)
        .or_else(|| doc.query(region, &Selector::class("jct-courses-grid")))
        .and_then(|a| doc.parent(a).map(|p| (p, a)));
    match anchor {
        Some((parent, before)) => doc.insert_before(parent, container, Some(before))?,
        None => doc.prepend_child(region, container)?,
    }
    Ok(container)
}

fn build_grid(doc: &mut Document, container: NodeId, view: &[DayColumn]) -> DomResult<()> {
    doc.clear_children(container)?;

    let header = child(doc, container, "div", "jct-schedule-header")?;
    let title = child(doc, header, "h2", "")?;
    doc.set_text(title, "לוח זמנים שבועי")?;
    let hint = child(doc, header, "p", "jct-schedule-hint")?;
    doc.set_text(hint, "גרור 📅 קורסים לימים או לחץ על ✏️ לעריכה")?;
    let delete_all = child(doc, header, "button", DELETE_ALL_CLASS)?;
    doc.set_attr(delete_all, "title", "מחק את כל הקורסים מהלוח זמנים")?;
    doc.set_text(delete_all, "🗑️ מחק הכל")?;

    let grid = child(doc, container, "div", "jct-schedule-grid")?;
    for column in view {
        let day = child(doc, grid, "div", "jct-schedule-day")?;
        doc.set_attr(day, "data-day", column.day.as_str())?;
        let day_header = child(doc, day, "div", "jct-schedule-day-header")?;
        doc.set_text(day_header, column.day.display_name())?;
        let courses = child(doc, day, "div", DAY_COURSES_CLASS)?;
        doc.set_attr(courses, "data-day", column.day.as_str())?;

        if column.slots.is_empty() {
            let empty = child(doc, courses, "div", "jct-schedule-empty")?;
            doc.set_text(empty, "אין שיעורים")?;
            continue;
        }
        for slot in &column.slots {
            let item = child(doc, courses, "div", "jct-schedule-course-item")?;
            doc.set_attr(item, "data-course-id", &slot.course_id)?;
            let content = child(doc, item, "div", "jct-session-content")?;
            let link = child(doc, content, "a", "jct-schedule-course-link")?;
            doc.set_attr(link, "href", &slot.url)?;
            doc.set_text(link, &slot.name)?;
            if let Some(label) = slot.time_label() {
                let time = child(doc, content, "div", "jct-session-time")?;
                doc.set_text(time, &label)?;
            }
            let edit = child(doc, item, "button", EDIT_CLASS)?;
            doc.set_attr(edit, "data-course-id", &slot.course_id)?;
            doc.set_attr(edit, "title", "ערוך מערכת")?;
            doc.set_text(edit, "✏️")?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::HostContract;
    use pretty_assertions::assert_eq;
    use reskin_dom::{CardSpec, PageBuilder, PageLayout};

    fn book_with(sessions: Vec<Session>) -> ScheduleBook {
        let mut book = ScheduleBook::new();
        for s in sessions {
            book.add_session("1", "Calculus", "#", s);
        }
        book
    }

    #[test]
    fn timed_sessions_sort_before_untimed() {
        let book = book_with(vec![
            Session::on(Weekday::Sunday),
            Session::timed(Weekday::Sunday, "10:00", "").unwrap(),
            Session::timed(Weekday::Sunday, "08:30", "10:00").unwrap(),
        ]);
        let view = weekly_view(&book);
        assert_eq!(view.len(), 6);
        let starts: Vec<String> = view[0]
            .slots
            .iter()
            .map(|s| s.session.start_time.to_string())
            .collect();
        assert_eq!(starts, vec!["08:30", "10:00", ""]);
        assert!(view[1..].iter().all(|d| d.slots.is_empty()));
        assert_eq!(view[0].slots[0].time_label().as_deref(), Some("10:00 - 08:30"));
        assert_eq!(view[0].slots[1].time_label(), None);
    }

    #[test]
    fn renders_once_before_course_heading() {
        let mut page = PageBuilder::new(PageLayout::Frontpage)
            .card(CardSpec::new("1", "Calculus"))
            .build()
            .unwrap();
        let contract = HostContract::default().compile().unwrap();
        let book = book_with(vec![Session::on(Weekday::Monday)]);

        let container = render_weekly(&mut page.doc, &contract, &book, false)
            .unwrap()
            .unwrap();
        let doc = &page.doc;
        let toggle = doc.element_by_id(TOGGLE_ID).unwrap();
        let parent = doc.parent(container).unwrap();
        let siblings = doc.children(parent);
        let at = |n| siblings.iter().position(|&c| c == n).unwrap();
        assert_eq!(at(toggle) + 1, at(container));
        assert_eq!(doc.tag(siblings[at(container) + 1]), Some("h2"));
        assert_eq!(doc.style(container, "display"), Some("none"));
        assert_eq!(doc.own_text(toggle), "📅 לוח זמנים שבועי");

        let items = doc.query_all(container, &Selector::class("jct-schedule-course-item"));
        assert_eq!(items.len(), 1);
        assert_eq!(doc.query_all(container, &Selector::class("jct-schedule-empty")).len(), 5);

        page.doc.take_records();
        render_weekly(&mut page.doc, &contract, &book, false).unwrap();
        assert!(page.doc.pending_records().is_empty());
    }

    #[test]
    fn only_on_front_page() {
        let mut page = PageBuilder::course_page("5", "Physics").unwrap();
        let contract = HostContract::default().compile().unwrap();
        assert_eq!(
            render_weekly(&mut page.doc, &contract, &ScheduleBook::new(), true).unwrap(),
            None
        );
    }
}
