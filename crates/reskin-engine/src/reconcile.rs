//! Reconciliation pass
//!
//! Re-derives every injected element from the current document and the
//! engine state. Each step checks before it writes, so a second pass over
//! an unchanged document writes nothing. Host nodes are re-resolved every
//! pass; only the stamped attributes carry over.

use crate::carousel;
use crate::favorites::{self, FavoritesSet};
use crate::host::{id_param, CompiledContract};
use crate::palette::{color_for, detect, Hsl, Palette};
use crate::prefs::{CardStyle, ViewMode, ViewPreferences};
use crate::schedule::{self, ScheduleBook};
use reskin_dom::{Document, DomResult, EventKind, NodeId, Phase, Selector};

/// Marker class of recognised course containers
pub const GRID_CLASS: &str = "jct-courses-grid";
/// Favorite toggle button
pub const FAV_CLASS: &str = "jct-fav-toggle";
/// Favorite toggle in the "on" state
pub const FAV_ON_CLASS: &str = "jct-fav-on";
/// Schedule button, also the drag handle
pub const SCHEDULE_BTN_CLASS: &str = "jct-schedule-btn";
/// Thumbnail wrapper
pub const THUMB_WRAP_CLASS: &str = "jct-thumb-wrap";
/// Image inside the thumbnail wrapper
pub const THUMB_IMG_CLASS: &str = "jct-thumb-img";
/// Card navigates on click
pub const CLICKABLE_CLASS: &str = "jct-clickable";
/// Card favorite flag attribute
pub const FAV_ATTR: &str = "data-jct-fav";

/// Delegated click listener
pub const CLICK_KEY: &str = "jct-click";
/// Delegated drag start listener
pub const DRAG_START_KEY: &str = "jct-dragstart";
/// Delegated drag end listener
pub const DRAG_END_KEY: &str = "jct-dragend";
/// Delegated drop listener
pub const DROP_KEY: &str = "jct-drop";

/// Delegated listeners, all registered once on the document root
pub const DELEGATED: [(EventKind, Phase, &str); 4] = [
    (EventKind::Click, Phase::Capture, CLICK_KEY),
    (EventKind::DragStart, Phase::Capture, DRAG_START_KEY),
    (EventKind::DragEnd, Phase::Capture, DRAG_END_KEY),
    (EventKind::Drop, Phase::Bubble, DROP_KEY),
];

/// Everything a pass reads besides the document
#[derive(Debug, Clone, Copy)]
pub struct PassInput<'a> {
    pub contract: &'a CompiledContract,
    pub favorites: &'a FavoritesSet,
    pub prefs: &'a ViewPreferences,
    pub schedules: &'a ScheduleBook,
    pub schedule_visible: bool,
    pub placeholder_url: &'a str,
    /// Location of the page, for course-page theming
    pub url: &'a str,
}

/// What a pass found and changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PassReport {
    pub grids: usize,
    pub cards: usize,
    pub reordered: usize,
    pub grouped: usize,
    pub restored: usize,
    pub listeners_installed: bool,
    pub schedule_rendered: bool,
    pub course_themed: bool,
}

/// Run one full pass. Callers hold the reconcile guard.
pub fn reconcile(doc: &mut Document, input: &PassInput<'_>) -> DomResult<PassReport> {
    let mut report = PassReport {
        listeners_installed: install_delegation(doc)?,
        ..PassReport::default()
    };
    mark_root(doc)?;

    let grids = mark_containers(doc, input.contract)?;
    report.grids = grids.len();

    let cards = doc.query_all(doc.root(), &input.contract.cards);
    report.cards = cards.len();
    for &card in &cards {
        ensure_card(doc, card, input)?;
    }

    apply_view_preferences(doc, input.contract, input.prefs, &grids)?;
    for &grid in &grids {
        if input.prefs.view_mode == ViewMode::Carousel {
            if carousel::is_grouped(doc, grid) && !carousel::loose_cards(doc, grid).is_empty() {
                carousel::restore(doc, grid)?;
                report.restored += 1;
            }
            if carousel::group(doc, grid, |d, c| input.contract.styled_element(d, c))? {
                report.grouped += 1;
            }
        } else if carousel::restore(doc, grid)? {
            report.restored += 1;
        }
    }

    report.reordered = reorder_all(doc, input.contract, input.favorites, &grids)?;
    report.schedule_rendered =
        schedule::render_weekly(doc, input.contract, input.schedules, input.schedule_visible)?.is_some();
    report.course_themed = apply_course_theme(doc, input.contract, input.prefs.palette(), input.url)?;
    Ok(report)
}

/// Register the delegated listeners on the root unless already present
pub fn install_delegation(doc: &mut Document) -> DomResult<bool> {
    let root = doc.root();
    let mut installed = false;
    for (event, phase, key) in DELEGATED {
        if !doc.has_listener(root, event, key) {
            doc.add_listener(root, event, phase, key)?;
            installed = true;
        }
    }
    Ok(installed)
}

fn mark_root(doc: &mut Document) -> DomResult<()> {
    let root = doc.root();
    doc.add_class(root, "jct-moodle-redesign")?;
    if doc.attr(root, "dir").as_deref() == Some("rtl") {
        doc.add_class(root, "jct-rtl")?;
    }
    Ok(())
}

/// Mark host course containers. Returns every marked grid.
pub fn mark_containers(doc: &mut Document, contract: &CompiledContract) -> DomResult<Vec<NodeId>> {
    for container in doc.query_all(doc.root(), &contract.containers) {
        doc.add_class(container, GRID_CLASS)?;
    }
    Ok(doc.query_all(doc.root(), &Selector::class(GRID_CLASS)))
}

fn set_accent(doc: &mut Document, node: NodeId, prefix: &str, hsl: Hsl) -> DomResult<()> {
    doc.set_style(node, &format!("{prefix}-h"), &hsl.h.to_string())?;
    doc.set_style(node, &format!("{prefix}-s"), &format!("{}%", hsl.s))?;
    doc.set_style(node, &format!("{prefix}-l"), &format!("{}%", hsl.l))
}

fn first_or_create(
    doc: &mut Document,
    card: NodeId,
    class: &str,
    tag: &str,
    init: impl FnOnce(&mut Document, NodeId) -> DomResult<()>,
) -> DomResult<NodeId> {
    if let Some(existing) = doc.query(card, &Selector::class(class)) {
        return Ok(existing);
    }
    let node = doc.create_element(tag);
    doc.add_class(node, class)?;
    init(doc, node)?;
    doc.prepend_child(card, node)?;
    Ok(node)
}

/// Bring one card up to date
pub fn ensure_card(doc: &mut Document, card: NodeId, input: &PassInput<'_>) -> DomResult<()> {
    let contract = input.contract;
    if doc.style(card, "position").is_none() {
        doc.set_style(card, "position", "relative")?;
    }

    ensure_thumbnail(doc, card, contract, input.placeholder_url)?;

    let course_id = contract.course_id(doc, card);
    let ys = detect(&doc.text_content(card), course_id.as_deref());
    let styled = contract.styled_element(doc, card);
    set_accent(doc, styled, "--jct-accent", color_for(input.prefs.palette(), ys))?;

    let fav = input.favorites.contains_opt(course_id.as_deref());
    let fav_btn = first_or_create(doc, card, FAV_CLASS, "button", |doc, btn| {
        doc.set_attr(btn, "type", "button")?;
        doc.set_attr(btn, "title", "Toggle favorite")
    })?;
    doc.set_attr(card, FAV_ATTR, if fav { "1" } else { "0" })?;
    doc.toggle_class(fav_btn, FAV_ON_CLASS, fav)?;
    doc.set_attr(fav_btn, "aria-pressed", if fav { "true" } else { "false" })?;
    doc.set_text(fav_btn, if fav { "★" } else { "☆" })?;

    first_or_create(doc, card, SCHEDULE_BTN_CLASS, "button", |doc, btn| {
        doc.set_attr(btn, "type", "button")?;
        doc.set_attr(btn, "title", "הוסף ללוח זמנים (לחץ לעריכה, גרור להוספה)")?;
        doc.set_attr(btn, "draggable", "true")?;
        doc.set_text(btn, "📅")
    })?;

    favorites::stamp_original_index(doc, card)?;

    if doc.query(card, &contract.course_link).is_some() && !doc.has_class(card, CLICKABLE_CLASS) {
        doc.add_class(card, CLICKABLE_CLASS)?;
        doc.set_style(card, "cursor", "pointer")?;
    }
    Ok(())
}

fn ensure_thumbnail(
    doc: &mut Document,
    card: NodeId,
    contract: &CompiledContract,
    placeholder_url: &str,
) -> DomResult<()> {
    let thumb = first_or_create(doc, card, THUMB_WRAP_CLASS, "div", |_, _| Ok(()))?;
    if let Some(img) = doc.query(card, &contract.card_image) {
        if doc.parent(img) != Some(thumb) {
            doc.clear_children(thumb)?;
            doc.append_child(thumb, img)?;
            doc.add_class(img, THUMB_IMG_CLASS)?;
        }
    }
    if doc.query(thumb, &Selector::tag("img")).is_none() {
        let placeholder = doc.create_element("img");
        doc.add_class(placeholder, THUMB_IMG_CLASS)?;
        doc.set_attr(placeholder, "alt", "")?;
        doc.set_attr(placeholder, "src", placeholder_url)?;
        doc.append_child(thumb, placeholder)?;
    }
    Ok(())
}

/// Apply card style, view mode and column classes
pub fn apply_view_preferences(
    doc: &mut Document,
    contract: &CompiledContract,
    prefs: &ViewPreferences,
    grids: &[NodeId],
) -> DomResult<()> {
    let body = doc.body();
    for style in CardStyle::ALL {
        doc.toggle_class(body, &style.class(), style == prefs.card_style)?;
    }

    let mode_class = prefs.view_mode.class();
    let mut targets: Vec<NodeId> = grids
        .iter()
        .map(|&grid| {
            doc.closest(grid, &contract.view_parent)
                .or_else(|| doc.parent(grid))
                .unwrap_or(grid)
        })
        .collect();
    targets.push(body);
    for target in targets {
        for class in ViewMode::CLASSES {
            doc.toggle_class(target, class, mode_class == Some(class))?;
        }
    }

    if prefs.view_mode == ViewMode::Grid {
        let root = doc.root();
        doc.set_style(root, "--jct-columns", &prefs.column_count.to_string())?;
    }
    Ok(())
}

/// Favorite-first ordering of every grid and carousel strip. Returns how many moved.
pub fn reorder_all(
    doc: &mut Document,
    contract: &CompiledContract,
    favorites: &FavoritesSet,
    grids: &[NodeId],
) -> DomResult<usize> {
    let mut containers = grids.to_vec();
    containers.extend(doc.query_all(doc.root(), &Selector::class(carousel::CONTAINER_CLASS)));
    let mut moved = 0;
    for container in containers {
        if favorites::reorder(doc, container, contract, favorites)? {
            moved += 1;
        }
    }
    Ok(moved)
}

/// Colour a single course page after its course. Returns whether the page is a course page.
pub fn apply_course_theme(
    doc: &mut Document,
    contract: &CompiledContract,
    palette: &Palette,
    url: &str,
) -> DomResult<bool> {
    if !contract.is_course_page(doc) {
        return Ok(false);
    }
    let Some(course_id) = id_param(url) else {
        return Ok(false);
    };
    let title = doc
        .query(doc.root(), &contract.page_title)
        .map(|h| doc.text_content(h))
        .unwrap_or_default();
    let hsl = color_for(palette, detect(&title, Some(&course_id)));
    let root = doc.root();
    set_accent(doc, root, "--jct-course", hsl)?;
    doc.add_class(root, "jct-course-page-themed")?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::HostContract;
    use pretty_assertions::assert_eq;
    use reskin_dom::{CardSpec, PageBuilder, PageLayout};

    struct Fixture {
        contract: CompiledContract,
        favorites: FavoritesSet,
        prefs: ViewPreferences,
        schedules: ScheduleBook,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                contract: HostContract::default().compile().unwrap(),
                favorites: FavoritesSet::new(),
                prefs: ViewPreferences::default(),
                schedules: ScheduleBook::new(),
            }
        }

        fn input(&self) -> PassInput<'_> {
            PassInput {
                contract: &self.contract,
                favorites: &self.favorites,
                prefs: &self.prefs,
                schedules: &self.schedules,
                schedule_visible: false,
                placeholder_url: "assets/placeholder.svg",
                url: "https://lms.example/",
            }
        }
    }

    fn page() -> reskin_dom::Page {
        PageBuilder::new(PageLayout::Frontpage)
            .card(CardSpec::new("1", "Linear Algebra").with_image("https://lms.example/pluginfile.php/1.png"))
            .card(CardSpec::new("2", "Logic"))
            .build()
            .unwrap()
    }

    #[test]
    fn injects_controls_once() {
        let mut page = page();
        let fx = Fixture::new();
        let report = reconcile(&mut page.doc, &fx.input()).unwrap();
        assert_eq!(report.cards, 2);
        assert!(report.listeners_installed);

        let doc = &mut page.doc;
        for &card in &page.cards {
            for class in [FAV_CLASS, SCHEDULE_BTN_CLASS, THUMB_WRAP_CLASS] {
                assert_eq!(doc.query_all(card, &Selector::class(class)).len(), 1, "{class}");
            }
            assert!(doc.style(card, "--jct-accent-h").is_some());
            assert!(doc.has_attr(card, favorites::ORIGINAL_INDEX_ATTR));
        }
        let thumb = doc.query(page.cards[0], &Selector::class(THUMB_WRAP_CLASS)).unwrap();
        let img = doc.query(thumb, &Selector::tag("img")).unwrap();
        assert!(doc.has_class(img, "courseimage"));
        let thumb = doc.query(page.cards[1], &Selector::class(THUMB_WRAP_CLASS)).unwrap();
        let img = doc.query(thumb, &Selector::tag("img")).unwrap();
        assert_eq!(doc.attr(img, "src").as_deref(), Some("assets/placeholder.svg"));

        doc.take_records();
        let listeners = doc.listener_count();
        let again = reconcile(doc, &fx.input()).unwrap();
        assert!(!again.listeners_installed);
        assert!(doc.pending_records().is_empty());
        assert_eq!(doc.listener_count(), listeners);
    }

    #[test]
    fn favorites_drive_button_state() {
        let mut page = page();
        let mut fx = Fixture::new();
        fx.favorites.toggle("2");
        reconcile(&mut page.doc, &fx.input()).unwrap();

        let doc = &page.doc;
        let container = page.container.unwrap();
        assert_eq!(doc.children(container)[0], page.cards[1]);
        let btn = doc.query(page.cards[1], &Selector::class(FAV_CLASS)).unwrap();
        assert_eq!(doc.own_text(btn), "★");
        assert_eq!(doc.attr(page.cards[1], FAV_ATTR).as_deref(), Some("1"));
    }

    #[test]
    fn view_preferences_switch_classes() {
        let mut page = page();
        let mut fx = Fixture::new();
        reconcile(&mut page.doc, &fx.input()).unwrap();
        let body = page.doc.body();
        assert!(page.doc.has_class(body, "jct-style-compact"));
        assert_eq!(page.doc.style(page.doc.root(), "--jct-columns"), Some("3"));

        fx.prefs.view_mode = ViewMode::List;
        fx.prefs.card_style = CardStyle::Glass;
        reconcile(&mut page.doc, &fx.input()).unwrap();
        assert!(page.doc.has_class(body, "jct-courses-list-view"));
        assert!(page.doc.has_class(body, "jct-style-glass"));
        assert!(!page.doc.has_class(body, "jct-style-compact"));
    }

    #[test]
    fn course_page_gets_theme() {
        let mut page = PageBuilder::course_page("73247", "Data Structures").unwrap();
        let contract = HostContract::default().compile().unwrap();
        let themed =
            apply_course_theme(&mut page.doc, &contract, Palette::builtin(), &page.url).unwrap();
        assert!(themed);
        let root = page.doc.root();
        assert!(page.doc.has_class(root, "jct-course-page-themed"));
        assert!(page.doc.style(root, "--jct-course-h").is_some());
    }
}
