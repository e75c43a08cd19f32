//! Host page contract
//!
//! Selectors and URL patterns owned by the LMS vendor. They are data, not
//! code: a markup change on the vendor side is a configuration edit.

use once_cell::sync::Lazy;
use regex::Regex;
use reskin_dom::{Document, DomResult, NodeId, Selector};
use serde::{Deserialize, Serialize};

static ID_PARAM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[?&]id=(\d+)").expect("id pattern compiles"));

/// Numeric `id` query parameter of a URL
#[must_use]
pub fn id_param(url: &str) -> Option<String> {
    ID_PARAM.captures(url).map(|c| c[1].to_string())
}

/// Selector strings describing the host page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostContract {
    /// Course containers to mark as grids
    pub containers: Vec<String>,
    /// Course cards, relative to marked grids
    pub cards: String,
    /// Link carrying the course id
    pub course_link: String,
    /// Element holding the course name
    pub course_name: String,
    /// Host course images
    pub card_image: String,
    /// Card resolved from a clicked control
    pub card_ancestor: String,
    /// Element receiving accent style properties
    pub styled_card: String,
    /// Ancestor receiving view mode classes
    pub view_parent: String,
    /// Heading on course pages
    pub page_title: String,
    /// Heading the weekly schedule is inserted before
    pub schedule_anchor: String,
    /// Body id of the front page
    pub front_page_body_id: String,
    /// Body classes of course pages
    pub course_page_classes: Vec<String>,
}

impl Default for HostContract {
    fn default() -> Self {
        Self {
            containers: [
                ".block_myoverview .courses-view",
                ".block_myoverview .list-group",
                ".block_myoverview [data-region=\"courses-view\"] .list-group",
                ".block_myoverview .content .list-group",
                ".dashboard-card-deck",
                "#frontpage-course-list .courses",
                "#frontpage-course-list .course-list",
                ".course_category_tree .courses",
                ".course_category_tree .category-browse .courses",
            ]
            .map(String::from)
            .to_vec(),
            cards: ".jct-courses-grid > .list-group-item, \
                    .jct-courses-grid .list-group > .list-group-item, \
                    .jct-courses-grid .coursebox, \
                    .jct-courses-grid .card.course, \
                    .jct-courses-grid .course-list > li, \
                    .jct-courses-grid > .dashboard-card, \
                    .jct-carousel-container > .list-group-item, \
                    .jct-carousel-container > .dashboard-card"
                .to_string(),
            course_link: "a[href*=\"/course/view.php\"], .coursename a, .course-title a".to_string(),
            course_name: ".coursename a, .course-title a".to_string(),
            card_image: "img.courseimage, .courseimage img, img[src*=\"pluginfile\"], img[src*=\"/course/overview\"]"
                .to_string(),
            card_ancestor: ".list-group-item, .coursebox, .card.course, li, .dashboard-card".to_string(),
            styled_card: ".list-group-item, .coursebox, .card.course, .course-list > li".to_string(),
            view_parent: ".course-content, #frontpage-course-list, .courses".to_string(),
            page_title: ".page-header-headings h1, #page-header h1, .page-context-header h1".to_string(),
            schedule_anchor: "#frontpage-course-list h2".to_string(),
            front_page_body_id: "page-site-index".to_string(),
            course_page_classes: vec!["pagelayout-course".to_string(), "pagelayout-incourse".to_string()],
        }
    }
}

impl HostContract {
    /// Parse every selector
    pub fn compile(&self) -> DomResult<CompiledContract> {
        let containers = self
            .containers
            .iter()
            .map(|s| Selector::parse(s))
            .collect::<DomResult<Vec<_>>>()?;
        Ok(CompiledContract {
            containers: Selector::any_of(containers),
            cards: Selector::parse(&self.cards)?,
            course_link: Selector::parse(&self.course_link)?,
            course_name: Selector::parse(&self.course_name)?,
            card_image: Selector::parse(&self.card_image)?,
            card_ancestor: Selector::parse(&self.card_ancestor)?,
            styled_card: Selector::parse(&self.styled_card)?,
            view_parent: Selector::parse(&self.view_parent)?,
            page_title: Selector::parse(&self.page_title)?,
            schedule_anchor: Selector::parse(&self.schedule_anchor)?,
            front_page_body_id: self.front_page_body_id.clone(),
            course_page_classes: self.course_page_classes.clone(),
        })
    }
}

/// Parsed host contract
#[derive(Debug, Clone)]
pub struct CompiledContract {
    pub containers: Selector,
    pub cards: Selector,
    pub course_link: Selector,
    pub course_name: Selector,
    pub card_image: Selector,
    pub card_ancestor: Selector,
    pub styled_card: Selector,
    pub view_parent: Selector,
    pub page_title: Selector,
    pub schedule_anchor: Selector,
    pub front_page_body_id: String,
    pub course_page_classes: Vec<String>,
}

impl CompiledContract {
    /// Course id of a card: link `id` parameter first, then `data-course-id`
    #[must_use]
    pub fn course_id(&self, doc: &Document, card: NodeId) -> Option<String> {
        doc.query(card, &self.course_link)
            .and_then(|link| doc.attr(link, "href"))
            .and_then(|href| id_param(&href))
            .or_else(|| doc.attr(card, "data-course-id"))
    }

    /// Course name of a card, falling back to its first text line
    #[must_use]
    pub fn course_name(&self, doc: &Document, card: NodeId) -> String {
        if let Some(el) = doc.query(card, &self.course_name) {
            let text = doc.text_content(el);
            if !text.trim().is_empty() {
                return text.trim().to_string();
            }
        }
        doc.text_content(card)
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .map_or_else(|| "קורס ללא שם".to_string(), str::to_string)
    }

    /// Course URL of a card, `#` when there is no link
    #[must_use]
    pub fn course_url(&self, doc: &Document, card: NodeId) -> String {
        doc.query(card, &self.course_link)
            .and_then(|link| doc.attr(link, "href"))
            .unwrap_or_else(|| "#".to_string())
    }

    /// Element that carries the accent properties for `card`
    #[must_use]
    pub fn styled_element(&self, doc: &Document, card: NodeId) -> NodeId {
        if self.styled_card.matches(doc, card) {
            return card;
        }
        doc.query(card, &self.styled_card).unwrap_or(card)
    }

    /// Whether the page is the front page
    #[must_use]
    pub fn is_front_page(&self, doc: &Document) -> bool {
        doc.attr(doc.body(), "id").as_deref() == Some(self.front_page_body_id.as_str())
    }

    /// Whether the page is a single course page
    #[must_use]
    pub fn is_course_page(&self, doc: &Document) -> bool {
        self.course_page_classes
            .iter()
            .any(|c| doc.has_class(doc.body(), c))
    }
}
