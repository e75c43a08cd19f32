//! LMS-shaped page construction
//!
//! Builds documents with the markup the engine expects from the host page:
//! the front page course list, the dashboard overview block and a single
//! course page. Used by the CLI simulator and by tests.

use crate::document::Document;
use crate::error::DomResult;
use crate::node::NodeId;
use serde::{Deserialize, Serialize};

/// Which host layout to build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageLayout {
    /// `#frontpage-course-list .courses > .coursebox`
    #[default]
    Frontpage,
    /// `.block_myoverview .list-group > .list-group-item`
    Dashboard,
}

/// One course card to render
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardSpec {
    /// Numeric course id placed in the link's `id` query parameter
    pub id: Option<String>,
    /// Course title
    pub name: String,
    /// Host image URL, if the card has one
    #[serde(default)]
    pub image: Option<String>,
    /// Extra text lines (year, semester, lecturer)
    #[serde(default)]
    pub extra: Vec<String>,
}

impl CardSpec {
    /// Card with an id and a name
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            name: name.into(),
            image: None,
            extra: Vec::new(),
        }
    }

    /// Card without a course link id
    #[must_use]
    pub fn anonymous(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            image: None,
            extra: Vec::new(),
        }
    }

    /// Attach a host image
    #[must_use]
    pub fn with_image(mut self, src: impl Into<String>) -> Self {
        self.image = Some(src.into());
        self
    }

    /// Append a text line
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.extra.push(text.into());
        self
    }

    /// Course link `href`
    #[must_use]
    pub fn href(&self) -> String {
        match &self.id {
            Some(id) => format!("https://lms.example/course/view.php?id={id}"),
            None => "https://lms.example/course/index.php".to_string(),
        }
    }
}

/// A built page and the handles tests usually need
#[derive(Debug, Clone)]
pub struct Page {
    /// The page document
    pub doc: Document,
    /// Location of the page
    pub url: String,
    /// `#region-main`
    pub region: NodeId,
    /// Course list container, absent on course pages
    pub container: Option<NodeId>,
    /// Cards in host order
    pub cards: Vec<NodeId>,
}

/// Page builder
#[derive(Debug, Clone, Default)]
pub struct PageBuilder {
    layout: PageLayout,
    cards: Vec<CardSpec>,
    rtl: bool,
}

impl PageBuilder {
    /// Start a page with the given layout
    #[must_use]
    pub fn new(layout: PageLayout) -> Self {
        Self {
            layout,
            cards: Vec::new(),
            rtl: true,
        }
    }

    /// Add a card
    #[must_use]
    pub fn card(mut self, card: CardSpec) -> Self {
        self.cards.push(card);
        self
    }

    /// Add several cards
    #[must_use]
    pub fn cards(mut self, cards: impl IntoIterator<Item = CardSpec>) -> Self {
        self.cards.extend(cards);
        self
    }

    /// Left-to-right page
    #[must_use]
    pub fn ltr(mut self) -> Self {
        self.rtl = false;
        self
    }

    /// Build the document
    pub fn build(self) -> DomResult<Page> {
        let mut doc = Document::new();
        let root = doc.root();
        let body = doc.body();
        if self.rtl {
            doc.set_attr(root, "dir", "rtl")?;
        }
        let region = doc.create_element("div");
        doc.set_attr(region, "id", "region-main")?;
        doc.append_child(body, region)?;

        let (container, card_tag, card_class, url) = match self.layout {
            PageLayout::Frontpage => {
                doc.set_attr(body, "id", "page-site-index")?;
                let list = child(&mut doc, region, "div")?;
                doc.set_attr(list, "id", "frontpage-course-list")?;
                let heading = child(&mut doc, list, "h2")?;
                doc.set_text(heading, "הקורסים שלי")?;
                let courses = child(&mut doc, list, "div")?;
                doc.add_class(courses, "courses")?;
                (courses, "div", "coursebox", "https://lms.example/")
            }
            PageLayout::Dashboard => {
                doc.set_attr(body, "id", "page-my-index")?;
                let block = child(&mut doc, region, "section")?;
                doc.add_class(block, "block_myoverview")?;
                let content = child(&mut doc, block, "div")?;
                doc.add_class(content, "content")?;
                let list = child(&mut doc, content, "div")?;
                doc.add_class(list, "list-group")?;
                (list, "div", "list-group-item", "https://lms.example/my/")
            }
        };

        let mut cards = Vec::with_capacity(self.cards.len());
        for spec in &self.cards {
            let card = render_card(&mut doc, spec, card_tag, card_class)?;
            doc.append_child(container, card)?;
            cards.push(card);
        }
        doc.take_records();

        Ok(Page {
            doc,
            url: url.to_string(),
            region,
            container: Some(container),
            cards,
        })
    }

    /// Build a single course page (`pagelayout-course`) titled `title`
    pub fn course_page(course_id: &str, title: &str) -> DomResult<Page> {
        let mut doc = Document::new();
        let body = doc.body();
        doc.add_class(body, "pagelayout-course")?;
        let header = child(&mut doc, body, "div")?;
        doc.add_class(header, "page-header-headings")?;
        let h1 = child(&mut doc, header, "h1")?;
        doc.set_text(h1, title)?;
        let region = child(&mut doc, body, "div")?;
        doc.set_attr(region, "id", "region-main")?;
        doc.take_records();
        Ok(Page {
            doc,
            url: format!("https://lms.example/course/view.php?id={course_id}"),
            region,
            container: None,
            cards: Vec::new(),
        })
    }
}

fn child(doc: &mut Document, parent: NodeId, tag: &str) -> DomResult<NodeId> {
    let node = doc.create_element(tag);
    doc.append_child(parent, node)?;
    Ok(node)
}

/// Render a detached card the way the host does; callers attach it
pub fn render_card(
    doc: &mut Document,
    spec: &CardSpec,
    tag: &str,
    class: &str,
) -> DomResult<NodeId> {
    let card = doc.create_element(tag);
    doc.add_class(card, class)?;

    let info = child(doc, card, "div")?;
    doc.add_class(info, "info")?;
    let title = child(doc, info, "h3")?;
    doc.add_class(title, "coursename")?;
    let link = child(doc, title, "a")?;
    doc.set_attr(link, "href", &spec.href())?;
    doc.set_text(link, &spec.name)?;

    if let Some(src) = &spec.image {
        let img = child(doc, card, "img")?;
        doc.add_class(img, "courseimage")?;
        doc.set_attr(img, "src", src)?;
    }
    for line in &spec.extra {
        let p = child(doc, card, "p")?;
        doc.set_text(p, line)?;
    }
    Ok(card)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selector::Selector;

    #[test]
    fn frontpage_cards_sit_in_course_list() {
        let page = PageBuilder::new(PageLayout::Frontpage)
            .card(CardSpec::new("101", "Algorithms"))
            .card(CardSpec::new("102", "Compilers").with_image("https://lms.example/pluginfile.php/1.png"))
            .build()
            .unwrap();

        let doc = &page.doc;
        assert_eq!(page.cards.len(), 2);
        let container = page.container.unwrap();
        assert!(doc.has_class(container, "courses"));
        assert_eq!(doc.children(container), page.cards.as_slice());
        assert!(doc.pending_records().is_empty());

        let links = doc.query_all(page.cards[0], &Selector::attr_contains("href", "/course/view.php"));
        assert_eq!(links.len(), 1);
        assert!(doc.query(page.cards[1], &Selector::tag("img")).is_some());
    }

    #[test]
    fn dashboard_uses_list_group_items() {
        let page = PageBuilder::new(PageLayout::Dashboard)
            .card(CardSpec::new("7", "Physics"))
            .build()
            .unwrap();
        assert!(page.doc.has_class(page.cards[0], "list-group-item"));
        assert!(page.url.ends_with("/my/"));
    }

    #[test]
    fn course_page_has_title() {
        let page = PageBuilder::course_page("73247", "מבני נתונים תשפ\"ה סמסטר א").unwrap();
        let h1 = page.doc.query(page.doc.root(), &Selector::tag("h1")).unwrap();
        assert!(page.doc.own_text(h1).contains("מבני נתונים"));
        assert!(page.url.contains("id=73247"));
    }
}
