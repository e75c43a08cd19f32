//! Carousel presentation
//!
//! Cards of one grid are grouped by accent colour into semester groups,
//! each a horizontally scrolling strip. Cards are moved, never cloned, so
//! leaving carousel mode puts the same nodes back in original order.

use crate::favorites::{original_index, GROUP_CLASS};
use crate::palette::{parse_year_semester, semester_name};
use reskin_dom::{Document, DomResult, NodeId, Selector};

/// Strip holding a group's cards
pub const CONTAINER_CLASS: &str = "jct-carousel-container";
/// Cursor position of a strip
pub const INDEX_ATTR: &str = "data-carousel-index";
/// Previous button class
pub const PREV_CLASS: &str = "jct-carousel-btn-prev";
/// Next button class
pub const NEXT_CLASS: &str = "jct-carousel-btn-next";
/// Indicator dot class
pub const DOT_CLASS: &str = "jct-carousel-dot";
/// Position of a dot within its indicators
pub const DOT_INDEX_ATTR: &str = "data-dot-index";

const INITIALIZED_ATTR: &str = "data-jct-carousel-initialized";
const STEP_PX: usize = 320 + 20;

fn is_paging(doc: &Document, node: NodeId) -> bool {
    doc.has_class(node, "paging") || doc.has_class(node, "paging-morelink")
}

fn el(doc: &mut Document, parent: NodeId, tag: &str, classes: &[&str]) -> DomResult<NodeId> {
    let node = doc.create_element(tag);
    for class in classes {
        doc.add_class(node, class)?;
    }
    doc.append_child(parent, node)?;
    Ok(node)
}

/// Whether `grid` is currently rendered as groups
#[must_use]
pub fn is_grouped(doc: &Document, grid: NodeId) -> bool {
    doc.children(grid).iter().any(|&c| doc.has_class(c, GROUP_CLASS))
}

/// Direct card children of a grid, outside any group
#[must_use]
pub fn loose_cards(doc: &Document, grid: NodeId) -> Vec<NodeId> {
    doc.children(grid)
        .iter()
        .copied()
        .filter(|&c| !doc.has_class(c, GROUP_CLASS) && !is_paging(doc, c))
        .collect()
}

fn accent_key(doc: &Document, card: NodeId, styled: NodeId) -> String {
    let prop = |name: &str, default: &str| {
        doc.style(styled, name)
            .or_else(|| doc.style(card, name))
            .unwrap_or(default)
            .to_string()
    };
    format!(
        "{}-{}-{}",
        prop("--jct-accent-h", "230"),
        prop("--jct-accent-s", "70%"),
        prop("--jct-accent-l", "55%")
    )
}

/// Group the loose cards of `grid` by accent colour
///
/// `styled` maps a card to the element carrying its accent. Returns whether
/// groups were built.
pub fn group(
    doc: &mut Document,
    grid: NodeId,
    styled: impl Fn(&Document, NodeId) -> NodeId,
) -> DomResult<bool> {
    if is_grouped(doc, grid) {
        return Ok(false);
    }
    let cards = loose_cards(doc, grid);
    if cards.is_empty() {
        return Ok(false);
    }

    let mut groups: Vec<(String, Vec<NodeId>)> = Vec::new();
    for card in cards {
        let key = accent_key(doc, card, styled(doc, card));
        match groups.iter_mut().find(|(k, _)| *k == key) {
            Some((_, members)) => members.push(card),
            None => groups.push((key, vec![card])),
        }
    }

    let first_paging = doc.children(grid).iter().copied().find(|&c| is_paging(doc, c));
    for (_, members) in &groups {
        let section = doc.create_element("div");
        doc.add_class(section, GROUP_CLASS)?;
        doc.insert_before(grid, section, first_paging)?;

        let header = el(doc, section, "div", &["jct-semester-header"])?;
        let heading = semester_name(parse_year_semester(&doc.text_content(members[0])));
        doc.set_text(header, &heading)?;

        let wrapper = el(doc, section, "div", &["jct-carousel-wrapper"])?;
        let strip = el(doc, wrapper, "div", &[CONTAINER_CLASS])?;
        doc.set_attr(strip, INDEX_ATTR, "0")?;
        for &card in members {
            doc.append_child(strip, card)?;
        }

        if members.len() > 1 {
            let prev = el(doc, section, "button", &["jct-carousel-btn", PREV_CLASS])?;
            doc.set_attr(prev, "type", "button")?;
            doc.set_attr(prev, "disabled", "")?;
            doc.set_text(prev, "◀")?;
            let next = el(doc, section, "button", &["jct-carousel-btn", NEXT_CLASS])?;
            doc.set_attr(next, "type", "button")?;
            doc.set_text(next, "▶")?;

            let indicators = el(doc, section, "div", &["jct-carousel-indicators"])?;
            for i in 0..members.len() {
                let dot = el(doc, indicators, "div", &[DOT_CLASS])?;
                doc.set_attr(dot, DOT_INDEX_ATTR, &i.to_string())?;
                doc.toggle_class(dot, "active", i == 0)?;
            }
        }
    }
    doc.set_attr(grid, INITIALIZED_ATTR, "true")?;
    tracing::debug!(groups = groups.len(), "carousel grouped");
    Ok(true)
}

/// Put grouped cards back into `grid` in original order and drop the groups
pub fn restore(doc: &mut Document, grid: NodeId) -> DomResult<bool> {
    let sections: Vec<NodeId> = doc
        .children(grid)
        .iter()
        .copied()
        .filter(|&c| doc.has_class(c, GROUP_CLASS))
        .collect();
    if sections.is_empty() {
        return Ok(false);
    }

    let strip_sel = Selector::class(CONTAINER_CLASS);
    let mut cards: Vec<NodeId> = loose_cards(doc, grid);
    for &section in &sections {
        for strip in doc.query_all(section, &strip_sel) {
            cards.extend_from_slice(doc.children(strip));
        }
    }
    let mut keyed: Vec<(usize, NodeId)> = cards
        .into_iter()
        .enumerate()
        .map(|(pos, card)| (original_index(doc, card).unwrap_or(pos), card))
        .collect();
    keyed.sort_by_key(|(idx, _)| *idx);

    let first_paging = doc.children(grid).iter().copied().find(|&c| is_paging(doc, c));
    for (_, card) in keyed {
        doc.insert_before(grid, card, first_paging)?;
    }
    for section in sections {
        doc.remove(section)?;
    }
    doc.remove_attr(grid, INITIALIZED_ATTR)?;
    tracing::debug!("carousel restored");
    Ok(true)
}

/// Move the strip cursor by `delta`, clamped to the strip. Returns the new index.
pub fn step(doc: &mut Document, strip: NodeId, delta: i64) -> DomResult<usize> {
    let current = doc
        .attr(strip, INDEX_ATTR)
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(0);
    let target = usize::try_from((current + delta).max(0)).unwrap_or(0);
    jump(doc, strip, target)
}

/// Move the strip cursor to `index`, clamped to the strip. Returns the new index.
pub fn jump(doc: &mut Document, strip: NodeId, index: usize) -> DomResult<usize> {
    let total = doc.children(strip).len();
    let index = index.min(total.saturating_sub(1));
    doc.set_attr(strip, INDEX_ATTR, &index.to_string())?;
    doc.set_style(strip, "transform", &format!("translateX({}px)", index * STEP_PX))?;

    let Some(section) = doc.closest(strip, &Selector::class(GROUP_CLASS)) else {
        return Ok(index);
    };
    let controls = [
        (PREV_CLASS, index == 0),
        (NEXT_CLASS, index + 1 >= total),
    ];
    for (class, disabled) in controls {
        if let Some(button) = doc.query(section, &Selector::class(class)) {
            if disabled {
                doc.set_attr(button, "disabled", "")?;
            } else {
                doc.remove_attr(button, "disabled")?;
            }
        }
    }
    for (i, dot) in doc.query_all(section, &Selector::class(DOT_CLASS)).into_iter().enumerate() {
        doc.toggle_class(dot, "active", i == index)?;
    }
    Ok(index)
}
