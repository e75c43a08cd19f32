//! Favorites and favorite-first ordering

use crate::host::CompiledContract;
use reskin_dom::{Document, DomResult, NodeId, Selector};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Attribute holding a card's position at first sight
pub const ORIGINAL_INDEX_ATTR: &str = "data-jct-idx";

/// Marker child of a container rendered as semester groups
pub const GROUP_CLASS: &str = "jct-semester-group";

/// Favorite course ids, persisted as a list
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FavoritesSet(BTreeSet<String>);

impl FavoritesSet {
    /// Empty set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Membership
    #[must_use]
    pub fn contains(&self, course_id: &str) -> bool {
        self.0.contains(course_id)
    }

    /// Membership for an optional id; a card without an id is never a favorite
    #[must_use]
    pub fn contains_opt(&self, course_id: Option<&str>) -> bool {
        course_id.is_some_and(|id| self.contains(id))
    }

    /// Flip membership. Returns the new membership.
    pub fn toggle(&mut self, course_id: &str) -> bool {
        if self.0.remove(course_id) {
            false
        } else {
            self.0.insert(course_id.to_string());
            true
        }
    }

    /// Number of favorites
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// No favorites
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Ids in sorted order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for FavoritesSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// Stamp the original index of `card` unless it already has one
pub fn stamp_original_index(doc: &mut Document, card: NodeId) -> DomResult<()> {
    if doc.has_attr(card, ORIGINAL_INDEX_ATTR) {
        return Ok(());
    }
    if let Some(idx) = doc.index_in_parent(card) {
        doc.set_attr(card, ORIGINAL_INDEX_ATTR, &idx.to_string())?;
    }
    Ok(())
}

/// Stamped original index
#[must_use]
pub fn original_index(doc: &Document, node: NodeId) -> Option<usize> {
    doc.attr(node, ORIGINAL_INDEX_ATTR)
        .and_then(|v| v.parse().ok())
}

/// Order children of `container` favorites first, each partition by original index
///
/// Touches the DOM only when the order changes. Grouped containers are
/// skipped. Returns whether anything moved.
pub fn reorder(
    doc: &mut Document,
    container: NodeId,
    contract: &CompiledContract,
    favorites: &FavoritesSet,
) -> DomResult<bool> {
    let children = doc.children(container).to_vec();
    let group = Selector::class(GROUP_CLASS);
    if children.iter().any(|&c| group.matches(doc, c)) {
        return Ok(false);
    }

    let mut decorated: Vec<(NodeId, bool, usize)> = children
        .iter()
        .enumerate()
        .map(|(pos, &child)| {
            let id = contract.course_id(doc, child);
            let fav = favorites.contains_opt(id.as_deref());
            let idx = original_index(doc, child).unwrap_or(pos);
            (child, fav, idx)
        })
        .collect();
    decorated.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));

    let sorted: Vec<NodeId> = decorated.into_iter().map(|(n, _, _)| n).collect();
    if sorted == children {
        return Ok(false);
    }
    for node in sorted {
        doc.append_child(container, node)?;
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::HostContract;
    use reskin_dom::{CardSpec, PageBuilder, PageLayout};

    fn page(n: usize) -> (Document, NodeId, Vec<NodeId>) {
        let built = PageBuilder::new(PageLayout::Frontpage)
            .cards((0..n).map(|i| CardSpec::new(i.to_string(), format!("Course {i}"))))
            .build()
            .unwrap();
        let container = built.container.unwrap();
        (built.doc, container, built.cards)
    }

    #[test]
    fn toggle_twice_restores() {
        let mut set: FavoritesSet = ["1", "2"].into_iter().collect();
        let before = set.clone();
        assert!(set.toggle("3"));
        assert!(!set.toggle("3"));
        assert_eq!(set, before);
    }

    #[test]
    fn favorites_move_first_in_original_order() {
        let (mut doc, container, cards) = page(5);
        let contract = HostContract::default().compile().unwrap();
        for &card in &cards {
            stamp_original_index(&mut doc, card).unwrap();
        }
        let favorites: FavoritesSet = ["2", "4"].into_iter().collect();

        assert!(reorder(&mut doc, container, &contract, &favorites).unwrap());
        let order: Vec<usize> = doc
            .children(container)
            .iter()
            .map(|&c| original_index(&doc, c).unwrap())
            .collect();
        assert_eq!(order, vec![2, 4, 0, 1, 3]);

        doc.take_records();
        assert!(!reorder(&mut doc, container, &contract, &favorites).unwrap());
        assert!(doc.pending_records().is_empty());
    }

    #[test]
    fn original_index_survives_moves() {
        let (mut doc, container, cards) = page(3);
        stamp_original_index(&mut doc, cards[2]).unwrap();
        doc.prepend_child(container, cards[2]).unwrap();
        stamp_original_index(&mut doc, cards[2]).unwrap();
        assert_eq!(original_index(&doc, cards[2]), Some(2));
    }

    #[test]
    fn grouped_container_is_skipped() {
        let (mut doc, container, _) = page(2);
        let contract = HostContract::default().compile().unwrap();
        let group = doc.create_element("div");
        doc.add_class(group, GROUP_CLASS).unwrap();
        doc.prepend_child(container, group).unwrap();
        let favorites: FavoritesSet = ["1"].into_iter().collect();
        assert!(!reorder(&mut doc, container, &contract, &favorites).unwrap());
    }
}
