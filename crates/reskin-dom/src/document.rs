//! Arena document
//!
//! Owns every node of one page. Writes append [`MutationRecord`]s stamped
//! with the current [`MutationOrigin`]; writes that change nothing append
//! nothing.

use crate::error::{DomError, DomResult};
use crate::event::{DispatchHit, EventKind, Listener, ListenerId, Phase};
use crate::mutation::{MutationKind, MutationOrigin, MutationRecord};
use crate::node::{Element, NodeId};
use crate::selector::Selector;

/// One page worth of nodes
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Option<Element>>,
    root: NodeId,
    body: NodeId,
    origin: MutationOrigin,
    records: Vec<MutationRecord>,
    listeners: Vec<Option<Listener>>,
}

impl Document {
    /// Create `<html><body></body></html>`
    #[must_use]
    pub fn new() -> Self {
        let mut html = Element::new("html");
        let mut body = Element::new("body");
        let root = NodeId::from_raw(0);
        let body_id = NodeId::from_raw(1);
        body.parent = Some(root);
        html.children.push(body_id);
        Self {
            nodes: vec![Some(html), Some(body)],
            root,
            body: body_id,
            origin: MutationOrigin::Host,
            records: Vec::new(),
            listeners: Vec::new(),
        }
    }

    /// The `<html>` element
    #[inline]
    #[must_use]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// The `<body>` element
    #[inline]
    #[must_use]
    pub fn body(&self) -> NodeId {
        self.body
    }

    pub(crate) fn element(&self, node: NodeId) -> Option<&Element> {
        self.nodes.get(node.index()).and_then(Option::as_ref)
    }

    fn element_mut(&mut self, node: NodeId) -> DomResult<&mut Element> {
        self.nodes
            .get_mut(node.index())
            .and_then(Option::as_mut)
            .ok_or(DomError::StaleNode(node))
    }

    fn record(&mut self, target: NodeId, kind: MutationKind) {
        self.records.push(MutationRecord {
            target,
            kind,
            origin: self.origin,
        });
    }

    // ------------------------------------------------------------------
    // Origin and records
    // ------------------------------------------------------------------

    /// Origin stamped on writes right now
    #[inline]
    #[must_use]
    pub fn origin(&self) -> MutationOrigin {
        self.origin
    }

    /// Run `f` with writes stamped as `origin`, restoring the previous origin after
    pub fn with_origin<R>(&mut self, origin: MutationOrigin, f: impl FnOnce(&mut Self) -> R) -> R {
        let previous = std::mem::replace(&mut self.origin, origin);
        let out = f(self);
        self.origin = previous;
        out
    }

    /// Take every queued record
    pub fn take_records(&mut self) -> Vec<MutationRecord> {
        std::mem::take(&mut self.records)
    }

    /// Records queued since the last take
    #[must_use]
    pub fn pending_records(&self) -> &[MutationRecord] {
        &self.records
    }

    // ------------------------------------------------------------------
    // Tree structure
    // ------------------------------------------------------------------

    /// Create a detached element
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        let id = NodeId::from_raw(
            u32::try_from(self.nodes.len()).unwrap_or(u32::MAX),
        );
        self.nodes.push(Some(Element::new(tag)));
        id
    }

    /// Whether the handle still refers to a live node
    #[inline]
    #[must_use]
    pub fn is_live(&self, node: NodeId) -> bool {
        self.element(node).is_some()
    }

    /// Whether the node is reachable from the root
    #[must_use]
    pub fn is_connected(&self, node: NodeId) -> bool {
        self.contains(self.root, node)
    }

    /// Tag name
    #[must_use]
    pub fn tag(&self, node: NodeId) -> Option<&str> {
        self.element(node).map(|e| e.tag.as_str())
    }

    /// Parent element
    #[must_use]
    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.element(node).and_then(|e| e.parent)
    }

    /// Children in order; empty for stale handles
    #[must_use]
    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.element(node).map_or(&[], |e| e.children.as_slice())
    }

    /// First child
    #[must_use]
    pub fn first_child(&self, node: NodeId) -> Option<NodeId> {
        self.children(node).first().copied()
    }

    /// Position among the parent's children
    #[must_use]
    pub fn index_in_parent(&self, node: NodeId) -> Option<usize> {
        let parent = self.parent(node)?;
        self.children(parent).iter().position(|&c| c == node)
    }

    /// Proper ancestors, nearest first
    pub fn ancestors(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(node), move |&n| self.parent(n))
    }

    /// Whether `node` is `ancestor` or lies below it
    #[must_use]
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        if !self.is_live(node) || !self.is_live(ancestor) {
            return false;
        }
        node == ancestor || self.ancestors(node).any(|a| a == ancestor)
    }

    /// Descendants of `scope` in document order, excluding `scope`
    #[must_use]
    pub fn descendants(&self, scope: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(scope).iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.children(node).iter().rev().copied());
        }
        out
    }

    fn detach_from_parent(&mut self, node: NodeId) -> DomResult<()> {
        let Some(parent) = self.parent(node) else {
            return Ok(());
        };
        self.element_mut(parent)?.children.retain(|&c| c != node);
        self.element_mut(node)?.parent = None;
        self.record(
            parent,
            MutationKind::ChildList {
                added: Vec::new(),
                removed: vec![node],
            },
        );
        Ok(())
    }

    fn check_insertable(&self, parent: NodeId, child: NodeId) -> DomResult<()> {
        if child == self.root {
            return Err(DomError::RootImmutable);
        }
        if !self.is_live(parent) {
            return Err(DomError::StaleNode(parent));
        }
        if !self.is_live(child) {
            return Err(DomError::StaleNode(child));
        }
        if self.contains(child, parent) {
            return Err(DomError::HierarchyRequest { parent, child });
        }
        Ok(())
    }

    /// Append `child` to `parent`, moving it if it is attached elsewhere
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> DomResult<()> {
        self.check_insertable(parent, child)?;
        self.detach_from_parent(child)?;
        self.element_mut(parent)?.children.push(child);
        self.element_mut(child)?.parent = Some(parent);
        self.record(
            parent,
            MutationKind::ChildList {
                added: vec![child],
                removed: Vec::new(),
            },
        );
        Ok(())
    }

    /// Insert `child` before `reference` (append when `None`)
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> DomResult<()> {
        let Some(reference) = reference else {
            return self.append_child(parent, child);
        };
        if reference == child {
            return Ok(());
        }
        self.check_insertable(parent, child)?;
        if self.parent(reference) != Some(parent) {
            return Err(DomError::NotAChild { parent, reference });
        }
        self.detach_from_parent(child)?;
        let pos = self
            .children(parent)
            .iter()
            .position(|&c| c == reference)
            .ok_or(DomError::NotAChild { parent, reference })?;
        self.element_mut(parent)?.children.insert(pos, child);
        self.element_mut(child)?.parent = Some(parent);
        self.record(
            parent,
            MutationKind::ChildList {
                added: vec![child],
                removed: Vec::new(),
            },
        );
        Ok(())
    }

    /// Insert `child` as the first child of `parent`
    pub fn prepend_child(&mut self, parent: NodeId, child: NodeId) -> DomResult<()> {
        let first = self.first_child(parent);
        self.insert_before(parent, child, first)
    }

    /// Detach `node` and free its subtree; handles into it become stale
    pub fn remove(&mut self, node: NodeId) -> DomResult<()> {
        if node == self.root || node == self.body {
            return Err(DomError::RootImmutable);
        }
        if !self.is_live(node) {
            return Err(DomError::StaleNode(node));
        }
        self.detach_from_parent(node)?;
        let mut doomed = self.descendants(node);
        doomed.push(node);
        for id in doomed {
            if let Some(slot) = self.nodes.get_mut(id.index()) {
                *slot = None;
            }
            for listener in &mut self.listeners {
                if listener.as_ref().is_some_and(|l| l.node == id) {
                    *listener = None;
                }
            }
        }
        Ok(())
    }

    /// Remove every child of `node`
    pub fn clear_children(&mut self, node: NodeId) -> DomResult<()> {
        let children = self.children(node).to_vec();
        for child in children {
            self.remove(child)?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Attributes, classes, style, text
    // ------------------------------------------------------------------

    /// Attribute value (`class` is synthesised from the class list)
    #[must_use]
    pub fn attr(&self, node: NodeId, name: &str) -> Option<String> {
        self.element(node).and_then(|e| e.attr(name))
    }

    /// Whether the attribute is present
    #[must_use]
    pub fn has_attr(&self, node: NodeId, name: &str) -> bool {
        self.attr(node, name).is_some()
    }

    /// Set an attribute; records only when the value changes
    pub fn set_attr(&mut self, node: NodeId, name: &str, value: &str) -> DomResult<()> {
        if name == "class" {
            let el = self.element_mut(node)?;
            let classes: Vec<String> = value.split_whitespace().map(str::to_string).collect();
            if el.classes == classes {
                return Ok(());
            }
            el.classes = classes;
        } else {
            let el = self.element_mut(node)?;
            if el.attrs.get(name).map(String::as_str) == Some(value) {
                return Ok(());
            }
            el.attrs.insert(name.to_string(), value.to_string());
        }
        self.record(node, MutationKind::Attribute { name: name.to_string() });
        Ok(())
    }

    /// Remove an attribute; records only when it was present
    pub fn remove_attr(&mut self, node: NodeId, name: &str) -> DomResult<()> {
        let el = self.element_mut(node)?;
        let removed = if name == "class" {
            !std::mem::take(&mut el.classes).is_empty()
        } else {
            el.attrs.remove(name).is_some()
        };
        if removed {
            self.record(node, MutationKind::Attribute { name: name.to_string() });
        }
        Ok(())
    }

    /// Class list membership
    #[must_use]
    pub fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.element(node).is_some_and(|e| e.has_class(class))
    }

    /// Class list in order
    #[must_use]
    pub fn classes(&self, node: NodeId) -> &[String] {
        self.element(node).map_or(&[], |e| e.classes.as_slice())
    }

    /// Add a class
    pub fn add_class(&mut self, node: NodeId, class: &str) -> DomResult<()> {
        self.toggle_class(node, class, true)
    }

    /// Remove a class
    pub fn remove_class(&mut self, node: NodeId, class: &str) -> DomResult<()> {
        self.toggle_class(node, class, false)
    }

    /// Force class membership to `on`
    pub fn toggle_class(&mut self, node: NodeId, class: &str, on: bool) -> DomResult<()> {
        let el = self.element_mut(node)?;
        let present = el.has_class(class);
        if present == on {
            return Ok(());
        }
        if on {
            el.classes.push(class.to_string());
        } else {
            el.classes.retain(|c| c != class);
        }
        self.record(node, MutationKind::Attribute { name: "class".to_string() });
        Ok(())
    }

    /// Inline style property
    #[must_use]
    pub fn style(&self, node: NodeId, property: &str) -> Option<&str> {
        self.element(node)
            .and_then(|e| e.style.get(property))
            .map(String::as_str)
    }

    /// Set an inline style property; records only when the value changes
    pub fn set_style(&mut self, node: NodeId, property: &str, value: &str) -> DomResult<()> {
        let el = self.element_mut(node)?;
        if el.style.get(property).map(String::as_str) == Some(value) {
            return Ok(());
        }
        el.style.insert(property.to_string(), value.to_string());
        self.record(node, MutationKind::Attribute { name: "style".to_string() });
        Ok(())
    }

    /// Own text of the element
    #[must_use]
    pub fn own_text(&self, node: NodeId) -> &str {
        self.element(node).map_or("", |e| e.text.as_str())
    }

    /// Set own text; records only when it changes
    pub fn set_text(&mut self, node: NodeId, text: &str) -> DomResult<()> {
        let el = self.element_mut(node)?;
        if el.text == text {
            return Ok(());
        }
        el.text = text.to_string();
        self.record(node, MutationKind::Text);
        Ok(())
    }

    /// Text of the node and its descendants, one line per non-empty piece
    #[must_use]
    pub fn text_content(&self, node: NodeId) -> String {
        let mut pieces = Vec::new();
        let own = self.own_text(node).trim();
        if !own.is_empty() {
            pieces.push(own.to_string());
        }
        for d in self.descendants(node) {
            let text = self.own_text(d).trim();
            if !text.is_empty() {
                pieces.push(text.to_string());
            }
        }
        pieces.join("\n")
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Descendants of `scope` matching `selector`, in document order
    #[must_use]
    pub fn query_all(&self, scope: NodeId, selector: &Selector) -> Vec<NodeId> {
        self.descendants(scope)
            .into_iter()
            .filter(|&n| selector.matches(self, n))
            .collect()
    }

    /// First descendant of `scope` matching `selector`
    #[must_use]
    pub fn query(&self, scope: NodeId, selector: &Selector) -> Option<NodeId> {
        self.descendants(scope)
            .into_iter()
            .find(|&n| selector.matches(self, n))
    }

    /// `node` or its nearest ancestor matching `selector`
    #[must_use]
    pub fn closest(&self, node: NodeId, selector: &Selector) -> Option<NodeId> {
        if !self.is_live(node) {
            return None;
        }
        std::iter::once(node)
            .chain(self.ancestors(node))
            .find(|&n| selector.matches(self, n))
    }

    /// Connected element with the given `id` attribute
    #[must_use]
    pub fn element_by_id(&self, id: &str) -> Option<NodeId> {
        self.query(self.root, &Selector::id(id))
    }

    // ------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------

    /// Register a keyed listener. Every call adds a registration.
    pub fn add_listener(
        &mut self,
        node: NodeId,
        event: EventKind,
        phase: Phase,
        key: &'static str,
    ) -> DomResult<ListenerId> {
        if !self.is_live(node) {
            return Err(DomError::StaleNode(node));
        }
        self.listeners.push(Some(Listener {
            node,
            event,
            phase,
            key,
        }));
        Ok(ListenerId(self.listeners.len() - 1))
    }

    /// Drop a registration
    pub fn remove_listener(&mut self, id: ListenerId) {
        if let Some(slot) = self.listeners.get_mut(id.0) {
            *slot = None;
        }
    }

    /// Whether a listener with `key` for `event` sits on `node`
    #[must_use]
    pub fn has_listener(&self, node: NodeId, event: EventKind, key: &str) -> bool {
        self.listeners
            .iter()
            .flatten()
            .any(|l| l.node == node && l.event == event && l.key == key)
    }

    /// Live registrations
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.iter().flatten().count()
    }

    /// Listeners reached by `event` targeted at `target`: capture root→target, then bubble target→root
    #[must_use]
    pub fn dispatch(&self, event: EventKind, target: NodeId) -> Vec<DispatchHit> {
        if !self.is_live(target) {
            return Vec::new();
        }
        let mut path: Vec<NodeId> = std::iter::once(target).chain(self.ancestors(target)).collect();
        path.reverse();

        let mut hits = Vec::new();
        for &node in &path {
            self.collect_hits(node, event, Phase::Capture, &mut hits);
        }
        for &node in path.iter().rev() {
            self.collect_hits(node, event, Phase::Bubble, &mut hits);
        }
        hits
    }

    fn collect_hits(&self, node: NodeId, event: EventKind, phase: Phase, hits: &mut Vec<DispatchHit>) {
        for l in self.listeners.iter().flatten() {
            if l.node == node && l.event == event && l.phase == phase {
                hits.push(DispatchHit {
                    key: l.key,
                    current_target: node,
                    phase,
                });
            }
        }
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn el(doc: &mut Document, parent: NodeId, tag: &str) -> NodeId {
        let n = doc.create_element(tag);
        doc.append_child(parent, n).unwrap();
        n
    }

    #[test]
    fn append_moves_attached_node() {
        let mut doc = Document::new();
        let body = doc.body();
        let a = el(&mut doc, body, "div");
        let b = el(&mut doc, body, "div");
        let x = el(&mut doc, a, "span");

        doc.append_child(b, x).unwrap();

        assert!(doc.children(a).is_empty());
        assert_eq!(doc.children(b), &[x]);
        assert_eq!(doc.parent(x), Some(b));
    }

    #[test]
    fn cannot_insert_ancestor_below_descendant() {
        let mut doc = Document::new();
        let body = doc.body();
        let a = el(&mut doc, body, "div");
        let b = el(&mut doc, a, "div");

        let err = doc.append_child(b, a).unwrap_err();
        assert_eq!(err, DomError::HierarchyRequest { parent: b, child: a });
    }

    #[test]
    fn prepend_puts_node_first() {
        let mut doc = Document::new();
        let body = doc.body();
        let card = el(&mut doc, body, "div");
        let existing = el(&mut doc, card, "h3");
        let thumb = doc.create_element("div");

        doc.prepend_child(card, thumb).unwrap();

        assert_eq!(doc.children(card), &[thumb, existing]);
    }

    #[test]
    fn remove_frees_subtree_and_listeners() {
        let mut doc = Document::new();
        let body = doc.body();
        let card = el(&mut doc, body, "div");
        let button = el(&mut doc, card, "button");
        doc.add_listener(button, EventKind::Click, Phase::Bubble, "k").unwrap();

        doc.remove(card).unwrap();

        assert!(!doc.is_live(button));
        assert_eq!(doc.listener_count(), 0);
        assert!(doc.set_attr(button, "x", "y").is_err());
    }

    #[test]
    fn writes_record_only_changes_with_origin() {
        let mut doc = Document::new();
        let body = doc.body();
        doc.take_records();

        doc.set_attr(body, "dir", "rtl").unwrap();
        doc.set_attr(body, "dir", "rtl").unwrap();
        doc.with_origin(MutationOrigin::Engine, |doc| {
            doc.add_class(body, "jct").unwrap();
            doc.add_class(body, "jct").unwrap();
        });

        let records = doc.take_records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].origin, MutationOrigin::Host);
        assert_eq!(records[1].origin, MutationOrigin::Engine);
        assert_eq!(doc.origin(), MutationOrigin::Host);
    }

    #[test]
    fn text_content_joins_pieces() {
        let mut doc = Document::new();
        let body = doc.body();
        let card = el(&mut doc, body, "div");
        let h = el(&mut doc, card, "h3");
        doc.set_text(h, " Algorithms ").unwrap();
        let p = el(&mut doc, card, "p");
        doc.set_text(p, "Semester A").unwrap();

        assert_eq!(doc.text_content(card), "Algorithms\nSemester A");
    }

    #[test]
    fn dispatch_orders_capture_before_bubble() {
        let mut doc = Document::new();
        let root = doc.root();
        let body = doc.body();
        let button = el(&mut doc, body, "button");
        doc.add_listener(button, EventKind::Click, Phase::Bubble, "own").unwrap();
        doc.add_listener(root, EventKind::Click, Phase::Capture, "delegate").unwrap();
        doc.add_listener(root, EventKind::Click, Phase::Bubble, "late").unwrap();

        let keys: Vec<_> = doc
            .dispatch(EventKind::Click, button)
            .into_iter()
            .map(|h| h.key)
            .collect();
        assert_eq!(keys, vec!["delegate", "own", "late"]);
    }

    #[test]
    fn closest_includes_self() {
        let mut doc = Document::new();
        let body = doc.body();
        let card = el(&mut doc, body, "li");
        let btn = el(&mut doc, card, "button");
        assert_eq!(doc.closest(btn, &Selector::tag("li")), Some(card));
        assert_eq!(doc.closest(card, &Selector::tag("li")), Some(card));
    }
}
