//! Typed selectors
//!
//! A small combinator language covering the selector shapes the host
//! contract needs: tag, class, id, attribute tests, descendant and child
//! combinators, and any-of / all-of groups.

use crate::document::Document;
use crate::node::NodeId;

/// Element selector
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    /// Every element
    Any,
    /// Tag name (lowercase)
    Tag(String),
    /// Class list membership
    Class(String),
    /// `id` attribute equality
    Id(String),
    /// Attribute presence
    Attr(String),
    /// Attribute equality
    AttrEquals(String, String),
    /// Attribute substring (`[name*=value]`)
    AttrContains(String, String),
    /// Every selector matches
    All(Vec<Selector>),
    /// At least one selector matches
    AnyOf(Vec<Selector>),
    /// Second matches and some proper ancestor matches first
    Descendant(Box<Selector>, Box<Selector>),
    /// Second matches and the parent matches first
    Child(Box<Selector>, Box<Selector>),
    /// Inner does not match
    Not(Box<Selector>),
}

impl Selector {
    /// Tag selector
    #[must_use]
    pub fn tag(tag: &str) -> Self {
        Self::Tag(tag.to_ascii_lowercase())
    }

    /// Class selector
    #[must_use]
    pub fn class(class: &str) -> Self {
        Self::Class(class.to_string())
    }

    /// Id selector
    #[must_use]
    pub fn id(id: &str) -> Self {
        Self::Id(id.to_string())
    }

    /// Attribute presence selector
    #[must_use]
    pub fn attr(name: &str) -> Self {
        Self::Attr(name.to_string())
    }

    /// Attribute equality selector
    #[must_use]
    pub fn attr_eq(name: &str, value: &str) -> Self {
        Self::AttrEquals(name.to_string(), value.to_string())
    }

    /// Attribute substring selector
    #[must_use]
    pub fn attr_contains(name: &str, needle: &str) -> Self {
        Self::AttrContains(name.to_string(), needle.to_string())
    }

    /// Both `self` and `other` match
    #[must_use]
    pub fn and(self, other: Selector) -> Self {
        match self {
            Self::All(mut parts) => {
                parts.push(other);
                Self::All(parts)
            }
            first => Self::All(vec![first, other]),
        }
    }

    /// Either `self` or `other` matches
    #[must_use]
    pub fn or(self, other: Selector) -> Self {
        match self {
            Self::AnyOf(mut parts) => {
                parts.push(other);
                Self::AnyOf(parts)
            }
            first => Self::AnyOf(vec![first, other]),
        }
    }

    /// `self` matches below an element matching `ancestor`
    #[must_use]
    pub fn within(self, ancestor: Selector) -> Self {
        Self::Descendant(Box::new(ancestor), Box::new(self))
    }

    /// `self` matches directly under an element matching `parent`
    #[must_use]
    pub fn child_of(self, parent: Selector) -> Self {
        Self::Child(Box::new(parent), Box::new(self))
    }

    /// Negation
    #[must_use]
    pub fn negate(self) -> Self {
        Self::Not(Box::new(self))
    }

    /// Any-of group
    #[must_use]
    pub fn any_of(parts: impl IntoIterator<Item = Selector>) -> Self {
        Self::AnyOf(parts.into_iter().collect())
    }

    /// Test `node` against this selector
    #[must_use]
    pub fn matches(&self, doc: &Document, node: NodeId) -> bool {
        let Some(el) = doc.element(node) else {
            return false;
        };
        match self {
            Self::Any => true,
            Self::Tag(tag) => el.tag == *tag,
            Self::Class(class) => el.has_class(class),
            Self::Id(id) => el.attrs.get("id").is_some_and(|v| v == id),
            Self::Attr(name) => el.attr(name).is_some(),
            Self::AttrEquals(name, value) => el.attr(name).is_some_and(|v| v == *value),
            Self::AttrContains(name, needle) => {
                el.attr(name).is_some_and(|v| v.contains(needle.as_str()))
            }
            Self::All(parts) => parts.iter().all(|s| s.matches(doc, node)),
            Self::AnyOf(parts) => parts.iter().any(|s| s.matches(doc, node)),
            Self::Descendant(ancestor, inner) => {
                inner.matches(doc, node)
                    && doc.ancestors(node).any(|a| ancestor.matches(doc, a))
            }
            Self::Child(parent, inner) => {
                inner.matches(doc, node)
                    && el.parent.is_some_and(|p| parent.matches(doc, p))
            }
            Self::Not(inner) => !inner.matches(doc, node),
        }
    }
}
