//! Selector text parser
//!
//! Accepts the CSS subset the host contract is written in: type, `*`,
//! `.class`, `#id`, `[attr]`, `[attr=value]`, `[attr*=value]`, compound
//! selectors, descendant and `>` combinators, and comma groups.

use crate::error::{DomError, DomResult};
use crate::selector::Selector;
use std::iter::Peekable;
use std::str::Chars;

impl Selector {
    /// Parse selector text
    ///
    /// ```
    /// use reskin_dom::Selector;
    /// let sel = Selector::parse(".jct-courses-grid > .list-group-item, .card.course").unwrap();
    /// assert!(matches!(sel, Selector::AnyOf(_)));
    /// ```
    pub fn parse(input: &str) -> DomResult<Self> {
        let groups = split_groups(input);
        let mut parsed = Vec::with_capacity(groups.len());
        for group in groups {
            let group = group.trim();
            if group.is_empty() {
                return Err(invalid(input, "empty selector group"));
            }
            parsed.push(parse_complex(input, group)?);
        }
        Ok(match parsed.len() {
            1 => parsed.remove(0),
            _ => Selector::AnyOf(parsed),
        })
    }
}

fn invalid(input: &str, reason: impl Into<String>) -> DomError {
    DomError::InvalidSelector {
        input: input.to_string(),
        reason: reason.into(),
    }
}

/// Split on commas outside brackets and quotes
fn split_groups(input: &str) -> Vec<&str> {
    let mut groups = Vec::new();
    let mut depth = 0u32;
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (i, c) in input.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '[') => depth += 1,
            (None, ']') => depth = depth.saturating_sub(1),
            (None, ',') if depth == 0 => {
                groups.push(&input[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    groups.push(&input[start..]);
    groups
}

#[derive(Clone, Copy)]
enum Combinator {
    Descendant,
    Child,
}

fn parse_complex(input: &str, group: &str) -> DomResult<Selector> {
    let mut chars = group.chars().peekable();
    let mut acc = parse_compound(input, &mut chars)?;
    loop {
        let mut saw_space = false;
        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
            saw_space = true;
        }
        let combinator = match chars.peek() {
            None => return Ok(acc),
            Some('>') => {
                chars.next();
                while chars.peek().is_some_and(|c| c.is_whitespace()) {
                    chars.next();
                }
                Combinator::Child
            }
            Some(_) if saw_space => Combinator::Descendant,
            Some(c) => return Err(invalid(input, format!("unexpected {c:?}"))),
        };
        let next = parse_compound(input, &mut chars)?;
        acc = match combinator {
            Combinator::Descendant => Selector::Descendant(Box::new(acc), Box::new(next)),
            Combinator::Child => Selector::Child(Box::new(acc), Box::new(next)),
        };
    }
}

fn parse_compound(input: &str, chars: &mut Peekable<Chars<'_>>) -> DomResult<Selector> {
    let mut parts = Vec::new();
    loop {
        match chars.peek().copied() {
            Some('*') => {
                chars.next();
                parts.push(Selector::Any);
            }
            Some('.') => {
                chars.next();
                parts.push(Selector::Class(ident(input, chars)?));
            }
            Some('#') => {
                chars.next();
                parts.push(Selector::Id(ident(input, chars)?));
            }
            Some('[') => {
                chars.next();
                parts.push(attribute(input, chars)?);
            }
            Some(c) if is_ident_char(c) => {
                parts.push(Selector::Tag(ident(input, chars)?.to_ascii_lowercase()));
            }
            _ => break,
        }
    }
    match parts.len() {
        0 => Err(invalid(input, "expected a simple selector")),
        1 => Ok(parts.remove(0)),
        _ => Ok(Selector::All(parts)),
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_'
}

fn ident(input: &str, chars: &mut Peekable<Chars<'_>>) -> DomResult<String> {
    let mut out = String::new();
    while let Some(&c) = chars.peek() {
        if !is_ident_char(c) {
            break;
        }
        out.push(c);
        chars.next();
    }
    if out.is_empty() {
        return Err(invalid(input, "expected a name"));
    }
    Ok(out)
}

fn attribute(input: &str, chars: &mut Peekable<Chars<'_>>) -> DomResult<Selector> {
    let name = ident(input, chars)?;
    let contains = match chars.next() {
        Some(']') => return Ok(Selector::Attr(name)),
        Some('=') => false,
        Some('*') if chars.next() == Some('=') => true,
        _ => return Err(invalid(input, "malformed attribute test")),
    };
    let value = match chars.peek().copied() {
        Some(q @ ('"' | '\'')) => {
            chars.next();
            let mut value = String::new();
            loop {
                match chars.next() {
                    Some(c) if c == q => break,
                    Some(c) => value.push(c),
                    None => return Err(invalid(input, "unterminated string")),
                }
            }
            value
        }
        _ => ident(input, chars)?,
    };
    if chars.next() != Some(']') {
        return Err(invalid(input, "expected ']'"));
    }
    Ok(if contains {
        Selector::AttrContains(name, value)
    } else {
        Selector::AttrEquals(name, value)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_compound_and_combinators() {
        let sel = Selector::parse(".courses > div.coursebox a[href*=\"/course/view.php\"]").unwrap();
        let expected = Selector::Descendant(
            Box::new(Selector::Child(
                Box::new(Selector::class("courses")),
                Box::new(Selector::All(vec![Selector::tag("div"), Selector::class("coursebox")])),
            )),
            Box::new(Selector::All(vec![
                Selector::tag("a"),
                Selector::attr_contains("href", "/course/view.php"),
            ])),
        );
        assert_eq!(sel, expected);
    }

    #[test]
    fn comma_inside_quotes_is_not_a_group() {
        let sel = Selector::parse("[title='a,b'], #x").unwrap();
        assert_eq!(
            sel,
            Selector::AnyOf(vec![Selector::attr_eq("title", "a,b"), Selector::id("x")])
        );
    }

    #[test]
    fn rejects_garbage() {
        assert!(Selector::parse("").is_err());
        assert!(Selector::parse(".a,,.b").is_err());
        assert!(Selector::parse("[href").is_err());
        assert!(Selector::parse("a >").is_err());
    }

    #[test]
    fn parsed_selector_matches() {
        let mut doc = Document::new();
        let body = doc.body();
        let grid = doc.create_element("div");
        doc.add_class(grid, "jct-courses-grid").unwrap();
        doc.append_child(body, grid).unwrap();
        let card = doc.create_element("div");
        doc.set_attr(card, "class", "card course").unwrap();
        doc.append_child(grid, card).unwrap();

        let sel = Selector::parse(".jct-courses-grid .card.course").unwrap();
        assert_eq!(doc.query_all(body, &sel), vec![card]);
    }
}
