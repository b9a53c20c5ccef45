//! CSS selector parsing and matching against the arena tree
//!
//! Supported syntax:
//! - type (`div`), universal (`*`), id (`#main`) and class (`.item`) selectors
//! - attribute selectors: `[a]`, `[a=v]`, `[a~=v]`, `[a|=v]`, `[a^=v]`, `[a$=v]`, `[a*=v]`
//! - `:first-child`, `:last-child`, `:only-child`, `:empty`, `:root`
//! - descendant, `>`, `+` and `~` combinators, and `,` separated groups
//!
//! Matching works right to left from a candidate element, walking ancestors
//! and siblings across the whole tree, so a scoped query can still match
//! selectors that mention ancestors of the scope.
use super::arena::{Dom, NodeId, NodeKind};
use crate::errors::{DomLiteError, Result};
use crate::utils::safe_static_regex;
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

define_regex!(
    COMPONENT_REGEX,
    COMPONENT_REGEX_TEXT,
    r#"^(?:(?P<tag>\*|[A-Za-z][\w-]*)|#(?P<id>[\w-]+)|\.(?P<class>[\w-]+)|\[\s*(?P<attr>[A-Za-z_:][\w:.-]*)\s*(?:(?P<op>[~|^$*]?=)\s*(?:"(?P<dq>[^"]*)"|'(?P<sq>[^']*)'|(?P<bare>[^\s\]"']+))\s*)?\]|:(?P<pseudo>[A-Za-z-]+))"#
);
define_regex!(
    COMBINATOR_REGEX,
    COMBINATOR_REGEX_TEXT,
    r"^\s*([>+~])\s*|^\s+"
);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttrOp {
    Exists,
    Equals,
    Includes,
    DashMatch,
    Prefix,
    Suffix,
    Substring,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AttrSelector {
    name: String,
    op: AttrOp,
    value: String,
}

impl AttrSelector {
    fn matches(&self, actual: Option<&str>) -> bool {
        let Some(actual) = actual else {
            return false;
        };
        let expected = self.value.as_str();
        match self.op {
            AttrOp::Exists => true,
            AttrOp::Equals => actual == expected,
            AttrOp::Includes => {
                !expected.is_empty()
                    && !expected.contains(char::is_whitespace)
                    && actual.split_ascii_whitespace().any(|word| word == expected)
            }
            AttrOp::DashMatch => {
                actual == expected
                    || actual
                        .strip_prefix(expected)
                        .is_some_and(|rest| rest.starts_with('-'))
            }
            AttrOp::Prefix => !expected.is_empty() && actual.starts_with(expected),
            AttrOp::Suffix => !expected.is_empty() && actual.ends_with(expected),
            AttrOp::Substring => !expected.is_empty() && actual.contains(expected),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pseudo {
    FirstChild,
    LastChild,
    OnlyChild,
    Empty,
    Root,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    ids: Vec<String>,
    classes: Vec<String>,
    attrs: Vec<AttrSelector>,
    pseudos: Vec<Pseudo>,
}

impl Compound {
    fn matches(&self, dom: &Dom, node: NodeId) -> bool {
        let Some(element) = dom.element(node) else {
            return false;
        };
        if let Some(tag) = &self.tag {
            if !element.name().eq_ignore_ascii_case(tag) {
                return false;
            }
        }
        if !self
            .ids
            .iter()
            .all(|id| element.attr("id") == Some(id.as_str()))
        {
            return false;
        }
        self.classes.iter().all(|class| element.has_class(class))
            && self
                .attrs
                .iter()
                .all(|attr| attr.matches(element.attr(&attr.name)))
            && self.pseudos.iter().all(|pseudo| match pseudo {
                Pseudo::FirstChild => is_first_child(dom, node),
                Pseudo::LastChild => is_last_child(dom, node),
                Pseudo::OnlyChild => is_first_child(dom, node) && is_last_child(dom, node),
                Pseudo::Empty => dom
                    .children(node)
                    .iter()
                    .all(|child| matches!(dom.kind(*child), NodeKind::Comment(_))),
                Pseudo::Root => dom.parent(node) == Some(dom.root()),
            })
    }
}

fn is_first_child(dom: &Dom, node: NodeId) -> bool {
    dom.parent(node).is_some() && dom.previous_element_sibling(node).is_none()
}

fn is_last_child(dom: &Dom, node: NodeId) -> bool {
    let Some(parent) = dom.parent(node) else {
        return false;
    };
    dom.element_children(parent).last() == Some(node)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
    NextSibling,
    SubsequentSibling,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Part {
    // Relation to the part on the left; None for the leftmost part.
    combinator: Option<Combinator>,
    compound: Compound,
}

/// A parsed selector list, reusable across queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    groups: Vec<Vec<Part>>,
}

fn selector_error(source: &str, reason: &str) -> DomLiteError {
    DomLiteError::SelectorError(format!("{reason} in {source:?}"))
}

fn split_groups(source: &str) -> Result<Vec<&str>> {
    let mut groups = Vec::new();
    let mut start = 0;
    let mut quote: Option<char> = None;
    let mut depth = 0usize;
    for (index, c) in source.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '[') => depth += 1,
            (None, ']') => depth = depth.saturating_sub(1),
            (None, ',') if depth == 0 => {
                groups.push(source[start..index].trim());
                start = index + 1;
            }
            _ => {}
        }
    }
    if quote.is_some() || depth != 0 {
        return Err(selector_error(source, "unterminated attribute selector"));
    }
    groups.push(source[start..].trim());
    if groups.iter().any(|group| group.is_empty()) {
        return Err(selector_error(source, "empty selector"));
    }
    Ok(groups)
}

fn parse_pseudo(source: &str, name: &str) -> Result<Pseudo> {
    match name.to_ascii_lowercase().as_str() {
        "first-child" => Ok(Pseudo::FirstChild),
        "last-child" => Ok(Pseudo::LastChild),
        "only-child" => Ok(Pseudo::OnlyChild),
        "empty" => Ok(Pseudo::Empty),
        "root" => Ok(Pseudo::Root),
        other => Err(selector_error(
            source,
            &format!("unsupported pseudo-class :{other}"),
        )),
    }
}

fn parse_attr_op(op: Option<&str>) -> AttrOp {
    match op {
        None => AttrOp::Exists,
        Some("~=") => AttrOp::Includes,
        Some("|=") => AttrOp::DashMatch,
        Some("^=") => AttrOp::Prefix,
        Some("$=") => AttrOp::Suffix,
        Some("*=") => AttrOp::Substring,
        Some(_) => AttrOp::Equals,
    }
}

fn parse_group(
    source: &str,
    group: &str,
    component: &Regex,
    combinator: &Regex,
) -> Result<Vec<Part>> {
    let mut parts = Vec::new();
    let mut pending = None;
    let mut rest = group;
    loop {
        let mut compound = Compound::default();
        let mut matched_any = false;
        while let Some(caps) = component.captures(rest) {
            if let Some(tag) = caps.name("tag") {
                if matched_any {
                    return Err(selector_error(source, "type selector must come first"));
                }
                if tag.as_str() != "*" {
                    compound.tag = Some(tag.as_str().to_ascii_lowercase());
                }
            } else if let Some(id) = caps.name("id") {
                compound.ids.push(id.as_str().to_string());
            } else if let Some(class) = caps.name("class") {
                compound.classes.push(class.as_str().to_string());
            } else if let Some(name) = caps.name("attr") {
                let value = caps
                    .name("dq")
                    .or_else(|| caps.name("sq"))
                    .or_else(|| caps.name("bare"))
                    .map(|m| m.as_str().to_string())
                    .unwrap_or_default();
                compound.attrs.push(AttrSelector {
                    name: name.as_str().to_ascii_lowercase(),
                    op: parse_attr_op(caps.name("op").map(|m| m.as_str())),
                    value,
                });
            } else if let Some(pseudo) = caps.name("pseudo") {
                compound.pseudos.push(parse_pseudo(source, pseudo.as_str())?);
            }
            matched_any = true;
            rest = &rest[caps.get(0).map_or(0, |m| m.end())..];
        }
        if !matched_any {
            return Err(selector_error(source, &format!("unexpected input {rest:?}")));
        }
        parts.push(Part {
            combinator: pending.take(),
            compound,
        });
        if rest.is_empty() {
            return Ok(parts);
        }
        let caps = combinator
            .captures(rest)
            .ok_or_else(|| selector_error(source, &format!("unexpected input {rest:?}")))?;
        pending = Some(match caps.get(1).map(|m| m.as_str()) {
            Some(">") => Combinator::Child,
            Some("+") => Combinator::NextSibling,
            Some("~") => Combinator::SubsequentSibling,
            _ => Combinator::Descendant,
        });
        rest = &rest[caps.get(0).map_or(0, |m| m.end())..];
        if rest.is_empty() {
            return Err(selector_error(source, "dangling combinator"));
        }
    }
}

// Nodes already known not to match a prefix of the compound chain, keyed by
// prefix length. Keeps descendant and sibling backtracking linear.
type FailureMemo = HashSet<(NodeId, usize)>;

fn matches_parts(dom: &Dom, node: NodeId, parts: &[Part], failed: &mut FailureMemo) -> bool {
    let key = (node, parts.len());
    if failed.contains(&key) {
        return false;
    }
    let matched = matches_uncached(dom, node, parts, failed);
    if !matched {
        failed.insert(key);
    }
    matched
}

fn matches_uncached(dom: &Dom, node: NodeId, parts: &[Part], failed: &mut FailureMemo) -> bool {
    let Some((last, left)) = parts.split_last() else {
        return false;
    };
    if !last.compound.matches(dom, node) {
        return false;
    }
    match last.combinator {
        None => true,
        Some(Combinator::Child) => dom
            .parent_element(node)
            .is_some_and(|parent| matches_parts(dom, parent, left, failed)),
        Some(Combinator::Descendant) => {
            let mut current = dom.parent_element(node);
            while let Some(ancestor) = current {
                if matches_parts(dom, ancestor, left, failed) {
                    return true;
                }
                current = dom.parent_element(ancestor);
            }
            false
        }
        Some(Combinator::NextSibling) => dom
            .previous_element_sibling(node)
            .is_some_and(|sibling| matches_parts(dom, sibling, left, failed)),
        Some(Combinator::SubsequentSibling) => {
            let mut current = dom.previous_element_sibling(node);
            while let Some(sibling) = current {
                if matches_parts(dom, sibling, left, failed) {
                    return true;
                }
                current = dom.previous_element_sibling(sibling);
            }
            false
        }
    }
}

impl Selector {
    /// Parse a selector list
    pub fn parse(source: &str) -> Result<Self> {
        let component = safe_static_regex(COMPONENT_REGEX.clone(), COMPONENT_REGEX_TEXT)?;
        let combinator = safe_static_regex(COMBINATOR_REGEX.clone(), COMBINATOR_REGEX_TEXT)?;
        let groups = split_groups(source)?
            .into_iter()
            .map(|group| parse_group(source, group, &component, &combinator))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { groups })
    }

    /// All matching descendants of `scope`, in document order
    pub fn query(&self, dom: &Dom, scope: NodeId) -> Vec<NodeId> {
        // One memo per group, shared by every candidate of this query.
        let mut memos: Vec<FailureMemo> = vec![FailureMemo::new(); self.groups.len()];
        dom.descendants(scope)
            .into_iter()
            .filter(|node| {
                self.groups
                    .iter()
                    .zip(memos.iter_mut())
                    .any(|(parts, failed)| matches_parts(dom, *node, parts, failed))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parse::parse_document;

    const PAGE: &str = r#"
        <div id="main" class="box wide">
          <ul class="list">
            <li class="item first" data-kind="fruit-apple">apple</li>
            <li class="item" data-kind="fruit">pear</li>
            <li class="item last" lang="en-GB"><span></span></li>
          </ul>
          <p>text <em>here</em></p>
        </div>
        <div class="box"><p></p></div>
    "#;

    fn texts(dom: &Dom, selector: &str) -> Vec<String> {
        Selector::parse(selector)
            .unwrap()
            .query(dom, dom.root())
            .into_iter()
            .map(|id| {
                let element = dom.element(id).unwrap();
                format!("{}:{}", element.name(), dom.text(id).trim())
            })
            .collect()
    }

    #[test]
    fn simple_selectors() {
        let dom = parse_document(PAGE);
        assert_eq!(texts(&dom, "li").len(), 3);
        assert_eq!(texts(&dom, "#main").len(), 1);
        assert_eq!(texts(&dom, ".box").len(), 2);
        assert_eq!(texts(&dom, "div.box.wide").len(), 1);
        assert_eq!(texts(&dom, "LI.item.first"), vec!["li:apple"]);
        assert_eq!(texts(&dom, "body > *").len(), 2);
    }

    #[test]
    fn attribute_operators() {
        let dom = parse_document(PAGE);
        assert_eq!(texts(&dom, "[data-kind]").len(), 2);
        assert_eq!(texts(&dom, r#"[data-kind="fruit"]"#), vec!["li:pear"]);
        assert_eq!(texts(&dom, "[data-kind^=fruit-]"), vec!["li:apple"]);
        assert_eq!(texts(&dom, "[data-kind$='apple']"), vec!["li:apple"]);
        assert_eq!(texts(&dom, "[data-kind*=ui]").len(), 2);
        assert_eq!(texts(&dom, "[class~=last]").len(), 1);
        assert_eq!(texts(&dom, "[lang|=en]").len(), 1);
    }

    #[test]
    fn combinators() {
        let dom = parse_document(PAGE);
        assert_eq!(texts(&dom, "#main em"), vec!["em:here"]);
        assert!(texts(&dom, "#main > em").is_empty());
        assert_eq!(texts(&dom, "li.first + li"), vec!["li:pear"]);
        assert_eq!(texts(&dom, "li.first ~ li").len(), 2);
        assert_eq!(texts(&dom, "ul > li > span").len(), 1);
    }

    #[test]
    fn pseudo_classes_and_groups() {
        let dom = parse_document(PAGE);
        assert_eq!(texts(&dom, "li:first-child"), vec!["li:apple"]);
        assert_eq!(texts(&dom, "li:last-child").len(), 1);
        assert_eq!(texts(&dom, "span:only-child").len(), 1);
        assert_eq!(texts(&dom, "p:empty").len(), 1);
        let root = Selector::parse(":root").unwrap().query(&dom, dom.root());
        assert_eq!(root.len(), 1);
        assert_eq!(dom.element(root[0]).unwrap().name(), "html");
        assert_eq!(texts(&dom, "em, li.first"), vec!["li:apple", "em:here"]);
    }

    #[test]
    fn scoped_query_sees_outer_ancestors() {
        let dom = parse_document(PAGE);
        let ul = Selector::parse("ul").unwrap().query(&dom, dom.root())[0];
        let scoped = Selector::parse("#main li").unwrap().query(&dom, ul);
        assert_eq!(scoped.len(), 3);
    }

    #[test]
    fn repeated_ids_must_all_hold() {
        let dom = parse_document(r#"<p id="a"></p><p id="b"></p>"#);
        assert!(texts(&dom, "#a#b").is_empty());
        assert_eq!(texts(&dom, "#a#a").len(), 1);
        assert_eq!(texts(&dom, "p#b").len(), 1);
    }

    #[test]
    fn failing_descendant_chain_stays_linear() {
        let depth = 200;
        let markup = format!("{}<span></span>{}", "<div>".repeat(depth), "</div>".repeat(depth));
        let dom = parse_document(&markup);
        assert!(texts(&dom, "p div div div div div div div div span").is_empty());
        assert!(texts(&dom, "p ~ div div div div div div div div span").is_empty());
        assert_eq!(texts(&dom, "body div div div div div div div div span").len(), 1);
    }

    #[test]
    fn malformed_selectors_are_errors() {
        for bad in ["", "div >", "a,,b", "[x", "div!", ":hover", "p#"] {
            assert!(
                matches!(Selector::parse(bad), Err(DomLiteError::SelectorError(_))),
                "{bad:?} should fail"
            );
        }
    }
}
