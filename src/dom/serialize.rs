//! HTML serialization of arena subtrees
use super::arena::{Dom, NodeId, NodeKind};

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "xmp", "iframe", "noembed", "noframes"];

fn escape_text(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            c => out.push(c),
        }
    }
}

fn escape_attr(value: &str, out: &mut String) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            c => out.push(c),
        }
    }
}

fn in_raw_text(dom: &Dom, id: NodeId) -> bool {
    dom.parent(id)
        .and_then(|parent| dom.element(parent))
        .is_some_and(|parent| RAW_TEXT_ELEMENTS.contains(&parent.name()))
}

enum Step {
    Open(NodeId),
    Close(NodeId),
}

// Explicit stack instead of recursion, so nesting depth is bounded by memory only.
fn write_steps(dom: &Dom, mut stack: Vec<Step>, out: &mut String) {
    while let Some(step) = stack.pop() {
        let id = match step {
            Step::Open(id) => id,
            Step::Close(id) => {
                if let Some(element) = dom.element(id) {
                    out.push_str("</");
                    out.push_str(element.name());
                    out.push('>');
                }
                continue;
            }
        };
        match dom.kind(id) {
            NodeKind::Document => push_children(dom, id, &mut stack),
            NodeKind::Doctype(name) => {
                out.push_str("<!DOCTYPE ");
                out.push_str(name);
                out.push('>');
            }
            NodeKind::Text(text) if in_raw_text(dom, id) => out.push_str(text),
            NodeKind::Text(text) => escape_text(text, out),
            NodeKind::Comment(comment) => {
                out.push_str("<!--");
                out.push_str(comment);
                out.push_str("-->");
            }
            NodeKind::Element(element) => {
                out.push('<');
                out.push_str(element.name());
                for (key, value) in element.attrs() {
                    out.push(' ');
                    out.push_str(key);
                    out.push_str("=\"");
                    escape_attr(value, out);
                    out.push('"');
                }
                out.push('>');
                if VOID_ELEMENTS.contains(&element.name()) {
                    continue;
                }
                stack.push(Step::Close(id));
                push_children(dom, id, &mut stack);
            }
        }
    }
}

fn push_children(dom: &Dom, id: NodeId, stack: &mut Vec<Step>) {
    stack.extend(dom.children(id).iter().rev().map(|child| Step::Open(*child)));
}

/// Markup for `id` itself and everything below it
pub fn outer_html(dom: &Dom, id: NodeId) -> String {
    let mut out = String::new();
    write_steps(dom, vec![Step::Open(id)], &mut out);
    out
}

/// Markup for the children of `id`
pub fn inner_html(dom: &Dom, id: NodeId) -> String {
    let mut out = String::new();
    let mut stack = Vec::new();
    push_children(dom, id, &mut stack);
    write_steps(dom, stack, &mut out);
    out
}
