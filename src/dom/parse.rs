//! Building an arena tree from markup via `scraper`
use super::arena::{Dom, ElementData, NodeId, NodeKind};
use log::debug;
use scraper::{ElementRef, Html, Node};

fn element_data(element: &scraper::node::Element) -> ElementData {
    ElementData {
        name: element.name().to_string(),
        attrs: element
            .attrs()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect(),
    }
}

/// Copy the children of `element` (and everything below them) under `parent`
fn import_children(dom: &mut Dom, parent: NodeId, element: ElementRef<'_>) {
    let mut stack = vec![(element, parent)];
    while let Some((element, id)) = stack.pop() {
        for child in element.children() {
            match child.value() {
                Node::Element(data) => {
                    let child_id = dom.append(id, NodeKind::Element(element_data(data)));
                    if let Some(child_ref) = ElementRef::wrap(child) {
                        stack.push((child_ref, child_id));
                    }
                }
                Node::Text(text) => {
                    dom.append(id, NodeKind::Text(String::from(&**text)));
                }
                Node::Comment(comment) => {
                    dom.append(id, NodeKind::Comment(String::from(&**comment)));
                }
                _ => {}
            }
        }
    }
}

/// Parse a full HTML document. The parser never fails; malformed markup is
/// repaired the way browsers repair it.
pub fn parse_document(markup: &str) -> Dom {
    let parsed = Html::parse_document(markup);
    let mut dom = Dom::new();
    let root = dom.root();
    for child in parsed.tree.root().children() {
        match child.value() {
            Node::Doctype(doctype) => {
                dom.append(root, NodeKind::Doctype(doctype.name().to_string()));
            }
            Node::Comment(comment) => {
                dom.append(root, NodeKind::Comment(String::from(&**comment)));
            }
            Node::Element(data) => {
                let id = dom.append(root, NodeKind::Element(element_data(data)));
                if let Some(element) = ElementRef::wrap(child) {
                    import_children(&mut dom, id, element);
                }
            }
            _ => {}
        }
    }
    debug!("parsed document into {} nodes", dom.len());
    dom
}

/// Parse a fragment in body context. The returned tree's document node holds
/// the fragment's top-level nodes directly.
pub fn parse_fragment(markup: &str) -> Dom {
    let parsed = Html::parse_fragment(markup);
    let mut dom = Dom::new();
    let root = dom.root();
    // html5ever wraps fragment content in a synthetic <html> element
    import_children(&mut dom, root, parsed.root_element());
    dom
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_gets_html_head_body() {
        let dom = parse_document("<!DOCTYPE html><p class=\"x\">hi</p>");
        let top: Vec<_> = dom.children(dom.root()).to_vec();
        assert!(matches!(dom.kind(top[0]), NodeKind::Doctype(name) if name == "html"));
        let html = top[1];
        assert_eq!(dom.element(html).unwrap().name(), "html");
        let names: Vec<_> = dom
            .element_children(html)
            .map(|id| dom.element(id).unwrap().name().to_string())
            .collect();
        assert_eq!(names, vec!["head", "body"]);
    }

    #[test]
    fn keeps_text_and_attribute_values() {
        let dom = parse_document("<div id=main>a<b>b</b>c<!-- note --></div>");
        let div = dom
            .descendants(dom.root())
            .into_iter()
            .find(|id| dom.attr(*id, "id") == Some("main"))
            .unwrap();
        assert_eq!(dom.text(div), "abc");
        assert_eq!(dom.children(div).len(), 4);
        assert!(matches!(dom.kind(dom.children(div)[3]), NodeKind::Comment(c) if c == " note "));
    }

    #[test]
    fn fragment_has_no_wrapper() {
        let dom = parse_fragment("<li>one</li><li>two</li>");
        let items: Vec<_> = dom.element_children(dom.root()).collect();
        assert_eq!(items.len(), 2);
        assert_eq!(dom.text(items[1]), "two");
    }
}
