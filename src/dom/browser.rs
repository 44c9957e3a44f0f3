//! Live browser DOM behind [`DocumentTree`].
//!
//! Rewrites build a `DocumentFragment` and swap it in with one
//! `replaceChild`, so the page sees a single child-list mutation per
//! annotated text node.

use std::borrow::Cow;
use wasm_bindgen::JsCast;
use web_sys::{Document, DocumentFragment, Element, Node};

use super::{DocumentTree, Markup, NodeClass, Segment, MARKUP_TAG};

pub struct BrowserTree {
    document: Document,
}

impl BrowserTree {
    pub fn new(document: Document) -> Self {
        Self { document }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    fn span(&self, class: &str) -> Option<Element> {
        let el = self.document.create_element(MARKUP_TAG).ok()?;
        el.set_class_name(class);
        Some(el)
    }

    fn build_fragment(&self, segments: &[Segment<'_>], markup: Markup<'_>) -> Option<DocumentFragment> {
        let fragment = self.document.create_document_fragment();
        for segment in segments {
            match segment {
                Segment::Plain(text) => {
                    fragment.append_child(&self.document.create_text_node(text)).ok()?;
                }
                Segment::Annotated { matched, suffix } => {
                    let wrapper = self.span(markup.wrapper_class)?;
                    wrapper.append_child(&self.document.create_text_node(matched)).ok()?;
                    let suffix_el = self.span(markup.suffix_class)?;
                    suffix_el.set_text_content(Some(suffix));
                    wrapper.append_child(&suffix_el).ok()?;
                    fragment.append_child(&wrapper).ok()?;
                }
            }
        }
        Some(fragment)
    }
}

impl DocumentTree for BrowserTree {
    type Node = Node;

    fn classify(&self, node: &Node) -> NodeClass<'_> {
        match node.node_type() {
            Node::TEXT_NODE => NodeClass::Text(Cow::Owned(node.node_value().unwrap_or_default())),
            Node::ELEMENT_NODE => NodeClass::Element(Cow::Owned(node.node_name())),
            _ => NodeClass::Other,
        }
    }

    fn has_class(&self, node: &Node, class: &str) -> bool {
        node.dyn_ref::<Element>()
            .map(|el| el.class_list().contains(class))
            .unwrap_or(false)
    }

    fn children(&self, node: &Node) -> Vec<Node> {
        let list = node.child_nodes();
        (0..list.length()).filter_map(|i| list.item(i)).collect()
    }

    fn parent_of(&self, node: &Node) -> Option<Node> {
        node.parent_node()
    }

    fn replace_text(&mut self, node: &Node, segments: &[Segment<'_>], markup: Markup<'_>) -> bool {
        let Some(parent) = node.parent_node() else {
            return false;
        };
        let Some(fragment) = self.build_fragment(segments, markup) else {
            return false;
        };
        parent.replace_child(&fragment, node).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::funding::FundingTable;
    use crate::preferences::Preferences;
    use crate::scanner::Annotator;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    fn setup(html: &str) -> (BrowserTree, Element) {
        let document = web_sys::window().unwrap().document().unwrap();
        let host = document.create_element("div").unwrap();
        host.set_inner_html(html);
        document.body().unwrap().append_child(&host).unwrap();
        (BrowserTree::new(document), host)
    }

    fn annotator() -> Annotator {
        Annotator::new(FundingTable::builtin(), &Preferences::default(), EngineConfig::default()).unwrap()
    }

    #[wasm_bindgen_test]
    fn annotates_live_text() {
        let (mut tree, host) = setup("<p>Lu dans Le Monde.</p><script>Le Monde</script>");
        let root: Node = host.clone().into();
        let stats = annotator().annotate(&mut tree, &root);
        assert_eq!(stats.annotations, 1);
        assert_eq!(
            host.inner_html(),
            "<p>Lu dans <span class=\"fundcore-annotated\">Le Monde<span class=\"fundcore-suffix\"> (8,3M€ public '23)</span></span>.</p><script>Le Monde</script>"
        );
    }

    #[wasm_bindgen_test]
    fn second_pass_is_noop() {
        let (mut tree, host) = setup("<ul><li>Arte</li><li>TF1 et M6</li></ul>");
        let root: Node = host.clone().into();
        let a = annotator();
        a.annotate(&mut tree, &root);
        let once = host.inner_html();
        let stats = a.annotate(&mut tree, &root);
        assert_eq!(stats.annotations, 0);
        assert_eq!(host.inner_html(), once);
    }
}
