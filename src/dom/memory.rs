//! In-memory document tree.
//!
//! An arena of text, element and comment nodes with parent links. Every
//! structural write is logged as a [`MutationRecord`], the same shape a
//! browser `MutationObserver` reports, so the watcher can be driven without a
//! browser.

use std::borrow::Cow;

use super::{DocumentTree, Markup, NodeClass, Segment, MARKUP_TAG};

// =============================================================================
// Types
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum NodeData {
    Text(String),
    Element { tag: String, classes: Vec<String> },
    Comment(String),
}

#[derive(Debug, Clone)]
struct NodeEntry {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// A child-list change under `target`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    pub target: NodeId,
    pub added: Vec<NodeId>,
    pub removed: Vec<NodeId>,
}

/// Arena-backed document rooted at a `BODY` element
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<NodeEntry>,
    root: NodeId,
    mutations: Vec<MutationRecord>,
    writes: u64,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Construction
// =============================================================================

impl Document {
    pub fn new() -> Self {
        let mut doc = Self {
            nodes: Vec::new(),
            root: NodeId(0),
            mutations: Vec::new(),
            writes: 0,
        };
        doc.root = doc.alloc(NodeData::Element {
            tag: "BODY".to_string(),
            classes: Vec::new(),
        });
        doc
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    fn alloc(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeEntry {
            data,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    /// Detached element; tag names are stored upper-case like HTML `nodeName`
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.alloc(NodeData::Element {
            tag: tag.to_ascii_uppercase(),
            classes: Vec::new(),
        })
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.alloc(NodeData::Text(text.to_string()))
    }

    pub fn create_comment(&mut self, text: &str) -> NodeId {
        self.alloc(NodeData::Comment(text.to_string()))
    }

    pub fn add_class(&mut self, id: NodeId, class: &str) {
        if let Some(NodeData::Element { classes, .. }) = self.nodes.get_mut(id.0).map(|n| &mut n.data) {
            if !classes.iter().any(|c| c == class) {
                classes.push(class.to_string());
            }
        }
    }

    /// Append `child` under `parent`, moving it if already attached.
    /// Only elements accept children.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        if parent == child || !self.is_element(parent) || self.is_ancestor(child, parent) {
            return false;
        }

        if let Some(old_parent) = self.nodes[child.0].parent.take() {
            self.nodes[old_parent.0].children.retain(|&c| c != child);
            self.mutations.push(MutationRecord {
                target: old_parent,
                added: Vec::new(),
                removed: vec![child],
            });
        }

        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
        self.mutations.push(MutationRecord {
            target: parent,
            added: vec![child],
            removed: Vec::new(),
        });
        self.writes += 1;
        true
    }

    pub fn append_text(&mut self, parent: NodeId, text: &str) -> NodeId {
        let id = self.create_text(text);
        self.append_child(parent, id);
        id
    }

    pub fn append_element(&mut self, parent: NodeId, tag: &str) -> NodeId {
        let id = self.create_element(tag);
        self.append_child(parent, id);
        id
    }

    /// Overwrite a text node's data (a characterData change, not a child-list one)
    pub fn set_text(&mut self, id: NodeId, text: &str) -> bool {
        match self.nodes.get_mut(id.0).map(|n| &mut n.data) {
            Some(NodeData::Text(data)) => {
                *data = text.to_string();
                self.writes += 1;
                true
            }
            _ => false,
        }
    }
}

// =============================================================================
// Queries
// =============================================================================

impl Document {
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.0).and_then(|n| n.parent)
    }

    pub fn child_ids(&self, id: NodeId) -> &[NodeId] {
        self.nodes.get(id.0).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        match self.nodes.get(id.0).map(|n| &n.data) {
            Some(NodeData::Element { tag, .. }) => Some(tag.as_str()),
            _ => None,
        }
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        match self.nodes.get(id.0).map(|n| &n.data) {
            Some(NodeData::Text(text)) => Some(text.as_str()),
            _ => None,
        }
    }

    pub fn classes(&self, id: NodeId) -> &[String] {
        match self.nodes.get(id.0).map(|n| &n.data) {
            Some(NodeData::Element { classes, .. }) => classes.as_slice(),
            _ => &[],
        }
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.nodes.get(id.0).map(|n| &n.data), Some(NodeData::Element { .. }))
    }

    fn is_ancestor(&self, ancestor: NodeId, mut id: NodeId) -> bool {
        while let Some(parent) = self.parent(id) {
            if parent == ancestor {
                return true;
            }
            id = parent;
        }
        false
    }

    /// Reachable from the root
    pub fn is_connected(&self, id: NodeId) -> bool {
        id == self.root || self.is_ancestor(self.root, id)
    }

    /// Concatenated text of all descendant text nodes
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        match self.nodes.get(id.0).map(|n| &n.data) {
            Some(NodeData::Text(text)) => out.push_str(text),
            Some(NodeData::Element { .. }) => {
                for &child in self.child_ids(id) {
                    self.collect_text(child, out);
                }
            }
            _ => {}
        }
    }

    /// HTML-like serialization for assertions and debugging. Text is not escaped.
    pub fn render(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.render_into(id, &mut out);
        out
    }

    fn render_into(&self, id: NodeId, out: &mut String) {
        match self.nodes.get(id.0).map(|n| &n.data) {
            Some(NodeData::Text(text)) => out.push_str(text),
            Some(NodeData::Comment(text)) => {
                out.push_str("<!--");
                out.push_str(text);
                out.push_str("-->");
            }
            Some(NodeData::Element { tag, classes }) => {
                let tag = tag.to_ascii_lowercase();
                out.push('<');
                out.push_str(&tag);
                if !classes.is_empty() {
                    out.push_str(" class=\"");
                    out.push_str(&classes.join(" "));
                    out.push('"');
                }
                out.push('>');
                for &child in self.child_ids(id) {
                    self.render_into(child, out);
                }
                out.push_str("</");
                out.push_str(&tag);
                out.push('>');
            }
            None => {}
        }
    }

    /// Drain the mutation log
    pub fn take_mutations(&mut self) -> Vec<MutationRecord> {
        std::mem::take(&mut self.mutations)
    }

    /// Number of writes performed on the tree so far
    pub fn write_count(&self) -> u64 {
        self.writes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

// =============================================================================
// DocumentTree
// =============================================================================

impl DocumentTree for Document {
    type Node = NodeId;

    fn classify(&self, node: &NodeId) -> NodeClass<'_> {
        match self.nodes.get(node.0).map(|n| &n.data) {
            Some(NodeData::Text(text)) => NodeClass::Text(Cow::Borrowed(text.as_str())),
            Some(NodeData::Element { tag, .. }) => NodeClass::Element(Cow::Borrowed(tag.as_str())),
            _ => NodeClass::Other,
        }
    }

    fn has_class(&self, node: &NodeId, class: &str) -> bool {
        self.classes(*node).iter().any(|c| c == class)
    }

    fn children(&self, node: &NodeId) -> Vec<NodeId> {
        self.child_ids(*node).to_vec()
    }

    fn parent_of(&self, node: &NodeId) -> Option<NodeId> {
        self.parent(*node)
    }

    fn replace_text(&mut self, node: &NodeId, segments: &[Segment<'_>], markup: Markup<'_>) -> bool {
        let node = *node;
        if self.text(node).is_none() {
            return false;
        }
        let Some(parent) = self.parent(node) else {
            return false;
        };
        let Some(pos) = self.nodes[parent.0].children.iter().position(|&c| c == node) else {
            return false;
        };

        let mut added = Vec::with_capacity(segments.len());
        for segment in segments {
            match segment {
                Segment::Plain(text) => {
                    if !text.is_empty() {
                        added.push(self.create_text(text));
                    }
                }
                Segment::Annotated { matched, suffix } => {
                    let wrapper = self.create_element(MARKUP_TAG);
                    self.add_class(wrapper, markup.wrapper_class);
                    let matched = self.create_text(matched);
                    let suffix_el = self.create_element(MARKUP_TAG);
                    self.add_class(suffix_el, markup.suffix_class);
                    let suffix_text = self.create_text(suffix);

                    self.link(suffix_el, suffix_text);
                    self.link(wrapper, matched);
                    self.link(wrapper, suffix_el);
                    added.push(wrapper);
                }
            }
        }

        for &id in &added {
            self.nodes[id.0].parent = Some(parent);
        }
        self.nodes[parent.0].children.splice(pos..pos + 1, added.iter().copied());
        self.nodes[node.0].parent = None;

        self.mutations.push(MutationRecord {
            target: parent,
            added,
            removed: vec![node],
        });
        self.writes += 1;
        true
    }
}

impl Document {
    /// Attach a freshly created node without logging (it is part of a larger insertion)
    fn link(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const MARKUP: Markup<'static> = Markup {
        wrapper_class: "w",
        suffix_class: "s",
    };

    #[test]
    fn test_build_and_render() {
        let mut doc = Document::new();
        let p = doc.append_element(doc.root(), "p");
        doc.append_text(p, "Hello ");
        let b = doc.append_element(p, "b");
        doc.append_text(b, "world");

        assert_eq!(doc.render(doc.root()), "<body><p>Hello <b>world</b></p></body>");
        assert_eq!(doc.text_content(doc.root()), "Hello world");
        assert_eq!(doc.tag(p), Some("P"));
    }

    #[test]
    fn test_append_records_mutations() {
        let mut doc = Document::new();
        let p = doc.append_element(doc.root(), "p");
        let t = doc.append_text(p, "x");

        let records = doc.take_mutations();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].added, vec![p]);
        assert_eq!(records[1].target, p);
        assert_eq!(records[1].added, vec![t]);
        assert!(doc.take_mutations().is_empty());
    }

    #[test]
    fn test_text_nodes_reject_children() {
        let mut doc = Document::new();
        let t = doc.append_text(doc.root(), "x");
        let other = doc.create_text("y");
        assert!(!doc.append_child(t, other));
    }

    #[test]
    fn test_append_rejects_cycles() {
        let mut doc = Document::new();
        let a = doc.append_element(doc.root(), "div");
        let b = doc.append_element(a, "div");
        assert!(!doc.append_child(b, a));
        assert!(!doc.append_child(a, a));
    }

    #[test]
    fn test_set_text_is_not_a_child_list_mutation() {
        let mut doc = Document::new();
        let t = doc.append_text(doc.root(), "x");
        doc.take_mutations();

        assert!(doc.set_text(t, "y"));
        assert!(doc.take_mutations().is_empty());
        assert_eq!(doc.text(t), Some("y"));
    }

    #[test]
    fn test_replace_text_in_place() {
        let mut doc = Document::new();
        let p = doc.append_element(doc.root(), "p");
        doc.append_text(p, "A");
        let t = doc.append_text(p, "Le Monde dit");
        doc.append_text(p, "Z");
        doc.take_mutations();

        let segments = [
            Segment::Annotated {
                matched: "Le Monde",
                suffix: " (8,3M€)".to_string(),
            },
            Segment::Plain(" dit"),
        ];
        assert!(doc.replace_text(&t, &segments, MARKUP));

        assert_eq!(
            doc.render(p),
            "<p>A<span class=\"w\">Le Monde<span class=\"s\"> (8,3M€)</span></span> ditZ</p>"
        );
        assert!(!doc.is_connected(t));

        let records = doc.take_mutations();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].target, p);
        assert_eq!(records[0].added.len(), 2);
        assert_eq!(records[0].removed, vec![t]);
    }

    #[test]
    fn test_replace_detached_text_fails() {
        let mut doc = Document::new();
        let t = doc.create_text("Le Monde");
        let writes = doc.write_count();
        assert!(!doc.replace_text(&t, &[Segment::Plain("x")], MARKUP));
        assert_eq!(doc.write_count(), writes);
    }

    #[test]
    fn test_classify() {
        let mut doc = Document::new();
        let t = doc.append_text(doc.root(), "x");
        let c = doc.create_comment("note");
        doc.append_child(doc.root(), c);

        assert_eq!(doc.classify(&t), NodeClass::Text(Cow::Borrowed("x")));
        assert_eq!(doc.classify(&doc.root()), NodeClass::Element(Cow::Borrowed("BODY")));
        assert_eq!(doc.classify(&c), NodeClass::Other);
        assert_eq!(doc.render(doc.root()), "<body>x<!--note--></body>");
    }
}
