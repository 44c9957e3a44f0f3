//! Document model seen by the annotator.
//!
//! The annotator never owns the document. It reads node kinds, tag names and
//! text through [`DocumentTree`] and asks the tree to swap a text node for a
//! sequence of plain and annotated segments. Two trees implement it: the
//! in-memory [`memory::Document`] and, on wasm32, the live browser DOM.

use std::borrow::Cow;

pub mod memory;

#[cfg(target_arch = "wasm32")]
pub mod browser;

pub use memory::{Document, MutationRecord, NodeId};

/// What the annotator needs to know about a node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeClass<'a> {
    Text(Cow<'a, str>),
    /// Element with its tag name (any case)
    Element(Cow<'a, str>),
    /// Comments, processing instructions, doctypes...
    Other,
}

/// One piece of a rewritten text node, in original order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment<'t> {
    Plain(&'t str),
    Annotated { matched: &'t str, suffix: String },
}

/// Class names of the generated markup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Markup<'a> {
    pub wrapper_class: &'a str,
    pub suffix_class: &'a str,
}

/// Tag used for both generated elements
pub const MARKUP_TAG: &str = "span";

/// Host document access
pub trait DocumentTree {
    type Node: Clone;

    fn classify(&self, node: &Self::Node) -> NodeClass<'_>;

    fn has_class(&self, node: &Self::Node, class: &str) -> bool;

    /// Snapshot of the current children, in order
    fn children(&self, node: &Self::Node) -> Vec<Self::Node>;

    /// Parent node, if attached
    fn parent_of(&self, node: &Self::Node) -> Option<Self::Node>;

    /// Replace a text node in place with `segments`.
    ///
    /// Each annotated segment becomes a wrapper element (`wrapper_class`)
    /// holding the matched text followed by a suffix element (`suffix_class`).
    /// Returns false if the node could not be replaced (e.g. it is detached).
    fn replace_text(&mut self, node: &Self::Node, segments: &[Segment<'_>], markup: Markup<'_>) -> bool;
}
