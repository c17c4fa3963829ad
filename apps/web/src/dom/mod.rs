//! Page model shared by the reveal and classify behaviors.
//!
//! `Document` is the seam between the behaviors and whatever renders the page.
//! `HeadlessPage` is the in-process implementation used by the binary and tests.

pub mod headless;
pub mod viewport;

pub use headless::{HeadlessPage, IntersectionSupport, NewElement};
pub use viewport::{
    IntersectionEntry, IntersectionObserver, ObserverBinding, ObserverOptions, RootMargin,
    Viewport,
};

use crate::errors::DomError;

/// Opaque handle to an element owned by a `Document`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

/// Element box in page coordinates (px from the top of the document).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LayoutBox {
    pub top: f64,
    pub height: f64,
}

impl LayoutBox {
    pub fn new(top: f64, height: f64) -> Self {
        Self { top, height }
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }
}

/// The subset of CSS selectors the page behaviors need.
#[derive(Debug, Clone, PartialEq)]
pub enum Selector {
    Id(String),
    Class(String),
    Attribute(String),
    /// Union of selectors (`a, b`). Matches are returned once, in document order.
    AnyOf(Vec<Selector>),
}

impl Selector {
    pub fn class(name: &str) -> Self {
        Selector::Class(name.to_string())
    }

    pub fn attribute(name: &str) -> Self {
        Selector::Attribute(name.to_string())
    }
}

/// DOM operations used by the page behaviors.
///
/// Reads on unknown nodes return `None`/`false`; writes return `DomError`.
/// Implementations must be safe to call from any tokio task.
pub trait Document: Send + Sync {
    fn element_by_id(&self, id: &str) -> Option<NodeId>;

    /// All attached elements matching `selector`, in document order.
    fn query_all(&self, selector: &Selector) -> Vec<NodeId>;

    fn attribute(&self, node: NodeId, name: &str) -> Option<String>;

    fn set_attribute(&self, node: NodeId, name: &str, value: &str) -> Result<(), DomError>;

    fn has_attribute(&self, node: NodeId, name: &str) -> bool {
        self.attribute(node, name).is_some()
    }

    fn has_class(&self, node: NodeId, class: &str) -> bool;

    fn add_class(&self, node: NodeId, class: &str) -> Result<(), DomError>;

    fn remove_class(&self, node: NodeId, class: &str) -> Result<(), DomError>;

    /// `textContent`: the node's own text followed by its descendants' text.
    fn text(&self, node: NodeId) -> Option<String>;

    /// Replaces all content (children included) with `text`.
    fn set_text(&self, node: NodeId, text: &str) -> Result<(), DomError>;

    fn append_text(&self, node: NodeId, text: &str) -> Result<(), DomError>;

    /// Form control value; `None` for unknown nodes.
    fn value(&self, node: NodeId) -> Option<String>;

    /// Removes all content of `parent` and inserts a single new child element.
    fn replace_children(&self, parent: NodeId, child: NewElement) -> Result<NodeId, DomError>;

    fn children(&self, node: NodeId) -> Vec<NodeId>;
}
