//! In-process page: element tree, scroll position, and intersection observers.
//!
//! Layout is supplied by the caller (`NewElement::layout`); the page never
//! computes layout itself. Observers are re-evaluated on every scroll or
//! layout change and emit an entry only when a target's state flips.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;
use tracing::debug;

use super::viewport::{
    intersection_ratio, IntersectionEntry, IntersectionObserver, ObserverBinding,
    ObserverOptions, Viewport,
};
use super::{Document, LayoutBox, NodeId, Selector};
use crate::errors::{DomError, RevealSetupError};

/// What `Viewport::observer` does on this page.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum IntersectionSupport {
    #[default]
    Supported,
    /// The capability is absent (`Ok(None)`).
    Unsupported,
    /// Observer construction fails at runtime with this message.
    Failing(String),
}

/// Builder for elements inserted into a `HeadlessPage`.
#[derive(Debug, Clone, Default)]
pub struct NewElement {
    tag: String,
    id: Option<String>,
    classes: Vec<String>,
    attributes: BTreeMap<String, String>,
    text: String,
    value: String,
    layout: LayoutBox,
}

impl NewElement {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            ..Default::default()
        }
    }

    pub fn id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    pub fn class(mut self, class: &str) -> Self {
        if !self.classes.iter().any(|c| c == class) {
            self.classes.push(class.to_string());
        }
        self
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.to_string(), value.to_string());
        self
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn value(mut self, value: &str) -> Self {
        self.value = value.to_string();
        self
    }

    pub fn layout(mut self, top: f64, height: f64) -> Self {
        self.layout = LayoutBox::new(top, height);
        self
    }
}

#[derive(Debug)]
struct Node {
    tag: String,
    id: Option<String>,
    classes: Vec<String>,
    attributes: BTreeMap<String, String>,
    text: String,
    value: String,
    layout: LayoutBox,
    children: Vec<NodeId>,
    attached: bool,
}

impl Node {
    fn from_element(element: NewElement) -> Self {
        Self {
            tag: element.tag,
            id: element.id,
            classes: element.classes,
            attributes: element.attributes,
            text: element.text,
            value: element.value,
            layout: element.layout,
            children: Vec::new(),
            attached: true,
        }
    }

    fn matches(&self, selector: &Selector) -> bool {
        match selector {
            Selector::Id(id) => self.id.as_deref() == Some(id.as_str()),
            Selector::Class(class) => self.classes.iter().any(|c| c == class),
            Selector::Attribute(name) => self.attributes.contains_key(name),
            Selector::AnyOf(selectors) => selectors.iter().any(|s| self.matches(s)),
        }
    }
}

struct ObserverSlot {
    options: ObserverOptions,
    /// Observed targets and their last reported intersecting state.
    targets: BTreeMap<NodeId, bool>,
    tx: mpsc::UnboundedSender<IntersectionEntry>,
}

struct PageState {
    nodes: Vec<Node>,
    roots: Vec<NodeId>,
    scroll_y: f64,
    viewport_height: f64,
    support: IntersectionSupport,
    /// Connected observers by id. Disconnecting removes the slot.
    observers: BTreeMap<u64, ObserverSlot>,
    next_observer: u64,
}

impl PageState {
    fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    fn attached_mut(&mut self, id: NodeId) -> Result<&mut Node, DomError> {
        let node = self.nodes.get_mut(id.0).ok_or(DomError::UnknownNode(id))?;
        if !node.attached {
            return Err(DomError::Detached(id));
        }
        Ok(node)
    }

    fn insert(&mut self, element: NewElement) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node::from_element(element));
        id
    }

    fn detach_subtree(&mut self, id: NodeId) {
        let children = match self.nodes.get_mut(id.0) {
            Some(node) => {
                node.attached = false;
                std::mem::take(&mut node.children)
            }
            None => return,
        };
        for child in children {
            self.detach_subtree(child);
        }
    }

    fn document_order(&self) -> Vec<NodeId> {
        fn walk(state: &PageState, id: NodeId, out: &mut Vec<NodeId>) {
            out.push(id);
            if let Some(node) = state.node(id) {
                for child in &node.children {
                    walk(state, *child, out);
                }
            }
        }

        let mut out = Vec::new();
        for root in &self.roots {
            if self.node(*root).is_some_and(|n| n.attached) {
                walk(self, *root, &mut out);
            }
        }
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        if let Some(node) = self.node(id) {
            out.push_str(&node.text);
            for child in &node.children {
                self.collect_text(*child, out);
            }
        }
    }

    fn entry_for(&self, target: NodeId, options: &ObserverOptions) -> Option<IntersectionEntry> {
        let node = self.node(target)?;
        let ratio = intersection_ratio(
            node.layout,
            self.scroll_y,
            self.viewport_height,
            options.root_margin,
        );
        Some(IntersectionEntry {
            target,
            is_intersecting: node.attached && options.is_intersecting(ratio),
            intersection_ratio: ratio,
            bounding_top: node.layout.top - self.scroll_y,
        })
    }

    /// Re-evaluates every observed target and emits entries for state flips.
    fn notify_observers(&mut self) {
        let mut flips = Vec::new();
        for (observer, slot) in &self.observers {
            for (target, last) in &slot.targets {
                if let Some(entry) = self.entry_for(*target, &slot.options) {
                    if entry.is_intersecting != *last {
                        flips.push((*observer, entry));
                    }
                }
            }
        }

        for (observer, entry) in flips {
            let Some(slot) = self.observers.get_mut(&observer) else {
                continue;
            };
            slot.targets.insert(entry.target, entry.is_intersecting);
            // A dropped receiver only means the driver stopped listening.
            let _ = slot.tx.send(entry);
        }
    }
}

/// Shared handle to an in-process page. Clones refer to the same page.
#[derive(Clone)]
pub struct HeadlessPage {
    state: Arc<Mutex<PageState>>,
}

impl HeadlessPage {
    pub fn new(viewport_height: f64) -> Self {
        Self {
            state: Arc::new(Mutex::new(PageState {
                nodes: Vec::new(),
                roots: Vec::new(),
                scroll_y: 0.0,
                viewport_height,
                support: IntersectionSupport::Supported,
                observers: BTreeMap::new(),
                next_observer: 0,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, PageState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends a top-level element and returns its handle.
    pub fn append(&self, element: NewElement) -> NodeId {
        let mut state = self.lock();
        let id = state.insert(element);
        state.roots.push(id);
        state.notify_observers();
        id
    }

    pub fn append_child(&self, parent: NodeId, element: NewElement) -> Result<NodeId, DomError> {
        let mut state = self.lock();
        state.attached_mut(parent)?;
        let id = state.insert(element);
        state.attached_mut(parent)?.children.push(id);
        Ok(id)
    }

    /// Detaches `node` and its subtree. Later writes fail with `DomError::Detached`.
    pub fn remove(&self, node: NodeId) {
        let mut state = self.lock();
        state.roots.retain(|r| *r != node);
        for parent in state.nodes.iter_mut() {
            parent.children.retain(|c| *c != node);
        }
        state.detach_subtree(node);
        state.notify_observers();
    }

    pub fn set_value(&self, node: NodeId, value: &str) -> Result<(), DomError> {
        self.lock().attached_mut(node)?.value = value.to_string();
        Ok(())
    }

    pub fn set_layout(&self, node: NodeId, layout: LayoutBox) -> Result<(), DomError> {
        let mut state = self.lock();
        state.attached_mut(node)?.layout = layout;
        state.notify_observers();
        Ok(())
    }

    pub fn scroll_to(&self, y: f64) {
        let mut state = self.lock();
        state.scroll_y = y.max(0.0);
        debug!(scroll_y = state.scroll_y, "Page scrolled");
        state.notify_observers();
    }

    pub fn scroll_y(&self) -> f64 {
        self.lock().scroll_y
    }

    /// Bottom edge of the lowest attached element.
    pub fn content_height(&self) -> f64 {
        let state = self.lock();
        state
            .document_order()
            .into_iter()
            .filter_map(|id| state.node(id).map(|n| n.layout.bottom()))
            .fold(0.0, f64::max)
    }

    pub fn viewport_height(&self) -> f64 {
        self.lock().viewport_height
    }

    pub fn set_intersection_support(&self, support: IntersectionSupport) {
        self.lock().support = support;
    }

    /// Number of targets currently observed across all connected observers.
    pub fn observed_count(&self) -> usize {
        self.lock()
            .observers
            .values()
            .map(|slot| slot.targets.len())
            .sum()
    }

    pub fn connected_observers(&self) -> usize {
        self.lock().observers.len()
    }

    pub fn tag(&self, node: NodeId) -> Option<String> {
        self.lock().node(node).map(|n| n.tag.clone())
    }
}

impl Document for HeadlessPage {
    fn element_by_id(&self, id: &str) -> Option<NodeId> {
        let state = self.lock();
        state
            .document_order()
            .into_iter()
            .find(|n| state.node(*n).and_then(|node| node.id.as_deref()) == Some(id))
    }

    fn query_all(&self, selector: &Selector) -> Vec<NodeId> {
        let state = self.lock();
        state
            .document_order()
            .into_iter()
            .filter(|n| state.node(*n).is_some_and(|node| node.matches(selector)))
            .collect()
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.lock()
            .node(node)
            .and_then(|n| n.attributes.get(name).cloned())
    }

    fn set_attribute(&self, node: NodeId, name: &str, value: &str) -> Result<(), DomError> {
        self.lock()
            .attached_mut(node)?
            .attributes
            .insert(name.to_string(), value.to_string());
        Ok(())
    }

    fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.lock()
            .node(node)
            .is_some_and(|n| n.classes.iter().any(|c| c == class))
    }

    fn add_class(&self, node: NodeId, class: &str) -> Result<(), DomError> {
        let mut state = self.lock();
        let node = state.attached_mut(node)?;
        if !node.classes.iter().any(|c| c == class) {
            node.classes.push(class.to_string());
        }
        Ok(())
    }

    fn remove_class(&self, node: NodeId, class: &str) -> Result<(), DomError> {
        self.lock()
            .attached_mut(node)?
            .classes
            .retain(|c| c != class);
        Ok(())
    }

    fn text(&self, node: NodeId) -> Option<String> {
        let state = self.lock();
        state.node(node)?;
        let mut out = String::new();
        state.collect_text(node, &mut out);
        Some(out)
    }

    fn set_text(&self, node: NodeId, text: &str) -> Result<(), DomError> {
        let mut state = self.lock();
        let children = {
            let node = state.attached_mut(node)?;
            node.text = text.to_string();
            std::mem::take(&mut node.children)
        };
        for child in children {
            state.detach_subtree(child);
        }
        Ok(())
    }

    fn append_text(&self, node: NodeId, text: &str) -> Result<(), DomError> {
        self.lock().attached_mut(node)?.text.push_str(text);
        Ok(())
    }

    fn value(&self, node: NodeId) -> Option<String> {
        self.lock().node(node).map(|n| n.value.clone())
    }

    fn replace_children(&self, parent: NodeId, child: NewElement) -> Result<NodeId, DomError> {
        let mut state = self.lock();
        let old = {
            let node = state.attached_mut(parent)?;
            node.text.clear();
            std::mem::take(&mut node.children)
        };
        for id in old {
            state.detach_subtree(id);
        }
        let id = state.insert(child);
        state.attached_mut(parent)?.children.push(id);
        Ok(id)
    }

    fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.lock()
            .node(node)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }
}

impl Viewport for HeadlessPage {
    fn observer(
        &self,
        options: ObserverOptions,
    ) -> Result<Option<ObserverBinding>, RevealSetupError> {
        let mut state = self.lock();
        match &state.support {
            IntersectionSupport::Unsupported => return Ok(None),
            IntersectionSupport::Failing(message) => {
                return Err(RevealSetupError::ObserverUnavailable(message.clone()))
            }
            IntersectionSupport::Supported => {}
        }

        let (tx, entries) = mpsc::unbounded_channel();
        let slot = state.next_observer;
        state.next_observer += 1;
        state.observers.insert(
            slot,
            ObserverSlot {
                options,
                targets: BTreeMap::new(),
                tx,
            },
        );

        Ok(Some(ObserverBinding {
            observer: Box::new(HeadlessObserver {
                page: self.clone(),
                slot,
            }),
            entries,
        }))
    }
}

struct HeadlessObserver {
    page: HeadlessPage,
    slot: u64,
}

impl IntersectionObserver for HeadlessObserver {
    fn observe(&mut self, target: NodeId) -> Result<(), RevealSetupError> {
        let mut state = self.page.lock();
        if !state.node(target).is_some_and(|n| n.attached) {
            return Err(RevealSetupError::ObserveRejected(target));
        }
        let options = state
            .observers
            .get(&self.slot)
            .map(|slot| slot.options)
            .ok_or(RevealSetupError::ObserveRejected(target))?;
        let entry = state
            .entry_for(target, &options)
            .ok_or(RevealSetupError::ObserveRejected(target))?;

        let slot = state
            .observers
            .get_mut(&self.slot)
            .ok_or(RevealSetupError::ObserveRejected(target))?;
        // Browsers deliver an initial entry for every newly observed target.
        slot.targets.insert(target, entry.is_intersecting);
        let _ = slot.tx.send(entry);
        Ok(())
    }

    fn unobserve(&mut self, target: NodeId) {
        if let Some(slot) = self.page.lock().observers.get_mut(&self.slot) {
            slot.targets.remove(&target);
        }
    }

    fn disconnect(&mut self) {
        self.page.lock().observers.remove(&self.slot);
    }
}

impl Drop for HeadlessObserver {
    fn drop(&mut self) {
        self.disconnect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::RootMargin;

    fn options() -> ObserverOptions {
        ObserverOptions {
            threshold: 0.5,
            root_margin: RootMargin::default(),
        }
    }

    #[test]
    fn test_query_all_union_is_document_ordered_and_unique() {
        let page = HeadlessPage::new(800.0);
        let a = page.append(NewElement::new("div").class("reveal"));
        let b = page.append(NewElement::new("div").attr("data-reveal", ""));
        let c = page.append(NewElement::new("div").class("reveal").attr("data-reveal", ""));
        page.append(NewElement::new("div").class("other"));

        let selector = Selector::AnyOf(vec![Selector::attribute("data-reveal"), Selector::class("reveal")]);
        assert_eq!(page.query_all(&selector), vec![a, b, c]);
    }

    #[test]
    fn test_text_includes_descendants_and_set_text_clears_children() {
        let page = HeadlessPage::new(800.0);
        let parent = page.append(NewElement::new("div").id("badge").text("x"));
        let child = page.append_child(parent, NewElement::new("span").text("Select")).unwrap();

        assert_eq!(page.text(parent).as_deref(), Some("xSelect"));
        page.set_text(parent, "plain").unwrap();
        assert_eq!(page.text(parent).as_deref(), Some("plain"));
        assert!(page.children(parent).is_empty());
        assert_eq!(page.append_text(child, "!"), Err(DomError::Detached(child)));
    }

    #[test]
    fn test_replace_children_leaves_single_child() {
        let page = HeadlessPage::new(800.0);
        let parent = page.append(NewElement::new("div"));
        page.append_child(parent, NewElement::new("span").text("old")).unwrap();

        let span = page
            .replace_children(parent, NewElement::new("span").class("badge-reject").text("Reject"))
            .unwrap();

        assert_eq!(page.children(parent), vec![span]);
        assert!(page.has_class(span, "badge-reject"));
        assert_eq!(page.text(parent).as_deref(), Some("Reject"));
    }

    #[test]
    fn test_writes_to_unknown_node_fail() {
        let page = HeadlessPage::new(800.0);
        assert_eq!(page.add_class(NodeId(42), "visible"), Err(DomError::UnknownNode(NodeId(42))));
        assert!(page.text(NodeId(42)).is_none());
    }

    #[tokio::test]
    async fn test_observe_emits_initial_entry_then_only_flips() {
        let page = HeadlessPage::new(800.0);
        let card = page.append(NewElement::new("div").layout(1000.0, 200.0));

        let mut binding = page.observer(options()).unwrap().unwrap();
        binding.observer.observe(card).unwrap();

        let initial = binding.entries.recv().await.unwrap();
        assert_eq!(initial.target, card);
        assert!(!initial.is_intersecting);

        // Still outside: no entry
        page.scroll_to(50.0);
        assert!(binding.entries.try_recv().is_err());

        page.scroll_to(400.0);
        let entered = binding.entries.recv().await.unwrap();
        assert!(entered.is_intersecting);
        assert_eq!(entered.bounding_top, 600.0);

        page.scroll_to(0.0);
        let left = binding.entries.recv().await.unwrap();
        assert!(!left.is_intersecting);
    }

    #[tokio::test]
    async fn test_unobserve_and_drop_stop_entries() {
        let page = HeadlessPage::new(800.0);
        let card = page.append(NewElement::new("div").layout(1000.0, 200.0));

        let mut binding = page.observer(options()).unwrap().unwrap();
        binding.observer.observe(card).unwrap();
        let _ = binding.entries.recv().await;
        assert_eq!(page.observed_count(), 1);

        binding.observer.unobserve(card);
        page.scroll_to(400.0);
        assert!(binding.entries.try_recv().is_err());
        assert_eq!(page.observed_count(), 0);

        binding.observer.observe(card).unwrap();
        assert_eq!(page.observed_count(), 1);
        drop(binding);
        assert_eq!(page.observed_count(), 0);
    }

    #[tokio::test]
    async fn test_layout_change_can_bring_target_into_view() {
        let page = HeadlessPage::new(600.0);
        let card = page.append(NewElement::new("div").layout(2000.0, 200.0));
        assert_eq!(page.viewport_height(), 600.0);

        let mut binding = page.observer(options()).unwrap().unwrap();
        binding.observer.observe(card).unwrap();
        assert!(!binding.entries.recv().await.unwrap().is_intersecting);

        page.set_layout(card, LayoutBox::new(100.0, 200.0)).unwrap();
        let moved = binding.entries.recv().await.unwrap();
        assert!(moved.is_intersecting);
        assert_eq!(moved.bounding_top, 100.0);
        assert_eq!(page.content_height(), 300.0);
    }

    #[test]
    fn test_set_value_updates_field_until_detached() {
        let page = HeadlessPage::new(800.0);
        let field = page.append(NewElement::new("textarea").id("job-role").value("Engineer"));

        page.set_value(field, "Data Analyst").unwrap();
        assert_eq!(page.value(field).as_deref(), Some("Data Analyst"));
        assert_eq!(page.tag(field).as_deref(), Some("textarea"));

        page.remove(field);
        assert_eq!(page.set_value(field, "Chef"), Err(DomError::Detached(field)));
    }

    #[test]
    fn test_disconnected_observers_release_their_slots() {
        let page = HeadlessPage::new(800.0);
        let card = page.append(NewElement::new("div").layout(0.0, 200.0));

        for _ in 0..5 {
            let mut binding = page.observer(options()).unwrap().unwrap();
            binding.observer.observe(card).unwrap();
            assert_eq!(page.connected_observers(), 1);
        }
        assert_eq!(page.connected_observers(), 0);

        let mut binding = page.observer(options()).unwrap().unwrap();
        binding.observer.disconnect();
        assert_eq!(page.connected_observers(), 0);
        assert!(matches!(
            binding.observer.observe(card),
            Err(RevealSetupError::ObserveRejected(id)) if id == card
        ));
        binding.observer.unobserve(card);
    }

    #[test]
    fn test_support_modes() {
        let page = HeadlessPage::new(800.0);
        page.set_intersection_support(IntersectionSupport::Unsupported);
        assert!(page.observer(options()).unwrap().is_none());

        page.set_intersection_support(IntersectionSupport::Failing("boom".to_string()));
        assert!(matches!(
            page.observer(options()),
            Err(RevealSetupError::ObserverUnavailable(msg)) if msg == "boom"
        ));
    }

    #[test]
    fn test_observe_rejects_detached_target() {
        let page = HeadlessPage::new(800.0);
        let card = page.append(NewElement::new("div"));
        page.remove(card);

        let mut binding = page.observer(options()).unwrap().unwrap();
        assert!(matches!(
            binding.observer.observe(card),
            Err(RevealSetupError::ObserveRejected(id)) if id == card
        ));
    }
}
