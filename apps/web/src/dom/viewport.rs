//! Viewport-intersection capability.
//!
//! Mirrors the browser's IntersectionObserver: targets are registered with an
//! observer, and an entry is delivered once on registration and again every
//! time a target's intersecting state flips.

use tokio::sync::mpsc;

use super::{LayoutBox, NodeId};
use crate::errors::RevealSetupError;

/// Margin applied to the viewport before intersecting (px).
/// Negative values shrink the root, positive values grow it.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RootMargin {
    pub top: f64,
    pub bottom: f64,
}

impl RootMargin {
    pub fn new(top: f64, bottom: f64) -> Self {
        Self { top, bottom }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObserverOptions {
    /// Fraction of the element's area (0.0 – 1.0) that must be inside the root.
    pub threshold: f64,
    pub root_margin: RootMargin,
}

impl ObserverOptions {
    /// A zero threshold means "any overlap at all".
    pub fn is_intersecting(&self, ratio: f64) -> bool {
        if self.threshold <= 0.0 {
            ratio > 0.0
        } else {
            ratio >= self.threshold
        }
    }
}

/// One observation delivered to the reveal driver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntersectionEntry {
    pub target: NodeId,
    pub is_intersecting: bool,
    pub intersection_ratio: f64,
    /// Top of the element's bounding box relative to the viewport top (px).
    pub bounding_top: f64,
}

pub trait IntersectionObserver: Send {
    fn observe(&mut self, target: NodeId) -> Result<(), RevealSetupError>;

    fn unobserve(&mut self, target: NodeId);

    fn disconnect(&mut self);
}

/// A live observer together with the stream of entries it produces.
pub struct ObserverBinding {
    pub observer: Box<dyn IntersectionObserver>,
    pub entries: mpsc::UnboundedReceiver<IntersectionEntry>,
}

pub trait Viewport: Send + Sync {
    /// `Ok(None)` when the environment has no intersection capability at all.
    fn observer(&self, options: ObserverOptions)
        -> Result<Option<ObserverBinding>, RevealSetupError>;
}

/// Fraction of `layout` inside the (margin-adjusted) viewport.
pub fn intersection_ratio(
    layout: LayoutBox,
    scroll_y: f64,
    viewport_height: f64,
    margin: RootMargin,
) -> f64 {
    let root_top = scroll_y - margin.top;
    let root_bottom = scroll_y + viewport_height + margin.bottom;
    if root_bottom <= root_top {
        return 0.0;
    }

    if layout.height <= 0.0 {
        return if layout.top >= root_top && layout.top < root_bottom {
            1.0
        } else {
            0.0
        };
    }

    let overlap = layout.bottom().min(root_bottom) - layout.top.max(root_top);
    (overlap.max(0.0) / layout.height).min(1.0)
}
