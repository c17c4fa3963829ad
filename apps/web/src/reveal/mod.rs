// Reveal-on-scroll: adds the visible class to marked elements as they enter the viewport.
// Timing = per-element delay (data-reveal-delay or auto stagger) + positional stagger.

pub mod controller;
pub mod stagger;

pub use controller::{RevealController, RevealHandle, RevealOutcome};

use std::str::FromStr;

use crate::dom::{ObserverOptions, RootMargin, Selector};

/// What happens when a revealed element leaves the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RevealPolicy {
    /// Reveal once, then stop observing the element.
    #[default]
    OneShot,
    /// Remove the visible class on exit and reveal again on re-entry.
    Toggle,
}

impl FromStr for RevealPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "one-shot" | "oneshot" | "once" => Ok(RevealPolicy::OneShot),
            "toggle" => Ok(RevealPolicy::Toggle),
            other => Err(format!("unknown reveal policy '{other}' (expected one-shot or toggle)")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RevealOptions {
    /// Elements carrying this attribute are reveal targets.
    pub marker_attribute: String,
    /// Elements carrying this class are reveal targets; attribute-marked targets get it too.
    pub marker_class: String,
    pub visible_class: String,
    pub delay_attribute: String,
    /// Auto stagger for targets without a delay attribute: offset + index * step.
    pub initial_offset_ms: u64,
    pub step_ms: u64,
    /// Used when the delay attribute is missing or unparseable at intersection time.
    pub default_delay_ms: u64,
    pub threshold: f64,
    pub root_margin: RootMargin,
    /// Positional stagger: one step per `stagger_step_px` of viewport offset.
    pub stagger_step_px: f64,
    pub stagger_ms: u64,
    pub max_stagger_steps: u32,
    pub policy: RevealPolicy,
}

impl Default for RevealOptions {
    fn default() -> Self {
        Self {
            marker_attribute: "data-reveal".to_string(),
            marker_class: "reveal".to_string(),
            visible_class: "visible".to_string(),
            delay_attribute: "data-reveal-delay".to_string(),
            initial_offset_ms: 90,
            step_ms: 25,
            default_delay_ms: 100,
            threshold: 0.35,
            root_margin: RootMargin::default(),
            stagger_step_px: 100.0,
            stagger_ms: 30,
            max_stagger_steps: 6,
            policy: RevealPolicy::OneShot,
        }
    }
}

impl RevealOptions {
    pub fn with_policy(mut self, policy: RevealPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn selector(&self) -> Selector {
        Selector::AnyOf(vec![
            Selector::attribute(&self.marker_attribute),
            Selector::class(&self.marker_class),
        ])
    }

    pub fn observer_options(&self) -> ObserverOptions {
        ObserverOptions {
            threshold: self.threshold,
            root_margin: self.root_margin,
        }
    }
}
