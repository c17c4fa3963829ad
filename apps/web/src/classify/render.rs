//! Writes a classification result into the page's output regions.
//!
//! Missing regions are skipped; DOM write failures are logged and never abort rendering.

use tracing::warn;

use super::models::{ClassificationResult, Prediction};
use super::{PageIds, CONNECTION_ERROR, HIDDEN_CLASS};
use crate::dom::{Document, NewElement, NodeId};
use crate::errors::DomError;

/// Output regions located once per submission.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResultRegions {
    pub container: Option<NodeId>,
    pub placeholder: Option<NodeId>,
    pub role: Option<NodeId>,
    pub badge: Option<NodeId>,
    pub confidence: Option<NodeId>,
    pub gen_ai: Option<NodeId>,
    pub jd_comparison: Option<NodeId>,
    pub analysis: Option<NodeId>,
    pub suggestions: Option<NodeId>,
}

impl ResultRegions {
    pub fn locate(document: &dyn Document, ids: &PageIds) -> Self {
        Self {
            container: document.element_by_id(&ids.container),
            placeholder: document.element_by_id(&ids.placeholder),
            role: document.element_by_id(&ids.role),
            badge: document.element_by_id(&ids.badge),
            confidence: document.element_by_id(&ids.confidence),
            gen_ai: document.element_by_id(&ids.gen_ai),
            jd_comparison: document.element_by_id(&ids.jd_comparison),
            analysis: document.element_by_id(&ids.analysis),
            suggestions: document.element_by_id(&ids.suggestions),
        }
    }
}

fn log_failure(region: &str, result: Result<(), DomError>) {
    if let Err(e) = result {
        warn!("Could not update {region}: {e}");
    }
}

fn set_text(document: &dyn Document, region: Option<NodeId>, name: &str, text: &str) {
    if let Some(node) = region {
        log_failure(name, document.set_text(node, text));
    }
}

/// Hides the placeholder and clears the previous suggestions.
pub fn prepare(document: &dyn Document, regions: &ResultRegions) {
    if let Some(placeholder) = regions.placeholder {
        log_failure("placeholder", document.add_class(placeholder, HIDDEN_CLASS));
    }
    set_text(document, regions.suggestions, "suggestions", "");
}

/// Replaces the badge content with a single span for `prediction`.
pub fn set_badge(document: &dyn Document, badge: Option<NodeId>, prediction: Prediction) {
    let Some(badge) = badge else { return };
    let span = NewElement::new("span")
        .class(prediction.badge_class())
        .text(prediction.as_str());
    if let Err(e) = document.replace_children(badge, span) {
        warn!("Could not update badge: {e}");
    }
}

/// Renders every field except the suggestions, which are typed out separately.
pub fn render_fields(
    document: &dyn Document,
    regions: &ResultRegions,
    result: &ClassificationResult,
    submitted_role: &str,
) {
    set_text(document, regions.role, "role", result.role_or(submitted_role));
    set_badge(document, regions.badge, result.prediction());
    set_text(
        document,
        regions.confidence,
        "confidence",
        &format!("Confidence: {}", result.confidence_label()),
    );
    set_text(
        document,
        regions.gen_ai,
        "assessment",
        result.gen_ai_assessment.as_deref().unwrap_or_default(),
    );
    set_text(
        document,
        regions.jd_comparison,
        "comparison",
        result.resume_jd_comparison.as_deref().unwrap_or_default(),
    );
    set_text(
        document,
        regions.analysis,
        "analysis",
        result.competitive_analysis.as_deref().unwrap_or_default(),
    );
}

pub fn show_container(document: &dyn Document, regions: &ResultRegions) {
    if let Some(container) = regions.container {
        log_failure("container", document.remove_class(container, HIDDEN_CLASS));
    }
}

pub fn render_error(document: &dyn Document, regions: &ResultRegions) {
    show_container(document, regions);
    set_text(document, regions.suggestions, "suggestions", CONNECTION_ERROR);
}
