// Classify form: submit resume + job data to the backend and render the verdict.
// Every failure ends with the result container visible and an error message in it.

pub mod client;
pub mod controller;
pub mod models;
pub mod render;
pub mod typewriter;

pub use client::{Classifier, ClassifyClient, ClassifyError};
pub use controller::{ClassifyFormController, SubmissionState};
pub use models::{ClassificationRequest, ClassificationResult, Prediction};
pub use typewriter::{TypewriterOptions, TypewriterOutcome};

/// Class that hides an element until results are ready.
pub const HIDDEN_CLASS: &str = "d-none";

pub const NO_SUGGESTIONS: &str = "No suggestions available.";

pub const CONNECTION_ERROR: &str =
    "Error: Could not connect to server. Is the classification backend running?";

/// Element ids the form controller reads from and renders into.
#[derive(Debug, Clone)]
pub struct PageIds {
    pub form: String,
    pub job_role: String,
    pub job_description: String,
    pub resume_text: String,
    pub container: String,
    pub placeholder: String,
    pub role: String,
    pub badge: String,
    pub confidence: String,
    pub gen_ai: String,
    pub jd_comparison: String,
    pub analysis: String,
    pub suggestions: String,
}

impl Default for PageIds {
    fn default() -> Self {
        Self {
            form: "classify-form".to_string(),
            job_role: "job-role".to_string(),
            job_description: "job-description".to_string(),
            resume_text: "resume-text".to_string(),
            container: "result-container".to_string(),
            placeholder: "result-placeholder".to_string(),
            role: "result-role".to_string(),
            badge: "result-badge".to_string(),
            confidence: "result-confidence".to_string(),
            gen_ai: "result-genai-text".to_string(),
            jd_comparison: "result-jd-text".to_string(),
            analysis: "result-analysis".to_string(),
            suggestions: "improvement-suggestions".to_string(),
        }
    }
}
