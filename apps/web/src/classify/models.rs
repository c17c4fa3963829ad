use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Body of `POST /classify`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationRequest {
    pub job_role: String,
    pub job_description: String,
    pub resume_text: String,
}

/// Binary screening outcome. Anything the backend sends that is not "Select" is a reject.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prediction {
    Select,
    Reject,
}

impl Prediction {
    pub fn from_label(label: Option<&str>) -> Self {
        match label {
            Some("Select") => Prediction::Select,
            _ => Prediction::Reject,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Prediction::Select => "Select",
            Prediction::Reject => "Reject",
        }
    }

    pub fn badge_class(&self) -> &'static str {
        match self {
            Prediction::Select => "badge-select",
            Prediction::Reject => "badge-reject",
        }
    }
}

/// `ml_confidence` arrives as a preformatted string ("87.00%") from the current
/// backend; bare numbers are shown as sent.
#[derive(Debug, Clone, PartialEq)]
pub enum Confidence {
    Text(String),
    Number(f64),
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Confidence::Text(text) => write!(f, "{text}"),
            Confidence::Number(value) => write!(f, "{value}"),
        }
    }
}

/// Response of `POST /classify`. Every field is optional; the shape belongs to the backend.
///
/// Fields are read leniently: a value of an unexpected JSON type is rendered as
/// text instead of failing the whole response.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ClassificationResult {
    #[serde(deserialize_with = "lenient_text")]
    pub role: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub ml_prediction: Option<String>,
    /// Older backends send `prediction` instead of `ml_prediction`.
    #[serde(deserialize_with = "lenient_text")]
    pub prediction: Option<String>,
    #[serde(deserialize_with = "lenient_confidence")]
    pub ml_confidence: Option<Confidence>,
    #[serde(deserialize_with = "lenient_text")]
    pub gen_ai_assessment: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub resume_jd_comparison: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub improvement_suggestions: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub competitive_analysis: Option<String>,
    /// Set by the backend when its ML stage failed.
    #[serde(deserialize_with = "lenient_text")]
    pub error: Option<String>,
}

/// Display text for an arbitrary JSON value. Lists become one line per item.
fn display_text(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text),
        Value::Array(items) => Some(
            items
                .into_iter()
                .filter_map(display_text)
                .collect::<Vec<_>>()
                .join("\n"),
        ),
        other => Some(other.to_string()),
    }
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(display_text(Value::deserialize(deserializer)?))
}

fn lenient_confidence<'de, D>(deserializer: D) -> Result<Option<Confidence>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(number) => number.as_f64().map(Confidence::Number),
        other => display_text(other).map(Confidence::Text),
    })
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

impl ClassificationResult {
    /// Reads any JSON body. Anything other than an object carries no fields.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(_) => serde_json::from_value(value).unwrap_or_default(),
            _ => Self::default(),
        }
    }

    /// Fail-closed: a missing or unknown label is `Reject`.
    pub fn prediction(&self) -> Prediction {
        let label = non_empty(&self.ml_prediction).or_else(|| non_empty(&self.prediction));
        Prediction::from_label(label)
    }

    pub fn role_or<'a>(&'a self, submitted: &'a str) -> &'a str {
        non_empty(&self.role).unwrap_or(submitted)
    }

    pub fn confidence_label(&self) -> String {
        match &self.ml_confidence {
            Some(Confidence::Text(text)) if text.is_empty() => "--".to_string(),
            Some(Confidence::Number(value)) if *value == 0.0 => "--".to_string(),
            Some(confidence) => confidence.to_string(),
            None => "--".to_string(),
        }
    }

    pub fn suggestions(&self) -> Option<&str> {
        non_empty(&self.improvement_suggestions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_serializes_snake_case_fields() {
        let request = ClassificationRequest {
            job_role: "Engineer".to_string(),
            job_description: "Build things".to_string(),
            resume_text: "Built things".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "job_role": "Engineer",
                "job_description": "Build things",
                "resume_text": "Built things"
            })
        );
    }

    #[test]
    fn test_prediction_defaults_to_reject() {
        let result: ClassificationResult = serde_json::from_value(json!({"role": "Engineer"})).unwrap();
        assert_eq!(result.prediction(), Prediction::Reject);

        let unknown: ClassificationResult =
            serde_json::from_value(json!({"ml_prediction": "Maybe"})).unwrap();
        assert_eq!(unknown.prediction(), Prediction::Reject);

        let empty: ClassificationResult = serde_json::from_value(json!({"ml_prediction": ""})).unwrap();
        assert_eq!(empty.prediction(), Prediction::Reject);
    }

    #[test]
    fn test_prediction_label_must_match_exactly() {
        for label in ["select", "SELECT", " Select", "Select "] {
            let result: ClassificationResult =
                serde_json::from_value(json!({"ml_prediction": label})).unwrap();
            assert_eq!(result.prediction(), Prediction::Reject, "label {label:?}");
        }
        assert_eq!(Prediction::from_label(Some("Select")), Prediction::Select);
    }

    #[test]
    fn test_unexpected_field_types_are_rendered_as_text() {
        let result = ClassificationResult::from_value(json!({
            "role": "Engineer",
            "ml_prediction": "Select",
            "ml_confidence": {"score": 0.87},
            "gen_ai_assessment": {"summary": "Strong"},
            "resume_jd_comparison": 4,
            "improvement_suggestions": ["Add more metrics.", "Quantify impact."]
        }));

        assert_eq!(result.prediction(), Prediction::Select);
        assert_eq!(result.role_or("ignored"), "Engineer");
        assert_eq!(result.confidence_label(), r#"{"score":0.87}"#);
        assert_eq!(result.gen_ai_assessment.as_deref(), Some(r#"{"summary":"Strong"}"#));
        assert_eq!(result.resume_jd_comparison.as_deref(), Some("4"));
        assert_eq!(result.suggestions(), Some("Add more metrics.\nQuantify impact."));
    }

    #[test]
    fn test_non_object_body_has_no_fields() {
        assert_eq!(ClassificationResult::from_value(json!(["Select"])), ClassificationResult::default());
        assert_eq!(ClassificationResult::from_value(json!(null)).prediction(), Prediction::Reject);
    }

    #[test]
    fn test_ml_prediction_wins_over_legacy_field() {
        let result: ClassificationResult = serde_json::from_value(json!({
            "ml_prediction": "Reject",
            "prediction": "Select"
        }))
        .unwrap();
        assert_eq!(result.prediction(), Prediction::Reject);

        let legacy: ClassificationResult =
            serde_json::from_value(json!({"prediction": "Select"})).unwrap();
        assert_eq!(legacy.prediction(), Prediction::Select);
    }

    #[test]
    fn test_confidence_accepts_string_or_number() {
        let text: ClassificationResult =
            serde_json::from_value(json!({"ml_confidence": "87%"})).unwrap();
        assert_eq!(text.confidence_label(), "87%");

        let number: ClassificationResult =
            serde_json::from_value(json!({"ml_confidence": 91.5})).unwrap();
        assert_eq!(number.confidence_label(), "91.5");

        let whole: ClassificationResult =
            serde_json::from_value(json!({"ml_confidence": 87})).unwrap();
        assert_eq!(whole.confidence_label(), "87");

        let zero: ClassificationResult = serde_json::from_value(json!({"ml_confidence": 0})).unwrap();
        assert_eq!(zero.confidence_label(), "--");

        assert_eq!(ClassificationResult::default().confidence_label(), "--");
    }

    #[test]
    fn test_role_falls_back_to_submitted_role() {
        let result: ClassificationResult = serde_json::from_value(json!({"role": ""})).unwrap();
        assert_eq!(result.role_or("Data Analyst"), "Data Analyst");
    }

    #[test]
    fn test_null_fields_are_treated_as_absent() {
        let result: ClassificationResult = serde_json::from_value(json!({
            "role": null,
            "improvement_suggestions": null,
            "error": "No ML model found for role 'Chef'."
        }))
        .unwrap();
        assert!(result.suggestions().is_none());
        assert!(result.error.is_some());
    }
}
