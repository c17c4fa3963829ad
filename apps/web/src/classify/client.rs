//! Classification client — the single path from the page to the `/classify` backend.
//!
//! The backend is an external collaborator; this module only knows its wire shape.
//! No retries: a failed call is reported once and rendered as a visible error.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;
use tracing::debug;

use super::models::{ClassificationRequest, ClassificationResult};

pub const CLASSIFY_PATH: &str = "/classify";

#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Backend returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Backend seam used by the form controller. Swap it out in tests or for other transports.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(
        &self,
        request: &ClassificationRequest,
    ) -> Result<ClassificationResult, ClassifyError>;
}

#[derive(Clone)]
pub struct ClassifyClient {
    client: Client,
    endpoint: String,
}

impl ClassifyClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClassifyError> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            endpoint: format!("{}{}", base_url.trim_end_matches('/'), CLASSIFY_PATH),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Classifier for ClassifyClient {
    async fn classify(
        &self,
        request: &ClassificationRequest,
    ) -> Result<ClassificationResult, ClassifyError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("content-type", "application/json")
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(ClassifyError::Status {
                status: status.as_u16(),
                body,
            });
        }

        // Only a body that is not JSON at all is a failure; field types are not checked.
        let result = ClassificationResult::from_value(serde_json::from_str(&body)?);
        debug!(
            "Classification succeeded: role={:?}, prediction={}",
            result.role,
            result.prediction().as_str()
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::post, Json, Router};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tokio::net::TcpListener;
    use tokio::sync::Mutex;

    async fn spawn_backend(app: Router) -> String {
        std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        format!("http://{addr}")
    }

    fn request() -> ClassificationRequest {
        ClassificationRequest {
            job_role: "Engineer".to_string(),
            job_description: "Build things".to_string(),
            resume_text: "Built things".to_string(),
        }
    }

    #[test]
    fn test_endpoint_joins_base_url() {
        let client = ClassifyClient::new("http://localhost:5000/", Duration::from_secs(5)).unwrap();
        assert_eq!(client.endpoint(), "http://localhost:5000/classify");
    }

    #[tokio::test]
    async fn test_posts_snake_case_json_and_parses_result() {
        let seen: Arc<Mutex<Option<Value>>> = Arc::new(Mutex::new(None));
        let capture = seen.clone();
        let app = Router::new().route(
            "/classify",
            post(move |Json(body): Json<Value>| {
                let capture = capture.clone();
                async move {
                    *capture.lock().await = Some(body);
                    Json(json!({
                        "role": "Engineer",
                        "ml_prediction": "Select",
                        "ml_confidence": "87%",
                        "improvement_suggestions": "Add more metrics."
                    }))
                }
            }),
        );
        let base = spawn_backend(app).await;

        let client = ClassifyClient::new(&base, Duration::from_secs(5)).unwrap();
        let result = client.classify(&request()).await.expect("classify");

        assert_eq!(result.prediction().as_str(), "Select");
        assert_eq!(result.confidence_label(), "87%");
        assert_eq!(
            seen.lock().await.clone(),
            Some(json!({
                "job_role": "Engineer",
                "job_description": "Build things",
                "resume_text": "Built things"
            }))
        );
    }

    #[tokio::test]
    async fn test_wrong_typed_fields_still_parse() {
        let app = Router::new().route(
            "/classify",
            post(|| async {
                Json(json!({
                    "role": "Engineer",
                    "ml_prediction": "Select",
                    "ml_confidence": "87%",
                    "gen_ai_assessment": {"summary": "Strong fit"},
                    "improvement_suggestions": ["Add more metrics.", "Quantify impact."]
                }))
            }),
        );
        let base = spawn_backend(app).await;

        let client = ClassifyClient::new(&base, Duration::from_secs(5)).unwrap();
        let result = client.classify(&request()).await.expect("classify");

        assert_eq!(result.prediction().as_str(), "Select");
        assert_eq!(result.gen_ai_assessment.as_deref(), Some(r#"{"summary":"Strong fit"}"#));
        assert_eq!(result.suggestions(), Some("Add more metrics.\nQuantify impact."));
    }

    #[tokio::test]
    async fn test_non_success_status_is_an_error() {
        let app = Router::new().route(
            "/classify",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "model crashed") }),
        );
        let base = spawn_backend(app).await;

        let client = ClassifyClient::new(&base, Duration::from_secs(5)).unwrap();
        let err = client.classify(&request()).await.unwrap_err();

        assert!(matches!(err, ClassifyError::Status { status: 500, ref body } if body == "model crashed"));
    }

    #[tokio::test]
    async fn test_unparseable_body_is_an_error() {
        let app = Router::new().route("/classify", post(|| async { "<html>oops</html>" }));
        let base = spawn_backend(app).await;

        let client = ClassifyClient::new(&base, Duration::from_secs(5)).unwrap();
        let err = client.classify(&request()).await.unwrap_err();

        assert!(matches!(err, ClassifyError::Parse(_)));
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_an_error() {
        // Bind then drop to get a port with nothing listening
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
        let client = ClassifyClient::new(&format!("http://{addr}"), Duration::from_secs(5)).unwrap();
        let err = client.classify(&request()).await.unwrap_err();

        assert!(matches!(err, ClassifyError::Http(_)));
    }
}
