//! ClassifyFormController — handles submissions of the classify form.
//!
//! Per submission: `Idle → Submitting → {Rendered | ErrorRendered}`, or
//! `Superseded` when a newer submission was issued before this one finished.
//! Only the latest submission ever renders.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, error, info, warn};

use super::client::Classifier;
use super::models::ClassificationRequest;
use super::render::{self, ResultRegions};
use super::typewriter::{typewrite, TypewriterOptions, TypewriterOutcome};
use super::{PageIds, NO_SUGGESTIONS};
use crate::dom::Document;
use crate::schedule::CancelFlag;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionState {
    Idle,
    Submitting,
    Rendered,
    ErrorRendered,
    /// A newer submission took over; this one rendered nothing further.
    Superseded,
}

struct Latest {
    sequence: u64,
    state: SubmissionState,
    typewriter: CancelFlag,
}

pub struct ClassifyFormController {
    document: Arc<dyn Document>,
    classifier: Arc<dyn Classifier>,
    ids: PageIds,
    typewriter: TypewriterOptions,
    latest: Mutex<Latest>,
}

impl ClassifyFormController {
    pub fn new(
        document: Arc<dyn Document>,
        classifier: Arc<dyn Classifier>,
        ids: PageIds,
        typewriter: TypewriterOptions,
    ) -> Self {
        Self {
            document,
            classifier,
            ids,
            typewriter,
            latest: Mutex::new(Latest {
                sequence: 0,
                state: SubmissionState::Idle,
                typewriter: CancelFlag::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Latest> {
        self.latest.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// State of the most recent submission.
    pub fn state(&self) -> SubmissionState {
        self.lock().state
    }

    pub fn latest_sequence(&self) -> u64 {
        self.lock().sequence
    }

    /// Cancels the typewriter of the latest submission, if any is running.
    pub fn cancel_effects(&self) {
        self.lock().typewriter.cancel();
    }

    /// Reads the three form fields. Missing fields read as empty strings.
    pub fn read_request(&self) -> ClassificationRequest {
        let field = |id: &str| {
            self.document
                .element_by_id(id)
                .and_then(|node| self.document.value(node))
                .unwrap_or_default()
        };
        ClassificationRequest {
            job_role: field(&self.ids.job_role),
            job_description: field(&self.ids.job_description),
            resume_text: field(&self.ids.resume_text),
        }
    }

    /// Starts a new submission: bumps the sequence and cancels the previous typewriter.
    fn begin(&self) -> (u64, CancelFlag) {
        let mut latest = self.lock();
        latest.typewriter.cancel();
        latest.sequence += 1;
        latest.state = SubmissionState::Submitting;
        latest.typewriter = CancelFlag::new();
        (latest.sequence, latest.typewriter.clone())
    }

    fn is_latest(&self, sequence: u64) -> bool {
        self.lock().sequence == sequence
    }

    fn finish(&self, sequence: u64, state: SubmissionState) -> SubmissionState {
        let mut latest = self.lock();
        if latest.sequence != sequence {
            return SubmissionState::Superseded;
        }
        latest.state = state;
        state
    }

    /// Handles one form submission end to end. Never fails: errors are rendered.
    pub async fn submit(&self) -> SubmissionState {
        let (sequence, cancel) = self.begin();
        let document = self.document.as_ref();

        let regions = ResultRegions::locate(document, &self.ids);
        render::prepare(document, &regions);

        let request = self.read_request();
        info!(
            sequence,
            "Submitting classification request for role '{}'", request.job_role
        );

        let outcome = self.classifier.classify(&request).await;

        if !self.is_latest(sequence) {
            info!(sequence, "Discarding stale classification response");
            return SubmissionState::Superseded;
        }

        match outcome {
            Ok(result) => {
                if let Some(reported) = &result.error {
                    warn!(sequence, "Backend reported an error: {reported}");
                }
                render::render_fields(document, &regions, &result, &request.job_role);

                let suggestions = result.suggestions().unwrap_or(NO_SUGGESTIONS);
                let typed = typewrite(
                    document,
                    regions.suggestions,
                    suggestions,
                    self.typewriter,
                    &cancel,
                )
                .await;
                if typed == TypewriterOutcome::Cancelled || !self.is_latest(sequence) {
                    debug!(sequence, "Submission superseded while rendering");
                    return SubmissionState::Superseded;
                }

                render::show_container(document, &regions);
                info!(
                    sequence,
                    "Rendered classification: {}",
                    result.prediction().as_str()
                );
                self.finish(sequence, SubmissionState::Rendered)
            }
            Err(e) => {
                error!(sequence, "Classification request failed: {e}");
                render::render_error(document, &regions);
                self.finish(sequence, SubmissionState::ErrorRendered)
            }
        }
    }
}
