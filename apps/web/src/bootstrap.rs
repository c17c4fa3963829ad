//! Page bootstrap: installs the form handler and, after page load, the reveal controller.
//!
//! The bootstrap owns the init-once guard. Installing twice (the same behaviors
//! loaded by two entry points) is a logged no-op.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::classify::{Classifier, ClassifyFormController, PageIds, SubmissionState, TypewriterOptions};
use crate::dom::{Document, Viewport};
use crate::reveal::{RevealController, RevealHandle, RevealOptions, RevealOutcome};

pub const DEFAULT_POST_LOAD_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Clone)]
pub struct BootstrapOptions {
    pub reveal: RevealOptions,
    pub typewriter: TypewriterOptions,
    pub ids: PageIds,
    /// Wait after the load event before starting reveals, to avoid layout jank.
    pub post_load_delay: Duration,
}

impl Default for BootstrapOptions {
    fn default() -> Self {
        Self {
            reveal: RevealOptions::default(),
            typewriter: TypewriterOptions::default(),
            ids: PageIds::default(),
            post_load_delay: DEFAULT_POST_LOAD_DELAY,
        }
    }
}

pub enum BootstrapOutcome {
    Installed(PageSession),
    AlreadyInitialized,
}

pub struct PageBootstrap {
    initialized: AtomicBool,
    options: BootstrapOptions,
}

impl PageBootstrap {
    pub fn new(options: BootstrapOptions) -> Self {
        Self {
            initialized: AtomicBool::new(false),
            options,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    /// DOM-ready wiring. The form handler is attached only if the form exists.
    pub fn install(
        &self,
        document: Arc<dyn Document>,
        viewport: Arc<dyn Viewport>,
        classifier: Arc<dyn Classifier>,
    ) -> BootstrapOutcome {
        if self.initialized.swap(true, Ordering::SeqCst) {
            warn!("Page behaviors already initialized; skipping duplicate initialization");
            return BootstrapOutcome::AlreadyInitialized;
        }

        let form = document.element_by_id(&self.options.ids.form).map(|_| {
            Arc::new(ClassifyFormController::new(
                Arc::clone(&document),
                classifier,
                self.options.ids.clone(),
                self.options.typewriter,
            ))
        });
        info!(form = form.is_some(), "Page behaviors initialized");

        BootstrapOutcome::Installed(PageSession {
            document,
            viewport,
            form,
            reveal_options: self.options.reveal.clone(),
            post_load_delay: self.options.post_load_delay,
            reveal: None,
        })
    }
}

/// Behaviors installed on one page.
pub struct PageSession {
    document: Arc<dyn Document>,
    viewport: Arc<dyn Viewport>,
    form: Option<Arc<ClassifyFormController>>,
    reveal_options: RevealOptions,
    post_load_delay: Duration,
    reveal: Option<RevealHandle>,
}

impl PageSession {
    pub fn form(&self) -> Option<&Arc<ClassifyFormController>> {
        self.form.as_ref()
    }

    /// Submit event. `None` when the page has no classify form.
    pub async fn submit(&self) -> Option<SubmissionState> {
        match &self.form {
            Some(form) => Some(form.submit().await),
            None => None,
        }
    }

    /// Load event: waits the post-load delay, then starts reveals. Repeated calls
    /// return the first outcome.
    pub async fn on_load(&mut self) -> RevealOutcome {
        if let Some(handle) = &self.reveal {
            return handle.outcome();
        }
        tokio::time::sleep(self.post_load_delay).await;

        let controller = RevealController::new(
            Arc::clone(&self.document),
            Arc::clone(&self.viewport),
            self.reveal_options.clone(),
        );
        let handle = controller.init();
        let outcome = handle.outcome();
        self.reveal = Some(handle);
        outcome
    }

    pub fn reveal(&self) -> Option<&RevealHandle> {
        self.reveal.as_ref()
    }

    /// Aborts pending reveals, observation, and any running typewriter.
    pub fn teardown(self) {
        if let Some(handle) = &self.reveal {
            handle.cancel();
        }
        if let Some(form) = &self.form {
            form.cancel_effects();
        }
        info!("Page behaviors torn down");
    }
}
