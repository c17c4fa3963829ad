//! RevealController — wires reveal targets to a viewport observer.
//!
//! Three paths, chosen at `init`:
//! - observer available: reveal on intersection (one-shot or toggle policy);
//! - capability missing: reveal everything on the stagger schedule, no scroll needed;
//! - setup error: reveal everything immediately.
//!
//! `init` never fails; every path ends with content visible.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::stagger::{auto_delay_ms, parse_delay_ms, total_delay};
use super::{RevealOptions, RevealPolicy};
use crate::dom::{Document, IntersectionEntry, IntersectionObserver, NodeId, Viewport};
use crate::errors::RevealSetupError;
use crate::schedule::{schedule_after, TaskHandle};

type PendingReveals = Arc<Mutex<HashMap<NodeId, TaskHandle>>>;

fn lock(pending: &PendingReveals) -> MutexGuard<'_, HashMap<NodeId, TaskHandle>> {
    pending.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Which path `RevealController::init` took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealOutcome {
    Observing { targets: usize },
    /// No intersection capability: targets revealed on their stagger delays.
    Fallback { targets: usize },
    /// Setup failed: targets revealed immediately.
    Recovered { targets: usize },
}

/// Owns the observer loop and every pending reveal timer.
pub struct RevealHandle {
    outcome: RevealOutcome,
    pending: PendingReveals,
    driver: Option<JoinHandle<()>>,
}

impl RevealHandle {
    pub fn outcome(&self) -> RevealOutcome {
        self.outcome
    }

    /// Reveal timers that have not fired yet.
    pub fn pending_count(&self) -> usize {
        lock(&self.pending)
            .values()
            .filter(|timer| !timer.is_finished())
            .count()
    }

    /// Stops observing and aborts every pending reveal. Already revealed elements stay revealed.
    pub fn cancel(&self) {
        if let Some(driver) = &self.driver {
            driver.abort();
        }
        for (_, timer) in lock(&self.pending).drain() {
            timer.cancel();
        }
        debug!("Reveal handle cancelled");
    }
}

pub struct RevealController {
    document: Arc<dyn Document>,
    viewport: Arc<dyn Viewport>,
    options: Arc<RevealOptions>,
}

impl RevealController {
    pub fn new(
        document: Arc<dyn Document>,
        viewport: Arc<dyn Viewport>,
        options: RevealOptions,
    ) -> Self {
        Self {
            document,
            viewport,
            options: Arc::new(options),
        }
    }

    pub fn init(&self) -> RevealHandle {
        let targets = self.document.query_all(&self.options.selector());
        info!(
            targets = targets.len(),
            policy = ?self.options.policy,
            "Initializing reveal-on-scroll"
        );

        let pending = PendingReveals::default();
        let count = targets.len();

        match self.observe_targets(&targets, &pending) {
            Ok(Some(driver)) => RevealHandle {
                outcome: RevealOutcome::Observing { targets: count },
                pending,
                driver: Some(driver),
            },
            Ok(None) => {
                warn!("Intersection observer not supported; revealing all elements as a fallback");
                self.reveal_on_schedule(&targets, &pending);
                RevealHandle {
                    outcome: RevealOutcome::Fallback { targets: count },
                    pending,
                    driver: None,
                }
            }
            Err(e) => {
                error!("Reveal initialization error: {e}");
                self.reveal_now(&targets);
                RevealHandle {
                    outcome: RevealOutcome::Recovered { targets: count },
                    pending,
                    driver: None,
                }
            }
        }
    }

    /// Registers every target; the driver is only spawned once all of them are observed.
    fn observe_targets(
        &self,
        targets: &[NodeId],
        pending: &PendingReveals,
    ) -> Result<Option<JoinHandle<()>>, RevealSetupError> {
        let Some(mut binding) = self.viewport.observer(self.options.observer_options())? else {
            return Ok(None);
        };

        let options = &self.options;
        for (index, &target) in targets.iter().enumerate() {
            if !self.document.has_attribute(target, &options.delay_attribute) {
                let delay = auto_delay_ms(index, options).to_string();
                self.document
                    .set_attribute(target, &options.delay_attribute, &delay)?;
            }
            if !self.document.has_class(target, &options.marker_class) {
                self.document.add_class(target, &options.marker_class)?;
            }
            binding.observer.observe(target)?;
        }

        let driver = RevealDriver {
            document: Arc::clone(&self.document),
            options: Arc::clone(&self.options),
            pending: Arc::clone(pending),
            observer: binding.observer,
        };
        Ok(Some(tokio::spawn(driver.run(binding.entries))))
    }

    fn reveal_on_schedule(&self, targets: &[NodeId], pending: &PendingReveals) {
        for (index, &target) in targets.iter().enumerate() {
            let delay_ms = self
                .document
                .attribute(target, &self.options.delay_attribute)
                .as_deref()
                .and_then(parse_delay_ms)
                .unwrap_or_else(|| auto_delay_ms(index, &self.options));
            schedule_reveal(
                &self.document,
                pending,
                target,
                &self.options.visible_class,
                Duration::from_millis(delay_ms),
            );
        }
    }

    fn reveal_now(&self, targets: &[NodeId]) {
        for &target in targets {
            if let Err(e) = self.document.add_class(target, &self.options.visible_class) {
                warn!("Could not reveal {target:?}: {e}");
            }
        }
    }
}

fn schedule_reveal(
    document: &Arc<dyn Document>,
    pending: &PendingReveals,
    target: NodeId,
    class: &str,
    delay: Duration,
) {
    let doc = Arc::clone(document);
    let class = class.to_string();
    let timer = schedule_after(delay, move || {
        if let Err(e) = doc.add_class(target, &class) {
            warn!("Could not reveal {target:?}: {e}");
        }
    });

    let mut timers = lock(pending);
    timers.retain(|_, t| !t.is_finished());
    if let Some(previous) = timers.insert(target, timer) {
        previous.cancel();
    }
}

struct RevealDriver {
    document: Arc<dyn Document>,
    options: Arc<RevealOptions>,
    pending: PendingReveals,
    observer: Box<dyn IntersectionObserver>,
}

impl RevealDriver {
    async fn run(mut self, mut entries: mpsc::UnboundedReceiver<IntersectionEntry>) {
        while let Some(entry) = entries.recv().await {
            self.handle(entry);
        }
        debug!("Reveal observer stream closed");
    }

    fn handle(&mut self, entry: IntersectionEntry) {
        let target = entry.target;

        if entry.is_intersecting {
            let configured = self
                .document
                .attribute(target, &self.options.delay_attribute);
            let delay = total_delay(configured.as_deref(), entry.bounding_top, &self.options);
            debug!(
                "Target {target:?} entered viewport (ratio {:.2}); revealing in {}ms",
                entry.intersection_ratio,
                delay.as_millis()
            );
            schedule_reveal(
                &self.document,
                &self.pending,
                target,
                &self.options.visible_class,
                delay,
            );
            if self.options.policy == RevealPolicy::OneShot {
                self.observer.unobserve(target);
            }
        } else if self.options.policy == RevealPolicy::Toggle {
            if let Some(timer) = lock(&self.pending).remove(&target) {
                timer.cancel();
            }
            if let Err(e) = self
                .document
                .remove_class(target, &self.options.visible_class)
            {
                warn!("Could not hide {target:?}: {e}");
            }
        }
    }
}
