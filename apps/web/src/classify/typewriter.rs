use std::time::Duration;

use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::warn;

use crate::dom::{Document, NodeId};
use crate::schedule::CancelFlag;

pub const DEFAULT_SPEED: Duration = Duration::from_millis(18);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypewriterOptions {
    /// Interval between appended characters.
    pub speed: Duration,
}

impl Default for TypewriterOptions {
    fn default() -> Self {
        Self {
            speed: DEFAULT_SPEED,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypewriterOutcome {
    Completed,
    Cancelled,
    /// The target element went away mid-effect.
    Interrupted,
}

/// Clears `target` and appends `text` one character per tick, in order.
/// Resolves once the last character is written. A missing target resolves immediately.
pub async fn typewrite(
    document: &dyn Document,
    target: Option<NodeId>,
    text: &str,
    options: TypewriterOptions,
    cancel: &CancelFlag,
) -> TypewriterOutcome {
    let Some(target) = target else {
        return TypewriterOutcome::Completed;
    };

    // Zero speed disables the effect.
    let initial = if options.speed.is_zero() { text } else { "" };
    if let Err(e) = document.set_text(target, initial) {
        warn!("Typewriter target unavailable: {e}");
        return TypewriterOutcome::Interrupted;
    }
    if options.speed.is_zero() {
        return TypewriterOutcome::Completed;
    }

    let mut ticker = interval_at(Instant::now() + options.speed, options.speed);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut buf = [0u8; 4];
    for ch in text.chars() {
        ticker.tick().await;
        if cancel.is_cancelled() {
            return TypewriterOutcome::Cancelled;
        }
        if let Err(e) = document.append_text(target, ch.encode_utf8(&mut buf)) {
            warn!("Typewriter stopped: {e}");
            return TypewriterOutcome::Interrupted;
        }
    }

    TypewriterOutcome::Completed
}
