use thiserror::Error;

use crate::dom::NodeId;

/// Errors raised by a `Document` when an operation targets a node it does not hold.
#[derive(Debug, Error, PartialEq)]
pub enum DomError {
    #[error("Unknown node: {0:?}")]
    UnknownNode(NodeId),

    #[error("Node {0:?} is detached from the page")]
    Detached(NodeId),
}

/// Errors raised while wiring reveal targets to a viewport observer.
/// Every variant is recovered by revealing all targets immediately.
#[derive(Debug, Error)]
pub enum RevealSetupError {
    #[error("Intersection observer could not be created: {0}")]
    ObserverUnavailable(String),

    #[error("Observer rejected target {0:?}")]
    ObserveRejected(NodeId),

    #[error("DOM error during reveal setup: {0}")]
    Dom(#[from] DomError),
}
