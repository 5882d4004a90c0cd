//! Structured reports emitted as messages are routed and handled.
//!
//! The core never formats output itself: every notable event becomes an [Observation] handed
//! to an [Observer], leaving presentation to the caller.

use crate::{Message, NodeId, RequestType};
use futures::channel::mpsc;
use std::time::Duration;
use tracing::debug;

/// What happened to a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// The recipient handled a request of a known type.
    Received,
    /// The recipient got a request it does not know how to handle.
    UnknownRequestType,
    /// The message was lost on a link.
    Dropped,
    /// No link connects the origin to the recipient.
    Unreachable,
    /// The recipient stopped accepting messages before this one arrived.
    Undeliverable,
}

impl Outcome {
    /// Returns whether the outcome was decided while routing (rather than by the recipient).
    pub fn is_routing(&self) -> bool {
        matches!(self, Self::Dropped | Self::Unreachable | Self::Undeliverable)
    }
}

/// A report about a single message.
///
/// For outcomes decided by the recipient, `node` is the recipient and `peer` is the sender.
/// For routing outcomes (see [Outcome::is_routing]), `node` is the origin whose link handled
/// the message and `peer` is the intended recipient.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Observation {
    pub node: NodeId,
    pub peer: NodeId,
    pub request_id: u64,
    pub request_type: RequestType,
    pub outcome: Outcome,

    /// Time between the creation of the message and this report.
    pub elapsed: Duration,
}

impl Observation {
    /// Report an outcome decided by the recipient `node`.
    pub fn handled(node: NodeId, message: &Message, outcome: Outcome) -> Self {
        Self {
            node,
            peer: message.from,
            request_id: message.request_id,
            request_type: message.request_type.clone(),
            outcome,
            elapsed: message.sent_at.elapsed(),
        }
    }

    /// Report an outcome decided while routing `message`.
    pub fn routed(message: &Message, outcome: Outcome) -> Self {
        Self {
            node: message.from,
            peer: message.to,
            request_id: message.request_id,
            request_type: message.request_type.clone(),
            outcome,
            elapsed: message.sent_at.elapsed(),
        }
    }
}

/// Sink for [Observation]s.
///
/// Observers are invoked from routers and delivery loops and must not block.
pub trait Observer: Clone + Send + Sync + 'static {
    fn observe(&self, observation: Observation);
}

impl Observer for mpsc::UnboundedSender<Observation> {
    fn observe(&self, observation: Observation) {
        if let Err(err) = self.unbounded_send(observation) {
            // This can only happen if the consumer exited.
            debug!(?err, "observer closed");
        }
    }
}
