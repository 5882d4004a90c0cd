//! Addressable peers of the simulated network.

use crate::{handler, Error, Message, NodeId, Observer, RequestType};
use std::{collections::BTreeSet, sync::Arc, time::Duration};
use stellar_utils::rendezvous;
use tracing::debug;

/// Handle to a running node.
///
/// Cloning the handle lets several producers originate messages through the same node. The
/// node's router stops only after every handle has been dropped.
#[derive(Clone)]
pub struct Node {
    id: NodeId,
    neighbors: Arc<BTreeSet<NodeId>>,
    outbound: rendezvous::Sender<Message>,
}

impl Node {
    pub(crate) fn new(
        id: NodeId,
        neighbors: Arc<BTreeSet<NodeId>>,
        outbound: rendezvous::Sender<Message>,
    ) -> Self {
        Self {
            id,
            neighbors,
            outbound,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Nodes this node has a link towards.
    pub fn neighbors(&self) -> &BTreeSet<NodeId> {
        &self.neighbors
    }

    /// Place `message` on this node's outbound queue.
    ///
    /// Waits until the node's router takes the message (which it only does once it has
    /// finished transmitting the previous one). The destination is not checked: messages to
    /// nodes without a link are reported as unreachable by the router.
    pub async fn send(&mut self, message: Message) -> Result<(), Error> {
        self.outbound
            .send(message)
            .await
            .map_err(|_| Error::NetworkClosed)
    }

    /// Build a [Message] originating at this node and send it.
    pub async fn request(
        &mut self,
        request_id: u64,
        to: NodeId,
        request_type: RequestType,
        payload: impl Into<String>,
        latency_hint: Duration,
    ) -> Result<(), Error> {
        let message = Message::new(
            request_id,
            request_type,
            self.id,
            to,
            payload,
            latency_hint,
        );
        self.send(message).await
    }
}

/// Hand every inbound message of node `id` to the request handler.
///
/// Returns once the inbound queue is closed and drained.
pub(crate) async fn deliver<O: Observer>(
    id: NodeId,
    mut inbound: rendezvous::Receiver<Message>,
    observer: O,
) {
    while let Some(message) = inbound.recv().await {
        observer.observe(handler::handle(id, &message));
    }
    debug!(node = id, "delivery loop stopped");
}
