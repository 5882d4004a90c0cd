//! Simulated transit of messages leaving a node.

use crate::{
    link::Links,
    metrics::{Metrics, Route},
    Message, NodeId, Observation, Observer, Outcome,
};
use rand::rngs::StdRng;
use std::sync::Arc;
use stellar_utils::rendezvous;
use tokio::time::sleep;
use tracing::{debug, error};

/// Moves messages from one node's outbound queue onto the inbound queues of their recipients.
pub(crate) struct Router<O: Observer> {
    id: NodeId,
    links: Arc<Links>,
    inbound: Vec<rendezvous::Sender<Message>>,
    rng: StdRng,
    observer: O,
    metrics: Metrics,
}

impl<O: Observer> Router<O> {
    pub(crate) fn new(
        id: NodeId,
        links: Arc<Links>,
        inbound: Vec<rendezvous::Sender<Message>>,
        rng: StdRng,
        observer: O,
        metrics: Metrics,
    ) -> Self {
        Self {
            id,
            links,
            inbound,
            rng,
            observer,
            metrics,
        }
    }

    /// Route messages until the outbound queue is closed and drained.
    pub(crate) async fn run(mut self, mut outbound: rendezvous::Receiver<Message>) {
        while let Some(message) = outbound.recv().await {
            self.route(message).await;
        }
        debug!(node = self.id, "router stopped");
    }

    /// Simulate `message` over every link matching its route.
    ///
    /// Each matching link applies its own delay and loss, so duplicate links may deliver the
    /// same message more than once. Messages are processed one at a time: the outbound queue
    /// is not read again until this returns.
    async fn route(&mut self, message: Message) {
        let route = Route::new(message.from, message.to);
        let links = self.links.clone();
        let mut routes = links.routes(message.from, message.to).peekable();
        if routes.peek().is_none() {
            debug!(
                origin = message.from,
                recipient = message.to,
                reason = "no link",
                "dropping message",
            );
            self.metrics.unreachable.get_or_create(&route).inc();
            self.observer
                .observe(Observation::routed(&message, Outcome::Unreachable));
            return;
        }

        for connection in routes {
            // Record sent message as soon as we determine there is a link with recipient
            self.metrics.sent.get_or_create(&route).inc();
            debug!(
                origin = message.from,
                recipient = message.to,
                latency = ?connection.latency,
                "sending message",
            );

            // Apply link settings
            sleep(connection.latency).await;
            if connection.should_drop(&mut self.rng) {
                debug!(
                    origin = message.from,
                    recipient = message.to,
                    reason = "random link failure",
                    "dropping message",
                );
                self.metrics.dropped.get_or_create(&route).inc();
                self.observer
                    .observe(Observation::routed(&message, Outcome::Dropped));
                continue;
            }

            // Wait for the recipient to take the message
            let delivered = match self.inbound.get_mut(connection.to as usize) {
                Some(inbound) => inbound.send(message.clone()).await.is_ok(),
                None => false,
            };
            if !delivered {
                // This can only happen if the recipient exited.
                error!(
                    origin = message.from,
                    recipient = message.to,
                    "failed to deliver",
                );
                self.observer
                    .observe(Observation::routed(&message, Outcome::Undeliverable));
                continue;
            }
            self.metrics.delivered.get_or_create(&route).inc();
        }
    }
}
