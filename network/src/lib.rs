//! Route typed requests between simulated nodes over links with configurable latency and loss.
//!
//! # Overview
//!
//! A [Network] is set up by registering directed [Link]s between nodes, each with its own
//! latency and probability of losing a message. [Network::start] then runs two tasks per
//! node:
//!
//! * a router, draining the node's outbound queue. For every message it waits out the
//!   latency of each matching link, rolls for loss, and hands survivors to the recipient.
//! * a delivery loop, passing every message the node receives to the request [handler].
//!
//! All queues are rendezvous queues ([stellar_utils::rendezvous]): sending to a node waits
//! until its router is free, and a router waits until the recipient's delivery loop is ready.
//!
//! Nothing is printed by the network. Deliveries, losses, unknown request types and
//! unreachable recipients are reported as [Observation]s to an [Observer] supplied by the
//! caller, and traced with [tracing].
//!
//! # Example
//!
//! ```rust,no_run
//! use futures::{channel::mpsc, StreamExt};
//! use prometheus_client::registry::Registry;
//! use std::{sync::{Arc, Mutex}, time::Duration};
//! use stellar_network::{Config, Duplicates, Link, Network, RequestType};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let mut network = Network::new(Config {
//!         nodes: 2,
//!         seed: 0,
//!         duplicates: Duplicates::Keep,
//!         registry: Arc::new(Mutex::new(Registry::default())),
//!     });
//!     network.connect(0, 1, Link::new(50.0, 0.0)).unwrap();
//!
//!     let (observer, mut observations) = mpsc::unbounded();
//!     let simulation = network.start(observer);
//!     let mut node = simulation.node(0).unwrap();
//!     node.request(1, 1, RequestType::GetData, "hello", Duration::ZERO)
//!         .await
//!         .unwrap();
//!     drop(node);
//!     simulation.shutdown().await.unwrap();
//!
//!     while let Some(observation) = observations.next().await {
//!         println!("{observation:?}");
//!     }
//! }
//! ```

use thiserror::Error;

pub mod handler;
mod link;
mod message;
mod metrics;
mod network;
mod node;
mod observation;
mod router;

pub use link::{Connection, Duplicates, Link, Links};
pub use message::{Message, NodeId, RequestType};
pub use network::{Config, Network, Simulation};
pub use node::Node;
pub use observation::{Observation, Observer, Outcome};

/// Errors that can occur when setting up or using a network.
#[derive(Debug, Error)]
pub enum Error {
    #[error("origin is not a node: {0}")]
    InvalidOrigin(NodeId),
    #[error("target is not a node: {0}")]
    InvalidTarget(NodeId),
    #[error("invalid latency (must be finite and non-negative): {0}")]
    InvalidLatency(f64),
    #[error("invalid loss probability (must be in [0, 1]): {0}")]
    InvalidLossProbability(f64),
    #[error("network closed")]
    NetworkClosed,
    #[error("task failed: {0}")]
    TaskFailed(#[from] tokio::task::JoinError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::{channel::mpsc, future::join_all, StreamExt};
    use prometheus_client::{encoding::text::encode, registry::Registry};
    use rand::{rngs::StdRng, Rng, SeedableRng};
    use std::{
        collections::HashSet,
        sync::{Arc, Mutex},
        time::Duration,
    };
    use tokio::time::Instant;
    use tracing::Level;

    fn init_logging() {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_max_level(Level::DEBUG)
            .try_init();
    }

    fn network(nodes: u32, duplicates: Duplicates) -> (Network, Arc<Mutex<Registry>>) {
        let registry = Arc::new(Mutex::new(Registry::default()));
        let network = Network::new(Config {
            nodes,
            seed: 0,
            duplicates,
            registry: registry.clone(),
        });
        (network, registry)
    }

    /// Run `network`, sending every request in `requests` as `(from, to, request_type)` in
    /// order, and return all observations once the network has drained.
    async fn run(
        network: Network,
        requests: Vec<(NodeId, NodeId, RequestType)>,
    ) -> Vec<Observation> {
        let (observer, observations) = mpsc::unbounded();
        let simulation = network.start(observer);
        for (request_id, (from, to, request_type)) in requests.into_iter().enumerate() {
            let mut node = simulation.node(from).unwrap();
            node.request(request_id as u64, to, request_type, "", Duration::ZERO)
                .await
                .unwrap();
        }
        simulation.shutdown().await.unwrap();
        observations.collect().await
    }

    fn count(observations: &[Observation], outcome: Outcome) -> usize {
        observations
            .iter()
            .filter(|o| o.outcome == outcome)
            .count()
    }

    #[tokio::test(start_paused = true)]
    async fn test_delivery_waits_for_latency() {
        init_logging();
        let (mut network, _) = network(2, Duplicates::Keep);
        network.connect(0, 1, Link::new(50.0, 0.0)).unwrap();

        let start = Instant::now();
        let observations = run(network, vec![(0, 1, RequestType::GetData)]).await;
        assert_eq!(observations.len(), 1);
        let observation = &observations[0];
        assert_eq!(observation.outcome, Outcome::Received);
        assert_eq!(observation.node, 1);
        assert_eq!(observation.peer, 0);
        assert_eq!(observation.request_type, RequestType::GetData);
        assert!(observation.elapsed >= Duration::from_millis(50));
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[tokio::test(start_paused = true)]
    async fn test_total_loss() {
        init_logging();
        let (mut network, _) = network(2, Duplicates::Keep);
        network.connect(0, 1, Link::new(50.0, 1.0)).unwrap();

        let requests = (0..20).map(|_| (0, 1, RequestType::GetData)).collect();
        let observations = run(network, requests).await;
        assert_eq!(observations.len(), 20);
        for observation in observations {
            assert_eq!(observation.outcome, Outcome::Dropped);
            assert_eq!(observation.node, 0);
            assert_eq!(observation.peer, 1);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_loss() {
        let (mut network, _) = network(2, Duplicates::Keep);
        network.connect(0, 1, Link::new(1.0, 0.0)).unwrap();

        let requests = (0..100).map(|_| (0, 1, RequestType::UpdateData)).collect();
        let observations = run(network, requests).await;
        assert_eq!(observations.len(), 100);
        assert_eq!(count(&observations, Outcome::Received), 100);

        // Every request arrives exactly once
        let ids: HashSet<_> = observations.iter().map(|o| o.request_id).collect();
        assert_eq!(ids.len(), 100);
    }

    #[tokio::test(start_paused = true)]
    async fn test_partial_loss() {
        let (mut network, _) = network(2, Duplicates::Keep);
        network.connect(0, 1, Link::new(1.0, 0.5)).unwrap();

        let requests = (0..200).map(|_| (0, 1, RequestType::GetData)).collect();
        let observations = run(network, requests).await;
        let received = count(&observations, Outcome::Received);
        let dropped = count(&observations, Outcome::Dropped);
        assert_eq!(received + dropped, 200);
        assert!(received > 0);
        assert!(dropped > 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_link_unreachable() {
        init_logging();
        let (mut network, _) = network(3, Duplicates::Keep);
        network.connect(0, 1, Link::new(10.0, 0.0)).unwrap();

        // Links are directional, and node 2 has none
        let observations = run(
            network,
            vec![
                (1, 0, RequestType::GetData),
                (2, 1, RequestType::DeleteData),
            ],
        )
        .await;
        assert_eq!(observations.len(), 2);
        assert_eq!(count(&observations, Outcome::Unreachable), 2);
        assert_eq!(count(&observations, Outcome::Received), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_request_type() {
        init_logging();
        let (mut network, _) = network(2, Duplicates::Keep);
        network.connect(0, 1, Link::new(10.0, 0.0)).unwrap();

        let unknown = RequestType::from("InvalidRequest");
        let observations = run(network, vec![(0, 1, unknown.clone())]).await;
        assert_eq!(observations.len(), 1);
        let observation = &observations[0];
        assert_eq!(observation.outcome, Outcome::UnknownRequestType);
        assert_eq!(observation.node, 1);
        assert_eq!(observation.peer, 0);
        assert_eq!(observation.request_type, unknown);
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_links_kept() {
        let (mut network, _) = network(2, Duplicates::Keep);
        network.connect(0, 1, Link::new(10.0, 0.0)).unwrap();
        network.connect(0, 1, Link::new(20.0, 0.0)).unwrap();

        let start = Instant::now();
        let observations = run(network, vec![(0, 1, RequestType::GetData)]).await;
        assert_eq!(count(&observations, Outcome::Received), 2);
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_links_replaced() {
        let (mut network, _) = network(2, Duplicates::Replace);
        network.connect(0, 1, Link::new(10.0, 0.0)).unwrap();
        network.connect(0, 1, Link::new(20.0, 1.0)).unwrap();

        let observations = run(network, vec![(0, 1, RequestType::GetData)]).await;
        assert_eq!(observations.len(), 1);
        assert_eq!(observations[0].outcome, Outcome::Dropped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_busy_router_applies_backpressure() {
        let (mut network, _) = network(2, Duplicates::Keep);
        network.connect(0, 1, Link::new(100.0, 0.0)).unwrap();
        let (observer, _observations) = mpsc::unbounded();
        let simulation = network.start(observer);
        let mut node = simulation.node(0).unwrap();

        // The router takes the first message immediately
        let start = Instant::now();
        node.request(0, 1, RequestType::GetData, "", Duration::ZERO)
            .await
            .unwrap();
        assert!(start.elapsed() < Duration::from_millis(100));

        // The second waits until the first has crossed the link
        node.request(1, 1, RequestType::GetData, "", Duration::ZERO)
            .await
            .unwrap();
        assert!(start.elapsed() >= Duration::from_millis(100));

        drop(node);
        simulation.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_delivery_order_across_sources() {
        let (mut network, _) = network(3, Duplicates::Keep);
        network.connect(0, 2, Link::new(100.0, 0.0)).unwrap();
        network.connect(1, 2, Link::new(10.0, 0.0)).unwrap();

        // Node 0 sends first but its link is slower
        let observations = run(
            network,
            vec![(0, 2, RequestType::GetData), (1, 2, RequestType::GetData)],
        )
        .await;
        let peers: Vec<_> = observations.iter().map(|o| o.peer).collect();
        assert_eq!(peers, vec![1, 0]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_mesh() {
        init_logging();
        const NODES: u32 = 8;
        let (mut network, _) = network(NODES, Duplicates::Keep);
        let mut rng = StdRng::seed_from_u64(42);
        for from in 0..NODES {
            for to in 0..NODES {
                if from == to {
                    continue;
                }
                let link = Link::new(rng.gen_range(1.0..20.0), rng.gen_range(0.0..0.2));
                network.connect(from, to, link).unwrap();
            }
        }

        // Every node sends to every neighbor concurrently
        let (observer, observations) = mpsc::unbounded();
        let simulation = network.start(observer);
        let mut senders = Vec::new();
        for node in simulation.nodes() {
            let mut node = node.clone();
            senders.push(tokio::spawn(async move {
                let neighbors: Vec<_> = node.neighbors().iter().copied().collect();
                for to in neighbors {
                    let request_type = RequestType::KNOWN[to as usize % 3].clone();
                    node.request(u64::from(to), to, request_type, "", Duration::ZERO)
                        .await
                        .unwrap();
                }
            }));
        }
        for result in join_all(senders).await {
            result.unwrap();
        }
        simulation.shutdown().await.unwrap();
        let observations: Vec<_> = observations.collect().await;

        // Every message is either dropped or received exactly once
        let total = (NODES * (NODES - 1)) as usize;
        assert_eq!(observations.len(), total);
        let mut seen = HashSet::new();
        for observation in &observations {
            let pair = match observation.outcome {
                Outcome::Received => (observation.peer, observation.node),
                Outcome::Dropped => (observation.node, observation.peer),
                outcome => panic!("unexpected outcome: {outcome:?}"),
            };
            assert!(seen.insert(pair), "observed twice: {pair:?}");
        }
        assert_eq!(seen.len(), total);
    }

    #[tokio::test(start_paused = true)]
    async fn test_metrics() {
        let (mut network, registry) = network(3, Duplicates::Keep);
        network.connect(0, 1, Link::new(10.0, 0.0)).unwrap();
        network.connect(1, 2, Link::new(10.0, 1.0)).unwrap();

        run(
            network,
            vec![
                (0, 1, RequestType::GetData),
                (0, 1, RequestType::GetData),
                (1, 2, RequestType::GetData),
                (2, 0, RequestType::GetData),
            ],
        )
        .await;

        let mut buffer = String::new();
        encode(&mut buffer, &registry.lock().unwrap()).unwrap();
        assert!(buffer.contains(r#"messages_sent_total{origin="0",recipient="1"} 2"#));
        assert!(buffer.contains(r#"messages_delivered_total{origin="0",recipient="1"} 2"#));
        assert!(buffer.contains(r#"messages_dropped_total{origin="1",recipient="2"} 1"#));
        assert!(buffer.contains(r#"messages_unreachable_total{origin="2",recipient="0"} 1"#));
    }
}
