//! Setup and lifecycle of a simulated network.

use crate::{
    link::{Connection, Duplicates, Link, Links},
    metrics::Metrics,
    node::{self, Node},
    router::Router,
    Error, NodeId, Observer,
};
use prometheus_client::registry::Registry;
use rand::{rngs::StdRng, SeedableRng};
use std::{
    collections::BTreeSet,
    sync::{Arc, Mutex},
};
use stellar_utils::rendezvous;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Configuration for a simulated network.
pub struct Config {
    /// Number of nodes (identified `0..nodes`).
    pub nodes: u32,

    /// Seed for the randomness used to simulate packet loss.
    pub seed: u64,

    /// How repeated links between the same pair of nodes are treated.
    pub duplicates: Duplicates,

    /// Registry for metrics.
    pub registry: Arc<Mutex<Registry>>,
}

/// A simulated network being set up.
///
/// Links can only be added before [Network::start]. Once started, the topology is shared
/// read-only with every router.
pub struct Network {
    seed: u64,
    links: Links,
    neighbors: Vec<BTreeSet<NodeId>>,
    metrics: Metrics,
}

impl Network {
    /// Create a new simulated network with a given configuration.
    ///
    /// By default, nodes are not linked to each other.
    pub fn new(cfg: Config) -> Self {
        let metrics = {
            let mut registry = cfg.registry.lock().unwrap();
            Metrics::init(&mut registry)
        };
        Self {
            seed: cfg.seed,
            links: Links::new(cfg.duplicates),
            neighbors: vec![BTreeSet::new(); cfg.nodes as usize],
            metrics,
        }
    }

    /// Number of nodes in the network.
    pub fn nodes(&self) -> u32 {
        self.neighbors.len() as u32
    }

    /// Create a unidirectional link from `from` to `to`.
    ///
    /// On success, `to` becomes a neighbor of `from` (but not the other way around). On
    /// failure, the network is left unchanged.
    pub fn connect(&mut self, from: NodeId, to: NodeId, link: Link) -> Result<(), Error> {
        if from >= self.nodes() {
            return Err(Error::InvalidOrigin(from));
        }
        if to >= self.nodes() {
            return Err(Error::InvalidTarget(to));
        }
        let latency = link.validate()?;

        self.neighbors[from as usize].insert(to);
        self.links.insert(Connection {
            from,
            to,
            latency,
            packet_loss: link.packet_loss,
        });
        debug!(from, to, ?latency, packet_loss = link.packet_loss, "linked nodes");
        Ok(())
    }

    /// Nodes `id` has a link towards, if `id` exists.
    pub fn neighbors(&self, id: NodeId) -> Option<&BTreeSet<NodeId>> {
        self.neighbors.get(id as usize)
    }

    pub fn links(&self) -> &Links {
        &self.links
    }

    /// Start a router and a delivery loop for every node.
    ///
    /// Every [crate::Observation] produced by the running network is handed to `observer`.
    /// Must be called from within a Tokio runtime.
    pub fn start<O: Observer>(self, observer: O) -> Simulation {
        let links = Arc::new(self.links);
        let count = self.neighbors.len();

        // Initialize node queues
        let mut nodes = Vec::with_capacity(count);
        let mut outbound = Vec::with_capacity(count);
        let mut inbound = Vec::with_capacity(count);
        let mut deliveries = Vec::with_capacity(count);
        for (id, neighbors) in self.neighbors.into_iter().enumerate() {
            let id = id as NodeId;
            let (outbound_sender, outbound_receiver) = rendezvous::channel();
            let (inbound_sender, inbound_receiver) = rendezvous::channel();
            nodes.push(Node::new(id, Arc::new(neighbors), outbound_sender));
            outbound.push(outbound_receiver);
            inbound.push(inbound_sender);
            deliveries.push(tokio::spawn(node::deliver(
                id,
                inbound_receiver,
                observer.clone(),
            )));
        }

        // Routers hold the only inbound senders, so delivery loops end once routers do
        let mut routers = Vec::with_capacity(count);
        for (id, receiver) in outbound.into_iter().enumerate() {
            let rng = StdRng::seed_from_u64(self.seed.wrapping_add(id as u64));
            let router = Router::new(
                id as NodeId,
                links.clone(),
                inbound.clone(),
                rng,
                observer.clone(),
                self.metrics.clone(),
            );
            routers.push(tokio::spawn(router.run(receiver)));
        }
        info!(nodes = count, links = links.len(), "started network");

        Simulation {
            nodes,
            routers,
            deliveries,
        }
    }
}

/// A running simulated network.
pub struct Simulation {
    nodes: Vec<Node>,
    routers: Vec<JoinHandle<()>>,
    deliveries: Vec<JoinHandle<()>>,
}

impl Simulation {
    /// Handles to every node, indexed by [NodeId].
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// A new handle to node `id`, if it exists.
    pub fn node(&self, id: NodeId) -> Option<Node> {
        self.nodes.get(id as usize).cloned()
    }

    /// Stop the network once all traffic has drained.
    ///
    /// Outbound queues close when the last handle to their node is dropped, so this waits
    /// for every producer to drop its [Node] handles, then for every router to finish
    /// transmitting, then for every delivery loop to handle what it was given.
    pub async fn shutdown(self) -> Result<(), Error> {
        drop(self.nodes);
        for router in self.routers {
            router.await?;
        }
        for delivery in self.deliveries {
            delivery.await?;
        }
        info!("stopped network");
        Ok(())
    }
}
