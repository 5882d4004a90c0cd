//! Directed links between nodes and the registry that holds them.

use crate::{Error, NodeId};
use rand::Rng;
use std::time::Duration;

/// Describes a connection between two nodes.
///
/// Links are unidirectional (and must be set up in both directions
/// for a bidirectional connection).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Link {
    /// Latency for the delivery of a message in milliseconds.
    pub latency: f64,

    /// Probability of a message being dropped (in range [0,1]).
    pub packet_loss: f64,
}

impl Link {
    pub fn new(latency: f64, packet_loss: f64) -> Self {
        Self {
            latency,
            packet_loss,
        }
    }

    /// Check the link parameters, returning the latency as a [Duration].
    ///
    /// Latency is checked before packet loss.
    pub(crate) fn validate(&self) -> Result<Duration, Error> {
        if !self.latency.is_finite() || self.latency < 0.0 {
            return Err(Error::InvalidLatency(self.latency));
        }
        let nanos = (self.latency * 1_000_000.0).round();
        if nanos > u64::MAX as f64 {
            return Err(Error::InvalidLatency(self.latency));
        }
        let latency = Duration::from_nanos(nanos as u64);
        if !(0.0..=1.0).contains(&self.packet_loss) {
            return Err(Error::InvalidLossProbability(self.packet_loss));
        }
        Ok(latency)
    }
}

/// A validated link registered between two nodes.
#[derive(Clone, Debug, PartialEq)]
pub struct Connection {
    pub from: NodeId,
    pub to: NodeId,

    /// Transit delay applied before delivery.
    pub latency: Duration,

    /// Probability of a message being dropped (in range [0,1]).
    pub packet_loss: f64,
}

impl Connection {
    /// Roll whether a message crossing this connection is lost.
    pub fn should_drop<R: Rng + ?Sized>(&self, rng: &mut R) -> bool {
        rng.gen::<f64>() < self.packet_loss
    }
}

/// How [Links::insert] treats a second connection between the same pair of nodes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Duplicates {
    /// Keep every connection. A message is simulated independently over each of them
    /// (and may be delivered or dropped once per connection).
    #[default]
    Keep,

    /// Overwrite the parameters of the existing connection.
    Replace,
}

/// Registry of every [Connection] in the network, in registration order.
#[derive(Clone, Debug, Default)]
pub struct Links {
    duplicates: Duplicates,
    connections: Vec<Connection>,
}

impl Links {
    pub fn new(duplicates: Duplicates) -> Self {
        Self {
            duplicates,
            connections: Vec::new(),
        }
    }

    /// Record a connection.
    pub(crate) fn insert(&mut self, connection: Connection) {
        if self.duplicates == Duplicates::Replace {
            if let Some(existing) = self
                .connections
                .iter_mut()
                .find(|c| c.from == connection.from && c.to == connection.to)
            {
                *existing = connection;
                return;
            }
        }
        self.connections.push(connection);
    }

    /// Every connection from `from` to `to`, in registration order.
    pub fn routes(&self, from: NodeId, to: NodeId) -> impl Iterator<Item = &Connection> {
        self.connections
            .iter()
            .filter(move |c| c.from == from && c.to == to)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Connection> {
        self.connections.iter()
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}
