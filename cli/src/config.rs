//! Settings for a simulation run, loaded from YAML and overridden by flags.

use serde::Deserialize;
use std::{fs, path::Path};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("could not read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("invalid config: {0}")]
    Invalid(&'static str),
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Number of nodes to simulate.
    pub nodes: u32,

    /// Seed for all randomness (random if not set).
    pub seed: Option<u64>,

    /// Lower bound of link latency (in milliseconds).
    pub min_latency: u64,

    /// Upper bound (exclusive) of link latency (in milliseconds).
    pub max_latency: u64,

    /// Upper bound (exclusive) of per-link packet loss.
    pub max_packet_loss: f64,

    /// Link every pair of nodes in both directions (instead of only from lower to higher id).
    pub bidirectional: bool,

    /// Overwrite a link when the same pair of nodes is linked again.
    pub replace_duplicates: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            nodes: 10,
            seed: None,
            min_latency: 10,
            max_latency: 100,
            max_packet_loss: 0.1,
            bidirectional: false,
            replace_duplicates: false,
        }
    }
}

impl Config {
    /// Read a config from a YAML file. Missing fields take their default value.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let contents = fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self, Error> {
        Ok(serde_yaml::from_str(contents)?)
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.nodes == 0 {
            return Err(Error::Invalid("nodes must be positive"));
        }
        if self.min_latency > self.max_latency {
            return Err(Error::Invalid("min_latency must not exceed max_latency"));
        }
        if !(0.0..=1.0).contains(&self.max_packet_loss) {
            return Err(Error::Invalid("max_packet_loss must be in [0, 1]"));
        }
        Ok(())
    }
}
