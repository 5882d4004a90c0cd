//! Initial wiring of the simulated nodes.

use crate::config::Config;
use rand::Rng;
use stellar_network::{Link, Network, NodeId};
use stellar_utils::random_duration;
use tracing::error;

/// Link every pair of nodes with a random latency and packet loss.
///
/// Each pair `i < j` gets a link from `i` to `j` (and from `j` to `i` if
/// [Config::bidirectional] is set). Links that cannot be created are logged and skipped.
/// Returns the number of links created.
pub fn full_mesh<R: Rng>(network: &mut Network, rng: &mut R, config: &Config) -> usize {
    let nodes = network.nodes();
    let mut created = 0;
    for i in 0..nodes {
        for j in (i + 1)..nodes {
            created += connect(network, rng, config, i, j);
            if config.bidirectional {
                created += connect(network, rng, config, j, i);
            }
        }
    }
    created
}

fn connect<R: Rng>(
    network: &mut Network,
    rng: &mut R,
    config: &Config,
    from: NodeId,
    to: NodeId,
) -> usize {
    let latency = random_duration(rng, config.min_latency, config.max_latency);
    let packet_loss = rng.gen::<f64>() * config.max_packet_loss;
    let link = Link::new(latency.as_millis() as f64, packet_loss);
    match network.connect(from, to, link) {
        Ok(()) => 1,
        Err(err) => {
            error!(?err, from, to, "failed to connect nodes");
            0
        }
    }
}
