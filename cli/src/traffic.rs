//! Initial requests sent before the command reader starts.

use futures::future::try_join_all;
use rand::{rngs::StdRng, Rng, SeedableRng};
use stellar_network::{Error, Node, RequestType};
use stellar_utils::random_duration;

/// Bounds of the latency hint attached to generated requests (in milliseconds).
pub const HINT_MIN: u64 = 10;
pub const HINT_MAX: u64 = 100;

/// Payload attached to every request originating at `id`.
pub fn payload(id: u32) -> String {
    format!("Request from Node {id}!")
}

/// Pick a random request type to send.
pub fn random_request_type<R: Rng>(rng: &mut R) -> RequestType {
    RequestType::KNOWN[rng.gen_range(0..RequestType::KNOWN.len())].clone()
}

/// Have every node concurrently send one request to each of its neighbors.
///
/// Requests are numbered by the position of the neighbor. Returns the number of requests
/// sent once all of them have been taken by their routers.
pub async fn generate(nodes: &[Node], seed: u64) -> Result<usize, Error> {
    let mut senders = Vec::with_capacity(nodes.len());
    for node in nodes {
        let mut node = node.clone();
        let mut rng = StdRng::seed_from_u64(seed.wrapping_add(u64::from(node.id())));
        senders.push(tokio::spawn(async move {
            let id = node.id();
            let neighbors: Vec<_> = node.neighbors().iter().copied().collect();
            for (request_id, to) in neighbors.iter().enumerate() {
                let request_type = random_request_type(&mut rng);
                let hint = random_duration(&mut rng, HINT_MIN, HINT_MAX);
                node.request(request_id as u64, *to, request_type, payload(id), hint)
                    .await?;
            }
            Ok::<_, Error>(neighbors.len())
        }));
    }

    let mut sent = 0;
    for result in try_join_all(senders).await? {
        sent += result?;
    }
    Ok(sent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::Config, topology};
    use futures::{channel::mpsc, StreamExt};
    use prometheus_client::registry::Registry;
    use std::sync::{Arc, Mutex};
    use stellar_network::{Duplicates, Network, Outcome};

    #[tokio::test(start_paused = true)]
    async fn test_generate_reaches_every_neighbor() {
        let mut network = Network::new(stellar_network::Config {
            nodes: 5,
            seed: 3,
            duplicates: Duplicates::Keep,
            registry: Arc::new(Mutex::new(Registry::default())),
        });
        let config = Config {
            max_packet_loss: 0.0,
            ..Config::default()
        };
        topology::full_mesh(&mut network, &mut StdRng::seed_from_u64(3), &config);

        let (observer, observations) = mpsc::unbounded();
        let simulation = network.start(observer);
        let sent = generate(simulation.nodes(), 3).await.unwrap();
        assert_eq!(sent, 10);
        simulation.shutdown().await.unwrap();

        let observations: Vec<_> = observations.collect().await;
        assert_eq!(observations.len(), 10);
        for observation in observations {
            assert_eq!(observation.outcome, Outcome::Received);
            assert!(observation.peer < observation.node);
            assert!(observation.request_type.is_known());
        }
    }

    #[test]
    fn test_random_request_type_known() {
        let mut rng = StdRng::seed_from_u64(0);
        for _ in 0..100 {
            assert!(random_request_type(&mut rng).is_known());
        }
    }
}
