//! Simulate a mesh of request-routing nodes and drive it from the terminal.
//!
//! Every node is linked to every node with a higher id (or to every other node with
//! `--bidirectional`), each link getting a random latency and packet loss. Once every node
//! has sent a request to each of its neighbors, further requests are read from stdin:
//!
//! ```txt
//! <from> <to> <GetData|UpdateData|DeleteData>
//! ```
//!
//! Enter `exit` (or close stdin) to drain the network and stop.
//!
//! # Usage
//!
//! ```sh
//! cargo run --release --bin stellar -- --nodes 5 --seed 42 --metrics
//! ```

mod command;
mod config;
mod display;
mod topology;
mod traffic;

use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use config::Config;
use futures::channel::mpsc;
use prometheus_client::{encoding::text::encode, registry::Registry};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::{
    str::FromStr,
    sync::{Arc, Mutex},
};
use stellar_network::{Duplicates, Network};
use tokio::io::BufReader;
use tracing::{error, info, Level};

fn main() {
    // Parse arguments
    let matches = Command::new("stellar")
        .about("simulate a mesh of nodes exchanging requests over lossy links")
        .arg(
            Arg::new("config")
                .long("config")
                .required(false)
                .help("YAML file with default settings (flags take precedence)"),
        )
        .arg(
            Arg::new("nodes")
                .long("nodes")
                .required(false)
                .value_parser(value_parser!(u32)),
        )
        .arg(
            Arg::new("seed")
                .long("seed")
                .required(false)
                .value_parser(value_parser!(u64)),
        )
        .arg(
            Arg::new("min-latency")
                .long("min-latency")
                .required(false)
                .value_parser(value_parser!(u64))
                .help("Lower bound of link latency (in milliseconds)"),
        )
        .arg(
            Arg::new("max-latency")
                .long("max-latency")
                .required(false)
                .value_parser(value_parser!(u64))
                .help("Upper bound of link latency (in milliseconds)"),
        )
        .arg(
            Arg::new("max-packet-loss")
                .long("max-packet-loss")
                .required(false)
                .value_parser(value_parser!(f64)),
        )
        .arg(
            Arg::new("bidirectional")
                .long("bidirectional")
                .action(ArgAction::SetTrue)
                .help("Link every pair of nodes in both directions"),
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .required(false)
                .default_value("info"),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON"),
        )
        .arg(
            Arg::new("metrics")
                .long("metrics")
                .action(ArgAction::SetTrue)
                .help("Print metrics on exit"),
        )
        .get_matches();

    // Create logger
    let level = matches
        .get_one::<String>("log-level")
        .map(|level| Level::from_str(level).expect("Log level not well-formed"))
        .unwrap_or(Level::INFO);
    let logger = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr);
    if matches.get_flag("json") {
        logger.json().init();
    } else {
        logger.init();
    }

    // Load settings
    let config = match load(&matches) {
        Ok(config) => config,
        Err(err) => {
            error!(?err, "failed to load config");
            std::process::exit(1);
        }
    };
    info!(?config, "loaded config");

    // Run simulation
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("Failed to build runtime");
    runtime.block_on(run(config, matches.get_flag("metrics")));
}

/// Read the config file (if any) and apply flag overrides.
fn load(matches: &ArgMatches) -> Result<Config, config::Error> {
    let mut config = match matches.get_one::<String>("config") {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(nodes) = matches.get_one::<u32>("nodes") {
        config.nodes = *nodes;
    }
    if let Some(seed) = matches.get_one::<u64>("seed") {
        config.seed = Some(*seed);
    }
    if let Some(min_latency) = matches.get_one::<u64>("min-latency") {
        config.min_latency = *min_latency;
    }
    if let Some(max_latency) = matches.get_one::<u64>("max-latency") {
        config.max_latency = *max_latency;
    }
    if let Some(max_packet_loss) = matches.get_one::<f64>("max-packet-loss") {
        config.max_packet_loss = *max_packet_loss;
    }
    if matches.get_flag("bidirectional") {
        config.bidirectional = true;
    }
    config.validate()?;
    Ok(config)
}

async fn run(config: Config, print_metrics: bool) {
    let seed = config.seed.unwrap_or_else(|| rand::thread_rng().gen());
    info!(seed, "seeded simulation");
    let mut rng = StdRng::seed_from_u64(seed);

    // Build network
    let registry = Arc::new(Mutex::new(Registry::default()));
    let duplicates = if config.replace_duplicates {
        Duplicates::Replace
    } else {
        Duplicates::Keep
    };
    let mut network = Network::new(stellar_network::Config {
        nodes: config.nodes,
        seed: rng.gen(),
        duplicates,
        registry: registry.clone(),
    });
    let links = topology::full_mesh(&mut network, &mut rng, &config);
    info!(links, "created topology");

    // Start network
    let (observer, observations) = mpsc::unbounded();
    let printer = tokio::spawn(display::print(observations));
    let simulation = network.start(observer);

    // Send initial traffic
    match traffic::generate(simulation.nodes(), rng.gen()).await {
        Ok(sent) => info!(sent, "sent initial requests"),
        Err(err) => error!(?err, "failed to send initial requests"),
    }

    // Read commands
    let input = BufReader::new(tokio::io::stdin());
    let sent = command::read(input, simulation.nodes(), &mut rng).await;
    info!(sent, "finished reading commands");

    // Drain network
    if let Err(err) = simulation.shutdown().await {
        error!(?err, "failed to shutdown network");
    }
    match printer.await {
        Ok(printed) => info!(printed, "printed observations"),
        Err(err) => error!(?err, "printer failed"),
    }

    if print_metrics {
        let mut buffer = String::new();
        let registry = registry.lock().unwrap();
        match encode(&mut buffer, &registry) {
            Ok(()) => print!("{buffer}"),
            Err(err) => error!(?err, "failed to encode metrics"),
        }
    }
}
