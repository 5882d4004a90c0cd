//! Terminal output of observations and command feedback.

use crate::command;
use colored::{Color, Colorize};
use futures::{channel::mpsc, StreamExt};
use std::io::{self, Write};
use stellar_network::{Observation, Outcome, RequestType};

/// Describe an observation on a single line.
pub fn describe(observation: &Observation) -> String {
    let Observation {
        node,
        peer,
        request_type,
        ..
    } = observation;
    match observation.outcome {
        Outcome::Received => {
            format!("Node {node}: Received {request_type} request from Node {peer}")
        }
        Outcome::UnknownRequestType => {
            format!("Node {node}: Unknown request type {request_type} from Node {peer}")
        }
        Outcome::Dropped => format!("Packet loss: Node {node} -> Node {peer}"),
        Outcome::Unreachable => format!("No link: Node {node} -> Node {peer}"),
        Outcome::Undeliverable => format!("Undeliverable: Node {node} -> Node {peer}"),
    }
}

/// Color used for an observation.
pub fn color(observation: &Observation) -> Color {
    if observation.outcome != Outcome::Received {
        return Color::Red;
    }
    match observation.request_type {
        RequestType::GetData => Color::Blue,
        RequestType::UpdateData => Color::Yellow,
        RequestType::DeleteData => Color::Magenta,
        RequestType::Unknown(_) => Color::Red,
    }
}

pub fn render(observation: &Observation) -> String {
    describe(observation).color(color(observation)).to_string()
}

/// Print every observation until all observers are dropped.
///
/// Returns the number of observations printed.
pub async fn print(mut observations: mpsc::UnboundedReceiver<Observation>) -> usize {
    let mut printed = 0;
    while let Some(observation) = observations.next().await {
        println!("{}", render(&observation));
        printed += 1;
    }
    printed
}

pub fn prompt() {
    print!("Enter command (<from> <to> <requestType>, or 'exit'): ");
    let _ = io::stdout().flush();
}

pub fn invalid(err: &command::Error) {
    println!("{}", err.to_string().red());
}
