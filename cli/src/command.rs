//! Read requests typed by the user.

use crate::{display, traffic};
use rand::Rng;
use stellar_network::{Node, NodeId, RequestType};
use stellar_utils::random_duration;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, error};

/// Errors that can occur when parsing a command.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("invalid input format, expected <from> <to> <requestType>")]
    InvalidFormat,
    #[error("invalid 'from' node ID: {0}")]
    InvalidFrom(String),
    #[error("invalid 'to' node ID: {0}")]
    InvalidTo(String),
    #[error("invalid request type {0} (allowed: GetData, UpdateData, DeleteData)")]
    InvalidRequestType(String),
}

/// A parsed line of input.
#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    Exit,
    Request {
        from: NodeId,
        to: NodeId,
        request_type: RequestType,
    },
}

/// Parse a line of input for a network of `nodes` nodes.
pub fn parse(line: &str, nodes: u32) -> Result<Command, Error> {
    let line = line.trim();
    if line == "exit" {
        return Ok(Command::Exit);
    }

    let parts: Vec<&str> = line.split_whitespace().collect();
    let [from, to, request_type] = parts[..] else {
        return Err(Error::InvalidFormat);
    };
    let from = parse_id(from, nodes).ok_or_else(|| Error::InvalidFrom(from.to_string()))?;
    let to = parse_id(to, nodes).ok_or_else(|| Error::InvalidTo(to.to_string()))?;
    let request_type = RequestType::parse_known(request_type)
        .ok_or_else(|| Error::InvalidRequestType(request_type.to_string()))?;
    Ok(Command::Request {
        from,
        to,
        request_type,
    })
}

fn parse_id(value: &str, nodes: u32) -> Option<NodeId> {
    value.parse::<NodeId>().ok().filter(|id| *id < nodes)
}

/// Send a request for every valid line of `input` until `exit` or end of input.
///
/// Invalid lines are reported and skipped. Returns the number of requests sent.
pub async fn read<I, R>(input: I, nodes: &[Node], rng: &mut R) -> usize
where
    I: AsyncBufRead + Unpin,
    R: Rng,
{
    let mut lines = input.lines();
    let mut sent = 0;
    loop {
        display::prompt();
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(err) => {
                error!(?err, "failed to read input");
                break;
            }
        };

        let (from, to, request_type) = match parse(&line, nodes.len() as u32) {
            Ok(Command::Exit) => break,
            Ok(Command::Request {
                from,
                to,
                request_type,
            }) => (from, to, request_type),
            Err(err) => {
                display::invalid(&err);
                continue;
            }
        };

        // Ids are in range once parsed
        let mut node = nodes[from as usize].clone();
        let request_id = rng.gen();
        let hint = random_duration(rng, traffic::HINT_MIN, traffic::HINT_MAX);
        if let Err(err) = node
            .request(request_id, to, request_type, traffic::payload(from), hint)
            .await
        {
            error!(?err, from, to, "failed to send request");
            break;
        }
        debug!(request_id, from, to, "sent request");
        sent += 1;
    }
    sent
}
