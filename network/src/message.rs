//! Requests exchanged between nodes.

use std::{convert::Infallible, fmt, str::FromStr, time::Duration};
use tokio::time::Instant;

/// Identifier of a node (its index in the simulated node set).
pub type NodeId = u32;

/// Kind of operation a [Message] asks its recipient to perform.
///
/// Names that do not match a known kind are preserved in [RequestType::Unknown] so they can
/// be routed and reported by the recipient rather than rejected at the sender.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum RequestType {
    GetData,
    UpdateData,
    DeleteData,
    Unknown(String),
}

impl RequestType {
    /// All request kinds a node knows how to handle.
    pub const KNOWN: [RequestType; 3] = [
        RequestType::GetData,
        RequestType::UpdateData,
        RequestType::DeleteData,
    ];

    /// Parse a request name, returning `None` if it is not a known kind.
    pub fn parse_known(name: &str) -> Option<Self> {
        match Self::from(name) {
            Self::Unknown(_) => None,
            known => Some(known),
        }
    }

    /// Returns whether this is one of [RequestType::KNOWN].
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown(_))
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::GetData => "GetData",
            Self::UpdateData => "UpdateData",
            Self::DeleteData => "DeleteData",
            Self::Unknown(name) => name,
        }
    }
}

impl From<&str> for RequestType {
    fn from(name: &str) -> Self {
        match name {
            "GetData" => Self::GetData,
            "UpdateData" => Self::UpdateData,
            "DeleteData" => Self::DeleteData,
            other => Self::Unknown(other.to_string()),
        }
    }
}

impl FromStr for RequestType {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}

impl fmt::Display for RequestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request in transit between two nodes.
///
/// Messages are never modified once created. A message is consumed by the recipient's
/// handler or dropped while in transit (it is cloned if several links match its route).
#[derive(Clone, Debug)]
pub struct Message {
    /// Identifier chosen by the producer (uniqueness is not enforced).
    pub request_id: u64,

    /// The operation requested.
    pub request_type: RequestType,

    /// The node that originated the message.
    pub from: NodeId,

    /// The node the message is addressed to.
    pub to: NodeId,

    /// Opaque description of the request.
    pub payload: String,

    /// When the message was created.
    pub sent_at: Instant,

    /// Latency the producer expects for this request.
    ///
    /// This is advisory only: transit delay is always taken from the link the message
    /// travels over.
    pub latency_hint: Duration,
}

impl Message {
    /// Create a new message stamped with the current time.
    pub fn new(
        request_id: u64,
        request_type: RequestType,
        from: NodeId,
        to: NodeId,
        payload: impl Into<String>,
        latency_hint: Duration,
    ) -> Self {
        Self {
            request_id,
            request_type,
            from,
            to,
            payload: payload.into(),
            sent_at: Instant::now(),
            latency_hint,
        }
    }
}
