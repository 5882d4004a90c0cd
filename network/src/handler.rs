//! Classify requests received by a node.

use crate::{Message, NodeId, Observation, Outcome, RequestType};
use tracing::{debug, warn};

/// Determine the outcome of `message` arriving at a node.
pub fn classify(message: &Message) -> Outcome {
    match message.request_type {
        RequestType::GetData | RequestType::UpdateData | RequestType::DeleteData => {
            Outcome::Received
        }
        RequestType::Unknown(_) => Outcome::UnknownRequestType,
    }
}

/// Handle `message` at `node`, returning what should be reported.
pub fn handle(node: NodeId, message: &Message) -> Observation {
    let outcome = classify(message);
    let observation = Observation::handled(node, message, outcome);
    match outcome {
        Outcome::UnknownRequestType => warn!(
            node,
            origin = message.from,
            request_id = message.request_id,
            request_type = %message.request_type,
            "unknown request type",
        ),
        _ => debug!(
            node,
            origin = message.from,
            request_id = message.request_id,
            request_type = %message.request_type,
            elapsed = ?observation.elapsed,
            hint = ?message.latency_hint,
            "received request",
        ),
    }
    observation
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn message(request_type: RequestType) -> Message {
        Message::new(
            9,
            request_type,
            2,
            1,
            "Request from Node 2!",
            Duration::from_millis(20),
        )
    }

    #[test]
    fn test_known_types_received() {
        for request_type in RequestType::KNOWN {
            let observation = handle(1, &message(request_type.clone()));
            assert_eq!(observation.outcome, Outcome::Received);
            assert_eq!(observation.node, 1);
            assert_eq!(observation.peer, 2);
            assert_eq!(observation.request_id, 9);
            assert_eq!(observation.request_type, request_type);
        }
    }

    #[test]
    fn test_unknown_type_reported() {
        let unknown = RequestType::Unknown("InvalidRequest".to_string());
        let observation = handle(1, &message(unknown.clone()));
        assert_eq!(observation.outcome, Outcome::UnknownRequestType);
        assert_eq!(observation.node, 1);
        assert_eq!(observation.peer, 2);
        assert_eq!(observation.request_type, unknown);
    }

    #[test]
    fn test_classify_ignores_route() {
        let mut message = message(RequestType::DeleteData);
        message.from = 7;
        message.to = 7;
        assert_eq!(classify(&message), Outcome::Received);
        assert!(!classify(&message).is_routing());
    }
}
