use crate::NodeId;
use prometheus_client::{
    encoding::EncodeLabelSet,
    metrics::{counter::Counter, family::Family},
    registry::Registry,
};

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct Route {
    pub origin: String,
    pub recipient: String,
}

impl Route {
    pub fn new(origin: NodeId, recipient: NodeId) -> Self {
        Self {
            origin: origin.to_string(),
            recipient: recipient.to_string(),
        }
    }
}

/// Counters tracking the fate of routed messages.
#[derive(Clone, Default)]
pub struct Metrics {
    pub sent: Family<Route, Counter>,
    pub delivered: Family<Route, Counter>,
    pub dropped: Family<Route, Counter>,
    pub unreachable: Family<Route, Counter>,
}

impl Metrics {
    /// Create the counters and register them with `registry`.
    pub fn init(registry: &mut Registry) -> Self {
        let metrics = Self::default();
        registry.register(
            "messages_sent",
            "messages placed on a link",
            metrics.sent.clone(),
        );
        registry.register(
            "messages_delivered",
            "messages handed to the recipient",
            metrics.delivered.clone(),
        );
        registry.register(
            "messages_dropped",
            "messages lost on a link",
            metrics.dropped.clone(),
        );
        registry.register(
            "messages_unreachable",
            "messages with no link to their recipient",
            metrics.unreachable.clone(),
        );
        metrics
    }
}
