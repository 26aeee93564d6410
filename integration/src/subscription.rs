//! Subscription keys and delivery policy for the Exchange mediator.

use serde::{Deserialize, Serialize};

/// The two market-data event kinds a target can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubscriptionKind {
    Ticker,
    Orderbook,
}

/// Whether a subscription survives delivery. `OneShot` entries exist for point queries that
/// still want to flow through the ordinary event channel rather than a separate request/reply
/// path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Policy {
    Unlimited,
    OneShot,
}
