//! The inbound interface the Exchange mediator dispatches events through, and a
//! pointer-identity handle for using targets as map keys.

use std::fmt;
use std::sync::Arc;
use vantage_execution::{Fill, Order, Report};
use vantage_markets::{Account, Instrument, OrderBook, Ticker};

/// Implemented by whatever owns a strategy's event queue (the Context, in the full
/// runtime). Every method must be non-blocking — lock-then-enqueue only — since the
/// Exchange mediator may call these while holding its own subscription-table mutex.
pub trait EventTarget: Send + Sync {
    fn on_instrument_updated(&self, instrument: &Instrument);
    fn on_account_updated(&self, account: &Account);
    fn on_ticker(&self, instrument: &Instrument, ticker: &Ticker);
    fn on_orderbook(&self, instrument: &Instrument, book: &OrderBook);
    fn on_order_state(&self, order: &Order, report: &Report);
    fn on_order_fill(&self, order: &Order, fill: &Fill);
}

/// A shared [`EventTarget`] handle, equal and hashed by pointer identity — the same
/// convention [`vantage_markets::Instrument`]/[`vantage_markets::Account`] use, so two
/// lookups of the same target always compare equal regardless of how many `Arc` clones
/// exist.
#[derive(Clone)]
pub struct TargetHandle(pub Arc<dyn EventTarget>);

impl TargetHandle {
    pub fn new(target: Arc<dyn EventTarget>) -> Self {
        Self(target)
    }
}

impl PartialEq for TargetHandle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}
impl Eq for TargetHandle {}

impl std::hash::Hash for TargetHandle {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        (Arc::as_ptr(&self.0) as *const () as usize).hash(state)
    }
}

impl fmt::Debug for TargetHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TargetHandle({:p})", Arc::as_ptr(&self.0))
    }
}

impl std::ops::Deref for TargetHandle {
    type Target = dyn EventTarget;
    fn deref(&self) -> &Self::Target {
        &*self.0
    }
}
