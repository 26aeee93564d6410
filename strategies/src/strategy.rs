//! The [`Strategy`] trait: the seven callbacks a Context dispatches into, plus the
//! configuration payload handed to `on_init`.

use crate::context::{ContextHandle, TimerId};
use crate::schema::ConfigSchema;
use vantage_core::StrategyConfig;
use vantage_execution::{Fill, Order, Report};
use vantage_markets::{Account, Instrument, OrderBook, Ticker};

/// A signal number delivered through [`Strategy::on_signal`]. Strategy-defined values start
/// above [`SIGNAL_CONFIGURATION_CHANGED`].
pub type SignalNr = u32;

/// Reserved signal emitted when this strategy's persisted configuration was changed out of
/// band (e.g. an operator edited `values` while the strategy was running).
pub const SIGNAL_CONFIGURATION_CHANGED: SignalNr = 0;

/// The validated payload handed to [`Strategy::on_init`]: the accounts/instruments this
/// strategy was bound to and its key-value config bag.
#[derive(Debug, Clone)]
pub struct Configuration {
    pub accounts: Vec<Account>,
    pub instruments: Vec<Instrument>,
    pub config: StrategyConfig,
}

/// User code driven by a Context. Every method is called only on the worker thread, one at a
/// time, during a Context's wakeup tick — see `vantage-trader`'s `Context` for the dispatch
/// rules.
///
/// None of these methods return a value the Context acts on; a strategy communicates outward
/// exclusively through the `&mut dyn ContextHandle` it is given, matching the distillation's
/// fire-and-forget callback shape.
pub trait Strategy: Send {
    /// The schema describing this strategy's configurable parameters, used by a host to render
    /// an editing form. Has no bearing on runtime behavior.
    fn get_config_schema(&self) -> ConfigSchema {
        ConfigSchema::default()
    }

    /// Called once, before any other callback, with the bound accounts/instruments/config.
    fn on_init(&mut self, ctx: &mut dyn ContextHandle, config: Configuration);

    /// A ticker update for a subscribed instrument. Market-data updates within a tick are
    /// collapsed to the latest value (§4.7), so this may skip intermediate prices.
    fn on_ticker(&mut self, _ctx: &mut dyn ContextHandle, _instrument: &Instrument, _ticker: &Ticker) {}

    /// An order book update for a subscribed instrument. Subject to the same collapsing as
    /// [`on_ticker`](Self::on_ticker).
    fn on_orderbook(&mut self, _ctx: &mut dyn ContextHandle, _instrument: &Instrument, _book: &OrderBook) {}

    /// A previously set timer has fired.
    fn on_timer(&mut self, _ctx: &mut dyn ContextHandle, _id: TimerId) {}

    /// An order's state changed (rejected, active, canceled, filled, ...).
    fn on_order(&mut self, _ctx: &mut dyn ContextHandle, _order: &Order, _report: &Report) {}

    /// A fill landed against one of this strategy's orders. Duplicate fills (by id) are
    /// dropped by the Context before reaching this callback.
    fn on_fill(&mut self, _ctx: &mut dyn ContextHandle, _order: &Order, _fill: &Fill) {}

    /// An out-of-band signal, e.g. delivered via the message broker or
    /// [`SIGNAL_CONFIGURATION_CHANGED`].
    fn on_signal(&mut self, _ctx: &mut dyn ContextHandle, _signal: SignalNr) {}
}
