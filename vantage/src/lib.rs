//! # Vantage
//!
//! Single entry point re-exporting every crate in the runtime under one namespace, for users
//! who would rather depend on one crate than nine.
//!
//! ```rust
//! use vantage::markets::ExchangeId;
//! let _exchange = ExchangeId::B3;
//! ```

pub use vantage_analytics as analytics;
pub use vantage_core as core;
pub use vantage_data as data;
pub use vantage_execution as execution;
pub use vantage_integration as integration;
pub use vantage_markets as markets;
pub use vantage_risk as risk;
pub use vantage_strategies as strategies;
pub use vantage_trader as trader;

pub use vantage_core::{RuntimeError, Sequence, Timestamp};
pub use vantage_markets::{ExchangeId, Side};
pub use vantage_trader::Context;

/// Single import covering the surface a strategy implementation needs.
pub mod prelude {
    pub use crate::core::{RuntimeError, Sequence, StrategyConfig, Timestamp};
    pub use crate::execution::{Fill, Order, Reason, Report, Setup, State};
    pub use crate::markets::{Account, ExchangeId, Instrument, OrderBook, Side, Ticker};
    pub use crate::strategies::{
        ConfigSchema, Configuration, ContextHandle, SignalNr, Strategy, TimerId, SIGNAL_CONFIGURATION_CHANGED,
    };
    pub use crate::trader::Context;
}
