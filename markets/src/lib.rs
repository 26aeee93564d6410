#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    unused_crate_dependencies,
    unused_extern_crates,
    clippy::unused_self,
    clippy::useless_let_if_seq,
    missing_debug_implementations,
    rust_2018_idioms
)]
#![allow(clippy::type_complexity, clippy::too_many_arguments, type_alias_bounds)]

//! # Markets - Core Trading Abstractions
//!
//! Instrument, Account and Exchange identity types shared by every other crate in the
//! workspace. Instruments and Accounts are interned, weakly-referenced handles (see
//! [`instrument::InstrumentRegistry`] / [`account::AccountRegistry`]) rather than values:
//! this is what lets the rest of the runtime compare them by pointer identity.

use derive_more::Constructor;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Defines exchange abstractions
pub mod exchange;

/// Defines asset abstractions
pub mod asset;

/// Defines instrument abstractions
pub mod instrument;

/// Defines account and position-query abstractions
pub mod account;

/// Defines position shapes (overall / hedge / per-id)
pub mod position;

/// Defines side enum
pub mod side;

/// Ticker and order book snapshots
pub mod market_data;

/// Re-export key traits for convenience
pub use account::{Account, AccountData, AccountPositions, AccountRegistry};
pub use asset::{Asset, AssetType};
pub use exchange::{Exchange, ExchangeId};
pub use instrument::{Instrument, InstrumentData, InstrumentKind, InstrumentRegistry, MarketDataInstrument};
pub use market_data::{OrderBook, Ticker};
pub use position::{HedgePosition, OverallPosition, Position, PositionId};
pub use side::Side;

/// A keyed value utility
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Constructor,
)]
pub struct Keyed<Key, Value> {
    pub key: Key,
    pub value: Value,
}

impl<Key, Value> AsRef<Value> for Keyed<Key, Value> {
    fn as_ref(&self) -> &Value {
        &self.value
    }
}

impl<Key, Value> Display for Keyed<Key, Value>
where
    Key: Display,
    Value: Display,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}, {}", self.key, self.value)
    }
}

/// Instrument Underlying containing a base and quote asset.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize)]
pub struct Underlying<AssetKey> {
    pub base: AssetKey,
    pub quote: AssetKey,
}

impl<AssetKey> Underlying<AssetKey> {
    pub fn new<A>(base: A, quote: A) -> Self
    where
        A: Into<AssetKey>,
    {
        Self {
            base: base.into(),
            quote: quote.into(),
        }
    }
}
