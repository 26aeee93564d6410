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
//! # Vantage Core
//!
//! Ambient stack shared by the rest of the Vantage runtime: the closed [`error::RuntimeError`]
//! set, `tracing` initializers, the [`Timestamp`]/[`Sequence`] types used to order events
//! across the Context/Exchange/Storage boundary, and the strategy [`config::StrategyConfig`]
//! loaded before a Context starts dispatching to a strategy.
//!
//! This crate has no runtime logic of its own — the orchestration lives in `vantage-trader`
//! (the Context), `vantage-integration` (the Exchange mediator), and `vantage-data` (Storage).

use derive_more::Constructor;
use serde::{Deserialize, Serialize};

/// Wall-clock instant used throughout the runtime: ticker/orderbook/fill timestamps, timer
/// due times, Storage's fill ordering key. All of it is UTC; adapters are responsible for
/// normalizing exchange-local times before they reach a Context.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

pub mod config;
pub mod error;
pub mod logging;
pub mod test_utils;

pub use config::StrategyConfig;
pub use error::RuntimeError;

/// Monotonically increasing sequence number. Used wherever two events land at the same
/// [`Timestamp`] and still need a stable, strictly-ordered tie-break (e.g. assigning client
/// order ids, or ordering same-instant fills within a single Storage write).
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Constructor,
)]
pub struct Sequence(pub u64);

impl Sequence {
    pub fn value(&self) -> u64 {
        self.0
    }

    /// Returns the current value and advances the sequence by one.
    pub fn fetch_add(&mut self) -> Sequence {
        let sequence = *self;
        self.0 += 1;
        sequence
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_fetch_add_returns_pre_increment_value() {
        let mut seq = Sequence(5);
        assert_eq!(seq.fetch_add(), Sequence(5));
        assert_eq!(seq, Sequence(6));
    }
}
