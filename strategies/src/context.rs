//! The object-safe interface a Context exposes to the [`crate::strategy::Strategy`] it drives.
//!
//! A strategy never holds a Context directly — every callback receives a
//! `&mut dyn ContextHandle` scoped to that single dispatch, so the Context implementation is
//! free to build it fresh (rather than keep a strategy-visible handle alive across a lock
//! boundary).

use rust_decimal::Decimal;
use vantage_core::Timestamp;
use vantage_execution::{Fills, Order, Setup};
use vantage_integration::SubscriptionKind;
use vantage_markets::{Account, Instrument};

// NOTE: `place`/`bind_order` take no explicit account — a Context is bound to a single
// primary account at construction, matching the account-less `place`/`create` signatures
// this interface is grounded on.

/// Identifies a timer registered via [`ContextHandle::set_timer`], for later cancellation.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct TimerId(pub u64);

/// The outbound API a running strategy drives. Every method is expected to return promptly —
/// none of them block on a network round trip; exchange confirmation arrives later through the
/// strategy's own `on_order`/`on_fill`/`on_ticker`/... callbacks.
pub trait ContextHandle: Send {
    /// Places a new order for `instrument`, under this Context's primary account.
    fn place(&mut self, instrument: &Instrument, setup: Setup) -> Order;

    /// Amends (`amend = true`) or cancel-and-replaces (`amend = false`) an existing order.
    fn replace(&mut self, order: &Order, setup: Setup, amend: bool) -> Order;

    /// Requests cancellation of a resting order.
    fn cancel(&mut self, order: &Order);

    /// Registers a one-shot wakeup at `at`, delivered through `on_timer`.
    fn set_timer(&mut self, at: Timestamp) -> TimerId;

    /// Cancels a pending timer. Returns `false` if it already fired or doesn't exist.
    fn clear_timer(&mut self, id: TimerId) -> bool;

    /// Subscribes to a market data feed for `instrument`.
    fn subscribe(&mut self, kind: SubscriptionKind, instrument: &Instrument);

    /// Reverses a prior [`subscribe`](Self::subscribe).
    fn unsubscribe(&mut self, kind: SubscriptionKind, instrument: &Instrument);

    /// Requests a fresh account snapshot; the result arrives later through `on_account`-style
    /// dispatch once the adapter confirms it.
    fn update_account(&mut self, account: &Account);

    /// Requests a fresh instrument snapshot (tick size, lot size, ...).
    fn update_instrument(&mut self, instrument: &Instrument);

    /// Assigns `equity` as the capital this strategy's view of `account` may risk.
    fn allocate(&mut self, account: &Account, equity: Decimal);

    /// Persists a named byte value across restarts, scoped to this strategy.
    fn set_var(&mut self, name: &str, value: Vec<u8>);

    /// Removes a previously persisted value.
    fn unset_var(&mut self, name: &str);

    /// The wall-clock time of the event currently being dispatched.
    fn now(&self) -> Timestamp;

    /// Returns up to `limit` of this strategy's most recent fills, oldest first.
    fn get_fills(&self, limit: usize) -> Fills;

    /// Produces an [`Order::Associated`] handle for `instrument`, usable before any order has
    /// actually been placed (e.g. to query `is_done`/`state` against a default value).
    fn bind_order(&self, instrument: &Instrument) -> Order;
}
