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
#![allow(clippy::type_complexity, clippy::too_many_arguments)]

//! # Integration - Exchange Mediator & Message Broker
//!
//! The fan-in/fan-out layer between exchange adapters and strategy Contexts:
//!
//! - [`exchange::Exchange`]: subscription multiplexing, snapshot caching, pending-update
//!   coalescing, order routing and restart replay, all behind one mutex per exchange.
//! - [`adapter::ExchangeAdapter`]: the outbound interface a concrete venue adapter (or the
//!   back-test simulator) implements; no adapter lives in this crate.
//! - [`target::EventTarget`]: the inbound interface the mediator dispatches through — the
//!   Context is the only real implementor, in `vantage-trader`.
//! - [`mq::MessageBroker`]: topic pub/sub and direct-mailbox messaging between strategies.

/// The outbound interface a concrete exchange adapter implements.
pub mod adapter;

/// The Exchange mediator: subscription multiplexing, caching, order routing, restart.
pub mod exchange;

/// Topic pub/sub and direct-mailbox messaging between strategies.
pub mod mq;

/// Subscription kind and delivery policy.
pub mod subscription;

/// The inbound event-dispatch interface and its pointer-identity handle.
pub mod target;

pub use adapter::ExchangeAdapter;
pub use exchange::{DynExchange, Exchange};
pub use mq::{MessageBroker, MqListener};
pub use subscription::{Policy, SubscriptionKind};
pub use target::{EventTarget, TargetHandle};
