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

//! # Strategies - Strategy Trait & Context Handle
//!
//! The seam between a Context and the user code it drives: the [`strategy::Strategy`] trait a
//! strategy implements, the [`context::ContextHandle`] object-safe interface a Context exposes
//! to it, and the [`schema`] tree used to describe a strategy's configurable parameters to a
//! host UI.
//!
//! Nothing in this crate runs anything — the Context implementation (`vantage-trader`) is the
//! only concrete [`context::ContextHandle`].

pub mod context;
pub mod schema;
pub mod strategy;

pub use context::{ContextHandle, TimerId};
pub use schema::ConfigSchema;
pub use strategy::{Configuration, SignalNr, Strategy, SIGNAL_CONFIGURATION_CHANGED};
