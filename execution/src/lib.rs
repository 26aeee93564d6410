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

//! # Execution - Order Data Model
//!
//! The order data model: a closed tagged union of order [`setup::Setup`]s, the
//! [`state::State`] machine that governs every order's lifecycle, and the
//! [`fill::Fill`]/[`serialize`] types that make fills and open-order envelopes durable.
//!
//! This crate owns the *shape* of an order, not its routing. The Exchange mediator
//! (`vantage-integration`) decides which target an order's reports go to; the Context
//! (`vantage-trader`) is the only thing that mutates an [`order::Order`]'s status.

pub mod fill;
pub mod order;
pub mod origin;
pub mod reason;
pub mod serialize;
pub mod setup;
pub mod state;

pub use fill::{Fill, Fills, InstrumentSnapshot};
pub use order::{Order, OrderData, Status};
pub use origin::Origin;
pub use reason::Reason;
pub use serialize::SerializedOrder;
pub use setup::{Behavior, Options, Setup};
pub use state::{is_done, Report, State};
