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

//! # Trader - Context (C7)
//!
//! [`context::Context`] is the orchestration core: it binds one [`vantage_strategies::Strategy`]
//! to a [`vantage_data::Storage`], a [`vantage_integration::Exchange`] (through the
//! [`vantage_integration::DynExchange`] object-safe view) and the shared
//! [`vantage_risk::ContextScheduler`] worker thread. It implements
//! [`vantage_integration::EventTarget`] (the inbound side, called from any adapter thread — every
//! method only locks and enqueues) and hands the strategy a `&mut dyn
//! vantage_strategies::ContextHandle` (the outbound side) during each dispatch.

pub mod context;

pub use context::Context;
