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

//! # Data - Transactional Storage Engine
//!
//! The Storage engine (C4): a single key-value store shared by variables, open orders and
//! fills, namespaced by a one-byte tag so the three never collide. Reads and writes nest
//! inside `begin_transaction`/`commit`/`rollback` — only the outermost commit in a nest
//! actually applies staged writes, and a rollback anywhere in the nest discards the whole
//! thing regardless of how many commits follow.
//!
//! Fill and open-order bytes are the wire formats owned by `vantage-execution`
//! ([`vantage_execution::serialize`]) — this crate persists them, it does not define them.

/// Storage failures.
pub mod error;

/// The transactional key-value store itself.
pub mod storage;

pub use error::StorageError;
pub use storage::{FillsLimit, PositionSummary, Storage};
