#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    unused_extern_crates,
    clippy::unused_self,
    clippy::useless_let_if_seq,
    missing_debug_implementations,
    rust_2018_idioms
)]
#![allow(clippy::type_complexity, clippy::too_many_arguments)]

//! # Risk - Scheduling primitives
//!
//! Despite the crate name (kept from the runtime's original component split), this crate
//! has nothing to do with risk management: it owns the runtime's three scheduling
//! components —
//!
//! - [`priority_queue`]: a handle-tracking binary heap (C1), used by both of the below.
//! - [`scheduler`]: the per-Context event demultiplexer (C2) — immediate, collapsing, and
//!   timed queues feeding a single `wakeup` call.
//! - [`context_scheduler`]: the global wall-clock scheduler (C3) that owns the runtime's one
//!   worker thread and dispatches wakeups to registered Contexts.

pub mod context_scheduler;
pub mod priority_queue;
pub mod scheduler;

pub use context_scheduler::{ContextScheduler, Registration};
pub use priority_queue::{Handle, Hint, PriorityQueue};
pub use scheduler::{Job, Scheduler};
