//! Reasons attached to a [`crate::state::Report`] or surfaced as a
//! [`crate::error::RuntimeError::OrderRejected`].

/// Closed set of reasons an order can be discarded, rejected, or otherwise fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum Reason {
    #[default]
    NoReason,
    /// The order being replaced was not found, or is already done.
    NotFound,
    /// Discarded because the resulting position would exceed a configured limit.
    PositionLimit,
    /// Discarded because the requested leverage exceeds the account's maximum.
    MaxLeverage,
    /// Rejected during an `amend=false` replace because filled exceeded
    /// `replace_filled_constrain`.
    ReplaceUnprocessedFill,
    /// Discarded because of invalid parameters.
    InvalidParams,
    /// Discarded because the order handle used in the call was the wrong kind.
    IncompatibleOrder,
    /// Discarded because of invalid use of the `amend` replace path.
    InvalidAmend,
    /// Unsupported by the exchange adapter.
    Unsupported,
    NoFunds,
    /// A post-only order would have crossed the book immediately.
    Crossing,
    ExchangeError,
    InternalError,
    /// Trading halted due to low liquidity.
    LowLiquidity,
    ExchangeOverload,
    TooSmall,
}
