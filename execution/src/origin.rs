//! Who is responsible for an order's creation.

/// Lets a strategy recognize orders it did not itself place this run — for example ones
/// restored from storage after a restart, or issued by the exchange as a liquidation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum Origin {
    /// No evidence of who created the order.
    #[default]
    Unknown,
    /// Created by this strategy instance, this run.
    Strategy,
    /// Rehydrated from Storage after a restart.
    Restored,
    /// Issued by the exchange as a liquidation.
    Liquidation,
    /// Likely created by manual user intervention.
    Manual,
}
