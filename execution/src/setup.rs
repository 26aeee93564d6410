//! Order setup: the closed tagged union of order variants a strategy can submit, plus the
//! options attached to any of them.

use rust_decimal::Decimal;
use vantage_markets::{position::PositionId, Account, Side};

/// How a new order interacts with an account's existing position on the instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum Behavior {
    /// Reduce the existing position before opening one on the other side; never hedges.
    #[default]
    Standard,
    /// Open a position on the given side independently of the opposite side (both may be open).
    Hedge,
    /// Reduce the existing position, refusing to flip through zero to the other side.
    Reduce,
}

/// Per-order options independent of the setup variant.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Options {
    pub behavior: Behavior,
    /// Leverage hint; `None` means "use the account's shared leverage".
    pub leverage: Option<Decimal>,
    /// Interpret the setup's amount as a volume (money to spend/receive) rather than a size.
    pub amount_is_volume: bool,
    /// Maximum already-filled amount tolerated by a cancel-and-place replace before the new
    /// order is rejected. `None` means unconstrained.
    pub replace_filled_constrain: Option<Decimal>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            behavior: Behavior::default(),
            leverage: None,
            amount_is_volume: false,
            replace_filled_constrain: None,
        }
    }
}

/// The closed set of order shapes a strategy can submit.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Setup {
    Undefined,
    Market {
        side: Side,
        amount: Decimal,
        options: Options,
    },
    Limit {
        side: Side,
        amount: Decimal,
        limit_price: Decimal,
        options: Options,
    },
    LimitPostOnly {
        side: Side,
        amount: Decimal,
        limit_price: Decimal,
        options: Options,
    },
    ImmediateOrCancel {
        side: Side,
        amount: Decimal,
        limit_price: Decimal,
        options: Options,
    },
    Stop {
        side: Side,
        amount: Decimal,
        stop_price: Decimal,
        options: Options,
    },
    StopLimit {
        side: Side,
        amount: Decimal,
        stop_price: Decimal,
        limit_price: Decimal,
        options: Options,
    },
    TrailingStop {
        side: Side,
        amount: Decimal,
        stop_distance: Decimal,
        options: Options,
    },
    /// Target and stop-loss, one-cancels-other.
    TpSl {
        side: Side,
        amount: Decimal,
        target_price: Decimal,
        stoploss_price: Decimal,
        options: Options,
    },
    ClosePosition { pos_id: PositionId },
    /// Move money between accounts; generates no fill, only a terminal order state.
    Transfer { target: Account, amount: Decimal },
}

impl Setup {
    /// Side implied by the setup, if it has one (`ClosePosition`/`Transfer` don't).
    pub fn get_side(&self) -> Option<Side> {
        match self {
            Setup::Undefined | Setup::ClosePosition { .. } | Setup::Transfer { .. } => None,
            Setup::Market { side, .. }
            | Setup::Limit { side, .. }
            | Setup::LimitPostOnly { side, .. }
            | Setup::ImmediateOrCancel { side, .. }
            | Setup::Stop { side, .. }
            | Setup::StopLimit { side, .. }
            | Setup::TrailingStop { side, .. }
            | Setup::TpSl { side, .. } => Some(*side),
        }
    }

    /// Total requested amount, or zero for setups with no amount field.
    pub fn get_total(&self) -> Decimal {
        match self {
            Setup::Undefined | Setup::ClosePosition { .. } => Decimal::ZERO,
            Setup::Market { amount, .. }
            | Setup::Limit { amount, .. }
            | Setup::LimitPostOnly { amount, .. }
            | Setup::ImmediateOrCancel { amount, .. }
            | Setup::Stop { amount, .. }
            | Setup::StopLimit { amount, .. }
            | Setup::TrailingStop { amount, .. }
            | Setup::TpSl { amount, .. } => *amount,
            Setup::Transfer { amount, .. } => *amount,
        }
    }

    /// Options attached to the setup, if the variant carries any.
    pub fn get_options(&self) -> Option<&Options> {
        match self {
            Setup::Undefined | Setup::ClosePosition { .. } | Setup::Transfer { .. } => None,
            Setup::Market { options, .. }
            | Setup::Limit { options, .. }
            | Setup::LimitPostOnly { options, .. }
            | Setup::ImmediateOrCancel { options, .. }
            | Setup::Stop { options, .. }
            | Setup::StopLimit { options, .. }
            | Setup::TrailingStop { options, .. }
            | Setup::TpSl { options, .. } => Some(options),
        }
    }

    /// Discriminant index used by the `amend=true` replace path to detect a variant change.
    pub fn variant_index(&self) -> u8 {
        match self {
            Setup::Undefined => 0,
            Setup::Market { .. } => 1,
            Setup::Limit { .. } => 2,
            Setup::LimitPostOnly { .. } => 3,
            Setup::ImmediateOrCancel { .. } => 4,
            Setup::Stop { .. } => 5,
            Setup::StopLimit { .. } => 6,
            Setup::TrailingStop { .. } => 7,
            Setup::TpSl { .. } => 8,
            Setup::ClosePosition { .. } => 9,
            Setup::Transfer { .. } => 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn limit_exposes_side_and_total() {
        let setup = Setup::Limit {
            side: Side::Buy,
            amount: dec!(2),
            limit_price: dec!(100),
            options: Options::default(),
        };
        assert_eq!(setup.get_side(), Some(Side::Buy));
        assert_eq!(setup.get_total(), dec!(2));
    }

    #[test]
    fn close_position_has_no_side_or_options() {
        let setup = Setup::ClosePosition {
            pos_id: vantage_markets::position::POSITION_OVERALL,
        };
        assert_eq!(setup.get_side(), None);
        assert!(setup.get_options().is_none());
        assert_eq!(setup.get_total(), Decimal::ZERO);
    }

    #[test]
    fn amend_refuses_on_variant_change() {
        let a = Setup::Limit {
            side: Side::Buy,
            amount: dec!(1),
            limit_price: dec!(10),
            options: Options::default(),
        };
        let b = Setup::Market {
            side: Side::Buy,
            amount: dec!(1),
            options: Options::default(),
        };
        assert_ne!(a.variant_index(), b.variant_index());
    }
}
