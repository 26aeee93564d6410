//! Position shapes queried from an [`Account`](crate::account::Account).

use crate::side::Side;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Identifies a position within an account. Non-negative ids identify concrete open
/// positions reported by the venue; the three negative constants are reserved virtual
/// positions synthesized by the account view.
pub type PositionId = i64;

/// Virtual id for the netted overall position across both sides.
pub const POSITION_OVERALL: PositionId = -1;
/// Virtual id for the buy side of a hedge pair.
pub const POSITION_BUY: PositionId = -2;
/// Virtual id for the sell side of a hedge pair.
pub const POSITION_SELL: PositionId = -3;

/// A single position: side, amount, and weighted open price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub id: PositionId,
    pub side: Side,
    pub amount: Decimal,
    pub open_price: Decimal,
}

impl Position {
    pub fn flat(id: PositionId) -> Self {
        Self {
            id,
            side: Side::Buy,
            amount: Decimal::ZERO,
            open_price: Decimal::ZERO,
        }
    }
}

/// The netted overall position on an instrument, plus any profit already locked in by a
/// closed hedge leg.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OverallPosition {
    pub position: Position,
    pub locked_in_pnl: Decimal,
}

/// Both legs of a hedge-capable account's position on an instrument. On accounts that do
/// not support hedging this mirrors the overall position on whichever side is open.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HedgePosition {
    pub buy: Position,
    pub sell: Position,
}
