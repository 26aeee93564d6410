//! Fills: the durable record of an order execution.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use vantage_markets::{position::PositionId, InstrumentKind, Side};

/// A frozen snapshot of the instrument attributes needed to reconstruct positions from fills
/// alone, without the live [`vantage_markets::Instrument`] handle being loaded. Fills are
/// durable and may be read back long after the instrument that produced them has been dropped
/// from the registry, so this does not hold an `Instrument` handle.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct InstrumentSnapshot {
    pub kind: InstrumentKind,
    pub multiplier: Decimal,
    pub instrument_id: String,
    /// The currency/unit the fill's price is denominated in.
    pub price_unit: String,
}

/// A single exchange-reported execution.
///
/// Identity is by the exchange-assigned `id` alone: two fills with the same `id` are the same
/// fill even if every other field differs (a reconnect can resend a fill with a marginally
/// different timestamp). Storage's duplicate check relies on this.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Fill {
    pub time: DateTime<Utc>,
    pub id: String,
    pub label: String,
    pub pos_id: PositionId,
    pub instrument: InstrumentSnapshot,
    pub side: Side,
    pub price: Decimal,
    pub amount: Decimal,
    pub fees: Decimal,
}

impl PartialEq for Fill {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
impl Eq for Fill {}

pub type Fills = Vec<Fill>;
