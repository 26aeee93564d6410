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

//! # Analytics - Position aggregation (C4's `load_positions` read model)
//!
//! [`PositionBook`] folds a [`vantage_data::Storage`]'s fill history into the
//! [`vantage_markets::Position`] shapes an [`vantage_markets::Account`] is queried through, so
//! callers get `overall_position`/`hedge_position`/`position_by_id` over a position set
//! reconstructed purely from stored fills. P&L and risk analytics beyond this aggregation are
//! out of scope.

use vantage_data::Storage;
use vantage_markets::{Position, Side};

/// A snapshot of positions reconstructed from a [`Storage`]'s fill history, filtered by label
/// prefix. Implements [`vantage_markets::AccountPositions`] so the usual overall/hedge/by-id
/// views apply to it exactly as they would to a live account snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PositionBook {
    positions: Vec<Position>,
}

impl PositionBook {
    /// Folds every fill in `storage` whose label starts with `filter` into a position set.
    pub fn load(storage: &Storage, filter: &str) -> Self {
        let positions = storage
            .load_positions(filter)
            .into_iter()
            .map(|summary| Position {
                id: summary.pos_id,
                side: summary.side,
                amount: summary.amount,
                open_price: summary.open_price,
            })
            .collect();
        Self { positions }
    }

    /// Total realized fees across every position folded into this book, taken directly from
    /// the underlying [`vantage_data::storage::PositionSummary`] rows.
    pub fn realized_fees(storage: &Storage, filter: &str) -> rust_decimal::Decimal {
        storage
            .load_positions(filter)
            .iter()
            .fold(rust_decimal::Decimal::ZERO, |acc, p| acc + p.realized_fees)
    }

    /// Net exposure, signed by side: positive for a net long book, negative for net short.
    pub fn net_exposure(&self) -> rust_decimal::Decimal {
        self.positions.iter().fold(rust_decimal::Decimal::ZERO, |acc, p| {
            acc + match p.side {
                Side::Buy => p.amount,
                Side::Sell => -p.amount,
            }
        })
    }
}

impl vantage_markets::AccountPositions for PositionBook {
    fn positions(&self) -> &[Position] {
        &self.positions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;
    use rust_decimal_macros::dec;
    use vantage_execution::{Fill, InstrumentSnapshot};
    use vantage_markets::{AccountPositions, InstrumentKind};

    fn snapshot() -> InstrumentSnapshot {
        InstrumentSnapshot {
            kind: InstrumentKind::Spot,
            multiplier: dec!(1),
            instrument_id: "PETR4".into(),
            price_unit: "BRL".into(),
        }
    }

    fn fill(time_secs: i64, pos_id: i64, side: Side, amount: rust_decimal::Decimal, price: rust_decimal::Decimal) -> Fill {
        Fill {
            id: format!("f{time_secs}"),
            pos_id,
            instrument: snapshot(),
            side,
            amount,
            price,
            fees: dec!(0.5),
            time: DateTime::from_timestamp(time_secs, 0).unwrap(),
            label: "strat".into(),
        }
    }

    #[test]
    fn loads_an_open_position_and_reports_its_overall_view() {
        let storage = Storage::new(b"x".to_vec());
        storage.put_fill(&fill(1, 7, Side::Buy, dec!(10), dec!(100)));

        let book = PositionBook::load(&storage, "strat");
        assert_eq!(book.positions().len(), 1);
        assert_eq!(book.net_exposure(), dec!(10));

        let overall = book.overall_position();
        assert_eq!(overall.position.amount, dec!(10));
        assert_eq!(overall.position.open_price, dec!(100));
    }

    #[test]
    fn a_fully_closed_position_does_not_appear_in_the_book() {
        let storage = Storage::new(b"x".to_vec());
        storage.put_fill(&fill(1, 7, Side::Buy, dec!(10), dec!(100)));
        storage.put_fill(&fill(2, 7, Side::Sell, dec!(10), dec!(110)));

        let book = PositionBook::load(&storage, "strat");
        assert!(book.positions().is_empty());
        assert!(book.net_exposure().is_zero());
    }

    #[test]
    fn realized_fees_sum_across_every_folded_position() {
        let storage = Storage::new(b"x".to_vec());
        storage.put_fill(&fill(1, 7, Side::Buy, dec!(10), dec!(100)));
        storage.put_fill(&fill(2, 8, Side::Sell, dec!(5), dec!(90)));

        assert_eq!(PositionBook::realized_fees(&storage, "strat"), dec!(1.0));
    }

    #[test]
    fn label_filter_excludes_fills_from_other_strategies() {
        let storage = Storage::new(b"x".to_vec());
        storage.put_fill(&fill(1, 7, Side::Buy, dec!(10), dec!(100)));
        let mut other = fill(2, 9, Side::Buy, dec!(3), dec!(50));
        other.label = "other".into();
        storage.put_fill(&other);

        let book = PositionBook::load(&storage, "strat");
        assert_eq!(book.positions().len(), 1);
        assert_eq!(book.position_by_id(7).unwrap().amount, dec!(10));
    }
}
