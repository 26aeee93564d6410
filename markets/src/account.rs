//! Account abstractions: the venue-side asset bucket an order is placed against.

use crate::position::{HedgePosition, OverallPosition, Position, PositionId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Weak};

/// Account metadata and balances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountData {
    pub id: String,
    pub label: String,
    pub currency: String,
    pub equity: rust_decimal::Decimal,
    pub balance: rust_decimal::Decimal,
    pub blocked: rust_decimal::Decimal,
    pub leverage: rust_decimal::Decimal,
}

/// Shared handle to an [`AccountData`] record, interned the same way [`Instrument`] is
/// (see [`crate::instrument::InstrumentRegistry`]). Equality is by handle identity.
///
/// [`Instrument`]: crate::instrument::Instrument
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account(Arc<AccountData>);

impl Account {
    pub fn new(data: AccountData) -> Self {
        Self(Arc::new(data))
    }

    pub fn data(&self) -> &AccountData {
        &self.0
    }

    pub fn downgrade(&self) -> Weak<AccountData> {
        Arc::downgrade(&self.0)
    }
}

impl PartialEq for Account {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}
impl Eq for Account {}

impl std::hash::Hash for Account {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        (Arc::as_ptr(&self.0) as usize).hash(state)
    }
}

impl std::ops::Deref for Account {
    type Target = AccountData;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// A snapshot of an account's positions on one instrument, queryable in the three shapes
/// the data model names: per-position list, netted overall, and per-side hedge pair.
pub trait AccountPositions {
    fn positions(&self) -> &[Position];

    fn overall_position(&self) -> OverallPosition {
        let mut amount = rust_decimal::Decimal::ZERO;
        let mut notional = rust_decimal::Decimal::ZERO;
        for p in self.positions() {
            amount += p.amount;
            notional += p.amount * p.open_price;
        }
        let open_price = if amount.is_zero() {
            rust_decimal::Decimal::ZERO
        } else {
            notional / amount
        };
        OverallPosition {
            position: Position {
                id: crate::position::POSITION_OVERALL,
                side: if amount.is_sign_negative() {
                    crate::side::Side::Sell
                } else {
                    crate::side::Side::Buy
                },
                amount,
                open_price,
            },
            locked_in_pnl: rust_decimal::Decimal::ZERO,
        }
    }

    fn hedge_position(&self) -> HedgePosition {
        let buy = self
            .positions()
            .iter()
            .find(|p| p.side == crate::side::Side::Buy)
            .copied()
            .unwrap_or(Position::flat(crate::position::POSITION_BUY));
        let sell = self
            .positions()
            .iter()
            .find(|p| p.side == crate::side::Side::Sell)
            .copied()
            .unwrap_or(Position::flat(crate::position::POSITION_SELL));
        HedgePosition { buy, sell }
    }

    fn position_by_id(&self, id: PositionId) -> Option<Position> {
        self.positions().iter().find(|p| p.id == id).copied()
    }
}

/// Lazily-creating, weakly-referencing registry of [`Account`] handles, mirroring
/// [`crate::instrument::InstrumentRegistry`].
#[derive(Debug, Default)]
pub struct AccountRegistry {
    entries: HashMap<String, Weak<AccountData>>,
}

impl AccountRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<Account> {
        self.entries.get(id).and_then(Weak::upgrade).map(Account)
    }

    pub fn get_or_create(&mut self, id: &str, make: impl FnOnce() -> AccountData) -> Account {
        if let Some(existing) = self.get(id) {
            return existing;
        }
        let data = Arc::new(make());
        self.entries.insert(id.to_string(), Arc::downgrade(&data));
        Account(data)
    }

    pub fn gc(&mut self) {
        self.entries.retain(|_, weak| weak.strong_count() > 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::side::Side;
    use rust_decimal_macros::dec;

    struct Snap(Vec<Position>);
    impl AccountPositions for Snap {
        fn positions(&self) -> &[Position] {
            &self.0
        }
    }

    #[test]
    fn overall_position_nets_both_sides() {
        let snap = Snap(vec![
            Position {
                id: 1,
                side: Side::Buy,
                amount: dec!(2),
                open_price: dec!(10),
            },
            Position {
                id: 2,
                side: Side::Sell,
                amount: dec!(-1),
                open_price: dec!(12),
            },
        ]);
        let overall = snap.overall_position();
        assert_eq!(overall.position.amount, dec!(1));
        assert_eq!(overall.position.id, crate::position::POSITION_OVERALL);
    }

    #[test]
    fn hedge_position_defaults_flat_legs() {
        let snap = Snap(vec![]);
        let hedge = snap.hedge_position();
        assert!(hedge.buy.amount.is_zero());
        assert!(hedge.sell.amount.is_zero());
    }
}
