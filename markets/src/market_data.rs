//! Market data snapshots delivered through the Exchange mediator: [`Ticker`] and
//! [`OrderBook`].

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single top-of-book-plus-trade snapshot for an instrument.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ticker {
    pub ts: DateTime<Utc>,
    pub bid: Decimal,
    pub bid_vol: Decimal,
    pub ask: Decimal,
    pub ask_vol: Decimal,
    pub last: Decimal,
    pub volume: Decimal,
    pub index: Decimal,
}

/// Two-sided order book: bids descending by price, asks ascending by price, each mapping
/// price to resting amount.
///
/// During partial updates the book may transiently cross (`bid.top > ask.top`); this type
/// does not forbid that, it only exposes [`OrderBook::is_crossed`] so callers can trim.
/// Once both sides are populated from a *complete* snapshot the invariant `bid.top <=
/// ask.top` must hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBook {
    pub ts: DateTime<Utc>,
    bids: BTreeMap<Decimal, Decimal>,
    asks: BTreeMap<Decimal, Decimal>,
}

impl OrderBook {
    pub fn new(ts: DateTime<Utc>) -> Self {
        Self {
            ts,
            bids: BTreeMap::new(),
            asks: BTreeMap::new(),
        }
    }

    pub fn set_bid(&mut self, price: Decimal, amount: Decimal) {
        if amount.is_zero() {
            self.bids.remove(&price);
        } else {
            self.bids.insert(price, amount);
        }
    }

    pub fn set_ask(&mut self, price: Decimal, amount: Decimal) {
        if amount.is_zero() {
            self.asks.remove(&price);
        } else {
            self.asks.insert(price, amount);
        }
    }

    /// Highest bid price, if any.
    pub fn best_bid(&self) -> Option<(Decimal, Decimal)> {
        self.bids.iter().next_back().map(|(p, a)| (*p, *a))
    }

    /// Lowest ask price, if any.
    pub fn best_ask(&self) -> Option<(Decimal, Decimal)> {
        self.asks.iter().next().map(|(p, a)| (*p, *a))
    }

    /// Bids highest-first.
    pub fn bids(&self) -> impl Iterator<Item = (Decimal, Decimal)> + '_ {
        self.bids.iter().rev().map(|(p, a)| (*p, *a))
    }

    /// Asks lowest-first.
    pub fn asks(&self) -> impl Iterator<Item = (Decimal, Decimal)> + '_ {
        self.asks.iter().map(|(p, a)| (*p, *a))
    }

    pub fn is_crossed(&self) -> bool {
        match (self.best_bid(), self.best_ask()) {
            (Some((bid, _)), Some((ask, _))) => bid > ask,
            _ => false,
        }
    }

    /// Removes book levels that cross the opposite side's top, restoring `bid.top <=
    /// ask.top`. Called by consumers that have received a partial update mid-burst.
    pub fn trim_crossed(&mut self) {
        if let (Some((bid, _)), Some((ask, _))) = (self.best_bid(), self.best_ask()) {
            if bid > ask {
                self.bids.retain(|p, _| *p <= ask);
                self.asks.retain(|p, _| *p >= bid);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn book() -> OrderBook {
        OrderBook::new(Utc::now())
    }

    #[test]
    fn bids_iterate_highest_first() {
        let mut b = book();
        b.set_bid(dec!(10), dec!(1));
        b.set_bid(dec!(12), dec!(1));
        b.set_bid(dec!(11), dec!(1));
        let prices: Vec<_> = b.bids().map(|(p, _)| p).collect();
        assert_eq!(prices, vec![dec!(12), dec!(11), dec!(10)]);
    }

    #[test]
    fn asks_iterate_lowest_first() {
        let mut b = book();
        b.set_ask(dec!(12), dec!(1));
        b.set_ask(dec!(10), dec!(1));
        let prices: Vec<_> = b.asks().map(|(p, _)| p).collect();
        assert_eq!(prices, vec![dec!(10), dec!(12)]);
    }

    #[test]
    fn zero_amount_removes_level() {
        let mut b = book();
        b.set_bid(dec!(10), dec!(1));
        b.set_bid(dec!(10), dec!(0));
        assert_eq!(b.best_bid(), None);
    }

    #[test]
    fn detects_and_trims_crossed_book() {
        let mut b = book();
        b.set_bid(dec!(11), dec!(1));
        b.set_ask(dec!(10), dec!(1));
        assert!(b.is_crossed());
        b.trim_crossed();
        assert!(!b.is_crossed());
    }
}
