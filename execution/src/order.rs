//! Orders: created by the Exchange mediator, owned by the strategy, mutated only on the
//! strategy thread.

use crate::{reason::Reason, setup::Setup, state::{Report, State}};
use parking_lot::RwLock;
use std::sync::Arc;
use vantage_markets::{Account, Instrument};

/// Mutable, strategy-thread-local part of an order.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Status {
    pub filled: rust_decimal::Decimal,
    pub last_price: rust_decimal::Decimal,
    pub last_report: Report,
}

impl Status {
    fn undefined() -> Self {
        Self {
            filled: rust_decimal::Decimal::ZERO,
            last_price: rust_decimal::Decimal::ZERO,
            last_report: Report {
                new_state: State::Undefined,
                reason: Reason::NoReason,
                message: String::new(),
            },
        }
    }
}

/// The immutable+mutable record behind a real ([`Order::Basic`]) order.
#[derive(Debug)]
pub struct OrderData {
    pub id: String,
    pub setup: Setup,
    pub instrument: Instrument,
    pub account: Account,
    pub origin: crate::origin::Origin,
    pub status: RwLock<Status>,
}

/// An order handle.
///
/// The underlying C++ runtime distinguishes three kinds of handle with RTTI downcasts
/// (`dynamic_cast` to `BasicOrder`, `AssociatedOrder`, or `ErrorOrder`). Here that's a single
/// exhaustive enum matched at the two or three call sites that care (`replace`, `cancel`),
/// rather than a trait object probed at runtime.
#[derive(Debug, Clone)]
pub enum Order {
    /// A real order tracked by the Exchange mediator.
    Basic(Arc<OrderData>),
    /// A `bind_order` sentinel: bound to an instrument/account but not a real order. Usable
    /// once as the target of a `replace`, which degrades to a `place`.
    Associated { instrument: Instrument, account: Account },
    /// The result of an outbound call that failed validation before reaching the Exchange
    /// (e.g. `replace` on an incompatible handle).
    Error { reason: Reason, message: String },
}

impl Order {
    pub fn new_basic(
        id: String,
        setup: Setup,
        instrument: Instrument,
        account: Account,
        origin: crate::origin::Origin,
    ) -> Self {
        Order::Basic(Arc::new(OrderData {
            id,
            setup,
            instrument,
            account,
            origin,
            status: RwLock::new(Status::undefined()),
        }))
    }

    pub fn error(reason: Reason, message: impl Into<String>) -> Self {
        Order::Error {
            reason,
            message: message.into(),
        }
    }

    pub fn id(&self) -> Option<&str> {
        match self {
            Order::Basic(data) => Some(&data.id),
            Order::Associated { .. } | Order::Error { .. } => None,
        }
    }

    pub fn state(&self) -> State {
        match self {
            Order::Basic(data) => data.status.read().last_report.new_state,
            Order::Associated { .. } => State::Associated,
            Order::Error { .. } => State::Discarded,
        }
    }

    pub fn reason(&self) -> Reason {
        match self {
            Order::Basic(data) => data.status.read().last_report.reason,
            Order::Associated { .. } => Reason::NoReason,
            Order::Error { reason, .. } => *reason,
        }
    }

    pub fn is_done(&self) -> bool {
        crate::state::is_done(self.state())
    }

    pub fn filled(&self) -> rust_decimal::Decimal {
        match self {
            Order::Basic(data) => data.status.read().filled,
            _ => rust_decimal::Decimal::ZERO,
        }
    }

    pub fn total(&self) -> rust_decimal::Decimal {
        match self {
            Order::Basic(data) => data.setup.get_total(),
            _ => rust_decimal::Decimal::ZERO,
        }
    }

    pub fn remain(&self) -> rust_decimal::Decimal {
        self.total() - self.filled()
    }

    /// Applies a non-fill state transition report, as delivered by the Exchange mediator.
    pub fn apply_report(&self, report: Report) {
        if let Order::Basic(data) = self {
            let mut status = data.status.write();
            status.last_report = report;
        }
    }

    /// Accumulates a fill's amount/price into the order's running status.
    pub fn apply_fill(&self, price: rust_decimal::Decimal, amount: rust_decimal::Decimal) {
        if let Order::Basic(data) = self {
            let mut status = data.status.write();
            status.filled += amount;
            status.last_price = price;
        }
    }

    /// Checks whether an in-place `amend=true` replace to `new_setup` is allowed: side and
    /// variant must be unchanged, and the already-filled amount must not exceed the new total.
    pub fn validate_amend(&self, new_setup: &Setup) -> Result<(), Reason> {
        let Order::Basic(data) = self else {
            return Err(Reason::IncompatibleOrder);
        };
        if data.setup.get_side() != new_setup.get_side() {
            return Err(Reason::InvalidAmend);
        }
        if data.setup.variant_index() != new_setup.variant_index() {
            return Err(Reason::InvalidAmend);
        }
        if self.filled() > new_setup.get_total() {
            return Err(Reason::InvalidAmend);
        }
        Ok(())
    }

    /// Checks whether a cancel-and-place (`amend=false`) replace may proceed, given the
    /// options attached to the new setup's `replace_filled_constrain`.
    pub fn validate_replace_filled_constrain(&self, new_setup: &Setup) -> Result<(), Reason> {
        let Some(limit) = new_setup
            .get_options()
            .and_then(|o| o.replace_filled_constrain)
        else {
            return Ok(());
        };
        if self.filled() > limit {
            return Err(Reason::ReplaceUnprocessedFill);
        }
        Ok(())
    }

    pub fn as_basic(&self) -> Option<&Arc<OrderData>> {
        match self {
            Order::Basic(data) => Some(data),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::setup::Options;
    use rust_decimal_macros::dec;
    use vantage_markets::{AccountData, InstrumentData, InstrumentKind, Side};

    fn instrument() -> Instrument {
        Instrument::new(InstrumentData {
            id: "PETR4".into(),
            label: "Petrobras PN".into(),
            kind: InstrumentKind::Spot,
            exchange: vantage_markets::ExchangeId::B3,
            tick_size: dec!(0.01),
            lot_size: dec!(100),
            lot_multiplier: dec!(1),
            min_size: dec!(100),
            min_notional: dec!(0),
            quantum_factor: dec!(1),
            tradable: true,
            can_short: true,
        })
    }

    fn account() -> Account {
        Account::new(AccountData {
            id: "ACC1".into(),
            label: "Main".into(),
            currency: "BRL".into(),
            equity: dec!(0),
            balance: dec!(0),
            blocked: dec!(0),
            leverage: dec!(1),
        })
    }

    #[test]
    fn is_done_reflects_state_machine() {
        let order = Order::new_basic(
            "O1".into(),
            Setup::Limit {
                side: Side::Buy,
                amount: dec!(2),
                limit_price: dec!(10),
                options: Options::default(),
            },
            instrument(),
            account(),
            crate::origin::Origin::Strategy,
        );
        assert!(!order.is_done());
        order.apply_report(Report {
            new_state: State::Active,
            reason: Reason::NoReason,
            message: String::new(),
        });
        assert!(!order.is_done());
        order.apply_report(Report {
            new_state: State::Filled,
            reason: Reason::NoReason,
            message: String::new(),
        });
        assert!(order.is_done());
    }

    #[test]
    fn fills_accumulate_into_status() {
        let order = Order::new_basic(
            "O1".into(),
            Setup::Limit {
                side: Side::Buy,
                amount: dec!(2),
                limit_price: dec!(10),
                options: Options::default(),
            },
            instrument(),
            account(),
            crate::origin::Origin::Strategy,
        );
        order.apply_fill(dec!(10), dec!(1));
        order.apply_fill(dec!(11), dec!(1));
        assert_eq!(order.filled(), dec!(2));
        assert_eq!(order.remain(), dec!(0));
    }

    #[test]
    fn associated_order_degrades_state_and_has_no_id() {
        let order = Order::Associated {
            instrument: instrument(),
            account: account(),
        };
        assert_eq!(order.state(), State::Associated);
        assert_eq!(order.id(), None);
    }

    #[test]
    fn error_order_carries_reason() {
        let order = Order::error(Reason::IncompatibleOrder, "wrong handle kind");
        assert_eq!(order.state(), State::Discarded);
        assert_eq!(order.reason(), Reason::IncompatibleOrder);
    }

    #[test]
    fn amend_refuses_side_change() {
        let order = Order::new_basic(
            "O1".into(),
            Setup::Limit {
                side: Side::Buy,
                amount: dec!(2),
                limit_price: dec!(10),
                options: Options::default(),
            },
            instrument(),
            account(),
            crate::origin::Origin::Strategy,
        );
        let flipped = Setup::Limit {
            side: Side::Sell,
            amount: dec!(2),
            limit_price: dec!(10),
            options: Options::default(),
        };
        assert_eq!(order.validate_amend(&flipped), Err(Reason::InvalidAmend));
    }

    #[test]
    fn amend_refuses_when_filled_exceeds_new_total() {
        let order = Order::new_basic(
            "O1".into(),
            Setup::Limit {
                side: Side::Buy,
                amount: dec!(2),
                limit_price: dec!(10),
                options: Options::default(),
            },
            instrument(),
            account(),
            crate::origin::Origin::Strategy,
        );
        order.apply_fill(dec!(10), dec!(1.5));
        let smaller = Setup::Limit {
            side: Side::Buy,
            amount: dec!(1),
            limit_price: dec!(10),
            options: Options::default(),
        };
        assert_eq!(order.validate_amend(&smaller), Err(Reason::InvalidAmend));
    }

    #[test]
    fn replace_filled_constrain_gate() {
        let order = Order::new_basic(
            "O1".into(),
            Setup::Limit {
                side: Side::Buy,
                amount: dec!(2),
                limit_price: dec!(10),
                options: Options::default(),
            },
            instrument(),
            account(),
            crate::origin::Origin::Strategy,
        );
        order.apply_fill(dec!(10), dec!(0.4));
        let new_setup = Setup::Limit {
            side: Side::Buy,
            amount: dec!(2),
            limit_price: dec!(11),
            options: Options {
                replace_filled_constrain: Some(dec!(0.3)),
                ..Options::default()
            },
        };
        assert_eq!(
            order.validate_replace_filled_constrain(&new_setup),
            Err(Reason::ReplaceUnprocessedFill)
        );
    }
}
