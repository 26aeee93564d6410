//! Order lifecycle state machine.

use crate::reason::Reason;

/// An order's lifecycle state.
///
/// `undefined -> sent -> (waiting | active) -> (canceled | filled | rejected)`. `restoring` is
/// the initial state of an order rehydrated from storage, replaced once the adapter reports its
/// real state. `associated` and `discarded` are terminal client-side variants that never reach
/// an adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum State {
    /// Not yet submitted anywhere.
    Undefined,
    /// A [`crate::order::Order::Associated`] sentinel: bound to an instrument but no real order.
    Associated,
    /// Failed local validation before ever reaching the adapter.
    Discarded,
    /// Rejected by the exchange.
    Rejected,
    /// Submitted; the adapter's acknowledgment is pending.
    Sent,
    /// Waiting to be triggered (e.g. a stop order not yet armed).
    Waiting,
    /// Resting on the exchange's order book.
    Active,
    Canceled,
    Filled,
    /// Initial state for a restored order until the adapter reports its real state.
    Restoring,
}

/// `true` once an order can no longer transition: not sent, active, waiting, or restoring.
pub fn is_done(state: State) -> bool {
    !matches!(
        state,
        State::Sent | State::Active | State::Waiting | State::Restoring
    )
}

/// A state transition report delivered by the exchange mediator, excluding fills.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Report {
    pub new_state: State,
    pub reason: Reason,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_sent_active_waiting_restoring_are_not_done() {
        for s in [State::Sent, State::Active, State::Waiting, State::Restoring] {
            assert!(!is_done(s), "{s:?} should not be done");
        }
        for s in [
            State::Undefined,
            State::Associated,
            State::Discarded,
            State::Rejected,
            State::Canceled,
            State::Filled,
        ] {
            assert!(is_done(s), "{s:?} should be done");
        }
    }
}
