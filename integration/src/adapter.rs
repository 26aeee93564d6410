//! The outbound interface the Exchange mediator drives. A concrete venue adapter (REST/WS
//! client, or the back-test simulator) implements this; neither lives in this crate.

use rust_decimal::Decimal;
use vantage_execution::{Order, Setup, SerializedOrder};
use vantage_markets::{Account, ExchangeId, Instrument};

/// Driven by the [`crate::exchange::Exchange`] mediator; never called directly by a
/// strategy. Implementations must not block the calling thread for long — subscription and
/// order calls are expected to be fire-and-forget, with results arriving later through the
/// mediator's `income_data`/`order_state_changed`/`order_fill`/`order_restore` entry points.
pub trait ExchangeAdapter: Send + Sync {
    fn get_id(&self) -> ExchangeId;
    fn get_name(&self) -> &str;
    fn get_icon(&self) -> &str {
        ""
    }

    fn subscribe_ticker(&self, instrument: &Instrument);
    fn unsubscribe_ticker(&self, instrument: &Instrument);
    fn subscribe_orderbook(&self, instrument: &Instrument);
    fn unsubscribe_orderbook(&self, instrument: &Instrument);

    fn update_account(&self, account: &Account);
    fn update_instrument(&self, instrument: &Instrument);

    /// Assigns `equity` as the capital this calling strategy's account view is allowed to
    /// risk against `account`. Multiple strategies may share the same underlying account;
    /// the adapter is responsible for netting allocations against the account's real equity.
    fn allocate(&self, account: &Account, equity: Decimal);

    fn create_order(&self, instrument: &Instrument, account: &Account, setup: &Setup) -> Order;
    fn create_order_replace(&self, order: &Order, setup: &Setup, amend: bool) -> Order;
    fn batch_place(&self, orders: &[Order]);
    fn batch_cancel(&self, orders: &[Order]);

    /// Produces the opaque body persisted alongside an open order's id. Only the adapter that
    /// created the order can interpret this later, via [`restore_orders`](Self::restore_orders).
    fn serialize_order(&self, order: &Order) -> Vec<u8>;

    fn restore_orders(&self, serialized: &[SerializedOrder]);
}
