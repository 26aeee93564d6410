//! The Exchange mediator (C6): subscription multiplexing, snapshot caching, pending-update
//! fan-out, and order routing between one adapter and many targets.
//!
//! A single mutex (`Inner`) guards every table below. Downstream `on_event` calls happen
//! while the mutex is held — correct only because targets are contractually non-blocking
//! (lock-then-enqueue; see [`crate::target::EventTarget`]). Adapter implementations must
//! never call back into the mediator synchronously from within one of their own methods, or
//! this deadlocks on the same thread.

use crate::adapter::ExchangeAdapter;
use crate::subscription::{Policy, SubscriptionKind};
use crate::target::TargetHandle;
use indexmap::IndexMap;
use parking_lot::Mutex;
use std::collections::HashMap;
use vantage_execution::{Fill, Order, Report, SerializedOrder, Setup};
use vantage_markets::{Account, Instrument, OrderBook, Ticker};

struct Inner {
    subscriptions: HashMap<(SubscriptionKind, Instrument), IndexMap<TargetHandle, Policy>>,
    ticker_cache: HashMap<Instrument, Ticker>,
    orderbook_cache: HashMap<Instrument, OrderBook>,
    account_waiters: HashMap<Account, Vec<TargetHandle>>,
    instrument_waiters: HashMap<Instrument, Vec<TargetHandle>>,
    order_routing: HashMap<String, TargetHandle>,
}

impl Inner {
    fn new() -> Self {
        Self {
            subscriptions: HashMap::new(),
            ticker_cache: HashMap::new(),
            orderbook_cache: HashMap::new(),
            account_waiters: HashMap::new(),
            instrument_waiters: HashMap::new(),
            order_routing: HashMap::new(),
        }
    }
}

/// Binds one [`ExchangeAdapter`] to the many targets (Contexts, in the full runtime) that
/// subscribe to it.
pub struct Exchange<A> {
    adapter: A,
    inner: Mutex<Inner>,
}

impl<A: ExchangeAdapter> std::fmt::Debug for Exchange<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Exchange")
            .field("adapter", &self.adapter.get_name())
            .finish()
    }
}

impl<A: ExchangeAdapter> Exchange<A> {
    pub fn new(adapter: A) -> Self {
        Self {
            adapter,
            inner: Mutex::new(Inner::new()),
        }
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    // --- Subscription multiplexing ------------------------------------------------

    /// Registers `target`'s interest in `(kind, instrument)`. The adapter is asked to
    /// subscribe only when this is the first interest in the pair across every target;
    /// re-subscribing the same target just updates its policy in place.
    pub fn subscribe(
        &self,
        target: TargetHandle,
        kind: SubscriptionKind,
        instrument: Instrument,
        policy: Policy,
    ) {
        let mut inner = self.inner.lock();
        let entry = inner
            .subscriptions
            .entry((kind, instrument.clone()))
            .or_default();
        let is_first = entry.is_empty();
        entry.insert(target, policy);
        if is_first {
            drop(inner);
            self.forward_subscribe(kind, &instrument);
        }
    }

    /// Removes `target`'s interest in `(kind, instrument)`. The adapter is asked to
    /// unsubscribe once the last interest in the pair is gone. Idempotent: unsubscribing an
    /// entry that doesn't exist is a no-op.
    pub fn unsubscribe(&self, target: &TargetHandle, kind: SubscriptionKind, instrument: &Instrument) {
        let mut inner = self.inner.lock();
        let key = (kind, instrument.clone());
        let Some(entry) = inner.subscriptions.get_mut(&key) else {
            return;
        };
        entry.shift_remove(target);
        let now_empty = entry.is_empty();
        if now_empty {
            inner.subscriptions.remove(&key);
        }
        drop(inner);
        if now_empty {
            self.forward_unsubscribe(kind, instrument);
        }
    }

    fn forward_subscribe(&self, kind: SubscriptionKind, instrument: &Instrument) {
        match kind {
            SubscriptionKind::Ticker => self.adapter.subscribe_ticker(instrument),
            SubscriptionKind::Orderbook => self.adapter.subscribe_orderbook(instrument),
        }
    }

    fn forward_unsubscribe(&self, kind: SubscriptionKind, instrument: &Instrument) {
        match kind {
            SubscriptionKind::Ticker => self.adapter.unsubscribe_ticker(instrument),
            SubscriptionKind::Orderbook => self.adapter.unsubscribe_orderbook(instrument),
        }
    }

    // --- Snapshot caching / market data fan-out -------------------------------------

    /// Caches the latest ticker and delivers it to every subscribed target, in subscription
    /// order. One-shot entries are removed after delivery; if none remain, the adapter is
    /// unsubscribed.
    pub fn income_ticker(&self, instrument: &Instrument, ticker: Ticker) {
        let mut inner = self.inner.lock();
        inner.ticker_cache.insert(instrument.clone(), ticker.clone());
        let key = (SubscriptionKind::Ticker, instrument.clone());
        let targets = deliver_and_trim(&mut inner.subscriptions, &key);
        let became_empty = inner
            .subscriptions
            .get(&key)
            .map(|m| m.is_empty())
            .unwrap_or(true);
        if became_empty {
            inner.subscriptions.remove(&key);
        }
        drop(inner);
        for target in &targets {
            target.on_ticker(instrument, &ticker);
        }
        if became_empty && !targets.is_empty() {
            self.adapter.unsubscribe_ticker(instrument);
        }
    }

    /// Same contract as [`income_ticker`](Self::income_ticker), for order books.
    pub fn income_orderbook(&self, instrument: &Instrument, book: OrderBook) {
        let mut inner = self.inner.lock();
        inner.orderbook_cache.insert(instrument.clone(), book.clone());
        let key = (SubscriptionKind::Orderbook, instrument.clone());
        let targets = deliver_and_trim(&mut inner.subscriptions, &key);
        let became_empty = inner
            .subscriptions
            .get(&key)
            .map(|m| m.is_empty())
            .unwrap_or(true);
        if became_empty {
            inner.subscriptions.remove(&key);
        }
        drop(inner);
        for target in &targets {
            target.on_orderbook(instrument, &book);
        }
        if became_empty && !targets.is_empty() {
            self.adapter.unsubscribe_orderbook(instrument);
        }
    }

    pub fn cached_ticker(&self, instrument: &Instrument) -> Option<Ticker> {
        self.inner.lock().ticker_cache.get(instrument).cloned()
    }

    pub fn cached_orderbook(&self, instrument: &Instrument) -> Option<OrderBook> {
        self.inner.lock().orderbook_cache.get(instrument).cloned()
    }

    // --- Pending-update fan-out (coalescing) ----------------------------------------

    /// Requests an account refresh for `target`. If another target's request is already in
    /// flight for this account, `target` is just added to the waiter list — the adapter is
    /// asked only once regardless of how many targets are waiting.
    /// Forwards directly to the adapter — there is no pending/cached state to coalesce, since
    /// an allocation has no asynchronous confirmation analogous to `object_updated_account`.
    pub fn allocate(&self, account: &Account, equity: rust_decimal::Decimal) {
        self.adapter.allocate(account, equity);
    }

    pub fn update_account(&self, target: TargetHandle, account: Account) {
        let mut inner = self.inner.lock();
        let waiters = inner.account_waiters.entry(account.clone()).or_default();
        let is_first = waiters.is_empty();
        waiters.push(target);
        drop(inner);
        if is_first {
            self.adapter.update_account(&account);
        }
    }

    /// Requests an instrument refresh for `target`; same coalescing contract as
    /// [`update_account`](Self::update_account).
    pub fn update_instrument(&self, target: TargetHandle, instrument: Instrument) {
        let mut inner = self.inner.lock();
        let waiters = inner
            .instrument_waiters
            .entry(instrument.clone())
            .or_default();
        let is_first = waiters.is_empty();
        waiters.push(target);
        drop(inner);
        if is_first {
            self.adapter.update_instrument(&instrument);
        }
    }

    /// The adapter reports an account refresh is complete: every waiting target receives
    /// exactly one `on_account_updated`, in request order, and the waiter list is cleared.
    pub fn object_updated_account(&self, account: &Account) {
        let waiters = {
            let mut inner = self.inner.lock();
            inner.account_waiters.remove(account).unwrap_or_default()
        };
        for target in &waiters {
            target.on_account_updated(account);
        }
    }

    /// Same contract as [`object_updated_account`](Self::object_updated_account), for
    /// instruments.
    pub fn object_updated_instrument(&self, instrument: &Instrument) {
        let waiters = {
            let mut inner = self.inner.lock();
            inner
                .instrument_waiters
                .remove(instrument)
                .unwrap_or_default()
        };
        for target in &waiters {
            target.on_instrument_updated(instrument);
        }
    }

    // --- Order routing ----------------------------------------------------------------

    /// Creates a new order from `setup` and routes it to `target`. Always records routing,
    /// even when the adapter discards the order outright — the caller still needs the
    /// `Order` handle back; it simply stays unrouted in Storage (see the Context layer).
    pub fn create_order(
        &self,
        target: TargetHandle,
        instrument: &Instrument,
        account: &Account,
        setup: &Setup,
    ) -> Order {
        let order = self.adapter.create_order(instrument, account, setup);
        if let Some(id) = order.id() {
            self.inner.lock().order_routing.insert(id.to_string(), target);
        }
        order
    }

    pub fn create_order_replace(&self, target: TargetHandle, order: &Order, setup: &Setup, amend: bool) -> Order {
        let replacement = self.adapter.create_order_replace(order, setup, amend);
        if let Some(id) = replacement.id() {
            self.inner.lock().order_routing.insert(id.to_string(), target);
        }
        replacement
    }

    pub fn batch_place(&self, orders: &[Order]) {
        self.adapter.batch_place(orders);
    }

    pub fn batch_cancel(&self, orders: &[Order]) {
        self.adapter.batch_cancel(orders);
    }

    /// Dispatches a state-change report to whichever target is routed to `order`. If the
    /// resulting state `is_done`, the routing entry is erased — no further events for this
    /// order id are expected.
    pub fn order_state_changed(&self, order: &Order, report: Report) {
        let Some(order_id) = order.id() else { return };
        let is_done = vantage_execution::is_done(report.new_state);
        let target = {
            let mut inner = self.inner.lock();
            if is_done {
                inner.order_routing.remove(order_id)
            } else {
                inner.order_routing.get(order_id).cloned()
            }
        };
        if let Some(target) = target {
            target.on_order_state(order, &report);
        }
    }

    /// Dispatches a fill to the routed target. Routing is never erased by a fill — only a
    /// terminal state change does that (see [`order_state_changed`](Self::order_state_changed)).
    pub fn order_fill(&self, order: &Order, fill: Fill) {
        let Some(order_id) = order.id() else { return };
        let target = self.inner.lock().order_routing.get(order_id).cloned();
        if let Some(target) = target {
            target.on_order_fill(order, &fill);
        }
    }

    // --- Restart --------------------------------------------------------------------

    /// Hands opaque persisted payloads to the adapter for rehydration. As each order is
    /// restored the adapter calls back through [`order_restore`](Self::order_restore), which
    /// re-establishes routing before any further events for that order are dispatched.
    pub fn restore_orders(&self, target: TargetHandle, serialized: &[SerializedOrder]) {
        let _ = &target;
        self.adapter.restore_orders(serialized);
    }

    /// Called by the adapter once per rehydrated order, establishing routing for it. The
    /// caller is responsible for then replaying any unprocessed state/fills through the
    /// ordinary `order_state_changed`/`order_fill` entry points.
    pub fn order_restore(&self, target: TargetHandle, order: &Order) {
        if let Some(id) = order.id() {
            self.inner.lock().order_routing.insert(id.to_string(), target);
        }
    }

    // --- Disconnect -------------------------------------------------------------------

    /// Removes every subscription, pending-update waiter, and order-routing entry owned by
    /// `target`, in one critical section.
    pub fn disconnect(&self, target: &TargetHandle) {
        let mut inner = self.inner.lock();
        inner.subscriptions.retain(|_, targets| {
            targets.shift_remove(target);
            !targets.is_empty()
        });
        inner.account_waiters.retain(|_, waiters| {
            waiters.retain(|t| t != target);
            !waiters.is_empty()
        });
        inner.instrument_waiters.retain(|_, waiters| {
            waiters.retain(|t| t != target);
            !waiters.is_empty()
        });
        inner.order_routing.retain(|_, routed| routed != target);
    }
}

/// Object-safe facade over [`Exchange<A>`], erasing the adapter type parameter so a Context
/// need not be generic over it. Every method forwards to the identically-named `Exchange`
/// method; see those for the actual contract.
pub trait DynExchange: Send + Sync {
    fn subscribe(&self, target: TargetHandle, kind: SubscriptionKind, instrument: Instrument, policy: Policy);
    fn unsubscribe(&self, target: &TargetHandle, kind: SubscriptionKind, instrument: &Instrument);
    fn update_account(&self, target: TargetHandle, account: Account);
    fn update_instrument(&self, target: TargetHandle, instrument: Instrument);
    fn allocate(&self, account: &Account, equity: rust_decimal::Decimal);
    fn create_order(&self, target: TargetHandle, instrument: &Instrument, account: &Account, setup: &Setup) -> Order;
    fn create_order_replace(&self, target: TargetHandle, order: &Order, setup: &Setup, amend: bool) -> Order;
    fn batch_place(&self, orders: &[Order]);
    fn batch_cancel(&self, orders: &[Order]);
    fn restore_orders(&self, target: TargetHandle, serialized: &[SerializedOrder]);
    fn disconnect(&self, target: &TargetHandle);
    fn serialize_order(&self, order: &Order) -> Vec<u8>;
}

impl<A: ExchangeAdapter> DynExchange for Exchange<A> {
    fn subscribe(&self, target: TargetHandle, kind: SubscriptionKind, instrument: Instrument, policy: Policy) {
        Exchange::subscribe(self, target, kind, instrument, policy)
    }
    fn unsubscribe(&self, target: &TargetHandle, kind: SubscriptionKind, instrument: &Instrument) {
        Exchange::unsubscribe(self, target, kind, instrument)
    }
    fn update_account(&self, target: TargetHandle, account: Account) {
        Exchange::update_account(self, target, account)
    }
    fn update_instrument(&self, target: TargetHandle, instrument: Instrument) {
        Exchange::update_instrument(self, target, instrument)
    }
    fn allocate(&self, account: &Account, equity: rust_decimal::Decimal) {
        Exchange::allocate(self, account, equity)
    }
    fn create_order(&self, target: TargetHandle, instrument: &Instrument, account: &Account, setup: &Setup) -> Order {
        Exchange::create_order(self, target, instrument, account, setup)
    }
    fn create_order_replace(&self, target: TargetHandle, order: &Order, setup: &Setup, amend: bool) -> Order {
        Exchange::create_order_replace(self, target, order, setup, amend)
    }
    fn batch_place(&self, orders: &[Order]) {
        Exchange::batch_place(self, orders)
    }
    fn batch_cancel(&self, orders: &[Order]) {
        Exchange::batch_cancel(self, orders)
    }
    fn restore_orders(&self, target: TargetHandle, serialized: &[SerializedOrder]) {
        Exchange::restore_orders(self, target, serialized)
    }
    fn disconnect(&self, target: &TargetHandle) {
        Exchange::disconnect(self, target)
    }
    fn serialize_order(&self, order: &Order) -> Vec<u8> {
        self.adapter.serialize_order(order)
    }
}

/// Drains deliverable targets for `key`: the full subscriber list, in insertion order, with
/// any one-shot entries removed from the live table before returning (so a recursive
/// `income_*` call racing in on the same instrument, if one were possible, would never
/// re-deliver to an already-served one-shot target).
fn deliver_and_trim(
    subscriptions: &mut HashMap<(SubscriptionKind, Instrument), IndexMap<TargetHandle, Policy>>,
    key: &(SubscriptionKind, Instrument),
) -> Vec<TargetHandle> {
    let Some(entry) = subscriptions.get_mut(key) else {
        return Vec::new();
    };
    let targets: Vec<TargetHandle> = entry.keys().cloned().collect();
    entry.retain(|_, policy| *policy != Policy::OneShot);
    targets
}
