//! The Context (C7): binds a strategy, a Storage, an Exchange and the shared
//! ContextScheduler together.
//!
//! Two mutexes guard Context-local state, in the fixed order the design doc specifies
//! (Exchange → Context::`_mx` → Context::`_cb_mx`, never the other way): [`TickState`]
//! (the outbound batches and the lazily-opened transaction flag) and [`PendingSubjects`]
//! (in-flight account/instrument refresh requests). Neither is ever held while calling out
//! to the Exchange.

use std::any::Any;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rust_decimal::Decimal;

use vantage_core::{RuntimeError, Timestamp};
use vantage_data::{FillsLimit, Storage};
use vantage_execution::{Fill, Fills, Order, Reason, Report, SerializedOrder, Setup, State};
use vantage_integration::{DynExchange, EventTarget, Policy, SubscriptionKind, TargetHandle};
use vantage_markets::{Account, Instrument, OrderBook, Ticker};
use vantage_risk::{ContextScheduler, Registration, Scheduler};
use vantage_strategies::{Configuration, ContextHandle, Strategy, TimerId};

const TICKER_CLASS: u32 = 1;
const ORDERBOOK_CLASS: u32 = 2;

#[derive(Default)]
struct TickState {
    batch_place: Vec<Order>,
    batch_cancel: Vec<Order>,
    txn_open: bool,
}

#[derive(Default)]
struct PendingSubjects {
    accounts: HashSet<String>,
    instruments: HashSet<String>,
}

/// Binds one running strategy to its Scheduler (C2), Storage (C4), Exchange (C6) and the
/// shared ContextScheduler (C3). Reached only through `Arc<Context>` — every callback the
/// strategy receives is a freshly built [`ContextHandleImpl`] borrowing `&self`, never the
/// `Context` itself.
pub struct Context {
    id: String,
    account: Account,
    self_weak: Weak<Context>,
    scheduler: Scheduler,
    context_scheduler: Arc<ContextScheduler>,
    registration: Registration,
    exchange: Arc<dyn DynExchange>,
    storage: Storage,
    strategy: Mutex<Box<dyn Strategy>>,
    cur_time: Mutex<Timestamp>,
    tick: Mutex<TickState>,
    pending: Mutex<PendingSubjects>,
    next_timer_id: AtomicU64,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context").field("id", &self.id).finish()
    }
}

impl Context {
    /// Builds and registers a new Context. Call [`init`](Self::init) once before any event
    /// can be dispatched to it.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: impl Into<String>,
        account: Account,
        exchange: Arc<dyn DynExchange>,
        storage: Storage,
        context_scheduler: Arc<ContextScheduler>,
        strategy: Box<dyn Strategy>,
    ) -> Arc<Self> {
        let id = id.into();
        Arc::new_cyclic(|weak: &Weak<Context>| {
            let wakeup_weak = weak.clone();
            let registration = context_scheduler.register(Box::new(move |now| {
                if let Some(ctx) = wakeup_weak.upgrade() {
                    ctx.tick(now);
                }
            }));
            Context {
                id,
                account,
                self_weak: weak.clone(),
                scheduler: Scheduler::new(),
                context_scheduler,
                registration,
                exchange,
                storage,
                strategy: Mutex::new(strategy),
                cur_time: Mutex::new(Utc::now()),
                tick: Mutex::new(TickState::default()),
                pending: Mutex::new(PendingSubjects::default()),
                next_timer_id: AtomicU64::new(1),
            }
        })
    }

    /// Drives `on_init`, flushes any batches it produced, and arms the first wakeup if the
    /// strategy set a timer during `on_init`.
    pub fn init(&self, configuration: Configuration) {
        tracing::debug!(strategy_id = %self.id, "context init");
        {
            let mut strategy = self.strategy.lock();
            let mut handle = ContextHandleImpl { ctx: self };
            strategy.on_init(&mut handle, configuration);
        }
        self.flush_batches();
    }

    /// Hands opaque persisted order payloads to the adapter for rehydration. The adapter
    /// replays `order_restore`/`order_state_changed`/`order_fill` through the Exchange
    /// mediator as usual; this Context's fill-dedup and persistence paths handle the rest.
    pub fn restore(&self, serialized: &[SerializedOrder]) {
        let target = self.target_handle();
        self.exchange.restore_orders(target, serialized);
    }

    /// Removes every subscription/routing entry this Context owns from the Exchange and
    /// deregisters from the ContextScheduler. No further events are dispatched afterward.
    pub fn shutdown(&self) {
        let target = self.target_handle();
        self.exchange.disconnect(&target);
        self.context_scheduler.deregister(self.registration);
        tracing::debug!(strategy_id = %self.id, "context shutdown");
    }

    fn target_handle(&self) -> TargetHandle {
        let this = self
            .self_weak
            .upgrade()
            .expect("Context outlives its own TargetHandle while it is reachable at all");
        TargetHandle::new(this as Arc<dyn EventTarget>)
    }

    fn rearm(&self, ts: DateTime<Utc>) {
        self.context_scheduler.set(self.registration, ts);
    }

    /// The single worker-thread tick: dispatch at most one Scheduler event, flush batches,
    /// reschedule. A panicking strategy callback rolls back the open transaction, clears the
    /// batches, and the Context is re-armed for an immediate retry rather than wedging the
    /// whole worker.
    fn tick(&self, now: DateTime<Utc>) {
        *self.cur_time.lock() = now;
        tracing::trace!(strategy_id = %self.id, %now, "context tick");

        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            self.scheduler.wakeup(now, |ts| self.rearm(ts))
        }));

        match outcome {
            Ok(hint) => {
                self.flush_batches();
                if let Some(ts) = hint {
                    self.rearm(ts);
                }
            }
            Err(payload) => {
                self.storage.rollback();
                let mut state = self.tick.lock();
                state.batch_place.clear();
                state.batch_cancel.clear();
                state.txn_open = false;
                drop(state);
                tracing::error!(
                    strategy_id = %self.id,
                    message = %panic_message(&payload),
                    "strategy callback panicked; tick rolled back"
                );
                // Re-arm immediately so the remaining queued work (if any) still gets a
                // chance to run on the next tick rather than waiting on a stale timer.
                self.rearm(now);
            }
        }
    }

    fn flush_batches(&self) {
        let mut state = self.tick.lock();
        if !state.batch_cancel.is_empty() {
            self.exchange.batch_cancel(&state.batch_cancel);
            state.batch_cancel.clear();
        }
        if !state.batch_place.is_empty() {
            self.exchange.batch_place(&state.batch_place);
            state.batch_place.clear();
        }
        if state.txn_open {
            if let Err(err) = self.storage.commit() {
                self.storage.rollback();
                tracing::warn!(strategy_id = %self.id, error = %err, "storage commit failed");
            }
            state.txn_open = false;
        }
    }

    fn ensure_transaction(&self) {
        let mut state = self.tick.lock();
        if !state.txn_open {
            self.storage.begin_transaction();
            state.txn_open = true;
        }
    }

    fn persist_order_state(&self, order: &Order) {
        let Some(id) = order.id() else { return };
        self.ensure_transaction();
        let serialized = SerializedOrder {
            order_id: id.to_string(),
            order_content: self.exchange.serialize_order(order),
        };
        self.storage.put_order(&serialized, order.is_done());
    }

    // --- Inbound event handling (run on the worker thread, from Scheduler jobs) ------------

    fn fire_instrument_update_complete(&self, instrument_id: &str) {
        self.pending.lock().instruments.remove(instrument_id);
    }

    fn fire_account_update_complete(&self, account_id: &str) {
        self.pending.lock().accounts.remove(account_id);
    }

    fn fire_ticker(&self, instrument: Instrument, ticker: Ticker) {
        let mut strategy = self.strategy.lock();
        let mut handle = ContextHandleImpl { ctx: self };
        strategy.on_ticker(&mut handle, &instrument, &ticker);
    }

    fn fire_orderbook(&self, instrument: Instrument, book: OrderBook) {
        let mut strategy = self.strategy.lock();
        let mut handle = ContextHandleImpl { ctx: self };
        strategy.on_orderbook(&mut handle, &instrument, &book);
    }

    fn fire_order_state(&self, order: Order, report: Report) {
        order.apply_report(report.clone());
        self.persist_order_state(&order);
        let mut strategy = self.strategy.lock();
        let mut handle = ContextHandleImpl { ctx: self };
        strategy.on_order(&mut handle, &order, &report);
    }

    /// A fill already seen under the same `(time, id)` is a plain duplicate and dropped
    /// silently. One seen under the same `id` but a *different* timestamp is a protocol
    /// violation from the adapter — the id is supposed to identify a single fill event — and
    /// is dropped loudly instead of stored a second time.
    fn fire_fill(&self, order: Order, fill: Fill) {
        if let Some(existing) = self.storage.find_fill_by_id(&fill.id) {
            if existing.time != fill.time {
                let err = RuntimeError::Protocol(format!(
                    "fill '{}' previously recorded at {}, now reported at {}",
                    fill.id, existing.time, fill.time
                ));
                tracing::error!(strategy_id = %self.id, error = %err, "dropping fill");
            }
            return;
        }
        self.ensure_transaction();
        self.storage.put_fill(&fill);
        order.apply_fill(fill.price, fill.amount);
        let mut strategy = self.strategy.lock();
        let mut handle = ContextHandleImpl { ctx: self };
        strategy.on_fill(&mut handle, &order, &fill);
    }

    fn fire_timer(&self, id: TimerId) {
        let mut strategy = self.strategy.lock();
        let mut handle = ContextHandleImpl { ctx: self };
        strategy.on_timer(&mut handle, id);
    }

    // --- Outbound API bodies, called only via ContextHandleImpl on the worker thread -------

    fn place_impl(&self, instrument: &Instrument, setup: Setup) -> Order {
        let target = self.target_handle();
        let order = self.exchange.create_order(target, instrument, &self.account, &setup);
        if order.state() != State::Discarded {
            self.tick.lock().batch_place.push(order.clone());
        }
        order
    }

    fn replace_impl(&self, order: &Order, setup: Setup, amend: bool) -> Order {
        match order {
            Order::Basic(_) => {
                let target = self.target_handle();
                let replacement = self.exchange.create_order_replace(target, order, &setup, amend);
                if replacement.state() != State::Discarded {
                    self.tick.lock().batch_place.push(replacement.clone());
                }
                replacement
            }
            Order::Associated { instrument, .. } => self.place_impl(instrument, setup),
            Order::Error { .. } => Order::error(Reason::IncompatibleOrder, "replace on a non-order handle"),
        }
    }

    fn cancel_impl(&self, order: &Order) {
        if matches!(order, Order::Basic(_)) {
            self.tick.lock().batch_cancel.push(order.clone());
        }
    }

    fn set_timer_impl(self_arc: &Arc<Context>, at: Timestamp) -> TimerId {
        let id = self_arc.next_timer_id.fetch_add(1, Ordering::Relaxed);
        let timer_id = TimerId(id);
        let now = *self_arc.cur_time.lock();
        let this = Arc::clone(self_arc);
        self_arc.scheduler.set_timer(
            id,
            at,
            Box::new(move || this.fire_timer(timer_id)),
            now,
            |ts| self_arc.rearm(ts),
        );
        timer_id
    }

    fn clear_timer_impl(&self, id: TimerId) -> bool {
        self.scheduler.clear_timer(id.0)
    }

    fn subscribe_impl(&self, kind: SubscriptionKind, instrument: &Instrument) {
        let target = self.target_handle();
        self.exchange.subscribe(target, kind, instrument.clone(), Policy::Unlimited);
    }

    fn unsubscribe_impl(&self, kind: SubscriptionKind, instrument: &Instrument) {
        let target = self.target_handle();
        self.exchange.unsubscribe(&target, kind, instrument);
    }

    fn update_account_impl(&self, account: &Account) {
        let is_first = self.pending.lock().accounts.insert(account.id.clone());
        if is_first {
            let target = self.target_handle();
            self.exchange.update_account(target, account.clone());
        }
    }

    fn update_instrument_impl(&self, instrument: &Instrument) {
        let is_first = self.pending.lock().instruments.insert(instrument.id.clone());
        if is_first {
            let target = self.target_handle();
            self.exchange.update_instrument(target, instrument.clone());
        }
    }

    fn allocate_impl(&self, account: &Account, equity: Decimal) {
        self.exchange.allocate(account, equity);
    }

    fn set_var_impl(&self, name: &str, value: Vec<u8>) {
        self.ensure_transaction();
        self.storage.set_var(name, value);
    }

    fn unset_var_impl(&self, name: &str) {
        self.ensure_transaction();
        self.storage.unset_var(name);
    }

    fn get_fills_impl(&self, limit: usize) -> Fills {
        self.storage.load_fills(FillsLimit::Count(limit), &self.id)
    }

    fn bind_order_impl(&self, instrument: &Instrument) -> Order {
        Order::Associated {
            instrument: instrument.clone(),
            account: self.account.clone(),
        }
    }
}

fn panic_message(payload: &Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// The object-safe handle a strategy callback actually receives: built fresh per dispatch,
/// borrowing the Context it wraps. `&mut self` here is a formality the trait requires — all
/// real mutation goes through the Context's interior-mutable fields.
struct ContextHandleImpl<'a> {
    ctx: &'a Context,
}

impl ContextHandle for ContextHandleImpl<'_> {
    fn place(&mut self, instrument: &Instrument, setup: Setup) -> Order {
        self.ctx.place_impl(instrument, setup)
    }

    fn replace(&mut self, order: &Order, setup: Setup, amend: bool) -> Order {
        self.ctx.replace_impl(order, setup, amend)
    }

    fn cancel(&mut self, order: &Order) {
        self.ctx.cancel_impl(order);
    }

    fn set_timer(&mut self, at: Timestamp) -> TimerId {
        let this = self
            .ctx
            .self_weak
            .upgrade()
            .expect("Context outlives the handle dispatched from its own tick");
        Context::set_timer_impl(&this, at)
    }

    fn clear_timer(&mut self, id: TimerId) -> bool {
        self.ctx.clear_timer_impl(id)
    }

    fn subscribe(&mut self, kind: SubscriptionKind, instrument: &Instrument) {
        self.ctx.subscribe_impl(kind, instrument);
    }

    fn unsubscribe(&mut self, kind: SubscriptionKind, instrument: &Instrument) {
        self.ctx.unsubscribe_impl(kind, instrument);
    }

    fn update_account(&mut self, account: &Account) {
        self.ctx.update_account_impl(account);
    }

    fn update_instrument(&mut self, instrument: &Instrument) {
        self.ctx.update_instrument_impl(instrument);
    }

    fn allocate(&mut self, account: &Account, equity: Decimal) {
        self.ctx.allocate_impl(account, equity);
    }

    fn set_var(&mut self, name: &str, value: Vec<u8>) {
        self.ctx.set_var_impl(name, value);
    }

    fn unset_var(&mut self, name: &str) {
        self.ctx.unset_var_impl(name);
    }

    fn now(&self) -> Timestamp {
        *self.ctx.cur_time.lock()
    }

    fn get_fills(&self, limit: usize) -> Fills {
        self.ctx.get_fills_impl(limit)
    }

    fn bind_order(&self, instrument: &Instrument) -> Order {
        self.ctx.bind_order_impl(instrument)
    }
}

impl EventTarget for Context {
    fn on_instrument_updated(&self, instrument: &Instrument) {
        let Some(this) = self.self_weak.upgrade() else { return };
        let id = instrument.id.clone();
        let now = *self.cur_time.lock();
        self.scheduler.enqueue_immediate(
            Box::new(move || this.fire_instrument_update_complete(&id)),
            now,
            |ts| self.rearm(ts),
        );
    }

    fn on_account_updated(&self, account: &Account) {
        let Some(this) = self.self_weak.upgrade() else { return };
        let id = account.id.clone();
        let now = *self.cur_time.lock();
        self.scheduler.enqueue_immediate(
            Box::new(move || this.fire_account_update_complete(&id)),
            now,
            |ts| self.rearm(ts),
        );
    }

    fn on_ticker(&self, instrument: &Instrument, ticker: &Ticker) {
        let Some(this) = self.self_weak.upgrade() else { return };
        let instrument = instrument.clone();
        let ticker = *ticker;
        let sub_key = instrument.id.clone();
        let now = *self.cur_time.lock();
        self.scheduler.enqueue_collapsing(
            TICKER_CLASS,
            sub_key,
            Box::new(move || this.fire_ticker(instrument, ticker)),
            now,
            |ts| self.rearm(ts),
        );
    }

    fn on_orderbook(&self, instrument: &Instrument, book: &OrderBook) {
        let Some(this) = self.self_weak.upgrade() else { return };
        let instrument = instrument.clone();
        let book = book.clone();
        let sub_key = instrument.id.clone();
        let now = *self.cur_time.lock();
        self.scheduler.enqueue_collapsing(
            ORDERBOOK_CLASS,
            sub_key,
            Box::new(move || this.fire_orderbook(instrument, book)),
            now,
            |ts| self.rearm(ts),
        );
    }

    fn on_order_state(&self, order: &Order, report: &Report) {
        let Some(this) = self.self_weak.upgrade() else { return };
        let order = order.clone();
        let report = report.clone();
        let now = *self.cur_time.lock();
        self.scheduler.enqueue_immediate(
            Box::new(move || this.fire_order_state(order, report)),
            now,
            |ts| self.rearm(ts),
        );
    }

    fn on_order_fill(&self, order: &Order, fill: &Fill) {
        let Some(this) = self.self_weak.upgrade() else { return };
        let order = order.clone();
        let fill = fill.clone();
        let now = *self.cur_time.lock();
        self.scheduler.enqueue_immediate(
            Box::new(move || this.fire_fill(order, fill)),
            now,
            |ts| self.rearm(ts),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
    use vantage_execution::InstrumentSnapshot;
    use vantage_markets::{AccountData, ExchangeId, InstrumentData, InstrumentKind, Side};
    use vantage_strategies::TimerId as StrategyTimerId;

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn instrument(id: &str) -> Instrument {
        Instrument::new(InstrumentData {
            id: id.into(),
            label: id.into(),
            kind: InstrumentKind::Spot,
            exchange: ExchangeId::B3,
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

    fn account(id: &str) -> Account {
        Account::new(AccountData {
            id: id.into(),
            label: id.into(),
            currency: "BRL".into(),
            equity: dec!(0),
            balance: dec!(0),
            blocked: dec!(0),
            leverage: dec!(1),
        })
    }

    fn fill(id: &str, amount: rust_decimal::Decimal, price: rust_decimal::Decimal) -> Fill {
        Fill {
            time: now(),
            id: id.into(),
            label: "strat-1".into(),
            pos_id: 1,
            instrument: InstrumentSnapshot {
                kind: InstrumentKind::Spot,
                multiplier: dec!(1),
                instrument_id: "PETR4".into(),
                price_unit: "BRL".into(),
            },
            side: Side::Buy,
            price,
            amount,
            fees: dec!(0),
        }
    }

    /// A `DynExchange` double that only records calls; never reports anything back.
    #[derive(Default)]
    struct FakeExchange {
        placed: Mutex<Vec<Order>>,
        batches_placed: Mutex<Vec<Vec<Order>>>,
        batches_canceled: Mutex<Vec<Vec<Order>>>,
        subscriptions: Mutex<Vec<(SubscriptionKind, String)>>,
        account_updates: Mutex<Vec<String>>,
        instrument_updates: Mutex<Vec<String>>,
    }

    impl DynExchange for FakeExchange {
        fn subscribe(&self, _target: TargetHandle, kind: SubscriptionKind, instrument: Instrument, _policy: Policy) {
            self.subscriptions.lock().push((kind, instrument.id.clone()));
        }
        fn unsubscribe(&self, _target: &TargetHandle, _kind: SubscriptionKind, _instrument: &Instrument) {}
        fn update_account(&self, _target: TargetHandle, account: Account) {
            self.account_updates.lock().push(account.id.clone());
        }
        fn update_instrument(&self, _target: TargetHandle, instrument: Instrument) {
            self.instrument_updates.lock().push(instrument.id.clone());
        }
        fn allocate(&self, _account: &Account, _equity: Decimal) {}
        fn create_order(&self, _target: TargetHandle, instrument: &Instrument, account: &Account, setup: &Setup) -> Order {
            let id = format!("O{}", self.placed.lock().len() + 1);
            let order = Order::new_basic(id, setup.clone(), instrument.clone(), account.clone(), vantage_execution::Origin::Strategy);
            self.placed.lock().push(order.clone());
            order
        }
        fn create_order_replace(&self, target: TargetHandle, order: &Order, setup: &Setup, _amend: bool) -> Order {
            let Order::Basic(data) = order else {
                return Order::error(Reason::IncompatibleOrder, "not a basic order");
            };
            self.create_order(target, &data.instrument, &data.account, setup)
        }
        fn batch_place(&self, orders: &[Order]) {
            self.batches_placed.lock().push(orders.to_vec());
        }
        fn batch_cancel(&self, orders: &[Order]) {
            self.batches_canceled.lock().push(orders.to_vec());
        }
        fn restore_orders(&self, _target: TargetHandle, _serialized: &[SerializedOrder]) {}
        fn disconnect(&self, _target: &TargetHandle) {}
        fn serialize_order(&self, order: &Order) -> Vec<u8> {
            order.id().unwrap_or_default().as_bytes().to_vec()
        }
    }

    /// Shared recording state, cloned out of the boxed [`Strategy`] before it is handed to a
    /// Context so assertions don't need to reach back through `Box<dyn Strategy>`.
    #[derive(Default)]
    struct Recorder {
        inits: AtomicUsize,
        tickers: Mutex<Vec<String>>,
        orderbooks: Mutex<Vec<String>>,
        orders: Mutex<Vec<(Order, Report)>>,
        fills: Mutex<Vec<Fill>>,
        timers: Mutex<Vec<StrategyTimerId>>,
    }

    struct RecordingStrategy {
        recorder: Arc<Recorder>,
        on_init_action: Option<Box<dyn FnMut(&mut dyn ContextHandle) + Send>>,
    }

    impl RecordingStrategy {
        fn new(recorder: Arc<Recorder>) -> Self {
            Self { recorder, on_init_action: None }
        }

        fn with_init_action(mut self, action: impl FnMut(&mut dyn ContextHandle) + Send + 'static) -> Self {
            self.on_init_action = Some(Box::new(action));
            self
        }
    }

    impl Strategy for RecordingStrategy {
        fn on_init(&mut self, ctx: &mut dyn ContextHandle, _config: Configuration) {
            self.recorder.inits.fetch_add(1, AtomicOrdering::SeqCst);
            if let Some(action) = self.on_init_action.as_mut() {
                action(ctx);
            }
        }
        fn on_ticker(&mut self, _ctx: &mut dyn ContextHandle, instrument: &Instrument, ticker: &Ticker) {
            self.recorder.tickers.lock().push(format!("{}@{}", instrument.id, ticker.last));
        }
        fn on_orderbook(&mut self, _ctx: &mut dyn ContextHandle, instrument: &Instrument, _book: &OrderBook) {
            self.recorder.orderbooks.lock().push(instrument.id.clone());
        }
        fn on_order(&mut self, _ctx: &mut dyn ContextHandle, order: &Order, report: &Report) {
            self.recorder.orders.lock().push((order.clone(), report.clone()));
        }
        fn on_fill(&mut self, _ctx: &mut dyn ContextHandle, _order: &Order, fill: &Fill) {
            self.recorder.fills.lock().push(fill.clone());
        }
        fn on_timer(&mut self, _ctx: &mut dyn ContextHandle, id: StrategyTimerId) {
            self.recorder.timers.lock().push(id);
        }
    }

    fn new_context(exchange: Arc<FakeExchange>, strategy: RecordingStrategy) -> Arc<Context> {
        Context::new(
            "strat-1",
            account("ACC1"),
            exchange as Arc<dyn DynExchange>,
            Storage::new(b"strat-1".to_vec()),
            ContextScheduler::new(),
            Box::new(strategy),
        )
    }

    #[test]
    fn init_invokes_strategy_once_and_flushes_its_batch() {
        let exchange = Arc::new(FakeExchange::default());
        let recorder = Arc::new(Recorder::default());
        let inst = instrument("PETR4");
        let placed_instrument = inst.clone();
        let strategy = RecordingStrategy::new(recorder.clone()).with_init_action(move |ctx| {
            ctx.place(
                &placed_instrument,
                Setup::Market { side: Side::Buy, amount: dec!(100), options: Default::default() },
            );
        });
        let ctx = new_context(exchange.clone(), strategy);

        ctx.init(Configuration {
            accounts: vec![account("ACC1")],
            instruments: vec![inst],
            config: vantage_core::StrategyConfig::default(),
        });

        assert_eq!(recorder.inits.load(AtomicOrdering::SeqCst), 1);
        assert_eq!(exchange.placed.lock().len(), 1);
        assert_eq!(exchange.batches_placed.lock().len(), 1);
        assert_eq!(exchange.batches_placed.lock()[0].len(), 1);
    }

    #[test]
    fn ticker_updates_within_a_tick_collapse_to_the_latest() {
        let exchange = Arc::new(FakeExchange::default());
        let recorder = Arc::new(Recorder::default());
        let ctx = new_context(exchange, RecordingStrategy::new(recorder.clone()));
        let inst = instrument("PETR4");

        for last in [dec!(10), dec!(11), dec!(12)] {
            let ticker = Ticker {
                ts: now(),
                bid: last,
                bid_vol: dec!(1),
                ask: last,
                ask_vol: dec!(1),
                last,
                volume: dec!(1),
                index: dec!(1),
            };
            ctx.on_ticker(&inst, &ticker);
        }
        ctx.tick(now());

        assert_eq!(*recorder.tickers.lock(), vec!["PETR4@12".to_string()]);
    }

    #[test]
    fn duplicate_fills_are_not_redelivered() {
        let exchange = Arc::new(FakeExchange::default());
        let recorder = Arc::new(Recorder::default());
        let ctx = new_context(exchange.clone(), RecordingStrategy::new(recorder.clone()));
        let inst = instrument("PETR4");
        let order = exchange.create_order(
            ctx.target_handle(),
            &inst,
            &account("ACC1"),
            &Setup::Market { side: Side::Buy, amount: dec!(100), options: Default::default() },
        );
        let f = fill("F1", dec!(100), dec!(10));

        ctx.on_order_fill(&order, &f);
        ctx.tick(now());
        ctx.on_order_fill(&order, &f);
        ctx.tick(now());

        assert_eq!(recorder.fills.lock().len(), 1);
        assert_eq!(ctx.storage.load_fills(FillsLimit::Count(10), "strat-1").len(), 1);
    }

    #[test]
    fn a_fill_reported_again_under_a_different_timestamp_is_dropped_not_stored_twice() {
        let exchange = Arc::new(FakeExchange::default());
        let recorder = Arc::new(Recorder::default());
        let ctx = new_context(exchange.clone(), RecordingStrategy::new(recorder.clone()));
        let inst = instrument("PETR4");
        let order = exchange.create_order(
            ctx.target_handle(),
            &inst,
            &account("ACC1"),
            &Setup::Market { side: Side::Buy, amount: dec!(100), options: Default::default() },
        );
        let first = fill("F1", dec!(100), dec!(10));
        let resurfaced = Fill { time: first.time + chrono::Duration::seconds(1), ..first.clone() };

        ctx.on_order_fill(&order, &first);
        ctx.tick(now());
        ctx.on_order_fill(&order, &resurfaced);
        ctx.tick(now());

        assert_eq!(recorder.fills.lock().len(), 1);
        assert_eq!(ctx.storage.load_fills(FillsLimit::Count(10), "strat-1").len(), 1);
    }

    #[test]
    fn a_fill_delivered_through_the_scheduler_worker_wakes_an_idle_context() {
        let exchange = Arc::new(FakeExchange::default());
        let recorder = Arc::new(Recorder::default());
        let context_scheduler = ContextScheduler::new();
        let ctx = Context::new(
            "strat-1",
            account("ACC1"),
            exchange.clone() as Arc<dyn DynExchange>,
            Storage::new(b"strat-1".to_vec()),
            context_scheduler.clone(),
            Box::new(RecordingStrategy::new(recorder.clone())),
        );
        let inst = instrument("PETR4");
        let order = exchange.create_order(
            ctx.target_handle(),
            &inst,
            &account("ACC1"),
            &Setup::Market { side: Side::Buy, amount: dec!(100), options: Default::default() },
        );
        let f = fill("F1", dec!(100), dec!(10));

        let worker = context_scheduler.spawn();
        // Context is freshly constructed and has never ticked: its Scheduler is unarmed.
        // Delivering a fill here exercises the exact wake path the worker thread depends on.
        ctx.on_order_fill(&order, &f);

        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(2);
        while recorder.fills.lock().is_empty() && std::time::Instant::now() < deadline {
            std::thread::sleep(std::time::Duration::from_millis(5));
        }

        context_scheduler.stop();
        worker.join().unwrap();

        assert_eq!(recorder.fills.lock().len(), 1);
    }

    #[test]
    fn replace_on_an_error_handle_is_rejected_without_reaching_the_exchange() {
        let exchange = Arc::new(FakeExchange::default());
        let recorder = Arc::new(Recorder::default());
        let ctx = new_context(exchange.clone(), RecordingStrategy::new(recorder));
        let broken = Order::error(Reason::IncompatibleOrder, "no such order");

        let replacement = ctx.replace_impl(
            &broken,
            Setup::Market { side: Side::Buy, amount: dec!(1), options: Default::default() },
            true,
        );

        assert_eq!(replacement.state(), State::Discarded);
        assert!(exchange.placed.lock().is_empty());
    }

    #[test]
    fn timer_fires_once_at_its_due_time() {
        let exchange = Arc::new(FakeExchange::default());
        let recorder = Arc::new(Recorder::default());
        let strategy = RecordingStrategy::new(recorder.clone()).with_init_action(|ctx| {
            ctx.set_timer(now() + chrono::Duration::seconds(5));
        });
        let ctx = new_context(exchange, strategy);
        ctx.init(Configuration {
            accounts: vec![],
            instruments: vec![],
            config: vantage_core::StrategyConfig::default(),
        });

        ctx.tick(now() + chrono::Duration::seconds(1));
        assert!(recorder.timers.lock().is_empty());
        ctx.tick(now() + chrono::Duration::seconds(5));

        assert_eq!(recorder.timers.lock().len(), 1);
    }

    #[test]
    fn pending_account_update_coalesces_repeat_requests_for_the_same_account() {
        let exchange = Arc::new(FakeExchange::default());
        let recorder = Arc::new(Recorder::default());
        let ctx = new_context(exchange.clone(), RecordingStrategy::new(recorder));
        let acc = account("ACC1");

        ctx.update_account_impl(&acc);
        ctx.update_account_impl(&acc);
        assert_eq!(exchange.account_updates.lock().len(), 1);

        ctx.on_account_updated(&acc);
        ctx.tick(now());
        ctx.update_account_impl(&acc);
        assert_eq!(exchange.account_updates.lock().len(), 2);
    }

    #[test]
    fn a_panicking_strategy_callback_rolls_back_and_does_not_wedge_the_worker() {
        struct PanickingStrategy;
        impl Strategy for PanickingStrategy {
            fn on_init(&mut self, _ctx: &mut dyn ContextHandle, _config: Configuration) {}
            fn on_ticker(&mut self, ctx: &mut dyn ContextHandle, instrument: &Instrument, _ticker: &Ticker) {
                ctx.place(instrument, Setup::Market { side: Side::Buy, amount: dec!(1), options: Default::default() });
                panic!("boom");
            }
        }
        let exchange = Arc::new(FakeExchange::default());
        let ctx = Context::new(
            "strat-1",
            account("ACC1"),
            exchange as Arc<dyn DynExchange>,
            Storage::new(b"strat-1".to_vec()),
            ContextScheduler::new(),
            Box::new(PanickingStrategy),
        );
        let inst = instrument("PETR4");
        let ticker = Ticker {
            ts: now(),
            bid: dec!(1),
            bid_vol: dec!(1),
            ask: dec!(1),
            ask_vol: dec!(1),
            last: dec!(1),
            volume: dec!(1),
            index: dec!(1),
        };
        ctx.on_ticker(&inst, &ticker);

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| ctx.tick(now())));
        assert!(result.is_ok(), "Context::tick must itself not panic");
        assert!(!ctx.tick.lock().txn_open);
        assert!(ctx.tick.lock().batch_place.is_empty());
    }
}
