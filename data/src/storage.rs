//! Transactional key-value storage (C4): variables, open orders and fills behind a single
//! byte-keyed store, disambiguated by a one-byte tag prefix — `V` variables, `O` open
//! orders, `F` fills (see module docs for the exact key layout).

use crate::error::StorageError;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use vantage_execution::serialize::{decode_fill, encode_fill};
use vantage_execution::{Fill, SerializedOrder};
use vantage_markets::position::PositionId;
use vantage_markets::{InstrumentKind, Side};

const TAG_VAR: u8 = b'V';
const TAG_ORDER: u8 = b'O';
const TAG_FILL: u8 = b'F';

fn var_key(prefix: &[u8], name: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(prefix.len() + 1 + name.len());
    key.extend_from_slice(prefix);
    key.push(TAG_VAR);
    key.extend_from_slice(name.as_bytes());
    key
}

fn order_key(prefix: &[u8], order_id: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(prefix.len() + 1 + order_id.len());
    key.extend_from_slice(prefix);
    key.push(TAG_ORDER);
    key.extend_from_slice(order_id.as_bytes());
    key
}

fn fill_key(prefix: &[u8], time_ns: i64, fill_id: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(prefix.len() + 1 + 8 + fill_id.len());
    key.extend_from_slice(prefix);
    key.push(TAG_FILL);
    key.extend_from_slice(&time_ns.to_be_bytes());
    key.extend_from_slice(fill_id.as_bytes());
    key
}

fn fill_time_ns(fill: &Fill) -> i64 {
    fill.time.timestamp_nanos_opt().unwrap_or(0)
}

/// A pending write, staged until the outermost transaction commits.
enum Op {
    Put(Vec<u8>, Vec<u8>),
    Delete(Vec<u8>),
}

struct Txn {
    depth: u32,
    discarded: bool,
    overlay: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
}

/// How many fills [`Storage::load_fills`] should return: either the newest `n`, or every
/// fill strictly newer than a timestamp. Either way the result is ordered by `(time, id)`
/// ascending, so downstream aggregators (see [`Storage::load_positions`]) are commutative
/// regardless of which form was used to fetch them.
#[derive(Debug, Clone, Copy)]
pub enum FillsLimit {
    Count(usize),
    Since(DateTime<Utc>),
}

/// A position reconstructed by folding a Storage's fill history, the read model behind
/// `load_positions`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionSummary {
    pub pos_id: PositionId,
    pub side: Side,
    pub amount: Decimal,
    pub open_price: Decimal,
    pub realized_fees: Decimal,
}

/// Transactional key-value store. `begin_transaction`/`commit`/`rollback` nest via a depth
/// counter; only the outermost `commit` actually applies staged writes, and a `rollback` at
/// any depth marks the whole transaction discarded so later commits in the same nest become
/// no-ops.
pub struct Storage {
    prefix: Vec<u8>,
    base: Mutex<BTreeMap<Vec<u8>, Vec<u8>>>,
    txn: Mutex<Option<Txn>>,
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage")
            .field("entries", &self.base.lock().len())
            .finish()
    }
}

impl Storage {
    pub fn new(prefix: impl Into<Vec<u8>>) -> Self {
        Self {
            prefix: prefix.into(),
            base: Mutex::new(BTreeMap::new()),
            txn: Mutex::new(None),
        }
    }

    pub fn begin_transaction(&self) {
        let mut txn = self.txn.lock();
        match txn.as_mut() {
            Some(t) => t.depth += 1,
            None => {
                *txn = Some(Txn {
                    depth: 1,
                    discarded: false,
                    overlay: BTreeMap::new(),
                })
            }
        }
    }

    /// Decrements the nesting counter; the outermost call applies staged writes to the base
    /// store atomically, unless the transaction was marked discarded by an intervening
    /// `rollback`.
    pub fn commit(&self) -> Result<(), StorageError> {
        let mut txn_guard = self.txn.lock();
        let Some(txn) = txn_guard.as_mut() else {
            return Err(StorageError::new("commit without an open transaction"));
        };
        txn.depth -= 1;
        if txn.depth > 0 {
            return Ok(());
        }
        let finished = txn_guard.take().expect("checked Some above");
        if !finished.discarded {
            let mut base = self.base.lock();
            for (key, value) in finished.overlay {
                match value {
                    Some(bytes) => {
                        base.insert(key, bytes);
                    }
                    None => {
                        base.remove(&key);
                    }
                }
            }
        }
        Ok(())
    }

    /// Marks the current transaction discarded. Does not pop the nesting depth — the
    /// matching `commit` calls still need to fire to eventually clear the transaction, but
    /// they become no-ops because it is discarded.
    pub fn rollback(&self) {
        if let Some(txn) = self.txn.lock().as_mut() {
            txn.discarded = true;
        }
    }

    pub fn in_transaction(&self) -> bool {
        self.txn.lock().is_some()
    }

    fn stage(&self, op: Op) {
        let mut txn_guard = self.txn.lock();
        match txn_guard.as_mut() {
            Some(txn) => match op {
                Op::Put(k, v) => {
                    txn.overlay.insert(k, Some(v));
                }
                Op::Delete(k) => {
                    txn.overlay.insert(k, None);
                }
            },
            None => {
                // No open transaction: apply immediately (auto-commit of a single op).
                let mut base = self.base.lock();
                match op {
                    Op::Put(k, v) => {
                        base.insert(k, v);
                    }
                    Op::Delete(k) => {
                        base.remove(&k);
                    }
                }
            }
        }
    }

    /// Reads `key` through the merged view: the current transaction's overlay (if any),
    /// falling back to the committed base.
    fn read(&self, key: &[u8]) -> Option<Vec<u8>> {
        if let Some(txn) = self.txn.lock().as_ref() {
            if let Some(staged) = txn.overlay.get(key) {
                return staged.clone();
            }
        }
        self.base.lock().get(key).cloned()
    }

    /// Iterates a lexicographic key range through the merged view, newest overlay writes
    /// shadowing the base and overlay deletes suppressing it.
    fn scan(&self, start: &[u8], end_exclusive: &[u8]) -> Vec<(Vec<u8>, Vec<u8>)> {
        let mut merged: BTreeMap<Vec<u8>, Option<Vec<u8>>> = BTreeMap::new();
        for (k, v) in self
            .base
            .lock()
            .range(start.to_vec()..end_exclusive.to_vec())
        {
            merged.insert(k.clone(), Some(v.clone()));
        }
        if let Some(txn) = self.txn.lock().as_ref() {
            for (k, v) in txn.overlay.range(start.to_vec()..end_exclusive.to_vec()) {
                merged.insert(k.clone(), v.clone());
            }
        }
        merged
            .into_iter()
            .filter_map(|(k, v)| v.map(|v| (k, v)))
            .collect()
    }

    fn scan_prefix(&self, prefix: &[u8]) -> Vec<(Vec<u8>, Vec<u8>)> {
        let mut end = prefix.to_vec();
        // Lexicographic upper bound: increment the last byte, carrying as needed. An
        // all-0xFF prefix has no finite upper bound, so fall back to scanning everything
        // from `prefix` onward (acceptable: tag bytes in practice are never 0xFF).
        loop {
            match end.last_mut() {
                Some(b) if *b == 0xFF => {
                    end.pop();
                }
                Some(b) => {
                    *b += 1;
                    break;
                }
                None => break,
            }
        }
        if end.is_empty() {
            self.scan(prefix, &[0xFF; 64])
        } else {
            self.scan(prefix, &end)
        }
    }

    // --- Variables -----------------------------------------------------------------

    pub fn set_var(&self, name: &str, value: Vec<u8>) {
        self.stage(Op::Put(var_key(&self.prefix, name), value));
    }

    pub fn unset_var(&self, name: &str) {
        self.stage(Op::Delete(var_key(&self.prefix, name)));
    }

    pub fn get_var(&self, name: &str) -> Option<Vec<u8>> {
        self.read(&var_key(&self.prefix, name))
    }

    /// Iterates every variable whose name starts with `prefix`, lexicographically.
    pub fn enum_vars_prefix(&self, prefix: &str) -> Vec<(String, Vec<u8>)> {
        let base = var_key(&self.prefix, prefix);
        self.scan_prefix(&base)
            .into_iter()
            .filter_map(|(k, v)| strip_tag(&k, &self.prefix, TAG_VAR).map(|name| (name, v)))
            .collect()
    }

    /// Iterates every variable with name in `[start, end)`, lexicographically.
    pub fn enum_vars_range(&self, start: &str, end: &str) -> Vec<(String, Vec<u8>)> {
        let lo = var_key(&self.prefix, start);
        let hi = var_key(&self.prefix, end);
        self.scan(&lo, &hi)
            .into_iter()
            .filter_map(|(k, v)| strip_tag(&k, &self.prefix, TAG_VAR).map(|name| (name, v)))
            .collect()
    }

    // --- Open orders -----------------------------------------------------------------

    /// `is_done` interprets the order's current state: done orders are removed from
    /// storage in the same write as the causing report, never stored mid-done.
    pub fn put_order(&self, order: &SerializedOrder, is_done: bool) {
        let key = order_key(&self.prefix, &order.order_id);
        if is_done {
            self.stage(Op::Delete(key));
        } else {
            self.stage(Op::Put(key, order.order_content.clone()));
        }
    }

    pub fn remove_order(&self, order_id: &str) {
        self.stage(Op::Delete(order_key(&self.prefix, order_id)));
    }

    /// The set of "open orders" in storage: every order that has not reached a done state.
    pub fn load_open_orders(&self) -> Vec<SerializedOrder> {
        let base = order_key(&self.prefix, "");
        self.scan_prefix(&base)
            .into_iter()
            .filter_map(|(k, v)| {
                strip_tag(&k, &self.prefix, TAG_ORDER).map(|order_id| SerializedOrder {
                    order_id,
                    order_content: v,
                })
            })
            .collect()
    }

    // --- Fills -----------------------------------------------------------------

    /// Idempotent keyed by `(time, id)`: storing the same fill twice leaves a single record.
    pub fn put_fill(&self, fill: &Fill) {
        if self.is_duplicate_fill(fill) {
            return;
        }
        let key = fill_key(&self.prefix, fill_time_ns(fill), &fill.id);
        self.stage(Op::Put(key, encode_fill(fill).to_vec()));
    }

    /// Exact point lookup on `(time, id)`. A fill reported again with a different timestamp
    /// is *not* caught here — the data model treats that as a protocol error upstream, not a
    /// storage-level duplicate.
    pub fn is_duplicate_fill(&self, fill: &Fill) -> bool {
        let key = fill_key(&self.prefix, fill_time_ns(fill), &fill.id);
        self.read(&key).is_some()
    }

    /// Finds the already-stored fill with the given id, regardless of what timestamp it was
    /// stored under. `None` means the id has never been seen; `Some` with a `time` matching
    /// the candidate fill means an exact duplicate; `Some` with a different `time` means the
    /// same id was reported again under a different timestamp — the caller's protocol
    /// violation to handle, not a storage-level concern.
    pub fn find_fill_by_id(&self, fill_id: &str) -> Option<Fill> {
        let mut fill_prefix = self.prefix.clone();
        fill_prefix.push(TAG_FILL);
        self.scan_prefix(&fill_prefix)
            .into_iter()
            .filter_map(|(_, v)| decode_fill(v.into()).ok())
            .find(|f| f.id == fill_id)
    }

    /// Returns fills ordered by `(time, id)` ascending, selected either by count (newest
    /// `n`) or by a `since` timestamp (everything strictly newer).
    pub fn load_fills(&self, limit: FillsLimit, label_filter: &str) -> Vec<Fill> {
        let mut fill_prefix = self.prefix.clone();
        fill_prefix.push(TAG_FILL);
        let mut sorted: Vec<Fill> = self
            .scan_prefix(&fill_prefix)
            .into_iter()
            .filter_map(|(_, v)| decode_fill(v.into()).ok())
            .filter(|f| f.label.starts_with(label_filter))
            .collect();
        sorted.sort_by(|a, b| a.time.cmp(&b.time).then_with(|| a.id.cmp(&b.id)));
        match limit {
            FillsLimit::Count(n) => {
                let len = sorted.len();
                if len > n {
                    sorted.split_off(len - n)
                } else {
                    sorted
                }
            }
            FillsLimit::Since(ts) => sorted.into_iter().filter(|f| f.time > ts).collect(),
        }
    }

    /// Folds every stored fill whose label starts with `filter`, keyed by `pos_id`,
    /// computing running side, weighted open price and realized fees. Positions that net to
    /// zero amount are omitted. Inverse-contract fills invert price (`1/p`) and flip the
    /// signed amount before folding, per the data model's inverse-contract convention.
    pub fn load_positions(&self, filter: &str) -> Vec<PositionSummary> {
        let fills = self.load_fills(FillsLimit::Since(DateTime::<Utc>::MIN_UTC), filter);
        fold_positions(&fills)
    }
}

fn strip_tag(key: &[u8], prefix: &[u8], tag: u8) -> Option<String> {
    let head = key.get(..prefix.len() + 1)?;
    if head[..prefix.len()] != *prefix || head[prefix.len()] != tag {
        return None;
    }
    String::from_utf8(key[prefix.len() + 1..].to_vec()).ok()
}

fn signed_amount_and_price(fill: &Fill) -> (Decimal, Decimal) {
    if fill.instrument.kind == InstrumentKind::InverseContract {
        let price = if fill.price.is_zero() {
            Decimal::ZERO
        } else {
            Decimal::ONE / fill.price
        };
        let signed = match fill.side {
            Side::Buy => -fill.amount,
            Side::Sell => fill.amount,
        };
        (signed, price)
    } else {
        let signed = match fill.side {
            Side::Buy => fill.amount,
            Side::Sell => -fill.amount,
        };
        (signed, fill.price)
    }
}

fn fold_positions(fills: &[Fill]) -> Vec<PositionSummary> {
    struct Running {
        amount: Decimal,
        notional: Decimal,
        fees: Decimal,
    }
    let mut acc: BTreeMap<PositionId, Running> = BTreeMap::new();

    for fill in fills {
        let (signed_amount, price) = signed_amount_and_price(fill);
        let running = acc.entry(fill.pos_id).or_insert(Running {
            amount: Decimal::ZERO,
            notional: Decimal::ZERO,
            fees: Decimal::ZERO,
        });
        running.fees += fill.fees;

        let same_direction =
            running.amount.is_zero() || running.amount.is_sign_positive() == signed_amount.is_sign_positive();
        if same_direction {
            running.notional += signed_amount * price;
            running.amount += signed_amount;
        } else if signed_amount.abs() <= running.amount.abs() {
            // Pure reduction: the average open price of what remains is unchanged.
            let open_price = if running.amount.is_zero() {
                Decimal::ZERO
            } else {
                running.notional / running.amount
            };
            running.amount += signed_amount;
            running.notional = open_price * running.amount;
        } else {
            // Flips through zero: the excess opens a fresh position at this fill's price.
            let excess = running.amount + signed_amount;
            running.amount = excess;
            running.notional = excess * price;
        }
    }

    acc.into_iter()
        .filter(|(_, running)| !running.amount.is_zero())
        .map(|(pos_id, running)| {
            let open_price = running.notional / running.amount;
            let side = if running.amount.is_sign_positive() {
                Side::Buy
            } else {
                Side::Sell
            };
            PositionSummary {
                pos_id,
                side,
                amount: running.amount.abs(),
                open_price,
                realized_fees: running.fees,
            }
        })
        .collect()
}
