//! Per-Context event scheduler (C2): immediate, collapsing, and timed queues, with a
//! `wakeup` call that dispatches at most one closure and hints at when to call again.

use crate::priority_queue::{Handle, Hint, PriorityQueue};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use parking_lot::Mutex;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, VecDeque};

/// A unit of work enqueued into the [`Scheduler`]. Queued from any thread, run on none but
/// the Context's own worker thread, never while the Scheduler's internal lock is held.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

struct TimedEntry {
    due: DateTime<Utc>,
    seq: u64,
    job: Job,
}

/// Earlier `due` outranks later; among equal `due`, the later-inserted entry outranks the
/// earlier one (LIFO), matching the boundary case in the design doc ("Scheduler with
/// equal-timestamp timers: LIFO by insertion").
fn timed_cmp(a: &TimedEntry, b: &TimedEntry) -> Ordering {
    match b.due.cmp(&a.due) {
        Ordering::Equal => a.seq.cmp(&b.seq),
        other => other,
    }
}

struct Inner {
    immediate: VecDeque<Job>,
    /// Outer key is the event class (ticker=1, orderbook=2, …); inner map is the
    /// per-instrument collapsing slot. `IndexMap` keeps per-class FIFO ordering across
    /// distinct sub-keys stable (a sub-key's position is set on its *first* insertion) while
    /// re-inserting the same sub-key overwrites its job in place — "latest value wins"
    /// without disturbing where it sits relative to other instruments.
    collapsing: BTreeMap<u32, IndexMap<String, Job>>,
    timed: PriorityQueue<TimedEntry, fn(&TimedEntry, &TimedEntry) -> Ordering>,
    timer_handles: HashMap<u64, Handle>,
    next_seq: u64,
    /// The wakeup time this Scheduler last reported, used to decide whether a newly
    /// enqueued event needs to arm `notify`.
    armed_floor: Option<DateTime<Utc>>,
}

impl Inner {
    fn next_wakeup_hint(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        if !self.immediate.is_empty() {
            return Some(now);
        }
        if self.collapsing.values().any(|m| !m.is_empty()) {
            return Some(now);
        }
        self.timed.top().map(|e| e.due)
    }

    /// Arms `notify` whenever the next wakeup demand strictly decreased, including down to
    /// at-or-before "now" — an immediate or collapsing enqueue must still re-arm a Context
    /// that is currently unscheduled (or scheduled further out), or its worker thread never
    /// wakes to run the new work.
    fn maybe_notify(&mut self, hint: Option<DateTime<Utc>>, notify: impl FnOnce(DateTime<Utc>)) {
        if let Some(ts) = hint {
            let should_notify = self.armed_floor.map_or(true, |floor| ts < floor);
            if should_notify {
                notify(ts);
            }
        }
        self.armed_floor = hint;
    }

    fn pop_runnable(&mut self, now: DateTime<Utc>) -> Option<Job> {
        if let Some(job) = self.immediate.pop_front() {
            return Some(job);
        }
        for slot in self.collapsing.values_mut() {
            if !slot.is_empty() {
                let (_, job) = slot.shift_remove_index(0).expect("checked non-empty");
                return Some(job);
            }
        }
        if self.timed.top().is_some_and(|e| e.due <= now) {
            let entry = self.timed.pop().expect("checked non-empty");
            self.timer_handles.retain(|_, h| self.timed.get(*h).is_some());
            return Some(entry.job);
        }
        None
    }
}

/// Per-Context event demultiplexer. See the design doc §4.2 for the dispatch rule:
/// immediate strictly first, then the lowest-id non-empty collapsing class, then the
/// earliest due timer.
pub struct Scheduler {
    inner: Mutex<Inner>,
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler").finish()
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                immediate: VecDeque::new(),
                collapsing: BTreeMap::new(),
                timed: PriorityQueue::new(timed_cmp),
                timer_handles: HashMap::new(),
                next_seq: 0,
                armed_floor: None,
            }),
        }
    }

    /// Enqueues a FIFO closure, strictly higher priority than collapsing or timed work.
    pub fn enqueue_immediate(&self, job: Job, now: DateTime<Utc>, notify: impl FnOnce(DateTime<Utc>)) {
        let mut inner = self.inner.lock();
        inner.immediate.push_back(job);
        let hint = inner.next_wakeup_hint(now);
        inner.maybe_notify(hint, notify);
    }

    /// Enqueues into the collapsing slot `(class, sub_key)`. If a job is already pending for
    /// that exact key, it is replaced rather than appended — only the latest observation is
    /// delivered.
    pub fn enqueue_collapsing(
        &self,
        class: u32,
        sub_key: impl Into<String>,
        job: Job,
        now: DateTime<Utc>,
        notify: impl FnOnce(DateTime<Utc>),
    ) {
        let mut inner = self.inner.lock();
        inner
            .collapsing
            .entry(class)
            .or_default()
            .insert(sub_key.into(), job);
        let hint = inner.next_wakeup_hint(now);
        inner.maybe_notify(hint, notify);
    }

    /// Arms (or re-arms) a timer identified by `id`. Re-using an `id` that is already
    /// pending cancels the old entry first, matching `clear_timer` semantics.
    pub fn set_timer(
        &self,
        id: u64,
        due: DateTime<Utc>,
        job: Job,
        now: DateTime<Utc>,
        notify: impl FnOnce(DateTime<Utc>),
    ) {
        let mut inner = self.inner.lock();
        if let Some(handle) = inner.timer_handles.remove(&id) {
            inner.timed.erase(handle);
        }
        inner.next_seq += 1;
        let seq = inner.next_seq;
        let handle = inner.timed.push(TimedEntry { due, seq, job });
        inner.timer_handles.insert(id, handle);
        let hint = inner.next_wakeup_hint(now);
        inner.maybe_notify(hint, notify);
    }

    /// Cancels a pending timer. Returns whether an entry was actually removed — `false` if
    /// the timer already fired or was never set.
    pub fn clear_timer(&self, id: u64) -> bool {
        let mut inner = self.inner.lock();
        match inner.timer_handles.remove(&id) {
            Some(handle) => inner.timed.erase(handle).is_some(),
            None => false,
        }
    }

    /// Pops and runs at most one runnable closure (without holding the internal lock while
    /// it runs), then returns the time at which `wakeup` should next be called — `None`
    /// means "no pending work, wait indefinitely" (the +∞ case).
    pub fn wakeup(&self, now: DateTime<Utc>, notify: impl FnOnce(DateTime<Utc>)) -> Option<DateTime<Utc>> {
        let popped = {
            let mut inner = self.inner.lock();
            inner.pop_runnable(now)
        };
        if let Some(job) = popped {
            job();
        }
        let mut inner = self.inner.lock();
        let hint = inner.next_wakeup_hint(now);
        inner.maybe_notify(hint, notify);
        hint
    }
}
