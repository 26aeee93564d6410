//! Global ContextScheduler (C3): the single worker thread that dispatches timed wakeups to
//! every registered Context.

use crate::priority_queue::PriorityQueue;
use chrono::{DateTime, Utc};
use parking_lot::{Condvar, Mutex};
use std::cmp::Ordering;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::thread::JoinHandle;

/// Invoked by the worker thread when a Context's wakeup time has arrived. Must not block on
/// I/O — a Context's implementation locks its own Scheduler, dispatches one event, and
/// returns.
pub type WakeupFn = Box<dyn Fn(DateTime<Utc>) + Send + Sync>;

struct Slot {
    reg: usize,
    wakeup_fn: Arc<WakeupFn>,
    ts: DateTime<Utc>,
    seq: u64,
}

/// Earlier `ts` outranks later; equal `ts` breaks by *higher* insertion sequence (LIFO) —
/// deliberately, so a Context that just requested re-entry runs before siblings waiting at
/// the same tick.
fn slot_cmp(a: &Slot, b: &Slot) -> Ordering {
    match b.ts.cmp(&a.ts) {
        Ordering::Equal => a.seq.cmp(&b.seq),
        other => other,
    }
}

/// A Context's back-link into the ContextScheduler's queue. Two-way invariant: the
/// registration's slot (if any) always points back here via `reg`, and erasing the slot
/// always clears the registration's bookkeeping — both sides are mutated together under
/// `ContextScheduler`'s lock, so there's no path where one drifts from the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registration(usize);

struct Inner {
    queue: PriorityQueue<Slot, fn(&Slot, &Slot) -> Ordering>,
    /// Indexed by `Registration.0`. `Some(handle)` while the registration currently has a
    /// pending slot in `queue`; `None` while unset (registered but not scheduled).
    back_links: Vec<Option<crate::priority_queue::Handle>>,
    wakeup_fns: Vec<Arc<WakeupFn>>,
    free_regs: Vec<usize>,
    next_seq: u64,
}

/// Owns the single worker thread and the wall-clock priority queue of Context registrations.
pub struct ContextScheduler {
    inner: Mutex<Inner>,
    condvar: Condvar,
    stopped: AtomicBool,
}

impl ContextScheduler {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(Inner {
                queue: PriorityQueue::new(slot_cmp as fn(&Slot, &Slot) -> Ordering),
                back_links: Vec::new(),
                wakeup_fns: Vec::new(),
                free_regs: Vec::new(),
                next_seq: 0,
            }),
            condvar: Condvar::new(),
            stopped: AtomicBool::new(false),
        })
    }

    /// Registers a Context's wakeup callback. The registration starts unscheduled; call
    /// [`set`](Self::set) to place it on the queue.
    pub fn register(&self, wakeup_fn: WakeupFn) -> Registration {
        let mut inner = self.inner.lock();
        let wakeup_fn = Arc::new(wakeup_fn);
        if let Some(id) = inner.free_regs.pop() {
            inner.back_links[id] = None;
            inner.wakeup_fns[id] = wakeup_fn;
            Registration(id)
        } else {
            inner.back_links.push(None);
            inner.wakeup_fns.push(wakeup_fn);
            Registration(inner.back_links.len() - 1)
        }
    }

    /// Schedules (or reschedules) `reg` for wakeup at `ts`. Updates the existing slot
    /// in-place if one exists, else inserts. `O(log n)`.
    pub fn set(&self, reg: Registration, ts: DateTime<Utc>) {
        let mut inner = self.inner.lock();
        inner.next_seq += 1;
        let seq = inner.next_seq;
        let wakeup_fn = inner.wakeup_fns[reg.0].clone();
        match inner.back_links[reg.0] {
            Some(handle) => inner.queue.replace(
                handle,
                Slot {
                    reg: reg.0,
                    wakeup_fn,
                    ts,
                    seq,
                },
            ),
            None => {
                let handle = inner.queue.push(Slot {
                    reg: reg.0,
                    wakeup_fn,
                    ts,
                    seq,
                });
                inner.back_links[reg.0] = Some(handle);
            }
        }
        drop(inner);
        self.condvar.notify_all();
    }

    /// Removes `reg` from the queue, if currently scheduled. `O(log n)`.
    pub fn unset(&self, reg: Registration) {
        let mut inner = self.inner.lock();
        if let Some(handle) = inner.back_links[reg.0].take() {
            inner.queue.erase(handle);
        }
        drop(inner);
        self.condvar.notify_all();
    }

    /// Unregisters `reg` entirely (the owning Context is being destroyed). Implies `unset`.
    pub fn deregister(&self, reg: Registration) {
        self.unset(reg);
        let mut inner = self.inner.lock();
        inner.free_regs.push(reg.0);
    }

    /// Aborts the worker loop and its condvar wait. No further wakeups are delivered after
    /// this returns.
    pub fn stop(&self) {
        self.stopped.store(true, AtomicOrdering::Release);
        self.condvar.notify_all();
    }

    fn is_stopped(&self) -> bool {
        self.stopped.load(AtomicOrdering::Acquire)
    }

    /// The worker loop body: under the lock, wait until the earliest registration is due (or
    /// the queue is empty, or stopped), pop it, release the lock, invoke its wakeup
    /// callback, and repeat.
    fn run(self: &Arc<Self>) {
        loop {
            let due_slot = {
                let mut inner = self.inner.lock();
                loop {
                    if self.is_stopped() {
                        return;
                    }
                    match inner.queue.top() {
                        None => {
                            self.condvar.wait(&mut inner);
                        }
                        Some(slot) => {
                            let now = Utc::now();
                            if slot.ts <= now {
                                break;
                            }
                            let timeout = (slot.ts - now).to_std().unwrap_or_default();
                            let _ = self.condvar.wait_for(&mut inner, timeout);
                        }
                    }
                }
                let slot = inner.queue.pop().expect("loop only breaks when non-empty");
                inner.back_links[slot.reg] = None;
                slot
            };
            (due_slot.wakeup_fn)(Utc::now());
        }
    }

    /// Spawns the worker thread, returning a joinable handle. Call [`stop`](Self::stop) to
    /// end it.
    pub fn spawn(self: &Arc<Self>) -> JoinHandle<()> {
        let scheduler = Arc::clone(self);
        std::thread::Builder::new()
            .name("vantage-context-scheduler".into())
            .spawn(move || scheduler.run())
            .expect("failed to spawn ContextScheduler worker thread")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;
    use std::time::Duration;

    fn now_plus_millis(ms: i64) -> DateTime<Utc> {
        Utc::now() + chrono::Duration::milliseconds(ms)
    }

    #[test]
    fn dispatches_registration_once_due() {
        let scheduler = ContextScheduler::new();
        let fired = Arc::new(AtomicU32::new(0));
        let f = fired.clone();
        let reg = scheduler.register(Box::new(move |_now| {
            f.fetch_add(1, AtomicOrdering::SeqCst);
        }));
        scheduler.set(reg, now_plus_millis(10));
        let handle = scheduler.spawn();

        std::thread::sleep(Duration::from_millis(100));
        scheduler.stop();
        handle.join().unwrap();

        assert_eq!(fired.load(AtomicOrdering::SeqCst), 1);
    }

    #[test]
    fn equal_ts_registrations_dispatch_lifo_by_insertion() {
        let scheduler = ContextScheduler::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        let ts = now_plus_millis(20);
        let mut regs = Vec::new();
        for id in 0..3 {
            let o = order.clone();
            let reg = scheduler.register(Box::new(move |_now| o.lock().push(id)));
            regs.push(reg);
        }
        for reg in &regs {
            scheduler.set(*reg, ts);
        }
        let handle = scheduler.spawn();
        std::thread::sleep(Duration::from_millis(150));
        scheduler.stop();
        handle.join().unwrap();

        assert_eq!(*order.lock(), vec![2, 1, 0]);
    }

    #[test]
    fn unset_prevents_dispatch() {
        let scheduler = ContextScheduler::new();
        let fired = Arc::new(AtomicU32::new(0));
        let f = fired.clone();
        let reg = scheduler.register(Box::new(move |_now| {
            f.fetch_add(1, AtomicOrdering::SeqCst);
        }));
        scheduler.set(reg, now_plus_millis(10));
        scheduler.unset(reg);
        let handle = scheduler.spawn();
        std::thread::sleep(Duration::from_millis(60));
        scheduler.stop();
        handle.join().unwrap();
        assert_eq!(fired.load(AtomicOrdering::SeqCst), 0);
    }

    #[test]
    fn stop_aborts_loop_without_further_wakeups() {
        let scheduler = ContextScheduler::new();
        let fired = Arc::new(AtomicU32::new(0));
        let f = fired.clone();
        let reg = scheduler.register(Box::new(move |_now| {
            f.fetch_add(1, AtomicOrdering::SeqCst);
        }));
        scheduler.set(reg, now_plus_millis(500));
        let handle = scheduler.spawn();
        std::thread::sleep(Duration::from_millis(20));
        scheduler.stop();
        handle.join().unwrap();
        assert_eq!(fired.load(AtomicOrdering::SeqCst), 0);
    }
}
