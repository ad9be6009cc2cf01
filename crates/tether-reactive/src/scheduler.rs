#![forbid(unsafe_code)]

//! The UI-affine scheduling context.
//!
//! Controls must only be read or written on one cooperative, single-threaded
//! context. [`UiScheduler`] models that context explicitly so the binding
//! engine is testable without a real UI thread: it pins itself to the thread
//! that created it, and [`UiScheduler::run`] drains queued work on that
//! thread.
//!
//! # Invariants
//!
//! 1. Work submitted from the pinned thread while the queue is empty runs
//!    inline, synchronously, before `schedule` returns. This is what lets a
//!    re-entrancy flag suppress echo writes scheduled mid-update.
//! 2. Otherwise work is queued and `run()` executes it in submission order.
//! 3. Cancelling the returned [`Disposable`] before the work runs prevents
//!    it from ever running; cancelling afterwards is a no-op.
//! 4. Work scheduled by running work joins the back of the same drain.
//!
//! # Failure Modes
//!
//! - `run()` off the pinned thread: debug assertion; in release the call
//!   drains anyway (callers own thread discipline).
//! - Work panics: propagates; the queue keeps the remaining items.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread::{self, ThreadId};

use crate::disposable::Disposable;

/// A unit of work accepted by a [`Scheduler`].
pub type Work = Box<dyn FnOnce() + Send>;

/// An executor that runs callbacks later (or inline), in submission order,
/// on a single logical context.
pub trait Scheduler: Send + Sync {
    /// Submit `work`. The returned disposable cancels it if it has not run.
    fn schedule(&self, work: Work) -> Disposable;
}

/// Shared handle to a scheduler, as the binding engine consumes it.
pub type SharedScheduler = Arc<dyn Scheduler>;

struct QueueItem {
    cancelled: Arc<AtomicBool>,
    work: Work,
}

/// Serialized, thread-pinned cooperative scheduler.
///
/// The creating thread is the "UI thread". Any thread may submit work; only
/// the UI thread may drain it.
#[derive(Clone)]
pub struct UiScheduler {
    inner: Arc<UiInner>,
}

struct UiInner {
    thread: ThreadId,
    // Counts queued plus currently-executing items; gates the inline path.
    in_flight: AtomicUsize,
    queue: Mutex<VecDeque<QueueItem>>,
}

impl UiScheduler {
    /// Create a scheduler pinned to the calling thread.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(UiInner {
                thread: thread::current().id(),
                in_flight: AtomicUsize::new(0),
                queue: Mutex::new(VecDeque::new()),
            }),
        }
    }

    /// Whether the calling thread is the pinned UI thread.
    #[must_use]
    pub fn is_ui_thread(&self) -> bool {
        thread::current().id() == self.inner.thread
    }

    /// Number of queued (not yet executed) items.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.inner.queue.lock().len()
    }

    /// Drain the queue on the UI thread, executing items in order. Items
    /// scheduled while draining are executed in the same call.
    pub fn run(&self) {
        debug_assert!(
            self.is_ui_thread(),
            "UiScheduler::run must be called on the thread the scheduler was created on"
        );
        loop {
            let item = self.inner.queue.lock().pop_front();
            let Some(item) = item else { break };
            if !item.cancelled.load(Ordering::Acquire) {
                (item.work)();
            }
            self.inner.in_flight.fetch_sub(1, Ordering::AcqRel);
        }
    }

    /// Type-erased handle for APIs that take a [`SharedScheduler`].
    #[must_use]
    pub fn shared(&self) -> SharedScheduler {
        Arc::new(self.clone())
    }
}

impl Default for UiScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for UiScheduler {
    fn schedule(&self, work: Work) -> Disposable {
        let cancelled = Arc::new(AtomicBool::new(false));
        let handle = {
            let cancelled = Arc::clone(&cancelled);
            Disposable::new(move || cancelled.store(true, Ordering::Release))
        };

        let previous = self.inner.in_flight.fetch_add(1, Ordering::AcqRel);
        if previous == 0 && self.is_ui_thread() {
            // Nothing ahead of us and we are already on the UI thread: run
            // inline so callers observe the write before schedule returns.
            if !cancelled.load(Ordering::Acquire) {
                work();
            }
            self.inner.in_flight.fetch_sub(1, Ordering::AcqRel);
        } else {
            self.inner.queue.lock().push_back(QueueItem { cancelled, work });
        }
        handle
    }
}

impl std::fmt::Debug for UiScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UiScheduler")
            .field("pending", &self.pending())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn runs_inline_on_ui_thread_when_idle() {
        let ui = UiScheduler::new();
        let ran = Arc::new(AtomicBool::new(false));
        let r = Arc::clone(&ran);
        let _d = ui.schedule(Box::new(move || r.store(true, Ordering::SeqCst)));
        assert!(ran.load(Ordering::SeqCst), "idle UI-thread submission must run inline");
        assert_eq!(ui.pending(), 0);
    }

    #[test]
    fn queues_from_other_threads() {
        let ui = UiScheduler::new();
        let ran = Arc::new(AtomicBool::new(false));
        {
            let ui = ui.clone();
            let ran = Arc::clone(&ran);
            thread::spawn(move || {
                let _d = ui.schedule(Box::new(move || ran.store(true, Ordering::SeqCst)));
            })
            .join()
            .expect("worker thread");
        }
        assert!(!ran.load(Ordering::SeqCst), "background submission must not run eagerly");
        assert_eq!(ui.pending(), 1);

        ui.run();
        assert!(ran.load(Ordering::SeqCst));
        assert_eq!(ui.pending(), 0);
    }

    #[test]
    fn preserves_submission_order() {
        let ui = UiScheduler::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        {
            let ui = ui.clone();
            let order = Arc::clone(&order);
            thread::spawn(move || {
                for i in 0..5 {
                    let order = Arc::clone(&order);
                    let _d = ui.schedule(Box::new(move || order.lock().push(i)));
                }
            })
            .join()
            .expect("worker thread");
        }
        ui.run();
        assert_eq!(*order.lock(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn cancelled_work_never_runs() {
        let ui = UiScheduler::new();
        let count = Arc::new(AtomicUsize::new(0));
        {
            let ui = ui.clone();
            let count = Arc::clone(&count);
            let handle = thread::spawn(move || {
                let c = Arc::clone(&count);
                ui.schedule(Box::new(move || {
                    c.fetch_add(1, Ordering::SeqCst);
                }))
            });
            let d = handle.join().expect("worker thread");
            d.dispose();
        }
        ui.run();
        assert_eq!(count.load(Ordering::SeqCst), 0, "cancelled item must be skipped");
    }

    #[test]
    fn nested_schedule_joins_current_drain() {
        let ui = UiScheduler::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        {
            let ui2 = ui.clone();
            let order2 = Arc::clone(&order);
            let ui3 = ui.clone();
            thread::spawn(move || {
                let _d = ui3.schedule(Box::new(move || {
                    order2.lock().push("outer");
                    let order3 = Arc::clone(&order2);
                    let _d2 = ui2.schedule(Box::new(move || order3.lock().push("inner")));
                }));
            })
            .join()
            .expect("worker thread");
        }
        ui.run();
        assert_eq!(*order.lock(), vec!["outer", "inner"]);
    }

    #[test]
    fn inline_path_respects_prior_queue() {
        let ui = UiScheduler::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        {
            let ui = ui.clone();
            let order = Arc::clone(&order);
            thread::spawn(move || {
                let order = Arc::clone(&order);
                let _d = ui.schedule(Box::new(move || order.lock().push("queued")));
            })
            .join()
            .expect("worker thread");
        }
        // Queue is non-empty, so even a UI-thread submission must wait.
        let o = Arc::clone(&order);
        let _d = ui.schedule(Box::new(move || o.lock().push("later")));
        assert!(order.lock().is_empty());

        ui.run();
        assert_eq!(*order.lock(), vec!["queued", "later"]);
    }
}
