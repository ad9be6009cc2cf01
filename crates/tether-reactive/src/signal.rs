#![forbid(unsafe_code)]

//! Push-based event streams.
//!
//! A [`Signal<T>`] is a subscribe function: observing it attaches a callback
//! and yields a [`Disposable`] that detaches it. [`Pipe<T>`] is the multicast
//! source — adapters and properties push events into a pipe and hand out its
//! signal. Combinators ([`Signal::map`], [`Signal::filter`],
//! [`Signal::filter_map`], [`Signal::observe_on`]) are lazy: they wrap the
//! subscribe function and never buffer or re-subscribe the source.
//!
//! Streams carry exactly two event kinds — [`SignalEvent::Value`] and
//! [`SignalEvent::Completed`]. There is no failure or interruption event:
//! contract-violating stream terminations are unrepresentable by
//! construction.
//!
//! # Invariants
//!
//! 1. Observers receive events in emission order.
//! 2. After `Completed`, no further events are delivered; late observers
//!    receive `Completed` immediately on attach.
//! 3. Disposing an observation stops delivery, including deliveries already
//!    in flight on another thread's snapshot.
//! 4. No pipe lock is held while observer callbacks run.
//!
//! # Failure Modes
//!
//! - Observer panics: propagates to the emitting caller.
//! - Recursive emission into the same pipe from one of its own observers is
//!   unsupported (precondition; the emitting callback would self-deadlock on
//!   its own observer slot).

use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::disposable::Disposable;
use crate::scheduler::SharedScheduler;

/// An event delivered to a signal observer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignalEvent<T> {
    /// A new value.
    Value(T),
    /// The stream terminated normally; nothing follows.
    Completed,
}

impl<T> SignalEvent<T> {
    /// Transform the payload, preserving completion.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> SignalEvent<U> {
        match self {
            SignalEvent::Value(value) => SignalEvent::Value(f(value)),
            SignalEvent::Completed => SignalEvent::Completed,
        }
    }

    /// The carried value, if any.
    pub fn into_value(self) -> Option<T> {
        match self {
            SignalEvent::Value(value) => Some(value),
            SignalEvent::Completed => None,
        }
    }
}

pub(crate) type BoxObserver<T> = Box<dyn FnMut(SignalEvent<T>) + Send>;
type ObserveFn<T> = dyn Fn(BoxObserver<T>) -> Disposable + Send + Sync;

/// A push stream of `T`. Cloning shares the same source.
pub struct Signal<T> {
    observe_fn: Arc<ObserveFn<T>>,
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            observe_fn: Arc::clone(&self.observe_fn),
        }
    }
}

impl<T> std::fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal").finish()
    }
}

impl<T: Send + 'static> Signal<T> {
    /// Build a signal from its subscribe function.
    pub(crate) fn from_observe(
        f: impl Fn(BoxObserver<T>) -> Disposable + Send + Sync + 'static,
    ) -> Self {
        Self {
            observe_fn: Arc::new(f),
        }
    }

    /// A signal that never emits and never completes.
    #[must_use]
    pub fn never() -> Self {
        Signal::from_observe(|_observer| Disposable::noop())
    }

    /// Attach an observer for every event.
    pub fn observe(&self, f: impl FnMut(SignalEvent<T>) + Send + 'static) -> Disposable {
        (self.observe_fn)(Box::new(f))
    }

    /// Attach an observer for value events only.
    pub fn observe_values(&self, mut f: impl FnMut(T) + Send + 'static) -> Disposable {
        self.observe(move |event| {
            if let SignalEvent::Value(value) = event {
                f(value);
            }
        })
    }

    /// Transform every value with `f`.
    #[must_use]
    pub fn map<U: Send + 'static>(
        &self,
        f: impl Fn(T) -> U + Send + Sync + 'static,
    ) -> Signal<U> {
        let source = self.clone();
        let f = Arc::new(f);
        Signal::from_observe(move |observer| {
            let mut observer = observer;
            let f = Arc::clone(&f);
            source.observe(move |event| observer(event.map(|value| f(value))))
        })
    }

    /// Drop values failing the predicate.
    #[must_use]
    pub fn filter(&self, predicate: impl Fn(&T) -> bool + Send + Sync + 'static) -> Signal<T> {
        let source = self.clone();
        let predicate = Arc::new(predicate);
        Signal::from_observe(move |observer| {
            let mut observer = observer;
            let predicate = Arc::clone(&predicate);
            source.observe(move |event| match event {
                SignalEvent::Value(value) if predicate(&value) => {
                    observer(SignalEvent::Value(value));
                }
                SignalEvent::Value(_) => {}
                SignalEvent::Completed => observer(SignalEvent::Completed),
            })
        })
    }

    /// Map and filter in one pass: `None` results are dropped.
    #[must_use]
    pub fn filter_map<U: Send + 'static>(
        &self,
        f: impl Fn(T) -> Option<U> + Send + Sync + 'static,
    ) -> Signal<U> {
        let source = self.clone();
        let f = Arc::new(f);
        Signal::from_observe(move |observer| {
            let mut observer = observer;
            let f = Arc::clone(&f);
            source.observe(move |event| match event {
                SignalEvent::Value(value) => {
                    if let Some(mapped) = f(value) {
                        observer(SignalEvent::Value(mapped));
                    }
                }
                SignalEvent::Completed => observer(SignalEvent::Completed),
            })
        })
    }

    /// Redirect event delivery onto `scheduler`, preserving order.
    ///
    /// Disposing the observation also suppresses deliveries that were
    /// already scheduled but have not run yet.
    #[must_use]
    pub fn observe_on(&self, scheduler: SharedScheduler) -> Signal<T> {
        let source = self.clone();
        Signal::from_observe(move |observer| {
            let observer = Arc::new(Mutex::new(observer));
            let live = Arc::new(AtomicBool::new(true));
            let subscription = {
                let observer = Arc::clone(&observer);
                let live = Arc::clone(&live);
                let scheduler = Arc::clone(&scheduler);
                source.observe(move |event| {
                    let observer = Arc::clone(&observer);
                    let live = Arc::clone(&live);
                    let _scheduled = scheduler.schedule(Box::new(move || {
                        if live.load(Ordering::Acquire) {
                            (observer.lock())(event);
                        }
                    }));
                })
            };
            Disposable::new(move || {
                live.store(false, Ordering::Release);
                subscription.dispose();
            })
        })
    }
}

struct PipeObserver<T> {
    id: u64,
    live: Arc<AtomicBool>,
    callback: Arc<Mutex<BoxObserver<T>>>,
}

struct PipeState<T> {
    observers: Vec<PipeObserver<T>>,
    completed: bool,
    next_id: u64,
}

struct PipeInner<T> {
    state: Mutex<PipeState<T>>,
}

/// Multicast event source backing a [`Signal`].
pub struct Pipe<T> {
    inner: Arc<PipeInner<T>>,
}

impl<T> Clone for Pipe<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Clone + Send + 'static> Pipe<T> {
    /// Create a pipe with no observers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(PipeInner {
                state: Mutex::new(PipeState {
                    observers: Vec::new(),
                    completed: false,
                    next_id: 0,
                }),
            }),
        }
    }

    /// Deliver `value` to every live observer. No-op after completion.
    pub fn send(&self, value: T) {
        let snapshot: Vec<(Arc<AtomicBool>, Arc<Mutex<BoxObserver<T>>>)> = {
            let state = self.inner.state.lock();
            if state.completed {
                return;
            }
            state
                .observers
                .iter()
                .map(|o| (Arc::clone(&o.live), Arc::clone(&o.callback)))
                .collect()
        };
        for (live, callback) in snapshot {
            if live.load(Ordering::Acquire) {
                (callback.lock())(SignalEvent::Value(value.clone()));
            }
        }
    }

    /// Terminate the stream. Observers receive `Completed` and are dropped;
    /// later sends are ignored and later observers complete immediately.
    pub fn complete(&self) {
        let observers = {
            let mut state = self.inner.state.lock();
            if state.completed {
                return;
            }
            state.completed = true;
            std::mem::take(&mut state.observers)
        };
        for observer in observers {
            if observer.live.load(Ordering::Acquire) {
                (observer.callback.lock())(SignalEvent::Completed);
            }
        }
    }

    /// Whether `complete()` has been called.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.inner.state.lock().completed
    }

    /// Number of currently attached observers.
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.inner.state.lock().observers.len()
    }

    /// The observable side of this pipe.
    #[must_use]
    pub fn signal(&self) -> Signal<T> {
        let inner = Arc::clone(&self.inner);
        Signal::from_observe(move |observer| Pipe::attach(&inner, observer))
    }

    fn attach(inner: &Arc<PipeInner<T>>, mut observer: BoxObserver<T>) -> Disposable {
        let live = Arc::new(AtomicBool::new(true));
        let id = {
            let mut state = inner.state.lock();
            if state.completed {
                drop(state);
                observer(SignalEvent::Completed);
                return Disposable::noop();
            }
            let id = state.next_id;
            state.next_id += 1;
            state.observers.push(PipeObserver {
                id,
                live: Arc::clone(&live),
                callback: Arc::new(Mutex::new(observer)),
            });
            id
        };
        let weak = Arc::downgrade(inner);
        Disposable::new(move || {
            live.store(false, Ordering::Release);
            if let Some(inner) = weak.upgrade() {
                inner.state.lock().observers.retain(|o| o.id != id);
            }
        })
    }

    /// Attach a raw observer directly, bypassing the [`Signal`] wrapper.
    /// Used by producers that must attach while holding their own state
    /// lock.
    pub(crate) fn attach_observer(&self, observer: BoxObserver<T>) -> Disposable {
        Pipe::attach(&self.inner, observer)
    }
}

impl<T: Clone + Send + 'static> Default for Pipe<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for Pipe<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipe").finish()
    }
}
