#![forbid(unsafe_code)]

//! Composable mutable properties.
//!
//! A [`Property<T>`] is an observable state cell: synchronous reads and
//! writes, a change stream, and a lifetime that ends when the last handle
//! drops. It is the model-side endpoint of a value binding.
//!
//! # Invariants
//!
//! 1. `changes()` emits every write, in write order, with no equality
//!    filtering — binding works for non-comparable value types.
//! 2. `with_exclusive` holds the value lock for the whole closure: no write
//!    can land (or notify) between reading the current value and whatever
//!    setup the closure performs.
//! 3. Dropping the last handle completes the change stream and ends the
//!    lifetime, in that order.
//!
//! Property operations are synchronous and must not be re-entered from the
//! property's own change observers (the value lock is not re-entrant). This
//! is the documented precondition that lets the binding engine use a plain
//! boolean as its feedback-loop breaker.

use parking_lot::Mutex;
use std::sync::{Arc, Weak};

use crate::disposable::Disposable;
use crate::lifetime::{Lifetime, LifetimeToken};
use crate::signal::{Pipe, Signal, SignalEvent};

struct PropertyInner<T: Clone + Send + 'static> {
    value: Mutex<T>,
    changes: Pipe<T>,
    lifetime: Lifetime,
    _token: LifetimeToken,
}

impl<T: Clone + Send + 'static> Drop for PropertyInner<T> {
    fn drop(&mut self) {
        // Complete the stream before the token field drops and ends the
        // lifetime; bindings tear down on whichever arrives first.
        self.changes.complete();
    }
}

/// An observable, synchronously readable/writable state cell.
///
/// Cloning shares the cell. The change stream and lifetime survive only as
/// long as some handle does.
pub struct Property<T: Clone + Send + 'static> {
    inner: Arc<PropertyInner<T>>,
}

impl<T: Clone + Send + 'static> Clone for Property<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Clone + Send + 'static> Property<T> {
    /// Create a property holding `initial`.
    #[must_use]
    pub fn new(initial: T) -> Self {
        let (lifetime, token) = Lifetime::make();
        Self {
            inner: Arc::new(PropertyInner {
                value: Mutex::new(initial),
                changes: Pipe::new(),
                lifetime,
                _token: token,
            }),
        }
    }

    /// Snapshot the current value.
    #[must_use]
    pub fn get(&self) -> T {
        self.inner.value.lock().clone()
    }

    /// Write a new value and notify change observers.
    pub fn set(&self, value: T) {
        let mut guard = self.inner.value.lock();
        *guard = value.clone();
        // Emit while the value lock is held so concurrent writers observe a
        // consistent write-then-notify order.
        self.inner.changes.send(value);
    }

    /// Mutate the value in place and notify change observers.
    pub fn modify(&self, f: impl FnOnce(&mut T)) {
        let mut guard = self.inner.value.lock();
        f(&mut guard);
        self.inner.changes.send(guard.clone());
    }

    /// Run `f` with the current value while holding exclusive access to the
    /// cell. Writers block until `f` returns; `f` must not call back into
    /// `get`/`set`/`modify` on the same property.
    pub fn with_exclusive<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let guard = self.inner.value.lock();
        f(&guard)
    }

    /// The change stream: one event per write, never failing. Completes when
    /// the last property handle drops.
    #[must_use]
    pub fn changes(&self) -> Signal<T> {
        self.inner.changes.signal()
    }

    /// Like [`Property::changes`], but replays the current value to each new
    /// observer before forwarding subsequent writes.
    #[must_use]
    pub fn producer(&self) -> Signal<T> {
        let weak = Arc::downgrade(&self.inner);
        Signal::from_observe(move |mut observer| match weak.upgrade() {
            None => {
                observer(SignalEvent::Completed);
                Disposable::noop()
            }
            Some(inner) => {
                // Attach under the value lock so no write lands between the
                // replay and the live subscription.
                let guard = inner.value.lock();
                observer(SignalEvent::Value(guard.clone()));
                inner.changes.attach_observer(observer)
            }
        })
    }

    /// End-of-life signal, fired when the last handle drops.
    #[must_use]
    pub fn lifetime(&self) -> Lifetime {
        self.inner.lifetime.clone()
    }

    /// A non-owning handle; upgrading fails once the property is gone.
    #[must_use]
    pub fn downgrade(&self) -> WeakProperty<T> {
        WeakProperty {
            inner: Arc::downgrade(&self.inner),
        }
    }
}

impl<T: Clone + Send + 'static> std::fmt::Debug for Property<T>
where
    T: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Property").field("value", &self.get()).finish()
    }
}

/// Non-owning handle to a [`Property`].
pub struct WeakProperty<T: Clone + Send + 'static> {
    inner: Weak<PropertyInner<T>>,
}

impl<T: Clone + Send + 'static> Clone for WeakProperty<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Weak::clone(&self.inner),
        }
    }
}

impl<T: Clone + Send + 'static> WeakProperty<T> {
    /// Recover a strong handle if the property is still alive.
    #[must_use]
    pub fn upgrade(&self) -> Option<Property<T>> {
        self.inner.upgrade().map(|inner| Property { inner })
    }
}

impl<T: Clone + Send + 'static> std::fmt::Debug for WeakProperty<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeakProperty")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}
