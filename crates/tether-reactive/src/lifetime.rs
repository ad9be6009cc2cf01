#![forbid(unsafe_code)]

//! End-of-life signals for independently owned objects.
//!
//! A ([`Lifetime`], [`LifetimeToken`]) pair models "this object is gone":
//! the owner embeds the token, observers hold the lifetime. Dropping the
//! token fires every registered observer exactly once; observers registered
//! after the end run immediately.

use parking_lot::Mutex;
use std::sync::Arc;

use crate::disposable::Disposable;

type EndedFn = Box<dyn FnOnce() + Send>;

/// Observable end-of-life signal. Cheap to clone; all clones watch the same
/// token.
#[derive(Clone)]
pub struct Lifetime {
    inner: Arc<LifetimeInner>,
}

struct LifetimeInner {
    state: Mutex<LifetimeState>,
}

struct LifetimeState {
    ended: bool,
    next_id: u64,
    observers: Vec<(u64, EndedFn)>,
}

impl Lifetime {
    /// Create a lifetime and the token that ends it.
    #[must_use]
    pub fn make() -> (Lifetime, LifetimeToken) {
        let inner = Arc::new(LifetimeInner {
            state: Mutex::new(LifetimeState {
                ended: false,
                next_id: 0,
                observers: Vec::new(),
            }),
        });
        (
            Lifetime {
                inner: Arc::clone(&inner),
            },
            LifetimeToken { inner },
        )
    }

    /// A lifetime that has already ended. Observers run immediately.
    #[must_use]
    pub fn ended() -> Lifetime {
        Lifetime {
            inner: Arc::new(LifetimeInner {
                state: Mutex::new(LifetimeState {
                    ended: true,
                    next_id: 0,
                    observers: Vec::new(),
                }),
            }),
        }
    }

    /// Whether the token has been dropped.
    #[must_use]
    pub fn has_ended(&self) -> bool {
        self.inner.state.lock().ended
    }

    /// Run `f` when the lifetime ends, or immediately if it already has.
    ///
    /// The returned disposable deregisters the observer; disposing after the
    /// end is a no-op.
    pub fn observe_ended(&self, f: impl FnOnce() + Send + 'static) -> Disposable {
        let id = {
            let mut state = self.inner.state.lock();
            if state.ended {
                drop(state);
                f();
                return Disposable::noop();
            }
            let id = state.next_id;
            state.next_id += 1;
            state.observers.push((id, Box::new(f)));
            id
        };
        let inner = Arc::downgrade(&self.inner);
        Disposable::new(move || {
            if let Some(inner) = inner.upgrade() {
                inner.state.lock().observers.retain(|(oid, _)| *oid != id);
            }
        })
    }
}

impl std::fmt::Debug for Lifetime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lifetime")
            .field("ended", &self.has_ended())
            .finish()
    }
}

/// Ends its [`Lifetime`] when dropped. Owned by the object whose life it
/// tracks; deliberately not `Clone`.
pub struct LifetimeToken {
    inner: Arc<LifetimeInner>,
}

impl Drop for LifetimeToken {
    fn drop(&mut self) {
        let observers = {
            let mut state = self.inner.state.lock();
            if state.ended {
                return;
            }
            state.ended = true;
            std::mem::take(&mut state.observers)
        };
        for (_, f) in observers {
            f();
        }
    }
}

impl std::fmt::Debug for LifetimeToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifetimeToken").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn token_drop_fires_observers() {
        let (lifetime, token) = Lifetime::make();
        let fired = Arc::new(AtomicUsize::new(0));
        let f = Arc::clone(&fired);
        let _d = lifetime.observe_ended(move || {
            f.fetch_add(1, Ordering::SeqCst);
        });

        assert!(!lifetime.has_ended());
        drop(token);
        assert!(lifetime.has_ended());
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn observer_after_end_runs_immediately() {
        let (lifetime, token) = Lifetime::make();
        drop(token);

        let fired = Arc::new(AtomicUsize::new(0));
        let f = Arc::clone(&fired);
        let d = lifetime.observe_ended(move || {
            f.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        d.dispose();
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn already_ended_constant() {
        let lifetime = Lifetime::ended();
        assert!(lifetime.has_ended());
        let fired = Arc::new(AtomicUsize::new(0));
        let f = Arc::clone(&fired);
        let _d = lifetime.observe_ended(move || {
            f.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn disposed_observer_never_fires() {
        let (lifetime, token) = Lifetime::make();
        let fired = Arc::new(AtomicUsize::new(0));
        let f = Arc::clone(&fired);
        let d = lifetime.observe_ended(move || {
            f.fetch_add(1, Ordering::SeqCst);
        });
        d.dispose();
        drop(token);
        assert_eq!(fired.load(Ordering::SeqCst), 0, "deregistered observer must not fire");
    }

    #[test]
    fn multiple_observers_each_fire_once() {
        let (lifetime, token) = Lifetime::make();
        let fired = Arc::new(AtomicUsize::new(0));
        for _ in 0..4 {
            let f = Arc::clone(&fired);
            let _d = lifetime.observe_ended(move || {
                f.fetch_add(1, Ordering::SeqCst);
            });
        }
        drop(token);
        assert_eq!(fired.load(Ordering::SeqCst), 4);
    }
}
