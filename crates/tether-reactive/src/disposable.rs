#![forbid(unsafe_code)]

//! Teardown handles for reactive subscriptions.
//!
//! A [`Disposable`] wraps a one-shot teardown closure. [`CompositeDisposable`]
//! groups many disposables under a single handle, [`SerialDisposable`] holds
//! at most one at a time (replacing disposes the previous occupant), and
//! [`ScopedDisposable`] adds RAII semantics for scope-bound teardown.
//!
//! # Invariants
//!
//! 1. Disposal is idempotent: the teardown closure runs at most once, no
//!    matter how many clones call `dispose()` or how often.
//! 2. Adding to an already-disposed composite disposes the new member
//!    immediately instead of retaining it.
//! 3. Replacing the inner of an already-disposed serial disposes the
//!    replacement immediately.
//! 4. No internal lock is held while a teardown closure runs, so teardowns
//!    may freely add to or dispose the same group.
//!
//! # Failure Modes
//!
//! - Teardown closure panics: propagates to the disposing caller; the handle
//!   still counts as disposed.

use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

type TeardownFn = Box<dyn FnOnce() + Send>;

/// A one-shot, idempotent teardown handle.
///
/// Cloning shares the same underlying teardown; disposing any clone disposes
/// all of them. Dropping a `Disposable` does *not* dispose it — wrap it in
/// [`ScopedDisposable`] when scope-bound teardown is wanted.
#[derive(Clone)]
pub struct Disposable {
    inner: Arc<DisposableInner>,
}

struct DisposableInner {
    disposed: AtomicBool,
    teardown: Mutex<Option<TeardownFn>>,
}

impl Disposable {
    /// Create a disposable that runs `teardown` on first disposal.
    #[must_use]
    pub fn new(teardown: impl FnOnce() + Send + 'static) -> Self {
        Self {
            inner: Arc::new(DisposableInner {
                disposed: AtomicBool::new(false),
                teardown: Mutex::new(Some(Box::new(teardown))),
            }),
        }
    }

    /// A disposable with no teardown work.
    #[must_use]
    pub fn noop() -> Self {
        Self {
            inner: Arc::new(DisposableInner {
                disposed: AtomicBool::new(false),
                teardown: Mutex::new(None),
            }),
        }
    }

    /// Run the teardown if it has not run yet.
    pub fn dispose(&self) {
        if self.inner.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        let teardown = self.inner.teardown.lock().take();
        if let Some(teardown) = teardown {
            teardown();
        }
    }

    /// Whether `dispose()` has been called on this handle or a clone of it.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for Disposable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Disposable")
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// A group of disposables torn down together.
///
/// The binding engine returns one composite per bind call; disposing it
/// unsubscribes every stream the call created.
#[derive(Clone)]
pub struct CompositeDisposable {
    inner: Arc<CompositeInner>,
}

struct CompositeInner {
    disposed: AtomicBool,
    children: Mutex<Vec<Disposable>>,
}

impl CompositeDisposable {
    /// Create an empty group.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(CompositeInner {
                disposed: AtomicBool::new(false),
                children: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Add a member. If the group is already disposed, the member is
    /// disposed immediately and not retained.
    pub fn add(&self, disposable: Disposable) {
        if self.inner.disposed.load(Ordering::Acquire) {
            disposable.dispose();
            return;
        }
        let mut children = self.inner.children.lock();
        // Re-check under the lock so a racing dispose() cannot strand us.
        if self.inner.disposed.load(Ordering::Acquire) {
            drop(children);
            disposable.dispose();
        } else {
            children.push(disposable);
        }
    }

    /// Dispose every member. Idempotent.
    pub fn dispose(&self) {
        if self.inner.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        let children = std::mem::take(&mut *self.inner.children.lock());
        for child in children {
            child.dispose();
        }
    }

    /// Whether the group has been disposed.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::Acquire)
    }

    /// Number of members currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.children.lock().len()
    }

    /// Whether the group currently holds no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.children.lock().is_empty()
    }

    /// A plain [`Disposable`] that disposes this group.
    #[must_use]
    pub fn to_disposable(&self) -> Disposable {
        let group = self.clone();
        Disposable::new(move || group.dispose())
    }
}

impl Default for CompositeDisposable {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CompositeDisposable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositeDisposable")
            .field("disposed", &self.is_disposed())
            .field("len", &self.len())
            .finish()
    }
}

/// A single-slot disposable: installing a new inner disposes the old one.
///
/// The value-sync engine stores the pending scheduled control write here, so
/// a control-originated update can cancel it by clearing the slot.
#[derive(Clone)]
pub struct SerialDisposable {
    inner: Arc<SerialInner>,
}

struct SerialInner {
    disposed: AtomicBool,
    current: Mutex<Option<Disposable>>,
}

impl SerialDisposable {
    /// Create an empty slot.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(SerialInner {
                disposed: AtomicBool::new(false),
                current: Mutex::new(None),
            }),
        }
    }

    /// Install `next`, disposing whatever occupied the slot before. If the
    /// serial itself is already disposed, `next` is disposed immediately.
    pub fn replace(&self, next: Option<Disposable>) {
        if self.inner.disposed.load(Ordering::Acquire) {
            if let Some(next) = next {
                next.dispose();
            }
            return;
        }
        let previous = {
            let mut current = self.inner.current.lock();
            std::mem::replace(&mut *current, next)
        };
        if let Some(previous) = previous {
            previous.dispose();
        }
    }

    /// Dispose the current occupant and leave the slot empty.
    pub fn clear(&self) {
        self.replace(None);
    }

    /// Dispose the slot and its occupant. Idempotent.
    pub fn dispose(&self) {
        if self.inner.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        let current = self.inner.current.lock().take();
        if let Some(current) = current {
            current.dispose();
        }
    }

    /// Whether the slot itself has been disposed.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::Acquire)
    }
}

impl Default for SerialDisposable {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SerialDisposable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialDisposable")
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// RAII wrapper: disposes the wrapped disposable when dropped.
#[must_use = "dropping a ScopedDisposable immediately tears down the binding"]
pub struct ScopedDisposable {
    inner: Disposable,
}

impl ScopedDisposable {
    /// Wrap `inner`, tying its disposal to this value's scope.
    pub fn new(inner: Disposable) -> Self {
        Self { inner }
    }

    /// The wrapped handle. Disposing it early is safe.
    #[must_use]
    pub fn handle(&self) -> &Disposable {
        &self.inner
    }
}

impl From<Disposable> for ScopedDisposable {
    fn from(inner: Disposable) -> Self {
        Self::new(inner)
    }
}

impl Drop for ScopedDisposable {
    fn drop(&mut self) {
        self.inner.dispose();
    }
}

impl std::fmt::Debug for ScopedDisposable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopedDisposable")
            .field("disposed", &self.inner.is_disposed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counting() -> (Disposable, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        let d = Disposable::new(move || {
            c.fetch_add(1, Ordering::SeqCst);
        });
        (d, count)
    }

    #[test]
    fn dispose_runs_teardown_once() {
        let (d, count) = counting();
        d.dispose();
        d.dispose();
        d.dispose();
        assert_eq!(count.load(Ordering::SeqCst), 1, "teardown must run exactly once");
    }

    #[test]
    fn clones_share_state() {
        let (d, count) = counting();
        let d2 = d.clone();
        d2.dispose();
        assert!(d.is_disposed());
        d.dispose();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn noop_disposes_cleanly() {
        let d = Disposable::noop();
        assert!(!d.is_disposed());
        d.dispose();
        assert!(d.is_disposed());
    }

    #[test]
    fn composite_disposes_members() {
        let group = CompositeDisposable::new();
        let (a, ca) = counting();
        let (b, cb) = counting();
        group.add(a);
        group.add(b);
        assert_eq!(group.len(), 2);

        group.dispose();
        assert_eq!(ca.load(Ordering::SeqCst), 1);
        assert_eq!(cb.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn composite_dispose_is_idempotent() {
        let group = CompositeDisposable::new();
        let (a, ca) = counting();
        group.add(a);
        group.dispose();
        group.dispose();
        assert_eq!(ca.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn composite_add_after_dispose_disposes_immediately() {
        let group = CompositeDisposable::new();
        group.dispose();

        let (a, ca) = counting();
        group.add(a);
        assert_eq!(ca.load(Ordering::SeqCst), 1, "late member must be disposed on add");
        assert!(group.is_empty());
    }

    #[test]
    fn composite_teardown_may_touch_group() {
        // A member's teardown disposing the group again must not deadlock.
        let group = CompositeDisposable::new();
        let g = group.clone();
        group.add(Disposable::new(move || g.dispose()));
        group.dispose();
        assert!(group.is_disposed());
    }

    #[test]
    fn serial_replace_disposes_previous() {
        let serial = SerialDisposable::new();
        let (a, ca) = counting();
        let (b, cb) = counting();

        serial.replace(Some(a));
        assert_eq!(ca.load(Ordering::SeqCst), 0);

        serial.replace(Some(b));
        assert_eq!(ca.load(Ordering::SeqCst), 1, "replaced inner must be disposed");
        assert_eq!(cb.load(Ordering::SeqCst), 0);

        serial.clear();
        assert_eq!(cb.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn serial_dispose_covers_inner_and_future() {
        let serial = SerialDisposable::new();
        let (a, ca) = counting();
        serial.replace(Some(a));
        serial.dispose();
        assert_eq!(ca.load(Ordering::SeqCst), 1);

        let (b, cb) = counting();
        serial.replace(Some(b));
        assert_eq!(cb.load(Ordering::SeqCst), 1, "disposed serial rejects new inners");
    }

    #[test]
    fn scoped_disposes_on_drop() {
        let (d, count) = counting();
        {
            let _scoped = ScopedDisposable::new(d);
        }
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
