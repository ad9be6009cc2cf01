#![forbid(unsafe_code)]

//! Async command objects.
//!
//! An [`Action<I>`] wraps a unit of work that user interactions trigger with
//! an input value. Invocations are serial: while one executes, the action
//! reports itself disabled and further `apply` calls fail with
//! [`InvocationError::Disabled`]. Work signals completion through the
//! [`CompletionHandle`] it receives, which permits genuinely asynchronous
//! execution; dropping the handle counts as completion so an abandoned
//! invocation cannot wedge the action.
//!
//! Effective enablement is `user_enabled && !executing`. The enablement and
//! execution streams replay their current value to each new observer and
//! emit on every subsequent transition. State mutation and emission happen
//! in one critical section, so observers see transitions in state order —
//! the last emission always matches the settled state. The matching
//! precondition: stream observers must not call back into the same action
//! (the state lock is not re-entrant), mirroring [`crate::property`].

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use thiserror::Error;

use crate::disposable::Disposable;
use crate::lifetime::{Lifetime, LifetimeToken};
use crate::signal::{Pipe, Signal, SignalEvent};

/// Why an invocation did not start. Bindings discard these by design.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InvocationError {
    /// The action is disabled, or an invocation is already executing.
    #[error("action is disabled or already executing")]
    Disabled,
}

type WorkFn<I> = dyn Fn(I, CompletionHandle) + Send + Sync;

struct ActionState {
    user_enabled: bool,
    executing: bool,
    // Last effective enablement emitted; gates duplicate emissions.
    last_effective: bool,
}

struct ActionInner<I: Send + 'static> {
    work: Box<WorkFn<I>>,
    state: Mutex<ActionState>,
    enabled_changes: Pipe<bool>,
    executing_changes: Pipe<bool>,
    lifetime: Lifetime,
    _token: LifetimeToken,
}

impl<I: Send + 'static> ActionInner<I> {
    fn finish(inner: &Arc<Self>) {
        let mut state = inner.state.lock();
        state.executing = false;
        let effective = state.user_enabled;
        state.last_effective = effective;
        // Emit while the state lock is held so a concurrent set_enabled
        // cannot interleave its emission between our update and ours.
        inner.executing_changes.send(false);
        if effective {
            inner.enabled_changes.send(true);
        }
    }
}

impl<I: Send + 'static> Drop for ActionInner<I> {
    fn drop(&mut self) {
        self.enabled_changes.complete();
        self.executing_changes.complete();
    }
}

/// An async-invocable command with observable enablement and execution
/// state. Cloning shares the command.
pub struct Action<I: Send + 'static> {
    inner: Arc<ActionInner<I>>,
}

impl<I: Send + 'static> Clone for Action<I> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<I: Send + 'static> Action<I> {
    /// Create an enabled action. `work` runs once per started invocation and
    /// reports completion through the handle it is given.
    #[must_use]
    pub fn new(work: impl Fn(I, CompletionHandle) + Send + Sync + 'static) -> Self {
        let (lifetime, token) = Lifetime::make();
        Self {
            inner: Arc::new(ActionInner {
                work: Box::new(work),
                state: Mutex::new(ActionState {
                    user_enabled: true,
                    executing: false,
                    last_effective: true,
                }),
                enabled_changes: Pipe::new(),
                executing_changes: Pipe::new(),
                lifetime,
                _token: token,
            }),
        }
    }

    /// Start an invocation with `input`.
    ///
    /// Fails without side effects when the action is disabled or already
    /// executing. Domain errors inside the work itself are the work's
    /// business; this layer never sees them.
    pub fn apply(&self, input: I) -> Result<(), InvocationError> {
        {
            let mut state = self.inner.state.lock();
            if !state.user_enabled || state.executing {
                return Err(InvocationError::Disabled);
            }
            state.executing = true;
            state.last_effective = false;
            self.inner.executing_changes.send(true);
            self.inner.enabled_changes.send(false);
        }

        let weak = Arc::downgrade(&self.inner);
        let handle = CompletionHandle::new(move || {
            if let Some(inner) = weak.upgrade() {
                ActionInner::finish(&inner);
            }
        });
        (self.inner.work)(input, handle);
        Ok(())
    }

    /// Set user-level enablement. Effective enablement still honors
    /// execution state.
    pub fn set_enabled(&self, enabled: bool) {
        let mut state = self.inner.state.lock();
        state.user_enabled = enabled;
        let effective = enabled && !state.executing;
        if effective != state.last_effective {
            state.last_effective = effective;
            self.inner.enabled_changes.send(effective);
        }
    }

    /// Current effective enablement.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        let state = self.inner.state.lock();
        state.user_enabled && !state.executing
    }

    /// Whether an invocation is currently executing.
    #[must_use]
    pub fn is_executing(&self) -> bool {
        self.inner.state.lock().executing
    }

    /// Effective enablement: current value replayed, then every transition.
    #[must_use]
    pub fn enabled_values(&self) -> Signal<bool> {
        let weak = Arc::downgrade(&self.inner);
        Signal::from_observe(move |mut observer| match weak.upgrade() {
            None => {
                observer(SignalEvent::Completed);
                Disposable::noop()
            }
            Some(inner) => {
                // Hold the state lock across replay and attach so no
                // transition can slip in between.
                let state = inner.state.lock();
                observer(SignalEvent::Value(state.last_effective));
                inner.enabled_changes.attach_observer(observer)
            }
        })
    }

    /// Execution state: current value replayed, then every transition.
    #[must_use]
    pub fn executing_values(&self) -> Signal<bool> {
        let weak = Arc::downgrade(&self.inner);
        Signal::from_observe(move |mut observer| match weak.upgrade() {
            None => {
                observer(SignalEvent::Completed);
                Disposable::noop()
            }
            Some(inner) => {
                let state = inner.state.lock();
                observer(SignalEvent::Value(state.executing));
                inner.executing_changes.attach_observer(observer)
            }
        })
    }

    /// End-of-life signal, fired when the last handle drops.
    #[must_use]
    pub fn lifetime(&self) -> Lifetime {
        self.inner.lifetime.clone()
    }

    /// A non-owning handle; upgrading fails once the action is gone.
    #[must_use]
    pub fn downgrade(&self) -> WeakAction<I> {
        WeakAction {
            inner: Arc::downgrade(&self.inner),
        }
    }
}

impl<I: Send + 'static> std::fmt::Debug for Action<I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Action")
            .field("enabled", &self.is_enabled())
            .field("executing", &self.is_executing())
            .finish()
    }
}

/// Non-owning handle to an [`Action`].
pub struct WeakAction<I: Send + 'static> {
    inner: Weak<ActionInner<I>>,
}

impl<I: Send + 'static> Clone for WeakAction<I> {
    fn clone(&self) -> Self {
        Self {
            inner: Weak::clone(&self.inner),
        }
    }
}

impl<I: Send + 'static> WeakAction<I> {
    /// Recover a strong handle if the action is still alive.
    #[must_use]
    pub fn upgrade(&self) -> Option<Action<I>> {
        self.inner.upgrade().map(|inner| Action { inner })
    }
}

/// Completion signal for one invocation.
///
/// Call [`CompletionHandle::finish`] when the work is done; dropping the
/// handle has the same effect. Finishing is idempotent.
pub struct CompletionHandle {
    done: Arc<AtomicBool>,
    on_finish: Arc<Mutex<Option<Box<dyn FnOnce() + Send>>>>,
}

impl CompletionHandle {
    fn new(on_finish: impl FnOnce() + Send + 'static) -> Self {
        Self {
            done: Arc::new(AtomicBool::new(false)),
            on_finish: Arc::new(Mutex::new(Some(Box::new(on_finish)))),
        }
    }

    /// Mark the invocation complete, re-enabling the action.
    pub fn finish(self) {
        self.run();
    }

    fn run(&self) {
        if self.done.swap(true, Ordering::AcqRel) {
            return;
        }
        let on_finish = self.on_finish.lock().take();
        if let Some(on_finish) = on_finish {
            on_finish();
        }
    }
}

impl Drop for CompletionHandle {
    fn drop(&mut self) {
        self.run();
    }
}

impl std::fmt::Debug for CompletionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionHandle")
            .field("done", &self.done.load(Ordering::Acquire))
            .finish()
    }
}
