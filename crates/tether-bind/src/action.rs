#![forbid(unsafe_code)]

//! One-way sync between a control and an async action.
//!
//! [`bind_action`] feeds the control's user-driven emissions into an
//! action's invocations and mirrors the action's effective enablement back
//! onto the control. [`bind_trigger`] is the payload-free variant for
//! button-like controls.
//!
//! # Invariants
//!
//! 1. Invocations run with the control's emitted value, in emission order.
//! 2. Rejected invocations (action disabled or busy) are dropped silently;
//!    enablement feedback on the control is the user-facing signal.
//! 3. Enablement writes happen on the UI-affine scheduler, starting with
//!    the action's current state.
//! 4. Teardown fires on the first of: explicit disposal, action death,
//!    enablement stream completion, control lifetime end.

use std::sync::Arc;

use tracing::trace;

use tether_reactive::{
    Action, CompositeDisposable, Disposable, SharedScheduler, Signal, SignalEvent,
};

use crate::bindable::ActionBindable;

/// Observable views of a bound action's state, delivered on the UI-affine
/// scheduler. Handed to a bindable's post-bind hook so adapters can drive
/// busy indicators.
pub struct ActionStates {
    is_executing: Signal<bool>,
}

impl ActionStates {
    pub(crate) fn new<I: Send + 'static>(action: &Action<I>, ui: &SharedScheduler) -> Self {
        Self {
            is_executing: action.executing_values().observe_on(Arc::clone(ui)),
        }
    }

    /// Whether an invocation is in flight: current value replayed, then
    /// every transition.
    #[must_use]
    pub fn is_executing(&self) -> &Signal<bool> {
        &self.is_executing
    }
}

impl std::fmt::Debug for ActionStates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionStates").finish()
    }
}

/// Bind `bindable`'s control to `action`: control emissions invoke the
/// action, the action's effective enablement drives the control's
/// interactivity.
///
/// Returns `None` if the control is already gone. The returned handle tears
/// down the whole binding; discarding it leaves the binding alive until a
/// lifetime ends.
pub fn bind_action<C, V>(
    bindable: &ActionBindable<C, V>,
    action: &Action<V>,
    ui: &SharedScheduler,
) -> Option<Disposable>
where
    C: Send + Sync + 'static,
    V: Clone + Send + 'static,
{
    let control = bindable.handle.upgrade()?;
    let group = CompositeDisposable::new();

    // Control -> action. A failed apply means the action was disabled or
    // busy when the event landed; the enablement mirror below is what the
    // user sees, so the event itself is just dropped.
    {
        let weak_action = action.downgrade();
        group.add(
            (bindable.handle.values)(&control).observe_values(move |value| {
                if let Some(action) = weak_action.upgrade() {
                    if action.apply(value).is_err() {
                        trace!("invocation rejected, control event dropped");
                    }
                }
            }),
        );
    }

    // Action enablement -> control, on the UI context, current value first.
    {
        let weak_control = bindable.handle.control.clone();
        let set_enabled = Arc::clone(&bindable.handle.set_enabled);
        let g = group.clone();
        group.add(
            action
                .enabled_values()
                .observe_on(Arc::clone(ui))
                .observe(move |event| match event {
                    SignalEvent::Value(on) => {
                        if let Some(control) = weak_control.upgrade() {
                            set_enabled(&control, on);
                        }
                    }
                    SignalEvent::Completed => g.dispose(),
                }),
        );
    }

    // First lifetime to end tears down the whole group.
    {
        let g = group.clone();
        group.add(action.lifetime().observe_ended(move || g.dispose()));
    }
    {
        let g = group.clone();
        group.add((bindable.handle.lifetime)(&control).observe_ended(move || g.dispose()));
    }

    if let Some(hook) = &bindable.handle.action_did_bind {
        hook(&control, &ActionStates::new(action, ui), &group);
    }

    trace!("action binding established");
    Some(group.to_disposable())
}

/// Bind `bindable`'s control as a payload-free trigger of `action`: every
/// emission, whatever its value, becomes one invocation.
pub fn bind_trigger<C, V>(
    bindable: &ActionBindable<C, V>,
    action: &Action<()>,
    ui: &SharedScheduler,
) -> Option<Disposable>
where
    C: Send + Sync + 'static,
    V: Clone + Send + 'static,
{
    bind_action(&bindable.map_output(|_| ()), action, ui)
}
