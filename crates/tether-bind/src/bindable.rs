#![forbid(unsafe_code)]

//! Bindable connection points on controls.
//!
//! A [`ValueBindable`] represents a two-way value endpoint: the control can
//! both display values and emit user-driven changes. An [`ActionBindable`]
//! is the action-triggering restriction of the same idea — enablement plus
//! the user-driven stream, no value writing.
//!
//! Adapters construct these from a concrete control and its capability
//! closures; the binding entry points in [`crate::value`] and
//! [`crate::action`] consume them. Both are cheap to clone and never own the
//! control.
//!
//! # Invariants
//!
//! 1. A bindable whose control has died behaves inertly: derived views are
//!    inert, bind calls return `None`, capability calls are no-ops.
//! 2. Deriving views ([`ValueBindable::action_bindable`],
//!    [`ValueBindable::binding_target`], output transforms) never
//!    re-subscribes or buffers the underlying value stream.

use std::sync::Arc;

use tether_reactive::{
    CompositeDisposable, Disposable, Lifetime, Property, SharedScheduler, Signal, SignalEvent,
};

use crate::action::{ActionStates, bind_action, bind_trigger};
use crate::handle::{ControlHandle, SetValueFn};
use crate::value::bind_value;
use tether_reactive::Action;

/// A two-way value connection point on a control.
pub struct ValueBindable<C, V> {
    pub(crate) handle: ControlHandle<C, V>,
    pub(crate) set_value: Arc<SetValueFn<C, V>>,
}

impl<C, V> Clone for ValueBindable<C, V> {
    fn clone(&self) -> Self {
        Self {
            handle: self.handle.clone(),
            set_value: Arc::clone(&self.set_value),
        }
    }
}

impl<C: Send + Sync + 'static, V: Clone + Send + 'static> ValueBindable<C, V> {
    /// Wrap `control` with its value capabilities.
    ///
    /// - `set_enabled`: switch user interaction on or off.
    /// - `set_value`: display a value. Called only on the UI context.
    /// - `values`: the stream of user-driven value changes. Must emit only
    ///   while the control lives.
    /// - `lifetime`: the control's end-of-life signal.
    #[must_use]
    pub fn new(
        control: &Arc<C>,
        set_enabled: impl Fn(&C, bool) + Send + Sync + 'static,
        set_value: impl Fn(&C, V) + Send + Sync + 'static,
        values: impl Fn(&C) -> Signal<V> + Send + Sync + 'static,
        lifetime: impl Fn(&C) -> Lifetime + Send + Sync + 'static,
    ) -> Self {
        Self {
            handle: ControlHandle::new(control, set_enabled, values, lifetime, None),
            set_value: Arc::new(set_value),
        }
    }

    /// A bindable with no control behind it.
    #[must_use]
    pub fn inert() -> Self {
        Self {
            handle: ControlHandle::inert(),
            set_value: Arc::new(|_, _| {}),
        }
    }

    /// Install a hook invoked once after each action binding is wired,
    /// receiving the control, the action's state views, and the binding's
    /// teardown group for appending extra bindings.
    #[must_use]
    pub fn with_post_bind_hook(
        mut self,
        hook: impl Fn(&C, &ActionStates, &CompositeDisposable) + Send + Sync + 'static,
    ) -> Self {
        self.handle.action_did_bind = Some(Arc::new(hook));
        self
    }

    /// The action-triggering view of this bindable: same control and
    /// enablement, value writing dropped. Inert if the control is gone.
    #[must_use]
    pub fn action_bindable(&self) -> ActionBindable<C, V> {
        if self.handle.upgrade().is_none() {
            return ActionBindable::inert();
        }
        ActionBindable {
            handle: self.handle.clone(),
        }
    }

    /// A one-way write target: values flow into the control on the UI
    /// context, scoped to the control's lifetime.
    #[must_use]
    pub fn binding_target(&self, ui: &SharedScheduler) -> BindingTarget<V> {
        let lifetime = match self.handle.upgrade() {
            Some(control) => (self.handle.lifetime)(&control),
            None => Lifetime::ended(),
        };
        let control = self.handle.control.clone();
        let set_value = Arc::clone(&self.set_value);
        BindingTarget::new(Arc::clone(ui), lifetime, move |value| {
            if let Some(control) = control.upgrade() {
                set_value(&control, value);
            }
        })
    }

    /// Two-way bind to `property`. See [`bind_value`].
    pub fn bind_to(&self, property: &Property<V>, ui: &SharedScheduler) -> Option<Disposable> {
        bind_value(self, property, ui)
    }

    /// Bind this control's emissions to `action`. See [`bind_action`].
    pub fn bind_to_action(&self, action: &Action<V>, ui: &SharedScheduler) -> Option<Disposable> {
        bind_action(&self.action_bindable(), action, ui)
    }

    /// Bind as a payload-free trigger of `action`. See [`bind_trigger`].
    pub fn bind_to_trigger(&self, action: &Action<()>, ui: &SharedScheduler) -> Option<Disposable> {
        bind_trigger(&self.action_bindable(), action, ui)
    }
}

impl<C, V> std::fmt::Debug for ValueBindable<C, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValueBindable")
            .field("handle", &self.handle)
            .finish()
    }
}

/// An action-triggering connection point on a control: enablement plus the
/// user-driven value stream.
pub struct ActionBindable<C, V> {
    pub(crate) handle: ControlHandle<C, V>,
}

impl<C, V> Clone for ActionBindable<C, V> {
    fn clone(&self) -> Self {
        Self {
            handle: self.handle.clone(),
        }
    }
}

impl<C: Send + Sync + 'static, V: Clone + Send + 'static> ActionBindable<C, V> {
    /// Wrap `control` with its action-triggering capabilities.
    #[must_use]
    pub fn new(
        control: &Arc<C>,
        set_enabled: impl Fn(&C, bool) + Send + Sync + 'static,
        values: impl Fn(&C) -> Signal<V> + Send + Sync + 'static,
        lifetime: impl Fn(&C) -> Lifetime + Send + Sync + 'static,
    ) -> Self {
        Self {
            handle: ControlHandle::new(control, set_enabled, values, lifetime, None),
        }
    }

    /// A bindable with no control behind it.
    #[must_use]
    pub fn inert() -> Self {
        Self {
            handle: ControlHandle::inert(),
        }
    }

    /// Install a hook invoked once after each action binding is wired.
    #[must_use]
    pub fn with_post_bind_hook(
        mut self,
        hook: impl Fn(&C, &ActionStates, &CompositeDisposable) + Send + Sync + 'static,
    ) -> Self {
        self.handle.action_did_bind = Some(Arc::new(hook));
        self
    }

    /// Bind this control's emissions to `action`. See [`bind_action`].
    pub fn bind_to(&self, action: &Action<V>, ui: &SharedScheduler) -> Option<Disposable> {
        bind_action(self, action, ui)
    }

    /// Bind as a payload-free trigger of `action`. See [`bind_trigger`].
    pub fn bind_to_trigger(&self, action: &Action<()>, ui: &SharedScheduler) -> Option<Disposable> {
        bind_trigger(self, action, ui)
    }
}

impl<C, V> std::fmt::Debug for ActionBindable<C, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionBindable")
            .field("handle", &self.handle)
            .finish()
    }
}

/// A one-way consumer of values, writing on a scheduler within a lifetime.
pub struct BindingTarget<V> {
    lifetime: Lifetime,
    scheduler: SharedScheduler,
    write: Arc<dyn Fn(V) + Send + Sync>,
}

impl<V> Clone for BindingTarget<V> {
    fn clone(&self) -> Self {
        Self {
            lifetime: self.lifetime.clone(),
            scheduler: Arc::clone(&self.scheduler),
            write: Arc::clone(&self.write),
        }
    }
}

impl<V: Send + 'static> BindingTarget<V> {
    /// Create a target that runs `write` on `scheduler` until `lifetime`
    /// ends.
    #[must_use]
    pub fn new(
        scheduler: SharedScheduler,
        lifetime: Lifetime,
        write: impl Fn(V) + Send + Sync + 'static,
    ) -> Self {
        Self {
            lifetime,
            scheduler,
            write: Arc::new(write),
        }
    }

    /// The lifetime bounding this target.
    #[must_use]
    pub fn lifetime(&self) -> &Lifetime {
        &self.lifetime
    }

    /// Schedule one value for writing. Dropped silently after the lifetime
    /// ends.
    pub fn consume(&self, value: V) {
        if self.lifetime.has_ended() {
            return;
        }
        let write = Arc::clone(&self.write);
        let _scheduled = self.scheduler.schedule(Box::new(move || write(value)));
    }

    /// Feed every value of `source` into this target until the source
    /// completes, the lifetime ends, or the returned handle is disposed.
    pub fn bind_from(&self, source: &Signal<V>) -> Disposable {
        let group = CompositeDisposable::new();
        let target = self.clone();
        let g = group.clone();
        group.add(source.observe(move |event| match event {
            SignalEvent::Value(value) => target.consume(value),
            SignalEvent::Completed => g.dispose(),
        }));
        let g = group.clone();
        group.add(self.lifetime.observe_ended(move || g.dispose()));
        group.to_disposable()
    }
}

impl<V> std::fmt::Debug for BindingTarget<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BindingTarget")
            .field("ended", &self.lifetime.has_ended())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{TestControl, value_bindable};
    use tether_reactive::{Pipe, UiScheduler};

    #[test]
    fn binding_target_writes_on_scheduler() {
        let ui = UiScheduler::new();
        let control = TestControl::new();
        let target = value_bindable(&control).binding_target(&ui.shared());

        let t = target.clone();
        std::thread::spawn(move || t.consume(3)).join().expect("feeder thread");
        assert_eq!(control.displayed(), None, "write must wait for the UI");
        ui.run();
        assert_eq!(control.displayed(), Some(3));
    }

    #[test]
    fn binding_target_stops_at_lifetime_end() {
        let ui = UiScheduler::new();
        let control = TestControl::new();
        let target = value_bindable(&control).binding_target(&ui.shared());

        control.end_lifetime();
        target.consume(4);
        ui.run();
        assert_eq!(control.displayed(), None);
    }

    #[test]
    fn binding_target_feeds_from_signal() {
        let ui = UiScheduler::new();
        let control = TestControl::new();
        let target = value_bindable(&control).binding_target(&ui.shared());

        let source = Pipe::new();
        let d = target.bind_from(&source.signal());
        source.send(1);
        source.send(2);
        assert_eq!(control.displayed(), Some(2));

        d.dispose();
        source.send(3);
        assert_eq!(control.displayed(), Some(2));
    }

    #[test]
    fn action_view_of_dead_control_is_inert() {
        let control = TestControl::new();
        let bindable = value_bindable(&control);
        drop(control);
        assert!(bindable.action_bindable().handle.upgrade().is_none());
    }

    #[test]
    fn inert_bindable_never_binds() {
        let ui = UiScheduler::new().shared();
        let property = Property::new(0);
        assert!(ValueBindable::<TestControl, i32>::inert()
            .bind_to(&property, &ui)
            .is_none());
    }
}
