#![forbid(unsafe_code)]

//! Weak control handles.
//!
//! A [`ControlHandle`] is a non-owning reference to a UI control plus the
//! capability closures an adapter supplies for it: enable/disable, the
//! user-driven value stream, the control's lifetime, and an optional
//! post-bind hook for action bindings. Value bindables add a write
//! capability on top.
//!
//! The handle never owns the control. Once the control is gone every
//! capability call is silently skipped — a dead control is not an error.

use std::sync::{Arc, Weak};

use tether_reactive::{CompositeDisposable, Lifetime, Signal};

use crate::action::ActionStates;

pub(crate) type SetEnabledFn<C> = dyn Fn(&C, bool) + Send + Sync;
pub(crate) type SetValueFn<C, V> = dyn Fn(&C, V) + Send + Sync;
pub(crate) type ValuesFn<C, V> = dyn Fn(&C) -> Signal<V> + Send + Sync;
pub(crate) type LifetimeFn<C> = dyn Fn(&C) -> Lifetime + Send + Sync;
pub(crate) type ActionDidBindFn<C> =
    dyn Fn(&C, &ActionStates, &CompositeDisposable) + Send + Sync;

/// Non-owning reference to a control plus its bound capabilities.
pub struct ControlHandle<C, V> {
    pub(crate) control: Weak<C>,
    pub(crate) set_enabled: Arc<SetEnabledFn<C>>,
    pub(crate) values: Arc<ValuesFn<C, V>>,
    pub(crate) lifetime: Arc<LifetimeFn<C>>,
    pub(crate) action_did_bind: Option<Arc<ActionDidBindFn<C>>>,
}

impl<C, V> Clone for ControlHandle<C, V> {
    fn clone(&self) -> Self {
        Self {
            control: Weak::clone(&self.control),
            set_enabled: Arc::clone(&self.set_enabled),
            values: Arc::clone(&self.values),
            lifetime: Arc::clone(&self.lifetime),
            action_did_bind: self.action_did_bind.clone(),
        }
    }
}

impl<C: Send + Sync + 'static, V: Clone + Send + 'static> ControlHandle<C, V> {
    pub(crate) fn new(
        control: &Arc<C>,
        set_enabled: impl Fn(&C, bool) + Send + Sync + 'static,
        values: impl Fn(&C) -> Signal<V> + Send + Sync + 'static,
        lifetime: impl Fn(&C) -> Lifetime + Send + Sync + 'static,
        action_did_bind: Option<Arc<ActionDidBindFn<C>>>,
    ) -> Self {
        Self {
            control: Arc::downgrade(control),
            set_enabled: Arc::new(set_enabled),
            values: Arc::new(values),
            lifetime: Arc::new(lifetime),
            action_did_bind,
        }
    }

    /// A handle with no control behind it; every capability is a no-op.
    pub(crate) fn inert() -> Self {
        Self {
            control: Weak::new(),
            set_enabled: Arc::new(|_, _| {}),
            values: Arc::new(|_| Signal::never()),
            lifetime: Arc::new(|_| Lifetime::ended()),
            action_did_bind: None,
        }
    }

    /// The control, if it is still alive.
    #[must_use]
    pub(crate) fn upgrade(&self) -> Option<Arc<C>> {
        self.control.upgrade()
    }
}

impl<C, V> std::fmt::Debug for ControlHandle<C, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControlHandle")
            .field("alive", &(self.control.strong_count() > 0))
            .finish()
    }
}
