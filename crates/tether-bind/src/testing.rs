#![forbid(unsafe_code)]

//! In-memory stand-in for a UI control, used across the test modules.
//!
//! `TestControl` records everything a binding does to it (displayed value,
//! write count, enablement history) and can simulate everything a user does
//! to a real control (edits on the value stream, going away).

use parking_lot::Mutex;
use std::sync::Arc;

use tether_reactive::{Lifetime, LifetimeToken, Pipe};

use crate::bindable::{ActionBindable, ValueBindable};

pub(crate) struct TestControl {
    state: Mutex<ControlState>,
    user: Pipe<i32>,
    lifetime: Lifetime,
    token: Mutex<Option<LifetimeToken>>,
}

struct ControlState {
    displayed: Option<i32>,
    writes: usize,
    enabled_history: Vec<bool>,
}

impl TestControl {
    pub(crate) fn new() -> Arc<Self> {
        let (lifetime, token) = Lifetime::make();
        Arc::new(Self {
            state: Mutex::new(ControlState {
                displayed: None,
                writes: 0,
                enabled_history: Vec::new(),
            }),
            user: Pipe::new(),
            lifetime,
            token: Mutex::new(Some(token)),
        })
    }

    /// The value most recently written by a binding, if any.
    pub(crate) fn displayed(&self) -> Option<i32> {
        self.state.lock().displayed
    }

    /// How many times a binding has written a value.
    pub(crate) fn write_count(&self) -> usize {
        self.state.lock().writes
    }

    /// The most recent enablement a binding applied, if any.
    pub(crate) fn enabled(&self) -> Option<bool> {
        self.state.lock().enabled_history.last().copied()
    }

    /// Every enablement write, in order.
    pub(crate) fn enabled_history(&self) -> Vec<bool> {
        self.state.lock().enabled_history.clone()
    }

    /// Simulate the user changing the control's value.
    pub(crate) fn user_edit(&self, value: i32) {
        self.user.send(value);
    }

    /// How many subscriptions are live on the user value stream.
    pub(crate) fn user_observer_count(&self) -> usize {
        self.user.observer_count()
    }

    /// End the control's lifetime without dropping it, as a container
    /// removing the control would.
    pub(crate) fn end_lifetime(&self) {
        self.token.lock().take();
    }

    fn display(&self, value: i32) {
        let mut state = self.state.lock();
        state.displayed = Some(value);
        state.writes += 1;
    }

    fn record_enabled(&self, on: bool) {
        self.state.lock().enabled_history.push(on);
    }
}

pub(crate) fn value_bindable(control: &Arc<TestControl>) -> ValueBindable<TestControl, i32> {
    ValueBindable::new(
        control,
        TestControl::record_enabled,
        TestControl::display,
        |c| c.user.signal(),
        |c| c.lifetime.clone(),
    )
}

pub(crate) fn action_bindable(control: &Arc<TestControl>) -> ActionBindable<TestControl, i32> {
    ActionBindable::new(
        control,
        TestControl::record_enabled,
        |c| c.user.signal(),
        |c| c.lifetime.clone(),
    )
}
