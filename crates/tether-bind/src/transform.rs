#![forbid(unsafe_code)]

//! Output transforms for action bindables.
//!
//! [`ActionBindable::lift_output`] rebuilds a bindable around the same
//! control and enablement with its value stream composed through a pure
//! stream transform. `map_output`, `filter_output`, `filter_map_output`,
//! and `skip_none_output` are the usual specializations. Transforms are
//! lazy — nothing subscribes until the bindable is bound — and compose
//! functionally: `map_output(f).map_output(g)` emits exactly what
//! `map_output(g ∘ f)` does.

use std::sync::Arc;

use tether_reactive::Signal;

use crate::bindable::{ActionBindable, ValueBindable};
use crate::handle::ControlHandle;

impl<C: Send + Sync + 'static, V: Clone + Send + 'static> ActionBindable<C, V> {
    /// Compose the value stream through `transform`, keeping the control
    /// and enablement capabilities. Inert if the control is already gone.
    #[must_use]
    pub fn lift_output<U: Clone + Send + 'static>(
        &self,
        transform: impl Fn(Signal<V>) -> Signal<U> + Send + Sync + 'static,
    ) -> ActionBindable<C, U> {
        if self.handle.upgrade().is_none() {
            return ActionBindable::inert();
        }
        let values = Arc::clone(&self.handle.values);
        let transform = Arc::new(transform);
        ActionBindable {
            handle: ControlHandle {
                control: self.handle.control.clone(),
                set_enabled: Arc::clone(&self.handle.set_enabled),
                values: Arc::new(move |control: &C| transform(values(control))),
                lifetime: Arc::clone(&self.handle.lifetime),
                action_did_bind: self.handle.action_did_bind.clone(),
            },
        }
    }

    /// Transform every emitted value with `f`.
    #[must_use]
    pub fn map_output<U: Clone + Send + 'static>(
        &self,
        f: impl Fn(V) -> U + Send + Sync + 'static,
    ) -> ActionBindable<C, U> {
        let f = Arc::new(f);
        self.lift_output(move |signal| {
            let f = Arc::clone(&f);
            signal.map(move |value| f(value))
        })
    }

    /// Keep only emissions passing `predicate`.
    #[must_use]
    pub fn filter_output(
        &self,
        predicate: impl Fn(&V) -> bool + Send + Sync + 'static,
    ) -> ActionBindable<C, V> {
        let predicate = Arc::new(predicate);
        self.lift_output(move |signal| {
            let predicate = Arc::clone(&predicate);
            signal.filter(move |value| predicate(value))
        })
    }

    /// Map and filter in one pass: `None` results are dropped.
    #[must_use]
    pub fn filter_map_output<U: Clone + Send + 'static>(
        &self,
        f: impl Fn(V) -> Option<U> + Send + Sync + 'static,
    ) -> ActionBindable<C, U> {
        let f = Arc::new(f);
        self.lift_output(move |signal| {
            let f = Arc::clone(&f);
            signal.filter_map(move |value| f(value))
        })
    }
}

impl<C: Send + Sync + 'static, U: Clone + Send + 'static> ActionBindable<C, Option<U>> {
    /// Drop absent-valued emissions, unwrapping the rest.
    #[must_use]
    pub fn skip_none_output(&self) -> ActionBindable<C, U> {
        self.lift_output(|signal| signal.filter_map(|value| value))
    }
}

impl<C: Send + Sync + 'static, V: Clone + Send + 'static> ValueBindable<C, V> {
    /// Transform every emitted value with `f`, viewing this bindable as an
    /// action bindable.
    #[must_use]
    pub fn map_output<U: Clone + Send + 'static>(
        &self,
        f: impl Fn(V) -> U + Send + Sync + 'static,
    ) -> ActionBindable<C, U> {
        self.action_bindable().map_output(f)
    }

    /// Keep only emissions passing `predicate`, as an action bindable.
    #[must_use]
    pub fn filter_output(
        &self,
        predicate: impl Fn(&V) -> bool + Send + Sync + 'static,
    ) -> ActionBindable<C, V> {
        self.action_bindable().filter_output(predicate)
    }

    /// Map and filter in one pass, as an action bindable.
    #[must_use]
    pub fn filter_map_output<U: Clone + Send + 'static>(
        &self,
        f: impl Fn(V) -> Option<U> + Send + Sync + 'static,
    ) -> ActionBindable<C, U> {
        self.action_bindable().filter_map_output(f)
    }
}

impl<C: Send + Sync + 'static, U: Clone + Send + 'static> ValueBindable<C, Option<U>> {
    /// Drop absent-valued emissions, unwrapping the rest.
    #[must_use]
    pub fn skip_none_output(&self) -> ActionBindable<C, U> {
        self.action_bindable().skip_none_output()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{TestControl, action_bindable};
    use parking_lot::Mutex;

    fn emissions<U: Clone + Send + 'static>(
        bindable: &ActionBindable<TestControl, U>,
    ) -> Arc<Mutex<Vec<U>>> {
        let control = bindable.handle.upgrade().expect("live control");
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = Arc::clone(&seen);
        // Discarding the handle leaves the subscription alive.
        let _ = (bindable.handle.values)(&control).observe_values(move |v| s.lock().push(v));
        seen
    }

    #[test]
    fn map_output_transforms_emissions() {
        let control = TestControl::new();
        let mapped = action_bindable(&control).map_output(|v| v * 10);
        let seen = emissions(&mapped);

        control.user_edit(1);
        control.user_edit(2);
        assert_eq!(*seen.lock(), vec![10, 20]);
    }

    #[test]
    fn filter_output_drops_emissions() {
        let control = TestControl::new();
        let filtered = action_bindable(&control).filter_output(|v| v % 2 == 0);
        let seen = emissions(&filtered);

        for v in 0..5 {
            control.user_edit(v);
        }
        assert_eq!(*seen.lock(), vec![0, 2, 4]);
    }

    #[test]
    fn chained_maps_equal_composed_map() {
        let f = |v: i32| v + 3;
        let g = |v: i32| v * 2;

        let control = TestControl::new();
        let chained = emissions(&action_bindable(&control).map_output(f).map_output(g));
        let composed = emissions(&action_bindable(&control).map_output(move |v| g(f(v))));

        for v in [0, 1, -4, 100] {
            control.user_edit(v);
        }
        assert_eq!(*chained.lock(), *composed.lock());
    }

    #[test]
    fn skip_none_output_unwraps() {
        let control = TestControl::new();
        let parsed = action_bindable(&control)
            .map_output(|v| if v >= 0 { Some(v as u32) } else { None })
            .skip_none_output();
        let seen = emissions(&parsed);

        control.user_edit(-1);
        control.user_edit(4);
        assert_eq!(*seen.lock(), vec![4u32]);
    }

    #[test]
    fn transform_of_dead_control_is_inert() {
        let control = TestControl::new();
        let bindable = action_bindable(&control);
        drop(control);

        let mapped = bindable.map_output(|v| v + 1);
        assert!(mapped.handle.upgrade().is_none());
    }

    #[test]
    fn transforms_are_lazy() {
        let control = TestControl::new();
        let calls = Arc::new(Mutex::new(0usize));
        let c = Arc::clone(&calls);
        let _mapped = action_bindable(&control).map_output(move |v: i32| {
            *c.lock() += 1;
            v
        });

        control.user_edit(1);
        assert_eq!(*calls.lock(), 0, "unbound transform must not observe the stream");
    }

    #[test]
    fn transform_keeps_post_bind_hook() {
        let control = TestControl::new();
        let bindable = action_bindable(&control)
            .with_post_bind_hook(|_control, _states, _group| {})
            .map_output(|v| v);
        assert!(bindable.handle.action_did_bind.is_some());
    }

    #[test]
    fn transform_shares_the_source_stream() {
        let control = TestControl::new();
        let mapped = action_bindable(&control).map_output(|v| v);
        let _seen = emissions(&mapped);
        assert_eq!(
            control.user_observer_count(),
            1,
            "a bound transform subscribes the source exactly once"
        );
    }
}
