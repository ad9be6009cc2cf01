#![forbid(unsafe_code)]

//! Two-way synchronization between a control and a mutable property.
//!
//! [`bind_value`] seeds the control from the property, then keeps both in
//! sync without feedback loops:
//!
//! - Property-originated changes reach the control asynchronously on the
//!   UI-affine scheduler, through a single pending slot — changes arriving
//!   faster than the UI services them collapse to the latest.
//! - Control-originated changes reach the property synchronously, on
//!   whatever context the control's stream delivers on, and always win over
//!   a concurrently pending property write: the pending scheduled write is
//!   cancelled and a "replacing" flag suppresses the echo the property
//!   write would otherwise bounce back at the control.
//!
//! # Invariants
//!
//! 1. The seed write happens exactly once, under the property's exclusive
//!    access, before any stream emission is processed — no concurrent
//!    property write can be missed or double-applied during setup.
//! 2. One control-originated update suppresses exactly one echo; the flag
//!    is only set around the synchronous property write.
//! 3. Teardown fires on the first of: explicit disposal, property lifetime
//!    end, change-stream completion, control lifetime end. All paths are
//!    idempotent.
//!
//! # Failure Modes
//!
//! - Control dies mid-binding: control writes become silent no-ops; the
//!   property side stays live until a teardown path fires.
//! - Property dies mid-binding: the change stream completes and the whole
//!   group is disposed.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::trace;

use tether_reactive::{
    CompositeDisposable, Disposable, Property, SerialDisposable, SharedScheduler, SignalEvent,
};

use crate::bindable::ValueBindable;

/// Create a two-way value binding between `bindable`'s control and
/// `property`, using the current property value as the initial value.
/// Control-originated input takes precedence over concurrent background
/// changes.
///
/// Returns `None` if the control is already gone. The returned handle tears
/// down the whole binding; disposing it early is safe and idempotent, and
/// discarding it leaves the binding alive until a lifetime ends.
pub fn bind_value<C, V>(
    bindable: &ValueBindable<C, V>,
    property: &Property<V>,
    ui: &SharedScheduler,
) -> Option<Disposable>
where
    C: Send + Sync + 'static,
    V: Clone + Send + 'static,
{
    // Holding a strong reference for the duration of setup keeps the
    // control's lifetime from ending mid-wire.
    let control = bindable.handle.upgrade()?;
    let group = CompositeDisposable::new();

    property.with_exclusive(|current| {
        let pending = SerialDisposable::new();
        let replacing = Arc::new(AtomicBool::new(false));

        // Disposing the group must also drop any scheduled-but-unserviced
        // control write.
        {
            let pending = pending.clone();
            group.add(Disposable::new(move || pending.dispose()));
        }

        // Seed the control before any emission is processed.
        (bindable.set_value)(&control, current.clone());

        // Property -> control: each change schedules a control write into
        // the single pending slot, replacing any write not yet serviced.
        {
            let weak_control = bindable.handle.control.clone();
            let set_value = Arc::clone(&bindable.set_value);
            let replacing = Arc::clone(&replacing);
            let pending = pending.clone();
            let group = group.clone();
            let ui = Arc::clone(ui);
            group.clone().add(property.changes().observe(move |event| {
                let weak_control = weak_control.clone();
                let set_value = Arc::clone(&set_value);
                let replacing = Arc::clone(&replacing);
                let group = group.clone();
                pending.replace(Some(ui.schedule(Box::new(move || {
                    // A control-originated update is mid-flight; its
                    // property write echoed back here. Drop it.
                    if replacing.load(Ordering::Acquire) {
                        return;
                    }
                    match event {
                        SignalEvent::Value(value) => {
                            if let Some(control) = weak_control.upgrade() {
                                set_value(&control, value);
                            }
                        }
                        SignalEvent::Completed => group.dispose(),
                    }
                }))));
            }));
        }

        // Control -> property: synchronous, and the user's input wins over
        // whatever the background queued. Property writes are synchronous
        // by contract, so a boolean flag suffices as the loop breaker.
        {
            let weak_property = property.downgrade();
            let replacing = Arc::clone(&replacing);
            group.add(
                (bindable.handle.values)(&control).observe_values(move |value| {
                    let Some(property) = weak_property.upgrade() else {
                        return;
                    };
                    replacing.store(true, Ordering::Release);
                    pending.clear();
                    property.set(value);
                    replacing.store(false, Ordering::Release);
                }),
            );
        }
    });

    // First lifetime to end tears down the whole group.
    {
        let g = group.clone();
        group.add(property.lifetime().observe_ended(move || g.dispose()));
    }
    {
        let g = group.clone();
        group.add((bindable.handle.lifetime)(&control).observe_ended(move || g.dispose()));
    }

    trace!("value binding established");
    Some(group.to_disposable())
}
