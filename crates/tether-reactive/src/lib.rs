#![forbid(unsafe_code)]

//! Reactive primitives underpinning Tether's binding engine.
//!
//! This crate provides the infrastructure the binding layer in `tether-bind`
//! is written against:
//!
//! - [`Signal`] / [`Pipe`] / [`SignalEvent`]: push event streams with lazy
//!   `map`/`filter`/`filter_map`/`observe_on` combinators.
//! - [`Disposable`], [`CompositeDisposable`], [`SerialDisposable`],
//!   [`ScopedDisposable`]: idempotent teardown handles.
//! - [`Lifetime`] / [`LifetimeToken`]: end-of-life signals for independently
//!   owned objects.
//! - [`Scheduler`] / [`UiScheduler`]: the explicit UI-affine execution
//!   context; deterministic in tests, drained by the UI loop in production.
//! - [`Property`]: observable, synchronously readable/writable state cells
//!   with a never-failing change stream.
//! - [`Action`]: serial async commands with observable enablement and
//!   execution state.
//!
//! Everything here is `Send`-friendly: properties may be written from any
//! thread, and the scheduler is how effects reach the single UI-affine
//! context.

pub mod action;
pub mod disposable;
pub mod lifetime;
pub mod property;
pub mod scheduler;
pub mod signal;

pub use action::{Action, CompletionHandle, InvocationError, WeakAction};
pub use disposable::{CompositeDisposable, Disposable, ScopedDisposable, SerialDisposable};
pub use lifetime::{Lifetime, LifetimeToken};
pub use property::{Property, WeakProperty};
pub use scheduler::{Scheduler, SharedScheduler, UiScheduler, Work};
pub use signal::{Pipe, Signal, SignalEvent};
