#![forbid(unsafe_code)]

//! Feedback-loop-free bindings between UI controls and reactive state.
//!
//! Controls expose themselves to the engine as bindables: a
//! [`ValueBindable`] is a two-way value endpoint (display a value, emit
//! user-driven changes), an [`ActionBindable`] the action-triggering
//! restriction of it. Bindables never own their control — the engine holds
//! a weak handle plus capability closures, and a dead control turns every
//! operation into a silent no-op.
//!
//! Three binding forms, all returning a teardown [`Disposable`]:
//!
//! - [`bind_value`]: two-way sync with a [`Property`]. The property seeds
//!   the control; afterwards property changes flow to the control
//!   asynchronously on the UI-affine scheduler while control edits flow to
//!   the property synchronously and win over concurrent background writes.
//!   No echo ever loops back.
//! - [`bind_action`]: control emissions invoke an [`Action`]; the action's
//!   effective enablement drives the control's interactivity.
//! - [`bind_trigger`]: payload-free [`bind_action`] for button-likes.
//!
//! Bindings tear themselves down when the property or action dies, when the
//! control's lifetime ends, or when the returned handle is disposed —
//! whichever comes first.
//!
//! ```
//! use std::sync::Arc;
//! use tether_bind::ValueBindable;
//! use tether_reactive::{Pipe, Lifetime, LifetimeToken, Property, UiScheduler};
//!
//! struct Slider {
//!     position: parking_lot::Mutex<f64>,
//!     moves: Pipe<f64>,
//!     lifetime: Lifetime,
//!     _token: LifetimeToken,
//! }
//!
//! let (lifetime, token) = Lifetime::make();
//! let slider = Arc::new(Slider {
//!     position: parking_lot::Mutex::new(0.0),
//!     moves: Pipe::new(),
//!     lifetime,
//!     _token: token,
//! });
//!
//! let bindable = ValueBindable::new(
//!     &slider,
//!     |_s, _enabled| {},
//!     |s, v| *s.position.lock() = v,
//!     |s| s.moves.signal(),
//!     |s| s.lifetime.clone(),
//! );
//!
//! let ui = UiScheduler::new();
//! let volume = Property::new(0.5);
//! let binding = bindable.bind_to(&volume, &ui.shared()).expect("slider is alive");
//!
//! assert_eq!(*slider.position.lock(), 0.5); // seeded
//! slider.moves.send(0.8);                   // user drags
//! assert_eq!(volume.get(), 0.8);
//! binding.dispose();
//! ```
//!
//! [`Property`]: tether_reactive::Property
//! [`Action`]: tether_reactive::Action
//! [`Disposable`]: tether_reactive::Disposable

pub mod action;
pub mod bindable;
pub(crate) mod handle;
pub mod transform;
pub mod value;

#[cfg(test)]
pub(crate) mod testing;

pub use action::{ActionStates, bind_action, bind_trigger};
pub use bindable::{ActionBindable, BindingTarget, ValueBindable};
pub use value::bind_value;
