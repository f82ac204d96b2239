//! In-process typed event emitter.
//!
//! An [`EventEmitter<T>`] maps event names to a single listener each.
//! `emit` validates the name, queues the payload and returns immediately;
//! one background task per emitter delivers queued emissions in order.
//!
//! ```ignore
//! use evemit::prelude::*;
//!
//! let emitter = EventEmitter::<i32>::new();
//! emitter.on("data", |vals| println!("data -> {vals:?}"))?;
//! emitter.once("ready", |_| println!("ready"))?;
//!
//! emitter.emit("data", vec![1, 2, 3])?;
//! emitter.emit_and_wait("ready", vec![]).await?;
//! ```

mod config;
mod dispatcher;
mod emitter;
mod error;
mod registry;

pub use config::{EmitterConfig, DEFAULT_FAILURE_CAPACITY, DEFAULT_MAX_LISTENERS, MAX_LISTENERS_ENV};
pub use dispatcher::{Delivery, ListenerFailure};
pub use emitter::EventEmitter;
pub use error::{ConfigError, EmitterError};

/// Registration, removal, emission and introspection over named listeners.
///
/// Every mutating call is fallible except removal; introspection never fails.
pub trait Emitter<T> {
    /// Register `callback` under `event_name`.
    ///
    /// Fails with `NoEventName` for an empty name, `DuplicateListeners` if
    /// the name is taken, and `MaxListenerLimit` when the registry is full.
    fn on<F>(&self, event_name: &str, callback: F) -> Result<(), EmitterError>
    where
        F: Fn(&[T]) + Send + Sync + 'static;

    /// Like [`on`](Emitter::on), but the listener is removed after it has
    /// been invoked once.
    fn once<F>(&self, event_name: &str, callback: F) -> Result<(), EmitterError>
    where
        F: Fn(&[T]) + Send + Sync + 'static;

    /// Remove the listener under `event_name`. Returns whether one existed.
    fn off(&self, event_name: &str) -> bool;

    fn remove_all_listeners(&self);

    /// Queue an emission for the listener under `event_name`.
    ///
    /// Returns as soon as the emission is queued; the listener runs later
    /// on the dispatcher.
    fn emit(&self, event_name: &str, args: Vec<T>) -> Result<(), EmitterError>;

    /// Number of registered event names.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Registered event names, in no particular order.
    fn event_names(&self) -> Vec<String>;

    fn max_event_listeners(&self) -> usize;

    /// Takes effect for every subsequent registration and emission.
    fn set_max_event_listeners(&self, max: usize);

    /// Alias of [`on`](Emitter::on).
    fn add_event_listener<F>(&self, event_name: &str, callback: F) -> Result<(), EmitterError>
    where
        F: Fn(&[T]) + Send + Sync + 'static,
    {
        self.on(event_name, callback)
    }

    /// Alias of [`off`](Emitter::off).
    fn remove_event_listener(&self, event_name: &str) -> bool {
        self.off(event_name)
    }
}

pub mod prelude {
    //! Re-exports of the most commonly used emitter types.
    pub use crate::{Delivery, Emitter, EmitterConfig, EmitterError, EventEmitter};
}
