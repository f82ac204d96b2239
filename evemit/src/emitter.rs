use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::{broadcast, mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use crate::config::EmitterConfig;
use crate::dispatcher::{lock_registry, Delivery, Dispatcher, EmissionMessage, ListenerFailure};
use crate::error::EmitterError;
use crate::registry::{normalize_name, Listener, Registry};
use crate::Emitter;

struct Shared<T> {
    registry: Arc<Mutex<Registry<T>>>,
    max_listeners: AtomicUsize,
    pending: Arc<AtomicUsize>,
    closed: AtomicBool,
    sender: mpsc::UnboundedSender<EmissionMessage<T>>,
    failures: broadcast::Sender<ListenerFailure>,
    cancel: CancellationToken,
}

/// In-process event emitter with one listener per event name.
///
/// Listeners receive the emitted values as a slice. Emissions are queued
/// and delivered by a single background task, in the order they were
/// accepted, one at a time.
///
/// `EventEmitter` is `Clone`; clones share the same registry and dispatcher.
/// The dispatcher stops once every clone has been dropped and the queue is
/// drained, or immediately on [`shutdown`](Self::shutdown). A listener that
/// captures a clone of its own emitter keeps it alive; call `shutdown` to
/// release such listeners.
pub struct EventEmitter<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for EventEmitter<T> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T: Send + 'static> EventEmitter<T> {
    /// Create an emitter with the default settings (capacity 10).
    ///
    /// # Panics
    ///
    /// Panics when called outside of a tokio runtime, since the dispatcher
    /// is spawned on the current runtime.
    pub fn new() -> Self {
        Self::with_config(EmitterConfig::default())
    }

    /// Create an emitter from an explicit configuration.
    ///
    /// # Panics
    ///
    /// Panics when called outside of a tokio runtime.
    pub fn with_config(config: EmitterConfig) -> Self {
        let registry = Arc::new(Mutex::new(Registry::new()));
        let pending = Arc::new(AtomicUsize::new(0));
        let (failures, _) = broadcast::channel(config.failure_capacity.max(1));
        let cancel = CancellationToken::new();
        let (sender, rx) = mpsc::unbounded_channel();

        Dispatcher {
            registry: registry.clone(),
            pending: pending.clone(),
            failures: failures.clone(),
            cancel: cancel.clone(),
        }
        .spawn(rx);

        Self {
            shared: Arc::new(Shared {
                registry,
                max_listeners: AtomicUsize::new(config.max_listeners),
                pending,
                closed: AtomicBool::new(false),
                sender,
                failures,
                cancel,
            }),
        }
    }
}

impl<T: Send + 'static> Default for EventEmitter<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + 'static> EventEmitter<T> {
    fn lock(&self) -> MutexGuard<'_, Registry<T>> {
        lock_registry(&self.shared.registry)
    }

    fn register(
        &self,
        event_name: &str,
        callback: Listener<T>,
        once: bool,
    ) -> Result<(), EmitterError> {
        let name = normalize_name(event_name)?;
        let mut registry = self.lock();
        if self.is_closed() {
            return Err(EmitterError::EmitterClosed);
        }
        let max = self.max_event_listeners();
        match registry.insert(name, callback, once, max) {
            Ok(_) => {
                tracing::debug!(event = %name, once, "Listener registered");
                Ok(())
            }
            Err(err) => {
                if let EmitterError::MaxListenerLimit(_) = err {
                    tracing::warn!(event = %name, max, "Listener rejected, registry is full");
                }
                Err(err)
            }
        }
    }

    fn enqueue(
        &self,
        event_name: &str,
        args: Vec<T>,
        ack: Option<oneshot::Sender<Delivery>>,
    ) -> Result<(), EmitterError> {
        let name = normalize_name(event_name)?;
        let registry = self.lock();
        if self.is_closed() {
            return Err(EmitterError::EmitterClosed);
        }
        if !registry.contains(name) {
            return Err(EmitterError::NoEventFound(name.to_string()));
        }

        let max = self.max_event_listeners();
        let pending = self.shared.pending.load(Ordering::SeqCst);
        if pending >= max {
            tracing::warn!(event = %name, pending, max, "Emission rejected, queue is full");
            return Err(EmitterError::MaxListenerLimit(max));
        }

        self.shared.pending.fetch_add(1, Ordering::SeqCst);
        let message = EmissionMessage {
            event_name: name.to_string(),
            args,
            ack,
        };
        if self.shared.sender.send(message).is_err() {
            self.shared.pending.fetch_sub(1, Ordering::SeqCst);
            return Err(EmitterError::EmitterClosed);
        }
        Ok(())
    }

    /// Emit and wait until the dispatcher has handled this emission.
    ///
    /// Validation is identical to [`Emitter::emit`]. The returned
    /// [`Delivery`] reports whether the listener ran, was removed before
    /// delivery, or panicked. Returns `EmitterClosed` if the emitter shuts
    /// down before the message is delivered.
    pub async fn emit_and_wait(
        &self,
        event_name: &str,
        args: Vec<T>,
    ) -> Result<Delivery, EmitterError> {
        let (ack, rx) = oneshot::channel();
        self.enqueue(event_name, args, Some(ack))?;
        rx.await.map_err(|_| EmitterError::EmitterClosed)
    }

    /// Subscribe to listener failures (panics) reported by the dispatcher.
    ///
    /// Only failures occurring after this call are received.
    pub fn failures(&self) -> broadcast::Receiver<ListenerFailure> {
        self.shared.failures.subscribe()
    }

    /// Number of accepted emissions not yet handled by the dispatcher.
    pub fn pending(&self) -> usize {
        self.shared.pending.load(Ordering::SeqCst)
    }

    /// Stop the dispatcher and reject all further registrations and emissions.
    ///
    /// A listener already running completes; emissions still queued are
    /// discarded and every registered listener is dropped. Calling this more
    /// than once has no further effect.
    pub fn shutdown(&self) {
        let records = {
            let mut registry = self.lock();
            if self.shared.closed.swap(true, Ordering::SeqCst) {
                return;
            }
            registry.take_all()
        };
        self.shared.cancel.cancel();
        tracing::info!(listeners = records.len(), "Event emitter shut down");
        // Dropped outside the lock: a listener may own the last emitter handle.
        drop(records);
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::SeqCst)
    }
}

impl<T: Send + 'static> Emitter<T> for EventEmitter<T> {
    fn on<F>(&self, event_name: &str, callback: F) -> Result<(), EmitterError>
    where
        F: Fn(&[T]) + Send + Sync + 'static,
    {
        self.register(event_name, Arc::new(callback), false)
    }

    fn once<F>(&self, event_name: &str, callback: F) -> Result<(), EmitterError>
    where
        F: Fn(&[T]) + Send + Sync + 'static,
    {
        self.register(event_name, Arc::new(callback), true)
    }

    fn off(&self, event_name: &str) -> bool {
        let removed = self.lock().remove(event_name.trim());
        if removed {
            tracing::debug!(event = %event_name.trim(), "Listener removed");
        }
        removed
    }

    fn remove_all_listeners(&self) {
        let mut registry = self.lock();
        let count = registry.len();
        registry.clear();
        tracing::debug!(count, "All listeners removed");
    }

    fn emit(&self, event_name: &str, args: Vec<T>) -> Result<(), EmitterError> {
        self.enqueue(event_name, args, None)
    }

    fn len(&self) -> usize {
        self.lock().len()
    }

    fn event_names(&self) -> Vec<String> {
        self.lock().names()
    }

    fn max_event_listeners(&self) -> usize {
        self.shared.max_listeners.load(Ordering::SeqCst)
    }

    fn set_max_event_listeners(&self, max: usize) {
        self.shared.max_listeners.store(max, Ordering::SeqCst);
    }
}
