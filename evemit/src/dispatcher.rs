use std::any::Any;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;

use crate::registry::Registry;

/// A queued request to invoke the listener registered under `event_name`.
pub(crate) struct EmissionMessage<T> {
    pub(crate) event_name: String,
    pub(crate) args: Vec<T>,
    pub(crate) ack: Option<oneshot::Sender<Delivery>>,
}

/// What happened to a single emission once the dispatcher reached it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// The listener ran to completion.
    Invoked,
    /// The listener was removed between `emit` and delivery.
    Dropped,
    /// The listener panicked. Carries the panic message.
    Failed(String),
}

/// Published on [`EventEmitter::failures`](crate::EventEmitter::failures)
/// whenever a listener panics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerFailure {
    pub event: String,
    pub message: String,
}

pub(crate) fn lock_registry<T>(registry: &Mutex<Registry<T>>) -> MutexGuard<'_, Registry<T>> {
    // Listeners never run under this lock, so a poisoned map is still consistent.
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The single consumer of an emitter's queue.
///
/// Messages are handled strictly one at a time: the next message is not
/// dequeued until the current listener has returned and, for one-shot
/// listeners, its record has been removed.
pub(crate) struct Dispatcher<T> {
    pub(crate) registry: Arc<Mutex<Registry<T>>>,
    pub(crate) pending: Arc<AtomicUsize>,
    pub(crate) failures: broadcast::Sender<ListenerFailure>,
    pub(crate) cancel: CancellationToken,
}

impl<T: Send + 'static> Dispatcher<T> {
    pub(crate) fn spawn(self, rx: mpsc::UnboundedReceiver<EmissionMessage<T>>) -> JoinHandle<()> {
        tokio::spawn(self.run(rx))
    }

    async fn run(self, mut rx: mpsc::UnboundedReceiver<EmissionMessage<T>>) {
        tracing::info!("Event dispatcher started");
        loop {
            let message = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                message = rx.recv() => match message {
                    Some(message) => message,
                    None => break,
                },
            };
            self.deliver(message).await;
        }

        rx.close();
        let mut discarded = 0usize;
        while rx.try_recv().is_ok() {
            self.pending.fetch_sub(1, Ordering::SeqCst);
            discarded += 1;
        }
        if discarded > 0 {
            tracing::debug!(discarded, "Discarded undelivered emissions");
        }
        tracing::info!("Event dispatcher stopped");
    }

    async fn deliver(&self, message: EmissionMessage<T>) {
        let EmissionMessage {
            event_name,
            args,
            ack,
        } = message;

        let record = lock_registry(&self.registry).get(&event_name).cloned();
        let outcome = match record {
            None => {
                tracing::debug!(
                    event = %event_name,
                    "No listener at delivery time, dropping emission"
                );
                Delivery::Dropped
            }
            Some(record) => {
                let callback = record.callback.clone();
                let result = tokio::task::spawn_blocking(move || callback(args.as_slice())).await;

                if record.once
                    && lock_registry(&self.registry).remove_if_id(&event_name, record.id)
                {
                    tracing::debug!(event = %event_name, "One-shot listener removed");
                }

                match result {
                    Ok(()) => Delivery::Invoked,
                    Err(err) => {
                        let message = failure_message(err);
                        tracing::error!(event = %event_name, error = %message, "Listener failed");
                        // No subscribers is fine.
                        let _ = self.failures.send(ListenerFailure {
                            event: event_name,
                            message: message.clone(),
                        });
                        Delivery::Failed(message)
                    }
                }
            }
        };

        self.pending.fetch_sub(1, Ordering::SeqCst);
        if let Some(ack) = ack {
            let _ = ack.send(outcome);
        }
    }
}

fn failure_message(err: JoinError) -> String {
    if !err.is_panic() {
        return "listener task was cancelled".to_string();
    }
    let payload: Box<dyn Any + Send> = err.into_panic();
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "listener panicked".to_string()
    }
}
