use std::collections::HashMap;
use std::sync::Arc;

use crate::error::EmitterError;

/// Callback invoked with the emitted payload sequence.
pub(crate) type Listener<T> = Arc<dyn Fn(&[T]) + Send + Sync>;

/// A registered callback and whether it fires only once.
pub(crate) struct ListenerRecord<T> {
    pub(crate) id: u64,
    pub(crate) once: bool,
    pub(crate) callback: Listener<T>,
}

impl<T> Clone for ListenerRecord<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            once: self.once,
            callback: self.callback.clone(),
        }
    }
}

/// Name-to-listener map. Not synchronized; the emitter wraps it in a mutex
/// shared by callers and the dispatcher.
pub(crate) struct Registry<T> {
    events: HashMap<String, ListenerRecord<T>>,
    next_id: u64,
}

/// Trim an event name, rejecting names that are empty afterwards.
pub(crate) fn normalize_name(name: &str) -> Result<&str, EmitterError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(EmitterError::NoEventName);
    }
    Ok(name)
}

impl<T> Registry<T> {
    pub(crate) fn new() -> Self {
        Self {
            events: HashMap::new(),
            next_id: 0,
        }
    }

    /// Insert a record for an already-normalized name.
    pub(crate) fn insert(
        &mut self,
        name: &str,
        callback: Listener<T>,
        once: bool,
        max: usize,
    ) -> Result<u64, EmitterError> {
        if self.events.contains_key(name) {
            return Err(EmitterError::DuplicateListeners(name.to_string()));
        }
        if self.events.len() >= max {
            return Err(EmitterError::MaxListenerLimit(max));
        }
        let id = self.next_id;
        self.next_id += 1;
        self.events.insert(name.to_string(), ListenerRecord { id, once, callback });
        Ok(id)
    }

    pub(crate) fn get(&self, name: &str) -> Option<&ListenerRecord<T>> {
        self.events.get(name)
    }

    pub(crate) fn contains(&self, name: &str) -> bool {
        self.events.contains_key(name)
    }

    pub(crate) fn remove(&mut self, name: &str) -> bool {
        self.events.remove(name).is_some()
    }

    /// Remove `name` only if it still holds the record with `id`.
    pub(crate) fn remove_if_id(&mut self, name: &str, id: u64) -> bool {
        match self.events.get(name) {
            Some(record) if record.id == id => self.events.remove(name).is_some(),
            _ => false,
        }
    }

    pub(crate) fn clear(&mut self) {
        self.events.clear();
    }

    /// Move every record out, leaving the registry empty.
    pub(crate) fn take_all(&mut self) -> HashMap<String, ListenerRecord<T>> {
        std::mem::take(&mut self.events)
    }

    pub(crate) fn len(&self) -> usize {
        self.events.len()
    }

    pub(crate) fn names(&self) -> Vec<String> {
        self.events.keys().cloned().collect()
    }
}
