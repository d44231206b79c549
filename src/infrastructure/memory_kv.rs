use std::collections::HashMap;
use std::sync::RwLock;

use crate::domain::ports::{KeyValueStore, StorageChange, StorageListener};

/// Process-local key-value store. Listeners are told about every write,
/// standing in for cross-tab storage notifications.
#[derive(Default)]
pub struct InMemoryKeyValueStore {
    entries: RwLock<HashMap<String, String>>,
    listeners: RwLock<Vec<StorageListener>>,
}

impl InMemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn notify(&self, change: StorageChange) {
        let listeners = match self.listeners.read() {
            Ok(l) => l.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        for listener in listeners {
            listener(&change);
        }
    }
}

impl KeyValueStore for InMemoryKeyValueStore {
    fn get(&self, key: &str) -> Option<String> {
        let entries = match self.entries.read() {
            Ok(e) => e,
            Err(poisoned) => poisoned.into_inner(),
        };
        entries.get(key).cloned()
    }

    fn set(&self, key: &str, value: String) {
        {
            let mut entries = match self.entries.write() {
                Ok(e) => e,
                Err(poisoned) => poisoned.into_inner(),
            };
            entries.insert(key.to_string(), value.clone());
        }
        self.notify(StorageChange {
            key: key.to_string(),
            value: Some(value),
        });
    }

    fn remove(&self, key: &str) {
        let removed = {
            let mut entries = match self.entries.write() {
                Ok(e) => e,
                Err(poisoned) => poisoned.into_inner(),
            };
            entries.remove(key).is_some()
        };
        if removed {
            self.notify(StorageChange {
                key: key.to_string(),
                value: None,
            });
        }
    }

    fn subscribe(&self, listener: StorageListener) {
        let mut listeners = match self.listeners.write() {
            Ok(l) => l,
            Err(poisoned) => poisoned.into_inner(),
        };
        listeners.push(listener);
    }
}
