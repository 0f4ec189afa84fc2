//! Favorites store
//!
//! The set of favorited names, persisted as a JSON array under one storage
//! key. Every toggle writes the whole array back before returning. Changes
//! written by another process are picked up through storage events, last
//! writer wins.

use crate::constants::FAVORITES_KEY;
use crate::error::StorageError;
use crate::storage::{LocalStorage, StorageEvent};
use std::collections::HashSet;
use tracing::{debug, warn};

pub struct FavoritesStore {
    storage: LocalStorage,
    key: String,
    // Insertion order, for listing
    names: Vec<String>,
    // Membership
    set: HashSet<String>,
}

impl FavoritesStore {
    pub fn load(storage: LocalStorage) -> Self {
        Self::with_key(storage, FAVORITES_KEY)
    }

    pub fn with_key(mut storage: LocalStorage, key: &str) -> Self {
        let raw = match storage.get_item(key) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, key, "Failed to read favorites, starting empty");
                None
            }
        };
        if let Err(e) = storage.watch(key) {
            warn!(error = %e, key, "Failed to watch favorites key");
        }

        let mut store = Self {
            storage,
            key: key.to_string(),
            names: Vec::new(),
            set: HashSet::new(),
        };
        store.replace(parse_favorites(key, raw.as_deref()));
        debug!(count = store.names.len(), "Favorites loaded");
        store
    }

    pub fn favorites(&self) -> &[String] {
        &self.names
    }

    pub fn set(&self) -> &HashSet<String> {
        &self.set
    }

    pub fn is_favorite(&self, name: &str) -> bool {
        self.set.contains(name)
    }

    /// Add or remove `name`. Returns whether it is now a favorite.
    pub fn toggle_favorite(&mut self, name: &str) -> bool {
        let now_favorite = if self.set.remove(name) {
            self.names.retain(|n| n != name);
            false
        } else {
            self.set.insert(name.to_string());
            self.names.push(name.to_string());
            true
        };
        self.persist();
        debug!(name, favorite = now_favorite, "Favorite toggled");
        now_favorite
    }

    /// Adopt a change made in another context. Returns true when it applied.
    pub fn apply_storage_event(&mut self, event: &StorageEvent) -> bool {
        if event.key != self.key {
            return false;
        }
        let names = parse_favorites(&self.key, event.new_value.as_deref());
        debug!(count = names.len(), "Favorites replaced from storage event");
        self.replace(names);
        true
    }

    /// Poll storage for changes from other contexts and apply them
    pub fn sync(&mut self) -> Result<bool, StorageError> {
        let events = self.storage.poll_events()?;
        let mut changed = false;
        for event in &events {
            changed |= self.apply_storage_event(event);
        }
        Ok(changed)
    }

    fn replace(&mut self, names: Vec<String>) {
        self.set.clear();
        self.names.clear();
        for name in names {
            if self.set.insert(name.clone()) {
                self.names.push(name);
            }
        }
    }

    fn persist(&mut self) {
        match serde_json::to_string(&self.names) {
            Ok(json) => {
                if let Err(e) = self.storage.set_item(&self.key, &json) {
                    warn!(error = %e, "Failed to save favorites");
                }
            }
            Err(e) => warn!(error = %e, "Failed to serialize favorites"),
        }
    }
}

/// Absent or malformed content reads as no favorites
fn parse_favorites(key: &str, raw: Option<&str>) -> Vec<String> {
    let Some(raw) = raw else {
        return Vec::new();
    };
    match serde_json::from_str::<Vec<String>>(raw) {
        Ok(names) => names,
        Err(source) => {
            let e = StorageError::Malformed {
                key: key.to_string(),
                source,
            };
            warn!(error = %e, "Ignoring stored favorites");
            Vec::new()
        }
    }
}
