//! State Store
//!
//! Ordered key/value map owned exclusively by one process. Overwrites keep
//! the key's original position, so `list` is deterministic insertion order.
//!
//! Every check in [`StateStore::set`] runs before the map is touched: a
//! rejected write never leaves a partial mutation behind.

use crate::error::StoreError;
use ao_config::StoreSettings;
use indexmap::IndexMap;

/// Bounds enforced on writes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreLimits {
    /// Maximum number of distinct keys; `None` is unbounded
    pub capacity: Option<usize>,
    pub max_key_len: Option<usize>,
    pub max_value_len: Option<usize>,
    /// Restrict keys to `[A-Za-z0-9_-]`
    pub strict_keys: bool,
}

impl StoreLimits {
    /// No limits at all
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Only a capacity bound
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: Some(capacity),
            ..Self::default()
        }
    }
}

impl From<&StoreSettings> for StoreLimits {
    fn from(settings: &StoreSettings) -> Self {
        Self {
            capacity: settings.capacity,
            max_key_len: settings.max_key_len,
            max_value_len: settings.max_value_len,
            strict_keys: settings.strict_keys,
        }
    }
}

/// Saved copy of the store contents, restored when a transaction fails
#[derive(Debug, Clone)]
pub struct Checkpoint {
    entries: IndexMap<String, String>,
}

/// In-process key/value store
#[derive(Debug, Clone, Default)]
pub struct StateStore {
    entries: IndexMap<String, String>,
    limits: StoreLimits,
}

impl StateStore {
    pub fn new(limits: StoreLimits) -> Self {
        Self {
            entries: IndexMap::new(),
            limits,
        }
    }

    pub fn unbounded() -> Self {
        Self::new(StoreLimits::unbounded())
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self::new(StoreLimits::with_capacity(capacity))
    }

    pub fn limits(&self) -> &StoreLimits {
        &self.limits
    }

    /// Insert or overwrite `key`
    ///
    /// A new key on a full store fails with [`StoreError::CapacityExceeded`];
    /// an existing key is always overwritten in place.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> Result<(), StoreError> {
        let key = key.into();
        let value = value.into();
        self.check_key(&key)?;
        self.check_value(&value)?;

        if let Some(slot) = self.entries.get_mut(&key) {
            *slot = value;
            return Ok(());
        }

        if let Some(capacity) = self.limits.capacity {
            if self.entries.len() >= capacity {
                return Err(StoreError::CapacityExceeded { key, capacity });
            }
        }

        self.entries.insert(key, value);
        Ok(())
    }

    /// Current value of `key`, `None` when absent
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Entries in insertion order; empty on a fresh store
    pub fn list(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Borrow the ordered map backing the store
    pub fn entries(&self) -> &IndexMap<String, String> {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.limits
            .capacity
            .map_or(false, |capacity| self.entries.len() >= capacity)
    }

    /// Drop every entry, keeping the limits
    pub fn reset(&mut self) {
        self.entries.clear();
    }

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            entries: self.entries.clone(),
        }
    }

    pub fn restore(&mut self, checkpoint: Checkpoint) {
        self.entries = checkpoint.entries;
    }

    /// Run `f` against the store, undoing all of its writes if it fails
    pub fn transaction<T, E>(
        &mut self,
        f: impl FnOnce(&mut StateStore) -> Result<T, E>,
    ) -> Result<T, E> {
        let checkpoint = self.checkpoint();
        let result = f(self);
        if result.is_err() {
            self.restore(checkpoint);
        }
        result
    }

    /// Entries as a JSON object, `{}` when empty
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.entries
                .iter()
                .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
                .collect(),
        )
    }

    fn check_key(&self, key: &str) -> Result<(), StoreError> {
        if key.is_empty() {
            return Err(StoreError::EmptyKey);
        }
        if let Some(limit) = self.limits.max_key_len {
            if key.len() > limit {
                return Err(StoreError::KeyTooLong {
                    len: key.len(),
                    limit,
                });
            }
        }
        if self.limits.strict_keys && !is_valid_key(key) {
            return Err(StoreError::InvalidKeyFormat {
                key: key.to_string(),
            });
        }
        Ok(())
    }

    fn check_value(&self, value: &str) -> Result<(), StoreError> {
        if let Some(limit) = self.limits.max_value_len {
            if value.len() > limit {
                return Err(StoreError::ValueTooLong {
                    len: value.len(),
                    limit,
                });
            }
        }
        Ok(())
    }
}

/// Strict key charset: ASCII alphanumerics, `_` and `-`
pub fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}
