//! Local persistence of named JSON blobs.
//!
//! # Architecture
//!
//! - [`KeyValueStore`] is the raw string store (the native stand-in for
//!   browser local storage)
//! - [`Persistence`] layers JSON (de)serialization on top of any store
//! - Reads never fail: a missing, unreadable or malformed blob is reported
//!   as absent and logged
//!
//! There are no transactions. The last writer wins, and two processes
//! sharing one directory can overwrite each other's cart.

#[cfg(test)]
mod failing;
mod file;
mod memory;

#[cfg(test)]
pub(crate) use failing::FailingStore;
pub use file::FileStore;
pub use memory::MemoryStore;

use std::path::PathBuf;

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Storage keys for client state.
pub mod keys {
    /// Key for the signed-in user's session.
    pub const CURRENT_USER: &str = "currentUser";

    /// Key for the cart line items.
    pub const CART: &str = "cart";

    /// Key for the wishlist snapshots.
    pub const WISHLIST: &str = "wishlist";
}

/// Errors raised when writing to or clearing the store.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading or writing the backing file failed.
    #[error("storage I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The value could not be encoded as JSON.
    #[error("could not encode value for {key}: {source}")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// Keys are limited to ASCII letters, digits, `-` and `_`.
    #[error("invalid storage key: {0:?}")]
    InvalidKey(String),
}

/// A string key-value store.
pub trait KeyValueStore {
    /// Fetch the raw value for `key`, or `None` if it was never set.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is invalid or the backing medium fails.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is invalid or the backing medium fails.
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete `key`. Removing a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is invalid or the backing medium fails.
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
}

/// Validate a storage key.
///
/// # Errors
///
/// Returns [`StorageError::InvalidKey`] for empty keys or keys containing
/// anything other than ASCII alphanumerics, `-` and `_`.
pub fn validate_key(key: &str) -> Result<(), StorageError> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidKey(key.to_string()))
    }
}

/// JSON persistence over a [`KeyValueStore`].
#[derive(Debug, Clone, Default)]
pub struct Persistence<S> {
    store: S,
}

impl<S: KeyValueStore> Persistence<S> {
    #[must_use]
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    /// Serialize `value` to JSON and store it under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the underlying write fails.
    pub fn save<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) -> Result<(), StorageError> {
        let json = serde_json::to_string(value).map_err(|source| StorageError::Serialize {
            key: key.to_string(),
            source,
        })?;
        self.store.set(key, &json)
    }

    /// Load and deserialize the value under `key`.
    ///
    /// Returns `None` if the key is absent, unreadable or holds malformed JSON.
    #[must_use]
    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.store.get(key) {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::warn!(key, error = %e, "Failed to read stored value");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(key, error = %e, "Ignoring malformed stored value");
                None
            }
        }
    }

    /// Delete the value under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying delete fails.
    pub fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.store.remove(key)
    }

    /// The underlying store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Give back the underlying store.
    #[must_use]
    pub fn into_store(self) -> S {
        self.store
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Note {
        text: String,
        pinned: bool,
    }

    #[test]
    fn test_validate_key() {
        assert!(validate_key(keys::CURRENT_USER).is_ok());
        assert!(validate_key("cart_v2-backup").is_ok());
        assert!(validate_key("").is_err());
        assert!(validate_key("../etc/passwd").is_err());
        assert!(validate_key("a b").is_err());
    }

    #[test]
    fn test_save_then_load() {
        let mut persistence = Persistence::new(MemoryStore::new());
        let note = Note {
            text: "buy millet".to_string(),
            pinned: true,
        };

        persistence.save("note", &note).unwrap();
        assert_eq!(persistence.load::<Note>("note"), Some(note));
    }

    #[test]
    fn test_load_absent_is_none() {
        let persistence = Persistence::new(MemoryStore::new());
        assert!(persistence.load::<Note>("note").is_none());
    }

    #[test]
    fn test_load_malformed_is_none() {
        let mut store = MemoryStore::new();
        store.set("note", "{not json").unwrap();
        store.set("other", r#"{"text": 5}"#).unwrap();

        let persistence = Persistence::new(store);
        assert!(persistence.load::<Note>("note").is_none());
        assert!(persistence.load::<Note>("other").is_none());
    }

    #[test]
    fn test_load_invalid_key_is_none() {
        let persistence = Persistence::new(MemoryStore::new());
        assert!(persistence.load::<Note>("bad key").is_none());
    }

    #[test]
    fn test_remove() {
        let mut persistence = Persistence::new(MemoryStore::new());
        persistence.save("note", &[1, 2, 3]).unwrap();
        persistence.remove("note").unwrap();

        assert!(persistence.load::<Vec<i32>>("note").is_none());
        // Removing again is fine
        persistence.remove("note").unwrap();
    }
}
