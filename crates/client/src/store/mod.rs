//! Versioned key/value persistence.
//!
//! Every value is written inside an envelope:
//!
//! ```json
//! {"data": <value>, "timestamp": "2026-01-15T10:30:00Z", "version": 1}
//! ```
//!
//! All operations fail soft. Serialization, I/O and quota problems are logged
//! and the operation becomes a no-op; reads of missing, corrupt or
//! newer-version values return `None`. The store knows nothing about domain
//! types beyond `Serialize`/`DeserializeOwned`.

mod backend;

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;

pub use backend::{FileBackend, MemoryBackend, StorageBackend};

/// Envelope format written by this client.
pub const STORE_VERSION: u32 = 1;

/// Largest serialized value accepted, matching browser storage limits.
pub const DEFAULT_QUOTA_BYTES: usize = 5 * 1024 * 1024;

/// Storage keys.
pub mod keys {
    /// Signed-in [`User`](kisan_setu_core::User), including the bearer token.
    pub const CURRENT_USER: &str = "kisanSetuUser";
    /// [`Preferences`](kisan_setu_core::Preferences).
    pub const PREFERENCES: &str = "kisanSetuPreferences";
    /// [`SessionInfo`](kisan_setu_core::SessionInfo).
    pub const SESSION: &str = "kisanSetuSession";
    pub const CART: &str = "kisanSetuCart";
    pub const LOCATION: &str = "kisanSetuLocation";
    /// Language code, kept outside preferences so it survives logout.
    pub const LANGUAGE: &str = "kisanSetuLanguage";
    pub const ORDER_HISTORY: &str = "kisanSetuOrderHistory";
    pub const LOGIN_HISTORY: &str = "kisanSetuLoginHistory";
    pub const LOGIN_STATS: &str = "kisanSetuUserStats";
    pub const CROP_SCANS: &str = "cropHealthScans";

    /// Keys purged on logout or session expiry.
    pub const SESSION_KEYS: &[&str] = &[CURRENT_USER, PREFERENCES, SESSION, CART];

    /// Every key this client writes.
    pub const ALL: &[&str] = &[
        CURRENT_USER,
        PREFERENCES,
        SESSION,
        CART,
        LOCATION,
        LANGUAGE,
        ORDER_HISTORY,
        LOGIN_HISTORY,
        LOGIN_STATS,
        CROP_SCANS,
    ];
}

#[derive(Serialize)]
struct Envelope<'a, T> {
    data: &'a T,
    timestamp: DateTime<Utc>,
    version: u32,
}

/// What a raw stored string turned out to contain.
enum Decoded {
    Current {
        data: serde_json::Value,
        timestamp: Option<DateTime<Utc>>,
    },
    /// Written by a newer client; ignored.
    Future(u64),
    /// Bare value written by an older client.
    Legacy(serde_json::Value),
}

fn decode(raw: &str) -> Decoded {
    // Older clients stored some values (the language code) as bare strings.
    let value = serde_json::from_str::<serde_json::Value>(raw)
        .unwrap_or_else(|_| serde_json::Value::String(raw.to_string()));

    let serde_json::Value::Object(mut map) = value else {
        return Decoded::Legacy(value);
    };

    let version = map.get("version").and_then(serde_json::Value::as_u64);
    match (version, map.contains_key("data")) {
        (Some(v), true) if v > u64::from(STORE_VERSION) => Decoded::Future(v),
        (Some(_), true) => {
            let timestamp = map
                .get("timestamp")
                .and_then(serde_json::Value::as_str)
                .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
                .map(|t| t.with_timezone(&Utc));
            Decoded::Current {
                data: map.remove("data").unwrap_or_default(),
                timestamp,
            }
        }
        _ => Decoded::Legacy(serde_json::Value::Object(map)),
    }
}

/// Typed, fail-soft façade over a [`StorageBackend`].
///
/// Cheap to clone; clones share the backend.
#[derive(Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    backend: Box<dyn StorageBackend>,
    quota_bytes: usize,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("quota_bytes", &self.inner.quota_bytes)
            .finish_non_exhaustive()
    }
}

impl Store {
    /// Wrap a backend with the default quota.
    #[must_use]
    pub fn new(backend: impl StorageBackend) -> Self {
        Self::with_quota(backend, DEFAULT_QUOTA_BYTES)
    }

    /// Wrap a backend with a custom per-value quota.
    #[must_use]
    pub fn with_quota(backend: impl StorageBackend, quota_bytes: usize) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                backend: Box::new(backend),
                quota_bytes,
            }),
        }
    }

    /// A store that lives only as long as the process.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(MemoryBackend::new())
    }

    /// A store persisted under `dir`, one file per key.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the directory cannot be created.
    pub fn open(dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        Ok(Self::new(FileBackend::open(dir)?))
    }

    /// Read and decode `key`.
    ///
    /// Returns `None` if the key is absent, unreadable, corrupt, of the wrong
    /// shape, or written by a newer client.
    #[must_use]
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let data = match decode(&self.read_raw(key)?) {
            Decoded::Current { data, .. } | Decoded::Legacy(data) => data,
            Decoded::Future(version) => {
                tracing::debug!(key, version, "Ignoring value written by a newer client");
                return None;
            }
        };

        match serde_json::from_value(data) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(key, error = %e, "Discarding unreadable stored value");
                None
            }
        }
    }

    /// When `key` was last written, if it carries an envelope.
    #[must_use]
    pub fn stored_at(&self, key: &str) -> Option<DateTime<Utc>> {
        match decode(&self.read_raw(key)?) {
            Decoded::Current { timestamp, .. } => timestamp,
            Decoded::Legacy(_) | Decoded::Future(_) => None,
        }
    }

    /// Whether `key` holds anything at all.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.read_raw(key).is_some()
    }

    /// Encode and write `value` under `key`.
    ///
    /// Returns whether the value was persisted.
    pub fn set<T: Serialize>(&self, key: &str, value: &T) -> bool {
        let envelope = Envelope {
            data: value,
            timestamp: Utc::now(),
            version: STORE_VERSION,
        };

        let serialized = match serde_json::to_string(&envelope) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(key, error = %e, "Failed to serialize value for storage");
                return false;
            }
        };

        if serialized.len() > self.inner.quota_bytes {
            tracing::warn!(
                key,
                size = serialized.len(),
                quota = self.inner.quota_bytes,
                "Storage quota exceeded, value not saved"
            );
            return false;
        }

        match self.inner.backend.write(key, &serialized) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(key, error = %e, "Failed to write stored value");
                false
            }
        }
    }

    /// Delete `key`.
    pub fn remove(&self, key: &str) {
        if let Err(e) = self.inner.backend.delete(key) {
            tracing::warn!(key, error = %e, "Failed to remove stored value");
        }
    }

    /// Delete every key in `keys`.
    pub fn clear(&self, keys: &[&str]) {
        for key in keys {
            self.remove(key);
        }
    }

    fn read_raw(&self, key: &str) -> Option<String> {
        match self.inner.backend.read(key) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(key, error = %e, "Failed to read stored value");
                None
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::io;

    use kisan_setu_core::{Language, Location};

    use super::*;

    /// Backend whose every operation fails.
    struct BrokenBackend;

    impl StorageBackend for BrokenBackend {
        fn read(&self, _key: &str) -> io::Result<Option<String>> {
            Err(io::Error::other("disk on fire"))
        }
        fn write(&self, _key: &str, _value: &str) -> io::Result<()> {
            Err(io::Error::other("disk on fire"))
        }
        fn delete(&self, _key: &str) -> io::Result<()> {
            Err(io::Error::other("disk on fire"))
        }
    }

    #[test]
    fn test_set_writes_envelope() {
        let store = Store::in_memory();
        assert!(store.set(keys::LANGUAGE, &Language::En));

        let raw = store.read_raw(keys::LANGUAGE).unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json["data"], "en");
        assert_eq!(json["version"], 1);
        assert!(json["timestamp"].is_string());
        assert!(store.stored_at(keys::LANGUAGE).is_some());
    }

    #[test]
    fn test_get_round_trips_typed_values() {
        let store = Store::in_memory();
        store.set(keys::LOCATION, &Location::fallback());
        assert_eq!(store.get::<Location>(keys::LOCATION), Some(Location::fallback()));
    }

    #[test]
    fn test_legacy_values_are_read() {
        let backend = MemoryBackend::new();
        // Bare, non-JSON language code from an older client.
        backend.write(keys::LANGUAGE, "hi").unwrap();
        backend.write(keys::ORDER_HISTORY, "[]").unwrap();
        let store = Store::new(backend);

        assert_eq!(store.get::<Language>(keys::LANGUAGE), Some(Language::Hi));
        assert_eq!(
            store.get::<Vec<serde_json::Value>>(keys::ORDER_HISTORY),
            Some(Vec::new())
        );
        assert!(store.stored_at(keys::LANGUAGE).is_none());
    }

    #[test]
    fn test_newer_version_is_absent() {
        let backend = MemoryBackend::new();
        backend
            .write(
                keys::LANGUAGE,
                r#"{"data":"en","timestamp":"2030-01-01T00:00:00Z","version":2}"#,
            )
            .unwrap();
        let store = Store::new(backend);
        assert!(store.get::<Language>(keys::LANGUAGE).is_none());
        assert!(store.contains(keys::LANGUAGE));
    }

    #[test]
    fn test_corrupt_or_mistyped_value_is_absent() {
        let backend = MemoryBackend::new();
        backend.write(keys::LOCATION, "{not json").unwrap();
        let store = Store::new(backend);
        assert!(store.get::<Location>(keys::LOCATION).is_none());

        store.set(keys::LOCATION, &42);
        assert!(store.get::<Location>(keys::LOCATION).is_none());
    }

    #[test]
    fn test_quota_drops_oversize_writes() {
        // Room for the envelope and a short value, not for 200 bytes of data
        let store = Store::with_quota(MemoryBackend::new(), 160);
        assert!(!store.set(keys::CART, &"x".repeat(200)));
        assert!(!store.contains(keys::CART));
        assert!(store.set(keys::CART, &"small"));
    }

    #[test]
    fn test_backend_errors_fail_soft() {
        let store = Store::new(BrokenBackend);
        assert!(!store.set(keys::CART, &Vec::<u8>::new()));
        assert!(store.get::<Vec<u8>>(keys::CART).is_none());
        store.remove(keys::CART);
        store.clear(keys::ALL);
    }

    #[test]
    fn test_clear_removes_only_listed_keys() {
        let store = Store::in_memory();
        for key in keys::ALL {
            store.set(key, &1);
        }
        store.clear(keys::SESSION_KEYS);
        for key in keys::SESSION_KEYS {
            assert!(!store.contains(key));
        }
        assert!(store.contains(keys::LANGUAGE));
        assert!(store.contains(keys::LOGIN_HISTORY));
    }
}
