use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tower_cookies::Cookies;

use crate::SessionOptions;
use crate::codec::KeyRing;
use crate::serializer::Serializer;
use crate::session::{Id, SessionState, ValueMap};
use crate::store::{CacheCore, CacheStore, Error, SessionStore};

#[derive(Debug, Clone)]
struct StoredRecord {
    payload: Vec<u8>,
    expires_at: Option<Instant>,
}

/// An in-memory session store with the same record semantics as the Redis
/// stores: prefixed keys, TTLs, and the serialized-payload size cap.
///
/// ### Note
///
/// Records live in process memory. Use it for development and tests, not in a
/// production environment.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    records: Arc<DashMap<String, StoredRecord>>,
    core: CacheCore,
}

impl MemoryStore {
    pub fn new(ring: KeyRing) -> Self {
        Self {
            records: Arc::new(DashMap::new()),
            core: CacheCore::new(ring),
        }
    }

    /// Sets the store-level default options.
    pub fn with_options(self, options: SessionOptions) -> Self {
        self.core.set_options(options);
        self
    }

    /// Caps the serialized payload size; `0` disables the cap.
    pub fn set_max_length(&self, max_length: usize) {
        self.core.set_max_length(max_length);
    }

    /// Sets the backend key prefix.
    pub fn set_key_prefix(&self, prefix: &str) {
        self.core.set_key_prefix(prefix);
    }

    /// Sets the record TTL used when a session's `max_age` is `0`.
    pub fn set_default_max_age(&self, seconds: i64) {
        self.core.set_default_max_age(seconds);
    }

    pub fn set_serializer(&self, serializer: Serializer) {
        self.core.set_serializer(serializer);
    }

    fn cleanup_expired(&self) {
        self.records.retain(|_, record| {
            record
                .expires_at
                .map(|expires| expires > Instant::now())
                .unwrap_or(true)
        });
    }

    fn read_record(&self, key: &str) -> Option<Vec<u8>> {
        self.cleanup_expired();
        self.records.get(key).map(|record| record.payload.clone())
    }

    fn write_record(&self, key: String, payload: Vec<u8>, ttl_secs: i64) {
        let expires_at = if ttl_secs > 0 {
            Some(Instant::now() + Duration::from_secs(ttl_secs as u64))
        } else {
            None
        };

        self.records.insert(key, StoredRecord { payload, expires_at });
    }
}

impl SessionStore for MemoryStore {
    async fn load(&self, cookies: &Cookies, name: &'static str) -> Result<SessionState, Error> {
        let options = self.options();

        let Some(id) = self.core.read_cookie_id(cookies, name) else {
            return Ok(SessionState::fresh(options));
        };

        let Some(payload) = self.read_record(&self.core.record_key(&id)) else {
            return Ok(SessionState::fresh(options));
        };

        match self.core.deserialize_record(&payload) {
            Ok(values) => Ok(SessionState::bound(Some(id), values, options)),
            Err(err) => {
                tracing::warn!(err = %err, "stored session record is corrupt, starting fresh");
                Ok(SessionState::fresh(options))
            }
        }
    }

    async fn save(
        &self,
        cookies: &Cookies,
        name: &'static str,
        state: &mut SessionState,
    ) -> Result<(), Error> {
        if state.options.max_age < 0 {
            if let Some(id) = state.id.take() {
                self.records.remove(&self.core.record_key(&id));
            }
            cookies.add(state.options.removal_cookie(name));
            state.values.clear();
            state.is_new = true;
            return Ok(());
        }

        let payload = self.core.serialize_record(&state.values)?;
        let id = *state.id.get_or_insert_with(Id::default);
        self.write_record(
            self.core.record_key(&id),
            payload,
            self.core.record_ttl(state.options.max_age),
        );

        let encoded = self.core.encode_id(name, &id)?;
        cookies.add(state.options.cookie(name, encoded));
        state.is_new = false;
        Ok(())
    }

    fn options(&self) -> SessionOptions {
        self.core.options()
    }

    fn set_options(&self, options: SessionOptions) {
        self.core.set_options(options);
    }

    async fn close(&self) -> Result<(), Error> {
        Ok(())
    }
}

impl CacheStore for MemoryStore {
    async fn load_by_id(&self, id: &Id) -> Result<Option<ValueMap>, Error> {
        match self.read_record(&self.core.record_key(id)) {
            Some(payload) => self.core.deserialize_record(&payload).map(Some),
            None => Ok(None),
        }
    }

    async fn save_by_id(&self, id: &Id, values: &ValueMap, max_age: i64) -> Result<(), Error> {
        let payload = self.core.serialize_record(values)?;
        self.write_record(
            self.core.record_key(id),
            payload,
            self.core.record_ttl(max_age),
        );
        Ok(())
    }
}
