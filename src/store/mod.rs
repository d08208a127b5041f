//! Session stores.
//!
//! A [`SessionStore`] resolves inbound cookies into [`SessionState`] and
//! persists state back out, emitting the response cookie through the shared
//! [`Cookies`] jar. Cache-backed stores additionally implement [`CacheStore`]
//! for identifier-addressed access without an inbound request.

pub mod cookie;
mod memory;
#[cfg(feature = "redis-store")]
pub mod redis;

pub use cookie::CookieStore;
pub use memory::MemoryStore;

use std::future::Future;
use std::str;
use std::sync::Arc;

use parking_lot::RwLock;
use tower_cookies::Cookies;

use crate::SessionOptions;
use crate::codec::KeyRing;
use crate::serializer::Serializer;
use crate::session::{Id, SessionState, ValueMap};

/// Default key prefix for backend records.
pub const DEFAULT_KEY_PREFIX: &str = "session_";

/// Default backend TTL, in seconds, applied when a session's `max_age` is `0`
/// (browser-session cookie). Keeps the backend record short-lived even when
/// the cookie itself has no expiry.
pub const DEFAULT_MAX_AGE: i64 = 20 * 60;

/// Default cap on the serialized payload size for cache-backed stores.
pub const DEFAULT_MAX_LENGTH: usize = 4096;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The cookie value failed to authenticate against every key pair.
    #[error("cookie failed to authenticate against any key pair")]
    Authentication,

    /// The cookie authenticated but its embedded timestamp is too old.
    #[error("cookie timestamp is older than the configured max age")]
    Expired,

    /// The serialized payload exceeds the store's configured maximum. Raise
    /// the limit with `set_max_length` or move large state elsewhere.
    #[error("serialized session is {size} bytes, exceeding the {limit}-byte limit")]
    Oversize { size: usize, limit: usize },

    #[error("serialization failed: {0}")]
    Serialize(String),

    #[error("deserialization failed: {0}")]
    Deserialize(String),

    /// Backend I/O failure (connection refused, timeout, protocol error).
    #[error("backend error: {0}")]
    Backend(String),
}

#[cfg(feature = "redis-store")]
impl From<fred::error::Error> for Error {
    fn from(err: fred::error::Error) -> Self {
        Error::Backend(err.to_string())
    }
}

/// The backend contract shared by every store variant.
///
/// `load` resolves the inbound cookie named `name` into session state: an
/// absent, tampered, or undecodable cookie and a missing or corrupt backend
/// record all fall back to a fresh state (`is_new = true`): an end user with
/// a bad cookie just gets a new anonymous session. Backend I/O failures are
/// the exception: they propagate so an outage is not masked as a first visit.
///
/// `save` persists the whole state or fails without side effects: when it
/// errors, no cookie has been added to the jar and no partial record written.
pub trait SessionStore: Clone + Send + Sync + 'static {
    fn load(
        &self,
        cookies: &Cookies,
        name: &'static str,
    ) -> impl Future<Output = Result<SessionState, Error>> + Send;

    fn save(
        &self,
        cookies: &Cookies,
        name: &'static str,
        state: &mut SessionState,
    ) -> impl Future<Output = Result<(), Error>> + Send;

    /// The store-level default options applied to freshly loaded state.
    fn options(&self) -> SessionOptions;

    /// Replaces the store-level default options. Per-session overrides via
    /// [`Session::set_options`](crate::Session::set_options) never write back
    /// here.
    fn set_options(&self, options: SessionOptions);

    /// Releases backend connection resources. A no-op for stores without
    /// connections.
    fn close(&self) -> impl Future<Output = Result<(), Error>> + Send;
}

/// Settings shared by the cache-backed stores, mutable after construction in
/// the same way the store-level default options are.
#[derive(Clone, Debug)]
pub(crate) struct CacheConfig {
    pub key_prefix: String,
    pub max_length: usize,
    pub default_max_age: i64,
    pub serializer: Serializer,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            key_prefix: DEFAULT_KEY_PREFIX.to_owned(),
            max_length: DEFAULT_MAX_LENGTH,
            default_max_age: DEFAULT_MAX_AGE,
            serializer: Serializer::default(),
        }
    }
}

/// Codec, serializer, and option state common to every cache-backed store.
/// The concrete stores embed this and supply only the record I/O.
#[derive(Clone, Debug)]
pub(crate) struct CacheCore {
    ring: KeyRing,
    config: Arc<RwLock<CacheConfig>>,
    options: Arc<RwLock<SessionOptions>>,
}

impl CacheCore {
    pub(crate) fn new(ring: KeyRing) -> Self {
        Self {
            ring,
            config: Arc::new(RwLock::new(CacheConfig::default())),
            options: Arc::new(RwLock::new(SessionOptions::default())),
        }
    }

    pub(crate) fn options(&self) -> SessionOptions {
        *self.options.read()
    }

    pub(crate) fn set_options(&self, options: SessionOptions) {
        *self.options.write() = options;
    }

    pub(crate) fn set_key_prefix(&self, prefix: &str) {
        self.config.write().key_prefix = prefix.to_owned();
    }

    pub(crate) fn set_max_length(&self, max_length: usize) {
        self.config.write().max_length = max_length;
    }

    pub(crate) fn set_default_max_age(&self, seconds: i64) {
        self.config.write().default_max_age = seconds;
    }

    pub(crate) fn set_serializer(&self, serializer: Serializer) {
        self.config.write().serializer = serializer;
    }

    /// The backend key for `id`: `key_prefix + id`.
    pub(crate) fn record_key(&self, id: &Id) -> String {
        format!("{}{}", self.config.read().key_prefix, id)
    }

    /// Backend TTL for a session with the given cookie `max_age`: the cookie
    /// lifetime when explicit, else the store's default. Clamped to one
    /// second at the bottom, Redis rejects `EX 0`.
    pub(crate) fn record_ttl(&self, max_age: i64) -> i64 {
        let ttl = if max_age != 0 {
            max_age
        } else {
            self.config.read().default_max_age
        };
        ttl.max(1)
    }

    /// Serializes `values`, enforcing the configured size cap. A `max_length`
    /// of `0` disables the cap.
    pub(crate) fn serialize_record(&self, values: &ValueMap) -> Result<Vec<u8>, Error> {
        let (serializer, max_length) = {
            let config = self.config.read();
            (config.serializer, config.max_length)
        };

        let payload = serializer.serialize(values)?;
        if max_length != 0 && payload.len() > max_length {
            return Err(Error::Oversize {
                size: payload.len(),
                limit: max_length,
            });
        }

        Ok(payload)
    }

    pub(crate) fn deserialize_record(&self, bytes: &[u8]) -> Result<ValueMap, Error> {
        self.config.read().serializer.deserialize(bytes)
    }

    /// Reads and authenticates the session identifier from the inbound cookie
    /// named `name`. Absent, tampered, stale, and malformed cookies all yield
    /// `None`, and the caller starts a fresh session.
    pub(crate) fn read_cookie_id(&self, cookies: &Cookies, name: &'static str) -> Option<Id> {
        let cookie = cookies.get(name)?;
        let chain = self.ring.current();

        let payload = match chain.decode(name, cookie.value()) {
            Ok(payload) => payload,
            Err(err) => {
                tracing::debug!(err = %err, "session cookie failed to decode, starting fresh");
                return None;
            }
        };

        str::from_utf8(&payload)
            .ok()
            .and_then(|s| s.parse::<Id>().ok())
            .or_else(|| {
                tracing::debug!("decoded session cookie holds a malformed id, starting fresh");
                None
            })
    }

    /// Encodes `id` into a cookie value bound to `name`.
    pub(crate) fn encode_id(&self, name: &'static str, id: &Id) -> Result<String, Error> {
        self.ring.current().encode(name, id.to_string().as_bytes())
    }
}

/// Identifier-addressed access for cache-backed stores, used by contexts
/// without an inbound request (maintenance jobs, websocket upgrades).
pub trait CacheStore: SessionStore {
    /// Loads the raw value map stored for `id`, or `None` if absent.
    ///
    /// Unlike [`SessionStore::load`], a corrupt record surfaces as an error
    /// here instead of degrading to a fresh session.
    fn load_by_id(
        &self,
        id: &Id,
    ) -> impl Future<Output = Result<Option<ValueMap>, Error>> + Send;

    /// Writes `values` for `id` with the TTL rules of a regular save
    /// (`max_age` nonzero, else the store's default TTL).
    fn save_by_id(
        &self,
        id: &Id,
        values: &ValueMap,
        max_age: i64,
    ) -> impl Future<Output = Result<(), Error>> + Send;
}
