//! Redis-backed session stores.

mod cluster;
pub use cluster::RedisClusterStore;

use std::sync::Arc;

use fred::clients::Pool;
use fred::interfaces::{ClientLike, KeysInterface};
use fred::types::Expiration;
use tower_cookies::Cookies;

use crate::SessionOptions;
use crate::codec::KeyRing;
use crate::serializer::Serializer;
use crate::session::{Id, SessionState, ValueMap};
use crate::store::{CacheCore, CacheStore, Error, SessionStore};

/// A Redis-backed session store.
///
/// Each session is one string record at `key_prefix + id` holding the
/// serialized value map, written with `SET .. EX`. The record TTL is the
/// session's `max_age` when nonzero, else the store's `default_max_age`
/// (20 minutes unless changed), independent of the cookie lifetime.
///
/// The store takes any connected fred client; pooling, timeouts, and
/// reconnection are the client's concern.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use fred::clients::Client;
/// use fred::interfaces::ClientLike;
/// use sessio::store::redis::RedisStore;
/// use sessio::{KeyPair, KeyRing};
///
/// #[tokio::main]
/// async fn main() {
///     let client = Client::default();
///     client.init().await.unwrap();
///
///     let ring = KeyRing::new(vec![KeyPair::signing(b"authentication-key")]);
///     let store = RedisStore::new(Arc::new(client), ring);
/// }
/// ```
#[derive(Clone, Debug)]
pub struct RedisStore<C: KeysInterface + Clone + Send + Sync = Pool> {
    client: Arc<C>,
    core: CacheCore,
}

impl<C> RedisStore<C>
where
    C: KeysInterface + Clone + Send + Sync,
{
    pub fn new(client: Arc<C>, ring: KeyRing) -> Self {
        Self {
            client,
            core: CacheCore::new(ring),
        }
    }

    /// Sets the store-level default options.
    pub fn with_options(self, options: SessionOptions) -> Self {
        self.core.set_options(options);
        self
    }

    /// Caps the serialized payload size (default 4096 bytes); `0` disables
    /// the cap. Redis itself accepts values up to 512MB.
    pub fn set_max_length(&self, max_length: usize) {
        self.core.set_max_length(max_length);
    }

    /// Sets the backend key prefix (default `"session_"`).
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

    pub(crate) fn core(&self) -> &CacheCore {
        &self.core
    }
}

impl<C> SessionStore for RedisStore<C>
where
    C: KeysInterface + Clone + Send + Sync + 'static,
{
    async fn load(&self, cookies: &Cookies, name: &'static str) -> Result<SessionState, Error> {
        let options = self.options();

        let Some(id) = self.core.read_cookie_id(cookies, name) else {
            return Ok(SessionState::fresh(options));
        };

        // Backend failures propagate: an outage must not look like a first
        // visit.
        let payload = self
            .client
            .get::<Option<Vec<u8>>, _>(self.core.record_key(&id))
            .await?;

        let Some(payload) = payload else {
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
                self.client
                    .del::<u64, _>(self.core.record_key(&id))
                    .await?;
            }
            cookies.add(state.options.removal_cookie(name));
            state.values.clear();
            state.is_new = true;
            return Ok(());
        }

        let payload = self.core.serialize_record(&state.values)?;
        let id = *state.id.get_or_insert_with(Id::default);

        self.client
            .set::<(), _, _>(
                self.core.record_key(&id),
                payload,
                Some(Expiration::EX(self.core.record_ttl(state.options.max_age))),
                None,
                false,
            )
            .await?;

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
        self.client.quit().await?;
        Ok(())
    }
}

impl<C> CacheStore for RedisStore<C>
where
    C: KeysInterface + Clone + Send + Sync + 'static,
{
    async fn load_by_id(&self, id: &Id) -> Result<Option<ValueMap>, Error> {
        let payload = self
            .client
            .get::<Option<Vec<u8>>, _>(self.core.record_key(id))
            .await?;

        match payload {
            Some(payload) => self.core.deserialize_record(&payload).map(Some),
            None => Ok(None),
        }
    }

    async fn save_by_id(&self, id: &Id, values: &ValueMap, max_age: i64) -> Result<(), Error> {
        let payload = self.core.serialize_record(values)?;
        self.client
            .set::<(), _, _>(
                self.core.record_key(id),
                payload,
                Some(Expiration::EX(self.core.record_ttl(max_age))),
                None,
                false,
            )
            .await?;
        Ok(())
    }
}
