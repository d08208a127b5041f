use std::sync::Arc;

use fred::clients::Pool;
use fred::interfaces::KeysInterface;
use tower_cookies::Cookies;

use crate::SessionOptions;
use crate::codec::KeyRing;
use crate::serializer::Serializer;
use crate::session::{Id, SessionState, ValueMap};
use crate::store::redis::RedisStore;
use crate::store::{CacheStore, Error, SessionStore};

/// A Redis Cluster session store.
///
/// Identical record layout and semantics to [`RedisStore`]; the cluster
/// topology lives entirely in the fred client, which routes each key to the
/// owning node and follows `MOVED`/`ASK` redirections. Build the client from
/// a `redis-cluster://` URL (or an explicit node list) and hand it over.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use fred::prelude::*;
/// use sessio::store::redis::RedisClusterStore;
/// use sessio::{KeyPair, KeyRing};
///
/// #[tokio::main]
/// async fn main() {
///     let config = Config::from_url("redis-cluster://127.0.0.1:30001").unwrap();
///     let pool = Builder::from_config(config).build_pool(4).unwrap();
///     pool.init().await.unwrap();
///
///     let ring = KeyRing::new(vec![KeyPair::signing(b"authentication-key")]);
///     let store = RedisClusterStore::new(Arc::new(pool), ring);
/// }
/// ```
#[derive(Clone, Debug)]
pub struct RedisClusterStore<C: KeysInterface + Clone + Send + Sync = Pool> {
    inner: RedisStore<C>,
}

impl<C> RedisClusterStore<C>
where
    C: KeysInterface + Clone + Send + Sync,
{
    pub fn new(client: Arc<C>, ring: KeyRing) -> Self {
        Self {
            inner: RedisStore::new(client, ring),
        }
    }

    pub fn with_options(self, options: SessionOptions) -> Self {
        self.inner.core().set_options(options);
        self
    }

    pub fn set_max_length(&self, max_length: usize) {
        self.inner.set_max_length(max_length);
    }

    pub fn set_key_prefix(&self, prefix: &str) {
        self.inner.set_key_prefix(prefix);
    }

    pub fn set_default_max_age(&self, seconds: i64) {
        self.inner.set_default_max_age(seconds);
    }

    pub fn set_serializer(&self, serializer: Serializer) {
        self.inner.set_serializer(serializer);
    }
}

impl<C> SessionStore for RedisClusterStore<C>
where
    C: KeysInterface + Clone + Send + Sync + 'static,
{
    async fn load(&self, cookies: &Cookies, name: &'static str) -> Result<SessionState, Error> {
        self.inner.load(cookies, name).await
    }

    async fn save(
        &self,
        cookies: &Cookies,
        name: &'static str,
        state: &mut SessionState,
    ) -> Result<(), Error> {
        self.inner.save(cookies, name, state).await
    }

    fn options(&self) -> SessionOptions {
        self.inner.options()
    }

    fn set_options(&self, options: SessionOptions) {
        self.inner.set_options(options);
    }

    async fn close(&self) -> Result<(), Error> {
        self.inner.close().await
    }
}

impl<C> CacheStore for RedisClusterStore<C>
where
    C: KeysInterface + Clone + Send + Sync + 'static,
{
    async fn load_by_id(&self, id: &Id) -> Result<Option<ValueMap>, Error> {
        self.inner.load_by_id(id).await
    }

    async fn save_by_id(&self, id: &Id, values: &ValueMap, max_age: i64) -> Result<(), Error> {
        self.inner.save_by_id(id, values, max_age).await
    }
}
