//! A store that keeps the entire session payload inside the cookie.

use std::sync::Arc;

use parking_lot::RwLock;
use tower_cookies::Cookies;

use crate::SessionOptions;
use crate::codec::KeyRing;
use crate::serializer::Serializer;
use crate::session::SessionState;
use crate::store::{Error, SessionStore};

/// A cookie-backed session store.
///
/// The serialized value map travels in the cookie itself, so no server-side
/// state exists and sessions never carry an [`Id`](crate::Id). Browsers cap
/// cookies around 4KB; the store imposes no guard of its own, so callers with
/// large payloads should use a cache-backed store instead.
///
/// # Example
///
/// ```rust
/// use sessio::store::CookieStore;
/// use sessio::{KeyPair, KeyRing};
///
/// let ring = KeyRing::new(vec![KeyPair::signing(b"authentication-key")]);
/// let store = CookieStore::new(ring);
/// ```
#[derive(Clone, Debug)]
pub struct CookieStore {
    ring: KeyRing,
    serializer: Serializer,
    options: Arc<RwLock<SessionOptions>>,
}

impl CookieStore {
    pub fn new(ring: KeyRing) -> Self {
        Self {
            ring,
            serializer: Serializer::default(),
            options: Arc::new(RwLock::new(SessionOptions::default())),
        }
    }

    /// Sets the payload serializer. The structured variant keeps cookies
    /// portable but rejects tagged values.
    pub fn with_serializer(mut self, serializer: Serializer) -> Self {
        self.serializer = serializer;
        self
    }

    /// Sets the store-level default options.
    pub fn with_options(self, options: SessionOptions) -> Self {
        *self.options.write() = options;
        self
    }
}

impl SessionStore for CookieStore {
    async fn load(&self, cookies: &Cookies, name: &'static str) -> Result<SessionState, Error> {
        let options = self.options();

        let Some(cookie) = cookies.get(name) else {
            return Ok(SessionState::fresh(options));
        };

        let chain = self.ring.current();
        let payload = match chain.decode(name, cookie.value()) {
            Ok(payload) => payload,
            Err(err) => {
                tracing::debug!(err = %err, "session cookie failed to decode, starting fresh");
                return Ok(SessionState::fresh(options));
            }
        };

        match self.serializer.deserialize(&payload) {
            Ok(values) => Ok(SessionState::bound(None, values, options)),
            Err(err) => {
                tracing::warn!(err = %err, "session cookie payload is corrupt, starting fresh");
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
            cookies.add(state.options.removal_cookie(name));
            state.values.clear();
            state.is_new = true;
            return Ok(());
        }

        let payload = self.serializer.serialize(&state.values)?;
        let encoded = self.ring.current().encode(name, &payload)?;

        cookies.add(state.options.cookie(name, encoded));
        state.is_new = false;
        Ok(())
    }

    fn options(&self) -> SessionOptions {
        *self.options.read()
    }

    fn set_options(&self, options: SessionOptions) {
        *self.options.write() = options;
    }

    async fn close(&self) -> Result<(), Error> {
        Ok(())
    }
}
