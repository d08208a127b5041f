//! Per-request registry of named sessions sharing one store.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tower_cookies::Cookies;

use crate::session::Session;
use crate::store::{Error, SessionStore};

/// Lazily loads and caches the request's sessions by cookie name.
///
/// One registry is built per request by the session layer. The first
/// [`session`](Sessions::session) call for a name hits the store; later calls
/// for the same name return the same handle, so a request always observes one
/// consistent view of each named session no matter how many handlers touch it.
///
/// Nothing is loaded for names no handler asks about, and nothing is persisted
/// until a handle's `save` (or [`save_changed`](Sessions::save_changed)) runs.
#[derive(Debug)]
pub struct Sessions<S: SessionStore> {
    inner: Arc<Inner<S>>,
}

impl<S: SessionStore> Clone for Sessions<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[derive(Debug)]
struct Inner<S: SessionStore> {
    store: Arc<S>,
    cookies: Cookies,
    default_name: &'static str,
    loaded: Mutex<HashMap<&'static str, Session<S>>>,
}

impl<S: SessionStore> Sessions<S> {
    pub(crate) fn new(store: Arc<S>, cookies: Cookies, default_name: &'static str) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                cookies,
                default_name,
                loaded: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// The cookie name used by [`default_session`](Sessions::default_session).
    pub fn default_name(&self) -> &'static str {
        self.inner.default_name
    }

    /// The session under the layer's configured cookie name.
    pub async fn default_session(&self) -> Result<Session<S>, Error> {
        self.session(self.inner.default_name).await
    }

    /// The session addressed by the cookie named `name`, loading it from the
    /// store on first access and returning the cached handle afterwards.
    ///
    /// Backend failures from the underlying load propagate.
    pub async fn session(&self, name: &'static str) -> Result<Session<S>, Error> {
        if let Some(session) = self.inner.loaded.lock().get(name) {
            return Ok(session.clone());
        }

        let state = self
            .inner
            .store
            .load(&self.inner.cookies, name)
            .await
            .map_err(|err| {
                tracing::error!(err = %err, name, "failed to load session");
                err
            })?;

        let session = Session::new(
            Arc::clone(&self.inner.store),
            self.inner.cookies.clone(),
            name,
            state,
        );

        // A handler may have raced us between the lookup and the load; keep
        // whichever handle landed first so the request stays on one view.
        Ok(self
            .inner
            .loaded
            .lock()
            .entry(name)
            .or_insert(session)
            .clone())
    }

    /// Saves every loaded session whose values changed since it was loaded.
    ///
    /// Stops at the first failure; sessions already saved stay saved.
    pub async fn save_changed(&self) -> Result<(), Error> {
        let sessions: Vec<Session<S>> = self.inner.loaded.lock().values().cloned().collect();
        for session in sessions {
            if session.is_changed() {
                session.save().await?;
            }
        }
        Ok(())
    }
}
