//! Session middleware for tower applications.
//!
//! [`SessionLayer`] builds a per-request [`Sessions`] registry and places it
//! in the request extensions, where the axum extractors (or manual extension
//! lookup) pick it up. It must sit inside `tower_cookies::CookieManagerLayer`,
//! which owns the cookie jar the stores read from and write to.

use std::sync::Arc;
use std::task::{Context, Poll};

use http::{Request, Response};
use tower::{Layer, Service};
use tower_cookies::Cookies;

use crate::registry::Sessions;
use crate::store::SessionStore;

const DEFAULT_COOKIE_NAME: &str = "id";

/// A tower middleware exposing [`Sessions`] to request handlers.
#[derive(Clone, Debug)]
pub struct SessionService<S, T: SessionStore> {
    inner: S,
    store: Arc<T>,
    name: &'static str,
}

impl<ReqBody, ResBody, S, T> Service<Request<ReqBody>> for SessionService<S, T>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>>,
    T: SessionStore,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    #[inline]
    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<ReqBody>) -> Self::Future {
        match req.extensions().get::<Cookies>().cloned() {
            Some(cookies) => {
                let sessions = Sessions::new(Arc::clone(&self.store), cookies, self.name);
                req.extensions_mut().insert(sessions);
            }
            None => {
                tracing::error!(
                    "cookies not found in the request extensions: \
                     is CookieManagerLayer applied outside SessionLayer?"
                );
            }
        }

        self.inner.call(req)
    }
}

/// Layer to apply [`SessionService`] middleware.
///
/// Stores write their cookies into the shared jar during `save`, so the
/// service itself adds nothing to the response. Stacking one layer per store
/// type serves differently-backed sessions side by side.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use sessio::{KeyPair, KeyRing, SessionLayer};
/// use sessio::store::CookieStore;
/// use tower_cookies::CookieManagerLayer;
///
/// let ring = KeyRing::new(vec![KeyPair::signing(b"authentication-key")]);
/// let store = CookieStore::new(ring);
/// let session_layer = SessionLayer::new(Arc::new(store)).with_name("sid");
/// ```
#[derive(Clone, Debug)]
pub struct SessionLayer<T: SessionStore> {
    store: Arc<T>,
    name: &'static str,
}

impl<T> SessionLayer<T>
where
    T: SessionStore,
{
    /// Create a new session layer with the default cookie name `id`.
    pub fn new(store: Arc<T>) -> Self {
        Self {
            store,
            name: DEFAULT_COOKIE_NAME,
        }
    }

    /// Set the cookie name resolved by `Sessions::default_session`.
    pub fn with_name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }
}

impl<S, T> Layer<S> for SessionLayer<T>
where
    T: SessionStore,
{
    type Service = SessionService<S, T>;

    fn layer(&self, inner: S) -> Self::Service {
        SessionService {
            inner,
            store: Arc::clone(&self.store),
            name: self.name,
        }
    }
}
