use axum_core::extract::FromRequestParts;
use http::{StatusCode, request::Parts};

use crate::registry::Sessions;
use crate::session::Session;
use crate::store::SessionStore;

/// Axum extractor for [`Sessions`].
impl<S, T> FromRequestParts<S> for Sessions<T>
where
    S: Sync + Send,
    T: SessionStore,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Sessions<T>>()
            .cloned()
            .ok_or_else(|| {
                tracing::error!("session layer not found in the request extensions");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "sessions not found in the request",
                )
            })
    }
}

/// Axum extractor for the default [`Session`], loading it through the
/// request's [`Sessions`] registry.
impl<S, T> FromRequestParts<S> for Session<T>
where
    S: Sync + Send,
    T: SessionStore,
{
    type Rejection = (StatusCode, &'static str);

    #[tracing::instrument(name = "session", skip(parts, _state))]
    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let sessions = Sessions::<T>::from_request_parts(parts, _state).await?;

        sessions.default_session().await.map_err(|err| {
            tracing::error!(err = %err, "failed to load session");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "failed to load session",
            )
        })
    }
}
