mod common;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        Router,
        body::Body,
        extract::Request,
        http::{self, StatusCode},
        routing::get,
    };
    use common::*;
    use http::header::{COOKIE, SET_COOKIE};
    use sessio::store::MemoryStore;
    use sessio::{Session, SessionLayer, Sessions};
    use std::sync::Arc;
    use tower::ServiceExt;
    use tower_cookies::CookieManagerLayer;

    async fn count_handler(session: Session<MemoryStore>) -> Result<String, StatusCode> {
        let count = session.get("count").and_then(|v| v.as_int()).unwrap_or(0) + 1;
        session.set("count", count);
        session
            .save()
            .await
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        Ok(count.to_string())
    }

    // Reads without saving; no cookie should be emitted.
    async fn peek_handler(session: Session<MemoryStore>) -> String {
        session
            .get("count")
            .and_then(|v| v.as_int())
            .unwrap_or(0)
            .to_string()
    }

    async fn delete_handler(session: Session<MemoryStore>) -> Result<String, StatusCode> {
        session.set_options(session.options().max_age(-1));
        session
            .save()
            .await
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        Ok("Deleted".to_string())
    }

    fn create_test_app() -> Router {
        let store = MemoryStore::new(signing_ring());
        let session_layer = SessionLayer::new(Arc::new(store)).with_name("test_sess");

        Router::new()
            .route("/count", get(count_handler))
            .route("/peek", get(peek_handler))
            .route("/delete", get(delete_handler))
            .layer(session_layer)
            .layer(CookieManagerLayer::new())
    }

    async fn body_string(response: axum::response::Response) -> String {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(body.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn new_session_emits_cookie_with_attributes() {
        let app = create_test_app();

        let response = app
            .oneshot(Request::builder().uri("/count").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let cookie_str = set_cookie_header(response.headers(), "test_sess")
            .expect("Set-Cookie header should be present");
        assert!(cookie_str.contains("HttpOnly"));
        assert!(cookie_str.contains("Secure"));
        assert!(cookie_str.contains("SameSite=Lax"));
        assert!(cookie_str.contains("Path=/"));
    }

    #[tokio::test]
    async fn unsaved_session_emits_no_cookie() {
        let app = create_test_app();

        let response = app
            .oneshot(Request::builder().uri("/peek").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(SET_COOKIE).is_none());
    }

    #[tokio::test]
    async fn counter_survives_cookie_replay_until_deleted() {
        let app = create_test_app();

        // First visit starts at 1.
        let response = app
            .clone()
            .oneshot(Request::builder().uri("/count").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let cookie = cookie_pair(response.headers(), "test_sess").unwrap();
        assert_eq!(body_string(response).await, "1");

        // Replaying the cookie resumes the same session.
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/count")
                    .header(COOKIE, cookie.clone())
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(body_string(response).await, "2");

        // Deleting clears the record and tells the client to drop the cookie.
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/delete")
                    .header(COOKIE, cookie.clone())
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let removal = set_cookie_header(response.headers(), "test_sess").unwrap();
        assert!(removal.contains("Max-Age=0"));

        // A client that replays the stale cookie anyway starts over.
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/count")
                    .header(COOKIE, cookie)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(body_string(response).await, "1");
    }

    #[tokio::test]
    async fn tampered_cookie_starts_a_fresh_session() {
        let app = create_test_app();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/count")
                    .header(COOKIE, "test_sess=not_a_real_session_cookie")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "1");
    }

    #[tokio::test]
    async fn per_session_options_override_the_store_default() {
        async fn scoped_handler(session: Session<MemoryStore>) -> Result<String, StatusCode> {
            session.set_options(session.options().domain("localhost").path("/app"));
            session.set("scoped", true);
            session
                .save()
                .await
                .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
            Ok("Success".to_string())
        }

        let store = MemoryStore::new(signing_ring());
        let app = Router::new()
            .route("/scoped", get(scoped_handler))
            .layer(SessionLayer::new(Arc::new(store)).with_name("test_sess"))
            .layer(CookieManagerLayer::new());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/scoped")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let cookie_str = set_cookie_header(response.headers(), "test_sess").unwrap();
        assert!(cookie_str.contains("Domain=localhost"));
        assert!(cookie_str.contains("Path=/app"));
    }

    #[tokio::test]
    async fn store_level_defaults_apply_unless_a_session_overrides() {
        use sessio::SessionOptions;

        async fn plain_handler(session: Session<MemoryStore>) -> Result<String, StatusCode> {
            session.set("k", 1i64);
            session
                .save()
                .await
                .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
            Ok("Success".to_string())
        }

        async fn override_handler(session: Session<MemoryStore>) -> Result<String, StatusCode> {
            session.set_options(session.options().domain("example.com"));
            session.set("k", 1i64);
            session
                .save()
                .await
                .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
            Ok("Success".to_string())
        }

        let store = MemoryStore::new(signing_ring())
            .with_options(SessionOptions::build().domain("localhost"));
        let app = Router::new()
            .route("/plain", get(plain_handler))
            .route("/override", get(override_handler))
            .layer(SessionLayer::new(Arc::new(store)).with_name("test_sess"))
            .layer(CookieManagerLayer::new());

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/plain").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let cookie_str = set_cookie_header(response.headers(), "test_sess").unwrap();
        assert!(cookie_str.contains("Domain=localhost"));

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/override")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let cookie_str = set_cookie_header(response.headers(), "test_sess").unwrap();
        assert!(cookie_str.contains("Domain=example.com"));

        // The override never leaks back into the store-level default.
        let response = app
            .oneshot(Request::builder().uri("/plain").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let cookie_str = set_cookie_header(response.headers(), "test_sess").unwrap();
        assert!(cookie_str.contains("Domain=localhost"));
    }

    #[tokio::test]
    async fn oversize_session_fails_the_save() {
        async fn bloat_handler(session: Session<MemoryStore>) -> Result<String, StatusCode> {
            session.set("blob", "x".repeat(1024));
            session
                .save()
                .await
                .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
            Ok("Success".to_string())
        }

        let store = MemoryStore::new(signing_ring());
        store.set_max_length(64);
        let app = Router::new()
            .route("/bloat", get(bloat_handler))
            .layer(SessionLayer::new(Arc::new(store)).with_name("test_sess"))
            .layer(CookieManagerLayer::new());

        let response = app
            .oneshot(Request::builder().uri("/bloat").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(set_cookie_header(response.headers(), "test_sess").is_none());
    }

    #[tokio::test]
    async fn flashes_drain_exactly_once_across_requests() {
        async fn add_handler(session: Session<MemoryStore>) -> Result<String, StatusCode> {
            session.add_flash("one");
            session.add_flash("two");
            session
                .save()
                .await
                .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
            Ok("Queued".to_string())
        }

        async fn take_handler(session: Session<MemoryStore>) -> Result<String, StatusCode> {
            let flashes: Vec<String> = session
                .flashes()
                .into_iter()
                .filter_map(|v| v.as_str().map(ToOwned::to_owned))
                .collect();
            session
                .save()
                .await
                .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
            Ok(flashes.join(","))
        }

        let store = MemoryStore::new(signing_ring());
        let app = Router::new()
            .route("/add", get(add_handler))
            .route("/take", get(take_handler))
            .layer(SessionLayer::new(Arc::new(store)).with_name("test_sess"))
            .layer(CookieManagerLayer::new());

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/add").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let cookie = cookie_pair(response.headers(), "test_sess").unwrap();

        // First read returns the queue in order.
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/take")
                    .header(COOKIE, cookie.clone())
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(body_string(response).await, "one,two");

        // Second read finds nothing: the drain was persisted.
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/take")
                    .header(COOKIE, cookie)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(body_string(response).await, "");
    }

    #[tokio::test]
    async fn named_sessions_travel_in_separate_cookies() {
        async fn write_handler(sessions: Sessions<MemoryStore>) -> Result<String, StatusCode> {
            let auth = sessions
                .session("auth")
                .await
                .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
            let prefs = sessions
                .session("prefs")
                .await
                .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

            auth.set("user", "ferris");
            prefs.set("theme", "dark");
            sessions
                .save_changed()
                .await
                .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
            Ok("Success".to_string())
        }

        async fn read_handler(sessions: Sessions<MemoryStore>) -> Result<String, StatusCode> {
            let auth = sessions
                .session("auth")
                .await
                .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
            let prefs = sessions
                .session("prefs")
                .await
                .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

            let user = auth.get("user").and_then(|v| v.as_str().map(ToOwned::to_owned));
            let theme = prefs.get("theme").and_then(|v| v.as_str().map(ToOwned::to_owned));
            Ok(format!(
                "{}:{}",
                user.unwrap_or_default(),
                theme.unwrap_or_default()
            ))
        }

        let store = MemoryStore::new(signing_ring());
        let app = Router::new()
            .route("/write", get(write_handler))
            .route("/read", get(read_handler))
            .layer(SessionLayer::new(Arc::new(store)))
            .layer(CookieManagerLayer::new());

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/write").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let auth_cookie = cookie_pair(response.headers(), "auth").unwrap();
        let prefs_cookie = cookie_pair(response.headers(), "prefs").unwrap();
        assert_ne!(auth_cookie, prefs_cookie);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/read")
                    .header(COOKIE, format!("{auth_cookie}; {prefs_cookie}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(body_string(response).await, "ferris:dark");
    }

    #[tokio::test]
    async fn missing_cookie_middleware_rejects_extraction() {
        let store = MemoryStore::new(signing_ring());
        let app = Router::new()
            .route("/count", get(count_handler))
            .layer(SessionLayer::new(Arc::new(store)).with_name("test_sess"));

        let response = app
            .oneshot(Request::builder().uri("/count").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
