//! # Sessio: Tower Sessions for HTTP Applications
//!
//! `sessio` is a session management middleware for Rust's Tower web framework,
//! with signed (and optionally encrypted) session cookies, pluggable backend
//! stores, and consume-once flash values.
//!
//! # Quick Start
//!
//! Here's a basic example with [Axum](https://docs.rs/axum/latest/axum/) and
//! the in-process `MemoryStore`; swap in a Redis store for production.
//! This requires the `axum` feature (enabled by default).
//!
//! ```rust,no_run
//! use axum::{Router, routing::get};
//! use sessio::{KeyPair, KeyRing, Session, SessionLayer};
//! use sessio::store::MemoryStore;
//! use std::sync::Arc;
//! use tower_cookies::CookieManagerLayer;
//!
//! #[tokio::main]
//! async fn main() {
//!     // Keys authenticate (and here also encrypt) the session cookie.
//!     let ring = KeyRing::new(vec![
//!         KeyPair::new(b"authentication-key", &[0u8; 32]).unwrap(),
//!     ]);
//!
//!     // Create session store
//!     let store = MemoryStore::new(ring);
//!
//!     // Create session layer
//!     let session_layer = SessionLayer::new(Arc::new(store)).with_name("session");
//!
//!     // Set up router with session management
//!     let app = Router::new()
//!         .route("/", get(handler))
//!         .layer(session_layer)
//!         .layer(CookieManagerLayer::new()); // CookieManagerLayer must be after
//!
//!     // Run the server
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await.unwrap();
//!     axum::serve(listener, app).await.unwrap();
//! }
//!
//! async fn handler(session: Session<MemoryStore>) -> String {
//!     let count = session.get("count").and_then(|v| v.as_int()).unwrap_or(0) + 1;
//!     session.set("count", count);
//!     session.save().await.unwrap();
//!     format!("You've visited this page {} times", count)
//! }
//! ```
//!
//! # Session Management
//!
//! ## Basic Operations
//!
//! ```rust,no_run
//! use sessio::Session;
//! use sessio::store::MemoryStore;
//!
//! async fn handler(session: Session<MemoryStore>) {
//!     // Read and write values
//!     let value = session.get("key");
//!     session.set("key", "new_value");
//!     session.remove("key");
//!
//!     // Queue a flash for the next request; reading drains the queue.
//!     session.add_flash("saved!");
//!     let notices = session.flashes();
//!
//!     // Nothing is persisted until save.
//!     session.save().await.unwrap();
//!
//!     // Delete the session: negative max_age removes the backend record
//!     // and the client cookie on the next save.
//!     let options = session.options().max_age(-1);
//!     session.set_options(options);
//!     session.save().await.unwrap();
//! }
//! ```
//!
//! ## Multiple Sessions Per Request
//!
//! The [`Sessions`] registry resolves any cookie name against the layer's
//! store, loading each at most once per request:
//!
//! ```rust,no_run
//! use sessio::Sessions;
//! use sessio::store::MemoryStore;
//!
//! async fn handler(sessions: Sessions<MemoryStore>) {
//!     let auth = sessions.session("auth").await.unwrap();
//!     let prefs = sessions.session("prefs").await.unwrap();
//!
//!     auth.set("user", "ferris");
//!     prefs.set("theme", "dark");
//!
//!     sessions.save_changed().await.unwrap();
//! }
//! ```
//!
//! # Stores
//!
//! ## Cookie
//! [`store::CookieStore`] keeps the whole value map inside the cookie itself:
//! no backend, but the serialized payload must fit the cookie limit and
//! travels with every request.
//!
//! ## Redis
//! A Redis-backed session store; the cookie carries only the authenticated
//! session identifier. Requires the `redis-store` feature.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use fred::clients::Client;
//! use sessio::{KeyPair, KeyRing};
//! use sessio::store::redis::RedisStore;
//!
//! let ring = KeyRing::new(vec![KeyPair::signing(b"authentication-key")]);
//! let fred_client_or_pool = Client::default();
//! let store = RedisStore::new(Arc::new(fred_client_or_pool), ring);
//!
//! // Tuning knobs shared by the cache-backed stores
//! store.set_key_prefix("session_");
//! store.set_max_length(4096);
//! store.set_default_max_age(20 * 60);
//! ```
//!
//! `RedisClusterStore` is the same store over a clustered fred client.
//!
//! ## Serialization
//! Each store serializes the value map with one of two backends, chosen per
//! store instance via [`Serializer`]:
//!
//! - [`Serializer::Binary`] (default) - compact [`bincode`](https://crates.io/crates/bincode) encoding,
//!   accepts every [`Value`] including tagged ones.
//! - [`Serializer::Structured`] - [MessagePack](https://crates.io/crates/rmp-serde) encoding for
//!   cross-language readers; rejects tagged values at save time.
//!
//! ## Key Rotation
//!
//! A [`KeyRing`] holds the codec key pairs. Rotate by prepending the new pair;
//! cookies signed by older pairs keep verifying until the pair is dropped:
//!
//! ```rust
//! use sessio::{KeyChain, KeyPair, KeyRing};
//!
//! let ring = KeyRing::new(vec![KeyPair::signing(b"old-key")]);
//! ring.rotate(KeyChain::new(vec![
//!     KeyPair::signing(b"new-key"),
//!     KeyPair::signing(b"old-key"),
//! ]));
//! ```
//!
//! ## Cookie Configuration
//!
//! ```rust
//! use sessio::SessionOptions;
//! use sessio::cookie::SameSite;
//!
//! let options = SessionOptions::build()
//!     .http_only(true)
//!     .same_site(SameSite::Strict)
//!     .secure(true) // Set to true in production
//!     .max_age(7200) // 2 hours
//!     .path("/")
//!     .domain("example.com");
//! ```
//!
//! # Important Notes
//!
//! ## Middleware Ordering
//! The `SessionLayer` must be applied **before** the `CookieManagerLayer`:
//!
//! ```rust,no_run
//! use axum::Router;
//! use sessio::{KeyPair, KeyRing, SessionLayer};
//! use sessio::store::MemoryStore;
//! use tower_cookies::CookieManagerLayer;
//! use std::sync::Arc;
//!
//! let ring = KeyRing::new(vec![KeyPair::signing(b"authentication-key")]);
//! let app: Router<()> = Router::new();
//! let session_layer = SessionLayer::new(Arc::new(MemoryStore::new(ring)));
//!
//! // Correct order
//! let router = app
//!     .layer(session_layer)
//!     .layer(CookieManagerLayer::new());
//! ```
//!
//! ## Best Practices
//!
//! - Enable HTTPS in production and set `secure: true` in the options.
//! - Use appropriate `SameSite` settings (e.g., `Strict` or `Lax`).
//! - Always set a session expiration time (`max_age`).
//! - Pair an encryption key with the authentication key when session values
//!   must stay opaque to the client (mandatory for `CookieStore`).
//! - Enable HTTP Only mode (`http_only: true`) to prevent client-side script
//!   access to the session cookie.

pub use cookie;

#[cfg(feature = "axum")]
mod extract;

#[cfg(feature = "redis-store")]
pub use fred;

mod codec;
pub use codec::{KeyChain, KeyPair, KeyRing};

mod registry;
pub use registry::Sessions;

mod serializer;
pub use serializer::Serializer;

mod service;
pub use service::*;

mod session;
pub use session::*;

pub mod store;

pub use tower_cookies;
