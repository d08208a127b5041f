//! Session state and the request-scoped handle that mutates it.

mod id;
mod options;
mod value;

pub use id::Id;
pub use options::SessionOptions;
pub use value::{Value, ValueMap};

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tower_cookies::Cookies;

use crate::store::{Error, SessionStore};

/// Reserved values-map key for the default flash namespace.
pub(crate) const FLASH_KEY: &str = "_flash";

/// The persisted portion of a session.
///
/// `id` stays `None` until the first successful save against a cache-backed
/// store; cookie-backed sessions never carry one. `is_new` is true when the
/// state did not come from an existing record.
#[derive(Clone, Debug)]
pub struct SessionState {
    pub id: Option<Id>,
    pub is_new: bool,
    pub values: ValueMap,
    pub options: SessionOptions,
}

impl SessionState {
    /// A brand-new, unbound session with the store's default options.
    pub fn fresh(options: SessionOptions) -> Self {
        Self {
            id: None,
            is_new: true,
            values: ValueMap::new(),
            options,
        }
    }

    /// State restored from an existing record.
    pub fn bound(id: Option<Id>, values: ValueMap, options: SessionOptions) -> Self {
        Self {
            id,
            is_new: false,
            values,
            options,
        }
    }
}

/// The request-scoped session handle handlers mutate.
///
/// All value operations act on in-memory state and are immediately visible to
/// subsequent reads on the same handle; nothing is persisted until the single
/// explicit [`save`](Session::save). Handles are never shared across requests,
/// so the internal lock only guards against accidental intra-request aliasing.
#[derive(Debug)]
pub struct Session<S: SessionStore> {
    inner: Arc<Inner<S>>,
}

impl<S: SessionStore> Clone for Session<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[derive(Debug)]
pub struct Inner<S: SessionStore> {
    name: &'static str,
    store: Arc<S>,
    cookies: Cookies,
    state: Mutex<SessionState>,
    // set when a value is mutated, cleared on save
    changed: AtomicBool,
}

impl<S: SessionStore> Session<S> {
    pub(crate) fn new(
        store: Arc<S>,
        cookies: Cookies,
        name: &'static str,
        state: SessionState,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                name,
                store,
                cookies,
                state: Mutex::new(state),
                changed: AtomicBool::new(false),
            }),
        }
    }

    /// The cookie name this session is addressed by.
    pub fn name(&self) -> &'static str {
        self.inner.name
    }

    /// The session identifier, assigned on the first successful save against
    /// a cache-backed store.
    pub fn id(&self) -> Option<Id> {
        self.inner.state.lock().id
    }

    /// Whether this session was freshly constructed rather than restored from
    /// an existing record.
    pub fn is_new(&self) -> bool {
        self.inner.state.lock().is_new
    }

    /// Whether any value has been mutated since load or the last save.
    pub fn is_changed(&self) -> bool {
        self.inner.changed.load(Ordering::Relaxed)
    }

    /// Returns the value stored under `key`, if any.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.inner.state.lock().values.get(key).cloned()
    }

    /// Sets `key` to `value`.
    pub fn set(&self, key: &str, value: impl Into<Value>) {
        self.inner
            .state
            .lock()
            .values
            .insert(key.to_owned(), value.into());
        self.changed();
    }

    /// Removes `key`, returning its previous value.
    pub fn remove(&self, key: &str) -> Option<Value> {
        let removed = self.inner.state.lock().values.remove(key);
        if removed.is_some() {
            self.changed();
        }
        removed
    }

    /// Removes every value, flash namespaces included.
    pub fn clear(&self) {
        self.inner.state.lock().values.clear();
        self.changed();
    }

    /// Appends a flash value to the default namespace.
    pub fn add_flash(&self, value: impl Into<Value>) {
        self.add_flash_to(value, FLASH_KEY);
    }

    /// Appends a flash value to the namespace stored under `key`.
    pub fn add_flash_to(&self, value: impl Into<Value>, key: &str) {
        let mut state = self.inner.state.lock();
        match state.values.get_mut(key) {
            Some(Value::Seq(entries)) => entries.push(value.into()),
            _ => {
                state
                    .values
                    .insert(key.to_owned(), Value::Seq(vec![value.into()]));
            }
        }
        drop(state);
        self.changed();
    }

    /// Drains the default flash namespace.
    pub fn flashes(&self) -> Vec<Value> {
        self.flashes_from(FLASH_KEY)
    }

    /// Drains the flash namespace stored under `key`: returns its entire
    /// sequence and removes the key, so an immediate second call returns an
    /// empty vector. Persisted only on the next [`save`](Session::save).
    pub fn flashes_from(&self, key: &str) -> Vec<Value> {
        let removed = self.inner.state.lock().values.remove(key);
        match removed {
            Some(Value::Seq(entries)) => {
                self.changed();
                entries
            }
            Some(other) => {
                self.changed();
                vec![other]
            }
            None => Vec::new(),
        }
    }

    /// The options the next save will use.
    pub fn options(&self) -> SessionOptions {
        self.inner.state.lock().options
    }

    /// Overrides the options for this session instance only; the store-level
    /// default is untouched. Marks the session changed so that an options-only
    /// mutation, a deletion via a negative `max_age` in particular, is picked
    /// up by [`Sessions::save_changed`](crate::Sessions::save_changed).
    pub fn set_options(&self, options: SessionOptions) {
        self.inner.state.lock().options = options;
        self.changed();
    }

    /// Persists the session through its store and emits the response cookie.
    ///
    /// With a negative `max_age` this deletes any backend record and clears the
    /// client cookie; the identifier is retired and a later save starts a new
    /// one. Oversize and backend errors propagate; on error no cookie has
    /// been emitted.
    #[tracing::instrument(name = "saving session", skip(self), fields(name = self.inner.name))]
    pub async fn save(&self) -> Result<(), Error> {
        let mut state = self.inner.state.lock().clone();
        self.inner
            .store
            .save(&self.inner.cookies, self.inner.name, &mut state)
            .await
            .map_err(|err| {
                tracing::error!(err = %err, "failed to save session");
                err
            })?;

        *self.inner.state.lock() = state;
        self.inner.changed.store(false, Ordering::Relaxed);
        Ok(())
    }

    fn changed(&self) {
        self.inner.changed.store(true, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::KeyPair;
    use crate::codec::KeyRing;

    fn session() -> Session<MemoryStore> {
        let ring = KeyRing::new(vec![KeyPair::signing(b"test-auth-key")]);
        let store = Arc::new(MemoryStore::new(ring));
        Session::new(
            store,
            Cookies::default(),
            "test_sess",
            SessionState::fresh(SessionOptions::default()),
        )
    }

    #[test]
    fn mutations_are_visible_before_save() {
        let session = session();
        assert!(session.get("key").is_none());
        assert!(!session.is_changed());

        session.set("key", "ok");
        assert_eq!(session.get("key"), Some(Value::Str("ok".into())));
        assert!(session.is_changed());

        assert_eq!(session.remove("key"), Some(Value::Str("ok".into())));
        assert!(session.get("key").is_none());
    }

    #[test]
    fn flash_drain_is_destructive() {
        let session = session();
        session.add_flash("a");
        session.add_flash("b");

        assert_eq!(
            session.flashes(),
            vec![Value::Str("a".into()), Value::Str("b".into())]
        );
        assert!(session.flashes().is_empty());
    }

    #[test]
    fn flash_namespaces_are_independent() {
        let session = session();
        session.add_flash("x");
        session.add_flash_to("y", "custom");

        assert_eq!(session.flashes(), vec![Value::Str("x".into())]);
        assert_eq!(session.flashes_from("custom"), vec![Value::Str("y".into())]);
        assert!(session.flashes_from("custom").is_empty());
    }

    #[test]
    fn clear_removes_flashes_too() {
        let session = session();
        session.set("key", 1i64);
        session.add_flash("note");
        session.clear();

        assert!(session.get("key").is_none());
        assert!(session.flashes().is_empty());
    }

    #[test]
    fn options_override_is_local() {
        let session = session();
        let override_options = SessionOptions::build().max_age(5).domain("localhost");
        session.set_options(override_options);
        assert_eq!(session.options(), override_options);
    }
}
