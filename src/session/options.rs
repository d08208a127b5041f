use cookie::SameSite;
use cookie::time::Duration;
use tower_cookies::Cookie;

/// Configuration options for session cookies.
///
/// `max_age` follows cookie semantics throughout the crate: `0` yields a
/// browser-session cookie (cache backends then fall back to their own default
/// TTL), a negative value expires the session immediately, and a positive
/// value is the lifetime in seconds for both the cookie and the backend
/// record.
///
/// # Example
///
/// ```rust
/// use sessio::SessionOptions;
///
/// let options = SessionOptions::build()
///     .http_only(true)
///     .same_site(cookie::SameSite::Lax)
///     .secure(true)
///     .max_age(30 * 60)
///     .path("/");
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SessionOptions {
    pub http_only: bool,
    pub domain: Option<&'static str>,
    pub path: Option<&'static str>,
    pub same_site: SameSite,
    pub secure: bool,
    pub max_age: i64,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            http_only: true,
            domain: None,
            path: Some("/"),
            same_site: SameSite::Lax,
            secure: true,
            max_age: 30 * 24 * 60 * 60,
        }
    }
}

impl SessionOptions {
    /// Creates a new `SessionOptions` with default values.
    pub fn build() -> Self {
        Self::default()
    }

    pub fn http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }

    pub fn same_site(mut self, same_site: SameSite) -> Self {
        self.same_site = same_site;
        self
    }

    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    pub fn domain(mut self, domain: &'static str) -> Self {
        self.domain = Some(domain);
        self
    }

    pub fn path(mut self, path: &'static str) -> Self {
        self.path = Some(path);
        self
    }

    pub fn max_age(mut self, seconds: i64) -> Self {
        self.max_age = seconds;
        self
    }

    /// Builds the session cookie carrying `value`.
    ///
    /// `max_age == 0` omits the `Max-Age` attribute so the browser treats it
    /// as a session cookie; `max_age < 0` produces the same cookie as
    /// [`SessionOptions::removal_cookie`].
    pub(crate) fn cookie(&self, name: &'static str, value: String) -> Cookie<'static> {
        if self.max_age < 0 {
            return self.removal_cookie(name);
        }

        let mut builder = Cookie::build((name, value))
            .secure(self.secure)
            .http_only(self.http_only)
            .same_site(self.same_site);

        if self.max_age > 0 {
            builder = builder.max_age(Duration::seconds(self.max_age));
        }

        if let Some(domain) = self.domain {
            builder = builder.domain(domain);
        }

        if let Some(path) = self.path {
            builder = builder.path(path);
        }

        builder.build()
    }

    /// Builds a cookie that instructs the client to drop the session cookie:
    /// empty value, `Max-Age=0`.
    pub(crate) fn removal_cookie(&self, name: &'static str) -> Cookie<'static> {
        let mut builder = Cookie::build((name, ""))
            .secure(self.secure)
            .http_only(self.http_only)
            .same_site(self.same_site)
            .max_age(Duration::ZERO);

        if let Some(domain) = self.domain {
            builder = builder.domain(domain);
        }

        if let Some(path) = self.path {
            builder = builder.path(path);
        }

        builder.build()
    }
}
