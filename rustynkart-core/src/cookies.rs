//! Cookie jar shared between the dispatcher and the session.
//!
//! The backend may also set the credential as a cookie. Those cookies must
//! not outlive the session, so the jar remembers every origin it received
//! cookies from and can expire the credential cookies on all of them.

use std::collections::BTreeMap;

use parking_lot::RwLock;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::HeaderValue;
use url::Url;

/// Cookies that carry the credential.
pub const CREDENTIAL_COOKIES: &[&str] = &["token", "authToken"];

/// Cookie store for the shared HTTP client.
#[derive(Default)]
pub struct SessionCookies {
    jar: Jar,
    /// Origins that have set cookies, keyed by their serialized form.
    origins: RwLock<BTreeMap<String, Url>>,
}

impl SessionCookies {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expire the credential cookies for every origin seen so far.
    pub fn expire_credentials(&self) {
        let origins = self.origins.read();
        for url in origins.values() {
            for name in CREDENTIAL_COOKIES {
                let expired = format!("{}=; Max-Age=0; Path=/", name);
                self.jar.add_cookie_str(&expired, url);
            }
        }
        if !origins.is_empty() {
            tracing::debug!(origins = origins.len(), "Expired credential cookies");
        }
    }
}

impl CookieStore for SessionCookies {
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, url: &Url) {
        let mut origin = url.clone();
        origin.set_path("/");
        origin.set_query(None);
        origin.set_fragment(None);
        self.origins
            .write()
            .entry(origin.as_str().to_string())
            .or_insert(origin);

        self.jar.set_cookies(cookie_headers, url);
    }

    fn cookies(&self, url: &Url) -> Option<HeaderValue> {
        self.jar.cookies(url)
    }
}

impl std::fmt::Debug for SessionCookies {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCookies")
            .field("origins", &self.origins.read().len())
            .finish()
    }
}
