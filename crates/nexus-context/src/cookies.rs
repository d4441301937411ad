//! Cookie jar shared by all contexts of an origin.
//!
//! Only the small slice of cookie semantics this subsystem relies on is
//! modeled: named values, `Max-Age` expiry evaluated against the jar's
//! clock, and the attributes the session cookie is written with (kept
//! observable so tests can assert on them). There is no path matching or
//! cross-origin logic — a jar *is* an origin.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::{Clock, StorageError};

/// `SameSite` cookie attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

/// Attributes a cookie is written with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieAttributes {
    /// Lifetime in seconds; `None` means a session cookie.
    pub max_age_secs: Option<i64>,
    pub path: String,
    pub same_site: SameSite,
    pub secure: bool,
}

impl Default for CookieAttributes {
    fn default() -> Self {
        Self {
            max_age_secs: None,
            path: "/".to_string(),
            same_site: SameSite::Lax,
            secure: false,
        }
    }
}

#[derive(Debug, Clone)]
struct StoredCookie {
    value: String,
    /// Absolute expiry computed from `Max-Age` at write time.
    expires_at_ms: Option<i64>,
    attributes: CookieAttributes,
}

struct JarInner {
    cookies: Mutex<HashMap<String, StoredCookie>>,
    clock: Arc<dyn Clock>,
    disabled: AtomicBool,
}

/// The origin's cookie store. Cheap to clone; clones share contents.
#[derive(Clone)]
pub struct CookieJar {
    inner: Arc<JarInner>,
}

impl CookieJar {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(JarInner {
                cookies: Mutex::new(HashMap::new()),
                clock,
                disabled: AtomicBool::new(false),
            }),
        }
    }

    /// Writes a cookie. A `Max-Age` of zero or less expires it at once.
    pub fn set(
        &self,
        name: &str,
        value: &str,
        attributes: CookieAttributes,
    ) -> Result<(), StorageError> {
        if self.inner.disabled.load(Ordering::SeqCst) {
            return Err(StorageError::Disabled);
        }
        let mut cookies =
            self.inner.cookies.lock().expect("cookie jar poisoned");
        match attributes.max_age_secs {
            Some(secs) if secs <= 0 => {
                cookies.remove(name);
            }
            max_age => {
                let expires_at_ms = max_age
                    .map(|secs| self.inner.clock.now_ms() + secs * 1_000);
                cookies.insert(
                    name.to_string(),
                    StoredCookie {
                        value: value.to_string(),
                        expires_at_ms,
                        attributes,
                    },
                );
            }
        }
        Ok(())
    }

    /// Reads a cookie value, honoring expiry.
    pub fn get(&self, name: &str) -> Option<String> {
        let mut cookies =
            self.inner.cookies.lock().expect("cookie jar poisoned");
        let cookie = cookies.get(name)?;
        if let Some(expires_at) = cookie.expires_at_ms {
            if self.inner.clock.now_ms() >= expires_at {
                cookies.remove(name);
                return None;
            }
        }
        Some(cookies[name].value.clone())
    }

    /// Deletes a cookie immediately.
    pub fn expire(&self, name: &str) {
        self.inner
            .cookies
            .lock()
            .expect("cookie jar poisoned")
            .remove(name);
    }

    /// The attributes a live cookie was written with, for assertions.
    pub fn attributes(&self, name: &str) -> Option<CookieAttributes> {
        self.inner
            .cookies
            .lock()
            .expect("cookie jar poisoned")
            .get(name)
            .map(|c| c.attributes.clone())
    }

    /// Failure injection: when enabled, writes fail with
    /// [`StorageError::Disabled`].
    pub fn set_disabled(&self, disabled: bool) {
        self.inner.disabled.store(disabled, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ManualClock;

    fn jar_at(start_ms: i64) -> (CookieJar, ManualClock) {
        let clock = ManualClock::new(start_ms);
        (CookieJar::new(Arc::new(clock.clone())), clock)
    }

    #[test]
    fn test_set_then_get_returns_value() {
        let (jar, _clock) = jar_at(0);
        jar.set("session_id", "abc", CookieAttributes::default())
            .unwrap();
        assert_eq!(jar.get("session_id").as_deref(), Some("abc"));
    }

    #[test]
    fn test_get_missing_cookie_returns_none() {
        let (jar, _clock) = jar_at(0);
        assert_eq!(jar.get("missing"), None);
    }

    #[test]
    fn test_cookie_expires_after_max_age() {
        let (jar, clock) = jar_at(0);
        jar.set(
            "session_id",
            "abc",
            CookieAttributes {
                max_age_secs: Some(3_600),
                ..Default::default()
            },
        )
        .unwrap();

        clock.advance(3_599_999);
        assert!(jar.get("session_id").is_some(), "still within max-age");

        clock.advance(1);
        assert_eq!(jar.get("session_id"), None, "expired at max-age");
    }

    #[test]
    fn test_rewrite_slides_expiry_forward() {
        let (jar, clock) = jar_at(0);
        let attrs = CookieAttributes {
            max_age_secs: Some(10),
            ..Default::default()
        };
        jar.set("k", "v1", attrs.clone()).unwrap();

        clock.advance(8_000);
        jar.set("k", "v2", attrs).unwrap();

        // The rewrite reset the window, so 8s later it is still alive.
        clock.advance(8_000);
        assert_eq!(jar.get("k").as_deref(), Some("v2"));
    }

    #[test]
    fn test_zero_max_age_expires_immediately() {
        let (jar, _clock) = jar_at(0);
        jar.set("k", "v", CookieAttributes::default()).unwrap();

        jar.set(
            "k",
            "",
            CookieAttributes {
                max_age_secs: Some(0),
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(jar.get("k"), None);
    }

    #[test]
    fn test_expire_removes_cookie() {
        let (jar, _clock) = jar_at(0);
        jar.set("k", "v", CookieAttributes::default()).unwrap();
        jar.expire("k");
        assert_eq!(jar.get("k"), None);
    }

    #[test]
    fn test_attributes_are_observable() {
        let (jar, _clock) = jar_at(0);
        jar.set(
            "session_id",
            "abc",
            CookieAttributes {
                max_age_secs: Some(3_600),
                path: "/".to_string(),
                same_site: SameSite::Strict,
                secure: true,
            },
        )
        .unwrap();

        let attrs = jar.attributes("session_id").expect("cookie exists");
        assert_eq!(attrs.same_site, SameSite::Strict);
        assert!(attrs.secure);
        assert_eq!(attrs.max_age_secs, Some(3_600));
    }

    #[test]
    fn test_disabled_jar_rejects_writes() {
        let (jar, _clock) = jar_at(0);
        jar.set_disabled(true);
        assert!(matches!(
            jar.set("k", "v", CookieAttributes::default()),
            Err(StorageError::Disabled)
        ));

        jar.set_disabled(false);
        assert!(jar.set("k", "v", CookieAttributes::default()).is_ok());
    }
}
