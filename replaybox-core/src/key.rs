//! Cache key construction.
//!
//! A cache key is the plain concatenation of a namespace tag, the request
//! method, the URL and, when present and non-empty, the request body:
//!
//! ```
//! use replaybox_core::{CacheKey, RequestIdentity};
//!
//! let request = RequestIdentity::new("POST", "/items");
//! let key = CacheKey::new("ajaxreplay", &request, Some("a=1"));
//! assert_eq!(key.as_str(), "ajaxreplayPOST/itemsa=1");
//! ```
//!
//! Headers never take part in the key. Two requests that differ only in their
//! headers share a cache entry.
//!
//! [`CacheKey`] wraps its string in [`Arc`], so cloning only bumps a
//! reference count.

use std::fmt;
use std::sync::Arc;

use crate::request::RequestIdentity;

/// Default namespace tag prepended to every key.
pub const DEFAULT_NAMESPACE: &str = "ajaxreplay";

/// Key identifying a cached response.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    inner: Arc<str>,
}

impl CacheKey {
    /// Derives the key for a request and its body.
    ///
    /// An empty body is treated as no body.
    pub fn new(namespace: &str, request: &RequestIdentity, body: Option<&str>) -> Self {
        let body = body.unwrap_or_default();
        let mut key = String::with_capacity(
            namespace.len() + request.method().len() + request.url().len() + body.len(),
        );
        key.push_str(namespace);
        key.push_str(request.method());
        key.push_str(request.url());
        key.push_str(body);
        Self { inner: key.into() }
    }

    /// The key as stored.
    pub fn as_str(&self) -> &str {
        &self.inner
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_is_namespace_method_url() {
        let request = RequestIdentity::new("GET", "/users");
        let key = CacheKey::new(DEFAULT_NAMESPACE, &request, None);
        assert_eq!(key.as_str(), "ajaxreplayGET/users");
    }

    #[test]
    fn empty_body_does_not_change_key() {
        let request = RequestIdentity::new("POST", "/items");
        assert_eq!(
            CacheKey::new(DEFAULT_NAMESPACE, &request, Some("")),
            CacheKey::new(DEFAULT_NAMESPACE, &request, None),
        );
    }

    #[test]
    fn body_distinguishes_keys() {
        let request = RequestIdentity::new("POST", "/items");
        let first = CacheKey::new(DEFAULT_NAMESPACE, &request, Some("a=1"));
        let second = CacheKey::new(DEFAULT_NAMESPACE, &request, Some("a=2"));
        assert_ne!(first, second);
        assert_eq!(first.as_str(), "ajaxreplayPOST/itemsa=1");
    }

    #[test]
    fn credentials_and_async_flag_do_not_change_key() {
        let plain = RequestIdentity::new("GET", "/me");
        let other = RequestIdentity::new("GET", "/me")
            .with_async(false)
            .with_credentials(crate::Credentials::new("bob", None::<String>));
        assert_eq!(
            CacheKey::new(DEFAULT_NAMESPACE, &plain, None),
            CacheKey::new(DEFAULT_NAMESPACE, &other, None),
        );
    }
}
