//! Request identity and header types.
//!
//! A [`RequestIdentity`] is everything a transport learns when it is opened:
//! method, URL, whether the exchange is asynchronous, and optional
//! credentials. Together with the request body it determines the cache key.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// User and password supplied when a request is opened.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// User name.
    pub user: String,
    /// Password, if one was supplied.
    pub password: Option<String>,
}

impl Credentials {
    /// Creates credentials with a user and an optional password.
    pub fn new(user: impl Into<String>, password: Option<impl Into<String>>) -> Self {
        Self {
            user: user.into(),
            password: password.map(Into::into),
        }
    }
}

/// Identity of a single logical request.
///
/// Immutable once built; a transport replaces its identity wholesale when it
/// is opened again.
///
/// ```
/// use replaybox_core::{Credentials, RequestIdentity};
///
/// let request = RequestIdentity::new("GET", "/users")
///     .with_credentials(Credentials::new("alice", Some("secret")));
///
/// assert_eq!(request.method(), "GET");
/// assert!(request.is_async());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestIdentity {
    method: SmolStr,
    url: String,
    is_async: bool,
    credentials: Option<Credentials>,
}

impl RequestIdentity {
    /// Creates an asynchronous request identity without credentials.
    pub fn new(method: impl Into<SmolStr>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            is_async: true,
            credentials: None,
        }
    }

    /// Marks the request as asynchronous or synchronous.
    pub fn with_async(self, is_async: bool) -> Self {
        Self { is_async, ..self }
    }

    /// Attaches credentials to the request.
    pub fn with_credentials(self, credentials: Credentials) -> Self {
        Self {
            credentials: Some(credentials),
            ..self
        }
    }

    /// HTTP method, exactly as supplied.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Request URL, exactly as supplied.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Whether the exchange completes asynchronously.
    pub fn is_async(&self) -> bool {
        self.is_async
    }

    /// Credentials supplied on open.
    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }
}

/// A single header assignment.
///
/// Header sets are ordered and never deduplicated: assigning the same name
/// twice yields two entries, both forwarded to the network.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    /// Header name.
    pub name: String,
    /// Header value.
    pub value: String,
}

impl Header {
    /// Creates a header assignment.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}
