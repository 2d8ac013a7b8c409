#![warn(missing_docs)]
//! # replaybox-core
//!
//! Core traits and types for the replaybox request replay cache.
//!
//! This crate holds the vocabulary shared by every other replaybox crate:
//!
//! - **Identify** a request ([`RequestIdentity`], [`Header`], [`Credentials`])
//! - **Key** a stored response ([`CacheKey`])
//! - **Report** progress ([`ReadyState`], [`ReadyStateChange`])
//! - **Send** a request ([`Transport`], [`TransportFactory`])
//! - **Fail** ([`RequestError`], [`StoreError`])
//!
//! ## Feature Flags
//!
//! - `test-helpers` - Scripted [`mock`] transport for integration tests
//!

pub mod error;
pub mod key;
#[cfg(any(test, feature = "test-helpers"))]
pub mod mock;
pub mod ready_state;
pub mod request;
pub mod transport;

pub use error::{BoxError, RequestError, StoreError};
pub use key::{CacheKey, DEFAULT_NAMESPACE};
pub use ready_state::{ReadyState, ReadyStateChange, STATUS_OK, STATUS_TRANSPORT_ERROR};
pub use request::{Credentials, Header, RequestIdentity};
pub use transport::{ReadyStateHandler, Transport, TransportFactory};
