#![doc = include_str!("../README.md")]

mod transport;

pub use transport::{ReqwestTransport, ReqwestTransportFactory};

/// Re-export reqwest client type for convenience
pub use reqwest::Client;
