//! Scripted in-process transport for tests.
//!
//! [`MockTransportFactory`] answers requests from a route table keyed by
//! method and URL and records every request that reaches it, so tests can
//! assert how many network calls a caching layer actually made.
//!
//! ```rust,ignore
//! use replaybox_core::mock::MockTransportFactory;
//!
//! let network = MockTransportFactory::new();
//! network.respond("GET", "/users", 200, "[1,2,3]");
//! assert_eq!(network.call_count(), 0);
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::error::RequestError;
use crate::ready_state::{ReadyState, ReadyStateChange};
use crate::request::{Header, RequestIdentity};
use crate::transport::{ReadyStateHandler, Transport, TransportFactory};

/// Scripted outcome for a route.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MockResponse {
    /// Complete with a status and body.
    Reply {
        /// Result code.
        status: u16,
        /// Response body.
        body: String,
    },
    /// Fail at the transport level.
    Fail(String),
}

/// A request that reached the mock network.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedRequest {
    /// Identity the transport was opened with.
    pub request: RequestIdentity,
    /// Headers in assignment order.
    pub headers: Vec<Header>,
    /// Body passed to `send`.
    pub body: Option<String>,
}

#[derive(Debug, Default)]
struct MockNetwork {
    routes: Mutex<HashMap<(String, String), MockResponse>>,
    calls: Mutex<Vec<RecordedRequest>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Factory for [`MockTransport`]s sharing one route table and call log.
///
/// Clones share state. Unscripted routes answer `404` with an empty body.
#[derive(Clone, Debug, Default)]
pub struct MockTransportFactory {
    network: Arc<MockNetwork>,
}

impl MockTransportFactory {
    /// Creates an empty mock network.
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts (or re-scripts) a reply for a route.
    pub fn respond(&self, method: &str, url: &str, status: u16, body: impl Into<String>) {
        self.script(
            method,
            url,
            MockResponse::Reply {
                status,
                body: body.into(),
            },
        );
    }

    /// Scripts a transport-level failure for a route.
    pub fn fail(&self, method: &str, url: &str, message: impl Into<String>) {
        self.script(method, url, MockResponse::Fail(message.into()));
    }

    fn script(&self, method: &str, url: &str, response: MockResponse) {
        lock(&self.network.routes).insert((method.to_owned(), url.to_owned()), response);
    }

    /// Every request sent so far, in order.
    pub fn calls(&self) -> Vec<RecordedRequest> {
        lock(&self.network.calls).clone()
    }

    /// Number of requests sent so far.
    pub fn call_count(&self) -> usize {
        lock(&self.network.calls).len()
    }

    /// Forgets recorded requests; routes are kept.
    pub fn reset_calls(&self) {
        lock(&self.network.calls).clear();
    }
}

impl TransportFactory for MockTransportFactory {
    type Transport = MockTransport;

    fn create(&self) -> Self::Transport {
        MockTransport {
            network: self.network.clone(),
            request: None,
            headers: Vec::new(),
            handler: None,
            current: ReadyStateChange::default(),
        }
    }
}

/// Transport produced by [`MockTransportFactory`].
///
/// Emits `HeadersReceived`, `Loading` and `Done` while being sent.
pub struct MockTransport {
    network: Arc<MockNetwork>,
    request: Option<RequestIdentity>,
    headers: Vec<Header>,
    handler: Option<ReadyStateHandler>,
    current: ReadyStateChange,
}

impl MockTransport {
    fn emit(&mut self, change: ReadyStateChange) {
        self.current = change;
        if let Some(handler) = self.handler.as_mut() {
            handler(&self.current);
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    fn open(&mut self, request: RequestIdentity) {
        self.request = Some(request);
        self.headers.clear();
        self.current = ReadyStateChange::stage(ReadyState::Opened);
    }

    fn set_request_header(&mut self, name: &str, value: &str) {
        self.headers.push(Header::new(name, value));
    }

    fn on_ready_state_change(&mut self, handler: ReadyStateHandler) {
        self.handler = Some(handler);
    }

    async fn send(&mut self, body: Option<String>) -> Result<(), RequestError> {
        let request = self.request.clone().ok_or(RequestError::NotOpened)?;
        lock(&self.network.calls).push(RecordedRequest {
            request: request.clone(),
            headers: self.headers.clone(),
            body,
        });

        let scripted = lock(&self.network.routes)
            .get(&(request.method().to_owned(), request.url().to_owned()))
            .cloned();

        match scripted {
            Some(MockResponse::Fail(message)) => {
                self.emit(ReadyStateChange::failed());
                Err(RequestError::network(message))
            }
            Some(MockResponse::Reply { status, body }) => {
                self.emit(ReadyStateChange::stage(ReadyState::HeadersReceived));
                self.emit(ReadyStateChange::stage(ReadyState::Loading));
                self.emit(ReadyStateChange::done(status, body));
                Ok(())
            }
            None => {
                self.emit(ReadyStateChange::stage(ReadyState::HeadersReceived));
                self.emit(ReadyStateChange::done(404, ""));
                Ok(())
            }
        }
    }

    fn ready_state(&self) -> ReadyState {
        self.current.ready_state
    }

    fn status(&self) -> u16 {
        self.current.status
    }

    fn response_text(&self) -> Option<String> {
        self.current.response_text.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reports_every_stage_and_records_call() {
        let network = MockTransportFactory::new();
        network.respond("GET", "/users", 200, "[1,2,3]");

        let stages = Arc::new(Mutex::new(Vec::new()));
        let seen = stages.clone();

        let mut transport = network.create();
        transport.open(RequestIdentity::new("GET", "/users"));
        transport.set_request_header("Accept", "application/json");
        transport.set_request_header("Accept", "text/plain");
        transport.on_ready_state_change(Box::new(move |change| {
            seen.lock().unwrap().push(change.ready_state);
        }));
        transport.send(None).await.unwrap();

        assert_eq!(
            *stages.lock().unwrap(),
            vec![
                ReadyState::HeadersReceived,
                ReadyState::Loading,
                ReadyState::Done
            ]
        );
        assert_eq!(transport.status(), 200);
        assert_eq!(transport.response_text().as_deref(), Some("[1,2,3]"));

        let calls = network.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].headers.len(), 2);
    }

    #[tokio::test]
    async fn send_without_open_fails() {
        let mut transport = MockTransportFactory::new().create();
        let result = transport.send(None).await;
        assert!(matches!(result, Err(RequestError::NotOpened)));
    }

    #[tokio::test]
    async fn scripted_failure_ends_with_status_zero() {
        let network = MockTransportFactory::new();
        network.fail("GET", "/down", "connection refused");

        let mut transport = network.create();
        transport.open(RequestIdentity::new("GET", "/down"));
        let result = transport.send(None).await;

        assert!(matches!(result, Err(RequestError::Network(_))));
        assert_eq!(transport.ready_state(), ReadyState::Done);
        assert_eq!(transport.status(), 0);
    }
}
