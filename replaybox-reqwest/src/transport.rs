//! [`Transport`] over a shared `reqwest::Client`.

use async_trait::async_trait;
use replaybox_core::{
    Header, ReadyState, ReadyStateChange, ReadyStateHandler, RequestError, RequestIdentity,
    Transport, TransportFactory,
};
use reqwest::{Client, Method};
use tracing::debug;

/// Creates [`ReqwestTransport`]s sharing one connection pool.
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransportFactory {
    client: Client,
}

impl ReqwestTransportFactory {
    /// Wraps an existing client, keeping its timeouts, proxies and TLS setup.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// The underlying client.
    pub fn client(&self) -> &Client {
        &self.client
    }
}

impl TransportFactory for ReqwestTransportFactory {
    type Transport = ReqwestTransport;

    fn create(&self) -> Self::Transport {
        ReqwestTransport {
            client: self.client.clone(),
            request: None,
            headers: Vec::new(),
            handler: None,
            current: ReadyStateChange::default(),
        }
    }
}

/// A single HTTP exchange.
///
/// Reports `HeadersReceived` once the response head arrives, `Loading` while
/// the body is read and `Done` with the final status and body. reqwest has no
/// blocking mode here; synchronous identities are sent the same way.
pub struct ReqwestTransport {
    client: Client,
    request: Option<RequestIdentity>,
    headers: Vec<Header>,
    handler: Option<ReadyStateHandler>,
    current: ReadyStateChange,
}

impl ReqwestTransport {
    fn emit(&mut self, change: ReadyStateChange) {
        self.current = change;
        if let Some(handler) = self.handler.as_mut() {
            handler(&self.current);
        }
    }

    fn fail(&mut self, error: reqwest::Error) -> RequestError {
        self.emit(ReadyStateChange::failed());
        if error.is_builder() {
            RequestError::InvalidRequest(Box::new(error))
        } else {
            RequestError::network(error)
        }
    }
}

impl std::fmt::Debug for ReqwestTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestTransport")
            .field("request", &self.request)
            .field("headers", &self.headers)
            .field("current", &self.current)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
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
        let method = Method::from_bytes(request.method().as_bytes())
            .map_err(|err| RequestError::InvalidRequest(Box::new(err)))?;

        let mut builder = self.client.request(method, request.url());
        for header in &self.headers {
            builder = builder.header(header.name.as_str(), header.value.as_str());
        }
        if let Some(credentials) = request.credentials() {
            builder = builder.basic_auth(&credentials.user, credentials.password.as_ref());
        }
        if let Some(body) = body {
            builder = builder.body(body);
        }

        debug!(method = request.method(), url = request.url(), "sending request");
        let response = match builder.send().await {
            Ok(response) => response,
            Err(err) => return Err(self.fail(err)),
        };

        let status = response.status().as_u16();
        self.emit(ReadyStateChange::stage(ReadyState::HeadersReceived));
        self.emit(ReadyStateChange::stage(ReadyState::Loading));

        match response.text().await {
            Ok(text) => {
                debug!(status, bytes = text.len(), "response received");
                self.emit(ReadyStateChange::done(status, text));
                Ok(())
            }
            Err(err) => Err(self.fail(err)),
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
