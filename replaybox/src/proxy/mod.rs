//! The caching stand-in for a real transport.
//!
//! A [`RequestProxy`] looks exactly like the transport it replaces. On
//! `send` it derives a cache key from the request identity and body, answers
//! from the [`ResponseCache`](replaybox_backend::ResponseCache) when it can,
//! and otherwise (or additionally, when refresh is on) replays the request
//! on a fresh transport from the original factory.
//!
//! The caller's handler sees exactly one terminal observation per `send`:
//!
//! | cache | refresh | network calls | handler sees |
//! |-------|---------|---------------|--------------|
//! | miss  | any     | 1             | network stages |
//! | hit   | off     | 0             | cached response |
//! | hit   | on      | 1             | cached response |
//!
//! When a hit is refreshed, the network completion still updates the proxy's
//! own state and the cache entry; it just never reaches the handler.

mod relay;
mod state;

use std::sync::Arc;

use async_trait::async_trait;
use replaybox_core::{
    Header, ReadyState, ReadyStateChange, ReadyStateHandler, RequestError, RequestIdentity,
    STATUS_OK, Transport, TransportFactory,
};
use tracing::{debug, warn};

use crate::metrics;
use crate::replay::ReplayContext;
use relay::NetworkCall;
use state::Shared;

pub use state::DispatchState;

/// Transport produced by [`Replay`](crate::Replay).
pub struct RequestProxy<F> {
    context: Arc<ReplayContext<F>>,
    request: Option<RequestIdentity>,
    headers: Vec<Header>,
    shared: Arc<Shared>,
}

impl<F> RequestProxy<F> {
    pub(crate) fn new(context: Arc<ReplayContext<F>>) -> Self {
        Self {
            context,
            request: None,
            headers: Vec::new(),
            shared: Arc::new(Shared::default()),
        }
    }

    /// Identity recorded by the last `open`.
    pub fn request(&self) -> Option<&RequestIdentity> {
        self.request.as_ref()
    }

    /// Headers assigned since the last `open`, in order.
    pub fn headers(&self) -> &[Header] {
        &self.headers
    }

    /// Progress of the latest `send`.
    pub fn dispatch_state(&self) -> DispatchState {
        self.shared.dispatch()
    }
}

impl<F> std::fmt::Debug for RequestProxy<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestProxy")
            .field("request", &self.request)
            .field("headers", &self.headers)
            .field("dispatch", &self.shared.dispatch())
            .finish()
    }
}

#[async_trait]
impl<F> Transport for RequestProxy<F>
where
    F: TransportFactory,
{
    fn open(&mut self, request: RequestIdentity) {
        self.request = Some(request);
        self.headers.clear();
        self.shared.opened();
    }

    fn set_request_header(&mut self, name: &str, value: &str) {
        self.headers.push(Header::new(name, value));
    }

    fn on_ready_state_change(&mut self, handler: ReadyStateHandler) {
        self.shared.set_handler(handler);
    }

    async fn send(&mut self, body: Option<String>) -> Result<(), RequestError> {
        let request = self.request.clone().ok_or(RequestError::NotOpened)?;
        let generation = self.shared.begin();
        let cache = &self.context.cache;
        let key = cache.key(&request, body.as_deref());

        let cached = if cache.is_enabled() {
            let cached = cache.get(&key)?;
            metrics::record_cache_read(cached.is_some());
            cached
        } else {
            None
        };

        let served_from_cache = match cached {
            Some(text) => {
                debug!(%key, "serving from cache");
                self.shared
                    .serve(generation, ReadyStateChange::done(STATUS_OK, text));
                true
            }
            None => false,
        };

        if served_from_cache && !self.context.refresh_on_hit() {
            return Ok(());
        }

        self.shared.network_pending(generation, served_from_cache);
        let call = NetworkCall {
            context: self.context.clone(),
            request,
            headers: self.headers.clone(),
            body,
            key,
            shared: self.shared.clone(),
            generation,
        };

        if !served_from_cache {
            return call.run().await;
        }

        metrics::record_refresh();
        // The caller already has its answer; a failed refresh only gets logged.
        if !call.request.is_async() {
            let key = call.key.clone();
            if let Err(error) = call.run().await {
                warn!(%key, %error, "refresh failed");
            }
            return Ok(());
        }

        let offload_key = call.key.clone();
        let spawned = self.context.offload.spawn_with_key(offload_key, async move {
            let key = call.key.clone();
            if let Err(error) = call.run().await {
                warn!(%key, %error, "background refresh failed");
            }
        });
        if !spawned {
            self.shared.settle(generation);
        }
        Ok(())
    }

    fn ready_state(&self) -> ReadyState {
        self.shared.snapshot().ready_state
    }

    fn status(&self) -> u16 {
        self.shared.snapshot().status
    }

    fn response_text(&self) -> Option<String> {
        self.shared.snapshot().response_text
    }

    fn snapshot(&self) -> ReadyStateChange {
        self.shared.snapshot()
    }
}
