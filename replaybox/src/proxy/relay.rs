//! The network leg of a dispatch.

use std::sync::Arc;

use replaybox_core::{
    CacheKey, Header, ReadyStateChange, ReadyStateHandler, RequestError, RequestIdentity,
    Transport, TransportFactory,
};
use tracing::debug;

use super::state::Shared;
use crate::metrics;
use crate::replay::ReplayContext;

/// Handler registered on the real transport.
fn relay(shared: Arc<Shared>, generation: u64) -> ReadyStateHandler {
    Box::new(move |change| shared.mirror(generation, change))
}

/// Everything needed to replay a request against the real transport, owned
/// so it can be moved into a background task.
pub(crate) struct NetworkCall<F> {
    pub(crate) context: Arc<ReplayContext<F>>,
    pub(crate) request: RequestIdentity,
    pub(crate) headers: Vec<Header>,
    pub(crate) body: Option<String>,
    pub(crate) key: CacheKey,
    pub(crate) shared: Arc<Shared>,
    pub(crate) generation: u64,
}

impl<F> NetworkCall<F>
where
    F: TransportFactory,
{
    /// Sends the request and stores a successful response.
    pub(crate) async fn run(self) -> Result<(), RequestError> {
        let mut transport = self.context.original.create();
        transport.open(self.request.clone());
        for header in &self.headers {
            transport.set_request_header(&header.name, &header.value);
        }
        transport.on_ready_state_change(relay(self.shared.clone(), self.generation));

        debug!(
            key = %self.key,
            method = self.request.method(),
            url = self.request.url(),
            headers = self.headers.len(),
            "dispatching to network"
        );

        if let Err(error) = transport.send(self.body).await {
            debug!(key = %self.key, %error, "network dispatch failed");
            if self.shared.is_pending(self.generation) {
                self.shared.mirror(self.generation, &ReadyStateChange::failed());
            }
            return Err(error);
        }

        // Transports that never invoked the handler still end up observed.
        let last = transport.snapshot();
        if last.ready_state.is_done() && self.shared.is_pending(self.generation) {
            self.shared.mirror(self.generation, &last);
        }

        let cache = &self.context.cache;
        if !last.is_success() || !cache.is_enabled() {
            debug!(key = %self.key, status = last.status, "response not cached");
            return Ok(());
        }

        let body = last.response_text.unwrap_or_default();
        match cache.set(&self.key, &body) {
            Ok(()) => {
                metrics::record_cache_write(true, cache.store().name());
                Ok(())
            }
            Err(error) => {
                metrics::record_cache_write(false, cache.store().name());
                Err(error.into())
            }
        }
    }
}
