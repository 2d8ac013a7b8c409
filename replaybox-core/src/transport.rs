//! The network-request primitive.
//!
//! [`Transport`] mirrors the shape of a browser-style request object: it is
//! opened with a [`RequestIdentity`], collects headers, accepts a ready-state
//! handler and is finally sent with an optional body. Progress is reported by
//! invoking the handler once per lifecycle stage; once `send` resolves, the
//! final stage, status and body are readable from the transport itself.
//!
//! Transports are produced by a [`TransportFactory`]. Code written against
//! the factory does not care whether it talks to the network directly or to
//! a caching stand-in.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::RequestError;
use crate::ready_state::{ReadyState, ReadyStateChange};
use crate::request::RequestIdentity;

/// Callback invoked on ready-state changes.
pub type ReadyStateHandler = Box<dyn FnMut(&ReadyStateChange) + Send + 'static>;

/// A single-use network request.
///
/// # Examples
///
/// ```rust,ignore
/// let mut request = factory.create();
/// request.open(RequestIdentity::new("GET", "/users"));
/// request.set_request_header("Accept", "application/json");
/// request.on_ready_state_change(Box::new(|change| {
///     if change.ready_state.is_done() {
///         println!("{} {:?}", change.status, change.response_text);
///     }
/// }));
/// request.send(None).await?;
/// ```
#[async_trait]
pub trait Transport: Send {
    /// Records the request identity. Opening again replaces the identity and
    /// clears previously assigned headers.
    fn open(&mut self, request: RequestIdentity);

    /// Appends a header assignment. Duplicates are kept.
    fn set_request_header(&mut self, name: &str, value: &str);

    /// Registers the ready-state handler, replacing any previous one.
    fn on_ready_state_change(&mut self, handler: ReadyStateHandler);

    /// Dispatches the request.
    ///
    /// Resolves once the exchange has reached its terminal stage or failed.
    /// Non-success statuses are not errors; they are reported through the
    /// handler and [`Transport::status`].
    async fn send(&mut self, body: Option<String>) -> Result<(), RequestError>;

    /// Current lifecycle stage.
    fn ready_state(&self) -> ReadyState;

    /// Result code; meaningful once [`ReadyState::Done`] is reached.
    fn status(&self) -> u16;

    /// Response body; meaningful once [`ReadyState::Done`] is reached.
    fn response_text(&self) -> Option<String>;

    /// Current stage, status and body in one observation.
    fn snapshot(&self) -> ReadyStateChange {
        ReadyStateChange {
            ready_state: self.ready_state(),
            status: self.status(),
            response_text: self.response_text(),
        }
    }
}

/// Constructor for fresh [`Transport`] instances.
pub trait TransportFactory: Send + Sync + 'static {
    /// Transport produced by this factory.
    type Transport: Transport + 'static;

    /// Creates a new, unopened transport.
    fn create(&self) -> Self::Transport;
}

impl<F> TransportFactory for Arc<F>
where
    F: TransportFactory,
{
    type Transport = F::Transport;

    fn create(&self) -> Self::Transport {
        self.as_ref().create()
    }
}
