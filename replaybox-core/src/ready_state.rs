//! Lifecycle stages of a request exchange.

use serde::{Deserialize, Serialize};

/// The only status code treated as success.
pub const STATUS_OK: u16 = 200;

/// Status reported when the transport failed before producing a response.
pub const STATUS_TRANSPORT_ERROR: u16 = 0;

/// Lifecycle stage of a request.
///
/// Numeric values follow the classic XHR ready states; [`ReadyState::Done`]
/// (4) is the only stage with semantic meaning for caching.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ReadyState {
    /// Created but not opened.
    #[default]
    Unsent = 0,
    /// Opened, not yet sent.
    Opened = 1,
    /// Response headers received.
    HeadersReceived = 2,
    /// Response body is being received.
    Loading = 3,
    /// Exchange is complete; status and body are final.
    Done = 4,
}

impl ReadyState {
    /// Returns `true` for the terminal stage.
    pub fn is_done(self) -> bool {
        self == ReadyState::Done
    }

    /// Numeric stage value.
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl From<ReadyState> for u8 {
    fn from(state: ReadyState) -> Self {
        state.as_u8()
    }
}

/// Observation delivered to a ready-state handler.
///
/// `status` and `response_text` are only meaningful once `ready_state` is
/// [`ReadyState::Done`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReadyStateChange {
    /// Current lifecycle stage.
    pub ready_state: ReadyState,
    /// Result code.
    pub status: u16,
    /// Response body.
    pub response_text: Option<String>,
}

impl ReadyStateChange {
    /// A non-terminal stage observation.
    pub fn stage(ready_state: ReadyState) -> Self {
        Self {
            ready_state,
            ..Default::default()
        }
    }

    /// A terminal observation with a final status and body.
    pub fn done(status: u16, response_text: impl Into<String>) -> Self {
        Self {
            ready_state: ReadyState::Done,
            status,
            response_text: Some(response_text.into()),
        }
    }

    /// A terminal observation for an exchange that never produced a response.
    pub fn failed() -> Self {
        Self {
            ready_state: ReadyState::Done,
            status: STATUS_TRANSPORT_ERROR,
            response_text: None,
        }
    }

    /// Terminal with a success status.
    pub fn is_success(&self) -> bool {
        self.ready_state.is_done() && self.status == STATUS_OK
    }
}
