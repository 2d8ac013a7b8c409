//! Dispatch bookkeeping shared between a proxy and its network relay.

use std::sync::{Mutex, MutexGuard, PoisonError};

use replaybox_core::{ReadyState, ReadyStateChange, ReadyStateHandler};
use tracing::trace;

use crate::metrics;

/// Progress of a single `send` on a [`RequestProxy`](super::RequestProxy).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DispatchState {
    /// Nothing has been sent since the proxy was opened.
    #[default]
    NotStarted,
    /// Answered from the cache; no network call will follow.
    CacheServed,
    /// A real transport is in flight.
    NetworkPending {
        /// The caller was already answered from the cache, so the network
        /// completion is withheld from the handler.
        served_from_cache: bool,
    },
    /// The network exchange reached its terminal stage.
    Done,
}

#[derive(Debug, Default)]
struct ProxyState {
    current: ReadyStateChange,
    dispatch: DispatchState,
    generation: u64,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Observable proxy state plus the caller's handler.
///
/// Every `send` starts a new generation. Observations tagged with an older
/// generation come from a refresh the proxy has since moved past and are
/// dropped.
#[derive(Default)]
pub(crate) struct Shared {
    state: Mutex<ProxyState>,
    handler: Mutex<Option<ReadyStateHandler>>,
}

impl Shared {
    pub(crate) fn snapshot(&self) -> ReadyStateChange {
        lock(&self.state).current.clone()
    }

    pub(crate) fn dispatch(&self) -> DispatchState {
        lock(&self.state).dispatch
    }

    pub(crate) fn set_handler(&self, handler: ReadyStateHandler) {
        *lock(&self.handler) = Some(handler);
    }

    pub(crate) fn opened(&self) {
        let mut state = lock(&self.state);
        state.generation += 1;
        state.current = ReadyStateChange::stage(ReadyState::Opened);
        state.dispatch = DispatchState::NotStarted;
    }

    /// Starts a new dispatch and returns its generation.
    pub(crate) fn begin(&self) -> u64 {
        let mut state = lock(&self.state);
        state.generation += 1;
        state.dispatch = DispatchState::NotStarted;
        state.generation
    }

    /// Publishes a cached response and notifies the handler.
    pub(crate) fn serve(&self, generation: u64, change: ReadyStateChange) {
        {
            let mut state = lock(&self.state);
            if state.generation != generation {
                return;
            }
            state.current = change.clone();
            state.dispatch = DispatchState::CacheServed;
        }
        self.notify(&change);
    }

    pub(crate) fn network_pending(&self, generation: u64, served_from_cache: bool) {
        let mut state = lock(&self.state);
        if state.generation == generation {
            state.dispatch = DispatchState::NetworkPending { served_from_cache };
        }
    }

    /// Marks a dispatch finished without a network observation.
    pub(crate) fn settle(&self, generation: u64) {
        let mut state = lock(&self.state);
        if state.generation == generation {
            state.dispatch = DispatchState::Done;
        }
    }

    pub(crate) fn is_pending(&self, generation: u64) -> bool {
        let state = lock(&self.state);
        state.generation == generation
            && matches!(state.dispatch, DispatchState::NetworkPending { .. })
    }

    /// Mirrors a network observation into the proxy.
    ///
    /// The stage is always copied; status and body only at the terminal
    /// stage. The handler sees the observation unless the cache already
    /// answered this dispatch.
    pub(crate) fn mirror(&self, generation: u64, change: &ReadyStateChange) {
        let forward = {
            let mut state = lock(&self.state);
            if state.generation != generation {
                trace!(generation, current = state.generation, "dropping stale observation");
                return;
            }

            state.current.ready_state = change.ready_state;
            if change.ready_state.is_done() {
                state.current.status = change.status;
                state.current.response_text = change.response_text.clone();
            }

            let forward = match state.dispatch {
                DispatchState::NetworkPending { served_from_cache } => !served_from_cache,
                _ => false,
            };

            if change.ready_state.is_done() {
                if state.dispatch == (DispatchState::NetworkPending { served_from_cache: true }) {
                    metrics::record_suppressed();
                }
                state.dispatch = DispatchState::Done;
            }

            forward.then(|| state.current.clone())
        };

        if let Some(observation) = forward {
            self.notify(&observation);
        }
    }

    fn notify(&self, change: &ReadyStateChange) {
        // The handler runs unlocked so it may re-register itself.
        let taken = lock(&self.handler).take();
        if let Some(mut handler) = taken {
            handler(change);
            let mut slot = lock(&self.handler);
            if slot.is_none() {
                *slot = Some(handler);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn recording(shared: &Shared) -> Arc<Mutex<Vec<ReadyStateChange>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        shared.set_handler(Box::new(move |change| {
            sink.lock().unwrap().push(change.clone());
        }));
        seen
    }

    #[test]
    fn network_completion_after_cache_is_suppressed() {
        let shared = Shared::default();
        let seen = recording(&shared);

        let generation = shared.begin();
        shared.serve(generation, ReadyStateChange::done(200, "cached"));
        shared.network_pending(generation, true);
        shared.mirror(generation, &ReadyStateChange::stage(ReadyState::Loading));
        shared.mirror(generation, &ReadyStateChange::done(200, "fresh"));

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].response_text.as_deref(), Some("cached"));
        assert_eq!(shared.snapshot().response_text.as_deref(), Some("fresh"));
        assert_eq!(shared.dispatch(), DispatchState::Done);
    }

    #[test]
    fn intermediate_stages_keep_previous_status() {
        let shared = Shared::default();
        let seen = recording(&shared);

        let generation = shared.begin();
        shared.network_pending(generation, false);
        shared.mirror(
            generation,
            &ReadyStateChange {
                ready_state: ReadyState::HeadersReceived,
                status: 200,
                response_text: Some("partial".into()),
            },
        );

        let current = shared.snapshot();
        assert_eq!(current.ready_state, ReadyState::HeadersReceived);
        assert_eq!(current.status, 0);
        assert_eq!(current.response_text, None);
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn stale_generation_is_ignored() {
        let shared = Shared::default();
        let seen = recording(&shared);

        let stale = shared.begin();
        shared.network_pending(stale, true);
        let fresh = shared.begin();
        shared.network_pending(fresh, false);

        shared.mirror(stale, &ReadyStateChange::done(500, "old"));
        assert!(seen.lock().unwrap().is_empty());
        assert!(shared.is_pending(fresh));

        shared.mirror(fresh, &ReadyStateChange::done(200, "new"));
        assert_eq!(seen.lock().unwrap().len(), 1);
        assert_eq!(shared.snapshot().status, 200);
    }
}
