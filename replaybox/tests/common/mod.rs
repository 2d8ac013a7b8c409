#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use replaybox::{ReadyStateChange, Transport};

/// Everything a ready-state handler was called with.
#[derive(Clone, Default)]
pub struct Observations(Arc<Mutex<Vec<ReadyStateChange>>>);

impl Observations {
    pub fn all(&self) -> Vec<ReadyStateChange> {
        self.0.lock().unwrap().clone()
    }

    pub fn terminal(&self) -> Vec<ReadyStateChange> {
        self.all()
            .into_iter()
            .filter(|change| change.ready_state.is_done())
            .collect()
    }

    pub fn count(&self) -> usize {
        self.0.lock().unwrap().len()
    }
}

/// Registers a recording handler on `transport`.
pub fn observe<T: Transport>(transport: &mut T) -> Observations {
    let observations = Observations::default();
    let sink = observations.0.clone();
    transport.on_ready_state_change(Box::new(move |change| {
        sink.lock().unwrap().push(change.clone());
    }));
    observations
}
