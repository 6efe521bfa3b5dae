use std::sync::{Arc, Mutex};

use milestone_engine::engine::{EngineEvent, EngineHandler};
use milestone_engine::types::Status;

/// An [`EngineHandler`] that keeps every event it receives.
///
/// Clones share the same log, so a test can hand one clone to the engine
/// and inspect another.
#[derive(Debug, Clone, Default)]
pub struct RecordingHandler {
    events: Arc<Mutex<Vec<EngineEvent>>>,
}

impl RecordingHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<EngineEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }

    /// `(milestone_id, from, to)` for every milestone transition, in order.
    pub fn milestone_transitions(&self) -> Vec<(String, Status, Status)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                EngineEvent::MilestoneTransitioned {
                    milestone_id,
                    from,
                    to,
                    ..
                } => Some((milestone_id, from, to)),
                _ => None,
            })
            .collect()
    }
}

impl EngineHandler for RecordingHandler {
    fn handle(&self, event: &EngineEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}
