use resumable_core::ResumableEngine;

/// Shared handler state: the engine, cheap to clone
#[derive(Clone)]
pub struct ResumableState {
    pub engine: ResumableEngine,
}

impl ResumableState {
    pub fn new(engine: ResumableEngine) -> Self {
        Self { engine }
    }
}
