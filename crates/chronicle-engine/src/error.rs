// Engine errors

use chronicle_core::event::EventError;
use chronicle_core::projections::SessionStateError;
use chronicle_core::StreamNameError;
use chronicle_store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The loop hit its iteration cap without reaching a terminal event. A
    /// `SessionCompleted{timeout}` has already been appended when this is
    /// raised.
    #[error("processing exceeded the maximum of {0} iterations")]
    MaxIterationsExceeded(u32),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    StreamName(#[from] StreamNameError),

    #[error(transparent)]
    Event(#[from] EventError),

    #[error(transparent)]
    SessionState(#[from] SessionStateError),

    #[error("session error: {0}")]
    Session(String),
}

impl EngineError {
    pub fn session(message: impl Into<String>) -> Self {
        Self::Session(message.into())
    }
}
