use crate::EngineState;

/// Events sent from the engine to the front end.
///
/// Spectrum frames do not travel here; they go through the engine's
/// spectrum mailbox so a slow consumer only ever sees the newest frame.
#[derive(Debug, Clone)]
pub enum Event {
    /// Snapshot sent after every state-changing command.
    StateSnapshot(EngineState),
    /// Status line for display.
    Status(String),
    /// A failure the operator needs to see.
    Error { title: String, message: String },
}
