use thiserror::Error;

/// Failures surfaced by the receive session.
///
/// None of these are retried by the engine; recovery is always an explicit
/// operator action (start again, reconfigure again).
#[derive(Debug, Error)]
pub enum EngineError {
    /// Invalid arithmetic input, e.g. a zero sample rate.
    #[error("invalid tuning parameters: {0}")]
    Domain(String),

    #[error("no radio device detected")]
    DeviceNotFound,

    #[error("could not open audio output {device}: {reason}")]
    AudioSink { device: String, reason: String },

    #[error("receiver is not started")]
    NotStarted,

    #[error("front end failure: {0}")]
    FrontEnd(#[source] anyhow::Error),

    #[error("filter design failure: {0}")]
    FilterDesign(#[source] anyhow::Error),

    #[error("flow graph failure: {0}")]
    Graph(#[source] anyhow::Error),
}

impl EngineError {
    /// Dialog title for the operator.
    pub fn title(&self) -> &'static str {
        match self {
            Self::Domain(_) => "Configuration Error",
            Self::DeviceNotFound => "No Device",
            Self::AudioSink { .. } => "Audio Error",
            Self::NotStarted => "Not Running",
            Self::FrontEnd(_) => "Device Error",
            Self::FilterDesign(_) | Self::Graph(_) => "Pipeline Error",
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
