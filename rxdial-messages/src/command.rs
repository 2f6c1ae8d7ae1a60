use crate::{AgcMode, Hertz, ReceiverSettings, TunerState};

/// Commands sent from the controlling front end to the engine.
#[derive(Debug, Clone)]
pub enum Command {
    /// Probe the device, build the graph for this state and start receiving.
    Start {
        tuner: TunerState,
        settings: ReceiverSettings,
    },
    /// Tear down and rebuild the graph after a mode, rate, bandwidth or offset change.
    Reconfigure {
        tuner: TunerState,
        settings: ReceiverSettings,
    },
    /// Frequency-only change; the graph topology is kept.
    Retune(TunerState),
    SetGain { stage: String, value: f64 },
    SetAntenna(String),
    SetBandwidth(Hertz),
    SetAgc(AgcMode),
    SetDcOffset(bool),
    SetIqBalance(bool),
    /// Audio gain control position, 0..=1.
    SetAfGain(f32),
    /// Squelch threshold in dB.
    SetSquelch(f32),
    /// Stop receiving. The engine keeps running and accepts a new `Start`.
    Stop,
    /// Stop receiving and terminate the engine loop.
    Shutdown,
}
