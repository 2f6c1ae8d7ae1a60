mod command;
mod event;
mod state;
mod units;

pub use command::Command;
pub use event::Event;
pub use state::{
    AgcMode, BandwidthMode, EngineState, IF_SAMPLE_RATE, Mode, ReceiverSettings, SessionStatus,
    TunerState,
};
pub use units::{Decibels, Hertz};
