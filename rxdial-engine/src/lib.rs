pub mod collaborators;
pub mod display;
pub mod error;
pub mod filters;
pub mod freqlist;
pub mod mailbox;
pub mod plan;
pub mod policy;
pub mod radio;
pub mod sim;
mod sinks;
pub mod topology;

use anyhow::Result;
use flume::{Receiver, Sender};
use log::{debug, warn};
use rxdial_messages::{Command, EngineState, Event, Hertz, ReceiverSettings, TunerState};

pub use collaborators::{FilterDesigner, FlowGraph, FrontEnd};
pub use error::EngineError;
pub use mailbox::SpectrumMailbox;
pub use radio::Radio;

use sim::{RustradioDesigner, RustradioFlowGraph, SimulatedFrontEnd};

/// The receiver backend.
/// Owns the radio session and processes commands from the front end.
pub struct Engine<F, D, G> {
    cmd_rx: Receiver<Command>,
    event_tx: Sender<Event>,
    radio: Radio<F, D, G>,
    tuner: TunerState,
    settings: ReceiverSettings,
    last_status: Option<String>,
    should_exit: bool,
}

impl Engine<SimulatedFrontEnd, RustradioDesigner, RustradioFlowGraph> {
    /// An engine on the simulated front end whose spectrum goes to `mailbox`.
    pub fn simulated(
        cmd_rx: Receiver<Command>,
        event_tx: Sender<Event>,
        front_end: SimulatedFrontEnd,
        mailbox: SpectrumMailbox,
    ) -> Self {
        let radio = Radio::new(front_end, RustradioDesigner, RustradioFlowGraph::new(mailbox));
        Self::new(cmd_rx, event_tx, radio)
    }
}

impl<F: FrontEnd, D: FilterDesigner, G: FlowGraph> Engine<F, D, G> {
    pub fn new(cmd_rx: Receiver<Command>, event_tx: Sender<Event>, radio: Radio<F, D, G>) -> Self {
        debug!("Constructing a new engine");
        Self {
            cmd_rx,
            event_tx,
            radio,
            tuner: TunerState::default(),
            settings: ReceiverSettings::default(),
            last_status: None,
            should_exit: false,
        }
    }

    /// Run the engine (blocking) until `Shutdown` or until every sender is gone.
    pub fn run(mut self) -> Result<()> {
        if let Err(err) = self.radio.probe_device() {
            debug!("Initial probe: {err}");
        }
        self.publish_state();

        while !self.should_exit {
            match self.cmd_rx.recv() {
                Ok(cmd) => {
                    debug!("Engine received command: {cmd:?}");
                    self.handle(cmd);
                    self.publish_state();
                }
                Err(flume::RecvError::Disconnected) => break,
            }
        }

        self.radio.stop();
        debug!("Engine stopped");
        Ok(())
    }

    fn handle(&mut self, cmd: Command) {
        let result = match cmd {
            Command::Start { tuner, settings } => {
                let result = self.radio.start(&tuner, &settings).map(|_| ());
                self.adopt(result.is_ok(), tuner, settings);
                result
            }
            Command::Reconfigure { tuner, settings } => {
                let result = self.radio.reconfigure(&tuner, &settings).map(|_| ());
                self.adopt(result.is_ok(), tuner, settings);
                result
            }
            Command::Retune(tuner) => self.radio.retune(&tuner).map(|_| {
                self.tuner = tuner;
            }),
            Command::SetGain { stage, value } => self.radio.set_gain(&stage, value).map(|applied| {
                self.settings.gains.insert(stage, applied);
            }),
            Command::SetAntenna(name) => self.radio.set_antenna(&name).map(|()| {
                self.settings.antenna = Some(name);
            }),
            Command::SetBandwidth(bandwidth) => self.radio.set_bandwidth(bandwidth).map(|()| {
                self.settings.rf_bandwidth = Some(bandwidth);
            }),
            Command::SetAgc(mode) => self.radio.set_agc(mode).map(|()| {
                self.settings.agc_mode = mode;
            }),
            Command::SetDcOffset(enabled) => self.radio.set_dc_offset_correction(enabled).map(|()| {
                self.settings.dc_offset_correction = enabled;
            }),
            Command::SetIqBalance(enabled) => self.radio.set_iq_balance_correction(enabled).map(|()| {
                self.settings.iq_balance_correction = enabled;
            }),
            Command::SetAfGain(af_gain) => {
                self.settings.af_gain = af_gain;
                self.radio.set_af_gain(af_gain)
            }
            Command::SetSquelch(db) => {
                self.settings.squelch_level = db;
                self.radio.set_squelch(db)
            }
            Command::Stop => {
                self.radio.stop();
                Ok(())
            }
            Command::Shutdown => {
                self.should_exit = true;
                Ok(())
            }
        };

        if let Err(err) = result {
            warn!("{}: {}", err.title(), err);
            self.emit(Event::Error {
                title: err.title().to_string(),
                message: err.to_string(),
            });
        }
    }

    /// A refused change that left the previous plan running is not adopted.
    fn adopt(&mut self, succeeded: bool, tuner: TunerState, settings: ReceiverSettings) {
        if succeeded || self.radio.active_plan().is_none() {
            self.tuner = tuner;
            self.settings = settings;
        }
    }

    fn publish_state(&mut self) {
        let status = self.radio.status_line(&self.tuner, &self.settings);
        let center_frequency = self
            .radio
            .active_plan()
            .map_or(Hertz(0), |plan| plan.tuning.hardware_center_frequency);

        self.emit(Event::StateSnapshot(EngineState {
            center_frequency,
            sample_rate: self.tuner.sample_rate,
            fft_size: self.settings.fft_size,
            mode: self.tuner.mode,
            session: self.radio.session().clone(),
            status: status.clone(),
        }));
        if self.last_status.as_ref() != Some(&status) {
            self.emit(Event::Status(status.clone()));
            self.last_status = Some(status);
        }
    }

    fn emit(&mut self, event: Event) {
        if self.event_tx.send(event).is_err() {
            debug!("Event receiver gone, shutting down");
            self.should_exit = true;
        }
    }
}
