use std::thread::{self, JoinHandle};

use log::{debug, warn};
use rustradio::blocks::SignalSourceFloat;
use rustradio::graph::{CancellationToken, Graph, GraphRunner};

use crate::collaborators::{AgcParams, ConnectError, FlowGraph};
use crate::mailbox::SpectrumMailbox;
use crate::plan::Plan;
use crate::sinks::{SpectrumAnalyzer, SpectrumSink};

/// The only audio output the simulated graph can open.
pub const NULL_AUDIO_DEVICE: &str = "null";

/// Frequency of the test tone fed to the spectrum branch.
pub const SIM_TONE_HZ: f32 = 10_000.0;

struct Running {
    cancel: CancellationToken,
    handle: JoinHandle<Result<(), rustradio::Error>>,
}

/// Runs the spectrum branch of a plan as a rustradio graph.
///
/// The receive chain is not streamed; the connected plan and the live
/// control values are kept so callers can inspect them.
pub struct RustradioFlowGraph {
    mailbox: SpectrumMailbox,
    running: Option<Running>,
    plan: Option<Plan>,
    mixer_offset: f64,
    volume: f32,
    squelch_db: f32,
    agc: Option<AgcParams>,
    connects: usize,
}

fn build_graph(plan: &Plan, mailbox: SpectrumMailbox) -> Graph {
    let sample_rate = plan.sample_rate.0 as f32;
    let (source, prev) = SignalSourceFloat::new(sample_rate, SIM_TONE_HZ, 1.0);

    let analyzer = SpectrumAnalyzer::new(plan.sample_rate.0 as f64, &plan.spectrum);
    let sink = SpectrumSink::new(prev, mailbox, analyzer);

    let mut graph = Graph::new();
    graph.add(Box::new(source));
    graph.add(Box::new(sink));
    graph
}

impl RustradioFlowGraph {
    pub fn new(mailbox: SpectrumMailbox) -> Self {
        Self {
            mailbox,
            running: None,
            plan: None,
            mixer_offset: 0.0,
            volume: 0.0,
            squelch_db: 0.0,
            agc: None,
            connects: 0,
        }
    }

    pub fn mailbox(&self) -> &SpectrumMailbox {
        &self.mailbox
    }

    pub fn plan(&self) -> Option<&Plan> {
        self.plan.as_ref()
    }

    pub fn mixer_offset(&self) -> f64 {
        self.mixer_offset
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn squelch_db(&self) -> f32 {
        self.squelch_db
    }

    pub fn agc(&self) -> Option<AgcParams> {
        self.agc
    }

    /// Number of graphs actually started.
    pub fn connect_count(&self) -> usize {
        self.connects
    }
}

impl FlowGraph for RustradioFlowGraph {
    fn connect(&mut self, plan: &Plan) -> Result<(), ConnectError> {
        if plan.audio_device != NULL_AUDIO_DEVICE {
            return Err(ConnectError::AudioSink {
                device: plan.audio_device.clone(),
                reason: "no such audio output".to_string(),
            });
        }
        if self.is_connected() && self.plan.as_ref() == Some(plan) {
            return Ok(());
        }
        self.disconnect_all();

        let mut graph = build_graph(plan, self.mailbox.clone());
        let cancel = graph.cancel_token();
        let handle = thread::spawn(move || graph.run());
        debug!(
            "Spectrum graph running at {} for {} chain",
            plan.sample_rate, plan.topology.mode
        );

        self.running = Some(Running { cancel, handle });
        self.volume = plan.volume;
        self.squelch_db = plan.squelch_db;
        self.agc = Some(plan.agc);
        self.plan = Some(plan.clone());
        self.connects += 1;
        Ok(())
    }

    fn disconnect_all(&mut self) {
        self.plan = None;
        let Some(running) = self.running.take() else {
            return;
        };
        running.cancel.cancel();
        match running.handle.join() {
            Ok(Ok(())) => {}
            Ok(Err(err)) => warn!("Spectrum graph ended with error: {err}"),
            Err(_) => warn!("Spectrum graph thread panicked"),
        }
    }

    fn is_connected(&self) -> bool {
        self.running.is_some()
    }

    fn set_mixer_offset(&mut self, hz: f64) -> anyhow::Result<()> {
        self.mixer_offset = hz;
        Ok(())
    }

    fn set_volume(&mut self, k: f32) -> anyhow::Result<()> {
        self.volume = k;
        Ok(())
    }

    fn set_squelch(&mut self, db: f32) -> anyhow::Result<()> {
        self.squelch_db = db;
        Ok(())
    }

    fn set_agc(&mut self, params: &AgcParams) -> anyhow::Result<()> {
        self.agc = Some(*params);
        Ok(())
    }
}

impl Drop for RustradioFlowGraph {
    fn drop(&mut self) {
        self.disconnect_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::RustradioDesigner;
    use rxdial_messages::{Hertz, ReceiverSettings, TunerState};
    use std::time::{Duration, Instant};

    fn plan(audio_device: &str) -> Plan {
        let state = TunerState {
            sample_rate: Hertz(48_000),
            ..TunerState::default()
        };
        let settings = ReceiverSettings {
            fft_size: 256,
            audio_device: audio_device.to_string(),
            ..ReceiverSettings::default()
        };
        Plan::build(&state, &settings, &RustradioDesigner).unwrap()
    }

    #[test]
    fn test_unknown_audio_device_is_refused() {
        let mut graph = RustradioFlowGraph::new(SpectrumMailbox::new());
        let err = graph.connect(&plan("pulse")).unwrap_err();
        assert!(matches!(err, ConnectError::AudioSink { ref device, .. } if device == "pulse"));
        assert!(!graph.is_connected());
    }

    #[test]
    fn test_connect_is_idempotent_and_publishes() {
        let mut graph = RustradioFlowGraph::new(SpectrumMailbox::new());
        let plan = plan(NULL_AUDIO_DEVICE);
        graph.connect(&plan).unwrap();
        graph.connect(&plan).unwrap();
        assert_eq!(graph.connect_count(), 1);
        assert_eq!(graph.volume(), plan.volume);
        assert_eq!(graph.squelch_db(), plan.squelch_db);
        assert_eq!(graph.agc(), Some(plan.agc));

        let deadline = Instant::now() + Duration::from_secs(5);
        let frame = loop {
            if let Some(frame) = graph.mailbox().take() {
                break frame;
            }
            assert!(Instant::now() < deadline, "no spectrum frame");
            thread::sleep(Duration::from_millis(5));
        };
        assert_eq!(frame.len(), 256);

        graph.set_mixer_offset(-375.0).unwrap();
        assert_eq!(graph.mixer_offset(), -375.0);

        graph.disconnect_all();
        assert!(!graph.is_connected());
        assert!(graph.plan().is_none());
    }
}
