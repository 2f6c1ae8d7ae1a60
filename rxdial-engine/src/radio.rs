//! Receive session controller.
//!
//! `Radio` owns the three collaborators and applies [`Plan`]s to them. The
//! only multi-step operation, [`Radio::reconfigure`], is atomic from the
//! caller's point of view: it either leaves the new plan connected, leaves the
//! previous plan connected (when the new one cannot even be built), or leaves
//! the session errored with nothing connected (when the graph refuses the new
//! plan or the front end cannot be tuned to it). It never retries on its own.

use log::{debug, info, warn};
use rxdial_messages::{AgcMode, Hertz, ReceiverSettings, SessionStatus, TunerState};

use crate::collaborators::{AgcParams, ConnectError, FilterDesigner, FlowGraph, FrontEnd, GainStage};
use crate::error::{EngineError, Result};
use crate::plan::{Plan, af_gain_to_volume};
use crate::policy::DerivedTuning;

/// Offered when the device reports no bandwidths.
fn fallback_bandwidths() -> Vec<Hertz> {
    (3..9).map(|exp| Hertz(10u64.pow(exp))).collect()
}

/// Offered when the device reports no sample rates.
fn fallback_sample_rates() -> Vec<Hertz> {
    (1..24).map(Hertz::mhz).collect()
}

/// Device rates, preceded by whole-MHz rates below the slowest one.
///
/// Some devices run fine at 1 MHz but only advertise 8 MHz and up.
fn with_slow_rates(device_rates: Vec<Hertz>) -> Vec<Hertz> {
    let rates = if device_rates.is_empty() {
        fallback_sample_rates()
    } else {
        device_rates
    };
    let slowest = rates[0];
    let mut all: Vec<Hertz> = (1..10).map(Hertz::mhz).take_while(|r| *r < slowest).collect();
    all.extend(rates);
    all
}

/// Bounds are swapped when reversed; a stage with a NaN bound is dropped.
fn checked_gain_stage(mut stage: GainStage) -> Option<GainStage> {
    if stage.min.is_nan() || stage.max.is_nan() {
        warn!("Ignoring gain stage {} with range {}..{}", stage.name, stage.min, stage.max);
        return None;
    }
    if stage.min > stage.max {
        warn!("Gain stage {} reports a reversed range, swapping", stage.name);
        std::mem::swap(&mut stage.min, &mut stage.max);
    }
    Some(stage)
}

pub struct Radio<F, D, G> {
    front_end: F,
    designer: D,
    graph: G,
    device_found: bool,
    gain_stages: Vec<GainStage>,
    antennas: Vec<String>,
    sample_rates: Vec<Hertz>,
    bandwidths: Vec<Hertz>,
    session: SessionStatus,
    active: Option<Plan>,
    /// Last (frequency, correction) sent to the front end.
    last_tune: Option<(Hertz, f64)>,
    last_sample_rate: Option<Hertz>,
}

impl<F: FrontEnd, D: FilterDesigner, G: FlowGraph> Radio<F, D, G> {
    pub fn new(front_end: F, designer: D, graph: G) -> Self {
        Self {
            front_end,
            designer,
            graph,
            device_found: false,
            gain_stages: Vec::new(),
            antennas: Vec::new(),
            sample_rates: Vec::new(),
            bandwidths: Vec::new(),
            session: SessionStatus::NoDevice,
            active: None,
            last_tune: None,
            last_sample_rate: None,
        }
    }

    /// Ask the front end what it offers. No gain stages means no device.
    pub fn probe_device(&mut self) -> Result<&[GainStage]> {
        let reported = self.front_end.available_gain_stages();
        self.device_found = !reported.is_empty();
        self.gain_stages = reported.into_iter().filter_map(checked_gain_stage).collect();
        self.antennas = self.front_end.available_antennas();
        self.sample_rates = with_slow_rates(self.front_end.available_sample_rates());
        self.bandwidths = self.front_end.available_bandwidths();
        if self.bandwidths.is_empty() {
            self.bandwidths = fallback_bandwidths();
        }

        if !self.device_found {
            warn!("Front end reports no gain stages, start disabled");
            self.session = SessionStatus::NoDevice;
            return Err(EngineError::DeviceNotFound);
        }
        if self.session == SessionStatus::NoDevice {
            self.session = SessionStatus::Stopped;
        }
        debug!(
            "Device probed: {} gain stages, {} antennas",
            self.gain_stages.len(),
            self.antennas.len()
        );
        Ok(&self.gain_stages)
    }

    pub fn can_start(&self) -> bool {
        self.device_found
    }

    pub fn session(&self) -> &SessionStatus {
        &self.session
    }

    pub fn active_plan(&self) -> Option<&Plan> {
        self.active.as_ref()
    }

    pub fn gain_stages(&self) -> &[GainStage] {
        &self.gain_stages
    }

    pub fn antennas(&self) -> &[String] {
        &self.antennas
    }

    pub fn sample_rates(&self) -> &[Hertz] {
        &self.sample_rates
    }

    pub fn bandwidths(&self) -> &[Hertz] {
        &self.bandwidths
    }

    pub fn front_end(&self) -> &F {
        &self.front_end
    }

    pub fn graph(&self) -> &G {
        &self.graph
    }

    /// Probe, push the persisted device controls and connect the first plan.
    pub fn start(&mut self, state: &TunerState, settings: &ReceiverSettings) -> Result<&Plan> {
        self.probe_device()?;
        self.apply_device_settings(settings)?;
        self.reconfigure(state, settings)
    }

    fn apply_device_settings(&mut self, settings: &ReceiverSettings) -> Result<()> {
        let gains: Vec<(String, f64)> = self
            .gain_stages
            .iter()
            .map(|stage| (stage.name.clone(), stage.clamp(settings.gain_for(&stage.name))))
            .collect();
        for (name, value) in gains {
            self.front_end.set_gain(&name, value).map_err(EngineError::FrontEnd)?;
        }

        let antenna = settings
            .antenna
            .as_ref()
            .filter(|wanted| self.antennas.contains(wanted))
            .or_else(|| self.antennas.first())
            .cloned();
        if let Some(antenna) = antenna {
            self.front_end.set_antenna(&antenna).map_err(EngineError::FrontEnd)?;
        }
        if let Some(bandwidth) = settings.rf_bandwidth {
            self.front_end.set_bandwidth(bandwidth).map_err(EngineError::FrontEnd)?;
        }
        self.front_end
            .set_agc(&AgcParams::for_mode(settings.agc_mode))
            .map_err(EngineError::FrontEnd)?;
        self.front_end
            .set_dc_offset_correction(settings.dc_offset_correction)
            .map_err(EngineError::FrontEnd)?;
        self.front_end
            .set_iq_balance_correction(settings.iq_balance_correction)
            .map_err(EngineError::FrontEnd)?;
        Ok(())
    }

    /// Rebuild the graph for a new mode, rate, bandwidth or offset setting.
    pub fn reconfigure(&mut self, state: &TunerState, settings: &ReceiverSettings) -> Result<&Plan> {
        if !self.device_found {
            return Err(EngineError::DeviceNotFound);
        }

        // Built before anything is torn down.
        let plan = Plan::build(state, settings, &self.designer)?;

        if self.last_sample_rate != Some(state.sample_rate) {
            self.front_end
                .set_sample_rate(state.sample_rate)
                .map_err(EngineError::FrontEnd)?;
            self.last_sample_rate = Some(state.sample_rate);
        }

        let unchanged = self.active.as_ref() == Some(&plan) && self.graph.is_connected();
        if !unchanged {
            info!("Connecting {} chain", plan.topology.mode);
            self.graph.disconnect_all();
            self.active = None;
            if let Err(err) = self.graph.connect(&plan) {
                let err = match err {
                    ConnectError::AudioSink { device, reason } => {
                        EngineError::AudioSink { device, reason }
                    }
                    ConnectError::Other(err) => EngineError::Graph(err),
                };
                warn!("Graph refused the {} chain: {}", plan.topology.mode, err);
                self.session = SessionStatus::Errored(err.to_string());
                return Err(err);
            }
        }

        if let Err(err) = self.apply_tuning(&plan.tuning) {
            warn!("Could not tune the {} chain: {}", plan.topology.mode, err);
            self.graph.disconnect_all();
            self.active = None;
            self.last_tune = None;
            self.session = SessionStatus::Errored(err.to_string());
            return Err(err);
        }
        self.session = SessionStatus::Running;
        Ok(&*self.active.insert(plan))
    }

    /// Frequency-only change. Returns the hardware frequency.
    ///
    /// Anything that changes the filter or the resampling needs a reconfigure.
    pub fn retune(&mut self, state: &TunerState) -> Result<Hertz> {
        let Some(plan) = self.active.as_ref() else {
            return Err(EngineError::NotStarted);
        };
        if state.mode != plan.topology.mode {
            return Err(EngineError::Domain(format!(
                "retune from {} to {} needs a reconfigure",
                plan.topology.mode, state.mode
            )));
        }
        let tuning = DerivedTuning::derive(state)?;
        let active = &plan.tuning;
        if tuning.filter != active.filter
            || tuning.narrow_ratio != active.narrow_ratio
            || tuning.wide_ratio != active.wide_ratio
            || tuning.wfm_audio_ratio != active.wfm_audio_ratio
        {
            return Err(EngineError::Domain(
                "filter or sample rates changed, reconfigure instead of retuning".to_string(),
            ));
        }
        self.apply_tuning(&tuning)?;
        let frequency = tuning.hardware_center_frequency;
        if let Some(plan) = self.active.as_mut() {
            plan.tuning = tuning;
        }
        Ok(frequency)
    }

    fn apply_tuning(&mut self, tuning: &DerivedTuning) -> Result<()> {
        self.tune_front_end(tuning)?;
        self.graph
            .set_mixer_offset(tuning.xlating_center_frequency)
            .map_err(EngineError::Graph)
    }

    /// Returns whether the front end was actually retuned.
    fn tune_front_end(&mut self, tuning: &DerivedTuning) -> Result<bool> {
        let key = (tuning.hardware_center_frequency, tuning.frequency_correction_ppm);
        if self.last_tune == Some(key) {
            return Ok(false);
        }
        debug!("Tuning front end to {} ({:+.2} ppm)", key.0, key.1);
        self.front_end.tune(key.0, key.1).map_err(EngineError::FrontEnd)?;
        self.last_tune = Some(key);
        Ok(true)
    }

    pub fn stop(&mut self) {
        self.graph.disconnect_all();
        self.active = None;
        self.last_tune = None;
        self.session = if self.device_found {
            SessionStatus::Stopped
        } else {
            SessionStatus::NoDevice
        };
    }

    fn require_device(&self) -> Result<()> {
        if self.device_found {
            Ok(())
        } else {
            Err(EngineError::DeviceNotFound)
        }
    }

    /// Returns the value actually applied after clamping to the stage range.
    pub fn set_gain(&mut self, stage: &str, value: f64) -> Result<f64> {
        self.require_device()?;
        let Some(range) = self.gain_stages.iter().find(|s| s.name == stage) else {
            return Err(EngineError::FrontEnd(anyhow::anyhow!(
                "unknown gain stage {stage}"
            )));
        };
        let value = range.clamp(value);
        self.front_end.set_gain(stage, value).map_err(EngineError::FrontEnd)?;
        Ok(value)
    }

    pub fn set_antenna(&mut self, name: &str) -> Result<()> {
        self.require_device()?;
        self.front_end.set_antenna(name).map_err(EngineError::FrontEnd)
    }

    pub fn set_bandwidth(&mut self, bandwidth: Hertz) -> Result<()> {
        self.require_device()?;
        self.front_end.set_bandwidth(bandwidth).map_err(EngineError::FrontEnd)
    }

    pub fn set_agc(&mut self, mode: AgcMode) -> Result<()> {
        self.require_device()?;
        let params = AgcParams::for_mode(mode);
        self.front_end.set_agc(&params).map_err(EngineError::FrontEnd)?;
        if let Some(plan) = self.active.as_mut() {
            self.graph.set_agc(&params).map_err(EngineError::Graph)?;
            plan.agc = params;
        }
        Ok(())
    }

    pub fn set_dc_offset_correction(&mut self, enabled: bool) -> Result<()> {
        self.require_device()?;
        self.front_end
            .set_dc_offset_correction(enabled)
            .map_err(EngineError::FrontEnd)
    }

    pub fn set_iq_balance_correction(&mut self, enabled: bool) -> Result<()> {
        self.require_device()?;
        self.front_end
            .set_iq_balance_correction(enabled)
            .map_err(EngineError::FrontEnd)
    }

    /// Volume and squelch live in the graph; without one they take effect on the next connect.
    pub fn set_af_gain(&mut self, af_gain: f32) -> Result<()> {
        let volume = af_gain_to_volume(af_gain);
        if let Some(plan) = self.active.as_mut() {
            self.graph.set_volume(volume).map_err(EngineError::Graph)?;
            plan.volume = volume;
        }
        Ok(())
    }

    pub fn set_squelch(&mut self, db: f32) -> Result<()> {
        if let Some(plan) = self.active.as_mut() {
            self.graph.set_squelch(db).map_err(EngineError::Graph)?;
            plan.squelch_db = db;
        }
        Ok(())
    }

    pub fn status_line(&self, state: &TunerState, settings: &ReceiverSettings) -> String {
        let flag = |on: bool| if on { 'Y' } else { 'N' };
        match &self.session {
            SessionStatus::NoDevice => "No radio device detected".to_string(),
            SessionStatus::Running => format!(
                "{} | {} | {:.6} MHz | Upconvert:{} | Offset:{}",
                settings.device,
                state.mode,
                state.base_frequency.as_mhz(),
                flag(state.upconvert_enabled),
                flag(state.offset_enabled),
            ),
            SessionStatus::Stopped => format!("{} | {} | Stopped", settings.device, state.mode),
            SessionStatus::Errored(_) => format!("{} | {} | Error", settings.device, state.mode),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slow_rates_are_prepended() {
        let rates = with_slow_rates(vec![Hertz::mhz(8), Hertz::mhz(10)]);
        assert_eq!(rates.first(), Some(&Hertz::mhz(1)));
        assert_eq!(rates.len(), 7 + 2);
        assert_eq!(&rates[7..], &[Hertz::mhz(8), Hertz::mhz(10)]);
    }

    #[test]
    fn test_no_slow_rates_below_one_mhz_device() {
        let rates = with_slow_rates(vec![Hertz(250_000), Hertz(2_400_000)]);
        assert_eq!(rates, vec![Hertz(250_000), Hertz(2_400_000)]);
    }

    #[test]
    fn test_fallback_lists() {
        assert_eq!(fallback_bandwidths().first(), Some(&Hertz(1_000)));
        assert_eq!(fallback_bandwidths().last(), Some(&Hertz(100_000_000)));
        assert_eq!(with_slow_rates(Vec::new()).len(), 23);
    }
}
