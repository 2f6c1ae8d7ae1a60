//! Boundaries to the radio hardware, filter design and the streaming graph.

use anyhow::Result;
use rxdial_messages::{AgcMode, Hertz};
use thiserror::Error;

use crate::filters::FilterRequest;
use crate::plan::Plan;

/// A named gain stage and the range the device accepts for it.
#[derive(Debug, Clone, PartialEq)]
pub struct GainStage {
    pub name: String,
    pub min: f64,
    pub max: f64,
}

impl GainStage {
    /// Never panics, even on a range the device got wrong.
    pub fn clamp(&self, value: f64) -> f64 {
        value.max(self.min).min(self.max)
    }
}

/// Parameters handed to both the software AGC blocks and the front end.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AgcParams {
    /// Hardware AGC on the tuner.
    pub hardware: bool,
    pub attack_rate: f32,
    pub decay_rate: f32,
    pub reference: f32,
    pub gain: f32,
    pub max_gain: f32,
}

impl AgcParams {
    pub fn for_mode(mode: AgcMode) -> Self {
        let mut params = Self {
            hardware: false,
            attack_rate: 1e-1,
            decay_rate: 1e-1,
            reference: 1.0,
            gain: 1.0,
            max_gain: 1.0,
        };
        match mode {
            AgcMode::Fast => params.max_gain = 65_536.0,
            AgcMode::Slow => {
                params.decay_rate = 1e-2;
                params.max_gain = 65_536.0;
            }
            AgcMode::Hardware => params.hardware = true,
            AgcMode::Off => {}
        }
        params
    }
}

/// The radio front end (tuner hardware driver).
pub trait FrontEnd {
    fn tune(&mut self, frequency: Hertz, correction_ppm: f64) -> Result<()>;
    fn set_bandwidth(&mut self, bandwidth: Hertz) -> Result<()>;
    fn set_sample_rate(&mut self, rate: Hertz) -> Result<()>;
    fn set_gain(&mut self, stage: &str, value: f64) -> Result<()>;
    fn set_antenna(&mut self, name: &str) -> Result<()>;
    fn set_agc(&mut self, params: &AgcParams) -> Result<()>;
    fn set_dc_offset_correction(&mut self, enabled: bool) -> Result<()>;
    fn set_iq_balance_correction(&mut self, enabled: bool) -> Result<()>;

    /// Empty when no device answered.
    fn available_gain_stages(&self) -> Vec<GainStage>;
    fn available_antennas(&self) -> Vec<String>;
    fn available_sample_rates(&self) -> Vec<Hertz>;
    fn available_bandwidths(&self) -> Vec<Hertz>;
}

/// Produces FIR taps for a filter request.
pub trait FilterDesigner {
    fn design(&self, request: &FilterRequest) -> Result<Vec<f32>>;
}

#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("audio sink {device}: {reason}")]
    AudioSink { device: String, reason: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// The streaming DSP graph.
///
/// `connect` receives the complete plan and must be idempotent: connecting
/// the same plan twice leaves the graph as after the first call.
pub trait FlowGraph {
    fn connect(&mut self, plan: &Plan) -> std::result::Result<(), ConnectError>;
    fn disconnect_all(&mut self);
    fn is_connected(&self) -> bool;
    fn set_mixer_offset(&mut self, hz: f64) -> Result<()>;
    fn set_volume(&mut self, k: f32) -> Result<()>;
    fn set_squelch(&mut self, db: f32) -> Result<()>;
    fn set_agc(&mut self, params: &AgcParams) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agc_params_by_mode() {
        let fast = AgcParams::for_mode(AgcMode::Fast);
        assert_eq!((fast.decay_rate, fast.max_gain, fast.hardware), (1e-1, 65_536.0, false));

        let slow = AgcParams::for_mode(AgcMode::Slow);
        assert_eq!((slow.decay_rate, slow.max_gain), (1e-2, 65_536.0));

        let hw = AgcParams::for_mode(AgcMode::Hardware);
        assert!(hw.hardware);
        assert_eq!(hw.max_gain, 1.0);

        let off = AgcParams::for_mode(AgcMode::Off);
        assert_eq!((off.max_gain, off.hardware), (1.0, false));
    }

    #[test]
    fn test_gain_stage_clamp() {
        let stage = GainStage { name: "LNA".into(), min: 0.0, max: 40.0 };
        assert_eq!(stage.clamp(50.0), 40.0);
        assert_eq!(stage.clamp(-3.0), 0.0);
        assert_eq!(stage.clamp(12.5), 12.5);
    }
}
