use rxdial_messages::{Hertz, ReceiverSettings, TunerState};

use crate::collaborators::{AgcParams, FilterDesigner};
use crate::error::{EngineError, Result};
use crate::filters::FilterRequest;
use crate::policy::{DerivedTuning, ResampleRatio};
use crate::topology::{ResamplePath, Stage, Topology, select_flowgraph_topology};

/// Hilbert transformer length for the sideband modes.
pub const HILBERT_TAPS: usize = 128;

/// Volume multiplier for an audio gain control position.
///
/// Quadratic so the control feels even across its range.
pub fn af_gain_to_volume(af_gain: f32) -> f32 {
    2.0 * af_gain * af_gain
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpectrumParams {
    pub fft_size: usize,
    pub frame_rate: u32,
    /// Averaging factor; 1.0 disables averaging.
    pub average: f32,
}

/// Everything the flow graph needs to connect one topology.
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    pub topology: Topology,
    pub tuning: DerivedTuning,
    pub filter: FilterRequest,
    pub taps: Vec<f32>,
    pub hilbert_taps: usize,
    pub sample_rate: Hertz,
    pub audio_rate: Hertz,
    pub audio_device: String,
    pub volume: f32,
    pub squelch_db: f32,
    pub agc: AgcParams,
    pub spectrum: SpectrumParams,
}

impl Plan {
    /// Derive tuning, pick the topology and design its filter.
    ///
    /// Nothing is torn down here, so a failure leaves a running graph untouched.
    pub fn build(
        state: &TunerState,
        settings: &ReceiverSettings,
        designer: &dyn FilterDesigner,
    ) -> Result<Self> {
        let tuning = DerivedTuning::derive(state)?;
        let topology = select_flowgraph_topology(state.mode);
        let filter = tuning.filter.request(state);
        let taps = designer.design(&filter).map_err(EngineError::FilterDesign)?;

        Ok(Self {
            topology,
            tuning,
            filter,
            taps,
            hilbert_taps: HILBERT_TAPS,
            sample_rate: state.sample_rate,
            audio_rate: state.audio_rate,
            audio_device: settings.audio_device.clone(),
            volume: af_gain_to_volume(settings.af_gain),
            squelch_db: settings.squelch_level,
            agc: AgcParams::for_mode(settings.agc_mode),
            spectrum: SpectrumParams {
                fft_size: settings.fft_size,
                frame_rate: settings.frame_rate,
                average: settings.fft_average,
            },
        })
    }

    /// Ratio of the resampler at the head of the receive chain.
    pub fn resample_ratio(&self) -> ResampleRatio {
        if self.topology.contains(Stage::Resample(ResamplePath::Wide)) {
            self.tuning.wide_ratio
        } else {
            self.tuning.narrow_ratio
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::FilterKind;
    use rxdial_messages::Mode;

    struct CountingDesigner;

    impl FilterDesigner for CountingDesigner {
        fn design(&self, request: &FilterRequest) -> anyhow::Result<Vec<f32>> {
            match request.kind {
                FilterKind::LowPass => Ok(vec![0.5; 3]),
                FilterKind::BandPass => anyhow::bail!("band-pass not supported"),
            }
        }
    }

    #[test]
    fn test_volume_curve() {
        assert_eq!(af_gain_to_volume(0.0), 0.0);
        assert_eq!(af_gain_to_volume(0.5), 0.5);
        assert_eq!(af_gain_to_volume(1.0), 2.0);
    }

    #[test]
    fn test_build_wfm_plan_uses_wide_ratio() {
        let state = TunerState {
            mode: Mode::Wfm,
            ..TunerState::default()
        };
        let plan = Plan::build(&state, &ReceiverSettings::default(), &CountingDesigner).unwrap();
        assert_eq!(plan.resample_ratio(), ResampleRatio { decimation: 10, interpolation: 1 });
        assert_eq!(plan.filter.sample_rate, state.if_sample_rate);
        assert_eq!(plan.taps.len(), 3);
        assert_eq!(plan.hilbert_taps, HILBERT_TAPS);
    }

    #[test]
    fn test_designer_failure_is_reported() {
        let state = TunerState {
            mode: Mode::CwUsb,
            ..TunerState::default()
        };
        let err = Plan::build(&state, &ReceiverSettings::default(), &CountingDesigner).unwrap_err();
        assert!(matches!(err, EngineError::FilterDesign(_)));
    }
}
