//! Tuning arithmetic.
//!
//! Everything here is a pure function of a [`TunerState`]. The session
//! controller re-derives a [`DerivedTuning`] on every change that affects the
//! graph instead of caching intermediate values.

use rxdial_messages::{Hertz, Mode, TunerState};

use crate::error::{EngineError, Result};
use crate::filters::{FilterSpec, select_filter_bandwidth};

/// Integer resampling factors, reduced to lowest terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResampleRatio {
    pub decimation: u64,
    pub interpolation: u64,
}

/// Greatest common divisor (Euclid).
pub fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

/// Reduce `input / output` to lowest terms.
pub fn compute_resample_ratio(input_rate: Hertz, output_rate: Hertz) -> Result<ResampleRatio> {
    if input_rate.0 == 0 || output_rate.0 == 0 {
        return Err(EngineError::Domain(format!(
            "cannot resample from {input_rate} to {output_rate}"
        )));
    }
    let divisor = gcd(input_rate.0, output_rate.0);
    Ok(ResampleRatio {
        decimation: input_rate.0 / divisor,
        interpolation: output_rate.0 / divisor,
    })
}

/// Upconversion applies when enabled and the base frequency is at or below the threshold.
pub fn upconvert_active(state: &TunerState) -> bool {
    state.upconvert_enabled && state.base_frequency <= state.upconvert_threshold
}

fn upconvert_component(state: &TunerState) -> u64 {
    if upconvert_active(state) {
        state.upconvert_lo_frequency.0
    } else {
        0
    }
}

/// Tone offset for the CW modes: half the CW pitch, signed by sideband.
pub fn cw_offset(state: &TunerState) -> f64 {
    let half = state.cw_base.0 as f64 / 2.0;
    match state.mode {
        Mode::CwUsb => half,
        Mode::CwLsb => -half,
        _ => 0.0,
    }
}

/// Limit a mixer offset to the Nyquist range of the audio-rate signal, keeping its sign.
pub fn clamp_offset(requested_offset: f64, audio_rate: Hertz) -> f64 {
    let limit = audio_rate.0 as f64 / 2.0;
    let magnitude = requested_offset.abs().min(limit);
    magnitude.copysign(requested_offset)
}

pub fn compute_mixer_offset(state: &TunerState) -> f64 {
    if !state.offset_enabled {
        return 0.0;
    }
    clamp_offset(state.offset_frequency, state.audio_rate)
}

/// Frequency the front end must be tuned to.
///
/// Truncated toward zero like the tuner drivers expect and saturated at 0 Hz.
pub fn compute_hardware_frequency(state: &TunerState) -> Hertz {
    let mixer_component = compute_mixer_offset(state) - cw_offset(state);
    let hz = state.base_frequency.0 as f64 + upconvert_component(state) as f64 + mixer_component;
    Hertz(hz.trunc().max(0.0) as u64)
}

/// The upconverter has its own crystal, so it gets its own correction.
pub fn select_correction_ppm(state: &TunerState) -> f64 {
    if upconvert_active(state) {
        state.correction_ppm_upconvert
    } else {
        state.correction_ppm
    }
}

/// Shift applied by the digital down-converter so the wanted signal lands at baseband.
pub fn xlating_center_frequency(state: &TunerState) -> f64 {
    -(compute_mixer_offset(state) + cw_offset(state))
}

/// Values derived from a [`TunerState`] to drive the DSP graph.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedTuning {
    pub hardware_center_frequency: Hertz,
    pub frequency_correction_ppm: f64,
    pub upconvert_active: bool,
    pub mixer_offset_frequency: f64,
    pub cw_offset: f64,
    pub xlating_center_frequency: f64,
    pub filter: FilterSpec,
    /// Hardware rate to audio rate.
    pub narrow_ratio: ResampleRatio,
    /// Hardware rate to the wide FM intermediate rate.
    pub wide_ratio: ResampleRatio,
    /// Intermediate rate to audio rate, after the wide FM demodulator.
    pub wfm_audio_ratio: ResampleRatio,
}

impl DerivedTuning {
    pub fn derive(state: &TunerState) -> Result<Self> {
        Ok(Self {
            hardware_center_frequency: compute_hardware_frequency(state),
            frequency_correction_ppm: select_correction_ppm(state),
            upconvert_active: upconvert_active(state),
            mixer_offset_frequency: compute_mixer_offset(state),
            cw_offset: cw_offset(state),
            xlating_center_frequency: xlating_center_frequency(state),
            filter: select_filter_bandwidth(state.mode, state.bandwidth_mode, state.cw_base),
            narrow_ratio: compute_resample_ratio(state.sample_rate, state.audio_rate)?,
            wide_ratio: compute_resample_ratio(state.sample_rate, state.if_sample_rate)?,
            wfm_audio_ratio: compute_resample_ratio(state.if_sample_rate, state.audio_rate)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rxdial_messages::BandwidthMode;

    fn state() -> TunerState {
        TunerState::default()
    }

    #[test]
    fn test_resample_ratio_reduces_by_gcd() {
        assert_eq!(
            compute_resample_ratio(Hertz(2_400_000), Hertz(48_000)).unwrap(),
            ResampleRatio { decimation: 50, interpolation: 1 }
        );
        assert_eq!(gcd(2_048_000, 48_000), 16_000);
        assert_eq!(
            compute_resample_ratio(Hertz(2_048_000), Hertz(48_000)).unwrap(),
            ResampleRatio { decimation: 128, interpolation: 3 }
        );
    }

    #[test]
    fn test_resample_ratio_rejects_zero_rates() {
        assert!(matches!(
            compute_resample_ratio(Hertz(2_400_000), Hertz(0)),
            Err(EngineError::Domain(_))
        ));
        assert!(matches!(
            compute_resample_ratio(Hertz(0), Hertz(48_000)),
            Err(EngineError::Domain(_))
        ));
    }

    #[test]
    fn test_clamp_offset_properties() {
        for rate in [1_000u64, 8_000, 44_100, 48_000, 192_000] {
            let half = rate as f64 / 2.0;
            for x in [-1e6, -30_000.0, -24_000.0, -10_000.0, -0.5, 0.5, 1.0, 999.0, 23_999.0, 5e5] {
                let clamped = clamp_offset(x, Hertz(rate));
                assert!(clamped.abs() <= half, "{x} at {rate}");
                assert_eq!(clamped.signum(), x.signum(), "{x} at {rate}");
                if x.abs() <= half {
                    assert_eq!(clamped, x);
                }
            }
        }
        assert_eq!(clamp_offset(-30_000.0, Hertz(48_000)), -24_000.0);
    }

    #[test]
    fn test_mixer_offset_is_zero_when_disabled() {
        let mut s = state();
        s.offset_frequency = 5_000.0;
        assert_eq!(compute_mixer_offset(&s), 0.0);
        s.offset_enabled = true;
        assert_eq!(compute_mixer_offset(&s), 5_000.0);
        s.audio_rate = Hertz(8_000);
        assert_eq!(compute_mixer_offset(&s), 4_000.0);
    }

    #[test]
    fn test_upconvert_toggles_at_threshold_inclusive() {
        let mut s = state();
        s.upconvert_enabled = true;
        s.upconvert_threshold = Hertz::mhz(24);
        s.upconvert_lo_frequency = Hertz::mhz(125);

        s.base_frequency = Hertz::mhz(24);
        assert_eq!(compute_hardware_frequency(&s), Hertz::mhz(149));

        s.base_frequency = Hertz(24_000_001);
        assert_eq!(compute_hardware_frequency(&s), Hertz(24_000_001));

        s.upconvert_enabled = false;
        s.base_frequency = Hertz::mhz(24);
        assert_eq!(compute_hardware_frequency(&s), Hertz::mhz(24));
    }

    #[test]
    fn test_upconvert_scenario_uses_upconverter_correction() {
        let mut s = state();
        s.base_frequency = Hertz::mhz(5);
        s.upconvert_enabled = true;
        s.upconvert_threshold = Hertz::mhz(24);
        s.upconvert_lo_frequency = Hertz::mhz(125);
        s.correction_ppm = 1.5;
        s.correction_ppm_upconvert = -7.25;

        assert!(upconvert_active(&s));
        assert_eq!(compute_hardware_frequency(&s), Hertz(130_000_000));
        assert_eq!(select_correction_ppm(&s), -7.25);

        s.base_frequency = Hertz::mhz(50);
        assert_eq!(select_correction_ppm(&s), 1.5);
    }

    #[test]
    fn test_am_medium_scenario() {
        let s = TunerState {
            base_frequency: Hertz::mhz(10),
            mode: Mode::Am,
            upconvert_enabled: false,
            offset_enabled: false,
            bandwidth_mode: BandwidthMode::Medium,
            ..state()
        };
        let derived = DerivedTuning::derive(&s).unwrap();
        assert_eq!(derived.hardware_center_frequency, Hertz(10_000_000));
        assert_eq!(derived.filter.high_cut, 3000.0);
        assert_eq!(derived.filter.transition_width, 500.0);
        assert_eq!(derived.xlating_center_frequency, 0.0);
    }

    #[test]
    fn test_cw_offset_moves_hardware_and_mixer() {
        let mut s = state();
        s.cw_base = Hertz(800);
        s.offset_enabled = true;
        s.offset_frequency = 1_000.0;

        s.mode = Mode::CwUsb;
        assert_eq!(compute_hardware_frequency(&s), Hertz(10_000_600));
        assert_eq!(xlating_center_frequency(&s), -1_400.0);

        s.mode = Mode::CwLsb;
        assert_eq!(compute_hardware_frequency(&s), Hertz(10_001_400));
        assert_eq!(xlating_center_frequency(&s), -600.0);
    }

    #[test]
    fn test_hardware_frequency_saturates_at_zero() {
        let mut s = state();
        s.base_frequency = Hertz(100);
        s.offset_enabled = true;
        s.offset_frequency = -10_000.0;
        assert_eq!(compute_hardware_frequency(&s), Hertz(0));
    }

    #[test]
    fn test_derive_rejects_zero_audio_rate() {
        let mut s = state();
        s.audio_rate = Hertz(0);
        assert!(matches!(DerivedTuning::derive(&s), Err(EngineError::Domain(_))));
    }

    #[test]
    fn test_derive_is_deterministic() {
        let mut s = state();
        s.mode = Mode::Wfm;
        s.sample_rate = Hertz(2_048_000);
        let a = DerivedTuning::derive(&s).unwrap();
        let b = DerivedTuning::derive(&s).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.wide_ratio, ResampleRatio { decimation: 128, interpolation: 15 });
        assert_eq!(a.wfm_audio_ratio, ResampleRatio { decimation: 5, interpolation: 1 });
    }
}
