//! IF filter selection per mode and bandwidth setting.

use rxdial_messages::{BandwidthMode, Hertz, Mode, TunerState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    LowPass,
    BandPass,
}

/// Which rate the filter runs at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDomain {
    /// The post-resampler audio rate.
    Audio,
    /// The wide FM intermediate rate.
    Intermediate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Window {
    #[default]
    Hamming,
}

/// Passband edges and transition width, in Hz.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterSpec {
    pub kind: FilterKind,
    pub low_cut: f64,
    pub high_cut: f64,
    pub transition_width: f64,
    pub rate: RateDomain,
}

impl FilterSpec {
    fn low_pass(cutoff: f64, transition_width: f64, rate: RateDomain) -> Self {
        Self {
            kind: FilterKind::LowPass,
            low_cut: 0.0,
            high_cut: cutoff,
            transition_width,
            rate,
        }
    }

    /// Resolve the rate domain against a concrete state.
    pub fn request(&self, state: &TunerState) -> FilterRequest {
        let sample_rate = match self.rate {
            RateDomain::Audio => state.audio_rate,
            RateDomain::Intermediate => state.if_sample_rate,
        };
        FilterRequest {
            kind: self.kind,
            sample_rate,
            low_cut: self.low_cut,
            high_cut: self.high_cut,
            transition_width: self.transition_width,
            window: Window::Hamming,
        }
    }
}

/// What the filter-design collaborator is asked to produce.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterRequest {
    pub kind: FilterKind,
    pub sample_rate: Hertz,
    pub low_cut: f64,
    pub high_cut: f64,
    pub transition_width: f64,
    pub window: Window,
}

const AM_BW: [f64; 3] = [8_000.0, 3_000.0, 2_000.0];
const FM_BW: [f64; 3] = [8_000.0, 6_000.0, 4_000.0];
const WFM_BW: [f64; 3] = [60_000.0, 40_000.0, 20_000.0];
const SSB_BW: [f64; 3] = [5_000.0, 2_400.0, 1_800.0];
/// CW half-width as a fraction of the CW pitch.
const CW_FRACTION: [f64; 3] = [2.0 / 3.0, 1.0 / 2.0, 1.0 / 3.0];

fn column(bandwidth_mode: BandwidthMode) -> usize {
    match bandwidth_mode {
        BandwidthMode::Wide => 0,
        BandwidthMode::Medium => 1,
        BandwidthMode::Narrow => 2,
    }
}

/// Fixed lookup over `(mode, bandwidth_mode)`; CW scales with the pitch.
pub fn select_filter_bandwidth(mode: Mode, bandwidth_mode: BandwidthMode, cw_base: Hertz) -> FilterSpec {
    let col = column(bandwidth_mode);
    match mode {
        Mode::Am => FilterSpec::low_pass(AM_BW[col], 500.0, RateDomain::Audio),
        Mode::Fm => FilterSpec::low_pass(FM_BW[col], 500.0, RateDomain::Audio),
        Mode::Wfm => FilterSpec::low_pass(WFM_BW[col], 4_000.0, RateDomain::Intermediate),
        Mode::Usb | Mode::Lsb => FilterSpec::low_pass(SSB_BW[col], 100.0, RateDomain::Audio),
        Mode::CwUsb | Mode::CwLsb => {
            let pitch = cw_base.0 as f64;
            let half_width = pitch * CW_FRACTION[col];
            FilterSpec {
                kind: FilterKind::BandPass,
                low_cut: pitch - half_width,
                high_cut: pitch + half_width,
                transition_width: 100.0,
                rate: RateDomain::Audio,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BANDWIDTHS: [BandwidthMode; 3] =
        [BandwidthMode::Wide, BandwidthMode::Medium, BandwidthMode::Narrow];

    #[test]
    fn test_every_combination_is_defined() {
        for mode in Mode::ALL {
            for bw in BANDWIDTHS {
                let spec = select_filter_bandwidth(mode, bw, Hertz(750));
                assert!(spec.high_cut > spec.low_cut, "{mode} {bw:?}");
                assert!(spec.transition_width > 0.0);
            }
        }
    }

    #[test]
    fn test_table_values() {
        let am: Vec<f64> = BANDWIDTHS
            .iter()
            .map(|&bw| select_filter_bandwidth(Mode::Am, bw, Hertz(750)).high_cut)
            .collect();
        assert_eq!(am, vec![8_000.0, 3_000.0, 2_000.0]);

        let wfm = select_filter_bandwidth(Mode::Wfm, BandwidthMode::Narrow, Hertz(750));
        assert_eq!(wfm.high_cut, 20_000.0);
        assert_eq!(wfm.transition_width, 4_000.0);
        assert_eq!(wfm.rate, RateDomain::Intermediate);

        let lsb = select_filter_bandwidth(Mode::Lsb, BandwidthMode::Wide, Hertz(750));
        assert_eq!((lsb.kind, lsb.high_cut, lsb.transition_width), (FilterKind::LowPass, 5_000.0, 100.0));

        let fm = select_filter_bandwidth(Mode::Fm, BandwidthMode::Medium, Hertz(750));
        assert_eq!((fm.high_cut, fm.transition_width), (6_000.0, 500.0));
    }

    #[test]
    fn test_cw_is_band_pass_around_pitch() {
        let spec = select_filter_bandwidth(Mode::CwLsb, BandwidthMode::Medium, Hertz(600));
        assert_eq!(spec.kind, FilterKind::BandPass);
        assert_eq!((spec.low_cut, spec.high_cut), (300.0, 900.0));

        let narrow = select_filter_bandwidth(Mode::CwUsb, BandwidthMode::Narrow, Hertz(900));
        assert_eq!((narrow.low_cut, narrow.high_cut), (600.0, 1_200.0));
    }

    #[test]
    fn test_request_resolves_rate_domain() {
        let state = TunerState::default();
        let audio = select_filter_bandwidth(Mode::Am, BandwidthMode::Medium, state.cw_base).request(&state);
        assert_eq!(audio.sample_rate, state.audio_rate);
        let wide = select_filter_bandwidth(Mode::Wfm, BandwidthMode::Medium, state.cw_base).request(&state);
        assert_eq!(wide.sample_rate, state.if_sample_rate);
    }
}
