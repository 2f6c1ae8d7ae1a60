//! Mode to block-topology mapping.
//!
//! A [`Topology`] names the stages of the receive chain in connection order.
//! It carries no block instances; the flow-graph collaborator turns it into
//! real connections.

use num_complex::Complex32;
use rxdial_messages::Mode;

/// Which resampler feeds the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResamplePath {
    /// Hardware rate straight to audio rate.
    Narrow,
    /// Hardware rate to the wide FM intermediate rate.
    Wide,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalDomain {
    Complex,
    Real,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Source,
    Resample(ResamplePath),
    /// Frequency-translating mixer (digital down-conversion).
    Mixer,
    LowPass(SignalDomain),
    BandPass,
    Squelch(SignalDomain),
    Agc(SignalDomain),
    Magnitude,
    NbfmDemod,
    WfmDemod,
    /// Complex to separate I and Q real streams.
    IqSplit,
    Hilbert,
    SidebandCombine,
    Volume,
    AudioSink,
    LogPowerFft,
    SpectrumSink,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sideband {
    Upper,
    Lower,
}

impl Sideband {
    pub fn for_mode(mode: Mode) -> Option<Self> {
        match mode {
            Mode::Usb | Mode::CwUsb => Some(Self::Upper),
            Mode::Lsb | Mode::CwLsb => Some(Self::Lower),
            Mode::Am | Mode::Fm | Mode::Wfm => None,
        }
    }

    /// Multiplier applied to the imaginary Hilbert branch before summing.
    pub fn sign(self) -> f32 {
        match self {
            Self::Upper => 1.0,
            Self::Lower => -1.0,
        }
    }
}

/// The spectrum display branch, present in every topology.
pub const SPECTRUM_BRANCH: [Stage; 3] = [Stage::Source, Stage::LogPowerFft, Stage::SpectrumSink];

#[derive(Debug, Clone, PartialEq)]
pub struct Topology {
    pub mode: Mode,
    /// Receive chain, source first, audio sink last.
    pub stages: Vec<Stage>,
    pub sideband: Option<Sideband>,
}

impl Topology {
    pub fn spectrum_branch(&self) -> &'static [Stage] {
        &SPECTRUM_BRANCH
    }

    pub fn sideband_sign(&self) -> Option<f32> {
        self.sideband.map(Sideband::sign)
    }

    pub fn contains(&self, stage: Stage) -> bool {
        self.stages.contains(&stage)
    }
}

pub fn select_flowgraph_topology(mode: Mode) -> Topology {
    use SignalDomain::{Complex, Real};

    let stages = match mode {
        Mode::Am => vec![
            Stage::Source,
            Stage::Resample(ResamplePath::Narrow),
            Stage::Mixer,
            Stage::LowPass(Complex),
            Stage::Squelch(Complex),
            Stage::Agc(Complex),
            Stage::Magnitude,
            Stage::Volume,
            Stage::AudioSink,
        ],
        Mode::Fm | Mode::Wfm => {
            let (path, demod) = if mode == Mode::Wfm {
                (ResamplePath::Wide, Stage::WfmDemod)
            } else {
                (ResamplePath::Narrow, Stage::NbfmDemod)
            };
            vec![
                Stage::Source,
                Stage::Resample(path),
                Stage::Mixer,
                Stage::LowPass(Complex),
                Stage::Squelch(Complex),
                Stage::Agc(Complex),
                demod,
                Stage::Volume,
                Stage::AudioSink,
            ]
        }
        Mode::Usb | Mode::Lsb | Mode::CwUsb | Mode::CwLsb => {
            let audio_filter = if mode.is_cw() {
                Stage::BandPass
            } else {
                Stage::LowPass(Real)
            };
            vec![
                Stage::Source,
                Stage::Resample(ResamplePath::Narrow),
                Stage::Mixer,
                Stage::Squelch(Complex),
                Stage::IqSplit,
                Stage::Hilbert,
                Stage::Hilbert,
                Stage::SidebandCombine,
                audio_filter,
                Stage::Squelch(Real),
                Stage::Agc(Real),
                Stage::Volume,
                Stage::AudioSink,
            ]
        }
    };

    Topology {
        mode,
        stages,
        sideband: Sideband::for_mode(mode),
    }
}

/// Phasing-method sideband selection.
///
/// `real_branch` and `imag_branch` are the outputs of the two Hilbert
/// transformers fed with I and Q; the result is
/// `real_branch.re + sign * imag_branch.im`.
pub fn combine_sidebands(
    real_branch: &[Complex32],
    imag_branch: &[Complex32],
    sideband: Sideband,
) -> Vec<f32> {
    let sign = sideband.sign();
    real_branch
        .iter()
        .zip(imag_branch)
        .map(|(re, im)| re.re + sign * im.im)
        .collect()
}
