use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::Hertz;

/// Intermediate sample rate used by the wide FM chain.
pub const IF_SAMPLE_RATE: Hertz = Hertz(240_000);

/// Demodulation mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Mode {
    #[default]
    Am,
    Fm,
    Wfm,
    Usb,
    Lsb,
    CwUsb,
    CwLsb,
}

impl Mode {
    pub const ALL: [Mode; 7] = [
        Mode::Am,
        Mode::Fm,
        Mode::Wfm,
        Mode::Usb,
        Mode::Lsb,
        Mode::CwUsb,
        Mode::CwLsb,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Am => "AM",
            Self::Fm => "FM",
            Self::Wfm => "WFM",
            Self::Usb => "USB",
            Self::Lsb => "LSB",
            Self::CwUsb => "CW_USB",
            Self::CwLsb => "CW_LSB",
        }
    }

    /// Case-insensitive lookup by label. A bare `CW` means upper-sideband CW.
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim().to_ascii_uppercase();
        if label == "CW" {
            return Some(Self::CwUsb);
        }
        Self::ALL.into_iter().find(|mode| mode.label() == label)
    }

    pub fn is_cw(&self) -> bool {
        matches!(self, Self::CwUsb | Self::CwLsb)
    }

    /// True for the phasing-method single sideband modes, CW included.
    pub fn is_sideband(&self) -> bool {
        matches!(self, Self::Usb | Self::Lsb | Self::CwUsb | Self::CwLsb)
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// IF filter width selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BandwidthMode {
    Wide,
    #[default]
    Medium,
    Narrow,
}

/// Gain control strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgcMode {
    /// Software AGC, fast decay.
    #[default]
    Fast,
    /// Software AGC, slow decay.
    Slow,
    /// Let the tuner hardware manage gain.
    Hardware,
    Off,
}

/// Everything the tuning arithmetic reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TunerState {
    pub base_frequency: Hertz,
    pub mode: Mode,
    pub sample_rate: Hertz,
    pub audio_rate: Hertz,
    #[serde(skip, default = "if_sample_rate")]
    pub if_sample_rate: Hertz,
    pub upconvert_enabled: bool,
    /// Upconversion applies at or below this frequency.
    pub upconvert_threshold: Hertz,
    pub upconvert_lo_frequency: Hertz,
    pub offset_enabled: bool,
    /// Requested digital mixer offset in Hz, signed.
    pub offset_frequency: f64,
    pub correction_ppm: f64,
    pub correction_ppm_upconvert: f64,
    pub cw_base: Hertz,
    pub bandwidth_mode: BandwidthMode,
}

fn if_sample_rate() -> Hertz {
    IF_SAMPLE_RATE
}

impl Default for TunerState {
    fn default() -> Self {
        Self {
            base_frequency: Hertz::mhz(10),
            mode: Mode::Am,
            sample_rate: Hertz(2_400_000),
            audio_rate: Hertz(48_000),
            if_sample_rate: IF_SAMPLE_RATE,
            upconvert_enabled: false,
            upconvert_threshold: Hertz::mhz(24),
            upconvert_lo_frequency: Hertz::mhz(125),
            offset_enabled: false,
            offset_frequency: -10_000.0,
            correction_ppm: 0.0,
            correction_ppm_upconvert: 0.0,
            cw_base: Hertz(750),
            bandwidth_mode: BandwidthMode::Medium,
        }
    }
}

/// Receiver controls that do not feed the tuning arithmetic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReceiverSettings {
    /// Device driver name, e.g. `sim`.
    pub device: String,
    pub antenna: Option<String>,
    /// RF front-end bandwidth.
    pub rf_bandwidth: Option<Hertz>,
    pub agc_mode: AgcMode,
    pub dc_offset_correction: bool,
    pub iq_balance_correction: bool,
    /// Audio gain control position, 0..=1.
    pub af_gain: f32,
    /// Squelch threshold in dB.
    pub squelch_level: f32,
    pub fft_size: usize,
    /// Spectrum frames per second.
    pub frame_rate: u32,
    /// FFT averaging factor; 1.0 disables averaging.
    pub fft_average: f32,
    pub audio_device: String,
    pub waterfall_bias: f32,
    pub db_scale_lo: f32,
    pub db_scale_hi: f32,
    /// Gain per named stage, in dB. Must stay last: a TOML table follows plain keys.
    pub gains: BTreeMap<String, f64>,
}

impl ReceiverSettings {
    pub const DEFAULT_GAIN: f64 = 50.0;

    pub fn gain_for(&self, stage: &str) -> f64 {
        self.gains.get(stage).copied().unwrap_or(Self::DEFAULT_GAIN)
    }
}

impl Default for ReceiverSettings {
    fn default() -> Self {
        Self {
            device: "sim".to_string(),
            antenna: None,
            rf_bandwidth: None,
            gains: BTreeMap::new(),
            agc_mode: AgcMode::Fast,
            dc_offset_correction: false,
            iq_balance_correction: false,
            af_gain: 0.25,
            squelch_level: -130.0,
            fft_size: 4096,
            frame_rate: 10,
            fft_average: 0.5,
            audio_device: "null".to_string(),
            waterfall_bias: 150.0,
            db_scale_lo: -140.0,
            db_scale_hi: 10.0,
        }
    }
}

/// Lifecycle of a receive session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStatus {
    /// No device answered the probe; start is disabled.
    NoDevice,
    Stopped,
    Running,
    /// The last reconfigure failed; waiting for the user to retry.
    Errored(String),
}

/// Current state of the SDR engine.
#[derive(Debug, Clone)]
pub struct EngineState {
    /// Frequency the front end is tuned to
    pub center_frequency: Hertz,
    /// Sample rate
    pub sample_rate: Hertz,
    /// FFT size (number of bins)
    pub fft_size: usize,
    pub mode: Mode,
    pub session: SessionStatus,
    /// One-line human readable status
    pub status: String,
}
