use std::collections::BTreeMap;

use anyhow::{Result, bail};
use log::debug;
use rxdial_messages::Hertz;

use crate::collaborators::{AgcParams, FrontEnd, GainStage};

/// A tuner that remembers what it was told.
#[derive(Debug, Clone, Default)]
pub struct SimulatedFrontEnd {
    gain_stages: Vec<GainStage>,
    antennas: Vec<String>,
    sample_rates: Vec<Hertz>,
    bandwidths: Vec<Hertz>,
    tuning_range: Option<(Hertz, Hertz)>,

    pub frequency: Option<Hertz>,
    pub correction_ppm: f64,
    pub tune_count: usize,
    pub sample_rate: Option<Hertz>,
    pub bandwidth: Option<Hertz>,
    pub gains: BTreeMap<String, f64>,
    pub antenna: Option<String>,
    pub agc: Option<AgcParams>,
    pub dc_offset_correction: bool,
    pub iq_balance_correction: bool,
}

impl SimulatedFrontEnd {
    /// A dongle-like tuner with one gain stage and no bandwidth list.
    pub fn new() -> Self {
        Self {
            gain_stages: vec![GainStage {
                name: "TUNER".to_string(),
                min: 0.0,
                max: 49.6,
            }],
            antennas: vec!["RX".to_string()],
            sample_rates: [250_000, 1_024_000, 1_536_000, 1_792_000, 1_920_000, 2_048_000, 2_400_000]
                .into_iter()
                .map(Hertz)
                .collect(),
            ..Self::default()
        }
    }

    /// Nothing attached: reports no gain stages.
    pub fn absent() -> Self {
        Self::default()
    }

    pub fn with_gain_stages(mut self, stages: Vec<GainStage>) -> Self {
        self.gain_stages = stages;
        self
    }

    pub fn with_antennas(mut self, antennas: Vec<String>) -> Self {
        self.antennas = antennas;
        self
    }

    pub fn with_sample_rates(mut self, rates: Vec<Hertz>) -> Self {
        self.sample_rates = rates;
        self
    }

    pub fn with_bandwidths(mut self, bandwidths: Vec<Hertz>) -> Self {
        self.bandwidths = bandwidths;
        self
    }

    /// Refuse to tune outside `low..=high`, like a PLL that cannot lock.
    pub fn with_tuning_range(mut self, low: Hertz, high: Hertz) -> Self {
        self.tuning_range = Some((low, high));
        self
    }
}

impl FrontEnd for SimulatedFrontEnd {
    fn tune(&mut self, frequency: Hertz, correction_ppm: f64) -> Result<()> {
        if let Some((low, high)) = self.tuning_range {
            if frequency < low || frequency > high {
                bail!("{frequency} is outside {low}..{high}");
            }
        }
        debug!("sim: tune {frequency} {correction_ppm:+} ppm");
        self.frequency = Some(frequency);
        self.correction_ppm = correction_ppm;
        self.tune_count += 1;
        Ok(())
    }

    fn set_bandwidth(&mut self, bandwidth: Hertz) -> Result<()> {
        self.bandwidth = Some(bandwidth);
        Ok(())
    }

    fn set_sample_rate(&mut self, rate: Hertz) -> Result<()> {
        if rate.0 == 0 {
            bail!("sample rate must be positive");
        }
        self.sample_rate = Some(rate);
        Ok(())
    }

    fn set_gain(&mut self, stage: &str, value: f64) -> Result<()> {
        if !self.gain_stages.iter().any(|s| s.name == stage) {
            bail!("no gain stage named {stage}");
        }
        self.gains.insert(stage.to_string(), value);
        Ok(())
    }

    fn set_antenna(&mut self, name: &str) -> Result<()> {
        if !self.antennas.iter().any(|a| a == name) {
            bail!("no antenna named {name}");
        }
        self.antenna = Some(name.to_string());
        Ok(())
    }

    fn set_agc(&mut self, params: &AgcParams) -> Result<()> {
        self.agc = Some(*params);
        Ok(())
    }

    fn set_dc_offset_correction(&mut self, enabled: bool) -> Result<()> {
        self.dc_offset_correction = enabled;
        Ok(())
    }

    fn set_iq_balance_correction(&mut self, enabled: bool) -> Result<()> {
        self.iq_balance_correction = enabled;
        Ok(())
    }

    fn available_gain_stages(&self) -> Vec<GainStage> {
        self.gain_stages.clone()
    }

    fn available_antennas(&self) -> Vec<String> {
        self.antennas.clone()
    }

    fn available_sample_rates(&self) -> Vec<Hertz> {
        self.sample_rates.clone()
    }

    fn available_bandwidths(&self) -> Vec<Hertz> {
        self.bandwidths.clone()
    }
}
