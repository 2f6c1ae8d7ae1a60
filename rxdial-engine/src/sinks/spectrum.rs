use std::f32::consts::PI;
use std::sync::Arc;

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use rustradio::block::{Block, BlockRet};
use rustradio::stream::ReadStream;
use rustradio::{Error, rustradio_macros};

use crate::mailbox::SpectrumMailbox;
use crate::plan::SpectrumParams;

/// Log-power FFT with display-rate decimation and optional averaging.
pub struct SpectrumAnalyzer {
    fft_size: usize,
    window: Vec<f32>,
    fft: Arc<dyn Fft<f32>>,
    /// Publish one frame out of every `stride`.
    stride: usize,
    counter: usize,
    average: f32,
    averaged: Option<Vec<f32>>,
}

impl SpectrumAnalyzer {
    pub fn new(sample_rate: f64, params: &SpectrumParams) -> Self {
        let fft_size = params.fft_size.max(2);
        let window: Vec<f32> = (0..fft_size)
            .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f32 / (fft_size - 1) as f32).cos()))
            .collect();
        let fft = FftPlanner::<f32>::new().plan_fft_forward(fft_size);

        let frames_per_second = sample_rate / fft_size as f64;
        let stride = (frames_per_second / f64::from(params.frame_rate.max(1))).round() as usize;

        Self {
            fft_size,
            window,
            fft,
            stride: stride.max(1),
            counter: 0,
            average: params.average.clamp(f32::EPSILON, 1.0),
            averaged: None,
        }
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Count one input frame; true when it should be shown.
    pub fn frame_due(&mut self) -> bool {
        self.counter += 1;
        if self.counter < self.stride {
            return false;
        }
        self.counter = 0;
        true
    }

    /// dB power per bin, DC in the middle.
    pub fn process(&mut self, samples: &[f32]) -> Vec<f32> {
        let mut buf: Vec<Complex<f32>> = samples
            .iter()
            .zip(&self.window)
            .map(|(sample, w)| Complex::new(sample * w, 0.0))
            .collect();
        buf.resize(self.fft_size, Complex::new(0.0, 0.0));
        self.fft.process(&mut buf);

        let n = self.fft_size as f32;
        let mut bins: Vec<f32> = buf
            .iter()
            .map(|value| {
                let mag = value.norm() / n;
                20.0 * mag.max(1e-10).log10()
            })
            .collect();
        bins.rotate_left(self.fft_size / 2);

        if self.average < 1.0 {
            if let Some(avg) = self.averaged.as_mut() {
                for (a, b) in avg.iter_mut().zip(&bins) {
                    *a += (b - *a) * self.average;
                }
                return avg.clone();
            }
        }
        self.averaged = Some(bins.clone());
        bins
    }
}

/// Turns a stream of samples into spectrum frames in the mailbox.
#[derive(rustradio_macros::Block)]
#[rustradio(new)]
pub struct SpectrumSink {
    #[rustradio(in)]
    src: ReadStream<f32>,
    mailbox: SpectrumMailbox,
    analyzer: SpectrumAnalyzer,
}

impl Block for SpectrumSink {
    fn work(&mut self) -> Result<BlockRet<'_>, Error> {
        let (input, _tags) = self.src.read_buf()?;

        let n = self.analyzer.fft_size();
        if input.len() < n {
            return Ok(BlockRet::Pending);
        }

        if self.analyzer.frame_due() {
            let frame: Vec<f32> = input.iter().take(n).copied().collect();
            self.mailbox.publish(self.analyzer.process(&frame));
        }

        input.consume(n);
        Ok(BlockRet::Again)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(fft_size: usize, frame_rate: u32, average: f32) -> SpectrumParams {
        SpectrumParams {
            fft_size,
            frame_rate,
            average,
        }
    }

    #[test]
    fn test_tone_peaks_at_its_bin() {
        let rate = 48_000.0;
        let mut analyzer = SpectrumAnalyzer::new(rate, &params(1024, 10, 1.0));
        let tone = 6_000.0;
        let samples: Vec<f32> = (0..1024)
            .map(|i| (2.0 * PI * tone * i as f32 / rate as f32).sin())
            .collect();
        let bins = analyzer.process(&samples);
        assert_eq!(bins.len(), 1024);

        let (peak, _) = bins
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.total_cmp(b))
            .unwrap();
        let freq = (peak as f32 - 512.0) * rate as f32 / 1024.0;
        // A real tone shows on both sides of DC.
        assert!((freq.abs() - tone).abs() < 100.0, "peak at {freq} Hz");
    }

    #[test]
    fn test_stride_follows_frame_rate() {
        // 48 kHz / 1024 ~ 47 frames per second, 10 shown.
        let mut analyzer = SpectrumAnalyzer::new(48_000.0, &params(1024, 10, 1.0));
        let shown = (0..47).filter(|_| analyzer.frame_due()).count();
        assert_eq!(shown, 9);

        let mut every = SpectrumAnalyzer::new(1_000.0, &params(1024, 10, 1.0));
        assert!(every.frame_due());
        assert!(every.frame_due());
    }

    #[test]
    fn test_averaging_smooths_frames() {
        let mut analyzer = SpectrumAnalyzer::new(48_000.0, &params(64, 10, 0.5));
        let silent = analyzer.process(&[0.0; 64]);
        assert!(silent.iter().all(|db| (*db + 200.0).abs() < 1e-3));

        let loud = analyzer.process(&[1.0; 64]);
        let dc = loud[32];
        // Half way between -200 dB and the undamped DC level.
        assert!(dc > -200.0 && dc < -50.0, "dc at {dc} dB");
    }
}
