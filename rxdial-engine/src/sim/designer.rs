use anyhow::{Result, bail};
use rustradio::fir::low_pass;
use rustradio::window::WindowType;

use crate::collaborators::FilterDesigner;
use crate::filters::{FilterKind, FilterRequest, Window};

/// Windowed-sinc FIR design through `rustradio::fir`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RustradioDesigner;

impl FilterDesigner for RustradioDesigner {
    fn design(&self, request: &FilterRequest) -> Result<Vec<f32>> {
        let rate = request.sample_rate.0 as f32;
        let nyquist = rate / 2.0;
        if rate <= 0.0 {
            bail!("filter sample rate must be positive");
        }
        if request.high_cut <= 0.0 || request.high_cut as f32 >= nyquist {
            bail!(
                "cutoff {} Hz outside (0, {nyquist}) at {}",
                request.high_cut,
                request.sample_rate
            );
        }
        let window = match request.window {
            Window::Hamming => WindowType::Hamming,
        };
        let twidth = request.transition_width as f32;
        let high = low_pass(rate, request.high_cut as f32, twidth, &window);

        match request.kind {
            FilterKind::LowPass => Ok(high),
            FilterKind::BandPass => {
                if request.low_cut <= 0.0 || request.low_cut >= request.high_cut {
                    bail!(
                        "band-pass edges {}..{} Hz are not ordered",
                        request.low_cut,
                        request.high_cut
                    );
                }
                // Same rate and transition width, so both have the same length.
                let low = low_pass(rate, request.low_cut as f32, twidth, &window);
                Ok(high.iter().zip(&low).map(|(h, l)| h - l).collect())
            }
        }
    }
}
