//! Display-side models fed from spectrum frames.

use std::collections::VecDeque;

use rxdial_messages::{Decibels, ReceiverSettings};

/// Linear map of `x` from `[xa, xb]` onto `[ya, yb]`.
fn interpolate(x: f32, xa: f32, xb: f32, ya: f32, yb: f32) -> f32 {
    (x - xa) * (yb - ya) / (xb - xa) + ya
}

/// Scrolling spectrogram history, newest line first.
///
/// Each stored line holds one palette index (0..=255) per bin.
pub struct Waterfall {
    lines: VecDeque<Vec<u8>>,
    max_lines: usize,
    bias: f32,
    db_lo: f32,
    db_hi: f32,
    /// All-time extremes of the inserted data.
    min_db: Option<Decibels>,
    max_db: Option<Decibels>,
}

impl Waterfall {
    pub fn new(max_lines: usize, settings: &ReceiverSettings) -> Self {
        Self {
            lines: VecDeque::with_capacity(max_lines),
            max_lines: max_lines.max(1),
            bias: settings.waterfall_bias,
            db_lo: settings.db_scale_lo,
            db_hi: settings.db_scale_hi,
            min_db: None,
            max_db: None,
        }
    }

    pub fn color_index(&self, db: f32) -> u8 {
        let index = interpolate(db * 4.0 + self.bias, self.db_lo, self.db_hi, 0.0, 255.0);
        index.clamp(0.0, 255.0) as u8
    }

    pub fn insert_spectrum_line(&mut self, data: &[f32]) {
        if data.is_empty() {
            return;
        }
        self.update_min_max(data);
        let line = data.iter().map(|&db| self.color_index(db)).collect();
        self.lines.push_front(line);
        self.lines.truncate(self.max_lines);
    }

    fn update_min_max(&mut self, data: &[f32]) {
        let (lo, hi) = data
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        let min = self.min_db.get_or_insert(Decibels(lo));
        if lo < min.0 {
            *min = Decibels(lo);
        }
        let max = self.max_db.get_or_insert(Decibels(hi));
        if hi > max.0 {
            *max = Decibels(hi);
        }
    }

    /// Mouse-wheel style brightness change.
    pub fn adjust_bias(&mut self, step: f32) {
        self.bias += step;
    }

    pub fn lines(&self) -> impl Iterator<Item = &[u8]> {
        self.lines.iter().map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn db_range(&self) -> Option<(Decibels, Decibels)> {
        Some((self.min_db?, self.max_db?))
    }

    /// Newest line squeezed to `width` characters, brightest bin per column.
    pub fn text_row(&self, width: usize) -> Option<String> {
        const SHADES: &[u8] = b" .:-=+*#%@";
        let line = self.lines.front()?;
        let width = width.clamp(1, line.len());
        let row = (0..width)
            .map(|col| {
                let start = col * line.len() / width;
                let end = ((col + 1) * line.len() / width).max(start + 1);
                let peak = line[start..end].iter().copied().max().unwrap_or(0);
                SHADES[usize::from(peak) * (SHADES.len() - 1) / 255] as char
            })
            .collect();
        Some(row)
    }
}

/// Smoothed level of the bin under the tuning cursor.
#[derive(Debug, Clone, Copy)]
pub struct SignalMeter {
    level: f32,
    smoothing: f32,
}

impl Default for SignalMeter {
    fn default() -> Self {
        Self::new(0.2)
    }
}

impl SignalMeter {
    pub fn new(smoothing: f32) -> Self {
        Self {
            level: 0.0,
            smoothing,
        }
    }

    /// Feed the displayed span; the centre bin is the tuned frequency.
    pub fn update(&mut self, span: &[f32]) -> Decibels {
        if let Some(&v) = span.get(span.len() / 2) {
            self.level += (v - self.level) * self.smoothing;
        }
        self.level()
    }

    pub fn level(&self) -> Decibels {
        Decibels(self.level)
    }
}
