use serde::{Deserialize, Serialize};

/// Frequency in Hertz.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Hertz(pub u64);

impl std::fmt::Display for Hertz {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} Hz", self.0)
    }
}

impl Hertz {
    pub const fn khz(khz: u64) -> Self {
        Self(khz * 1_000)
    }

    pub const fn mhz(mhz: u64) -> Self {
        Self(mhz * 1_000_000)
    }

    /// Frequency in MHz, for status text.
    pub fn as_mhz(self) -> f64 {
        self.0 as f64 / 1e6
    }

    /// Parse a human frequency like `7.074M`, `500k`, `1.2G` or a plain Hz value.
    pub fn parse_human(text: &str) -> Option<Self> {
        let text = text.trim();
        let (digits, mult) = match text.chars().last()? {
            'k' | 'K' => (&text[..text.len() - 1], 1e3),
            'm' | 'M' => (&text[..text.len() - 1], 1e6),
            'g' | 'G' => (&text[..text.len() - 1], 1e9),
            _ => (text, 1.0),
        };
        let value: f64 = digits.trim().parse().ok()?;
        if !value.is_finite() || value < 0.0 {
            return None;
        }
        Some(Self((value * mult).round() as u64))
    }
}

/// Power level in Decibels (dB).
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Decibels(pub f32);

impl std::fmt::Display for Decibels {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.1} dB", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_human_frequencies() {
        assert_eq!(Hertz::parse_human("7.074M"), Some(Hertz(7_074_000)));
        assert_eq!(Hertz::parse_human("500k"), Some(Hertz::khz(500)));
        assert_eq!(Hertz::parse_human("10000000"), Some(Hertz::mhz(10)));
        assert_eq!(Hertz::parse_human("-5"), None);
        assert_eq!(Hertz::parse_human(""), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(Hertz(48_000).to_string(), "48000 Hz");
        assert_eq!(Decibels(-3.26).to_string(), "-3.3 dB");
    }
}
