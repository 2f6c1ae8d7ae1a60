mod spectrum;

pub use spectrum::{SpectrumAnalyzer, SpectrumSink};
