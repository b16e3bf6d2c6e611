//! Signal processing for the waterfall: spectrum columns and amplitude histograms

mod histogram;
mod spectrum;

pub use histogram::{BUCKETS, Histogram};
#[cfg(test)]
pub use spectrum::bin_for_frequency;
pub use spectrum::{DbRange, SpectrumAnalyzer, SpectrumConfig, is_null_signal};
