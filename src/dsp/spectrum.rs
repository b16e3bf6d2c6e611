//! Magnitude spectrum and log-scale color mapping
//!
//! Each block goes through:
//! - DC removal (mean subtraction, optional)
//! - a symmetric Hamming window
//! - a forward FFT, keeping the N/2 + 1 non-negative frequency bins
//! - 20·log10 compression clamped to a fixed dB range, quantized to 8-bit gray

use crate::source::SampleBlock;
use crate::waterfall::colors;
use rustfft::{Fft, FftPlanner, num_complex::Complex};
use std::sync::Arc;

/// Display dynamic range. Magnitudes outside it saturate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DbRange {
    pub min_db: f32,
    pub max_db: f32,
}

impl Default for DbRange {
    fn default() -> Self {
        Self {
            min_db: 20.0,
            max_db: 40.0,
        }
    }
}

impl DbRange {
    pub fn new(min_db: f32, max_db: f32) -> Self {
        debug_assert!(min_db < max_db, "min_db must be below max_db");
        Self { min_db, max_db }
    }

    /// Clamped level in dB. Zero (and anything non-positive or NaN) maps to
    /// the floor instead of -inf.
    pub fn to_db(&self, magnitude: f32) -> f32 {
        if magnitude.is_nan() || magnitude <= 0.0 {
            return self.min_db;
        }
        (20.0 * magnitude.log10()).clamp(self.min_db, self.max_db)
    }

    /// 8-bit intensity of a magnitude
    pub fn level(&self, magnitude: f32) -> u8 {
        let db = self.to_db(magnitude);
        let normalized = (db - self.min_db) / (self.max_db - self.min_db);
        // Truncates, so only max_db reaches 255
        (normalized * 255.0) as u8
    }

    /// Packed grayscale color of a magnitude
    pub fn color_of(&self, magnitude: f32) -> u32 {
        colors::gray(self.level(magnitude))
    }
}

#[derive(Debug, Clone)]
pub struct SpectrumConfig {
    /// Samples per block (N)
    pub block_size: usize,
    pub db_range: DbRange,
    pub remove_dc: bool,
}

impl Default for SpectrumConfig {
    fn default() -> Self {
        Self {
            block_size: 1024,
            db_range: DbRange::default(),
            remove_dc: true,
        }
    }
}

/// Symmetric Hamming window: `0.54 - 0.46 * cos(2πk / (N - 1))`
pub fn hamming(len: usize) -> Vec<f32> {
    if len == 1 {
        return vec![1.0];
    }
    let denom = (len - 1) as f64;
    (0..len)
        .map(|k| {
            let phase = std::f64::consts::TAU * k as f64 / denom;
            (0.54 - 0.46 * phase.cos()) as f32
        })
        .collect()
}

/// True when every sample is exactly zero
pub fn is_null_signal<T>(samples: &[T]) -> bool
where
    T: Copy + Default + PartialEq,
{
    samples.iter().all(|&s| s == T::default())
}

/// Index of the bin closest to `hz` for the given sample rate and block size
#[cfg(test)]
pub fn bin_for_frequency(hz: f32, sample_rate: f32, block_size: usize) -> usize {
    let df = sample_rate / block_size as f32;
    (hz / df).round().max(0.0) as usize
}

pub struct SpectrumAnalyzer {
    config: SpectrumConfig,
    window: Vec<f32>,
    fft: Arc<dyn Fft<f32>>,
    buffer: Vec<Complex<f32>>,
}

impl SpectrumAnalyzer {
    pub fn new(config: SpectrumConfig) -> Self {
        let fft = FftPlanner::new().plan_fft_forward(config.block_size);

        Self {
            window: hamming(config.block_size),
            buffer: vec![Complex::new(0.0, 0.0); config.block_size],
            fft,
            config,
        }
    }

    pub fn bins(&self) -> usize {
        self.config.block_size / 2 + 1
    }

    /// One-sided magnitude spectrum of a block.
    ///
    /// Blocks shorter than N are zero-padded, longer ones truncated.
    pub fn analyze(&mut self, block: &SampleBlock) -> Vec<f32> {
        let samples = block.samples();
        let n = self.config.block_size;
        let used = samples.len().min(n);

        let mean = if self.config.remove_dc && used > 0 {
            samples[..used].iter().map(|&s| s as f32).sum::<f32>() / used as f32
        } else {
            0.0
        };

        for (i, slot) in self.buffer.iter_mut().enumerate() {
            let value = if i < used {
                (samples[i] as f32 - mean) * self.window[i]
            } else {
                0.0
            };
            *slot = Complex::new(value, 0.0);
        }

        self.fft.process(&mut self.buffer);

        self.buffer[..self.bins()].iter().map(|c| c.norm()).collect()
    }

    /// Map a magnitude column onto packed grayscale pixels
    pub fn colorize(&self, magnitudes: &[f32]) -> Vec<u32> {
        let range = self.config.db_range;
        magnitudes.iter().map(|&a| range.color_of(a)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(block_size: usize, cycles: f32, amplitude: f32) -> SampleBlock {
        SampleBlock::from_samples(
            (0..block_size)
                .map(|n| {
                    let phase = std::f32::consts::TAU * cycles * n as f32 / block_size as f32;
                    (amplitude * phase.sin()).round() as i16
                })
                .collect(),
        )
    }

    fn argmax(values: &[f32]) -> usize {
        values
            .iter()
            .enumerate()
            .fold((0, f32::MIN), |best, (i, &v)| if v > best.1 { (i, v) } else { best })
            .0
    }

    #[test]
    fn test_hamming_shape() {
        let w = hamming(1024);
        assert_eq!(w.len(), 1024);
        assert!((w[0] - 0.08).abs() < 1e-6);
        assert!((w[1023] - 0.08).abs() < 1e-6);
        for k in 0..512 {
            assert!((w[k] - w[1023 - k]).abs() < 1e-5);
        }
        assert!(w.iter().all(|&v| v <= 1.0));
    }

    #[test]
    fn test_output_has_half_plus_one_nonnegative_bins() {
        for &n in &[16usize, 256, 1000, 1024] {
            let mut analyzer = SpectrumAnalyzer::new(SpectrumConfig {
                block_size: n,
                ..SpectrumConfig::default()
            });
            let block = SampleBlock::from_samples(
                (0..n).map(|i| ((i * 37 % 256) as i16) - 128).collect(),
            );
            let magnitudes = analyzer.analyze(&block);
            assert_eq!(magnitudes.len(), n / 2 + 1);
            assert!(magnitudes.iter().all(|&m| m >= 0.0 && m.is_finite()));
        }
    }

    #[test]
    fn test_pure_tone_peaks_at_its_bin() {
        let mut analyzer = SpectrumAnalyzer::new(SpectrumConfig::default());
        for &k in &[3usize, 50, 200, 511] {
            let magnitudes = analyzer.analyze(&tone(1024, k as f32, 100.0));
            let peak = argmax(&magnitudes);
            assert!(peak.abs_diff(k) <= 1, "tone at bin {k} peaked at {peak}");
        }
    }

    #[test]
    fn test_dc_is_removed() {
        let constant = SampleBlock::from_samples(vec![42; 1024]);

        let mut analyzer = SpectrumAnalyzer::new(SpectrumConfig::default());
        let magnitudes = analyzer.analyze(&constant);
        assert!(magnitudes.iter().all(|&m| m < 1e-2));

        let mut raw = SpectrumAnalyzer::new(SpectrumConfig {
            remove_dc: false,
            ..SpectrumConfig::default()
        });
        let magnitudes = raw.analyze(&constant);
        assert_eq!(argmax(&magnitudes), 0);
        assert!(magnitudes[0] > 1000.0);
    }

    #[test]
    fn test_zero_magnitude_maps_to_floor() {
        let range = DbRange::default();
        assert_eq!(range.to_db(0.0), range.min_db);
        assert_eq!(range.to_db(f32::NAN), range.min_db);
        assert_eq!(range.level(0.0), 0);
        assert_eq!(range.color_of(0.0), 0x000000);
    }

    #[test]
    fn test_color_is_monotonic_and_saturates() {
        let range = DbRange::new(20.0, 40.0);

        let mut previous = 0u8;
        let mut magnitude = 1e-3f32;
        while magnitude < 1e4 {
            let level = range.level(magnitude);
            assert!(level >= previous, "level dropped at magnitude {magnitude}");
            previous = level;
            magnitude *= 1.1;
        }

        // Floor: anything at or below 10^(min_db / 20)
        let floor = 10f32.powf(range.min_db / 20.0);
        for &a in &[0.0, 1e-6, 1.0, floor * 0.5, floor] {
            assert_eq!(range.color_of(a), range.color_of(0.0), "magnitude {a}");
        }

        // Ceiling
        let ceiling = 10f32.powf(range.max_db / 20.0);
        assert_eq!(range.level(ceiling * 2.0), 255);
        assert_eq!(range.level(1e9), 255);
        assert_eq!(range.color_of(1e9), 0xFFFFFF);
    }

    #[test]
    fn test_colorize_produces_gray() {
        let analyzer = SpectrumAnalyzer::new(SpectrumConfig {
            block_size: 8,
            ..SpectrumConfig::default()
        });
        let pixels = analyzer.colorize(&[0.0, 31.6, 1000.0]);
        assert_eq!(pixels.len(), 3);
        for pixel in pixels {
            let r = (pixel >> 16) & 0xff;
            let g = (pixel >> 8) & 0xff;
            let b = pixel & 0xff;
            assert!(r == g && g == b);
        }
    }

    #[test]
    fn test_null_signal_detection() {
        assert!(is_null_signal(&[0i16; 64]));
        assert!(is_null_signal(&[0.0f32; 64]));
        assert!(!is_null_signal(&[0, 0, 1, 0]));
    }

    #[test]
    fn test_bin_for_frequency() {
        assert_eq!(bin_for_frequency(100.0, 10_240.0, 1024), 10);
        assert_eq!(bin_for_frequency(100.0, 100_000.0, 1024), 1);
        assert_eq!(bin_for_frequency(0.0, 100_000.0, 1024), 0);
    }
}
