//! One-shot capture rendered as a spectrogram image
//!
//! Reads a fixed number of samples, slides a Hamming-windowed FFT across
//! them with heavy overlap, and colors the magnitudes on a two-decade log
//! scale. Time runs left to right, frequency bottom to top. The DC bin is
//! left out of the picture.

use crate::dsp::{SpectrumAnalyzer, SpectrumConfig, is_null_signal};
use crate::snapshot::{self, SnapshotError};
use crate::source::{SampleBlock, SampleSource, SourceError};
use crate::waterfall::colors;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_SAMPLES: usize = 1 << 16;
pub const DEFAULT_WINDOW: usize = 1024;

/// Smallest window that still leaves one bin besides DC
pub const MIN_WINDOW: usize = 2;

/// Rows computed per window length of input, i.e. a hop of window/32
const ROWS_PER_WINDOW: usize = 32;

/// Decades of dynamic range below the rounded peak
const DECADES: f32 = 2.0;

/// Full scale of a signed 8-bit sample
const FULL_SCALE: f32 = 128.0;

const PALETTE: [(u8, u8, u8); 9] = [
    (0, 0, 0),
    (0, 0, 255),
    (0, 255, 255),
    (0, 255, 0),
    (255, 255, 0),
    (255, 165, 0),
    (255, 0, 0),
    (238, 130, 238),
    (255, 255, 255),
];

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("null signal captured")]
    NullSignal,
    #[error("window length must be at least 2 samples, got {0}")]
    Window(usize),
    #[error("captured {got} samples, need at least {window} for one window")]
    TooShort { got: usize, window: usize },
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

#[derive(Debug, Clone, Copy)]
pub struct CaptureConfig {
    pub samples: usize,
    pub window: usize,
    pub sample_rate: f32,
}

impl CaptureConfig {
    pub fn validate(&self) -> Result<(), CaptureError> {
        if self.window < MIN_WINDOW {
            return Err(CaptureError::Window(self.window));
        }
        Ok(())
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            samples: DEFAULT_SAMPLES,
            window: DEFAULT_WINDOW,
            sample_rate: 100_000.0,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CaptureSummary {
    pub output: PathBuf,
    pub samples: usize,
    pub rows: usize,
    pub bins: usize,
    pub duration_secs: f32,
    pub window_secs: f32,
    pub bin_hz: f32,
    pub scale_min: f32,
    pub scale_max: f32,
}

pub fn progress_bar(total: usize) -> ProgressBar {
    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} samples ({eta})")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .progress_chars("#>-"),
    );
    pb
}

/// Read up to `total` samples, block by block, until the source runs dry
pub fn acquire<S: SampleSource>(
    source: &mut S,
    total: usize,
    progress: &ProgressBar,
) -> Result<Vec<i16>, CaptureError> {
    let mut samples = Vec::with_capacity(total);

    while samples.len() < total {
        let block = match source.read_block()? {
            Some(block) if !block.samples().is_empty() => block,
            _ => {
                tracing::warn!(
                    "[capture] source ended after {} of {} samples",
                    samples.len(),
                    total
                );
                break;
            }
        };
        let take = block.len().min(total - samples.len());
        samples.extend_from_slice(&block.samples()[..take]);
        progress.set_position(samples.len() as u64);
    }

    progress.finish_and_clear();
    Ok(samples)
}

/// Magnitudes of overlapping windows, one row per window position
#[derive(Debug, Clone)]
pub struct Spectrogram {
    rows: usize,
    bins: usize,
    /// Row-major, `rows × bins`, DC included at column 0
    magnitudes: Vec<f32>,
}

impl Spectrogram {
    /// Rows start at `row * len / (len / window * 32)`; positions whose
    /// window would run past the end are dropped.
    pub fn compute(samples: &[i16], window: usize) -> Result<Self, CaptureError> {
        if window < MIN_WINDOW {
            return Err(CaptureError::Window(window));
        }
        if samples.len() < window {
            return Err(CaptureError::TooShort {
                got: samples.len(),
                window,
            });
        }
        if is_null_signal(samples) {
            return Err(CaptureError::NullSignal);
        }

        let len = samples.len();
        let slots = len / window * ROWS_PER_WINDOW;
        let starts: Vec<usize> = (0..slots)
            .map(|row| row * len / slots)
            .take_while(|&start| start + window <= len)
            .collect();

        let mut analyzer = SpectrumAnalyzer::new(SpectrumConfig {
            block_size: window,
            remove_dc: false,
            ..SpectrumConfig::default()
        });
        let bins = analyzer.bins();
        let scale = 2.0 / (window as f32 * FULL_SCALE);

        let mut magnitudes = Vec::with_capacity(starts.len() * bins);
        for &start in &starts {
            let block = SampleBlock::from_samples(samples[start..start + window].to_vec());
            magnitudes.extend(analyzer.analyze(&block).into_iter().map(|m| m * scale));
        }

        Ok(Self {
            rows: starts.len(),
            bins,
            magnitudes,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn bins(&self) -> usize {
        self.bins
    }

    pub fn magnitude(&self, row: usize, bin: usize) -> f32 {
        self.magnitudes[row * self.bins + bin]
    }

    pub fn peak(&self) -> f32 {
        self.magnitudes.iter().copied().fold(0.0, f32::max)
    }

    /// Image pixels: one column per row, highest bin on the top line, DC
    /// omitted. Returns `(width, height, pixels)`.
    pub fn render(&self, scale: &ColorScale) -> (usize, usize, Vec<u32>) {
        let width = self.rows;
        let height = self.bins - 1;
        let mut pixels = vec![colors::BLACK; width * height];

        for row in 0..self.rows {
            for bin in 1..self.bins {
                let y = self.bins - 1 - bin;
                pixels[y * width + row] = palette(scale.position(self.magnitude(row, bin)));
            }
        }

        (width, height, pixels)
    }
}

fn round1(x: f32) -> f32 {
    (x * 10.0).round() / 10.0
}

/// Logarithmic color bounds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorScale {
    pub min: f32,
    pub max: f32,
}

impl ColorScale {
    /// Top of scale is the peak rounded to a tenth of a decade; the bottom
    /// sits two decades lower.
    pub fn from_peak(peak: f32) -> Self {
        let top = round1(peak.log10());
        Self {
            min: 10f32.powf(round1(top - DECADES)),
            max: 10f32.powf(top),
        }
    }

    /// Position of `magnitude` on the scale, clamped to [0, 1]
    pub fn position(&self, magnitude: f32) -> f32 {
        if magnitude.is_nan() || magnitude <= 0.0 {
            return 0.0;
        }
        let (lo, hi) = (self.min.log10(), self.max.log10());
        ((magnitude.log10() - lo) / (hi - lo)).clamp(0.0, 1.0)
    }
}

/// Black, blue, aqua, green, yellow, orange, red, violet, white
pub fn palette(t: f32) -> u32 {
    let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
    let segments = (PALETTE.len() - 1) as f32;
    let scaled = t * segments;
    let i = (scaled.floor() as usize).min(PALETTE.len() - 2);
    let frac = scaled - i as f32;

    let (a, b) = (PALETTE[i], PALETTE[i + 1]);
    let mix = |x: u8, y: u8| (x as f32 + (y as f32 - x as f32) * frac).round() as u8;
    colors::rgb(mix(a.0, b.0), mix(a.1, b.1), mix(a.2, b.2))
}

/// Acquire, analyze and write the spectrogram PNG
pub fn run<S: SampleSource>(
    source: &mut S,
    config: &CaptureConfig,
    output: &Path,
) -> Result<CaptureSummary, CaptureError> {
    config.validate()?;
    tracing::info!(
        "[capture] gathering {} samples, {:.4} s at {} Hz",
        config.samples,
        config.samples as f32 / config.sample_rate,
        config.sample_rate
    );

    let progress = progress_bar(config.samples);
    let samples = acquire(source, config.samples, &progress)?;

    let spectrogram = Spectrogram::compute(&samples, config.window)?;
    let scale = ColorScale::from_peak(spectrogram.peak());
    tracing::debug!(
        "[capture] {} rows, scale {:e}..{:e}",
        spectrogram.rows(),
        scale.min,
        scale.max
    );

    let (width, height, pixels) = spectrogram.render(&scale);
    snapshot::write_png(width, height, &pixels, output)?;
    tracing::info!("[capture] wrote {}", output.display());

    Ok(CaptureSummary {
        output: output.to_path_buf(),
        samples: samples.len(),
        rows: spectrogram.rows(),
        bins: height,
        duration_secs: samples.len() as f32 / config.sample_rate,
        window_secs: config.window as f32 / config.sample_rate,
        bin_hz: config.sample_rate / config.window as f32,
        scale_min: scale.min,
        scale_max: scale.max,
    })
}
