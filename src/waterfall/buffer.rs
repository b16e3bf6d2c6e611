//! Owned packed-color framebuffer with fixed spectrum, separator and histogram regions
//!
//! Layout for a `W x H` buffer:
//!
//! ```text
//! 0                  W-257   W-256            W
//! | spectrum history  | sep  | histogram (256) |
//! ```

use super::colors;
use super::{HISTOGRAM_WIDTH, MIN_WIDTH, SEPARATOR_WIDTH};
use std::ops::Range;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum LayoutError {
    #[error("width {0} is too narrow for the spectrum, separator and histogram regions")]
    TooNarrow(usize),
    #[error("framebuffer height must be non-zero")]
    ZeroHeight,
}

#[derive(Debug, Clone)]
pub struct Framebuffer {
    width: usize,
    height: usize,
    pixels: Vec<u32>,
}

impl Framebuffer {
    pub fn new(width: usize, height: usize) -> Result<Self, LayoutError> {
        if width < MIN_WIDTH {
            return Err(LayoutError::TooNarrow(width));
        }
        if height == 0 {
            return Err(LayoutError::ZeroHeight);
        }

        let mut framebuffer = Self {
            width,
            height,
            pixels: vec![colors::BLACK; width * height],
        };
        let separator = framebuffer.separator_x();
        framebuffer.fill_rows(separator, 0..height, colors::SEPARATOR);
        Ok(framebuffer)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Row-major pixels, `y * width + x`
    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    /// Number of columns in the scrolling spectrum region
    pub fn spectrum_span(&self) -> usize {
        self.width - HISTOGRAM_WIDTH - SEPARATOR_WIDTH
    }

    pub fn separator_x(&self) -> usize {
        self.spectrum_span()
    }

    pub fn histogram_x(&self, bucket: usize) -> usize {
        debug_assert!(bucket < HISTOGRAM_WIDTH);
        self.width - HISTOGRAM_WIDTH + bucket
    }

    pub fn set(&mut self, x: usize, y: usize, color: u32) {
        self.pixels[y * self.width + x] = color;
    }

    #[cfg(test)]
    pub fn get(&self, x: usize, y: usize) -> u32 {
        self.pixels[y * self.width + x]
    }

    #[cfg(test)]
    pub fn column(&self, x: usize) -> Vec<u32> {
        (0..self.height).map(|y| self.get(x, y)).collect()
    }

    /// Copy `column` top-down into column `x`. Missing rows are blacked out.
    pub fn write_column(&mut self, x: usize, column: &[u32]) {
        debug_assert_ne!(x, self.separator_x(), "separator column is fixed");
        for y in 0..self.height {
            let color = column.get(y).copied().unwrap_or(colors::BLACK);
            self.set(x, y, color);
        }
    }

    pub fn fill_column(&mut self, x: usize, color: u32) {
        debug_assert_ne!(x, self.separator_x(), "separator column is fixed");
        self.fill_rows(x, 0..self.height, color);
    }

    pub fn fill_rows(&mut self, x: usize, rows: Range<usize>, color: u32) {
        for y in rows {
            self.set(x, y, color);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout() {
        let framebuffer = Framebuffer::new(1300, 513).unwrap();
        assert_eq!(framebuffer.pixels().len(), 1300 * 513);
        assert_eq!(framebuffer.spectrum_span(), 1043);
        assert_eq!(framebuffer.separator_x(), 1043);
        assert_eq!(framebuffer.histogram_x(0), 1044);
        assert_eq!(framebuffer.histogram_x(255), 1299);
    }

    #[test]
    fn test_separator_painted_red() {
        let framebuffer = Framebuffer::new(400, 20).unwrap();
        let separator = framebuffer.column(framebuffer.separator_x());
        assert!(separator.iter().all(|&p| p == colors::SEPARATOR));
        assert_eq!(framebuffer.get(0, 0), colors::BLACK);
    }

    #[test]
    fn test_rejects_bad_dimensions() {
        assert_eq!(
            Framebuffer::new(MIN_WIDTH - 1, 10).unwrap_err(),
            LayoutError::TooNarrow(MIN_WIDTH - 1)
        );
        assert_eq!(
            Framebuffer::new(MIN_WIDTH, 0).unwrap_err(),
            LayoutError::ZeroHeight
        );
        assert!(Framebuffer::new(MIN_WIDTH, 1).is_ok());
    }

    #[test]
    fn test_write_column_pads_short_input() {
        let mut framebuffer = Framebuffer::new(300, 4).unwrap();
        framebuffer.fill_column(2, colors::WHITE);
        framebuffer.write_column(2, &[1, 2]);
        assert_eq!(framebuffer.column(2), vec![1, 2, colors::BLACK, colors::BLACK]);
    }
}
