//! Scrolling spectrum history with a live amplitude histogram
//!
//! The [`Waterfall`] owns the framebuffer shown on screen. Spectrum columns
//! are written at the scroll cursor, which wraps around the spectrum region;
//! the histogram region to the right of the red separator is redrawn in full
//! on every full cycle.

mod buffer;
pub mod colors;
mod schedule;
mod scroll;

pub use buffer::{Framebuffer, LayoutError};
pub use schedule::{Phase, Scheduler};
use scroll::ScrollCursor;

use crate::dsp::{BUCKETS, Histogram};
use crate::source::SampleBlock;

/// Blocks read per visible scroll step
pub const DECIMATION: usize = 340;

pub const HISTOGRAM_WIDTH: usize = BUCKETS;
pub const SEPARATOR_WIDTH: usize = 1;

/// Room for the histogram, the separator and the two marker columns
pub const MIN_WIDTH: usize = HISTOGRAM_WIDTH + SEPARATOR_WIDTH + 2;

pub struct Waterfall {
    framebuffer: Framebuffer,
    cursor: ScrollCursor,
    histogram: Histogram,
}

impl Waterfall {
    pub fn new(width: usize, height: usize) -> Result<Self, LayoutError> {
        let framebuffer = Framebuffer::new(width, height)?;
        let mut waterfall = Self {
            cursor: ScrollCursor::new(framebuffer.spectrum_span()),
            histogram: Histogram::new(height),
            framebuffer,
        };
        waterfall.paint_markers();
        Ok(waterfall)
    }

    /// Store a spectrum column, rebuild the histogram from `block` and move
    /// the write head one column on.
    pub fn full_update(&mut self, column: &[u32], block: &SampleBlock) {
        self.framebuffer.write_column(self.cursor.position(), column);

        self.histogram.accumulate(block);
        self.histogram.render_into(&mut self.framebuffer);

        self.cursor.advance();
        self.paint_markers();
    }

    /// Keep the write head visible without touching stored data
    pub fn light_update(&mut self) {
        self.paint_markers();
    }

    fn paint_markers(&mut self) {
        self.framebuffer.fill_column(self.cursor.position(), colors::WRITE_HEAD);
        self.framebuffer.fill_column(self.cursor.ahead(), colors::BLACK);
    }

    pub fn cursor(&self) -> usize {
        self.cursor.position()
    }

    pub fn framebuffer(&self) -> &Framebuffer {
        &self.framebuffer
    }

    pub fn histogram(&self) -> &Histogram {
        &self.histogram
    }
}
