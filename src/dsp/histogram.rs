//! Amplitude distribution of the most recent block

use crate::source::SampleBlock;
use crate::waterfall::Framebuffer;
use crate::waterfall::colors;

/// One bucket per 8-bit amplitude value
pub const BUCKETS: usize = 256;

/// Per-block amplitude histogram, rebuilt from scratch on every full cycle
#[derive(Debug)]
pub struct Histogram {
    counts: [usize; BUCKETS],
    heights: [usize; BUCKETS],
    height: usize,
}

impl Histogram {
    /// `height` is the tallest a bar may get, normally the framebuffer height
    pub fn new(height: usize) -> Self {
        Self {
            counts: [0; BUCKETS],
            heights: [0; BUCKETS],
            height,
        }
    }

    /// Count every sample of `block` and rescale to bar heights.
    ///
    /// The scale is fixed at `height / N`, so a block where every sample has
    /// the same value fills its bar to the top.
    pub fn accumulate(&mut self, block: &SampleBlock) -> &[usize; BUCKETS] {
        self.counts = [0; BUCKETS];
        for bucket in block.buckets() {
            self.counts[bucket] += 1;
        }

        let total = block.len();
        for (height, &count) in self.heights.iter_mut().zip(self.counts.iter()) {
            *height = if total == 0 {
                0
            } else {
                count * self.height / total
            };
        }

        &self.heights
    }

    pub fn counts(&self) -> &[usize; BUCKETS] {
        &self.counts
    }

    /// Overwrite the histogram region with bottom-anchored bars
    pub fn render_into(&self, framebuffer: &mut Framebuffer) {
        let rows = framebuffer.height();
        for (bucket, &bar) in self.heights.iter().enumerate() {
            let x = framebuffer.histogram_x(bucket);
            let top = rows - bar.min(rows);
            framebuffer.fill_rows(x, 0..top, colors::BLACK);
            framebuffer.fill_rows(x, top..rows, colors::HISTOGRAM_BAR);
        }
    }
}
