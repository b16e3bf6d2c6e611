//! Acquisition and render loop
//!
//! One iteration per block read from the device:
//! 1. drain display events (quit, snapshot)
//! 2. read a block; end of stream stops the loop
//! 3. full or light waterfall update, as scheduled
//! 4. present the framebuffer
//! 5. tick the decimation counter

use crate::config::Settings;
use crate::display::{Display, UiEvent};
use crate::dsp::{BUCKETS, DbRange, SpectrumAnalyzer, SpectrumConfig};
use crate::snapshot::Snapshotter;
use crate::source::{SampleBlock, SampleSource};
use crate::waterfall::{Framebuffer, LayoutError, Phase, Scheduler, Waterfall};
use anyhow::{Context, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Quit,
    EndOfStream,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub blocks: u64,
    pub full_cycles: u64,
    pub snapshots: u64,
    pub failed_snapshots: u64,
    pub reason: StopReason,
}

pub struct App {
    analyzer: SpectrumAnalyzer,
    waterfall: Waterfall,
    scheduler: Scheduler,
}

impl App {
    pub fn new(
        spectrum: SpectrumConfig,
        width: usize,
        decimation: usize,
    ) -> Result<Self, LayoutError> {
        let analyzer = SpectrumAnalyzer::new(spectrum);
        let waterfall = Waterfall::new(width, analyzer.bins())?;

        Ok(Self {
            analyzer,
            waterfall,
            scheduler: Scheduler::new(decimation),
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, LayoutError> {
        Self::new(
            SpectrumConfig {
                block_size: settings.block_size,
                db_range: DbRange::new(settings.min_db, settings.max_db),
                remove_dc: settings.remove_dc,
            },
            settings.width,
            settings.decimation,
        )
    }

    pub fn framebuffer(&self) -> &Framebuffer {
        self.waterfall.framebuffer()
    }

    /// Run the scheduled phase for one block. Does not tick the scheduler.
    pub fn update(&mut self, block: &SampleBlock) -> Phase {
        let phase = self.scheduler.phase();
        match phase {
            Phase::Full => {
                let magnitudes = self.analyzer.analyze(block);
                let column = self.analyzer.colorize(&magnitudes);
                self.waterfall.full_update(&column, block);

                let counts = self.waterfall.histogram().counts();
                let clipped = counts[0] + counts[BUCKETS - 1];
                if clipped > 0 {
                    tracing::debug!(
                        "[loop] {} of {} samples at full scale",
                        clipped,
                        block.len()
                    );
                }
            }
            Phase::Light => self.waterfall.light_update(),
        }
        phase
    }

    pub fn run<S, D>(
        &mut self,
        source: &mut S,
        display: &mut D,
        snapshots: &Snapshotter,
    ) -> Result<RunSummary>
    where
        S: SampleSource,
        D: Display,
    {
        let mut summary = RunSummary {
            blocks: 0,
            full_cycles: 0,
            snapshots: 0,
            failed_snapshots: 0,
            reason: StopReason::EndOfStream,
        };

        tracing::info!(
            "[loop] starting: {} bins, {} spectrum columns, decimation {}",
            self.analyzer.bins(),
            self.framebuffer().spectrum_span(),
            self.scheduler.decimation()
        );

        'acquire: loop {
            for event in display.poll_events() {
                match event {
                    UiEvent::Quit => {
                        tracing::info!("[loop] quit requested");
                        summary.reason = StopReason::Quit;
                        break 'acquire;
                    }
                    UiEvent::Snapshot => self.snapshot(snapshots, &mut summary),
                }
            }

            let Some(block) = source
                .read_block()
                .context("Failed to read from sample source")?
            else {
                tracing::info!("[loop] sample stream ended");
                summary.reason = StopReason::EndOfStream;
                break;
            };
            summary.blocks += 1;

            if self.update(&block) == Phase::Full {
                summary.full_cycles += 1;
            }

            display.present(self.waterfall.framebuffer())?;
            self.scheduler.tick();
        }

        Ok(summary)
    }

    fn snapshot(&self, snapshots: &Snapshotter, summary: &mut RunSummary) {
        match snapshots.save(self.waterfall.framebuffer()) {
            Ok(path) => {
                tracing::info!(
                    "[snapshot] saved {} (write head at column {})",
                    path.display(),
                    self.waterfall.cursor()
                );
                summary.snapshots += 1;
            }
            Err(e) => {
                tracing::warn!("[snapshot] {}", e);
                summary.failed_snapshots += 1;
            }
        }
    }
}
