//! Decimation scheduler: one full redraw every `decimation` blocks

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Analyze, draw a spectrum column, rebuild the histogram, advance
    Full,
    /// Repaint the write-head markers only
    Light,
}

/// Modular counter that decides the phase of each loop iteration.
///
/// Every block is read so the serial device never backs up, but only one in
/// `decimation` is drawn. A screen width then spans `decimation` times more
/// wall-clock time than the raw block rate would give.
#[derive(Debug, Clone)]
pub struct Scheduler {
    counter: usize,
    decimation: usize,
}

impl Scheduler {
    pub fn new(decimation: usize) -> Self {
        Self {
            counter: 0,
            decimation: decimation.max(1),
        }
    }

    pub fn phase(&self) -> Phase {
        if self.counter == 0 {
            Phase::Full
        } else {
            Phase::Light
        }
    }

    pub fn tick(&mut self) {
        self.counter = (self.counter + 1) % self.decimation;
    }

    pub fn decimation(&self) -> usize {
        self.decimation
    }
}
