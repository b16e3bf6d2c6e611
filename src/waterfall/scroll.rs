/// Write position in the circular spectrum region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollCursor {
    position: usize,
    span: usize,
}

impl ScrollCursor {
    pub fn new(span: usize) -> Self {
        debug_assert!(span > 0);
        Self { position: 0, span }
    }

    /// Column the next spectrum is written to
    pub fn position(&self) -> usize {
        self.position
    }

    /// Column just ahead of the write head, wrapping at the span
    pub fn ahead(&self) -> usize {
        (self.position + 1) % self.span
    }

    pub fn advance(&mut self) {
        self.position = self.ahead();
    }
}
