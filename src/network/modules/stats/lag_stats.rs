/// Statistics for the lag module's holding buffer.
#[derive(Debug, Default)]
pub struct LagStats {
    /// Packets held at the end of the last tick
    held: usize,

    /// Highest number of packets held at once
    max_held: usize,

    /// Packets released after their deadline
    released: usize,

    /// Packets force-released because the buffer was full
    flushed: usize,
}

impl LagStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the outcome of one tick: packets released on time and the
    /// buffer occupancy left behind.
    pub fn record_tick(&mut self, released: usize, held: usize) {
        self.released += released;
        self.held = held;
        if held > self.max_held {
            self.max_held = held;
        }
    }

    /// Records a forced release of `count` packets.
    pub fn record_flush(&mut self, count: usize) {
        self.flushed += count;
    }

    pub fn current_held(&self) -> usize {
        self.held
    }

    pub fn max_held(&self) -> usize {
        self.max_held
    }

    pub fn total_released(&self) -> usize {
        self.released
    }

    pub fn total_flushed(&self) -> usize {
        self.flushed
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
