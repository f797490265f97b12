/// Statistics for the throttle module.
#[derive(Debug, Default)]
pub struct ThrottleStats {
    /// Whether a throttle cycle is currently buffering packets
    pub(crate) is_throttling: bool,

    /// Number of throttle cycles started
    pub(crate) cycles: usize,

    /// Packets released at the end of a cycle
    pub(crate) released_count: usize,

    /// Packets destroyed at the end of a cycle (drop mode)
    pub(crate) dropped_count: usize,
}

impl ThrottleStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_throttling(&self) -> bool {
        self.is_throttling
    }

    pub fn cycles(&self) -> usize {
        self.cycles
    }

    pub fn released_count(&self) -> usize {
        self.released_count
    }

    pub fn dropped_count(&self) -> usize {
        self.dropped_count
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new() {
        let stats = ThrottleStats::new();
        assert!(!stats.is_throttling(), "New stats should not be throttling");
        assert_eq!(stats.dropped_count(), 0);
        assert_eq!(stats.cycles(), 0);
    }

    #[test]
    fn test_reset() {
        let mut stats = ThrottleStats {
            is_throttling: true,
            cycles: 2,
            released_count: 4,
            dropped_count: 10,
        };

        stats.reset();

        assert!(!stats.is_throttling(), "Stats should not be throttling after reset");
        assert_eq!(stats.released_count(), 0);
        assert_eq!(stats.dropped_count(), 0);
    }
}
