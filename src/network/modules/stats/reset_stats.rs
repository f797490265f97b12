/// Statistics for connection reset injection.
#[derive(Debug, Default)]
pub struct ResetStats {
    /// TCP segments that matched the direction filter
    pub(crate) inspected: usize,

    /// Segments that had the RST flag set
    pub(crate) reset: usize,

    /// Matching packets that were not TCP and passed untouched
    pub(crate) skipped_non_tcp: usize,
}

impl ResetStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inspected(&self) -> usize {
        self.inspected
    }

    pub fn reset_count(&self) -> usize {
        self.reset
    }

    pub fn skipped_non_tcp(&self) -> usize {
        self.skipped_non_tcp
    }
}
