/// Statistics for payload tampering.
///
/// Besides counters, keeps a copy of the most recently tampered packet and a
/// per-byte flag of which bytes changed, for display.
#[derive(Debug, Default)]
pub struct TamperStats {
    pub(crate) tampered_packets: usize,

    pub(crate) tampered_bytes: usize,

    pub(crate) checksums_recomputed: usize,

    pub(crate) last_sample: Vec<u8>,

    pub(crate) last_flags: Vec<bool>,
}

impl TamperStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one tampered packet by comparing it with its original bytes.
    pub fn record(&mut self, original: &[u8], tampered: &[u8], checksum_recomputed: bool) {
        self.tampered_packets += 1;
        if checksum_recomputed {
            self.checksums_recomputed += 1;
        }

        self.last_flags = original
            .iter()
            .zip(tampered)
            .map(|(before, after)| before != after)
            .collect();
        self.tampered_bytes += self.last_flags.iter().filter(|&&changed| changed).count();
        self.last_sample = tampered.to_vec();
    }

    pub fn tampered_packets(&self) -> usize {
        self.tampered_packets
    }

    pub fn tampered_bytes(&self) -> usize {
        self.tampered_bytes
    }

    pub fn checksums_recomputed(&self) -> usize {
        self.checksums_recomputed
    }

    pub fn last_sample(&self) -> &[u8] {
        &self.last_sample
    }

    pub fn last_flags(&self) -> &[bool] {
        &self.last_flags
    }
}
