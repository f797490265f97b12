use crate::network::modules::stats::bandwidth_stats::BandwidthStats;
use crate::network::modules::stats::drop_stats::DropStats;
use crate::network::modules::stats::duplicate_stats::DuplicateStats;
use crate::network::modules::stats::lag_stats::LagStats;
use crate::network::modules::stats::rate_limit_stats::RateLimitStats;
use crate::network::modules::stats::reorder_stats::ReorderStats;
use crate::network::modules::stats::reset_stats::ResetStats;
use crate::network::modules::stats::tamper_stats::TamperStats;
use crate::network::modules::stats::throttle_stats::ThrottleStats;

pub mod bandwidth_stats;
pub mod drop_stats;
pub mod duplicate_stats;
pub mod lag_stats;
pub mod rate_limit_stats;
pub mod rate_stats;
pub mod reorder_stats;
pub mod reset_stats;
pub mod tamper_stats;
pub mod throttle_stats;
pub mod util;

/// Statistics collection for all packet processing modules
///
/// Shared between the shaping thread (writer) and the status/control surface
/// (readers) behind an `Arc<RwLock<_>>`.
#[derive(Debug)]
pub struct PacketProcessingStatistics {
    /// Statistics for packet dropping
    pub drop_stats: DropStats,
    /// Statistics for packet lag
    pub lag_stats: LagStats,
    /// Statistics for throttling
    pub throttle_stats: ThrottleStats,
    /// Statistics for packet duplication
    pub duplicate_stats: DuplicateStats,
    /// Statistics for packet reordering
    pub reorder_stats: ReorderStats,
    /// Statistics for packet tampering
    pub tamper_stats: TamperStats,
    /// Statistics for connection resets
    pub reset_stats: ResetStats,
    /// Statistics for the static bandwidth cap
    pub bandwidth_stats: BandwidthStats,
    /// Status of the rate limiter
    pub rate_limit_stats: RateLimitStats,
}

impl Default for PacketProcessingStatistics {
    fn default() -> Self {
        Self {
            drop_stats: DropStats::new(0.005),
            lag_stats: LagStats::new(),
            throttle_stats: ThrottleStats::new(),
            duplicate_stats: DuplicateStats::new(0.005),
            reorder_stats: ReorderStats::new(0.005),
            tamper_stats: TamperStats::new(),
            reset_stats: ResetStats::new(),
            bandwidth_stats: BandwidthStats::new(0.005),
            rate_limit_stats: RateLimitStats::new(),
        }
    }
}
