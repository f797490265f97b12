pub mod bandwidth;
pub mod buffer;
pub mod drop;
pub mod duplicate;
pub mod lag;
pub mod rate_limit;
pub mod registry;
pub mod reorder;
pub mod reset;
pub mod stats;
pub mod tamper;
pub mod throttle;
pub mod traits;

#[cfg(test)]
pub(crate) mod testing;

// Re-export module structs for convenience
pub use bandwidth::BandwidthModule;
pub use drop::DropModule;
pub use duplicate::DuplicateModule;
pub use lag::LagModule;
pub use rate_limit::RateLimitModule;
pub use registry::{ModuleKind, ShapingModule};
pub use reorder::ReorderModule;
pub use reset::ResetModule;
pub use tamper::TamperModule;
pub use throttle::ThrottleModule;
pub use traits::{ModuleContext, PacketModule};
