//! Trait definitions for packet shaping modules.
//!
//! Every shaping module implements [`PacketModule`] and works directly on the
//! shared packet queue handed to it through a [`ModuleContext`]. A module may
//! leave packets where they are, move them into a private queue of its own,
//! move them back later, or destroy them. It must never leave a packet
//! detached from every queue.

use crate::error::{Result, SnarlError};
use crate::network::core::queue::{PacketQueue, PacketStore};
use crate::network::modules::stats::PacketProcessingStatistics;
use std::sync::{Arc, RwLock, RwLockWriteGuard};

/// Context passed to packet modules during a tick.
pub struct ModuleContext<'a> {
    /// Arena holding every packet and queue
    pub store: &'a mut PacketStore,
    /// Queue shared with the capture/injection side
    pub shared: PacketQueue,
    /// Monotonic time of the current tick, in milliseconds
    pub now_ms: u64,
    /// Statistics tracker for all modules
    pub statistics: &'a Arc<RwLock<PacketProcessingStatistics>>,
}

impl<'a> ModuleContext<'a> {
    pub fn new(
        store: &'a mut PacketStore,
        shared: PacketQueue,
        now_ms: u64,
        statistics: &'a Arc<RwLock<PacketProcessingStatistics>>,
    ) -> Self {
        Self {
            store,
            shared,
            now_ms,
            statistics,
        }
    }

    /// Locks the statistics for writing on behalf of `module`.
    pub fn write_stats(
        &self,
        module: &str,
    ) -> Result<RwLockWriteGuard<'a, PacketProcessingStatistics>> {
        self.statistics
            .write()
            .map_err(|_| SnarlError::stats_lock(module))
    }
}

/// Lifecycle and per-tick contract of a shaping module.
///
/// Modules are stateless unit structs; everything that must survive between
/// ticks lives in `State`, owned by the pipeline.
///
/// # Example
///
/// ```rust,ignore
/// struct PassModule;
///
/// impl PacketModule for PassModule {
///     type Options = ();
///     type State = ();
///
///     fn name(&self) -> &'static str {
///         "pass"
///     }
///
///     fn process(&self, _: &(), _: &mut (), _: &mut ModuleContext) -> Result<bool> {
///         Ok(false)
///     }
/// }
/// ```
pub trait PacketModule {
    /// Configuration options for this module
    type Options;

    /// Persistent state maintained between ticks
    type State: Default;

    /// Returns the unique name identifier for this module
    fn name(&self) -> &'static str;

    /// Returns the human-readable display name for this module
    fn display_name(&self) -> &'static str {
        self.name()
    }

    /// Called when the module is armed, before its first `process`.
    fn start_up(
        &self,
        _options: &Self::Options,
        _state: &mut Self::State,
        _ctx: &mut ModuleContext,
    ) -> Result<()> {
        Ok(())
    }

    /// Applies the module to the shared queue for one tick.
    ///
    /// Returns true while the module is doing work, which drives the
    /// activity indicator only.
    fn process(
        &self,
        options: &Self::Options,
        state: &mut Self::State,
        ctx: &mut ModuleContext,
    ) -> Result<bool>;

    /// Called when the module is disarmed. Modules holding packets must move
    /// every one of them back to the shared queue.
    fn close_down(&self, _state: &mut Self::State, _ctx: &mut ModuleContext) -> Result<()> {
        Ok(())
    }

    /// Check if the module should skip processing based on options.
    /// Override this for modules with skip conditions (e.g., bandwidth=0).
    fn should_skip(&self, _options: &Self::Options) -> bool {
        false
    }
}
