//! Module registry.
//!
//! [`MODULES`] lists every shaping module in pipeline order. Adding a module
//! means adding a [`ModuleKind`] variant, a [`ShapingModule`] variant holding
//! its state, and an entry here; the match arms below then point out every
//! place that still needs wiring.

use crate::error::{Result, SnarlError};
use crate::network::modules::bandwidth::BandwidthState;
use crate::network::modules::lag::LagState;
use crate::network::modules::rate_limit::RateLimitState;
use crate::network::modules::reorder::ReorderState;
use crate::network::modules::throttle::ThrottleState;
use crate::network::modules::traits::{ModuleContext, PacketModule};
use crate::network::modules::{
    BandwidthModule, DropModule, DuplicateModule, LagModule, RateLimitModule, ReorderModule,
    ResetModule, TamperModule, ThrottleModule,
};
use crate::settings::Settings;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifies one shaping module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleKind {
    Lag,
    Drop,
    Throttle,
    Duplicate,
    Reorder,
    Tamper,
    Reset,
    Bandwidth,
    RateLimit,
}

/// Static description of a registered module.
pub struct ModuleEntry {
    pub kind: ModuleKind,
    /// Unique identifier, also used in config files
    pub name: &'static str,
    /// Human-readable display name
    pub display_name: &'static str,
    /// Short tag used in telemetry
    pub short_name: &'static str,
}

/// Every module, in the order the pipeline runs them.
pub const MODULES: &[ModuleEntry] = &[
    ModuleEntry {
        kind: ModuleKind::Lag,
        name: "lag",
        display_name: "Lag",
        short_name: "lag",
    },
    ModuleEntry {
        kind: ModuleKind::Drop,
        name: "drop",
        display_name: "Packet Drop",
        short_name: "drop",
    },
    ModuleEntry {
        kind: ModuleKind::Throttle,
        name: "throttle",
        display_name: "Network Throttle",
        short_name: "throttle",
    },
    ModuleEntry {
        kind: ModuleKind::Duplicate,
        name: "duplicate",
        display_name: "Packet Duplication",
        short_name: "duplicate",
    },
    ModuleEntry {
        kind: ModuleKind::Reorder,
        name: "reorder",
        display_name: "Packet Reordering",
        short_name: "ood",
    },
    ModuleEntry {
        kind: ModuleKind::Tamper,
        name: "tamper",
        display_name: "Packet Tampering",
        short_name: "tamper",
    },
    ModuleEntry {
        kind: ModuleKind::Reset,
        name: "reset",
        display_name: "Connection Reset",
        short_name: "reset",
    },
    ModuleEntry {
        kind: ModuleKind::Bandwidth,
        name: "bandwidth",
        display_name: "Bandwidth Limiter",
        short_name: "bandwidth",
    },
    ModuleEntry {
        kind: ModuleKind::RateLimit,
        name: "rate_limit",
        display_name: "Rate Limit",
        short_name: "ratelimit",
    },
];

/// Get the total number of registered modules.
pub const fn module_count() -> usize {
    MODULES.len()
}

/// Get all module names, in pipeline order.
pub fn module_names() -> impl Iterator<Item = &'static str> {
    MODULES.iter().map(|m| m.name)
}

/// Find a module by name.
pub fn find_module(name: &str) -> Option<&'static ModuleEntry> {
    MODULES.iter().find(|m| m.name == name)
}

impl ModuleKind {
    /// Every kind, in pipeline order.
    pub const ALL: [ModuleKind; 9] = [
        ModuleKind::Lag,
        ModuleKind::Drop,
        ModuleKind::Throttle,
        ModuleKind::Duplicate,
        ModuleKind::Reorder,
        ModuleKind::Tamper,
        ModuleKind::Reset,
        ModuleKind::Bandwidth,
        ModuleKind::RateLimit,
    ];

    /// Position in the pipeline, starting at 0.
    pub fn order(self) -> usize {
        self as usize
    }

    pub fn entry(self) -> &'static ModuleEntry {
        &MODULES[self.order()]
    }

    pub fn name(self) -> &'static str {
        self.entry().name
    }

    pub fn display_name(self) -> &'static str {
        self.entry().display_name
    }

    pub fn short_name(self) -> &'static str {
        self.entry().short_name
    }
}

impl fmt::Display for ModuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ModuleKind {
    type Err = SnarlError;

    fn from_str(s: &str) -> Result<Self> {
        let name = s.trim().to_ascii_lowercase().replace('-', "_");
        find_module(&name)
            .map(|entry| entry.kind)
            .ok_or_else(|| SnarlError::UnknownModule(s.to_string()))
    }
}

/// A module together with the state it keeps between ticks.
///
/// Stateless modules carry nothing; the pipeline owns one value per kind.
#[derive(Debug)]
pub enum ShapingModule {
    Lag(LagState),
    Drop,
    Throttle(ThrottleState),
    Duplicate,
    Reorder(ReorderState),
    Tamper,
    Reset,
    Bandwidth(BandwidthState),
    RateLimit(RateLimitState),
}

impl ShapingModule {
    /// Creates a module of `kind` with fresh state.
    pub fn new(kind: ModuleKind) -> Self {
        match kind {
            ModuleKind::Lag => ShapingModule::Lag(LagState::default()),
            ModuleKind::Drop => ShapingModule::Drop,
            ModuleKind::Throttle => ShapingModule::Throttle(ThrottleState::default()),
            ModuleKind::Duplicate => ShapingModule::Duplicate,
            ModuleKind::Reorder => ShapingModule::Reorder(ReorderState::default()),
            ModuleKind::Tamper => ShapingModule::Tamper,
            ModuleKind::Reset => ShapingModule::Reset,
            ModuleKind::Bandwidth => ShapingModule::Bandwidth(BandwidthState::default()),
            ModuleKind::RateLimit => ShapingModule::RateLimit(RateLimitState::default()),
        }
    }

    pub fn kind(&self) -> ModuleKind {
        match self {
            ShapingModule::Lag(_) => ModuleKind::Lag,
            ShapingModule::Drop => ModuleKind::Drop,
            ShapingModule::Throttle(_) => ModuleKind::Throttle,
            ShapingModule::Duplicate => ModuleKind::Duplicate,
            ShapingModule::Reorder(_) => ModuleKind::Reorder,
            ShapingModule::Tamper => ModuleKind::Tamper,
            ShapingModule::Reset => ModuleKind::Reset,
            ShapingModule::Bandwidth(_) => ModuleKind::Bandwidth,
            ShapingModule::RateLimit(_) => ModuleKind::RateLimit,
        }
    }

    pub fn start_up(&mut self, settings: &Settings, ctx: &mut ModuleContext) -> Result<()> {
        match self {
            ShapingModule::Lag(state) => LagModule.start_up(&settings.lag, state, ctx),
            ShapingModule::Drop => DropModule.start_up(&settings.drop, &mut (), ctx),
            ShapingModule::Throttle(state) => {
                ThrottleModule.start_up(&settings.throttle, state, ctx)
            }
            ShapingModule::Duplicate => {
                DuplicateModule.start_up(&settings.duplicate, &mut (), ctx)
            }
            ShapingModule::Reorder(state) => ReorderModule.start_up(&settings.reorder, state, ctx),
            ShapingModule::Tamper => TamperModule.start_up(&settings.tamper, &mut (), ctx),
            ShapingModule::Reset => ResetModule.start_up(&settings.reset, &mut (), ctx),
            ShapingModule::Bandwidth(state) => {
                BandwidthModule.start_up(&settings.bandwidth, state, ctx)
            }
            ShapingModule::RateLimit(state) => {
                RateLimitModule.start_up(&settings.rate_limit, state, ctx)
            }
        }
    }

    /// Runs one tick of the module unless its options make it a no-op.
    ///
    /// Returns true while the module has work in progress.
    pub fn process(&mut self, settings: &Settings, ctx: &mut ModuleContext) -> Result<bool> {
        match self {
            ShapingModule::Lag(state) => process_module(&LagModule, &settings.lag, state, ctx),
            ShapingModule::Drop => process_module(&DropModule, &settings.drop, &mut (), ctx),
            ShapingModule::Throttle(state) => {
                process_module(&ThrottleModule, &settings.throttle, state, ctx)
            }
            ShapingModule::Duplicate => {
                process_module(&DuplicateModule, &settings.duplicate, &mut (), ctx)
            }
            ShapingModule::Reorder(state) => {
                process_module(&ReorderModule, &settings.reorder, state, ctx)
            }
            ShapingModule::Tamper => process_module(&TamperModule, &settings.tamper, &mut (), ctx),
            ShapingModule::Reset => process_module(&ResetModule, &settings.reset, &mut (), ctx),
            ShapingModule::Bandwidth(state) => {
                process_module(&BandwidthModule, &settings.bandwidth, state, ctx)
            }
            ShapingModule::RateLimit(state) => {
                process_module(&RateLimitModule, &settings.rate_limit, state, ctx)
            }
        }
    }

    /// Returns every held packet to the shared queue.
    pub fn close_down(&mut self, ctx: &mut ModuleContext) -> Result<()> {
        match self {
            ShapingModule::Lag(state) => LagModule.close_down(state, ctx),
            ShapingModule::Drop => DropModule.close_down(&mut (), ctx),
            ShapingModule::Throttle(state) => ThrottleModule.close_down(state, ctx),
            ShapingModule::Duplicate => DuplicateModule.close_down(&mut (), ctx),
            ShapingModule::Reorder(state) => ReorderModule.close_down(state, ctx),
            ShapingModule::Tamper => TamperModule.close_down(&mut (), ctx),
            ShapingModule::Reset => ResetModule.close_down(&mut (), ctx),
            ShapingModule::Bandwidth(state) => BandwidthModule.close_down(state, ctx),
            ShapingModule::RateLimit(state) => RateLimitModule.close_down(state, ctx),
        }
    }
}

/// Generic module processor that handles the skip check shared by every module.
pub fn process_module<M>(
    module: &M,
    options: &M::Options,
    state: &mut M::State,
    ctx: &mut ModuleContext,
) -> Result<bool>
where
    M: PacketModule,
{
    if module.should_skip(options) {
        return Ok(false);
    }

    module.process(options, state, ctx)
}
