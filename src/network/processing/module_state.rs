//! Per-module switches shared between the control side and the shaping thread.

use crate::network::modules::registry::{ModuleKind, MODULES};
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// Observable state of one module switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum SwitchState {
    /// Disarmed; the pipeline skips the module
    Off = 0,
    /// Armed; the module runs every tick
    Armed = 1,
    /// Armed and reported pending work since the last status refresh
    Active = 2,
}

impl SwitchState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => SwitchState::Armed,
            2 => SwitchState::Active,
            _ => SwitchState::Off,
        }
    }

    pub fn is_on(self) -> bool {
        self != SwitchState::Off
    }
}

/// One atomic tri-state per module, indexed by pipeline order.
///
/// The control side only ever writes `Off` or `Armed`. The shaping thread
/// promotes `Armed` to `Active` and the status refresh demotes it again, so
/// `Active` is an activity indicator and never changes whether a module runs.
pub struct ModuleSwitches {
    slots: [AtomicU8; ModuleKind::ALL.len()],
}

impl ModuleSwitches {
    pub fn new() -> Self {
        Self {
            slots: std::array::from_fn(|_| AtomicU8::new(SwitchState::Off as u8)),
        }
    }

    /// Creates switches with `kinds` armed.
    pub fn with_enabled(kinds: &[ModuleKind]) -> Self {
        let switches = Self::new();
        for &kind in kinds {
            switches.set_enabled(kind, true);
        }
        switches
    }

    fn slot(&self, kind: ModuleKind) -> &AtomicU8 {
        &self.slots[kind.order()]
    }

    pub fn get(&self, kind: ModuleKind) -> SwitchState {
        SwitchState::from_u8(self.slot(kind).load(Ordering::Acquire))
    }

    pub fn is_enabled(&self, kind: ModuleKind) -> bool {
        self.get(kind).is_on()
    }

    /// Arms or disarms a module.
    ///
    /// Returns true only when the enabled flag actually changed. Arming an
    /// `Active` module leaves it `Active`.
    pub fn set_enabled(&self, kind: ModuleKind, enabled: bool) -> bool {
        let slot = self.slot(kind);
        if enabled {
            slot.compare_exchange(
                SwitchState::Off as u8,
                SwitchState::Armed as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
        } else {
            slot.swap(SwitchState::Off as u8, Ordering::AcqRel) != SwitchState::Off as u8
        }
    }

    /// Disarms every module. Returns the kinds that were on.
    pub fn disable_all(&self) -> Vec<ModuleKind> {
        ModuleKind::ALL
            .into_iter()
            .filter(|&kind| self.set_enabled(kind, false))
            .collect()
    }

    /// Promotes an armed module to active. Disarmed modules stay off.
    pub fn mark_active(&self, kind: ModuleKind) {
        let _ = self.slot(kind).compare_exchange(
            SwitchState::Armed as u8,
            SwitchState::Active as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }

    /// Demotes every active module back to armed.
    ///
    /// Returns the kinds that were active.
    pub fn demote_active(&self) -> Vec<ModuleKind> {
        ModuleKind::ALL
            .into_iter()
            .filter(|&kind| {
                self.slot(kind)
                    .compare_exchange(
                        SwitchState::Active as u8,
                        SwitchState::Armed as u8,
                        Ordering::AcqRel,
                        Ordering::Acquire,
                    )
                    .is_ok()
            })
            .collect()
    }

    pub fn enabled_kinds(&self) -> Vec<ModuleKind> {
        ModuleKind::ALL
            .into_iter()
            .filter(|&kind| self.is_enabled(kind))
            .collect()
    }

    pub fn snapshot(&self) -> Vec<(ModuleKind, SwitchState)> {
        ModuleKind::ALL
            .into_iter()
            .map(|kind| (kind, self.get(kind)))
            .collect()
    }

    /// Renders the enabled flags as `"lag 1, drop 0, ..."` using short names.
    pub fn describe(&self) -> String {
        MODULES
            .iter()
            .map(|entry| format!("{} {}", entry.short_name, u8::from(self.is_enabled(entry.kind))))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl Default for ModuleSwitches {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ModuleSwitches {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.snapshot()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_enabled_reports_changes() {
        let switches = ModuleSwitches::new();

        assert!(switches.set_enabled(ModuleKind::Lag, true));
        assert!(!switches.set_enabled(ModuleKind::Lag, true));
        assert_eq!(switches.get(ModuleKind::Lag), SwitchState::Armed);

        assert!(switches.set_enabled(ModuleKind::Lag, false));
        assert!(!switches.set_enabled(ModuleKind::Lag, false));
        assert_eq!(switches.get(ModuleKind::Lag), SwitchState::Off);
    }

    #[test]
    fn test_activity_indicator() {
        let switches = ModuleSwitches::with_enabled(&[ModuleKind::RateLimit]);

        switches.mark_active(ModuleKind::RateLimit);
        switches.mark_active(ModuleKind::Drop);
        assert_eq!(switches.get(ModuleKind::RateLimit), SwitchState::Active);
        assert_eq!(switches.get(ModuleKind::Drop), SwitchState::Off);

        // Re-arming an active module is not a change
        assert!(!switches.set_enabled(ModuleKind::RateLimit, true));
        assert_eq!(switches.get(ModuleKind::RateLimit), SwitchState::Active);

        assert_eq!(switches.demote_active(), vec![ModuleKind::RateLimit]);
        assert_eq!(switches.get(ModuleKind::RateLimit), SwitchState::Armed);
        assert!(switches.demote_active().is_empty());

        switches.mark_active(ModuleKind::RateLimit);
        assert!(switches.set_enabled(ModuleKind::RateLimit, false));
    }

    #[test]
    fn test_describe_uses_short_names() {
        let switches = ModuleSwitches::with_enabled(&[ModuleKind::Lag, ModuleKind::Reorder]);

        assert_eq!(
            switches.describe(),
            "lag 1, drop 0, throttle 0, duplicate 0, ood 1, tamper 0, reset 0, bandwidth 0, ratelimit 0"
        );
        assert_eq!(
            switches.enabled_kinds(),
            vec![ModuleKind::Lag, ModuleKind::Reorder]
        );
    }

    #[test]
    fn test_disable_all() {
        let switches = ModuleSwitches::with_enabled(&[ModuleKind::Drop, ModuleKind::Tamper]);
        assert_eq!(
            switches.disable_all(),
            vec![ModuleKind::Drop, ModuleKind::Tamper]
        );
        assert!(switches.enabled_kinds().is_empty());
    }
}
