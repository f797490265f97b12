//! The ordered chain of shaping modules run once per tick.

use crate::error::Result;
use crate::network::modules::registry::{ModuleKind, ShapingModule};
use crate::network::modules::traits::ModuleContext;
use crate::network::processing::module_state::ModuleSwitches;
use crate::settings::Settings;
use log::info;

/// Every shaping module in pipeline order, together with its lifecycle state.
#[derive(Debug)]
pub struct Pipeline {
    modules: Vec<ShapingModule>,
    started: Vec<bool>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self {
            modules: ModuleKind::ALL.into_iter().map(ShapingModule::new).collect(),
            started: vec![false; ModuleKind::ALL.len()],
        }
    }

    /// Runs one tick over the shared queue.
    ///
    /// A module that was armed since the last tick is started before it
    /// processes. A module that was disarmed is closed down, which returns its
    /// held packets to the shared queue, and then skipped.
    pub fn tick(
        &mut self,
        settings: &Settings,
        switches: &ModuleSwitches,
        ctx: &mut ModuleContext,
    ) -> Result<()> {
        for (module, started) in self.modules.iter_mut().zip(self.started.iter_mut()) {
            let kind = module.kind();

            if !switches.is_enabled(kind) {
                if *started {
                    module.close_down(ctx)?;
                    *started = false;
                    info!("{} disarmed", kind.display_name());
                }
                continue;
            }

            if !*started {
                module.start_up(settings, ctx)?;
                *started = true;
                info!("{} armed", kind.display_name());
            }

            if module.process(settings, ctx)? {
                switches.mark_active(kind);
            }
        }

        Ok(())
    }

    /// Closes every started module. Returns how many were closed.
    pub fn close_all(&mut self, ctx: &mut ModuleContext) -> Result<usize> {
        let mut closed = 0;
        for (module, started) in self.modules.iter_mut().zip(self.started.iter_mut()) {
            if *started {
                module.close_down(ctx)?;
                *started = false;
                closed += 1;
            }
        }
        Ok(closed)
    }

    pub fn is_started(&self, kind: ModuleKind) -> bool {
        self.started[kind.order()]
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}
