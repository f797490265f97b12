use crate::error::Result;
use crate::network::core::queue::{PacketHandle, PacketStore};
use crate::network::modules::buffer::{admit_packets, collect_matching, PrivateBuffer};
use crate::network::modules::traits::{ModuleContext, PacketModule};
use crate::settings::throttle::{ThrottleOptions, MAX_TIMEFRAME_MS, THROTTLE_BUFFER_LIMIT};
use log::{debug, info};
use rand::rng;

/// Unit struct for the Throttle packet module.
///
/// This module implements throttling:
/// - A cycle starts on a roll of `probability`, checked once per tick
/// - While a cycle runs, matching packets are buffered
/// - When the timeframe ends OR the buffer is full, all buffered packets are
///   either released at once or dropped
///
/// This creates a "stutter" effect: packets are held then burst released.
#[derive(Debug, Default)]
pub struct ThrottleModule;

/// State maintained by the throttle module between ticks.
#[derive(Debug, Default)]
pub struct ThrottleState {
    buffer: PrivateBuffer,
    /// When the current throttle cycle started (None = not throttling)
    cycle_start_ms: Option<u64>,
}

impl PacketModule for ThrottleModule {
    type Options = ThrottleOptions;
    type State = ThrottleState;

    fn name(&self) -> &'static str {
        "throttle"
    }

    fn display_name(&self) -> &'static str {
        "Network Throttle"
    }

    fn process(
        &self,
        options: &Self::Options,
        state: &mut Self::State,
        ctx: &mut ModuleContext,
    ) -> Result<bool> {
        let now = ctx.now_ms;
        let timeframe = options.timeframe_ms.min(MAX_TIMEFRAME_MS);
        let private = state.buffer.open(ctx.store);
        let mut stats = ctx.write_stats(self.name())?;
        let throttle_stats = &mut stats.throttle_stats;

        if let Some(start) = state.cycle_start_ms {
            let elapsed = now.saturating_sub(start);
            let full = ctx.store.len(private) >= THROTTLE_BUFFER_LIMIT;
            if elapsed >= timeframe || full {
                if options.drop_throttled {
                    let mut dropped = 0;
                    while ctx.store.pop_back(private).is_some() {
                        dropped += 1;
                    }
                    throttle_stats.dropped_count += dropped;
                    debug!("Throttle cycle ended after {} ms, dropped {} packets", elapsed, dropped);
                } else {
                    let released = ctx.store.drain_into(private, ctx.shared);
                    throttle_stats.released_count += released;
                    debug!("Throttle cycle ended after {} ms, released {} packets", elapsed, released);
                }
                state.cycle_start_ms = None;
                throttle_stats.is_throttling = false;
            }
        }

        if state.cycle_start_ms.is_none() && options.probability.roll(&mut rng()) {
            state.cycle_start_ms = Some(now);
            throttle_stats.is_throttling = true;
            throttle_stats.cycles += 1;
        }

        if state.cycle_start_ms.is_some() {
            let mut candidates =
                collect_matching(ctx.store, ctx.shared, options.inbound, options.outbound)
                    .into_iter();
            admit_packets(
                ctx.store,
                private,
                &mut candidates,
                THROTTLE_BUFFER_LIMIT,
                &mut |_: &mut PacketStore, _: PacketHandle| {},
            );
        }

        Ok(state.cycle_start_ms.is_some())
    }

    fn close_down(&self, state: &mut Self::State, ctx: &mut ModuleContext) -> Result<()> {
        let returned = state.buffer.flush_into(ctx.store, ctx.shared);
        state.cycle_start_ms = None;

        let mut stats = ctx.write_stats(self.name())?;
        stats.throttle_stats.is_throttling = false;
        info!("Throttle closed, returned {} buffered packets", returned);
        Ok(())
    }
}
