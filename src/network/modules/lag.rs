use crate::error::Result;
use crate::network::core::queue::{PacketHandle, PacketStore};
use crate::network::modules::buffer::{
    admit_packets, collect_matching, draw_deadline, release_oldest, PrivateBuffer,
};
use crate::network::modules::traits::{ModuleContext, PacketModule};
use crate::settings::lag::{LagOptions, MAX_LAG_MS};
use log::{info, warn};
use rand::rng;

/// Maximum number of packets held by the lag module.
pub const LAG_BUFFER_CAPACITY: usize = 2_000;

/// Packets force-released when the lag buffer is full.
pub const LAG_FLUSH_BATCH: usize = 800;

/// Unit struct for the Lag packet module.
///
/// This module simulates network latency by holding every matching packet
/// until `time_ms ± variation_ms` has passed since it was seen.
#[derive(Debug, Default)]
pub struct LagModule;

/// State maintained by the lag module between ticks.
#[derive(Debug, Default)]
pub struct LagState {
    buffer: PrivateBuffer,
}

impl PacketModule for LagModule {
    type Options = LagOptions;
    type State = LagState;

    fn name(&self) -> &'static str {
        "lag"
    }

    fn display_name(&self) -> &'static str {
        "Lag"
    }

    fn start_up(
        &self,
        options: &Self::Options,
        state: &mut Self::State,
        ctx: &mut ModuleContext,
    ) -> Result<()> {
        state.buffer.open(ctx.store);
        info!(
            "Lag started: {}±{} ms",
            options.time_ms, options.variation_ms
        );
        Ok(())
    }

    /// Holds incoming packets and releases the ones whose deadline passed.
    ///
    /// 1. Matching packets on the shared queue move into the lag buffer with a
    ///    deadline drawn around `now + time_ms`
    /// 2. A full buffer force-releases its oldest packets
    /// 3. Packets at the back of the buffer whose deadline has passed go back
    ///    to the shared queue, stopping at the first one still due later
    fn process(
        &self,
        options: &Self::Options,
        state: &mut Self::State,
        ctx: &mut ModuleContext,
    ) -> Result<bool> {
        let mut rng = rng();
        let now = ctx.now_ms;
        let time_ms = options.time_ms.min(MAX_LAG_MS);
        let variation_ms = options.variation_ms.min(MAX_LAG_MS);
        let private = state.buffer.open(ctx.store);

        let mut candidates =
            collect_matching(ctx.store, ctx.shared, options.inbound, options.outbound).into_iter();
        let mut assign_deadline = |store: &mut PacketStore, handle: PacketHandle| {
            if let Some(packet) = store.get_mut(handle) {
                packet.send_deadline_ms = draw_deadline(&mut rng, now, time_ms, variation_ms);
            }
        };

        admit_packets(
            ctx.store,
            private,
            &mut candidates,
            LAG_BUFFER_CAPACITY,
            &mut assign_deadline,
        );

        let mut flushed = 0;
        if ctx.store.len(private) >= LAG_BUFFER_CAPACITY {
            flushed = release_oldest(ctx.store, private, ctx.shared, LAG_FLUSH_BATCH);
            warn!("Lag buffer full, flushed {} packets early", flushed);
            admit_packets(
                ctx.store,
                private,
                &mut candidates,
                LAG_BUFFER_CAPACITY,
                &mut assign_deadline,
            );
        }

        let mut released = 0;
        while let Some(handle) = ctx.store.back(private) {
            let due = ctx
                .store
                .get(handle)
                .is_some_and(|packet| packet.send_deadline_ms <= now);
            if !due {
                break;
            }
            ctx.store.enqueue_front(ctx.shared, handle);
            released += 1;
        }

        let held = ctx.store.len(private);
        let mut stats = ctx.write_stats(self.name())?;
        stats.lag_stats.record_tick(released, held);
        if flushed > 0 {
            stats.lag_stats.record_flush(flushed);
        }

        Ok(held > 0)
    }

    fn close_down(&self, state: &mut Self::State, ctx: &mut ModuleContext) -> Result<()> {
        let returned = state.buffer.flush_into(ctx.store, ctx.shared);
        let mut stats = ctx.write_stats(self.name())?;
        stats.lag_stats.record_tick(0, 0);
        info!("Lag closed, returned {} held packets", returned);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::core::packet_data::Direction;
    use crate::network::modules::testing::Harness;

    fn options(time_ms: u64) -> LagOptions {
        LagOptions {
            time_ms,
            ..LagOptions::default()
        }
    }

    #[test]
    fn test_packets_wait_for_lag_time() {
        let mut harness = Harness::new();
        let mut state = LagState::default();
        let opts = options(100);

        harness.capture_many(3, 60, Direction::Outbound, 0);
        assert!(harness.run(&LagModule, &opts, &mut state, 0).unwrap());
        assert_eq!(harness.shared_len(), 0);

        harness.capture(3, 60, Direction::Outbound, 50);
        harness.run(&LagModule, &opts, &mut state, 50).unwrap();
        assert_eq!(harness.shared_len(), 0);

        harness.run(&LagModule, &opts, &mut state, 100).unwrap();
        assert_eq!(harness.shared_ids(), vec![0, 1, 2]);

        assert!(!harness.run(&LagModule, &opts, &mut state, 150).unwrap());
        assert_eq!(harness.shared_ids(), vec![0, 1, 2, 3]);
        assert_eq!(harness.stats().lag_stats.total_released(), 4);
        assert_eq!(harness.stats().lag_stats.max_held(), 4);
    }

    #[test]
    fn test_zero_lag_passes_through_in_order() {
        let mut harness = Harness::new();
        let mut state = LagState::default();

        harness.capture_many(5, 60, Direction::Inbound, 0);
        assert!(!harness.run(&LagModule, &options(0), &mut state, 0).unwrap());
        assert_eq!(harness.shared_ids(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_direction_filter() {
        let mut harness = Harness::new();
        let mut state = LagState::default();
        let opts = LagOptions {
            inbound: false,
            ..options(1_000)
        };

        harness.capture(0, 60, Direction::Inbound, 0);
        harness.capture(1, 60, Direction::Outbound, 0);
        harness.run(&LagModule, &opts, &mut state, 0).unwrap();

        assert_eq!(harness.shared_ids(), vec![0]);
        assert_eq!(harness.stats().lag_stats.current_held(), 1);
    }

    #[test]
    fn test_full_buffer_flushes_oldest() {
        let mut harness = Harness::new();
        let mut state = LagState::default();

        harness.capture_many(2_001, 60, Direction::Outbound, 0);
        harness.run(&LagModule, &options(10_000), &mut state, 0).unwrap();

        assert_eq!(harness.shared_ids(), (0..800).collect::<Vec<_>>());
        assert_eq!(harness.stats().lag_stats.current_held(), 1_201);
        assert_eq!(harness.stats().lag_stats.total_flushed(), 800);
    }

    #[test]
    fn test_close_down_returns_held_packets() {
        let mut harness = Harness::new();
        let mut state = LagState::default();
        let opts = options(5_000);

        harness.start(&LagModule, &opts, &mut state, 0).unwrap();
        harness.capture_many(10, 60, Direction::Outbound, 0);
        harness.run(&LagModule, &opts, &mut state, 0).unwrap();
        harness.close(&LagModule, &mut state, 10).unwrap();

        assert_eq!(harness.shared_ids(), (0..10).collect::<Vec<_>>());
        assert_eq!(harness.store.packet_count(), 10);
    }
}
