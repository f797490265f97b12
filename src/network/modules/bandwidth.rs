use crate::error::Result;
use crate::network::core::queue::{PacketHandle, PacketStore};
use crate::network::modules::buffer::{admit_packets, collect_matching, PrivateBuffer};
use crate::network::modules::traits::{ModuleContext, PacketModule};
use crate::settings::bandwidth::{BandwidthOptions, MAX_LIMIT_KBPS};
use log::{debug, info};

/// Most bytes the bandwidth module holds before it starts dropping the oldest.
pub const MAX_BUFFER_BYTES: usize = 10 * 1024 * 1024;

/// Unit struct for the Bandwidth packet module.
///
/// Caps throughput at a static `limit_kbps`: every tick the module may send
/// `limit * 1024 * elapsed` bytes, where `elapsed` is the time since it last
/// sent anything. Whatever does not fit waits in a buffer.
#[derive(Debug, Default)]
pub struct BandwidthModule;

/// State maintained by the bandwidth module between ticks.
///
/// # Fields
///
/// * `buffer` - Packets waiting for budget, oldest at the back
/// * `last_send_ms` - When the module last sent anything; the budget grows
///   from this point. `None` until the first tick after start-up or after the
///   limit was set to 0
#[derive(Debug, Default)]
pub struct BandwidthState {
    buffer: PrivateBuffer,
    last_send_ms: Option<u64>,
}

impl PacketModule for BandwidthModule {
    type Options = BandwidthOptions;
    type State = BandwidthState;

    fn name(&self) -> &'static str {
        "bandwidth"
    }

    fn display_name(&self) -> &'static str {
        "Bandwidth Limiter"
    }

    fn start_up(
        &self,
        options: &Self::Options,
        state: &mut Self::State,
        ctx: &mut ModuleContext,
    ) -> Result<()> {
        state.buffer.open(ctx.store);
        state.last_send_ms = Some(ctx.now_ms);
        info!("Bandwidth limiter started at {} KB/s", options.limit_kbps);
        Ok(())
    }

    /// Limits throughput to `limit_kbps`.
    ///
    /// Each tick:
    /// 1. Every matching packet on the shared queue moves into the buffer
    /// 2. The oldest packets are dropped while the buffer exceeds
    ///    [`MAX_BUFFER_BYTES`]
    /// 3. Packets leave the back of the buffer while they fit the byte budget
    ///    accumulated since the last send
    ///
    /// A limit of 0 disables the module: the buffer is emptied onto the
    /// shared queue and nothing is held.
    ///
    /// # Returns
    ///
    /// `true` while packets are still buffered.
    fn process(
        &self,
        options: &Self::Options,
        state: &mut Self::State,
        ctx: &mut ModuleContext,
    ) -> Result<bool> {
        let now = ctx.now_ms;
        let mut stats = ctx.write_stats(self.name())?;
        let bandwidth_stats = &mut stats.bandwidth_stats;

        if options.limit_kbps == 0 {
            let returned = state.buffer.flush_into(ctx.store, ctx.shared);
            if returned > 0 {
                debug!("Bandwidth limit is 0, released {} buffered packets", returned);
            }
            state.last_send_ms = None;
            bandwidth_stats.set_buffered(0, 0);
            return Ok(false);
        }

        let private = state.buffer.open(ctx.store);
        let mut candidates =
            collect_matching(ctx.store, ctx.shared, options.inbound, options.outbound).into_iter();
        admit_packets(
            ctx.store,
            private,
            &mut candidates,
            usize::MAX,
            &mut |_: &mut PacketStore, _: PacketHandle| {},
        );

        let mut buffered_bytes = ctx.store.bytes_queued(private);
        while buffered_bytes > MAX_BUFFER_BYTES {
            let Some(packet) = ctx.store.pop_back(private) else {
                break;
            };
            buffered_bytes -= packet.size();
            bandwidth_stats.overflow_dropped += 1;
        }

        let limit = options.limit_kbps.min(MAX_LIMIT_KBPS) as u64;
        let last_send = *state.last_send_ms.get_or_insert(now);
        let bytes_allowed = limit * 1024 * now.saturating_sub(last_send) / 1000;

        let mut bytes_sent = 0u64;
        while let Some(handle) = ctx.store.back(private) {
            let size = ctx.store.get(handle).map_or(0, |packet| packet.size()) as u64;
            if bytes_sent + size > bytes_allowed {
                break;
            }
            bytes_sent += size;
            ctx.store.enqueue_front(ctx.shared, handle);
        }

        buffered_bytes -= bytes_sent as usize;
        let buffered = ctx.store.len(private);
        bandwidth_stats.set_buffered(buffered, buffered_bytes);

        if bytes_sent > 0 {
            bandwidth_stats.record(bytes_sent as usize, now);
            state.last_send_ms = Some(now);
        }

        Ok(buffered > 0)
    }

    /// Returns every buffered packet to the shared queue, ignoring the budget.
    fn close_down(&self, state: &mut Self::State, ctx: &mut ModuleContext) -> Result<()> {
        let returned = state.buffer.flush_into(ctx.store, ctx.shared);
        state.last_send_ms = None;

        let mut stats = ctx.write_stats(self.name())?;
        stats.bandwidth_stats.set_buffered(0, 0);
        info!("Bandwidth limiter closed, returned {} buffered packets", returned);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::core::packet_data::Direction;
    use crate::network::modules::testing::Harness;

    fn options(limit_kbps: usize) -> BandwidthOptions {
        BandwidthOptions {
            limit_kbps,
            ..BandwidthOptions::default()
        }
    }

    #[test]
    fn test_basic_bandwidth_limiting() {
        let mut harness = Harness::new();
        let mut state = BandwidthState::default();
        let opts = options(1);

        harness.capture_many(2, 1_000, Direction::Outbound, 0);
        assert!(harness.run(&BandwidthModule, &opts, &mut state, 0).unwrap());
        assert_eq!(harness.shared_len(), 0);

        // 1 KB/s lets one packet out per second
        harness.run(&BandwidthModule, &opts, &mut state, 1_000).unwrap();
        assert_eq!(harness.shared_ids(), vec![0]);

        assert!(!harness.run(&BandwidthModule, &opts, &mut state, 2_000).unwrap());
        assert_eq!(harness.shared_ids(), vec![0, 1]);
        assert_eq!(harness.stats().bandwidth_stats.total_bytes(), 2_000);
    }

    #[test]
    fn test_no_bandwidth_limiting() {
        let mut harness = Harness::new();
        let mut state = BandwidthState::default();
        let opts = options(10_000);

        harness.start(&BandwidthModule, &opts, &mut state, 0).unwrap();
        harness.capture_many(2, 1_000, Direction::Outbound, 0);
        harness.run(&BandwidthModule, &opts, &mut state, 1_000).unwrap();

        assert_eq!(harness.shared_len(), 2);
    }

    #[test]
    fn test_exceeding_buffer_size() {
        let mut harness = Harness::new();
        let mut state = BandwidthState::default();

        harness.capture_many(11_000, 1_000, Direction::Inbound, 0);
        harness.run(&BandwidthModule, &options(100), &mut state, 0).unwrap();

        let stats = harness.stats();
        assert_eq!(stats.bandwidth_stats.overflow_dropped(), 515);
        assert_eq!(stats.bandwidth_stats.buffered_packets(), 10_485);
        assert!(stats.bandwidth_stats.buffered_bytes() <= MAX_BUFFER_BYTES);
        assert_eq!(harness.store.packet_count(), 10_485);
    }

    #[test]
    fn test_zero_bandwidth_releases_everything() {
        let mut harness = Harness::new();
        let mut state = BandwidthState::default();

        harness.capture_many(3, 1_000, Direction::Outbound, 0);
        harness.run(&BandwidthModule, &options(1), &mut state, 0).unwrap();
        assert_eq!(harness.shared_len(), 0);

        harness.capture(3, 1_000, Direction::Outbound, 10);
        assert!(!harness.run(&BandwidthModule, &options(0), &mut state, 10).unwrap());
        assert_eq!(harness.shared_len(), 4);
    }

    #[test]
    fn test_direction_filter_and_close_down() {
        let mut harness = Harness::new();
        let mut state = BandwidthState::default();
        let opts = BandwidthOptions {
            inbound: false,
            ..options(1)
        };

        harness.capture(0, 500, Direction::Inbound, 0);
        harness.capture(1, 500, Direction::Outbound, 0);
        harness.run(&BandwidthModule, &opts, &mut state, 0).unwrap();
        assert_eq!(harness.shared_ids(), vec![0]);

        harness.close(&BandwidthModule, &mut state, 10).unwrap();
        assert_eq!(harness.shared_ids(), vec![0, 1]);
    }
}
