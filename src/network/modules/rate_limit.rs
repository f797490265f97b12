//! Rate limiter: delays matching packets and releases them only while the
//! measured throughput stays under a configured cap.
//!
//! Each tick runs in three steps:
//!
//! 1. **Admission.** Matching packets on the shared queue are moved into a
//!    private buffer, oldest first, each with a release deadline of
//!    `now + delay ± variation`, until the buffer holds `buffer_size` packets.
//! 2. **Release.** The oldest buffered packet goes back to the shared queue
//!    once its deadline has passed and the windowed throughput is below the
//!    cap. Release stops at the first packet that fails either check, so the
//!    buffer never reorders.
//! 3. **Overflow flush.** A full buffer force-releases its `flush_batch`
//!    oldest packets regardless of the cap. Candidates that did not fit
//!    earlier are then admitted into the freed room.

use crate::error::Result;
use crate::network::core::queue::{PacketHandle, PacketQueue, PacketStore};
use crate::network::modules::buffer::{
    admit_packets, collect_matching, draw_deadline, PrivateBuffer,
};
use crate::network::modules::stats::rate_stats::RateStatsWindow;
use crate::network::modules::traits::{ModuleContext, PacketModule};
use crate::settings::lag::MAX_LAG_MS;
use crate::settings::rate_limit::{RateLimitOptions, MAX_BUFFER_SIZE};
use log::{debug, info, warn};
use rand::rng;

/// Number of buckets in the throughput window.
pub const RATE_WINDOW_BUCKETS: usize = 500;

/// Width of one throughput bucket in milliseconds.
pub const RATE_BUCKET_MS: u64 = 1;

/// Smoothing gain of the queue-delay estimate.
pub const QUEUE_DELAY_GAIN: f64 = 0.0625;

#[derive(Debug, Default)]
pub struct RateLimitModule;

/// Per-run state of the rate limiter.
#[derive(Debug, Default)]
pub struct RateLimitState {
    buffer: PrivateBuffer,
    window: Option<RateStatsWindow>,
    /// Smoothed lateness of releases relative to their deadlines
    queue_delay_ms: f64,
}

impl RateLimitState {
    pub fn queue_delay_ms(&self) -> f64 {
        self.queue_delay_ms
    }

    pub fn buffered(&self, store: &PacketStore) -> usize {
        self.buffer.len(store)
    }
}

fn new_window() -> RateStatsWindow {
    RateStatsWindow::new(RATE_WINDOW_BUCKETS, RATE_BUCKET_MS)
}

impl PacketModule for RateLimitModule {
    type Options = RateLimitOptions;
    type State = RateLimitState;

    fn name(&self) -> &'static str {
        "rate_limit"
    }

    fn display_name(&self) -> &'static str {
        "Rate Limit"
    }

    fn start_up(
        &self,
        options: &Self::Options,
        state: &mut Self::State,
        ctx: &mut ModuleContext,
    ) -> Result<()> {
        state.buffer.open(ctx.store);
        let window = state.window.get_or_insert_with(new_window);
        window.reset();
        state.queue_delay_ms = 0.0;
        info!(
            "Rate limiter started: cap {} Mbps over a {} ms window, delay {}±{} ms, buffer {}",
            options.data_rate_mbps,
            window.horizon_ms(),
            options.delay_ms,
            options.variation_ms,
            options.buffer_size
        );
        Ok(())
    }

    fn process(
        &self,
        options: &Self::Options,
        state: &mut Self::State,
        ctx: &mut ModuleContext,
    ) -> Result<bool> {
        let mut rng = rng();
        let now = ctx.now_ms;
        let capacity = options.buffer_size.clamp(1, MAX_BUFFER_SIZE);
        let cap = options.cap_bytes_per_sec();
        let delay_ms = options.delay_ms.min(MAX_LAG_MS);
        let variation_ms = options.variation_ms.min(MAX_LAG_MS);

        let private = state.buffer.open(ctx.store);
        let window = state.window.get_or_insert_with(new_window);

        let candidates = collect_matching(ctx.store, ctx.shared, options.inbound, options.outbound);
        let mut candidates = candidates.into_iter();

        let mut assign_deadline = |store: &mut PacketStore, handle: PacketHandle| {
            if let Some(packet) = store.get_mut(handle) {
                packet.send_deadline_ms = draw_deadline(&mut rng, now, delay_ms, variation_ms);
            }
        };

        let mut admitted = admit_packets(
            ctx.store,
            private,
            &mut candidates,
            capacity,
            &mut assign_deadline,
        );

        let mut released = 0;
        while let Some((handle, deadline, size)) = oldest_buffered(ctx.store, private) {
            if now < deadline || window.calculate(now) >= cap {
                break;
            }
            state.queue_delay_ms = smooth_delay(state.queue_delay_ms, now, deadline);
            ctx.store.enqueue_front(ctx.shared, handle);
            window.update(size, now);
            released += 1;
        }

        let mut flushed = 0;
        if ctx.store.len(private) >= capacity {
            let batch = options.flush_batch.min(ctx.store.len(private));
            while flushed < batch {
                let Some((handle, deadline, _)) = oldest_buffered(ctx.store, private) else {
                    break;
                };
                state.queue_delay_ms = smooth_delay(state.queue_delay_ms, now, deadline);
                ctx.store.enqueue_front(ctx.shared, handle);
                flushed += 1;
            }
            warn!(
                "Rate limiter buffer full ({} packets), flushed {} ignoring the cap",
                capacity, flushed
            );
            admitted += admit_packets(
                ctx.store,
                private,
                &mut candidates,
                capacity,
                &mut assign_deadline,
            );
        }

        let buffered = ctx.store.len(private);
        let data_rate = window.calculate(now);

        if admitted > 0 || released > 0 {
            debug!(
                "Rate limiter: admitted {}, released {}, buffered {}, rate {} B/s",
                admitted, released, buffered, data_rate
            );
        }

        let mut stats = ctx.write_stats(self.name())?;
        let status = &mut stats.rate_limit_stats;
        status.data_rate_bytes_per_sec = data_rate;
        status.queue_delay_ms = state.queue_delay_ms;
        status.buffered = buffered;
        status.admitted += admitted;
        status.released += released;
        status.flushed += flushed;

        Ok(buffered > 0)
    }

    fn close_down(&self, state: &mut Self::State, ctx: &mut ModuleContext) -> Result<()> {
        let returned = state.buffer.flush_into(ctx.store, ctx.shared);
        if let Some(window) = state.window.take() {
            debug!(
                "Rate limiter window measured {} bytes in {} releases",
                window.accumulated_count(),
                window.sample_count()
            );
        }

        let mut stats = ctx.write_stats(self.name())?;
        stats.rate_limit_stats.buffered = 0;
        stats.rate_limit_stats.data_rate_bytes_per_sec = 0;

        info!("Rate limiter closed, returned {} buffered packets", returned);
        Ok(())
    }
}

fn oldest_buffered(store: &PacketStore, private: PacketQueue) -> Option<(PacketHandle, u64, usize)> {
    let handle = store.back(private)?;
    let packet = store.get(handle)?;
    Some((handle, packet.send_deadline_ms, packet.size()))
}

/// Folds the lateness of one release into the running queue-delay estimate.
fn smooth_delay(current_ms: f64, now_ms: u64, deadline_ms: u64) -> f64 {
    let lateness = now_ms as f64 - deadline_ms as f64;
    current_ms + QUEUE_DELAY_GAIN * (lateness - current_ms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::core::packet_data::Direction;
    use crate::network::modules::testing::Harness;

    fn options() -> RateLimitOptions {
        RateLimitOptions::default()
    }

    #[test]
    fn test_unsaturated_cap_passes_everything() {
        let mut harness = Harness::new();
        let mut state = RateLimitState::default();
        let opts = options();

        harness.capture_many(100, 1_000, Direction::Outbound, 0);
        let holding = harness.run(&RateLimitModule, &opts, &mut state, 0).unwrap();

        assert!(!holding);
        assert_eq!(harness.shared_len(), 100);
        assert_eq!(harness.shared_ids(), (0..100).collect::<Vec<_>>());

        for tick in 1..=10 {
            harness.run(&RateLimitModule, &opts, &mut state, tick * 10).unwrap();
        }
        assert_eq!(state.queue_delay_ms(), 0.0);

        let stats = harness.stats();
        assert_eq!(stats.rate_limit_stats.admitted, 100);
        assert_eq!(stats.rate_limit_stats.released, 100);
        assert_eq!(stats.rate_limit_stats.buffered, 0);
    }

    #[test]
    fn test_deadline_holds_packets() {
        let mut harness = Harness::new();
        let mut state = RateLimitState::default();
        let opts = RateLimitOptions {
            delay_ms: 50,
            ..options()
        };

        harness.capture_many(3, 100, Direction::Inbound, 0);
        assert!(harness.run(&RateLimitModule, &opts, &mut state, 0).unwrap());
        assert_eq!(harness.shared_len(), 0);

        harness.run(&RateLimitModule, &opts, &mut state, 49).unwrap();
        assert_eq!(harness.shared_len(), 0);

        harness.run(&RateLimitModule, &opts, &mut state, 60).unwrap();
        assert_eq!(harness.shared_ids(), vec![0, 1, 2]);

        // Each release was 10 ms late
        let expected = 10.0 * (1.0 - (1.0 - QUEUE_DELAY_GAIN).powi(3));
        assert!((state.queue_delay_ms() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_overflow_flush_batch() {
        let mut harness = Harness::new();
        let mut state = RateLimitState::default();
        let opts = RateLimitOptions {
            data_rate_mbps: 0,
            buffer_size: 2_000,
            flush_batch: 800,
            ..options()
        };

        harness.capture_many(2_001, 100, Direction::Outbound, 0);
        harness.run(&RateLimitModule, &opts, &mut state, 0).unwrap();

        assert_eq!(harness.shared_len(), 800);
        assert_eq!(state.buffered(&harness.store), 1_201);
        // The flushed packets are the oldest ones
        assert_eq!(harness.shared_ids(), (0..800).collect::<Vec<_>>());
        {
            let stats = harness.stats();
            assert_eq!(stats.rate_limit_stats.flushed, 800);
            assert_eq!(stats.rate_limit_stats.admitted, 2_001);
            assert_eq!(stats.rate_limit_stats.released, 0);
        }
        // Flushed bytes do not count toward the measured rate
        assert_eq!(state.window.as_ref().map(|w| w.accumulated_count()), Some(0));

        harness.drain_shared();
        harness.run(&RateLimitModule, &opts, &mut state, 10).unwrap();
        assert_eq!(harness.shared_len(), 0);
        assert_eq!(state.buffered(&harness.store), 1_201);
    }

    #[test]
    fn test_direction_filter_leaves_other_traffic() {
        let mut harness = Harness::new();
        let mut state = RateLimitState::default();
        let opts = RateLimitOptions {
            inbound: false,
            outbound: true,
            data_rate_mbps: 0,
            ..options()
        };

        for id in 0..20 {
            let direction = if id % 2 == 0 {
                Direction::Inbound
            } else {
                Direction::Outbound
            };
            harness.capture(id, 100, direction, 0);
        }

        harness.run(&RateLimitModule, &opts, &mut state, 0).unwrap();

        assert_eq!(state.buffered(&harness.store), 10);
        let left = harness.drain_shared();
        assert_eq!(left.len(), 10);
        assert!(left.iter().all(|packet| packet.direction == Direction::Inbound));
    }

    #[test]
    fn test_steady_state_respects_cap() {
        let mut harness = Harness::new();
        let mut state = RateLimitState::default();
        let opts = RateLimitOptions {
            data_rate_mbps: 1,
            ..options()
        };
        let cap = opts.cap_bytes_per_sec();

        let mut measured = 0usize;
        let mut now = 0;
        while now <= 3_000 {
            harness.capture(0, 1_000, Direction::Outbound, now);
            harness.capture(1, 1_000, Direction::Outbound, now);
            harness.run(&RateLimitModule, &opts, &mut state, now).unwrap();

            let sent: usize = harness.drain_shared().iter().map(|p| p.size()).sum();
            if now > 1_000 {
                measured += sent;
            }
            now += 10;
        }

        // Two seconds of steady state
        let expected = 2 * cap as usize;
        assert!(measured <= expected * 105 / 100, "released {} bytes", measured);
        assert!(measured >= expected * 90 / 100, "released {} bytes", measured);
        assert_eq!(harness.stats().rate_limit_stats.flushed, 0);
    }

    #[test]
    fn test_close_down_returns_every_packet() {
        let mut harness = Harness::new();
        let mut state = RateLimitState::default();
        let opts = RateLimitOptions {
            data_rate_mbps: 0,
            ..options()
        };

        harness.start(&RateLimitModule, &opts, &mut state, 0).unwrap();
        harness.capture_many(50, 200, Direction::Outbound, 0);
        harness.run(&RateLimitModule, &opts, &mut state, 0).unwrap();
        assert_eq!(harness.shared_len(), 0);

        harness.close(&RateLimitModule, &mut state, 5).unwrap();

        assert_eq!(harness.shared_ids(), (0..50).collect::<Vec<_>>());
        assert_eq!(harness.store.packet_count(), 50);
        assert!(state.window.is_none());
        assert_eq!(harness.stats().rate_limit_stats.buffered, 0);
    }

    #[test]
    fn test_variation_bounds_deadlines() {
        let mut harness = Harness::new();
        let mut state = RateLimitState::default();
        let opts = RateLimitOptions {
            delay_ms: 100,
            variation_ms: 20,
            ..options()
        };

        harness.capture_many(200, 64, Direction::Outbound, 0);
        harness.run(&RateLimitModule, &opts, &mut state, 0).unwrap();

        let private = state.buffer.get().unwrap();
        let deadlines: Vec<u64> = harness
            .store
            .handles_oldest_first(private)
            .into_iter()
            .map(|handle| harness.store.get(handle).unwrap().send_deadline_ms)
            .collect();

        assert_eq!(deadlines.len(), 200);
        assert!(deadlines.iter().all(|d| (80..=120).contains(d)));
    }

    #[test]
    fn test_start_up_clears_previous_measurements() {
        let mut harness = Harness::new();
        let mut state = RateLimitState::default();
        let opts = options();

        harness.capture_many(10, 500, Direction::Outbound, 0);
        harness.run(&RateLimitModule, &opts, &mut state, 0).unwrap();
        assert_eq!(state.window.as_ref().map(|w| w.sample_count()), Some(10));

        harness.start(&RateLimitModule, &opts, &mut state, 10).unwrap();

        let window = state.window.as_ref().unwrap();
        assert_eq!(window.accumulated_count(), 0);
        assert_eq!(window.sample_count(), 0);
        assert_eq!(window.horizon_ms(), RATE_WINDOW_BUCKETS as u64 * RATE_BUCKET_MS);
    }
}
