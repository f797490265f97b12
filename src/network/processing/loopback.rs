//! Synthetic capture and injection for running the engine without a network.

use crate::error::Result;
use crate::network::core::{Direction, PacketData};
use crate::network::processing::processor::PacketSink;
use crate::network::processing::receiver::PacketSource;
use crate::network::utils::headers::{build_ipv4_tcp, build_ipv4_udp, TCP_FLAG_ACK, TCP_FLAG_PSH};
use crate::utils::MonotonicClock;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const LOCAL: Ipv4Addr = Ipv4Addr::new(192, 168, 1, 10);
const REMOTE: Ipv4Addr = Ipv4Addr::new(203, 0, 113, 7);

/// Generates a steady stream of IPv4 traffic at a fixed packet rate.
///
/// Packets cycle through outbound UDP, inbound UDP, outbound TCP and inbound
/// TCP. The first payload byte carries the low byte of a running sequence
/// number.
#[derive(Debug)]
pub struct LoopbackSource {
    packets_per_second: u32,
    payload_size: usize,
    poll_interval: Duration,
    started_ms: Option<u64>,
    emitted: u64,
}

impl LoopbackSource {
    pub fn new(packets_per_second: u32, payload_size: usize) -> Self {
        Self {
            packets_per_second,
            payload_size,
            poll_interval: Duration::from_millis(5),
            started_ms: None,
            emitted: 0,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Packets that should exist by `now_ms` and have not been emitted yet.
    fn due(&mut self, now_ms: u64) -> u64 {
        let started = *self.started_ms.get_or_insert(now_ms);
        let expected =
            u64::from(self.packets_per_second) * now_ms.saturating_sub(started) / 1000;
        expected.saturating_sub(self.emitted)
    }

    fn build(&self, sequence: u64, now_ms: u64) -> PacketData {
        let mut payload = vec![0u8; self.payload_size];
        if let Some(first) = payload.first_mut() {
            *first = sequence as u8;
        }

        let outbound = sequence % 2 == 0;
        let (source, destination, direction) = if outbound {
            (LOCAL, REMOTE, Direction::Outbound)
        } else {
            (REMOTE, LOCAL, Direction::Inbound)
        };
        let (source_port, destination_port) = if outbound { (50_000, 443) } else { (443, 50_000) };

        let data = if sequence % 4 < 2 {
            build_ipv4_udp(source, destination, source_port, destination_port, &payload)
        } else {
            build_ipv4_tcp(
                source,
                destination,
                source_port,
                destination_port,
                sequence as u32,
                TCP_FLAG_ACK | TCP_FLAG_PSH,
                &payload,
            )
        };

        PacketData::new(data, direction, now_ms)
    }
}

impl PacketSource for LoopbackSource {
    fn receive(&mut self, clock: &MonotonicClock) -> Result<Vec<PacketData>> {
        thread::sleep(self.poll_interval);
        let now_ms = clock.now_ms();
        let due = self.due(now_ms);

        let packets = (0..due)
            .map(|offset| self.build(self.emitted + offset, now_ms))
            .collect();
        self.emitted += due;
        Ok(packets)
    }
}

/// Counters shared between a [`CountingSink`] and whoever reads them.
#[derive(Debug, Default)]
pub struct SinkCounters {
    pub packets: AtomicUsize,
    pub bytes: AtomicU64,
}

impl SinkCounters {
    pub fn packets(&self) -> usize {
        self.packets.load(Ordering::Relaxed)
    }

    pub fn bytes(&self) -> u64 {
        self.bytes.load(Ordering::Relaxed)
    }
}

/// Discards packets, counting them.
#[derive(Debug, Clone, Default)]
pub struct CountingSink {
    counters: Arc<SinkCounters>,
}

impl CountingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn counters(&self) -> Arc<SinkCounters> {
        self.counters.clone()
    }
}

impl PacketSink for CountingSink {
    fn send(&mut self, packet: &PacketData) -> Result<()> {
        self.counters.packets.fetch_add(1, Ordering::Relaxed);
        self.counters
            .bytes
            .fetch_add(packet.size() as u64, Ordering::Relaxed);
        Ok(())
    }
}
