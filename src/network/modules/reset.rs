use crate::error::Result;
use crate::network::core::queue::{PacketQueue, PacketStore};
use crate::network::modules::buffer::collect_matching;
use crate::network::modules::stats::reset_stats::ResetStats;
use crate::network::modules::traits::{ModuleContext, PacketModule};
use crate::network::types::probability::Probability;
use crate::network::utils::headers::{parse_layout, recompute_checksums, set_tcp_flags, TCP_FLAG_RST};
use crate::settings::reset::ResetOptions;
use rand::{rng, Rng};

/// Unit struct for the Reset packet module.
///
/// Sets the RST flag on matching TCP segments, which makes the receiving
/// stack tear the connection down.
#[derive(Debug, Default)]
pub struct ResetModule;

impl PacketModule for ResetModule {
    type Options = ResetOptions;
    type State = ();

    fn name(&self) -> &'static str {
        "reset"
    }

    fn display_name(&self) -> &'static str {
        "Connection Reset"
    }

    fn process(
        &self,
        options: &Self::Options,
        _state: &mut Self::State,
        ctx: &mut ModuleContext,
    ) -> Result<bool> {
        let mut stats = ctx.write_stats(self.name())?;
        let reset = reset_connections(
            ctx.store,
            ctx.shared,
            options.probability,
            options.inbound,
            options.outbound,
            &mut rng(),
            &mut stats.reset_stats,
        );
        Ok(reset > 0)
    }

    fn should_skip(&self, options: &Self::Options) -> bool {
        options.probability.value() <= 0.0
    }
}

/// Sets RST on matching TCP segments on `queue` that roll `probability`.
///
/// Both IPv4 and IPv6 segments are handled. The TCP checksum (and the IPv4
/// header checksum) is recomputed so the receiver accepts the segment.
/// Non-TCP packets are counted and left untouched.
///
/// # Arguments
///
/// * `store` - Arena owning the packets
/// * `queue` - Queue to scan
/// * `probability` - Chance that a matching TCP segment is reset
/// * `apply_inbound` - Whether inbound packets are considered
/// * `apply_outbound` - Whether outbound packets are considered
/// * `rng` - Source of the rolls
/// * `stats` - Tracks resets and skipped non-TCP packets
///
/// # Returns
///
/// The number of segments modified.
pub fn reset_connections<R: Rng + ?Sized>(
    store: &mut PacketStore,
    queue: PacketQueue,
    probability: Probability,
    apply_inbound: bool,
    apply_outbound: bool,
    rng: &mut R,
    stats: &mut ResetStats,
) -> usize {
    let mut reset = 0;

    for handle in collect_matching(store, queue, apply_inbound, apply_outbound) {
        let Some(packet) = store.get_mut(handle) else {
            continue;
        };
        stats.inspected += 1;

        let Some(layout) = parse_layout(&packet.data).filter(|layout| layout.is_tcp()) else {
            stats.skipped_non_tcp += 1;
            continue;
        };

        if !probability.roll(rng) {
            continue;
        }

        if set_tcp_flags(&mut packet.data, &layout, TCP_FLAG_RST) {
            recompute_checksums(&mut packet.data);
            stats.reset += 1;
            reset += 1;
        }
    }

    reset
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::core::packet_data::{Direction, PacketData};
    use crate::network::modules::testing::Harness;
    use crate::network::utils::headers::{
        build_ipv4_tcp, build_ipv4_udp, checksums_valid, tcp_flags, TCP_FLAG_ACK,
    };
    use std::net::Ipv4Addr;

    fn tcp(direction: Direction) -> PacketData {
        let data = build_ipv4_tcp(
            Ipv4Addr::new(192, 168, 1, 2),
            Ipv4Addr::new(192, 168, 1, 3),
            50_000,
            443,
            1,
            TCP_FLAG_ACK,
            b"hello",
        );
        PacketData::new(data, direction, 0)
    }

    fn always() -> ResetOptions {
        ResetOptions {
            probability: Probability::ALWAYS,
            ..ResetOptions::default()
        }
    }

    #[test]
    fn test_sets_rst_and_fixes_checksums() {
        let mut harness = Harness::new();
        let handle = harness.store.push_front(harness.shared, tcp(Direction::Outbound));

        assert!(harness.run(&ResetModule, &always(), &mut (), 0).unwrap());

        let packet = harness.store.get(handle).unwrap();
        let layout = parse_layout(&packet.data).unwrap();
        assert_eq!(tcp_flags(&packet.data, &layout), Some(TCP_FLAG_ACK | TCP_FLAG_RST));
        assert!(checksums_valid(&packet.data));
        assert_eq!(harness.stats().reset_stats.reset_count(), 1);
    }

    #[test]
    fn test_non_tcp_is_skipped() {
        let mut harness = Harness::new();
        let udp = build_ipv4_udp(
            Ipv4Addr::new(10, 0, 0, 1),
            Ipv4Addr::new(10, 0, 0, 2),
            53,
            53,
            b"query",
        );
        let handle = harness
            .store
            .push_front(harness.shared, PacketData::new(udp.clone(), Direction::Inbound, 0));

        assert!(!harness.run(&ResetModule, &always(), &mut (), 0).unwrap());

        assert_eq!(harness.store.get(handle).unwrap().data, udp);
        let stats = harness.stats();
        assert_eq!(stats.reset_stats.inspected(), 1);
        assert_eq!(stats.reset_stats.skipped_non_tcp(), 1);
    }

    #[test]
    fn test_direction_filter() {
        let mut harness = Harness::new();
        let opts = ResetOptions {
            outbound: false,
            ..always()
        };
        let outbound = harness.store.push_front(harness.shared, tcp(Direction::Outbound));
        let original = harness.store.get(outbound).unwrap().clone();

        harness.run(&ResetModule, &opts, &mut (), 0).unwrap();

        assert_eq!(harness.store.get(outbound), Some(&original));
        assert_eq!(harness.stats().reset_stats.inspected(), 0);
    }
}
