use crate::error::Result;
use crate::network::core::queue::{PacketQueue, PacketStore};
use crate::network::modules::buffer::collect_matching;
use crate::network::modules::stats::tamper_stats::TamperStats;
use crate::network::modules::traits::{ModuleContext, PacketModule};
use crate::network::types::probability::Probability;
use crate::network::utils::headers::{parse_layout, recompute_checksums};
use crate::settings::tamper::TamperOptions;
use log::debug;
use rand::{rng, Rng};
use std::collections::HashSet;

/// Unit struct for the Tamper packet module.
///
/// Corrupts a fraction of the payload bytes of matching packets. Headers are
/// left alone so the packet still reaches its destination, where the damage
/// shows up as broken application data.
#[derive(Debug, Default)]
pub struct TamperModule;

impl PacketModule for TamperModule {
    type Options = TamperOptions;
    type State = ();

    fn name(&self) -> &'static str {
        "tamper"
    }

    fn display_name(&self) -> &'static str {
        "Packet Tampering"
    }

    fn process(
        &self,
        options: &Self::Options,
        _state: &mut Self::State,
        ctx: &mut ModuleContext,
    ) -> Result<bool> {
        let mut stats = ctx.write_stats(self.name())?;

        let tampered = tamper_packets(
            ctx.store,
            ctx.shared,
            options.probability,
            options.amount,
            options.redo_checksum,
            options.inbound,
            options.outbound,
            &mut rng(),
            &mut stats.tamper_stats,
        );
        Ok(tampered > 0)
    }

    fn should_skip(&self, options: &Self::Options) -> bool {
        options.probability.value() <= 0.0
    }
}

/// Tampers with the payload of matching packets on `queue`.
///
/// For each matching packet that rolls `tamper_probability`, about
/// `payload_len * tamper_amount` payload bytes are modified (at least one).
/// Packets without a parsable IP header or without payload are left alone.
///
/// # Arguments
///
/// * `store` - Arena owning the packets
/// * `queue` - Queue to scan
/// * `tamper_probability` - Chance that a matching packet is tampered with
/// * `tamper_amount` - Fraction of the payload to modify
/// * `recalculate_checksums` - Repair IP and transport checksums afterwards,
///   so the damage survives checksum validation
/// * `apply_inbound` - Whether inbound packets are considered
/// * `apply_outbound` - Whether outbound packets are considered
/// * `rng` - Source of the rolls and of the byte changes
/// * `stats` - Tracks tampered packets and modified bytes
///
/// # Returns
///
/// The number of packets modified.
#[allow(clippy::too_many_arguments)]
pub fn tamper_packets<R: Rng + ?Sized>(
    store: &mut PacketStore,
    queue: PacketQueue,
    tamper_probability: Probability,
    tamper_amount: Probability,
    recalculate_checksums: bool,
    apply_inbound: bool,
    apply_outbound: bool,
    rng: &mut R,
    stats: &mut TamperStats,
) -> usize {
    let mut tampered = 0;

    for handle in collect_matching(store, queue, apply_inbound, apply_outbound) {
        if !tamper_probability.roll(rng) {
            continue;
        }
        let Some(packet) = store.get_mut(handle) else {
            continue;
        };
        let Some(layout) = parse_layout(&packet.data) else {
            debug!("Not tampering with unparsable {} byte packet", packet.size());
            continue;
        };

        let payload_len = layout.payload_len();
        if payload_len == 0 {
            continue;
        }

        let original = packet.data[layout.payload_offset..layout.end].to_vec();
        let bytes_to_tamper =
            ((payload_len as f64 * tamper_amount.value()) as usize).clamp(1, payload_len);
        apply_tampering(
            &mut packet.data[layout.payload_offset..layout.end],
            bytes_to_tamper,
            rng,
        );

        let recomputed = recalculate_checksums && recompute_checksums(&mut packet.data);
        stats.record(
            &original,
            &packet.data[layout.payload_offset..layout.end],
            recomputed,
        );
        tampered += 1;
    }

    tampered
}

/// Modifies `bytes_to_tamper` distinct bytes of `data`.
///
/// Returns the indices that were picked. A picked byte may end up unchanged
/// when the chosen bit already had the written value.
fn apply_tampering<R: Rng + ?Sized>(
    data: &mut [u8],
    bytes_to_tamper: usize,
    rng: &mut R,
) -> HashSet<usize> {
    let mut tampered_indices = HashSet::new();
    let target = bytes_to_tamper.min(data.len());

    while tampered_indices.len() < target {
        let index = rng.random_range(0..data.len());
        if !tampered_indices.insert(index) {
            continue;
        }
        match rng.random_range(0..3) {
            0 => bit_manipulation(data, index, rng.random_range(0..8), rng.random_bool(0.5)),
            1 => bit_flipping(data, index, rng.random_range(0..8)),
            _ => value_adjustment(data, index, rng.random_range(-64..64)),
        }
    }

    tampered_indices
}

/// Sets or clears one bit of a byte.
fn bit_manipulation(data: &mut [u8], byte_index: usize, bit_position: usize, new_bit: bool) {
    let Some(byte) = data.get_mut(byte_index) else {
        return;
    };
    if bit_position >= 8 {
        return;
    }

    if new_bit {
        *byte |= 1 << bit_position;
    } else {
        *byte &= !(1 << bit_position);
    }
}

fn bit_flipping(data: &mut [u8], byte_index: usize, bit_position: usize) {
    if let Some(byte) = data.get_mut(byte_index) {
        if bit_position < 8 {
            *byte ^= 1 << bit_position;
        }
    }
}

/// Adds a signed offset to a byte, wrapping around.
fn value_adjustment(data: &mut [u8], offset: usize, value: i8) {
    if let Some(byte) = data.get_mut(offset) {
        *byte = byte.wrapping_add_signed(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::core::packet_data::{Direction, PacketData};
    use crate::network::utils::headers::{build_ipv4_udp, checksums_valid};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::net::Ipv4Addr;

    const UDP_PAYLOAD_OFFSET: usize = 28;

    fn udp_packet(payload: &[u8]) -> PacketData {
        let data = build_ipv4_udp(
            Ipv4Addr::new(10, 0, 0, 1),
            Ipv4Addr::new(10, 0, 0, 2),
            4000,
            5000,
            payload,
        );
        PacketData::new(data, Direction::Outbound, 0)
    }

    fn run(
        store: &mut PacketStore,
        queue: PacketQueue,
        amount: f64,
        redo_checksum: bool,
        stats: &mut TamperStats,
    ) -> usize {
        let mut rng = StdRng::seed_from_u64(11);
        tamper_packets(
            store,
            queue,
            Probability::ALWAYS,
            Probability::new(amount).unwrap(),
            redo_checksum,
            true,
            true,
            &mut rng,
            stats,
        )
    }

    #[test]
    fn test_headers_are_preserved() {
        let mut store = PacketStore::new();
        let queue = store.create_queue();
        let original = udp_packet(&[0xAA; 100]);
        let handle = store.push_front(queue, original.clone());
        let mut stats = TamperStats::new();

        assert_eq!(run(&mut store, queue, 0.5, true, &mut stats), 1);

        let tampered = store.get(handle).unwrap();
        assert_eq!(
            tampered.data[..UDP_PAYLOAD_OFFSET - 2],
            original.data[..UDP_PAYLOAD_OFFSET - 2]
        );
        assert_ne!(tampered.data[UDP_PAYLOAD_OFFSET..], original.data[UDP_PAYLOAD_OFFSET..]);
        assert!(checksums_valid(&tampered.data));
        assert_eq!(stats.tampered_packets(), 1);
        assert_eq!(stats.checksums_recomputed(), 1);
        assert_eq!(stats.last_flags().len(), 100);
    }

    #[test]
    fn test_without_checksum_recompute() {
        let mut store = PacketStore::new();
        let queue = store.create_queue();
        let handle = store.push_front(queue, udp_packet(&[0x55; 64]));
        let mut stats = TamperStats::new();

        run(&mut store, queue, 1.0, false, &mut stats);

        assert!(!checksums_valid(&store.get(handle).unwrap().data));
        assert_eq!(stats.checksums_recomputed(), 0);
    }

    #[test]
    fn test_packets_without_payload_are_skipped() {
        let mut store = PacketStore::new();
        let queue = store.create_queue();
        store.push_front(queue, udp_packet(&[]));
        store.push_front(queue, PacketData::new(vec![0xFF; 8], Direction::Inbound, 0));
        let mut stats = TamperStats::new();

        assert_eq!(run(&mut store, queue, 1.0, true, &mut stats), 0);
        assert_eq!(stats.tampered_packets(), 0);
    }

    #[test]
    fn test_apply_tampering_touches_exact_count() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut data = vec![0u8; 40];

        let indices = apply_tampering(&mut data, 10, &mut rng);
        assert_eq!(indices.len(), 10);
        assert!(data
            .iter()
            .enumerate()
            .all(|(i, &b)| b == 0 || indices.contains(&i)));

        let indices = apply_tampering(&mut data, 100, &mut rng);
        assert_eq!(indices.len(), 40);
    }

    #[test]
    fn test_byte_helpers() {
        let mut data = vec![0b0000_0001u8, 250];

        bit_manipulation(&mut data, 0, 0, false);
        assert_eq!(data[0], 0);
        bit_manipulation(&mut data, 0, 7, true);
        assert_eq!(data[0], 0b1000_0000);
        bit_flipping(&mut data, 0, 7);
        assert_eq!(data[0], 0);
        value_adjustment(&mut data, 1, 10);
        assert_eq!(data[1], 4);
        value_adjustment(&mut data, 1, -5);
        assert_eq!(data[1], 255);

        // Out of range indices are ignored
        bit_flipping(&mut data, 9, 0);
        value_adjustment(&mut data, 9, 1);
        assert_eq!(data, vec![0, 255]);
    }
}
