use crate::error::Result;
use crate::network::core::queue::{PacketQueue, PacketStore};
use crate::network::modules::buffer::collect_matching;
use crate::network::modules::stats::duplicate_stats::DuplicateStats;
use crate::network::modules::traits::{ModuleContext, PacketModule};
use crate::network::types::probability::Probability;
use crate::settings::duplicate::{DuplicateOptions, MAX_DUPLICATE_COUNT, MIN_DUPLICATE_COUNT};
use rand::{rng, Rng};

/// Unit struct for the Duplicate packet module.
///
/// Matching packets that roll are sent `count` times in total; the copies sit
/// right next to the original so they leave back to back.
#[derive(Debug, Default)]
pub struct DuplicateModule;

impl PacketModule for DuplicateModule {
    type Options = DuplicateOptions;
    type State = ();

    fn name(&self) -> &'static str {
        "duplicate"
    }

    fn display_name(&self) -> &'static str {
        "Packet Duplication"
    }

    fn process(
        &self,
        options: &Self::Options,
        _state: &mut Self::State,
        ctx: &mut ModuleContext,
    ) -> Result<bool> {
        let mut stats = ctx.write_stats(self.name())?;
        let copies = duplicate_packets(
            ctx.store,
            ctx.shared,
            options.count,
            options.probability,
            options.inbound,
            options.outbound,
            &mut rng(),
            &mut stats.duplicate_stats,
        );
        Ok(copies > 0)
    }

    fn should_skip(&self, options: &Self::Options) -> bool {
        options.probability.value() <= 0.0
    }
}

/// Duplicates matching packets on `queue`.
///
/// Copies are linked in directly behind their original, so an original and
/// its copies leave the queue back to back.
///
/// # Arguments
///
/// * `store` - Arena owning the packets; copies are allocated here
/// * `queue` - Queue holding the originals
/// * `count` - Total packets sent per duplicated original, clamped to 2..=50
/// * `probability` - Chance that a matching packet is duplicated
/// * `apply_inbound` - Whether inbound packets are considered
/// * `apply_outbound` - Whether outbound packets are considered
/// * `rng` - Source of the rolls
/// * `stats` - Tracks how many copies were made
///
/// # Returns
///
/// The number of copies created, not counting the originals.
#[allow(clippy::too_many_arguments)]
pub fn duplicate_packets<R: Rng + ?Sized>(
    store: &mut PacketStore,
    queue: PacketQueue,
    count: usize,
    probability: Probability,
    apply_inbound: bool,
    apply_outbound: bool,
    rng: &mut R,
    stats: &mut DuplicateStats,
) -> usize {
    let count = count.clamp(MIN_DUPLICATE_COUNT, MAX_DUPLICATE_COUNT);
    let mut created = 0;

    for handle in collect_matching(store, queue, apply_inbound, apply_outbound) {
        if !probability.roll(rng) {
            stats.record(1);
            continue;
        }

        let Some(original) = store.get(handle).cloned() else {
            continue;
        };
        for _ in 1..count {
            let copy = store.insert(original.clone());
            store.insert_after(handle, copy);
            created += 1;
        }
        stats.record(count);
    }

    created
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::core::packet_data::Direction;
    use crate::network::modules::testing::Harness;

    fn options(count: usize) -> DuplicateOptions {
        DuplicateOptions {
            count,
            probability: Probability::ALWAYS,
            ..DuplicateOptions::default()
        }
    }

    #[test]
    fn test_copies_follow_original() {
        let mut harness = Harness::new();

        harness.capture(0, 30, Direction::Outbound, 0);
        harness.capture(1, 30, Direction::Outbound, 0);
        assert!(harness.run(&DuplicateModule, &options(3), &mut (), 0).unwrap());

        assert_eq!(harness.shared_ids(), vec![0, 0, 0, 1, 1, 1]);
        assert_eq!(harness.store.packet_count(), 6);
        assert!(harness.store.is_consistent(harness.shared));
        assert_eq!(
            harness.stats().duplicate_stats.total_duplication_multiplier(),
            3.0
        );
    }

    #[test]
    fn test_count_is_clamped() {
        let mut harness = Harness::new();

        harness.capture(7, 30, Direction::Inbound, 0);
        harness.run(&DuplicateModule, &options(500), &mut (), 0).unwrap();
        assert_eq!(harness.shared_len(), MAX_DUPLICATE_COUNT);

        let mut harness = Harness::new();
        harness.capture(7, 30, Direction::Inbound, 0);
        harness.run(&DuplicateModule, &options(0), &mut (), 0).unwrap();
        assert_eq!(harness.shared_len(), MIN_DUPLICATE_COUNT);
    }

    #[test]
    fn test_direction_and_probability() {
        let mut harness = Harness::new();
        let opts = DuplicateOptions {
            outbound: false,
            ..options(2)
        };

        harness.capture(0, 30, Direction::Outbound, 0);
        harness.capture(1, 30, Direction::Inbound, 0);
        harness.run(&DuplicateModule, &opts, &mut (), 0).unwrap();
        assert_eq!(harness.shared_ids(), vec![0, 1, 1]);

        let never = DuplicateOptions::default();
        assert!(DuplicateModule.should_skip(&never));
    }
}
