use crate::error::Result;
use crate::network::core::queue::{PacketQueue, PacketStore};
use crate::network::modules::buffer::collect_matching;
use crate::network::modules::stats::drop_stats::DropStats;
use crate::network::modules::traits::{ModuleContext, PacketModule};
use crate::network::types::probability::Probability;
use crate::settings::drop::DropOptions;
use rand::{rng, Rng};

/// Unit struct for the Drop packet module.
///
/// This module simulates packet loss by randomly dropping packets
/// based on a configured probability.
#[derive(Debug, Default)]
pub struct DropModule;

impl PacketModule for DropModule {
    type Options = DropOptions;
    type State = ();

    fn name(&self) -> &'static str {
        "drop"
    }

    fn display_name(&self) -> &'static str {
        "Packet Drop"
    }

    fn process(
        &self,
        options: &Self::Options,
        _state: &mut Self::State,
        ctx: &mut ModuleContext,
    ) -> Result<bool> {
        let mut stats = ctx.write_stats(self.name())?;
        let dropped = drop_packets(
            ctx.store,
            ctx.shared,
            options.probability,
            options.inbound,
            options.outbound,
            &mut rng(),
            &mut stats.drop_stats,
        );
        Ok(dropped > 0)
    }

    fn should_skip(&self, options: &Self::Options) -> bool {
        options.probability.value() <= 0.0
    }
}

/// Destroys matching packets on `queue`, each with `drop_probability`.
///
/// Packets that do not match the direction toggles are left alone and not
/// counted.
///
/// # Arguments
///
/// * `store` - Arena owning the packets
/// * `queue` - Queue to drop from, usually the shared queue
/// * `drop_probability` - Chance that a matching packet is destroyed
/// * `apply_inbound` - Whether inbound packets are considered
/// * `apply_outbound` - Whether outbound packets are considered
/// * `rng` - Source of the rolls
/// * `stats` - Records one outcome per matching packet
///
/// # Returns
///
/// The number of packets destroyed.
pub fn drop_packets<R: Rng + ?Sized>(
    store: &mut PacketStore,
    queue: PacketQueue,
    drop_probability: Probability,
    apply_inbound: bool,
    apply_outbound: bool,
    rng: &mut R,
    stats: &mut DropStats,
) -> usize {
    let mut dropped = 0;
    for handle in collect_matching(store, queue, apply_inbound, apply_outbound) {
        let drop = drop_probability.roll(rng);
        if drop {
            store.remove(handle);
            dropped += 1;
        }
        stats.record(drop);
    }
    dropped
}
