use crate::error::Result;
use crate::network::core::queue::{PacketHandle, PacketStore};
use crate::network::modules::buffer::{collect_matching, PrivateBuffer};
use crate::network::modules::stats::reorder_stats::ReorderStats;
use crate::network::modules::traits::{ModuleContext, PacketModule};
use crate::settings::reorder::ReorderOptions;
use log::{debug, info};
use rand::{rng, Rng};

/// Ticks a lone held packet waits for company before it is let go.
pub const REORDER_MAX_HOLD_TICKS: u32 = 10;

/// Unit struct for the Reorder packet module.
///
/// Shuffles the matching packets of a tick among their own positions. A
/// matching packet that arrives alone has nothing to swap with, so it is held
/// back and sent behind whatever arrives next.
#[derive(Debug, Default)]
pub struct ReorderModule;

#[derive(Debug, Default)]
pub struct ReorderState {
    held: PrivateBuffer,
    held_ticks: u32,
}

impl PacketModule for ReorderModule {
    type Options = ReorderOptions;
    type State = ReorderState;

    fn name(&self) -> &'static str {
        "reorder"
    }

    fn display_name(&self) -> &'static str {
        "Packet Reordering"
    }

    fn process(
        &self,
        options: &Self::Options,
        state: &mut Self::State,
        ctx: &mut ModuleContext,
    ) -> Result<bool> {
        let mut rng = rng();
        let matching = collect_matching(ctx.store, ctx.shared, options.inbound, options.outbound);

        if !state.held.is_empty(ctx.store) {
            state.held_ticks += 1;
            if !matching.is_empty() || state.held_ticks >= REORDER_MAX_HOLD_TICKS {
                let released = state.held.flush_into(ctx.store, ctx.shared);
                debug!("Reorder released {} held packets after {} ticks", released, state.held_ticks);
                state.held_ticks = 0;
            }
        }

        let mut stats = ctx.write_stats(self.name())?;
        let rolled = !matching.is_empty() && options.probability.roll(&mut rng);

        match matching.len() {
            0 => {}
            1 if rolled => {
                let private = state.held.open(ctx.store);
                ctx.store.enqueue_front(private, matching[0]);
                state.held_ticks = 0;
                stats.reorder_stats.record_delayed();
            }
            _ if rolled => {
                shuffle_packets(ctx.store, &matching, &mut rng, &mut stats.reorder_stats);
            }
            _ => {
                for _ in &matching {
                    stats.reorder_stats.record(false);
                }
            }
        }

        Ok(rolled || !state.held.is_empty(ctx.store))
    }

    fn close_down(&self, state: &mut Self::State, ctx: &mut ModuleContext) -> Result<()> {
        let returned = state.held.flush_into(ctx.store, ctx.shared);
        state.held_ticks = 0;
        if returned > 0 {
            info!("Reorder closed, returned {} held packets", returned);
        }
        Ok(())
    }
}

/// Fisher-Yates shuffle of the packets behind `handles`.
///
/// Packet contents move between the slots, so the queue links stay put.
/// Every packet is recorded as reordered if it ended up somewhere new.
///
/// # Arguments
///
/// * `store` - Arena owning the packets
/// * `handles` - Slots to shuffle among; they may sit anywhere in one queue
/// * `rng` - Source of the permutation
/// * `stats` - Receives one reorder per displaced packet
pub fn shuffle_packets<R: Rng + ?Sized>(
    store: &mut PacketStore,
    handles: &[PacketHandle],
    rng: &mut R,
    stats: &mut ReorderStats,
) {
    let mut origin: Vec<usize> = (0..handles.len()).collect();

    for i in (1..handles.len()).rev() {
        let j = rng.random_range(0..=i);
        if i != j && store.swap_packets(handles[i], handles[j]) {
            origin.swap(i, j);
        }
    }

    for (position, &from) in origin.iter().enumerate() {
        stats.record(position != from);
    }
}
