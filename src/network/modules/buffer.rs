//! Helpers shared by the modules that hold packets across ticks.

use crate::network::core::queue::{PacketHandle, PacketQueue, PacketStore};
use rand::Rng;

/// A module-owned queue, allocated in the shared arena on first use.
#[derive(Debug, Default)]
pub struct PrivateBuffer {
    queue: Option<PacketQueue>,
}

impl PrivateBuffer {
    /// Returns the private queue, creating it if needed.
    pub fn open(&mut self, store: &mut PacketStore) -> PacketQueue {
        *self.queue.get_or_insert_with(|| store.create_queue())
    }

    pub fn get(&self) -> Option<PacketQueue> {
        self.queue
    }

    pub fn len(&self, store: &PacketStore) -> usize {
        self.queue.map_or(0, |queue| store.len(queue))
    }

    pub fn is_empty(&self, store: &PacketStore) -> bool {
        self.len(store) == 0
    }

    /// Moves every held packet to the front of `shared`, oldest first, and
    /// frees the private queue. Returns the number of packets moved.
    pub fn flush_into(&mut self, store: &mut PacketStore, shared: PacketQueue) -> usize {
        let Some(queue) = self.queue.take() else {
            return 0;
        };
        let moved = store.drain_into(queue, shared);
        store.release_queue(queue);
        moved
    }
}

/// Handles of the packets on `queue` that match the direction toggles,
/// oldest first.
pub fn collect_matching(
    store: &PacketStore,
    queue: PacketQueue,
    apply_inbound: bool,
    apply_outbound: bool,
) -> Vec<PacketHandle> {
    store
        .handles_oldest_first(queue)
        .into_iter()
        .filter(|&handle| {
            store
                .get(handle)
                .is_some_and(|packet| packet.matches_direction(apply_inbound, apply_outbound))
        })
        .collect()
}

/// Moves candidates into `private` while it has room, tagging each one
/// through `assign`. Candidates past the room stay where they are.
pub fn admit_packets<I, F>(
    store: &mut PacketStore,
    private: PacketQueue,
    candidates: &mut I,
    capacity: usize,
    assign: &mut F,
) -> usize
where
    I: Iterator<Item = PacketHandle>,
    F: FnMut(&mut PacketStore, PacketHandle),
{
    let mut admitted = 0;
    while store.len(private) < capacity {
        let Some(handle) = candidates.next() else {
            break;
        };
        assign(store, handle);
        store.enqueue_front(private, handle);
        admitted += 1;
    }
    admitted
}

/// Moves up to `count` of the oldest packets from `from` to the front of
/// `to`. Returns the number moved.
pub fn release_oldest(
    store: &mut PacketStore,
    from: PacketQueue,
    to: PacketQueue,
    count: usize,
) -> usize {
    let mut moved = 0;
    while moved < count {
        let Some(handle) = store.back(from) else {
            break;
        };
        store.enqueue_front(to, handle);
        moved += 1;
    }
    moved
}

/// Draws a release deadline uniformly from
/// `[now + base - variation, now + base + variation]`, never before time zero.
pub fn draw_deadline<R: Rng + ?Sized>(
    rng: &mut R,
    now_ms: u64,
    base_ms: u64,
    variation_ms: u64,
) -> u64 {
    let target = now_ms.saturating_add(base_ms);
    if variation_ms == 0 {
        return target;
    }

    let variation = i64::try_from(variation_ms).unwrap_or(i64::MAX / 2);
    let offset = rng.random_range(-variation..=variation);
    target.saturating_add_signed(offset)
}
