//! Arena-backed doubly linked packet queues.
//!
//! Every packet captured by the engine lives in a single [`PacketStore`] and is
//! addressed through a generational [`PacketHandle`]. A [`PacketQueue`] is a pair
//! of sentinel slots (head and tail) inside the same store, so moving a packet
//! from the shared queue into a module's private buffer is pure index
//! relinking: no copies, no allocation, O(1).
//!
//! Ordering convention: new packets enter right after the head sentinel
//! (the *front*) and leave right before the tail sentinel (the *back*), which
//! gives FIFO behaviour without scanning.
//!
//! A packet is linked into at most one queue at a time. The length of each
//! queue is kept on its head sentinel and only ever changed by the two private
//! relinking primitives (`link_after` / `unlink`), so it cannot drift from the
//! link structure.

use crate::network::core::packet_data::PacketData;
use log::{error, warn};

const NIL: usize = usize::MAX;

/// Stable reference to a packet stored in a [`PacketStore`].
///
/// Handles carry a generation counter; once the packet is removed the handle
/// goes stale and every operation on it is rejected instead of touching the
/// slot's next occupant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PacketHandle {
    index: usize,
    generation: u32,
}

/// A queue of packets delimited by two sentinel slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PacketQueue {
    head: PacketHandle,
    tail: PacketHandle,
}

#[derive(Debug)]
enum Entry {
    Vacant,
    Head { len: usize },
    Tail,
    Packet(PacketData),
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    prev: usize,
    next: usize,
    owner: Option<PacketQueue>,
    entry: Entry,
}

/// Owner of every packet record and every queue built on top of them.
#[derive(Debug, Default)]
pub struct PacketStore {
    slots: Vec<Slot>,
    free: Vec<usize>,
    packets: usize,
}

impl PacketStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty store with room for `capacity` slots.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
            packets: 0,
        }
    }

    /// Allocates a new, empty queue (a linked head/tail sentinel pair).
    pub fn create_queue(&mut self) -> PacketQueue {
        let head = self.allocate(Entry::Head { len: 0 });
        let tail = self.allocate(Entry::Tail);
        self.slots[head.index].next = tail.index;
        self.slots[tail.index].prev = head.index;
        PacketQueue { head, tail }
    }

    /// Frees a queue's sentinels.
    ///
    /// Callers drain their queues before releasing them. Packets still linked
    /// at this point are destroyed and counted in the return value.
    pub fn release_queue(&mut self, queue: PacketQueue) -> usize {
        if !self.is_live_queue(queue) {
            invalid_operation("release_queue on a stale queue");
            return 0;
        }

        let mut destroyed = 0;
        while let Some(handle) = self.dequeue_back(queue) {
            self.remove(handle);
            destroyed += 1;
        }

        if destroyed > 0 {
            warn!("Released a queue that still held {} packets", destroyed);
        }

        self.release(queue.head.index);
        self.release(queue.tail.index);
        destroyed
    }

    /// Stores a packet without linking it into any queue.
    pub fn insert(&mut self, packet: PacketData) -> PacketHandle {
        self.packets += 1;
        self.allocate(Entry::Packet(packet))
    }

    /// Stores a packet and links it at the front of `queue`.
    pub fn push_front(&mut self, queue: PacketQueue, packet: PacketData) -> PacketHandle {
        let handle = self.insert(packet);
        self.enqueue_front(queue, handle);
        handle
    }

    /// Links `handle` immediately after the head sentinel of `queue`.
    ///
    /// A packet that is currently linked elsewhere is detached first, so this
    /// doubles as the "move to another queue" primitive.
    pub fn enqueue_front(&mut self, queue: PacketQueue, handle: PacketHandle) {
        if !self.is_live_queue(queue) || !self.is_live_packet(handle) {
            invalid_operation("enqueue_front with a stale handle");
            return;
        }

        self.unlink(handle.index);
        self.link_after(queue.head.index, handle.index, queue);
    }

    /// Links `handle` immediately after `anchor` (on its tail side), in
    /// whatever queue holds `anchor`.
    pub fn insert_after(&mut self, anchor: PacketHandle, handle: PacketHandle) {
        if anchor == handle || !self.is_live_packet(anchor) || !self.is_live_packet(handle) {
            invalid_operation("insert_after with a stale or identical handle");
            return;
        }

        let Some(owner) = self.slots[anchor.index].owner else {
            invalid_operation("insert_after a detached anchor");
            return;
        };

        self.unlink(handle.index);
        self.link_after(anchor.index, handle.index, owner);
    }

    /// Detaches and returns the packet immediately before the tail sentinel.
    pub fn dequeue_back(&mut self, queue: PacketQueue) -> Option<PacketHandle> {
        let handle = self.back(queue)?;
        self.unlink(handle.index);
        Some(handle)
    }

    /// Detaches `handle` from whatever queue currently links it.
    ///
    /// Returns `false` if the packet was already detached.
    pub fn pop_node(&mut self, handle: PacketHandle) -> bool {
        if !self.is_live_packet(handle) {
            invalid_operation("pop_node with a stale handle");
            return false;
        }

        self.unlink(handle.index)
    }

    /// Detaches and destroys a packet, handing its data back to the caller.
    pub fn remove(&mut self, handle: PacketHandle) -> Option<PacketData> {
        if !self.is_live_packet(handle) {
            return None;
        }

        self.unlink(handle.index);
        self.packets -= 1;
        match self.release(handle.index) {
            Entry::Packet(packet) => Some(packet),
            _ => None,
        }
    }

    /// Dequeues the oldest packet of `queue` and takes ownership of its data.
    pub fn pop_back(&mut self, queue: PacketQueue) -> Option<PacketData> {
        let handle = self.dequeue_back(queue)?;
        self.remove(handle)
    }

    /// True iff the head sentinel links straight to the tail sentinel.
    pub fn is_empty(&self, queue: PacketQueue) -> bool {
        if !self.is_live_queue(queue) {
            return true;
        }
        self.slots[queue.head.index].next == queue.tail.index
    }

    /// Number of packets linked into `queue`.
    pub fn len(&self, queue: PacketQueue) -> usize {
        if !self.is_live_queue(queue) {
            return 0;
        }
        match self.slots[queue.head.index].entry {
            Entry::Head { len } => len,
            _ => 0,
        }
    }

    /// Oldest packet of the queue (the one `dequeue_back` would return).
    pub fn back(&self, queue: PacketQueue) -> Option<PacketHandle> {
        if !self.is_live_queue(queue) {
            return None;
        }
        self.packet_at(self.slots[queue.tail.index].prev)
    }

    /// Newest packet of the queue.
    pub fn front(&self, queue: PacketQueue) -> Option<PacketHandle> {
        if !self.is_live_queue(queue) {
            return None;
        }
        self.packet_at(self.slots[queue.head.index].next)
    }

    /// Neighbour towards the back (the next older packet), if any.
    pub fn next(&self, handle: PacketHandle) -> Option<PacketHandle> {
        if !self.is_live_packet(handle) {
            return None;
        }
        self.packet_at(self.slots[handle.index].next)
    }

    /// Neighbour towards the front (the next newer packet), if any.
    pub fn prev(&self, handle: PacketHandle) -> Option<PacketHandle> {
        if !self.is_live_packet(handle) {
            return None;
        }
        self.packet_at(self.slots[handle.index].prev)
    }

    /// Queue currently linking `handle`, or `None` for detached packets.
    pub fn owner(&self, handle: PacketHandle) -> Option<PacketQueue> {
        if !self.is_live_packet(handle) {
            return None;
        }
        self.slots[handle.index].owner
    }

    pub fn get(&self, handle: PacketHandle) -> Option<&PacketData> {
        match self.slots.get(handle.index) {
            Some(Slot {
                generation,
                entry: Entry::Packet(packet),
                ..
            }) if *generation == handle.generation => Some(packet),
            _ => None,
        }
    }

    pub fn get_mut(&mut self, handle: PacketHandle) -> Option<&mut PacketData> {
        match self.slots.get_mut(handle.index) {
            Some(Slot {
                generation,
                entry: Entry::Packet(packet),
                ..
            }) if *generation == handle.generation => Some(packet),
            _ => None,
        }
    }

    /// Exchanges the packet data held by two handles, leaving links untouched.
    pub fn swap_packets(&mut self, a: PacketHandle, b: PacketHandle) -> bool {
        if !self.is_live_packet(a) || !self.is_live_packet(b) {
            return false;
        }
        if a == b {
            return true;
        }

        let first = std::mem::replace(&mut self.slots[a.index].entry, Entry::Vacant);
        let second = std::mem::replace(&mut self.slots[b.index].entry, first);
        self.slots[a.index].entry = second;
        true
    }

    /// Snapshot of the queue's handles, oldest (back) first.
    pub fn handles_oldest_first(&self, queue: PacketQueue) -> Vec<PacketHandle> {
        let mut handles = Vec::with_capacity(self.len(queue));
        let mut cursor = self.back(queue);
        while let Some(handle) = cursor {
            handles.push(handle);
            cursor = self.prev(handle);
        }
        handles
    }

    /// Total payload bytes linked into `queue`.
    pub fn bytes_queued(&self, queue: PacketQueue) -> usize {
        self.handles_oldest_first(queue)
            .into_iter()
            .filter_map(|handle| self.get(handle))
            .map(PacketData::size)
            .sum()
    }

    /// Moves every packet from `from` to the front of `to`, oldest first, so
    /// the relative order of the moved packets is preserved.
    pub fn drain_into(&mut self, from: PacketQueue, to: PacketQueue) -> usize {
        let mut moved = 0;
        while let Some(handle) = self.dequeue_back(from) {
            self.enqueue_front(to, handle);
            moved += 1;
        }
        moved
    }

    /// Number of live packets in the store, linked or not.
    pub fn packet_count(&self) -> usize {
        self.packets
    }

    /// Walks the queue and verifies links, ownership and the stored length.
    pub fn is_consistent(&self, queue: PacketQueue) -> bool {
        if !self.is_live_queue(queue) {
            return false;
        }

        let mut count = 0;
        let mut current = queue.head.index;
        loop {
            let next = self.slots[current].next;
            if next >= self.slots.len() || self.slots[next].prev != current {
                return false;
            }
            if next == queue.tail.index {
                break;
            }
            if self.slots[next].owner != Some(queue) {
                return false;
            }
            count += 1;
            if count > self.slots.len() {
                return false;
            }
            current = next;
        }

        count == self.len(queue)
    }

    fn allocate(&mut self, entry: Entry) -> PacketHandle {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index];
            slot.prev = NIL;
            slot.next = NIL;
            slot.owner = None;
            slot.entry = entry;
            return PacketHandle {
                index,
                generation: slot.generation,
            };
        }

        let index = self.slots.len();
        self.slots.push(Slot {
            generation: 0,
            prev: NIL,
            next: NIL,
            owner: None,
            entry,
        });
        PacketHandle {
            index,
            generation: 0,
        }
    }

    fn release(&mut self, index: usize) -> Entry {
        let slot = &mut self.slots[index];
        slot.generation = slot.generation.wrapping_add(1);
        slot.prev = NIL;
        slot.next = NIL;
        slot.owner = None;
        self.free.push(index);
        std::mem::replace(&mut slot.entry, Entry::Vacant)
    }

    fn is_live_packet(&self, handle: PacketHandle) -> bool {
        self.get(handle).is_some()
    }

    fn is_live_queue(&self, queue: PacketQueue) -> bool {
        let head_ok = matches!(
            self.slots.get(queue.head.index),
            Some(Slot { generation, entry: Entry::Head { .. }, .. }) if *generation == queue.head.generation
        );
        let tail_ok = matches!(
            self.slots.get(queue.tail.index),
            Some(Slot { generation, entry: Entry::Tail, .. }) if *generation == queue.tail.generation
        );
        head_ok && tail_ok
    }

    fn packet_at(&self, index: usize) -> Option<PacketHandle> {
        match self.slots.get(index) {
            Some(Slot {
                generation,
                entry: Entry::Packet(_),
                ..
            }) => Some(PacketHandle {
                index,
                generation: *generation,
            }),
            _ => None,
        }
    }

    fn link_after(&mut self, anchor: usize, index: usize, owner: PacketQueue) {
        let next = self.slots[anchor].next;

        let slot = &mut self.slots[index];
        slot.prev = anchor;
        slot.next = next;
        slot.owner = Some(owner);

        self.slots[anchor].next = index;
        self.slots[next].prev = index;

        if let Entry::Head { len } = &mut self.slots[owner.head.index].entry {
            *len += 1;
        }
    }

    fn unlink(&mut self, index: usize) -> bool {
        let (prev, next, owner) = {
            let slot = &self.slots[index];
            (slot.prev, slot.next, slot.owner)
        };
        let Some(owner) = owner else {
            return false;
        };

        debug_assert!(
            self.slots[prev].next == index && self.slots[next].prev == index,
            "packet queue links are inconsistent around slot {}",
            index
        );

        self.slots[prev].next = next;
        self.slots[next].prev = prev;

        if let Entry::Head { len } = &mut self.slots[owner.head.index].entry {
            *len -= 1;
        }

        let slot = &mut self.slots[index];
        slot.prev = NIL;
        slot.next = NIL;
        slot.owner = None;
        true
    }
}

/// Queue misuse is a programming error: fatal in debug builds, a logged
/// no-op in release builds.
fn invalid_operation(operation: &str) {
    debug_assert!(false, "invalid packet queue operation: {}", operation);
    error!("Ignored invalid packet queue operation: {}", operation);
}
