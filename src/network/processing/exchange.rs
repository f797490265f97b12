//! The hand-off point between the capture thread and the shaping thread.

use crate::error::{Result, SnarlError};
use crate::network::core::{PacketData, PacketQueue, PacketStore};
use std::sync::{Arc, Mutex, MutexGuard};

/// Packet arena plus the shared queue, guarded together by one lock.
///
/// Private module buffers live in the same arena, so holding this lock also
/// covers them. Only the shaping thread touches private queues.
#[derive(Debug)]
pub struct PacketExchange {
    pub store: PacketStore,
    pub shared: PacketQueue,
    captured: usize,
}

/// Handle shared between the engine threads.
pub type SharedExchange = Arc<Mutex<PacketExchange>>;

impl PacketExchange {
    pub fn new() -> Self {
        let mut store = PacketStore::new();
        let shared = store.create_queue();
        Self {
            store,
            shared,
            captured: 0,
        }
    }

    pub fn shared() -> SharedExchange {
        Arc::new(Mutex::new(Self::new()))
    }

    /// Appends a freshly captured packet at the newest end of the shared queue.
    pub fn capture(&mut self, packet: PacketData) {
        self.store.push_front(self.shared, packet);
        self.captured += 1;
    }

    /// Removes everything left on the shared queue, oldest first.
    pub fn take_ready(&mut self) -> Vec<PacketData> {
        let mut ready = Vec::with_capacity(self.store.len(self.shared));
        while let Some(packet) = self.store.pop_back(self.shared) {
            ready.push(packet);
        }
        ready
    }

    /// Packets waiting on the shared queue.
    pub fn pending(&self) -> usize {
        self.store.len(self.shared)
    }

    /// Total packets captured since creation.
    pub fn captured(&self) -> usize {
        self.captured
    }
}

impl Default for PacketExchange {
    fn default() -> Self {
        Self::new()
    }
}

/// Locks the exchange, mapping a poisoned mutex to an error.
pub fn lock_exchange(exchange: &SharedExchange) -> Result<MutexGuard<'_, PacketExchange>> {
    exchange
        .lock()
        .map_err(|_| SnarlError::lock_poisoned("packet exchange"))
}
