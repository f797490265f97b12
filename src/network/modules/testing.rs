//! Test harness for driving a module over a standalone store.

use crate::error::Result;
use crate::network::core::packet_data::{Direction, PacketData};
use crate::network::core::queue::{PacketHandle, PacketQueue, PacketStore};
use crate::network::modules::stats::PacketProcessingStatistics;
use crate::network::modules::traits::{ModuleContext, PacketModule};
use std::sync::{Arc, RwLock, RwLockReadGuard};

pub(crate) struct Harness {
    pub store: PacketStore,
    pub shared: PacketQueue,
    pub stats: Arc<RwLock<PacketProcessingStatistics>>,
}

impl Harness {
    pub fn new() -> Self {
        let mut store = PacketStore::new();
        let shared = store.create_queue();
        Self {
            store,
            shared,
            stats: Arc::new(RwLock::new(PacketProcessingStatistics::default())),
        }
    }

    /// Captures a packet whose first two bytes carry `id`.
    pub fn capture(
        &mut self,
        id: u16,
        size: usize,
        direction: Direction,
        now_ms: u64,
    ) -> PacketHandle {
        let mut data = vec![0u8; size.max(2)];
        data[..2].copy_from_slice(&id.to_be_bytes());
        self.store
            .push_front(self.shared, PacketData::new(data, direction, now_ms))
    }

    pub fn capture_many(&mut self, count: u16, size: usize, direction: Direction, now_ms: u64) {
        for id in 0..count {
            self.capture(id, size, direction, now_ms);
        }
    }

    pub fn run<M: PacketModule>(
        &mut self,
        module: &M,
        options: &M::Options,
        state: &mut M::State,
        now_ms: u64,
    ) -> Result<bool> {
        let mut ctx = ModuleContext::new(&mut self.store, self.shared, now_ms, &self.stats);
        module.process(options, state, &mut ctx)
    }

    pub fn start<M: PacketModule>(
        &mut self,
        module: &M,
        options: &M::Options,
        state: &mut M::State,
        now_ms: u64,
    ) -> Result<()> {
        let mut ctx = ModuleContext::new(&mut self.store, self.shared, now_ms, &self.stats);
        module.start_up(options, state, &mut ctx)
    }

    pub fn close<M: PacketModule>(
        &mut self,
        module: &M,
        state: &mut M::State,
        now_ms: u64,
    ) -> Result<()> {
        let mut ctx = ModuleContext::new(&mut self.store, self.shared, now_ms, &self.stats);
        module.close_down(state, &mut ctx)
    }

    pub fn shared_len(&self) -> usize {
        self.store.len(self.shared)
    }

    /// Ids of the packets on the shared queue, oldest first.
    pub fn shared_ids(&self) -> Vec<u16> {
        self.store
            .handles_oldest_first(self.shared)
            .into_iter()
            .filter_map(|handle| self.store.get(handle))
            .map(|packet| u16::from_be_bytes([packet.data[0], packet.data[1]]))
            .collect()
    }

    /// Injects everything on the shared queue, oldest first.
    pub fn drain_shared(&mut self) -> Vec<PacketData> {
        let mut sent = Vec::new();
        while let Some(packet) = self.store.pop_back(self.shared) {
            sent.push(packet);
        }
        sent
    }

    pub fn stats(&self) -> RwLockReadGuard<'_, PacketProcessingStatistics> {
        self.stats.read().unwrap()
    }
}
