//! Memory accounting.
//!
//! Tracks a fixed-capacity pool of abstract blocks, each attributed to an
//! owning process. No bytes are actually reserved; this is bookkeeping only.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use wos_hal::{HalError, HAL};

use crate::error::KernelError;
use crate::ProcessId;

/// Default pool capacity (10 MiB).
pub const DEFAULT_TOTAL_MEMORY: u64 = 10 * 1024 * 1024;

/// Default storage key for the memory subsystem marker.
pub const DEFAULT_MEMORY_KEY: &str = "webos_memory";

/// Memory block identifier
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BlockId(pub u64);

impl std::fmt::Display for BlockId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A live allocation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryBlock {
    pub id: BlockId,
    pub size: u64,
    pub owner: ProcessId,
    pub description: String,
    pub created_at: u64,
}

/// Pool statistics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryStats {
    /// Pool capacity in bytes
    pub total: u64,
    /// Sum of live block sizes
    pub used: u64,
    /// `total - used`
    pub free: u64,
    /// Number of live blocks
    pub block_count: usize,
}

/// Fixed-capacity allocation tracker.
pub struct MemoryManager {
    total: u64,
    used: u64,
    blocks: BTreeMap<BlockId, MemoryBlock>,
    next_block_id: u64,
}

impl Default for MemoryManager {
    fn default() -> Self {
        Self::new(DEFAULT_TOTAL_MEMORY)
    }
}

impl MemoryManager {
    pub fn new(total: u64) -> Self {
        Self {
            total,
            used: 0,
            blocks: BTreeMap::new(),
            next_block_id: 1,
        }
    }

    /// Write the subsystem marker under `key` if it is not there yet.
    pub fn initialize<H: HAL>(&self, hal: &H, key: &str) -> Result<(), HalError> {
        if !hal.storage_exists(key)? {
            hal.storage_write(key, "{}")?;
        }
        log::info!("[memory] initialized: {} bytes", self.total);
        Ok(())
    }

    /// Reserve `size` bytes for `owner`.
    pub fn allocate(
        &mut self,
        size: u64,
        owner: ProcessId,
        description: &str,
        now: u64,
    ) -> Result<BlockId, KernelError> {
        let available = self.total - self.used;
        if size > available {
            log::warn!(
                "[memory] allocation of {} bytes for PID {} refused ({} available)",
                size,
                owner,
                available
            );
            return Err(KernelError::OutOfMemory {
                requested: size,
                available,
            });
        }

        let id = BlockId(self.next_block_id);
        self.next_block_id += 1;

        self.blocks.insert(
            id,
            MemoryBlock {
                id,
                size,
                owner,
                description: String::from(description),
                created_at: now,
            },
        );
        self.used += size;
        log::debug!("[memory] block {} ({} bytes) -> PID {}", id, size, owner);
        Ok(id)
    }

    /// Release a block. Unknown ids are ignored and return `false`.
    pub fn deallocate(&mut self, id: BlockId) -> bool {
        match self.blocks.remove(&id) {
            Some(block) => {
                self.used -= block.size;
                true
            }
            None => false,
        }
    }

    /// Release every block owned by `owner`, returning the bytes freed.
    pub fn cleanup_process_memory(&mut self, owner: ProcessId) -> u64 {
        let mut freed = 0;
        self.blocks.retain(|_, block| {
            if block.owner == owner {
                freed += block.size;
                false
            } else {
                true
            }
        });
        self.used -= freed;

        if freed > 0 {
            log::debug!("[memory] freed {} bytes from PID {}", freed, owner);
        }
        freed
    }

    pub fn block(&self, id: BlockId) -> Option<&MemoryBlock> {
        self.blocks.get(&id)
    }

    pub fn blocks_owned_by(&self, owner: ProcessId) -> Vec<&MemoryBlock> {
        self.blocks.values().filter(|b| b.owner == owner).collect()
    }

    pub fn stats(&self) -> MemoryStats {
        MemoryStats {
            total: self.total,
            used: self.used,
            free: self.total - self.used,
            block_count: self.blocks.len(),
        }
    }
}
