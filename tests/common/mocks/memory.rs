use hwsense::traits::{MemoryStatus, MemoryUsage};
use hwsense::Result;

pub const GIB: u64 = 1024 * 1024 * 1024;

/// Reports 16 GiB of RAM with 4 GiB free, plus 4 GiB of swap with 2 GiB free
#[derive(Debug, Clone, Copy)]
pub struct FixedMemoryStatus {
    pub physical: MemoryUsage,
    pub swap: MemoryUsage,
}

impl Default for FixedMemoryStatus {
    fn default() -> Self {
        Self {
            physical: MemoryUsage { total: 16 * GIB, available: 4 * GIB },
            swap: MemoryUsage { total: 4 * GIB, available: 2 * GIB },
        }
    }
}

impl MemoryStatus for FixedMemoryStatus {
    fn physical(&self) -> Result<MemoryUsage> {
        Ok(self.physical)
    }

    fn virtual_memory(&self) -> Result<MemoryUsage> {
        Ok(MemoryUsage {
            total: self.physical.total + self.swap.total,
            available: self.physical.available + self.swap.available,
        })
    }
}
