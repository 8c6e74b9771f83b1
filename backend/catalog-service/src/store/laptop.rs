//! Laptop catalog store.

use crate::error::StoreError;
use crate::pb::catalog::{memory, Filter, Laptop, Memory};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::ops::ControlFlow;

/// Concurrent laptop-id to laptop map.
pub trait LaptopStore: Send + Sync {
    /// Atomic check-then-insert; rejects an id that is already present.
    fn save(&self, laptop: Laptop) -> Result<(), StoreError>;

    /// Copy of the stored laptop, or `None` when absent.
    fn find(&self, id: &str) -> Option<Laptop>;

    /// Invoke `on_match` once per laptop matching `filter`, in the
    /// caller's control flow. The internal lock is not held while
    /// `on_match` runs, so writers are never blocked by a slow consumer.
    /// Iteration order is unspecified; items written concurrently may be
    /// missed or included.
    fn search(&self, filter: &Filter, on_match: &mut dyn FnMut(Laptop) -> ControlFlow<()>);
}

/// In-memory implementation backed by a `HashMap`.
#[derive(Default)]
pub struct InMemoryLaptopStore {
    laptops: RwLock<HashMap<String, Laptop>>,
}

impl InMemoryLaptopStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LaptopStore for InMemoryLaptopStore {
    fn save(&self, laptop: Laptop) -> Result<(), StoreError> {
        let mut laptops = self.laptops.write();
        if laptops.contains_key(&laptop.id) {
            return Err(StoreError::AlreadyExists);
        }
        laptops.insert(laptop.id.clone(), laptop);
        Ok(())
    }

    fn find(&self, id: &str) -> Option<Laptop> {
        self.laptops.read().get(id).cloned()
    }

    fn search(&self, filter: &Filter, on_match: &mut dyn FnMut(Laptop) -> ControlFlow<()>) {
        // Snapshot the ids, then fetch one item per lock acquisition so
        // the callback runs unlocked.
        let ids: Vec<String> = self.laptops.read().keys().cloned().collect();

        for id in ids {
            let Some(laptop) = self.laptops.read().get(&id).cloned() else {
                continue;
            };
            if !is_qualified(filter, &laptop) {
                continue;
            }
            if on_match(laptop).is_break() {
                return;
            }
        }
    }
}

/// True when the laptop satisfies every bound of the filter.
pub(crate) fn is_qualified(filter: &Filter, laptop: &Laptop) -> bool {
    let core_count = laptop.cpu.as_ref().map_or(0, |cpu| cpu.core_count);
    let min_ghz = laptop.cpu.as_ref().map_or(0.0, |cpu| cpu.min_ghz);
    let ram_bits = laptop.ram.as_ref().map_or(0, memory_bits);
    let wanted_bits = filter.min_ram.as_ref().map_or(0, memory_bits);

    laptop.price_usd <= filter.max_price_usd
        && core_count >= filter.min_cpu_cores
        && min_ghz >= filter.min_cpu_ghz
        && ram_bits >= wanted_bits
}

/// Normalize a memory amount to bits so differing units compare.
pub(crate) fn memory_bits(memory: &Memory) -> u64 {
    let factor: u64 = match memory.unit() {
        memory::Unit::Bit => 1,
        memory::Unit::Byte => 8,
        memory::Unit::Kilobyte => 8 << 10,
        memory::Unit::Megabyte => 8 << 20,
        memory::Unit::Gigabyte => 8 << 30,
        memory::Unit::Terabyte => 8 << 40,
        memory::Unit::Unspecified => 0,
    };
    memory.value.saturating_mul(factor)
}
