use heapless::{String, Vec};

use super::{DurableStore, RetainedSlot, RetentionStore, StoreError};
use crate::radio::{MAX_NONCES_LEN, MAX_SESSION_LEN};

/// Longest namespace or key accepted by [`DurableMemory`]
pub const MAX_KEY_LEN: usize = 15;
/// Entries held by [`DurableMemory`]
pub const DURABLE_ENTRIES: usize = 8;
/// Value capacity of a [`DurableMemory`] entry
pub const DURABLE_VALUE_LEN: usize = 64;

const _: () = assert!(MAX_NONCES_LEN <= DURABLE_VALUE_LEN);

/// RAM-backed retention memory
///
/// On a device this lives in the memory region kept powered during deep
/// sleep. [`RetentionMemory::power_loss`] models a cold boot.
#[derive(Debug, Clone, Default)]
pub struct RetentionMemory {
    slots: [Option<Vec<u8, MAX_SESSION_LEN>>; 3],
}

impl RetentionMemory {
    /// Create an empty retention memory, as found after a cold boot
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every slot
    pub fn power_loss(&mut self) {
        for slot in self.slots.iter_mut() {
            *slot = None;
        }
    }

    /// Whether a slot holds data
    pub fn contains(&self, slot: RetainedSlot) -> bool {
        self.slots[slot.index()].is_some()
    }
}

impl RetentionStore for RetentionMemory {
    fn read(&self, slot: RetainedSlot, buf: &mut [u8]) -> Result<Option<usize>, StoreError> {
        match &self.slots[slot.index()] {
            Some(data) => copy_out(data, buf).map(Some),
            None => Ok(None),
        }
    }

    fn write(&mut self, slot: RetainedSlot, data: &[u8]) -> Result<(), StoreError> {
        let value = Vec::from_slice(data).map_err(|_| StoreError::ValueTooLarge)?;
        self.slots[slot.index()] = Some(value);
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct Entry {
    namespace: String<MAX_KEY_LEN>,
    key: String<MAX_KEY_LEN>,
    value: Vec<u8, DURABLE_VALUE_LEN>,
}

/// RAM-backed durable store
///
/// Survives only as long as the value itself; used on hosts and in tests
/// in place of flash-backed preferences.
#[derive(Debug, Clone, Default)]
pub struct DurableMemory {
    entries: Vec<Entry, DURABLE_ENTRIES>,
    writes: u32,
}

impl DurableMemory {
    /// Create an empty store, as found on a factory-fresh device
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful writes since creation
    pub fn write_count(&self) -> u32 {
        self.writes
    }

    /// Borrow a stored value
    pub fn get(&self, namespace: &str, key: &str) -> Option<&[u8]> {
        self.position(namespace, key)
            .map(|i| self.entries[i].value.as_slice())
    }

    /// Drop every entry, as a flash erase would
    pub fn erase(&mut self) {
        self.entries.clear();
    }

    fn position(&self, namespace: &str, key: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.namespace.as_str() == namespace && e.key.as_str() == key)
    }
}

impl DurableStore for DurableMemory {
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<Option<usize>, StoreError> {
        match self.position(namespace, key) {
            Some(i) => copy_out(&self.entries[i].value, buf).map(Some),
            None => Ok(None),
        }
    }

    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StoreError> {
        // Build the full value before touching the table
        let value = Vec::from_slice(data).map_err(|_| StoreError::ValueTooLarge)?;

        match self.position(namespace, key) {
            Some(i) => self.entries[i].value = value,
            None => {
                let entry = Entry {
                    namespace: bounded(namespace)?,
                    key: bounded(key)?,
                    value,
                };
                self.entries.push(entry).map_err(|_| StoreError::Full)?;
            }
        }

        self.writes = self.writes.wrapping_add(1);
        Ok(())
    }

    fn remove(&mut self, namespace: &str, key: &str) -> Result<(), StoreError> {
        if let Some(i) = self.position(namespace, key) {
            self.entries.swap_remove(i);
        }
        Ok(())
    }
}

fn bounded(s: &str) -> Result<String<MAX_KEY_LEN>, StoreError> {
    let mut out = String::new();
    out.push_str(s).map_err(|_| StoreError::KeyTooLong)?;
    Ok(out)
}

fn copy_out(data: &[u8], buf: &mut [u8]) -> Result<usize, StoreError> {
    let dst = buf.get_mut(..data.len()).ok_or(StoreError::BufferTooSmall)?;
    dst.copy_from_slice(data);
    Ok(data.len())
}
