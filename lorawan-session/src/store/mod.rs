//! Persistence tiers of a deep-sleeping node
//!
//! Two tiers with different lifetimes:
//! - [`RetentionStore`]: survives deep sleep, cleared by power loss or a cold
//!   reset. Holds the live session and the wake counters.
//! - [`DurableStore`]: survives power loss. Holds the join nonces.
//!
//! The tiers must never be collapsed: nonces that disappear with the battery
//! would be reused on the next join.

use core::fmt;

/// In-memory implementations of both tiers
pub mod memory;

/// File-backed durable store
#[cfg(feature = "std")]
pub mod file;

pub use memory::{DurableMemory, RetentionMemory};

#[cfg(feature = "std")]
pub use file::FileStore;

/// Storage error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(all(feature = "defmt", not(feature = "std")), derive(defmt::Format))]
pub enum StoreError {
    /// Namespace or key longer than the store supports
    KeyTooLong,
    /// Namespace or key the store cannot represent
    InvalidKey,
    /// Value larger than the slot capacity
    ValueTooLarge,
    /// No free entry left
    Full,
    /// Caller buffer smaller than the stored value
    BufferTooSmall,
    /// Underlying filesystem error
    #[cfg(feature = "std")]
    Io(std::io::ErrorKind),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::KeyTooLong => f.write_str("key too long"),
            StoreError::InvalidKey => f.write_str("invalid key"),
            StoreError::ValueTooLarge => f.write_str("value too large"),
            StoreError::Full => f.write_str("store full"),
            StoreError::BufferTooSmall => f.write_str("read buffer too small"),
            #[cfg(feature = "std")]
            StoreError::Io(kind) => write!(f, "i/o error: {:?}", kind),
        }
    }
}

#[cfg(feature = "std")]
impl From<std::io::Error> for StoreError {
    fn from(error: std::io::Error) -> Self {
        StoreError::Io(error.kind())
    }
}

/// Slots of the retention memory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RetainedSlot {
    /// Live session buffer
    Session,
    /// Wake cycles since the last cold boot
    BootCount,
    /// Failed join attempts since the last successful join
    JoinFailures,
}

impl RetainedSlot {
    /// Every slot, in storage order
    pub const ALL: [RetainedSlot; 3] = [
        RetainedSlot::Session,
        RetainedSlot::BootCount,
        RetainedSlot::JoinFailures,
    ];

    pub(crate) fn index(self) -> usize {
        match self {
            RetainedSlot::Session => 0,
            RetainedSlot::BootCount => 1,
            RetainedSlot::JoinFailures => 2,
        }
    }
}

/// Memory that survives deep sleep but not power loss
pub trait RetentionStore {
    /// Copy a slot into `buf`, returning its length, or `None` if the slot
    /// holds nothing
    fn read(&self, slot: RetainedSlot, buf: &mut [u8]) -> Result<Option<usize>, StoreError>;

    /// Replace a slot's contents
    fn write(&mut self, slot: RetainedSlot, data: &[u8]) -> Result<(), StoreError>;

    /// Read a counter slot; an empty slot reads as zero
    fn read_counter(&self, slot: RetainedSlot) -> Result<u32, StoreError> {
        let mut buf = [0u8; 4];
        match self.read(slot, &mut buf)? {
            Some(4) => Ok(u32::from_be_bytes(buf)),
            // Anything else was not written by write_counter
            _ => Ok(0),
        }
    }

    /// Write a counter slot
    fn write_counter(&mut self, slot: RetainedSlot, value: u32) -> Result<(), StoreError> {
        self.write(slot, &value.to_be_bytes())
    }
}

/// Namespaced key/value storage that survives power loss
///
/// A write either fully replaces the value or leaves the previous one in
/// place; readers never observe a partial write.
pub trait DurableStore {
    /// Copy a value into `buf`, returning its length, or `None` if the key
    /// is absent
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<Option<usize>, StoreError>;

    /// Atomically replace a value
    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StoreError>;

    /// Delete a value; deleting an absent key is not an error
    fn remove(&mut self, namespace: &str, key: &str) -> Result<(), StoreError>;
}

impl<T: RetentionStore + ?Sized> RetentionStore for &mut T {
    fn read(&self, slot: RetainedSlot, buf: &mut [u8]) -> Result<Option<usize>, StoreError> {
        (**self).read(slot, buf)
    }

    fn write(&mut self, slot: RetainedSlot, data: &[u8]) -> Result<(), StoreError> {
        (**self).write(slot, data)
    }
}

impl<T: DurableStore + ?Sized> DurableStore for &mut T {
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<Option<usize>, StoreError> {
        (**self).read(namespace, key, buf)
    }

    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StoreError> {
        (**self).write(namespace, key, data)
    }

    fn remove(&mut self, namespace: &str, key: &str) -> Result<(), StoreError> {
        (**self).remove(namespace, key)
    }
}
