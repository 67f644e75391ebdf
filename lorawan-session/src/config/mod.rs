//! Device and node configuration
//!
//! This module contains the provisioned identity of a device and the
//! policy knobs of its activation lifecycle. It includes:
//! - Device identity (JoinEUI, DevEUI, root keys)
//! - Durable-store location of the join nonces
//! - Join backoff policy and sleep interval

/// Device identity and node configuration
pub mod device;

pub use device::{DeviceIdentity, NodeConfig};

/// EUI-64 (8 bytes)
pub type EUI64 = [u8; 8];
/// AES-128 key (16 bytes)
pub type AESKey = [u8; 16];
