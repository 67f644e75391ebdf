use core::fmt;
use core::time::Duration;

use super::{AESKey, EUI64};
use crate::activation::backoff::JoinBackoff;

/// Durable-store namespace holding the join nonces
pub const DEFAULT_NONCE_NAMESPACE: &str = "lorawan";
/// Durable-store key of the join nonce buffer
pub const DEFAULT_NONCE_KEY: &str = "nonces";
/// Time the device spends in deep sleep between two wake cycles
pub const DEFAULT_SLEEP_INTERVAL: Duration = Duration::from_secs(15 * 60);

/// Long-term credentials of an OTAA device
///
/// Provisioned at build time and never persisted at runtime.
#[derive(Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    /// Join EUI (called AppEUI before LoRaWAN 1.1)
    pub join_eui: EUI64,
    /// Device EUI (unique device identifier)
    pub dev_eui: EUI64,
    /// Application root key
    pub app_key: AESKey,
    /// Network root key
    pub nwk_key: AESKey,
}

impl DeviceIdentity {
    /// Create a new OTAA identity
    pub const fn new_otaa(join_eui: EUI64, dev_eui: EUI64, app_key: AESKey, nwk_key: AESKey) -> Self {
        Self {
            join_eui,
            dev_eui,
            app_key,
            nwk_key,
        }
    }

    /// Create an identity from EUIs written as 64-bit numbers, the way
    /// network consoles display them (`0x70B3D57ED0072797`)
    pub const fn from_eui64(join_eui: u64, dev_eui: u64, app_key: AESKey, nwk_key: AESKey) -> Self {
        Self::new_otaa(join_eui.to_be_bytes(), dev_eui.to_be_bytes(), app_key, nwk_key)
    }
}

// Keys stay out of logs.
impl fmt::Debug for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceIdentity")
            .field("join_eui", &Eui(&self.join_eui))
            .field("dev_eui", &Eui(&self.dev_eui))
            .finish_non_exhaustive()
    }
}

struct Eui<'a>(&'a EUI64);

impl fmt::Debug for Eui<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in self.0 {
            write!(f, "{:02X}", b)?;
        }
        Ok(())
    }
}

/// Activation and wake-cycle policy
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Durable-store namespace of the nonce buffer
    pub nonce_namespace: &'static str,
    /// Durable-store key of the nonce buffer
    pub nonce_key: &'static str,
    /// Wait between failed join attempts
    pub backoff: JoinBackoff,
    /// Deep-sleep duration reported at the end of a wake cycle
    pub sleep_interval: Duration,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            nonce_namespace: DEFAULT_NONCE_NAMESPACE,
            nonce_key: DEFAULT_NONCE_KEY,
            backoff: JoinBackoff::default(),
            sleep_interval: DEFAULT_SLEEP_INTERVAL,
        }
    }
}
