//! LoRaWAN activation and session persistence for deep-sleeping devices
//!
//! A battery-operated node powers down between uplinks. On every boot or
//! wake it has to decide whether the session negotiated earlier can be
//! resumed or a full OTAA join is needed, keep join nonces from ever being
//! reused, and retry failed joins without flooding a shared band.
//!
//! # Features
//! - Restore-before-join activation state machine
//! - Split persistence: nonces in a durable store, session in retention memory
//! - Linear, capped join backoff
//! - Single-exchange uplink sessions with explicit session saves
//! - Byte-exact status uplink framing
//! - `no_std`; the `std` feature adds a file-backed durable store
//!
//! # Example
//! ```no_run
//! use embedded_hal::blocking::delay::DelayMs;
//! use lorawan_session::{
//!     activation::{ActivationManager, ActivationOutcome},
//!     config::{DeviceIdentity, NodeConfig},
//!     radio::RadioLink,
//!     store::{DurableMemory, RetentionMemory},
//! };
//!
//! const IDENTITY: DeviceIdentity = DeviceIdentity::from_eui64(
//!     0x0000000000000000,
//!     0x70B3D57ED0072797,
//!     [0x50; 16],
//!     [0x50; 16],
//! );
//!
//! fn wake<L: RadioLink, D: DelayMs<u32>>(link: L, delay: D) {
//!     let mut manager = ActivationManager::new(
//!         link,
//!         RetentionMemory::new(),
//!         DurableMemory::new(),
//!         delay,
//!         IDENTITY,
//!         NodeConfig::default(),
//!     );
//!
//!     if let ActivationOutcome::Failed(e) = manager.activate() {
//!         panic!("{}", e);
//!     }
//!
//!     if let Some(mut session) = manager.uplink() {
//!         let _ = session.send_receive(&[0x01, 0x0F, 0xAB], |downlink| {
//!             let _ = downlink;
//!         });
//!         let _ = session.save_session();
//!     }
//! }
//! ```

#![warn(missing_docs)]
#![cfg_attr(not(feature = "std"), no_std)]

/// Activation state machine and join backoff
pub mod activation;

/// Device identity and node configuration
pub mod config;

/// Wake cycle orchestration
pub mod cycle;

/// Status uplink framing
pub mod payload;

/// Radio link capability
pub mod radio;

/// Retention and durable storage
pub mod store;

/// Uplink/downlink exchange
pub mod uplink;
