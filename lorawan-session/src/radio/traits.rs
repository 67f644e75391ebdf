use core::fmt;

use crate::config::DeviceIdentity;

/// Largest nonce buffer any link may hand out
pub const MAX_NONCES_LEN: usize = 32;
/// Largest session buffer any link may hand out
pub const MAX_SESSION_LEN: usize = 512;
/// Largest downlink application payload
pub const MAX_DOWNLINK_LEN: usize = 242;

/// Result of a single OTAA join attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum JoinOutcome {
    /// Join-accept received, a fresh session is live
    NewSession,
    /// No valid join-accept in either receive window
    NoJoinAccept,
}

/// Receive window a downlink arrived in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DownlinkPresence {
    /// Network scheduled nothing
    None,
    /// Downlink in the first receive window
    Rx1,
    /// Downlink in the second receive window
    Rx2,
}

impl DownlinkPresence {
    /// Whether a downlink was received at all
    pub fn is_present(&self) -> bool {
        !matches!(self, DownlinkPresence::None)
    }
}

/// Downlink reported by [`RadioLink::send_receive`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Downlink {
    /// Window the downlink arrived in
    pub presence: DownlinkPresence,
    /// Number of payload bytes written to the caller's buffer
    pub len: usize,
}

impl Downlink {
    /// No downlink scheduled
    pub const NONE: Downlink = Downlink {
        presence: DownlinkPresence::None,
        len: 0,
    };
}

/// Radio link error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkError<E> {
    /// Transceiver fault
    Radio(E),
    /// Nonce buffer corrupt or issued for other credentials
    NoncesDiscarded,
    /// Session buffer stale or not produced by the loaded nonces
    SessionDiscarded,
    /// Every join nonce has been used
    NoncesExhausted,
    /// Operation requires an active session
    NotJoined,
    /// Uplink payload does not fit the current data rate
    PayloadTooLong,
    /// Downlink failed integrity or framing checks
    DownlinkMalformed,
}

impl<E> LinkError<E> {
    /// Whether retrying the join can never succeed
    pub fn is_fatal(&self) -> bool {
        matches!(self, LinkError::NoncesExhausted)
    }
}

impl<E: fmt::Debug> fmt::Display for LinkError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkError::Radio(e) => write!(f, "radio error: {:?}", e),
            LinkError::NoncesDiscarded => f.write_str("nonce buffer discarded"),
            LinkError::SessionDiscarded => f.write_str("session buffer discarded"),
            LinkError::NoncesExhausted => f.write_str("join nonces exhausted"),
            LinkError::NotJoined => f.write_str("network not joined"),
            LinkError::PayloadTooLong => f.write_str("uplink payload too long"),
            LinkError::DownlinkMalformed => f.write_str("downlink malformed"),
        }
    }
}

/// LoRaWAN node capability used by the activation lifecycle
///
/// Implementations own the MAC, the session cryptography and the layout of
/// the two persisted buffers. The activation core treats both buffers as
/// opaque blobs.
pub trait RadioLink {
    /// Error type of the underlying transceiver
    type Error: fmt::Debug;

    /// Size of the nonce buffer, at most [`MAX_NONCES_LEN`]
    const NONCES_LEN: usize;

    /// Size of the session buffer, at most [`MAX_SESSION_LEN`]
    const SESSION_LEN: usize;

    /// Initialize the transceiver and the node
    fn begin(&mut self) -> Result<(), LinkError<Self::Error>>;

    /// Whether a session is live in memory
    fn is_activated(&self) -> bool;

    /// Load a previously saved nonce buffer
    fn set_nonces(&mut self, nonces: &[u8]) -> Result<(), LinkError<Self::Error>>;

    /// Current nonce buffer
    fn nonces(&self) -> &[u8];

    /// Load a previously saved session buffer and reactivate from it
    ///
    /// Only valid after the nonces that produced the session were loaded.
    fn set_session(&mut self, session: &[u8]) -> Result<(), LinkError<Self::Error>>;

    /// Current session buffer
    fn session(&self) -> &[u8];

    /// Perform one OTAA join attempt
    ///
    /// Consumes a join nonce whatever the outcome.
    fn join_otaa(&mut self, identity: &DeviceIdentity) -> Result<JoinOutcome, LinkError<Self::Error>>;

    /// Send one uplink and listen for a downlink
    ///
    /// Downlink payload is written to `downlink`; its capacity bounds the
    /// accepted downlink size.
    fn send_receive(
        &mut self,
        payload: &[u8],
        downlink: &mut [u8],
    ) -> Result<Downlink, LinkError<Self::Error>>;
}
