//! Activation and session persistence
//!
//! On every boot or wake the node either resumes the session kept in
//! retention memory or pays for a full OTAA join. The decision runs through
//! these states:
//!
//! ```text
//! Unactivated -> RestoringNonces -> RestoringSession -> SessionRestored
//!                      |                  |
//!                      +------------------+--> Joining -> Joined
//!                                               ^   |
//!                                 BackoffWait <-+-- Failed
//! ```
//!
//! Join nonces live in the durable store and are rewritten after every join
//! attempt, successful or not. The session lives in retention memory and is
//! only trusted after the nonces that produced it were restored first.

use core::fmt;

use embedded_hal::blocking::delay::DelayMs;

/// Join retry policy
pub mod backoff;

pub use backoff::JoinBackoff;

use crate::config::{DeviceIdentity, NodeConfig};
use crate::radio::{JoinOutcome, LinkError, RadioLink, MAX_NONCES_LEN, MAX_SESSION_LEN};
use crate::store::{DurableStore, RetainedSlot, RetentionStore, StoreError};
use crate::uplink::UplinkSession;

/// Activation state machine states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ActivationState {
    /// Nothing attempted yet in this power cycle
    Unactivated,
    /// Loading join nonces from the durable store
    RestoringNonces,
    /// Loading the retained session
    RestoringSession,
    /// Join attempt in flight
    Joining,
    /// Last join attempt failed
    Failed,
    /// Sleeping before the next join attempt
    BackoffWait,
    /// Retained session resumed
    SessionRestored,
    /// Fresh session negotiated
    Joined,
}

impl ActivationState {
    /// Whether the state holds a usable session
    pub fn is_active(&self) -> bool {
        matches!(self, ActivationState::SessionRestored | ActivationState::Joined)
    }
}

/// Why the restore path could not resume a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RestoreFailure {
    /// Durable store holds no nonces: the device never attempted a join
    NoPriorNonces,
    /// Saved nonces were corrupt or rejected by the link
    NoncesRejected,
    /// Retention memory holds no session: power was lost
    NoPriorSession,
    /// Nonces valid but the session itself is stale
    SessionRejected,
}

/// Restore path error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreError<E> {
    /// Durable store holds no nonces
    NoPriorNonces,
    /// Saved nonces were corrupt or rejected by the link
    NoncesRejected(LinkError<E>),
    /// Retention memory holds no session
    NoPriorSession,
    /// Session rejected by the link
    SessionRejected(LinkError<E>),
    /// Durable store could not be read
    Storage(StoreError),
    /// The link holds nonces newer than the durable copy
    NoncesUnsaved,
}

impl<E> RestoreError<E> {
    /// Expected-condition classification, `None` for storage faults
    pub fn failure(&self) -> Option<RestoreFailure> {
        match self {
            RestoreError::NoPriorNonces => Some(RestoreFailure::NoPriorNonces),
            RestoreError::NoncesRejected(_) => Some(RestoreFailure::NoncesRejected),
            RestoreError::NoPriorSession => Some(RestoreFailure::NoPriorSession),
            RestoreError::SessionRejected(_) => Some(RestoreFailure::SessionRejected),
            RestoreError::Storage(_) | RestoreError::NoncesUnsaved => None,
        }
    }
}

impl<E: fmt::Debug> fmt::Display for RestoreError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RestoreError::NoPriorNonces => f.write_str("no saved nonces"),
            RestoreError::NoncesRejected(e) => write!(f, "saved nonces rejected: {}", e),
            RestoreError::NoPriorSession => f.write_str("no retained session"),
            RestoreError::SessionRejected(e) => write!(f, "retained session rejected: {}", e),
            RestoreError::Storage(e) => write!(f, "durable store: {}", e),
            RestoreError::NoncesUnsaved => f.write_str("link nonces not yet persisted"),
        }
    }
}

/// Fatal activation error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivationError<E> {
    /// Radio or node initialization failed
    RadioInitFailed(LinkError<E>),
    /// Join can never succeed
    Join(LinkError<E>),
    /// Nonces could not be read from or written to the durable store
    Storage(StoreError),
}

impl<E: fmt::Debug> fmt::Display for ActivationError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActivationError::RadioInitFailed(e) => write!(f, "radio init failed: {}", e),
            ActivationError::Join(e) => write!(f, "join failed: {}", e),
            ActivationError::Storage(e) => write!(f, "nonce storage failed: {}", e),
        }
    }
}

/// Result of [`ActivationManager::activate`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivationOutcome<E> {
    /// Previous session resumed, no join traffic
    SessionRestored,
    /// Fresh session negotiated by an OTAA join
    NewSessionJoined,
    /// Activation cannot proceed; the caller should halt or restart
    Failed(ActivationError<E>),
}

impl<E> ActivationOutcome<E> {
    /// Whether a session is usable
    pub fn is_active(&self) -> bool {
        !matches!(self, ActivationOutcome::Failed(_))
    }

    /// Failure reason, if any
    pub fn error(&self) -> Option<&ActivationError<E>> {
        match self {
            ActivationOutcome::Failed(e) => Some(e),
            _ => None,
        }
    }
}

/// Activation manager
///
/// Owns the link, both persistence tiers and the delay used for join
/// backoff. One manager runs per power cycle.
pub struct ActivationManager<L, RS, DS, D> {
    link: L,
    retention: RS,
    durable: DS,
    delay: D,
    identity: DeviceIdentity,
    config: NodeConfig,
    state: ActivationState,
    last_restore: Option<RestoreFailure>,
    join_attempts: u32,
    nonces_pending: bool,
}

impl<L, RS, DS, D> ActivationManager<L, RS, DS, D>
where
    L: RadioLink,
    RS: RetentionStore,
    DS: DurableStore,
    D: DelayMs<u32>,
{
    const BUFFERS_FIT: () = assert!(
        L::NONCES_LEN <= MAX_NONCES_LEN && L::SESSION_LEN <= MAX_SESSION_LEN,
        "link buffers exceed MAX_NONCES_LEN or MAX_SESSION_LEN"
    );

    /// Create a new activation manager
    ///
    /// Fails to compile for a link whose buffers exceed [`MAX_NONCES_LEN`]
    /// or [`MAX_SESSION_LEN`].
    pub fn new(
        link: L,
        retention: RS,
        durable: DS,
        delay: D,
        identity: DeviceIdentity,
        config: NodeConfig,
    ) -> Self {
        let () = Self::BUFFERS_FIT;

        Self {
            link,
            retention,
            durable,
            delay,
            identity,
            config,
            state: ActivationState::Unactivated,
            last_restore: None,
            join_attempts: 0,
            nonces_pending: false,
        }
    }

    /// Current state
    pub fn state(&self) -> ActivationState {
        self.state
    }

    /// Why the last restore attempt fell through to a join
    pub fn last_restore(&self) -> Option<RestoreFailure> {
        self.last_restore
    }

    /// Join attempts made by this manager
    pub fn join_attempts(&self) -> u32 {
        self.join_attempts
    }

    /// Provisioned identity
    pub fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }

    /// Node configuration
    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    /// Radio link
    pub fn link(&self) -> &L {
        &self.link
    }

    /// Mutable radio link
    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    /// Retention memory
    pub fn retention(&self) -> &RS {
        &self.retention
    }

    /// Durable store
    pub fn durable(&self) -> &DS {
        &self.durable
    }

    /// Mutable durable store
    pub fn durable_mut(&mut self) -> &mut DS {
        &mut self.durable
    }

    /// Whether the link consumed nonces that never reached the durable store
    ///
    /// While set, no session is handed out and the saved nonces are never
    /// loaded back over the newer ones held by the link.
    pub fn nonces_pending(&self) -> bool {
        self.nonces_pending
    }

    /// Whether a rejected session is expected on this boot
    ///
    /// True on the first boot after flashing or a cold reset, when no
    /// session compatible with the current firmware can exist yet.
    pub fn session_rejection_expected(&self) -> bool {
        self.boot_count() <= 1
    }

    /// Give back the owned collaborators
    pub fn release(self) -> (L, RS, DS, D) {
        (self.link, self.retention, self.durable, self.delay)
    }

    /// Wake cycles since the last cold boot
    pub fn boot_count(&self) -> u32 {
        self.retention.read_counter(RetainedSlot::BootCount).unwrap_or(0)
    }

    /// Failed joins since the last successful one, in this power cycle
    pub fn join_failures(&self) -> u32 {
        self.retention
            .read_counter(RetainedSlot::JoinFailures)
            .unwrap_or(0)
    }

    /// Count this wake cycle. Call once per boot or wake.
    pub fn record_boot(&mut self) -> Result<u32, StoreError> {
        let count = self
            .retention
            .read_counter(RetainedSlot::BootCount)?
            .wrapping_add(1);
        self.retention.write_counter(RetainedSlot::BootCount, count)?;
        log::info!("boot count: {}", count);
        Ok(count)
    }

    /// Restore the retained session or join the network
    ///
    /// Returns only once a session is live or on a fatal error; failed joins
    /// are retried forever under the configured backoff.
    pub fn activate(&mut self) -> ActivationOutcome<L::Error> {
        match self.try_activate() {
            Ok(outcome) => outcome,
            Err(e) => {
                log::error!("activation failed: {}", e);
                self.enter(ActivationState::Failed);
                ActivationOutcome::Failed(e)
            }
        }
    }

    fn try_activate(&mut self) -> Result<ActivationOutcome<L::Error>, ActivationError<L::Error>> {
        if self.nonces_pending {
            // Finish the interrupted attempt before anything else
            self.persist_nonces()?;
            if self.link.is_activated() {
                self.joined();
                return Ok(ActivationOutcome::NewSessionJoined);
            }
            return self.join_loop();
        }

        if self.link.is_activated() {
            log::debug!("session already live");
            self.enter(ActivationState::SessionRestored);
            return Ok(ActivationOutcome::SessionRestored);
        }

        self.enter(ActivationState::Unactivated);
        self.link.begin().map_err(ActivationError::RadioInitFailed)?;

        match self.restore_session() {
            Ok(()) => {
                self.last_restore = None;
                log::info!("session restored");
                self.enter(ActivationState::SessionRestored);
                return Ok(ActivationOutcome::SessionRestored);
            }
            Err(RestoreError::Storage(e)) => return Err(ActivationError::Storage(e)),
            Err(e) => self.report_restore(&e),
        }

        self.join_loop()
    }

    /// Load the saved nonces into the link
    pub fn restore_nonces(&mut self) -> Result<(), RestoreError<L::Error>> {
        if self.nonces_pending {
            return Err(RestoreError::NoncesUnsaved);
        }
        self.enter(ActivationState::RestoringNonces);

        let mut buf = [0u8; MAX_NONCES_LEN];
        let len = match self
            .durable
            .read(self.config.nonce_namespace, self.config.nonce_key, &mut buf)
        {
            Ok(Some(len)) => len,
            Ok(None) => return Err(RestoreError::NoPriorNonces),
            // Larger than any link produces
            Err(StoreError::BufferTooSmall) => {
                return Err(RestoreError::NoncesRejected(LinkError::NoncesDiscarded))
            }
            Err(e) => return Err(RestoreError::Storage(e)),
        };
        if len != L::NONCES_LEN {
            return Err(RestoreError::NoncesRejected(LinkError::NoncesDiscarded));
        }

        self.link
            .set_nonces(&buf[..len])
            .map_err(RestoreError::NoncesRejected)
    }

    /// Restore the nonces, then the retained session on top of them
    pub fn restore_session(&mut self) -> Result<(), RestoreError<L::Error>> {
        // A session is only as valid as the nonces that produced it
        self.restore_nonces()?;

        self.enter(ActivationState::RestoringSession);

        let mut buf = [0u8; MAX_SESSION_LEN];
        let len = match self.retention.read(RetainedSlot::Session, &mut buf) {
            Ok(Some(len)) => len,
            Ok(None) => return Err(RestoreError::NoPriorSession),
            Err(e) => {
                log::warn!("retention memory unreadable: {}", e);
                return Err(RestoreError::NoPriorSession);
            }
        };
        if len != L::SESSION_LEN {
            return Err(RestoreError::SessionRejected(LinkError::SessionDiscarded));
        }

        self.link
            .set_session(&buf[..len])
            .map_err(RestoreError::SessionRejected)
    }

    /// Write the link's current session to retention memory
    pub fn save_session(&mut self) -> Result<(), StoreError> {
        self.retention
            .write(RetainedSlot::Session, self.link.session())
    }

    /// Borrow an uplink session, if activated
    pub fn uplink(&mut self) -> Option<UplinkSession<'_, L, RS>> {
        if self.nonces_pending || !self.link.is_activated() {
            return None;
        }
        Some(UplinkSession::new(&mut self.link, &mut self.retention))
    }

    fn report_restore(&mut self, e: &RestoreError<L::Error>) {
        match e {
            RestoreError::NoPriorNonces => log::info!("no saved nonces, first join"),
            RestoreError::NoncesRejected(_) => log::warn!("{}, joining with fresh nonces", e),
            RestoreError::NoPriorSession => log::info!("no retained session, joining"),
            RestoreError::SessionRejected(_) => {
                if self.session_rejection_expected() {
                    log::info!("{}", e);
                } else {
                    log::error!("{}", e);
                }
            }
            RestoreError::Storage(_) | RestoreError::NoncesUnsaved => {}
        }
        self.last_restore = e.failure();
    }

    fn join_loop(&mut self) -> Result<ActivationOutcome<L::Error>, ActivationError<L::Error>> {
        loop {
            self.enter(ActivationState::Joining);
            self.join_attempts = self.join_attempts.wrapping_add(1);

            let attempt = self.link.join_otaa(&self.identity);

            // The attempt consumed a nonce whatever its outcome
            self.persist_nonces()?;

            match attempt {
                Ok(JoinOutcome::NewSession) => {
                    self.joined();
                    return Ok(ActivationOutcome::NewSessionJoined);
                }
                Ok(JoinOutcome::NoJoinAccept) => {
                    log::warn!("join attempt {}: no join-accept", self.join_attempts);
                }
                Err(e) if e.is_fatal() => return Err(ActivationError::Join(e)),
                Err(e) => {
                    log::warn!("join attempt {}: {}", self.join_attempts, e);
                }
            }

            self.enter(ActivationState::Failed);
            self.back_off();
        }
    }

    fn joined(&mut self) {
        if let Err(e) = self.retention.write_counter(RetainedSlot::JoinFailures, 0) {
            log::warn!("could not reset join failures: {}", e);
        }
        if let Err(e) = self.save_session() {
            log::warn!("could not retain new session: {}", e);
        }
        log::info!("joined after {} attempt(s)", self.join_attempts);
        self.enter(ActivationState::Joined);
    }

    fn persist_nonces(&mut self) -> Result<(), ActivationError<L::Error>> {
        let written = self.durable.write(
            self.config.nonce_namespace,
            self.config.nonce_key,
            self.link.nonces(),
        );
        self.nonces_pending = written.is_err();
        written.map_err(|e| {
            log::error!("nonces not persisted: {}", e);
            ActivationError::Storage(e)
        })
    }

    fn back_off(&mut self) {
        let failures = self.join_failures();
        let wait = self.config.backoff.delay_for(failures);

        if let Err(e) = self
            .retention
            .write_counter(RetainedSlot::JoinFailures, failures.saturating_add(1))
        {
            log::warn!("could not record join failure: {}", e);
        }

        self.enter(ActivationState::BackoffWait);
        log::info!("retrying join in {} s", wait.as_secs());
        let ms = u32::try_from(wait.as_millis()).unwrap_or(u32::MAX);
        self.delay.delay_ms(ms);
    }

    fn enter(&mut self, state: ActivationState) {
        if self.state != state {
            log::debug!("activation: {:?} -> {:?}", self.state, state);
            self.state = state;
        }
    }
}
