//! One wake cycle of a deep-sleeping node
//!
//! Boot or wake, count it, activate, send a single uplink, keep the advanced
//! session in retention memory, then tell the caller how long to sleep.
//! Entering deep sleep is board specific and stays with the caller.

use core::time::Duration;

use embedded_hal::blocking::delay::DelayMs;

use crate::activation::{ActivationError, ActivationManager, ActivationOutcome};
use crate::radio::{DownlinkPresence, RadioLink};
use crate::store::{DurableStore, RetentionStore};

/// Summary of a completed wake cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WakeReport {
    /// Wake cycles since the last cold boot, this one included
    pub boot_count: u32,
    /// Whether this cycle paid for a fresh join
    pub new_session: bool,
    /// Downlink received after the uplink
    pub downlink: DownlinkPresence,
    /// Whether the advanced session made it into retention memory
    pub session_saved: bool,
    /// How long to deep sleep before the next cycle
    pub sleep_for: Duration,
}

/// Run one wake cycle
///
/// Only a fatal activation error is returned. A failed exchange is logged
/// and reported as no downlink; the session is saved regardless since its
/// counters may have moved.
pub fn run_wake_cycle<L, RS, DS, D, F>(
    manager: &mut ActivationManager<L, RS, DS, D>,
    payload: &[u8],
    handler: F,
) -> Result<WakeReport, ActivationError<L::Error>>
where
    L: RadioLink,
    RS: RetentionStore,
    DS: DurableStore,
    D: DelayMs<u32>,
    F: FnMut(&[u8]),
{
    let boot_count = match manager.record_boot() {
        Ok(count) => count,
        Err(e) => {
            log::warn!("boot not counted: {}", e);
            manager.boot_count()
        }
    };

    let new_session = match manager.activate() {
        ActivationOutcome::SessionRestored => false,
        ActivationOutcome::NewSessionJoined => true,
        ActivationOutcome::Failed(e) => return Err(e),
    };

    let sleep_for = manager.config().sleep_interval;

    let (downlink, session_saved) = match manager.uplink() {
        Some(mut session) => {
            let downlink = match session.send_receive(payload, handler) {
                Ok(presence) => presence,
                Err(e) => {
                    log::error!("uplink failed: {}", e);
                    DownlinkPresence::None
                }
            };
            let saved = match session.save_session() {
                Ok(()) => true,
                Err(e) => {
                    log::error!("session not saved, next wake will rejoin: {}", e);
                    false
                }
            };
            (downlink, saved)
        }
        // activate() reported success, so the link holds a session
        None => (DownlinkPresence::None, false),
    };

    log::info!("going to sleep for {} s", sleep_for.as_secs());

    Ok(WakeReport {
        boot_count,
        new_session,
        downlink,
        session_saved,
        sleep_for,
    })
}
