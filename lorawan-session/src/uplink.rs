//! Uplink/downlink exchange on an activated session
//!
//! Every exchange advances the session's frame counters inside the link.
//! Persisting the session is left to the caller so several exchanges can
//! share one save.

use core::fmt;

use crate::radio::{DownlinkPresence, LinkError, RadioLink, MAX_DOWNLINK_LEN};
use crate::store::{RetainedSlot, RetentionStore, StoreError};

/// Uplink error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UplinkError<E> {
    /// No live session
    NotActivated,
    /// Link error during the exchange
    Link(LinkError<E>),
}

impl<E> From<LinkError<E>> for UplinkError<E> {
    fn from(error: LinkError<E>) -> Self {
        UplinkError::Link(error)
    }
}

impl<E: fmt::Debug> fmt::Display for UplinkError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UplinkError::NotActivated => f.write_str("session not activated"),
            UplinkError::Link(e) => write!(f, "{}", e),
        }
    }
}

/// One activated session, borrowed for uplink traffic
pub struct UplinkSession<'a, L: RadioLink, RS: RetentionStore> {
    link: &'a mut L,
    retention: &'a mut RS,
    unsaved: u32,
}

impl<'a, L: RadioLink, RS: RetentionStore> UplinkSession<'a, L, RS> {
    /// Wrap a link and the retention memory its session is saved to
    pub fn new(link: &'a mut L, retention: &'a mut RS) -> Self {
        Self {
            link,
            retention,
            unsaved: 0,
        }
    }

    /// Send one uplink and hand any downlink to `handler` before returning
    pub fn send_receive<F>(
        &mut self,
        payload: &[u8],
        mut handler: F,
    ) -> Result<DownlinkPresence, UplinkError<L::Error>>
    where
        F: FnMut(&[u8]),
    {
        if !self.link.is_activated() {
            return Err(UplinkError::NotActivated);
        }

        let mut buf = [0u8; MAX_DOWNLINK_LEN];
        // Counters may move even when the exchange fails
        self.unsaved = self.unsaved.saturating_add(1);
        let downlink = self.link.send_receive(payload, &mut buf)?;

        if downlink.presence.is_present() {
            let len = downlink.len.min(buf.len());
            log::info!("downlink in {:?}, {} bytes", downlink.presence, len);
            handler(&buf[..len]);
        } else {
            log::debug!("no downlink");
        }

        Ok(downlink.presence)
    }

    /// Exchanges since the session was last saved
    pub fn unsaved_exchanges(&self) -> u32 {
        self.unsaved
    }

    /// Write the session, with its advanced counters, to retention memory
    pub fn save_session(&mut self) -> Result<(), StoreError> {
        self.retention
            .write(RetainedSlot::Session, self.link.session())?;
        self.unsaved = 0;
        Ok(())
    }
}
