#![allow(dead_code)]

use std::collections::VecDeque;

use aes::Aes128;
use cmac::{Cmac, Mac};
use embedded_hal::blocking::delay::DelayMs;
use lorawan_session::{
    config::DeviceIdentity,
    radio::{Downlink, DownlinkPresence, JoinOutcome, LinkError, RadioLink},
    store::{DurableMemory, DurableStore, StoreError},
};

pub const NONCES_LEN: usize = 8;
pub const SESSION_LEN: usize = 16;
pub const MAX_PAYLOAD: usize = 51;

const NONCES_MAGIC: u8 = 0xA5;
const SESSION_MAGIC: u8 = 0x5E;

pub const IDENTITY: DeviceIdentity = DeviceIdentity::from_eui64(
    0x0000000000000000,
    0x70B3D57ED0072797,
    [
        0x50, 0x0E, 0xD5, 0x4E, 0xE3, 0x44, 0x1F, 0x18, 0x25, 0xAC, 0x20, 0xAE, 0xAF, 0xAE, 0xB0,
        0x70,
    ],
    [
        0x50, 0x0E, 0xD5, 0x4E, 0xE3, 0x44, 0x1F, 0x18, 0x25, 0xAC, 0x20, 0xAE, 0xAF, 0xAE, 0xB0,
        0x70,
    ],
);

/// Mock transceiver error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockError {
    /// Radio did not answer on the bus
    ChipNotFound,
    /// Receive window timed out
    Timeout,
}

/// Scripted outcome of one join attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinScript {
    Accept,
    NoAccept,
    RadioFault,
}

/// Mock LoRaWAN node
///
/// Nonce buffer: magic | DevNonce (BE) | 4 reserved | tag.
/// Session buffer: magic | DevNonce that produced it (BE) | DevAddr |
/// FCntUp (BE) | FCntDown (BE) | tag.
pub struct MockLink {
    nonces: [u8; NONCES_LEN],
    session: [u8; SESSION_LEN],
    activated: bool,
    pub join_script: VecDeque<JoinScript>,
    pub downlinks: VecDeque<(DownlinkPresence, Vec<u8>)>,
    pub begin_error: Option<MockError>,
    pub send_error: Option<MockError>,
    pub reject_sessions: bool,
    pub begins: u32,
    pub join_requests: u32,
    pub uplinks: Vec<Vec<u8>>,
}

impl MockLink {
    /// Fresh node, as after any boot: nothing loaded in RAM
    pub fn new() -> Self {
        Self {
            nonces: encode_nonces(0),
            session: [0; SESSION_LEN],
            activated: false,
            join_script: VecDeque::new(),
            downlinks: VecDeque::new(),
            begin_error: None,
            send_error: None,
            reject_sessions: false,
            begins: 0,
            join_requests: 0,
            uplinks: Vec::new(),
        }
    }

    pub fn with_joins(script: &[JoinScript]) -> Self {
        let mut link = Self::new();
        link.join_script.extend(script.iter().copied());
        link
    }

    pub fn push_downlink(&mut self, presence: DownlinkPresence, data: &[u8]) {
        self.downlinks.push_back((presence, data.to_vec()));
    }

    pub fn dev_nonce(&self) -> u16 {
        u16::from_be_bytes([self.nonces[1], self.nonces[2]])
    }

    pub fn fcnt_up(&self) -> u32 {
        session_fcnt_up(&self.session)
    }

    pub fn fcnt_down(&self) -> u32 {
        u32::from_be_bytes([
            self.session[11],
            self.session[12],
            self.session[13],
            self.session[14],
        ])
    }

    fn set_fcnts(&mut self, up: u32, down: u32) {
        self.session[7..11].copy_from_slice(&up.to_be_bytes());
        self.session[11..15].copy_from_slice(&down.to_be_bytes());
        self.session[SESSION_LEN - 1] = checksum(&self.session[..SESSION_LEN - 1]);
    }
}

/// One-byte integrity tag: first byte of AES-CMAC under the NwkKey
pub fn checksum(data: &[u8]) -> u8 {
    let mut mac = <Cmac<Aes128> as Mac>::new_from_slice(&IDENTITY.nwk_key).unwrap();
    mac.update(data);
    mac.finalize().into_bytes()[0]
}

pub fn encode_nonces(dev_nonce: u16) -> [u8; NONCES_LEN] {
    let mut buf = [0u8; NONCES_LEN];
    buf[0] = NONCES_MAGIC;
    buf[1..3].copy_from_slice(&dev_nonce.to_be_bytes());
    buf[NONCES_LEN - 1] = checksum(&buf[..NONCES_LEN - 1]);
    buf
}

pub fn decode_dev_nonce(nonces: &[u8]) -> u16 {
    u16::from_be_bytes([nonces[1], nonces[2]])
}

pub fn session_fcnt_up(session: &[u8]) -> u32 {
    u32::from_be_bytes([session[7], session[8], session[9], session[10]])
}

impl RadioLink for MockLink {
    type Error = MockError;

    const NONCES_LEN: usize = NONCES_LEN;
    const SESSION_LEN: usize = SESSION_LEN;

    fn begin(&mut self) -> Result<(), LinkError<Self::Error>> {
        self.begins += 1;
        match self.begin_error.clone() {
            Some(e) => Err(LinkError::Radio(e)),
            None => Ok(()),
        }
    }

    fn is_activated(&self) -> bool {
        self.activated
    }

    fn set_nonces(&mut self, nonces: &[u8]) -> Result<(), LinkError<Self::Error>> {
        if nonces.len() != NONCES_LEN
            || nonces[0] != NONCES_MAGIC
            || nonces[NONCES_LEN - 1] != checksum(&nonces[..NONCES_LEN - 1])
        {
            return Err(LinkError::NoncesDiscarded);
        }
        self.nonces.copy_from_slice(nonces);
        self.activated = false;
        Ok(())
    }

    fn nonces(&self) -> &[u8] {
        &self.nonces
    }

    fn set_session(&mut self, session: &[u8]) -> Result<(), LinkError<Self::Error>> {
        if session.len() != SESSION_LEN
            || session[0] != SESSION_MAGIC
            || session[SESSION_LEN - 1] != checksum(&session[..SESSION_LEN - 1])
        {
            return Err(LinkError::SessionDiscarded);
        }
        // Produced by other nonces
        if session[1..3] != self.nonces[1..3] {
            return Err(LinkError::SessionDiscarded);
        }
        if self.reject_sessions {
            return Err(LinkError::SessionDiscarded);
        }
        self.session.copy_from_slice(session);
        self.activated = true;
        Ok(())
    }

    fn session(&self) -> &[u8] {
        &self.session
    }

    fn join_otaa(&mut self, _identity: &DeviceIdentity) -> Result<JoinOutcome, LinkError<Self::Error>> {
        let dev_nonce = self.dev_nonce();
        if dev_nonce == u16::MAX {
            return Err(LinkError::NoncesExhausted);
        }

        self.join_requests += 1;
        let dev_nonce = dev_nonce + 1;
        self.nonces = encode_nonces(dev_nonce);
        self.activated = false;

        match self.join_script.pop_front().unwrap_or(JoinScript::Accept) {
            JoinScript::Accept => {
                self.session = [0; SESSION_LEN];
                self.session[0] = SESSION_MAGIC;
                self.session[1..3].copy_from_slice(&dev_nonce.to_be_bytes());
                self.session[3..7].copy_from_slice(&[0x26, 0x0B, 0x00, dev_nonce as u8]);
                self.set_fcnts(0, 0);
                self.activated = true;
                Ok(JoinOutcome::NewSession)
            }
            JoinScript::NoAccept => Ok(JoinOutcome::NoJoinAccept),
            JoinScript::RadioFault => Err(LinkError::Radio(MockError::Timeout)),
        }
    }

    fn send_receive(
        &mut self,
        payload: &[u8],
        downlink: &mut [u8],
    ) -> Result<Downlink, LinkError<Self::Error>> {
        if !self.activated {
            return Err(LinkError::NotJoined);
        }
        if payload.len() > MAX_PAYLOAD {
            return Err(LinkError::PayloadTooLong);
        }

        let (up, down) = (self.fcnt_up() + 1, self.fcnt_down());
        self.set_fcnts(up, down);
        self.uplinks.push(payload.to_vec());

        if let Some(e) = self.send_error.clone() {
            return Err(LinkError::Radio(e));
        }

        match self.downlinks.pop_front() {
            Some((presence, data)) => {
                let len = data.len().min(downlink.len());
                downlink[..len].copy_from_slice(&data[..len]);
                self.set_fcnts(up, down + 1);
                Ok(Downlink { presence, len })
            }
            None => Ok(Downlink::NONE),
        }
    }
}

/// Delay recording every requested wait instead of sleeping
#[derive(Debug, Default)]
pub struct MockDelay {
    pub waits_ms: Vec<u32>,
}

impl MockDelay {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DelayMs<u32> for MockDelay {
    fn delay_ms(&mut self, ms: u32) {
        self.waits_ms.push(ms);
    }
}

/// Durable store recording every write and able to fail on demand
#[derive(Debug, Default)]
pub struct RecordingDurable {
    pub inner: DurableMemory,
    pub writes: Vec<Vec<u8>>,
    pub fail_writes: Option<StoreError>,
    pub fail_reads: Option<StoreError>,
}

impl RecordingDurable {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DurableStore for RecordingDurable {
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<Option<usize>, StoreError> {
        if let Some(e) = self.fail_reads {
            return Err(e);
        }
        self.inner.read(namespace, key, buf)
    }

    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StoreError> {
        if let Some(e) = self.fail_writes {
            return Err(e);
        }
        self.inner.write(namespace, key, data)?;
        self.writes.push(data.to_vec());
        Ok(())
    }

    fn remove(&mut self, namespace: &str, key: &str) -> Result<(), StoreError> {
        self.inner.remove(namespace, key)
    }
}
