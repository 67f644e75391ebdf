/// Operation-complete interrupt flag
pub mod irq;

/// Radio link trait and its result types
pub mod traits;

pub use irq::OperationDone;
pub use traits::{
    Downlink, DownlinkPresence, JoinOutcome, LinkError, RadioLink, MAX_DOWNLINK_LEN,
    MAX_NONCES_LEN, MAX_SESSION_LEN,
};
