//! Radio operation-complete notification
//!
//! The transceiver raises an interrupt when a transmission or reception
//! finishes. The interrupt handler only sets the flag; the main loop only
//! observes and clears it.

use core::convert::Infallible;
use core::sync::atomic::{AtomicBool, Ordering};

/// Operation-complete flag shared between interrupt and main context
#[derive(Debug)]
pub struct OperationDone {
    flag: AtomicBool,
}

impl OperationDone {
    /// Create a cleared flag, usable in a `static`
    pub const fn new() -> Self {
        Self {
            flag: AtomicBool::new(false),
        }
    }

    /// Mark the operation finished. Interrupt context.
    pub fn signal(&self) {
        self.flag.store(true, Ordering::Release);
    }

    /// Whether the flag is set, without clearing it
    pub fn is_set(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// Consume the flag if set
    pub fn poll(&self) -> nb::Result<(), Infallible> {
        if self.flag.load(Ordering::Acquire) {
            self.flag.store(false, Ordering::Release);
            Ok(())
        } else {
            Err(nb::Error::WouldBlock)
        }
    }

    /// Block until the operation finishes, consuming the flag
    pub fn wait(&self) {
        // poll never fails with anything but WouldBlock
        let _ = nb::block!(self.poll());
    }
}

impl Default for OperationDone {
    fn default() -> Self {
        Self::new()
    }
}
