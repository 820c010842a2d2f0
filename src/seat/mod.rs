//! Seats
//!
//! A seat owns the policy for producing displays for a user session.
//! Variants differ only in how they obtain a server handle:
//! - [`LocalSeat`]: leases a display number and describes a local X server
//! - [`RemoteSessionSeat`]: attaches to the X server of a negotiated remote session
//!
//! Seats never own the displays they produce; the caller of
//! [`Seat::add_display`] does.

pub mod local;
pub mod remote_session;

use std::cell::Cell;
use std::sync::mpsc;

use log::{info, warn};

use crate::display::{Display, DisplayId};
use crate::error::{Result, SeatError};

pub use local::{LocalSeat, LocalSeatSettings};
pub use remote_session::RemoteSessionSeat;

/// Seat lifecycle event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeatEvent {
    /// add_display produced a display
    DisplayAdded { display_id: DisplayId },
    /// add_display failed
    ProvisioningFailed { reason: String },
    /// Seat was stopped
    Stopped,
}

/// State shared by every seat variant
pub struct SeatCore {
    /// Seat name (for logs and events)
    name: String,
    /// Event sender
    event_tx: mpsc::Sender<SeatEvent>,
    /// Event receiver
    event_rx: mpsc::Receiver<SeatEvent>,
    /// Displays handed out so far
    provisioned: Cell<u32>,
    /// Set once stop() is called
    stopped: Cell<bool>,
}

impl SeatCore {
    pub fn new(name: impl Into<String>) -> Self {
        let (event_tx, event_rx) = mpsc::channel();
        Self {
            name: name.into(),
            event_tx,
            event_rx,
            provisioned: Cell::new(0),
            stopped: Cell::new(false),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn provisioned(&self) -> u32 {
        self.provisioned.get()
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.get()
    }

    /// Fail if the seat no longer accepts add_display
    pub fn ensure_running(&self) -> Result<()> {
        if self.is_stopped() {
            return Err(SeatError::SeatStopped(self.name.clone()));
        }
        Ok(())
    }

    /// Record the outcome of one add_display call
    ///
    /// Passes the result through unchanged after emitting the matching event.
    pub fn record(&self, result: Result<Display>) -> Result<Display> {
        match &result {
            Ok(display) => {
                self.provisioned.set(self.provisioned.get() + 1);
                info!("Seat {}: added {}", self.name, display.id());
                let _ = self.event_tx.send(SeatEvent::DisplayAdded {
                    display_id: display.id(),
                });
            }
            Err(e) => {
                warn!("Seat {}: failed to add display: {}", self.name, e);
                let _ = self.event_tx.send(SeatEvent::ProvisioningFailed {
                    reason: e.to_string(),
                });
            }
        }
        result
    }

    pub fn stop(&self) {
        if !self.stopped.replace(true) {
            info!("Seat {}: stopped", self.name);
            let _ = self.event_tx.send(SeatEvent::Stopped);
        }
    }

    /// Try to receive a seat event (non-blocking)
    pub fn try_recv_event(&self) -> Option<SeatEvent> {
        self.event_rx.try_recv().ok()
    }
}

/// A seat that can produce displays
///
/// `add_display` is the single variant-specific operation. It is not
/// re-entrant on one seat; distinct seats may live on distinct threads.
pub trait Seat: Send {
    /// Shared seat state
    fn core(&self) -> &SeatCore;

    /// Produce a new display bound to this seat's display server
    ///
    /// The returned display is owned by the caller. On error no display
    /// exists, no handle is leaked, and the call may be retried.
    fn add_display(&mut self) -> Result<Display>;

    fn name(&self) -> &str {
        self.core().name()
    }

    fn displays_provisioned(&self) -> u32 {
        self.core().provisioned()
    }

    fn try_recv_event(&self) -> Option<SeatEvent> {
        self.core().try_recv_event()
    }

    /// Refuse further add_display calls
    fn stop(&mut self) {
        self.core().stop();
    }

    fn is_stopped(&self) -> bool {
        self.core().is_stopped()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_core_is_quiet() {
        let core = SeatCore::new("seat0");
        assert_eq!(core.name(), "seat0");
        assert_eq!(core.provisioned(), 0);
        assert!(core.try_recv_event().is_none());
    }

    #[test]
    fn test_record_failure() {
        let core = SeatCore::new("seat0");
        let result = core.record(Err(SeatError::provisioning("boom")));
        assert!(result.is_err());
        assert_eq!(core.provisioned(), 0);
        assert_eq!(
            core.try_recv_event(),
            Some(SeatEvent::ProvisioningFailed {
                reason: "Display provisioning failed: boom".to_string()
            })
        );
    }

    #[test]
    fn test_stop_is_idempotent() {
        let core = SeatCore::new("seat0");
        core.stop();
        core.stop();
        assert!(core.ensure_running().is_err());
        assert_eq!(core.try_recv_event(), Some(SeatEvent::Stopped));
        assert!(core.try_recv_event().is_none());
    }
}
