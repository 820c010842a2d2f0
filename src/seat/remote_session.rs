//! Seat servicing a negotiated remote session
//!
//! The remote terminal already runs an X server; the session tells us where
//! it is and which cookie it expects. Each add_display call derives a fresh
//! handle from that session and wraps it in a Display.

use std::sync::Arc;

use log::debug;

use super::{Seat, SeatCore};
use crate::display::Display;
use crate::error::{Result, SeatError};
use crate::server::RemoteDisplayServer;
use crate::session::RemoteSession;

/// Seat bound to one remote session
pub struct RemoteSessionSeat {
    core: SeatCore,
    /// Session being serviced (held for the seat's whole lifetime)
    session: Arc<RemoteSession>,
}

impl RemoteSessionSeat {
    /// Create a seat for `session`, taking a new shared reference to it
    pub fn new(session: &Arc<RemoteSession>) -> Result<Self> {
        session
            .validate()
            .map_err(SeatError::InvalidConstructionArgument)?;

        let name = format!("remote-{}", session.id());
        debug!(
            "Seat {}: servicing {}:{}",
            name,
            session.authority().address(),
            session.display_number()
        );

        Ok(Self {
            core: SeatCore::new(name),
            session: Arc::clone(session),
        })
    }

    pub fn session(&self) -> &Arc<RemoteSession> {
        &self.session
    }

    fn build_display(&self) -> Result<Display> {
        let authority = self.session.authority();
        let server = RemoteDisplayServer::new(
            authority.address(),
            self.session.display_number(),
            authority,
        )?;
        Ok(Display::new(Box::new(server)))
    }
}

impl Seat for RemoteSessionSeat {
    fn core(&self) -> &SeatCore {
        &self.core
    }

    fn add_display(&mut self) -> Result<Display> {
        self.core.ensure_running()?;
        self.core.record(self.build_display())
    }
}

impl Drop for RemoteSessionSeat {
    fn drop(&mut self) {
        debug!(
            "Seat {}: releasing session {}",
            self.core.name(),
            self.session.id()
        );
    }
}
