//! Seat backed by local X servers

use std::sync::Arc;

use log::{debug, warn};

use super::{Seat, SeatCore};
use crate::allocator::DisplayNumberAllocator;
use crate::authority::Authority;
use crate::constants::FALLBACK_HOSTNAME;
use crate::display::Display;
use crate::error::{Result, SeatError};
use crate::server::LocalDisplayServer;

/// How a local seat describes its X servers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalSeatSettings {
    /// X server binary
    pub xserver_command: String,
    /// Extra X server arguments
    pub xserver_args: Vec<String>,
    /// VT of the display holding the lowest display number; higher numbers
    /// map to consecutive VTs
    pub vt_start: Option<u32>,
}

/// Seat that spawns X servers on this machine
pub struct LocalSeat {
    core: SeatCore,
    settings: LocalSeatSettings,
    allocator: Arc<DisplayNumberAllocator>,
    /// Address recorded in generated authorities
    hostname: String,
}

impl LocalSeat {
    pub fn new(
        name: impl Into<String>,
        settings: LocalSeatSettings,
        allocator: Arc<DisplayNumberAllocator>,
    ) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(SeatError::invalid_argument("Local seat name is empty"));
        }
        if settings.xserver_command.trim().is_empty() {
            return Err(SeatError::invalid_argument(format!(
                "Seat {} has no X server command",
                name
            )));
        }

        Ok(Self {
            core: SeatCore::new(name),
            settings,
            allocator,
            hostname: local_hostname(),
        })
    }

    pub fn settings(&self) -> &LocalSeatSettings {
        &self.settings
    }

    fn build_display(&self) -> Result<Display> {
        let lease = self.allocator.allocate()?;
        let authority = Arc::new(Authority::generate(self.hostname.as_str(), lease.number()));
        // The VT follows the display number so both are reused together
        let vt = match self.settings.vt_start {
            Some(start) => {
                let offset = u32::from(lease.number() - self.allocator.minimum());
                let vt = start.checked_add(offset).ok_or_else(|| {
                    SeatError::provisioning(format!(
                        "No VT for display :{} (vt_start {} + {} overflows)",
                        lease.number(),
                        start,
                        offset
                    ))
                })?;
                Some(vt)
            }
            None => None,
        };

        let server = LocalDisplayServer::new(
            &self.settings.xserver_command,
            self.settings.xserver_args.clone(),
            lease,
            vt,
            authority,
        )?;
        debug!("Seat {}: X server command {}", self.core.name(), server.command());

        Ok(Display::new(Box::new(server)))
    }
}

impl Seat for LocalSeat {
    fn core(&self) -> &SeatCore {
        &self.core
    }

    fn add_display(&mut self) -> Result<Display> {
        self.core.ensure_running()?;
        self.core.record(self.build_display())
    }
}

/// Hostname recorded in local authorities
fn local_hostname() -> String {
    match nix::unistd::gethostname() {
        Ok(name) => name.to_string_lossy().into_owned(),
        Err(e) => {
            warn!("gethostname failed, using {}: {}", FALLBACK_HOSTNAME, e);
            FALLBACK_HOSTNAME.to_string()
        }
    }
}
