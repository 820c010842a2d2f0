//! Displays
//!
//! A [`Display`] is a usable graphical display bound to one server handle.
//! It takes full ownership of the handle; starting and monitoring the
//! server is the runtime's job.

use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Local};
use log::{debug, info};

use crate::authority::Authority;
use crate::error::Result;
use crate::server::{DisplayServer, ServerKind};

/// Process-wide display ID counter
static NEXT_DISPLAY_ID: AtomicU64 = AtomicU64::new(1);

/// Unique display identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DisplayId(u64);

impl DisplayId {
    fn next() -> Self {
        Self(NEXT_DISPLAY_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for DisplayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "display-{}", self.0)
    }
}

/// Graphical display bound to a server handle
#[derive(Debug)]
pub struct Display {
    id: DisplayId,
    created: DateTime<Local>,
    server: Box<dyn DisplayServer>,
}

impl Display {
    /// Wrap a server handle, taking ownership of it
    pub fn new(server: Box<dyn DisplayServer>) -> Self {
        let id = DisplayId::next();
        info!(
            "{}: {:?} X server {}",
            id,
            server.kind(),
            server.connection_name()
        );
        Self {
            id,
            created: Local::now(),
            server,
        }
    }

    pub fn id(&self) -> DisplayId {
        self.id
    }

    pub fn created(&self) -> DateTime<Local> {
        self.created
    }

    pub fn server(&self) -> &dyn DisplayServer {
        self.server.as_ref()
    }

    pub fn kind(&self) -> ServerKind {
        self.server.kind()
    }

    pub fn address(&self) -> &str {
        self.server.address()
    }

    pub fn display_number(&self) -> u16 {
        self.server.display_number()
    }

    pub fn authority(&self) -> &Arc<Authority> {
        self.server.authority()
    }

    /// Value for the DISPLAY environment variable
    pub fn connection_name(&self) -> String {
        self.server.connection_name()
    }

    /// Command line for starting a local server with `auth_path`
    pub fn command_line(&self, auth_path: &Path) -> Option<Vec<String>> {
        self.server.command_line(auth_path)
    }

    /// Write this display's authority to an Xauthority file
    pub fn write_authority(&self, path: &Path) -> Result<()> {
        self.server.authority().write_to_file(path)
    }
}

impl Drop for Display {
    fn drop(&mut self) {
        debug!("{}: released {}", self.id, self.server.connection_name());
    }
}
