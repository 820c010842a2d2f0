//! Display server handles
//!
//! A handle describes how to reach an X server before anything is started:
//! - Remote servers reached over the network (XDMCP sessions)
//! - Local servers the display manager would spawn itself
//!
//! A [`Display`](crate::display::Display) owns exactly one handle; everything
//! downstream of "I have a handle" is shared between the variants.

pub mod local;
pub mod remote;

use std::fmt::Debug;
use std::net::IpAddr;
use std::path::Path;
use std::sync::Arc;

use crate::authority::Authority;
use crate::constants::X_TCP_PORT_BASE;

pub use local::LocalDisplayServer;
pub use remote::RemoteDisplayServer;

/// Which way a display server is produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerKind {
    /// Spawned on this machine
    Local,
    /// Already running on a remote host
    Remote,
}

/// Un-started connection descriptor for an X server
pub trait DisplayServer: Send + Debug {
    fn kind(&self) -> ServerKind;

    /// Host the server runs on
    fn address(&self) -> &str;

    fn display_number(&self) -> u16;

    /// Credential clients must present
    fn authority(&self) -> &Arc<Authority>;

    /// Value for the DISPLAY environment variable
    fn connection_name(&self) -> String {
        match self.kind() {
            ServerKind::Local => format!(":{}", self.display_number()),
            ServerKind::Remote => match self.address().parse::<IpAddr>() {
                Ok(IpAddr::V6(ip)) => format!("[{}]:{}", ip, self.display_number()),
                _ => format!("{}:{}", self.address(), self.display_number()),
            },
        }
    }

    /// Command line that starts the server, if this side starts it
    fn command_line(&self, _auth_path: &Path) -> Option<Vec<String>> {
        None
    }

    /// TCP port the server listens on
    fn tcp_port(&self) -> u16 {
        X_TCP_PORT_BASE.saturating_add(self.display_number())
    }
}
