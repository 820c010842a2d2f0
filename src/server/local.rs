//! Local X server handle
//!
//! Describes an X server the display manager would spawn on this machine.
//! The handle holds the display number lease, so the number stays reserved
//! for as long as the handle (and the Display wrapping it) lives.

use std::path::Path;
use std::sync::Arc;

use log::trace;

use super::{DisplayServer, ServerKind};
use crate::allocator::DisplayNumberLease;
use crate::authority::Authority;
use crate::error::{Result, SeatError};

/// X server spawned on this machine
#[derive(Debug)]
pub struct LocalDisplayServer {
    /// X server binary
    command: String,
    /// Extra arguments appended after the generated ones
    args: Vec<String>,
    /// Reserved display number
    lease: DisplayNumberLease,
    /// Virtual terminal to run on
    vt: Option<u32>,
    authority: Arc<Authority>,
}

impl LocalDisplayServer {
    pub fn new(
        command: &str,
        args: Vec<String>,
        lease: DisplayNumberLease,
        vt: Option<u32>,
        authority: Arc<Authority>,
    ) -> Result<Self> {
        let command = command.trim();
        if command.is_empty() {
            // `lease` drops here and the number goes back to the pool
            return Err(SeatError::provisioning(format!(
                "Empty X server command for :{}",
                lease.number()
            )));
        }

        trace!("Local X server handle :{} ({})", lease.number(), command);

        Ok(Self {
            command: command.to_string(),
            args,
            lease,
            vt,
            authority,
        })
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn vt(&self) -> Option<u32> {
        self.vt
    }
}

impl DisplayServer for LocalDisplayServer {
    fn kind(&self) -> ServerKind {
        ServerKind::Local
    }

    fn address(&self) -> &str {
        self.authority.address()
    }

    fn display_number(&self) -> u16 {
        self.lease.number()
    }

    fn authority(&self) -> &Arc<Authority> {
        &self.authority
    }

    fn command_line(&self, auth_path: &Path) -> Option<Vec<String>> {
        let mut argv = vec![
            self.command.clone(),
            format!(":{}", self.lease.number()),
            "-auth".to_string(),
            auth_path.to_string_lossy().into_owned(),
            "-nolisten".to_string(),
            "tcp".to_string(),
        ];
        if let Some(vt) = self.vt {
            argv.push(format!("vt{}", vt));
        }
        argv.extend(self.args.iter().cloned());
        Some(argv)
    }
}
