//! Remote X server handle
//!
//! Describes an X server on another host that asked to be managed. Building
//! the handle only validates the address triple; no connection is opened.

use std::net::IpAddr;
use std::sync::Arc;

use log::trace;

use super::{DisplayServer, ServerKind};
use crate::authority::Authority;
use crate::constants::{MAX_DISPLAY_NUMBER, MAX_HOSTNAME_LABEL_LEN, MAX_HOSTNAME_LEN};
use crate::error::{Result, SeatError};

/// X server reachable over the network
#[derive(Debug)]
pub struct RemoteDisplayServer {
    address: String,
    display_number: u16,
    authority: Arc<Authority>,
}

impl RemoteDisplayServer {
    /// Describe the server at `address:display_number`
    ///
    /// Fails if the address is neither an IP literal nor a valid hostname,
    /// the display number has no TCP port, or the credential is empty.
    pub fn new(address: &str, display_number: u16, authority: &Arc<Authority>) -> Result<Self> {
        validate_address(address)?;

        if display_number > MAX_DISPLAY_NUMBER {
            return Err(SeatError::provisioning(format!(
                "Display number {} out of range (max {})",
                display_number, MAX_DISPLAY_NUMBER
            )));
        }
        if authority.data().is_empty() {
            return Err(SeatError::provisioning(format!(
                "Empty credential for {}:{}",
                address, display_number
            )));
        }

        trace!("Remote X server handle {}:{}", address, display_number);

        Ok(Self {
            address: address.to_string(),
            display_number,
            authority: Arc::clone(authority),
        })
    }
}

impl DisplayServer for RemoteDisplayServer {
    fn kind(&self) -> ServerKind {
        ServerKind::Remote
    }

    fn address(&self) -> &str {
        &self.address
    }

    fn display_number(&self) -> u16 {
        self.display_number
    }

    fn authority(&self) -> &Arc<Authority> {
        &self.authority
    }
}

/// Accept IP literals and RFC 1123 hostnames
fn validate_address(address: &str) -> Result<()> {
    if address.is_empty() {
        return Err(SeatError::provisioning("Empty server address"));
    }
    // The handle must report exactly the address the authority names
    if address.trim() != address {
        return Err(SeatError::provisioning(format!(
            "Server address has surrounding whitespace: {:?}",
            address
        )));
    }
    if address.parse::<IpAddr>().is_ok() {
        return Ok(());
    }
    if address.len() > MAX_HOSTNAME_LEN {
        return Err(SeatError::provisioning(format!(
            "Server address too long: {} bytes",
            address.len()
        )));
    }

    let hostname = address.strip_suffix('.').unwrap_or(address);
    let valid = !hostname.is_empty()
        && hostname.split('.').all(|label| {
            !label.is_empty()
                && label.len() <= MAX_HOSTNAME_LABEL_LEN
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-')
        });

    if valid {
        Ok(())
    } else {
        Err(SeatError::provisioning(format!(
            "Malformed server address: {:?}",
            address
        )))
    }
}
