//! Negotiated remote sessions
//!
//! A [`RemoteSession`] is the outcome of display-protocol negotiation with a
//! remote terminal: the authority to present and the display number the peer
//! agreed on. Negotiation itself happens elsewhere; this type only carries
//! the result, and is shared via `Arc` between the negotiator and the seat
//! that services it.

use std::sync::Arc;

use crate::authority::Authority;

/// Session agreed with a remote display-protocol peer
#[derive(Debug)]
pub struct RemoteSession {
    /// Session ID assigned during negotiation
    id: u32,
    /// Authority the remote X server expects
    authority: Arc<Authority>,
    /// Display number on the remote host
    display_number: u16,
}

impl RemoteSession {
    pub fn new(id: u32, authority: Arc<Authority>, display_number: u16) -> Self {
        Self {
            id,
            authority,
            display_number,
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn authority(&self) -> &Arc<Authority> {
        &self.authority
    }

    pub fn display_number(&self) -> u16 {
        self.display_number
    }

    /// Check that this session can back a seat
    ///
    /// Returns a description of the first problem found.
    pub fn validate(&self) -> std::result::Result<(), String> {
        let address = self.authority.address();
        if address.trim().is_empty() {
            return Err(format!("session {} has an empty authority address", self.id));
        }
        if address.trim() != address {
            return Err(format!(
                "session {} authority address {:?} has surrounding whitespace",
                self.id, address
            ));
        }
        if self.authority.data().is_empty() {
            return Err(format!("session {} has an empty credential", self.id));
        }
        if self.authority.display_number() != self.display_number {
            return Err(format!(
                "session {} display number {} does not match authority display number {}",
                self.id,
                self.display_number,
                self.authority.display_number()
            ));
        }
        Ok(())
    }
}
