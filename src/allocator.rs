//! Local display number allocation
//!
//! Local X servers need a display number nobody else uses. Numbers are handed
//! out as [`DisplayNumberLease`] guards and return to the pool when the lease
//! is dropped, so a display that fails half way through construction never
//! leaks its number.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard};

use log::{debug, trace};

use crate::constants::MAX_DISPLAY_NUMBER;
use crate::error::{Result, SeatError};

/// Pool of display numbers shared by local seats
#[derive(Debug)]
pub struct DisplayNumberAllocator {
    /// Lowest number handed out
    minimum: u16,
    /// Numbers currently leased
    in_use: Mutex<BTreeSet<u16>>,
}

impl DisplayNumberAllocator {
    pub fn new(minimum: u16) -> Arc<Self> {
        Arc::new(Self {
            minimum,
            in_use: Mutex::new(BTreeSet::new()),
        })
    }

    pub fn minimum(&self) -> u16 {
        self.minimum
    }

    /// Lease the smallest free display number
    pub fn allocate(self: &Arc<Self>) -> Result<DisplayNumberLease> {
        let mut in_use = self.lock();

        let mut candidate = self.minimum;
        // BTreeSet iterates in order, so the first gap is the smallest free number
        for &used in in_use.range(self.minimum..) {
            if used != candidate {
                break;
            }
            if candidate == MAX_DISPLAY_NUMBER {
                return Err(SeatError::provisioning("No free display numbers"));
            }
            candidate += 1;
        }
        if candidate > MAX_DISPLAY_NUMBER {
            return Err(SeatError::provisioning("No free display numbers"));
        }

        in_use.insert(candidate);
        debug!("Allocated display number :{}", candidate);

        Ok(DisplayNumberLease {
            number: candidate,
            allocator: Arc::clone(self),
        })
    }

    /// Numbers currently leased, in ascending order
    pub fn in_use(&self) -> Vec<u16> {
        self.lock().iter().copied().collect()
    }

    fn release(&self, number: u16) {
        self.lock().remove(&number);
        trace!("Released display number :{}", number);
    }

    fn lock(&self) -> MutexGuard<'_, BTreeSet<u16>> {
        // The set stays consistent even if a holder panicked
        self.in_use.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// A leased display number, released on drop
#[derive(Debug)]
pub struct DisplayNumberLease {
    number: u16,
    allocator: Arc<DisplayNumberAllocator>,
}

impl DisplayNumberLease {
    pub fn number(&self) -> u16 {
        self.number
    }
}

impl Drop for DisplayNumberLease {
    fn drop(&mut self) {
        self.allocator.release(self.number);
    }
}
