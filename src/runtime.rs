//! Seat runtime
//!
//! Owns the seats built from configuration and the displays they produce.
//! Policy: every seat gets one display. A failed add_display is retried a
//! bounded number of times; the seat stays in place either way so a later
//! pass (e.g. after a config reload) can try again.
//!
//! The runtime learns outcomes from add_display's return value, so seat
//! events are drained and logged after each seat's attempts rather than
//! left queued for the seat's lifetime.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use log::{debug, info, warn};

use crate::allocator::DisplayNumberAllocator;
use crate::config::Config;
use crate::display::Display;
use crate::error::SeatError;
use crate::seat::{LocalSeat, RemoteSessionSeat, Seat};

/// A display together with the seat that produced it
#[derive(Debug)]
pub struct ProvisionedDisplay {
    pub seat: String,
    pub display: Display,
}

/// Outcome of one provisioning pass
#[derive(Debug, Default)]
pub struct ProvisionSummary {
    /// Seats that received a display in this pass
    pub provisioned: usize,
    /// Seats that still have no display, with their last error
    pub failed: Vec<(String, SeatError)>,
}

/// Owner of seats and their displays
pub struct Runtime {
    seats: Vec<Box<dyn Seat>>,
    displays: Vec<ProvisionedDisplay>,
    allocator: Arc<DisplayNumberAllocator>,
}

impl Runtime {
    pub fn new(allocator: Arc<DisplayNumberAllocator>) -> Self {
        Self {
            seats: Vec::new(),
            displays: Vec::new(),
            allocator,
        }
    }

    /// Build seats for every configured local seat and remote session
    ///
    /// Entries that cannot become a seat are logged and skipped.
    pub fn from_config(config: &Config) -> Self {
        let allocator = DisplayNumberAllocator::new(config.seat.minimum_display_number);
        let mut runtime = Self::new(allocator);

        for local in &config.local_seats {
            let settings = local.settings(&config.seat);
            match LocalSeat::new(local.name.as_str(), settings, Arc::clone(&runtime.allocator)) {
                Ok(seat) => runtime.add_seat(Box::new(seat)),
                Err(e) => warn!("Skipping local seat {:?}: {}", local.name, e),
            }
        }

        for remote in &config.remote_sessions {
            let seat = remote
                .to_session()
                .and_then(|session| RemoteSessionSeat::new(&session).map_err(Into::into));
            match seat {
                Ok(seat) => runtime.add_seat(Box::new(seat)),
                Err(e) => warn!("Skipping remote session {}: {:#}", remote.id, e),
            }
        }

        info!("Runtime: {} seat(s) configured", runtime.seats.len());
        runtime
    }

    pub fn add_seat(&mut self, seat: Box<dyn Seat>) {
        debug!("Runtime: added seat {}", seat.name());
        self.seats.push(seat);
    }

    pub fn seats(&self) -> &[Box<dyn Seat>] {
        &self.seats
    }

    pub fn displays(&self) -> &[ProvisionedDisplay] {
        &self.displays
    }

    pub fn allocator(&self) -> &Arc<DisplayNumberAllocator> {
        &self.allocator
    }

    /// Give every seat without a display one display
    pub fn provision_all(&mut self, max_attempts: u32) -> ProvisionSummary {
        let max_attempts = max_attempts.max(1);
        let mut summary = ProvisionSummary::default();

        for seat in self.seats.iter_mut() {
            if seat.is_stopped() || seat.displays_provisioned() > 0 {
                continue;
            }

            let mut last_error = None;
            for attempt in 1..=max_attempts {
                match seat.add_display() {
                    Ok(display) => {
                        self.displays.push(ProvisionedDisplay {
                            seat: seat.name().to_string(),
                            display,
                        });
                        summary.provisioned += 1;
                        last_error = None;
                        break;
                    }
                    Err(e) => {
                        warn!(
                            "Seat {}: attempt {}/{} failed: {}",
                            seat.name(),
                            attempt,
                            max_attempts,
                            e
                        );
                        let stopped = matches!(e, SeatError::SeatStopped(_));
                        last_error = Some(e);
                        if stopped {
                            break;
                        }
                    }
                }
            }

            while let Some(event) = seat.try_recv_event() {
                debug!("Seat {}: {:?}", seat.name(), event);
            }

            if let Some(e) = last_error {
                summary.failed.push((seat.name().to_string(), e));
            }
        }

        info!(
            "Provisioning: {} added, {} failed, {} display(s) total",
            summary.provisioned,
            summary.failed.len(),
            self.displays.len()
        );
        summary
    }

    /// Write one Xauthority file per display into `dir`
    pub fn write_authorities(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;

        let mut written = Vec::with_capacity(self.displays.len());
        for entry in &self.displays {
            let path = dir.join(format!("{}-{}.auth", entry.seat, entry.display.id().get()));
            entry
                .display
                .write_authority(&path)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            written.push(path);
        }
        Ok(written)
    }

    /// Stop every seat and release displays before seats
    pub fn shutdown(&mut self) {
        for seat in self.seats.iter_mut() {
            seat.stop();
        }
        self.displays.clear();
        self.seats.clear();
        info!("Runtime shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authority::Authority;
    use crate::seat::SeatCore;
    use crate::server::RemoteDisplayServer;

    /// Seat that fails a fixed number of times before succeeding
    struct FlakySeat {
        core: SeatCore,
        failures_left: u32,
    }

    impl FlakySeat {
        fn new(failures: u32) -> Self {
            Self {
                core: SeatCore::new("flaky"),
                failures_left: failures,
            }
        }
    }

    impl Seat for FlakySeat {
        fn core(&self) -> &SeatCore {
            &self.core
        }

        fn add_display(&mut self) -> crate::error::Result<Display> {
            let result = if self.failures_left > 0 {
                self.failures_left -= 1;
                Err(SeatError::DisplayProvisioningFailed("flaky".to_string()))
            } else {
                let auth = Arc::new(Authority::mit_cookie("10.0.0.9", 1, vec![1; 16]));
                RemoteDisplayServer::new("10.0.0.9", 1, &auth)
                    .map(|server| Display::new(Box::new(server)))
            };
            self.core.record(result)
        }
    }

    fn runtime() -> Runtime {
        Runtime::new(DisplayNumberAllocator::new(0))
    }

    #[test]
    fn test_retry_until_success() {
        let mut rt = runtime();
        rt.add_seat(Box::new(FlakySeat::new(2)));
        let summary = rt.provision_all(3);
        assert_eq!(summary.provisioned, 1);
        assert!(summary.failed.is_empty());
        assert_eq!(rt.displays().len(), 1);
        assert_eq!(rt.displays()[0].seat, "flaky");
    }

    #[test]
    fn test_retry_gives_up() {
        let mut rt = runtime();
        rt.add_seat(Box::new(FlakySeat::new(3)));
        let summary = rt.provision_all(2);
        assert_eq!(summary.provisioned, 0);
        assert_eq!(summary.failed.len(), 1);
        assert!(rt.displays().is_empty());

        // The seat is still there and a later pass can succeed
        let summary = rt.provision_all(3);
        assert_eq!(summary.provisioned, 1);
    }

    #[test]
    fn test_events_drained_after_provisioning() {
        let mut rt = runtime();
        rt.add_seat(Box::new(FlakySeat::new(2)));
        rt.provision_all(3);
        assert_eq!(rt.seats()[0].try_recv_event(), None);

        // Later passes over a provisioned seat leave nothing behind either
        rt.provision_all(3);
        assert_eq!(rt.seats()[0].try_recv_event(), None);
    }

    #[test]
    fn test_provisioned_seats_are_skipped() {
        let mut rt = runtime();
        rt.add_seat(Box::new(FlakySeat::new(0)));
        assert_eq!(rt.provision_all(1).provisioned, 1);
        assert_eq!(rt.provision_all(1).provisioned, 0);
        assert_eq!(rt.displays().len(), 1);
    }

    #[test]
    fn test_from_config_skips_invalid_entries() {
        let config = Config::parse(
            r#"
            [[local_seat]]
            name = "seat0"

            [[local_seat]]
            name = "broken"
            xserver_command = ""

            [[remote_session]]
            id = 1
            address = "10.0.0.5"
            display_number = 7
            cookie = "00112233"

            [[remote_session]]
            id = 2
            address = "10.0.0.6"
            display_number = 3
            cookie = ""
            "#,
        )
        .unwrap();

        let mut rt = Runtime::from_config(&config);
        let names: Vec<&str> = rt.seats().iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["seat0", "remote-1"]);

        let summary = rt.provision_all(1);
        assert_eq!(summary.provisioned, 2);
        let remote = rt
            .displays()
            .iter()
            .find(|d| d.seat == "remote-1")
            .unwrap();
        assert_eq!(remote.display.connection_name(), "10.0.0.5:7");
    }

    #[test]
    fn test_write_authorities() {
        let dir = tempfile::tempdir().unwrap();
        let mut rt = runtime();
        rt.add_seat(Box::new(FlakySeat::new(0)));
        rt.provision_all(1);

        let written = rt.write_authorities(&dir.path().join("auth")).unwrap();
        assert_eq!(written.len(), 1);
        assert!(written[0].exists());
    }

    #[test]
    fn test_shutdown_releases_local_numbers() {
        let config = Config::builtin();
        let mut rt = Runtime::from_config(&config);
        rt.provision_all(1);
        assert_eq!(rt.allocator().in_use().len(), 1);

        let allocator = Arc::clone(rt.allocator());
        rt.shutdown();
        assert!(allocator.in_use().is_empty());
        assert!(rt.seats().is_empty());
    }
}
