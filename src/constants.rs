//! Global constants for dmseat
//!
//! Consolidates X11 protocol numbers, authority defaults, and
//! provisioning limits to eliminate magic numbers throughout the codebase.

// ============================================================================
// X11 Protocol
// ============================================================================

/// X servers listen on TCP port 6000 + display number
pub const X_TCP_PORT_BASE: u16 = 6000;

/// Largest display number whose TCP port still fits in a u16
pub const MAX_DISPLAY_NUMBER: u16 = u16::MAX - X_TCP_PORT_BASE;

// ============================================================================
// Xauthority
// ============================================================================

/// Authorization protocol name used for generated cookies
pub const MIT_MAGIC_COOKIE_NAME: &str = "MIT-MAGIC-COOKIE-1";

/// MIT-MAGIC-COOKIE-1 cookie length in bytes
pub const MIT_MAGIC_COOKIE_LEN: usize = 16;

/// Xauthority address family: IPv4
pub const FAMILY_INTERNET: u16 = 0;

/// Xauthority address family: IPv6
pub const FAMILY_INTERNET6: u16 = 6;

/// Xauthority address family: local host (address is the hostname)
pub const FAMILY_LOCAL: u16 = 256;

/// Xauthority address family: matches any address
pub const FAMILY_WILD: u16 = 65535;

/// Xauthority files must not be readable by other users
pub const XAUTHORITY_FILE_MODE: u32 = 0o600;

// ============================================================================
// Hostnames
// ============================================================================

/// Maximum length of a single DNS label
pub const MAX_HOSTNAME_LABEL_LEN: usize = 63;

/// Maximum length of a full hostname
pub const MAX_HOSTNAME_LEN: usize = 253;

/// Fallback hostname when gethostname() fails
pub const FALLBACK_HOSTNAME: &str = "localhost";

// ============================================================================
// Provisioning Defaults
// ============================================================================

/// Default name for the first local seat
pub const DEFAULT_SEAT_NAME: &str = "seat0";

/// Default X server binary for local seats
pub const DEFAULT_XSERVER_COMMAND: &str = "X";

/// Default number of add_display attempts per seat
pub const DEFAULT_PROVISION_ATTEMPTS: u32 = 3;

/// Poll interval of the --watch loop in milliseconds
pub const WATCH_POLL_INTERVAL_MS: u64 = 200;
