//! Configuration file management
//!
//! Loads TOML configuration files describing local seats and statically
//! configured remote sessions.
//! Default config path: ~/.config/dmseat/config.toml

use anyhow::{Context, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[cfg(target_os = "linux")]
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
#[cfg(target_os = "linux")]
use std::ffi::OsStr;
#[cfg(target_os = "linux")]
use std::sync::mpsc;

use crate::authority::Authority;
use crate::constants::{DEFAULT_SEAT_NAME, DEFAULT_XSERVER_COMMAND};
use crate::seat::LocalSeatSettings;
use crate::session::RemoteSession;

/// Application settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Defaults shared by all local seats
    pub seat: SeatDefaults,
    /// Local seats (one X server each)
    #[serde(rename = "local_seat")]
    pub local_seats: Vec<LocalSeatConfig>,
    /// Remote sessions negotiated out of band
    #[serde(rename = "remote_session")]
    pub remote_sessions: Vec<RemoteSessionConfig>,
}

/// Defaults shared by all local seats
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SeatDefaults {
    /// Lowest display number handed to local X servers
    pub minimum_display_number: u16,
    /// X server binary
    pub xserver_command: String,
    /// Extra X server arguments
    pub xserver_args: Vec<String>,
    /// First VT for local X servers (unset = let the X server choose)
    pub vt_start: Option<u32>,
}

impl Default for SeatDefaults {
    fn default() -> Self {
        Self {
            minimum_display_number: 0,
            xserver_command: DEFAULT_XSERVER_COMMAND.to_string(),
            xserver_args: Vec::new(),
            vt_start: Some(7),
        }
    }
}

/// One local seat; unset fields fall back to [`SeatDefaults`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalSeatConfig {
    /// Seat name
    pub name: String,
    /// X server binary override
    pub xserver_command: Option<String>,
    /// Extra X server arguments override
    pub xserver_args: Option<Vec<String>>,
    /// First VT override
    pub vt_start: Option<u32>,
}

impl LocalSeatConfig {
    /// Merge with the shared defaults
    pub fn settings(&self, defaults: &SeatDefaults) -> LocalSeatSettings {
        LocalSeatSettings {
            xserver_command: self
                .xserver_command
                .clone()
                .unwrap_or_else(|| defaults.xserver_command.clone()),
            xserver_args: self
                .xserver_args
                .clone()
                .unwrap_or_else(|| defaults.xserver_args.clone()),
            vt_start: self.vt_start.or(defaults.vt_start),
        }
    }
}

/// A remote session whose negotiation result is known ahead of time
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteSessionConfig {
    /// Session ID
    pub id: u32,
    /// Remote host address
    pub address: String,
    /// Display number on the remote host
    pub display_number: u16,
    /// MIT-MAGIC-COOKIE-1 as hex
    pub cookie: String,
}

impl RemoteSessionConfig {
    /// Build the shared session object
    ///
    /// The address is trimmed once here so the authority, its family and
    /// every handle derived from it agree on the same string.
    pub fn to_session(&self) -> Result<Arc<RemoteSession>> {
        let address = self.address.trim();
        let authority = Authority::from_hex(address, self.display_number, &self.cookie)
            .with_context(|| format!("Invalid cookie for remote session {}", self.id))?;
        Ok(Arc::new(RemoteSession::new(
            self.id,
            Arc::new(authority),
            self.display_number,
        )))
    }
}

impl Config {
    /// System-wide config path
    const SYSTEM_CONFIG_PATH: &'static str = "/etc/dmseat/config.toml";

    /// Built-in configuration: one local seat
    pub fn builtin() -> Self {
        Self {
            local_seats: vec![LocalSeatConfig {
                name: DEFAULT_SEAT_NAME.to_string(),
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    /// Get the path that would be used for loading config
    /// Returns None if using built-in defaults
    pub fn config_path() -> Option<PathBuf> {
        // 1. DMSEAT_CONFIG environment variable
        if let Ok(path) = std::env::var("DMSEAT_CONFIG") {
            let p = Path::new(&path);
            if p.exists() {
                return Some(p.to_path_buf());
            }
        }

        // 2. User config: ~/.config/dmseat/config.toml
        if let Some(config_path) = default_config_path() {
            if config_path.exists() {
                return Some(config_path);
            }
        }

        // 3. System config: /etc/dmseat/config.toml
        let system_config = Path::new(Self::SYSTEM_CONFIG_PATH);
        if system_config.exists() {
            return Some(system_config.to_path_buf());
        }

        None
    }

    /// Load configuration with priority:
    /// 1. DMSEAT_CONFIG environment variable
    /// 2. ~/.config/dmseat/config.toml (user config)
    /// 3. /etc/dmseat/config.toml (system config)
    /// 4. Built-in defaults
    pub fn load() -> Self {
        if let Some(path) = Self::config_path() {
            match Self::load_from_file(&path) {
                Ok(config) => {
                    info!("Loaded config: {}", path.display());
                    return config;
                }
                Err(e) => {
                    warn!("Failed to load config {}: {:#}", path.display(), e);
                }
            }
        }
        info!("Using built-in default config");
        Self::builtin()
    }

    /// Load settings from specified path
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Parse settings from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    /// Write the default config template to `path`
    pub fn write_default_config(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        std::fs::write(path, DEFAULT_CONFIG_TEMPLATE)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }
}

/// Commented template written by --init-config
const DEFAULT_CONFIG_TEMPLATE: &str = r#"# dmseat configuration

[seat]
# Lowest display number handed to local X servers
minimum_display_number = 0
# X server binary and extra arguments
xserver_command = "X"
xserver_args = []
# First VT for local X servers
vt_start = 7

[[local_seat]]
name = "seat0"

# Remote X terminals whose session was negotiated out of band
# [[remote_session]]
# id = 1
# address = "10.0.0.5"
# display_number = 7
# cookie = "00112233445566778899aabbccddeeff"
"#;

/// Config file change watcher (Linux only)
#[cfg(target_os = "linux")]
pub struct ConfigWatcher {
    _watcher: RecommendedWatcher,
    rx: mpsc::Receiver<()>,
}

#[cfg(target_os = "linux")]
impl ConfigWatcher {
    /// Start watching config file
    pub fn new(config_path: &Path) -> Result<Self> {
        let file_name = config_path
            .file_name()
            .map(OsStr::to_os_string)
            .with_context(|| format!("Not a config file path: {}", config_path.display()))?;
        let (tx, rx) = mpsc::channel();

        let mut watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| {
            if let Ok(event) = res {
                if is_config_event(&event, &file_name) {
                    let _ = tx.send(());
                }
            }
        })?;

        // Watch the parent directory to catch rename operations
        let watch_path = config_path.parent().unwrap_or(config_path);
        watcher.watch(watch_path, RecursiveMode::NonRecursive)?;

        Ok(Self {
            _watcher: watcher,
            rx,
        })
    }

    /// Check if config file was modified (non-blocking)
    pub fn check_reload(&self) -> bool {
        let mut changed = false;
        while self.rx.try_recv().is_ok() {
            changed = true;
        }
        changed
    }
}

/// Whether a directory event touches the config file itself
///
/// Editors often save by writing a temp file then renaming it over the
/// config, which shows up as a modify/create on the config's name.
#[cfg(target_os = "linux")]
fn is_config_event(event: &Event, file_name: &OsStr) -> bool {
    matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_))
        && event
            .paths
            .iter()
            .any(|path| path.file_name() == Some(file_name))
}

/// Get default config file path
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("dmseat").join("config.toml"))
}
