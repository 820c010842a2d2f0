//! dmseat - provision displays for configured seats
//!
//! Loads the seat configuration, gives every seat one display, and
//! optionally keeps running to re-provision on config changes.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use log::{error, info, warn};

use dmseat::config::{self, Config};
use dmseat::constants::{DEFAULT_PROVISION_ATTEMPTS, WATCH_POLL_INTERVAL_MS};
use dmseat::runtime::{ProvisionedDisplay, Runtime};
use dmseat::signals;

fn print_help() {
    println!(
        r#"dmseat {} - seat and display provisioning for X display managers

USAGE:
    dmseat [OPTIONS]

OPTIONS:
    -h, --help              Print this help message
    -V, --version           Print version information
    -c, --config PATH       Load configuration from PATH
    --init-config           Generate the default config file
    -f, --force             Overwrite config file without confirmation
    --auth-dir DIR          Write Xauthority files for provisioned displays
    --attempts N            add_display attempts per seat (default: {})
    --watch                 Keep running and re-provision on config change

CONFIG FILE:
    $DMSEAT_CONFIG, ~/.config/dmseat/config.toml, /etc/dmseat/config.toml

ENVIRONMENT:
    RUST_LOG                Log filter (default: warn)"#,
        env!("CARGO_PKG_VERSION"),
        DEFAULT_PROVISION_ATTEMPTS
    );
}

/// Parsed command line
#[derive(Debug, Default)]
struct Options {
    config: Option<PathBuf>,
    init_config: bool,
    force: bool,
    auth_dir: Option<PathBuf>,
    attempts: Option<u32>,
    watch: bool,
}

/// Outcome of argument parsing
enum Command {
    Help,
    Version,
    Run(Options),
}

fn parse_args(args: &[String]) -> Result<Command> {
    let mut opts = Options::default();
    let mut iter = args.iter().skip(1);

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-h" | "--help" => return Ok(Command::Help),
            "-V" | "--version" => return Ok(Command::Version),
            "-c" | "--config" => {
                let path = iter.next().context("--config requires a path")?;
                opts.config = Some(PathBuf::from(path));
            }
            "--init-config" => opts.init_config = true,
            "-f" | "--force" => opts.force = true,
            "--auth-dir" => {
                let dir = iter.next().context("--auth-dir requires a directory")?;
                opts.auth_dir = Some(PathBuf::from(dir));
            }
            "--attempts" => {
                let n = iter.next().context("--attempts requires a number")?;
                let n: u32 = n
                    .parse()
                    .with_context(|| format!("Invalid attempt count: {}", n))?;
                opts.attempts = Some(n);
            }
            "--watch" => opts.watch = true,
            other => bail!("Unknown option: {} (see --help)", other),
        }
    }

    Ok(Command::Run(opts))
}

fn init_config(opts: &Options) -> Result<()> {
    let path = match &opts.config {
        Some(path) => path.clone(),
        None => config::default_config_path().context("No config directory available")?,
    };

    if path.exists() && !opts.force {
        println!("Config file already exists: {}", path.display());
        print!("Overwrite? [y/N]: ");
        std::io::Write::flush(&mut std::io::stdout())?;

        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;
        let input = input.trim().to_lowercase();

        if input != "y" && input != "yes" {
            println!("Aborted.");
            return Ok(());
        }
    }

    Config::write_default_config(&path)?;
    println!("Config file generated: {}", path.display());
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load_from_file(path),
        None => Ok(Config::load()),
    }
}

/// One report line: seat, display ID, DISPLAY value, creation time
fn report_line(entry: &ProvisionedDisplay) -> String {
    format!(
        "{}\t{}\t{}\t{}",
        entry.seat,
        entry.display.id(),
        entry.display.connection_name(),
        entry.display.created().format("%Y-%m-%d %H:%M:%S")
    )
}

/// Build seats, provision them, and report the result
fn provision(cfg: &Config, opts: &Options) -> Runtime {
    let mut runtime = Runtime::from_config(cfg);
    let summary = runtime.provision_all(opts.attempts.unwrap_or(DEFAULT_PROVISION_ATTEMPTS));

    for entry in runtime.displays() {
        println!("{}", report_line(entry));
    }
    for (seat, e) in &summary.failed {
        eprintln!("{}\tfailed\t{}", seat, e);
    }

    runtime
}

/// Write Xauthority files if --auth-dir was given
fn export_authorities(runtime: &Runtime, opts: &Options) -> Result<()> {
    if let Some(dir) = &opts.auth_dir {
        let written = runtime.write_authorities(dir)?;
        info!("Wrote {} authority file(s) to {}", written.len(), dir.display());
    }
    Ok(())
}

/// Re-provision from the current config file
///
/// Never fails: a bad config keeps the old seats, and an export error
/// keeps the new ones.
fn reload(runtime: &mut Runtime, opts: &Options) {
    let new_cfg = match load_config(opts.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!("Keeping previous config: {:#}", e);
            return;
        }
    };

    runtime.shutdown();
    *runtime = provision(&new_cfg, opts);
    if let Err(e) = export_authorities(runtime, opts) {
        error!("Reloaded seats without authority files: {:#}", e);
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args: Vec<String> = std::env::args().collect();
    let opts = match parse_args(&args)? {
        Command::Help => {
            print_help();
            return Ok(());
        }
        Command::Version => {
            println!("dmseat {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        Command::Run(opts) => opts,
    };

    if opts.init_config {
        return init_config(&opts);
    }

    info!("dmseat starting...");
    let cfg = load_config(opts.config.as_deref())?;
    let mut runtime = provision(&cfg, &opts);
    export_authorities(&runtime, &opts)?;

    if !opts.watch {
        return Ok(());
    }

    signals::setup_signal_handlers();

    // Watch the actual loaded config path, not just the default path
    #[cfg(target_os = "linux")]
    let config_watcher = opts
        .config
        .clone()
        .or_else(Config::config_path)
        .and_then(|path| match config::ConfigWatcher::new(&path) {
            Ok(watcher) => Some(watcher),
            Err(e) => {
                warn!("Config hot-reload unavailable: {}", e);
                None
            }
        });
    #[cfg(target_os = "linux")]
    if config_watcher.is_some() {
        info!("Config hot-reload enabled");
    }

    // Notify systemd that we're ready
    let _ = sd_notify::notify(true, &[sd_notify::NotifyState::Ready]);

    loop {
        if signals::shutdown_requested() {
            info!("Received shutdown signal, stopping seats...");
            let _ = sd_notify::notify(true, &[sd_notify::NotifyState::Stopping]);
            runtime.shutdown();
            break;
        }

        #[cfg(target_os = "linux")]
        if let Some(ref watcher) = config_watcher {
            if watcher.check_reload() {
                info!("Config file change detected, reloading...");
                let _ = sd_notify::notify(true, &[sd_notify::NotifyState::Reloading]);
                reload(&mut runtime, &opts);
                let _ = sd_notify::notify(true, &[sd_notify::NotifyState::Ready]);
            }
        }

        std::thread::sleep(Duration::from_millis(WATCH_POLL_INTERVAL_MS));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        std::iter::once("dmseat")
            .chain(list.iter().copied())
            .map(String::from)
            .collect()
    }

    #[test]
    fn test_parse_run_options() {
        let cmd = parse_args(&args(&["-c", "/tmp/x.toml", "--attempts", "5", "--watch"])).unwrap();
        let Command::Run(opts) = cmd else {
            panic!("expected run command");
        };
        assert_eq!(opts.config, Some(PathBuf::from("/tmp/x.toml")));
        assert_eq!(opts.attempts, Some(5));
        assert!(opts.watch);
        assert!(!opts.init_config);
    }

    #[test]
    fn test_parse_help_wins() {
        assert!(matches!(
            parse_args(&args(&["--watch", "-h"])).unwrap(),
            Command::Help
        ));
    }

    const ONE_REMOTE: &str = r#"
[[remote_session]]
id = 1
address = "10.0.0.5"
display_number = 7
cookie = "00112233"
"#;

    #[test]
    fn test_report_line_has_creation_time() {
        let runtime = provision(&Config::parse(ONE_REMOTE).unwrap(), &Options::default());
        let entry = &runtime.displays()[0];
        let line = report_line(entry);
        let fields: Vec<&str> = line.split('\t').collect();
        assert_eq!(fields[0], "remote-1");
        assert_eq!(fields[2], "10.0.0.5:7");
        assert_eq!(
            fields[3],
            entry.display.created().format("%Y-%m-%d %H:%M:%S").to_string()
        );
    }

    #[test]
    fn test_reload_survives_export_failure() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.toml");
        std::fs::write(&config_path, ONE_REMOTE).unwrap();
        // A regular file where the auth directory should be created
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"").unwrap();

        let opts = Options {
            config: Some(config_path),
            auth_dir: Some(blocker.join("auth")),
            ..Default::default()
        };
        let mut runtime = Runtime::from_config(&Config::default());
        assert!(runtime.displays().is_empty());

        reload(&mut runtime, &opts);
        assert_eq!(runtime.displays().len(), 1);
        assert_eq!(runtime.displays()[0].display.connection_name(), "10.0.0.5:7");
    }

    #[test]
    fn test_reload_keeps_runtime_on_bad_config() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.toml");
        std::fs::write(&config_path, ONE_REMOTE).unwrap();
        let opts = Options {
            config: Some(config_path.clone()),
            ..Default::default()
        };
        let mut runtime = provision(&Config::parse(ONE_REMOTE).unwrap(), &opts);

        std::fs::write(&config_path, "[[remote_session\n").unwrap();
        reload(&mut runtime, &opts);
        assert_eq!(runtime.displays().len(), 1);
        assert_eq!(runtime.seats()[0].name(), "remote-1");
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_args(&args(&["--attempts"])).is_err());
        assert!(parse_args(&args(&["--attempts", "many"])).is_err());
        assert!(parse_args(&args(&["--bogus"])).is_err());
    }
}
