//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use contracts::TransportBackend;
use std::path::PathBuf;

/// Trainer Sync - keeps ride video in step with trainer telemetry
#[derive(Parser, Debug)]
#[command(
    name = "trainer-sync",
    author,
    version,
    about = "Trainer telemetry to video playback sync engine",
    long_about = "Drives video playback from indoor-trainer telemetry.\n\n\
                  Loads a session configuration, opens the media on the selected \n\
                  backend, maps rider position onto the video through the sync \n\
                  table and corrects playback by seeking or nudging the rate."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "TRAINER_SYNC_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "TRAINER_SYNC_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a headless sync session
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration and sync table information
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(
        short,
        long,
        default_value = "session.toml",
        env = "TRAINER_SYNC_CONFIG"
    )]
    pub config: PathBuf,

    /// Override the media file from configuration
    #[arg(long, env = "TRAINER_SYNC_MEDIA")]
    pub media: Option<PathBuf>,

    /// Override the transport backend from configuration
    #[arg(long, value_enum, env = "TRAINER_SYNC_BACKEND")]
    pub backend: Option<BackendArg>,

    /// Override the mpv IPC socket from configuration
    #[arg(long, env = "TRAINER_SYNC_MPV_SOCKET")]
    pub mpv_socket: Option<PathBuf>,

    /// Stop the session after this many seconds (0 = until telemetry ends)
    #[arg(long, default_value = "0", env = "TRAINER_SYNC_MAX_DURATION")]
    pub max_duration: u64,

    /// Stop after this many telemetry samples (0 = unlimited)
    #[arg(long, default_value = "0")]
    pub max_samples: u64,

    /// Validate configuration and exit without running the session
    #[arg(long)]
    pub dry_run: bool,

    /// Session command queue size
    #[arg(long, default_value = "64", env = "TRAINER_SYNC_QUEUE_SIZE")]
    pub queue_size: usize,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "TRAINER_SYNC_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "session.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "session.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show the sync table points for the configured media
    #[arg(long)]
    pub table: bool,
}

/// Transport backend selectable from the command line
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackendArg {
    Simulated,
    Mpv,
}

impl From<BackendArg> for TransportBackend {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Simulated => TransportBackend::Simulated,
            BackendArg::Mpv => TransportBackend::Mpv,
        }
    }
}

/// Log output format
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_overrides_parse() {
        let cli = Cli::try_parse_from([
            "trainer-sync",
            "-v",
            "run",
            "--config",
            "ride.toml",
            "--media",
            "alps.mp4",
            "--backend",
            "mpv",
            "--max-duration",
            "30",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 1);
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.config, PathBuf::from("ride.toml"));
        assert_eq!(args.media, Some(PathBuf::from("alps.mp4")));
        assert_eq!(args.backend.map(TransportBackend::from), Some(TransportBackend::Mpv));
        assert_eq!(args.max_duration, 30);
    }

    #[test]
    fn test_info_flags() {
        let cli = Cli::try_parse_from(["trainer-sync", "info", "--json", "--table"]).unwrap();
        let Commands::Info(args) = cli.command else {
            panic!("expected info");
        };
        assert!(args.json && args.table);
        assert_eq!(args.config, PathBuf::from("session.toml"));
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["trainer-sync", "-q", "-v", "validate"]).is_err());
    }
}
