//! Command-line interface for voxrelay
//!
//! Provides argument parsing using clap derive macros.

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;
use std::time::Duration;

/// Voice message transcription relay
#[derive(Parser, Debug)]
#[command(name = "voxrelay", version, about = "Voice message transcription relay")]
pub struct Cli {
    /// Subcommand to execute (default: one relay tick)
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Configuration file path
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose output (-v: debug, -vv: trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Parse a scheduler interval.
///
/// Supports any duration format accepted by `humantime`: bare numbers
/// (seconds), single-unit (`90s`, `30m`, `2h`), and compound (`1h30m`).
fn parse_interval(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    let duration = if let Ok(secs) = s.parse::<u64>() {
        Duration::from_secs(secs)
    } else {
        humantime::parse_duration(s).map_err(|e| e.to_string())?
    };
    if duration.is_zero() {
        return Err("interval must be greater than zero".to_string());
    }
    Ok(duration)
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the relay on a schedule (foreground process for systemd)
    Daemon {
        /// Path to Unix socket (default: $XDG_RUNTIME_DIR/voxrelay.sock)
        #[arg(long, value_name = "PATH")]
        socket: Option<PathBuf>,

        /// Tick interval (default: from config). Examples: 30m, 90s, 1h30m
        #[arg(long, value_name = "DURATION", value_parser = parse_interval)]
        every: Option<Duration>,
    },

    /// Run a single relay tick in-process and exit
    Once,

    /// Ask a running daemon to tick now
    Tick {
        /// Path to Unix socket (default: $XDG_RUNTIME_DIR/voxrelay.sock)
        #[arg(long, value_name = "PATH")]
        socket: Option<PathBuf>,
    },

    /// Show daemon status
    Status {
        /// Path to Unix socket (default: $XDG_RUNTIME_DIR/voxrelay.sock)
        #[arg(long, value_name = "PATH")]
        socket: Option<PathBuf>,
    },

    /// Shut a running daemon down
    Stop {
        /// Path to Unix socket (default: $XDG_RUNTIME_DIR/voxrelay.sock)
        #[arg(long, value_name = "PATH")]
        socket: Option<PathBuf>,
    },

    /// Transcribe one local voice file and print the text
    Transcribe {
        /// Audio file to transcribe
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Emit a shell completion script
    Completions {
        /// Target shell
        shell: Shell,
    },
}
