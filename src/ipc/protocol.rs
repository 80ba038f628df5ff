//! JSON message protocol for IPC communication between CLI and daemon.

use crate::relay::TickSummary;
use serde::{Deserialize, Serialize};

/// Commands a client can send to the daemon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    /// Run a relay tick immediately
    Tick,
    /// Report uptime and tick counters
    Status,
    /// Ask the daemon to exit
    Shutdown,
}

impl Command {
    /// Encode as a single-line JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse one line of JSON.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

/// What the daemon answers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Acknowledged, nothing to report
    Ok,
    /// The counters of the tick this command triggered
    Summary { summary: TickSummary },
    /// Daemon vitals
    Status {
        uptime_secs: u64,
        ticks: u64,
        last_tick: Option<TickSummary>,
    },
    /// The command failed on the daemon side
    Error { message: String },
}

impl Response {
    /// Encode as a single-line JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse one line of JSON.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}
