//! IPC client for sending commands to the running daemon.

use crate::error::{RelayError, Result};
use crate::ipc::protocol::{Command, Response};
use std::path::Path;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;

/// Send a command to the daemon and wait for its response.
///
/// Each command uses one short-lived connection: write a command line,
/// read a response line, disconnect.
pub async fn send_command(socket_path: &Path, command: Command) -> Result<Response> {
    let stream = UnixStream::connect(socket_path)
        .await
        .map_err(|e| RelayError::IpcConnection {
            message: format!(
                "Failed to connect to daemon at {}: {}. Is the daemon running?",
                socket_path.display(),
                e
            ),
        })?;

    let (reader, mut writer) = stream.into_split();

    let command_json = command.to_json().map_err(|e| RelayError::IpcProtocol {
        message: format!("Failed to serialize command: {}", e),
    })?;
    writer
        .write_all(format!("{}\n", command_json).as_bytes())
        .await
        .map_err(|e| RelayError::IpcConnection {
            message: format!("Failed to send command: {}", e),
        })?;
    writer.flush().await.map_err(|e| RelayError::IpcConnection {
        message: format!("Failed to flush command: {}", e),
    })?;

    let mut line = String::new();
    BufReader::new(reader)
        .read_line(&mut line)
        .await
        .map_err(|e| RelayError::IpcConnection {
            message: format!("Failed to read response: {}", e),
        })?;

    Response::from_json(line.trim()).map_err(|e| RelayError::IpcProtocol {
        message: format!("Failed to parse response: {}", e),
    })
}
