//! Async Unix socket IPC server for daemon control.

use crate::error::{RelayError, Result};
use crate::ipc::protocol::{Command, Response};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Handler trait for processing IPC commands.
#[async_trait::async_trait]
pub trait CommandHandler: Send + Sync {
    /// Handle a command and return a response.
    async fn handle(&self, command: Command) -> Response;
}

/// Unix-socket command server, one per daemon.
///
/// `stop` ends the accept loop and removes the socket file; `start` then
/// answers the connections it has already accepted before returning.
pub struct IpcServer {
    socket_path: PathBuf,
    shutdown_tx: watch::Sender<bool>,
}

impl IpcServer {
    /// Create a server that binds `socket_path` once started.
    pub fn new(socket_path: PathBuf) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            socket_path,
            shutdown_tx,
        }
    }

    /// Get the socket path this server is using.
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Default socket path under `XDG_RUNTIME_DIR`, with a per-uid `/tmp`
    /// fallback when the session has none.
    pub fn default_socket_path() -> PathBuf {
        if let Ok(xdg_runtime) = std::env::var("XDG_RUNTIME_DIR") {
            PathBuf::from(xdg_runtime).join("voxrelay.sock")
        } else {
            let uid = unsafe { libc::getuid() };
            PathBuf::from(format!("/tmp/voxrelay-{}.sock", uid))
        }
    }

    /// Accept and serve connections until [`IpcServer::stop`] is called.
    ///
    /// A stale socket file from an earlier run is removed before binding.
    /// Connections accepted before the stop are answered before this
    /// returns.
    pub async fn start<H>(&self, handler: H) -> Result<()>
    where
        H: CommandHandler + 'static,
    {
        if self.socket_path.exists() {
            std::fs::remove_file(&self.socket_path).map_err(|e| RelayError::IpcSocket {
                message: format!("Failed to remove existing socket: {}", e),
            })?;
        }

        let listener = UnixListener::bind(&self.socket_path).map_err(|e| RelayError::IpcSocket {
            message: format!("Failed to bind to socket: {}", e),
        })?;

        let handler = Arc::new(handler);
        let mut shutdown = self.shutdown_tx.subscribe();
        let mut clients: Vec<JoinHandle<()>> = Vec::new();

        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, _)) => {
                        let handler = Arc::clone(&handler);
                        clients.retain(|client| !client.is_finished());
                        clients.push(tokio::spawn(async move {
                            if let Err(e) = handle_client(stream, handler).await {
                                log::warn!("Error handling IPC client: {}", e);
                            }
                        }));
                    }
                    Err(e) => {
                        return Err(RelayError::IpcConnection {
                            message: format!("Failed to accept connection: {}", e),
                        });
                    }
                },
                _ = shutdown.wait_for(|stop| *stop) => break,
            }
        }

        // A shutdown acknowledgement is written by one of these tasks; the
        // daemon must not exit from under it
        for client in clients {
            if let Err(e) = client.await {
                log::warn!("IPC client task failed: {}", e);
            }
        }

        Ok(())
    }

    /// Stop accepting connections and remove the socket file.
    pub fn stop(&self) -> Result<()> {
        self.shutdown_tx.send_replace(true);

        if self.socket_path.exists() {
            std::fs::remove_file(&self.socket_path).map_err(|e| RelayError::IpcSocket {
                message: format!("Failed to remove socket file: {}", e),
            })?;
        }

        Ok(())
    }
}

/// Serve one connection: read a command line, answer with a response line.
async fn handle_client<H>(stream: UnixStream, handler: Arc<H>) -> Result<()>
where
    H: CommandHandler,
{
    let (reader, mut writer) = stream.into_split();
    let mut line = String::new();
    BufReader::new(reader)
        .read_line(&mut line)
        .await
        .map_err(|e| RelayError::IpcConnection {
            message: format!("Failed to read from client: {}", e),
        })?;

    let command = Command::from_json(line.trim()).map_err(|e| RelayError::IpcProtocol {
        message: format!("Failed to parse command: {}", e),
    })?;

    let response = handler.handle(command).await;
    let payload = response.to_json().map_err(|e| RelayError::IpcProtocol {
        message: format!("Failed to serialize response: {}", e),
    })?;

    writer
        .write_all(format!("{}\n", payload).as_bytes())
        .await
        .map_err(|e| RelayError::IpcConnection {
            message: format!("Failed to write to client: {}", e),
        })?;
    writer.flush().await.map_err(|e| RelayError::IpcConnection {
        message: format!("Failed to flush response: {}", e),
    })?;

    Ok(())
}
