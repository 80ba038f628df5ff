//! IPC command handler for the daemon.

use crate::daemon::DaemonState;
use crate::ipc::protocol::{Command, Response};
use crate::ipc::server::CommandHandler;
use std::sync::Arc;

/// Handles IPC commands against the running daemon.
pub struct RelayCommandHandler {
    state: Arc<DaemonState>,
}

impl RelayCommandHandler {
    pub fn new(state: Arc<DaemonState>) -> Self {
        Self { state }
    }

    async fn run_tick(&self) -> Response {
        match self.state.run_tick().await {
            Ok(summary) => Response::Summary { summary },
            Err(e) => Response::Error {
                message: format!("Tick failed: {}", e),
            },
        }
    }

    async fn get_status(&self) -> Response {
        let (uptime_secs, ticks, last_tick) = self.state.status().await;
        Response::Status {
            uptime_secs,
            ticks,
            last_tick,
        }
    }
}

#[async_trait::async_trait]
impl CommandHandler for RelayCommandHandler {
    async fn handle(&self, command: Command) -> Response {
        match command {
            Command::Tick => self.run_tick().await,
            Command::Status => self.get_status().await,
            Command::Shutdown => {
                // The acknowledgement still goes out: the server answers
                // its accepted connections before the daemon finishes exiting.
                self.state.request_shutdown();
                Response::Ok
            }
        }
    }
}
