//! Daemon mode for voxrelay - scheduled relay ticks plus an IPC server.

pub mod handler;

use crate::error::{RelayError, Result};
use crate::ipc::server::IpcServer;
use crate::notify::Notifier;
use crate::relay::{RelayService, TickSummary};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, watch};

/// Daemon state: the relay behind a lock, tick counters, shutdown signal.
pub struct DaemonState {
    relay: Mutex<RelayService>,
    started: Instant,
    ticks: Mutex<u64>,
    last_tick: Mutex<Option<TickSummary>>,
    shutdown_tx: watch::Sender<bool>,
}

impl DaemonState {
    pub fn new(relay: RelayService) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            relay: Mutex::new(relay),
            started: Instant::now(),
            ticks: Mutex::new(0),
            last_tick: Mutex::new(None),
            shutdown_tx,
        }
    }

    /// Runs one relay tick and updates the counters.
    ///
    /// The relay lock serializes scheduled and commanded ticks, so two
    /// triggers close together run back to back, never interleaved.
    pub async fn run_tick(&self) -> Result<TickSummary> {
        let summary = self.relay.lock().await.process_once().await?;

        *self.ticks.lock().await += 1;
        *self.last_tick.lock().await = Some(summary);

        Ok(summary)
    }

    /// Returns (uptime seconds, completed ticks, last tick summary).
    pub async fn status(&self) -> (u64, u64, Option<TickSummary>) {
        let ticks = *self.ticks.lock().await;
        let last_tick = *self.last_tick.lock().await;
        (self.started.elapsed().as_secs(), ticks, last_tick)
    }

    /// Asks the daemon loop to exit.
    pub fn request_shutdown(&self) {
        self.shutdown_tx.send_replace(true);
    }

    /// Resolves once shutdown has been requested, including requests made
    /// before this call.
    pub async fn shutdown_requested(&self) {
        let mut rx = self.shutdown_tx.subscribe();
        // The sender lives as long as the state, so this cannot fail
        let _ = rx.wait_for(|stop| *stop).await;
    }
}

/// Run the daemon: start the IPC server, tick on the interval, wait for
/// shutdown.
///
/// The first tick fires immediately so a freshly started daemon scans
/// right away instead of sleeping through the first interval. On shutdown
/// an in-flight tick is allowed to finish before the process exits.
pub async fn run_daemon(
    relay: RelayService,
    notifier: Arc<dyn Notifier>,
    interval: Duration,
    socket_path: Option<PathBuf>,
) -> Result<()> {
    let state = Arc::new(DaemonState::new(relay));

    // Silent startup notice so the operator knows the relay is watching
    let notice = format!(
        "voxrelay online, ticking every {}",
        humantime::format_duration(interval)
    );
    if let Err(e) = notifier.send_text(&notice, true).await {
        log::warn!("Failed to send startup notice: {}", e);
    }

    let socket_path = socket_path.unwrap_or_else(IpcServer::default_socket_path);
    let server = Arc::new(IpcServer::new(socket_path));
    log::info!("IPC server listening at {}", server.socket_path().display());

    let ipc_handler = handler::RelayCommandHandler::new(Arc::clone(&state));
    let server_clone = Arc::clone(&server);
    let server_handle = tokio::spawn(async move { server_clone.start(ipc_handler).await });

    // Scheduler task. A tick already underway when shutdown arrives runs to
    // completion; the loop only checks the flag between ticks.
    let scheduler_state = Arc::clone(&state);
    let scheduler_handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match scheduler_state.run_tick().await {
                        Ok(summary) => log::info!("Tick complete: {}", summary),
                        Err(e) => log::error!("Tick failed: {}", e),
                    }
                }
                _ = scheduler_state.shutdown_requested() => break,
            }
        }
    });

    // Wait for SIGTERM, SIGINT or an IPC shutdown command
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            log::info!("Received SIGINT, shutting down");
        }
        res = wait_for_sigterm() => {
            if let Err(e) = res {
                log::warn!("Error setting up signal handler: {}", e);
            }
            log::info!("Received SIGTERM, shutting down");
        }
        _ = state.shutdown_requested() => {
            log::info!("Shutdown requested over IPC");
        }
    }

    // Signal-initiated exits still have to stop the scheduler
    state.request_shutdown();
    if let Err(e) = scheduler_handle.await {
        log::warn!("Scheduler task failed: {}", e);
    }

    server.stop()?;
    if let Err(e) = server_handle.await {
        log::warn!("Daemon server task failed: {}", e);
    }

    log::info!("Daemon stopped");
    Ok(())
}

/// Resolves when SIGTERM arrives (systemd stop).
#[cfg(unix)]
async fn wait_for_sigterm() -> Result<()> {
    use tokio::signal::unix::{SignalKind, signal};
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| RelayError::Other(format!("Failed to register SIGTERM handler: {}", e)))?;
    sigterm.recv().await;
    Ok(())
}

/// Non-Unix builds have no SIGTERM; Ctrl+C remains the only signal exit.
#[cfg(not(unix))]
async fn wait_for_sigterm() -> Result<()> {
    std::future::pending::<()>().await
}
