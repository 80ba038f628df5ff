//! Unix-socket IPC between the CLI and the daemon.
//!
//! One newline-delimited JSON command per connection, one JSON response
//! back. The default socket lives under `XDG_RUNTIME_DIR` with a `/tmp`
//! fallback.

pub mod client;
pub mod protocol;
pub mod server;

pub use client::send_command;
pub use protocol::{Command, Response};
pub use server::{CommandHandler, IpcServer};
