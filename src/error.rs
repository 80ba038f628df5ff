//! Error types for voxrelay.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RelayError {
    // Configuration errors
    #[error("Configuration file not found at {path}")]
    ConfigFileNotFound { path: String },

    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    // Pipeline errors
    #[error("Audio conversion failed for {path}: {message}")]
    Conversion { path: String, message: String },

    #[error("Failed to create segment directory {path}: {message}")]
    ArtifactDir { path: String, message: String },

    #[error("Recognition transport failed: {message}")]
    RecognitionTransport { message: String },

    // Collaborator errors
    #[error("Chat client error: {message}")]
    ChatClient { message: String },

    #[error("Notification send failed: {message}")]
    Notify { message: String },

    // Daemon control socket
    #[error("IPC socket error: {message}")]
    IpcSocket { message: String },

    #[error("IPC protocol error: {message}")]
    IpcProtocol { message: String },

    #[error("IPC connection failed: {message}")]
    IpcConnection { message: String },

    // Plumbing
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, RelayError>;
