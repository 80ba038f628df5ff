use crate::defaults;
use crate::error::RelayError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub chat: ChatConfig,
    pub pipeline: PipelineSettings,
    pub segmenter: SegmenterSettings,
    pub stt: SttConfig,
    pub notify: NotifyConfig,
    pub schedule: ScheduleConfig,
}

/// Chat scanning configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChatConfig {
    /// Spool directory where the platform bridge drops voice messages.
    pub spool_dir: PathBuf,
    /// Maximum number of chats scanned per tick.
    pub chat_limit: usize,
    /// Maximum number of recent messages inspected per chat.
    pub history_limit: usize,
}

/// Pipeline concurrency and tooling configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineSettings {
    /// Working directory for downloaded and converted audio (empty = system temp).
    pub work_dir: PathBuf,
    /// Ceiling on simultaneous conversions (0 = batch size).
    pub convert_concurrency: usize,
    /// Ceiling on simultaneous recognition calls.
    pub transcribe_concurrency: usize,
    /// Ceiling on simultaneous downloads.
    pub download_concurrency: usize,
    /// External decode tool binary.
    pub ffmpeg_path: String,
}

/// Silence segmentation thresholds
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SegmenterSettings {
    pub min_silence_ms: u32,
    pub silence_offset_db: f32,
    pub keep_silence_ms: u32,
}

/// Speech recognition engine configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SttConfig {
    /// Transcription endpoint URL.
    pub endpoint: String,
    /// Bearer token, empty for unauthenticated endpoints.
    pub api_key: String,
    pub language: String,
}

/// Operator notification configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NotifyConfig {
    /// Send endpoint URL.
    pub endpoint: String,
    /// Operator chat identifier included in every send.
    pub chat_id: String,
    /// Deliver transcripts without a notification sound.
    pub silent: bool,
}

/// Scheduler configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Interval between ticks, in humantime notation (e.g. "30m", "1h").
    pub interval: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            spool_dir: PathBuf::new(),
            chat_limit: defaults::CHAT_LIMIT,
            history_limit: defaults::HISTORY_LIMIT,
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::new(),
            convert_concurrency: 0,
            transcribe_concurrency: defaults::TRANSCRIBE_CONCURRENCY,
            download_concurrency: defaults::DOWNLOAD_CONCURRENCY,
            ffmpeg_path: defaults::FFMPEG_BIN.to_string(),
        }
    }
}

impl Default for SegmenterSettings {
    fn default() -> Self {
        Self {
            min_silence_ms: defaults::MIN_SILENCE_MS,
            silence_offset_db: defaults::SILENCE_OFFSET_DB,
            keep_silence_ms: defaults::KEEP_SILENCE_MS,
        }
    }
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_key: String::new(),
            language: defaults::LANGUAGE.to_string(),
        }
    }
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            chat_id: String::new(),
            silent: false,
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            interval: defaults::SCHEDULE_INTERVAL.to_string(),
        }
    }
}

impl Config {
    /// Read configuration from a TOML file.
    ///
    /// A missing file is reported as [`RelayError::ConfigFileNotFound`];
    /// fields absent from the file keep their defaults.
    pub fn load(path: &Path) -> crate::error::Result<Self> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(RelayError::ConfigFileNotFound {
                    path: path.display().to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        };
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Like [`Config::load`], but a missing file yields the defaults.
    /// Invalid TOML in an existing file panics.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(RelayError::ConfigFileNotFound { .. }) => Self::default(),
            Err(e) => {
                panic!("Failed to load config from {}: {}", path.display(), e);
            }
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - VOXRELAY_SPOOL_DIR → chat.spool_dir
    /// - VOXRELAY_STT_ENDPOINT → stt.endpoint
    /// - VOXRELAY_STT_API_KEY → stt.api_key
    /// - VOXRELAY_NOTIFY_ENDPOINT → notify.endpoint
    /// - VOXRELAY_NOTIFY_CHAT_ID → notify.chat_id
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(dir) = std::env::var("VOXRELAY_SPOOL_DIR")
            && !dir.is_empty()
        {
            self.chat.spool_dir = PathBuf::from(dir);
        }

        if let Ok(endpoint) = std::env::var("VOXRELAY_STT_ENDPOINT")
            && !endpoint.is_empty()
        {
            self.stt.endpoint = endpoint;
        }

        if let Ok(key) = std::env::var("VOXRELAY_STT_API_KEY")
            && !key.is_empty()
        {
            self.stt.api_key = key;
        }

        if let Ok(endpoint) = std::env::var("VOXRELAY_NOTIFY_ENDPOINT")
            && !endpoint.is_empty()
        {
            self.notify.endpoint = endpoint;
        }

        if let Ok(chat_id) = std::env::var("VOXRELAY_NOTIFY_CHAT_ID")
            && !chat_id.is_empty()
        {
            self.notify.chat_id = chat_id;
        }

        self
    }

    /// Default config location, `~/.config/voxrelay/config.toml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("voxrelay")
            .join("config.toml")
    }

    /// Resolve the pipeline working directory.
    ///
    /// An empty `pipeline.work_dir` falls back to a voxrelay subdirectory of
    /// the system temp dir.
    pub fn work_dir(&self) -> PathBuf {
        if self.pipeline.work_dir.as_os_str().is_empty() {
            std::env::temp_dir().join("voxrelay")
        } else {
            self.pipeline.work_dir.clone()
        }
    }

    /// Parse the scheduler interval.
    pub fn schedule_interval(&self) -> crate::error::Result<Duration> {
        humantime::parse_duration(self.schedule.interval.trim()).map_err(|e| {
            RelayError::ConfigInvalidValue {
                key: "schedule.interval".to_string(),
                message: e.to_string(),
            }
        })
    }
}
