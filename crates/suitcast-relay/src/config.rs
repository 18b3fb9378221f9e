use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::Level;

use chrono::Duration;
use suitcast_core::engine::session::{DEFAULT_UTC_OFFSET_HOURS, DEFAULT_WINDOWS};
use suitcast_core::engine::{
    DEFAULT_COOLDOWN_MINUTES, DEFAULT_QUARANTINE_TTL_MINUTES, DEFAULT_REFRESH_MINUTES,
    EngineConfig, SessionWindow, SessionWindows,
};
use suitcast_core::extract::Markers;
use suitcast_core::policy::{MatchScope, StaticRules};

const DEFAULT_STATE_PATH: &str = "suitcast-state.json";
const DEFAULT_LOG_DIRECTORY: &str = "logs";
const DEFAULT_SAVE_EVERY: usize = 1;

/// Root relay configuration loaded from YAML.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RelayConfig {
    pub feed: FeedConfig,
    pub outbox: OutboxConfig,
    #[serde(default)]
    pub state: StateConfig,
    #[serde(default)]
    pub engine: EngineSection,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl RelayConfig {
    /// Load configuration from a YAML file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let path_buf = path.to_path_buf();
        let file = File::open(path).map_err(|source| ConfigError::Read {
            source,
            path: path_buf.clone(),
        })?;
        let reader = BufReader::new(file);
        let mut cfg: RelayConfig =
            serde_yaml::from_reader(reader).map_err(|source| ConfigError::Parse {
                source,
                path: path_buf.clone(),
            })?;
        cfg.validate().map_err(|source| ConfigError::Invalid {
            path: path_buf,
            source,
        })?;
        Ok(cfg)
    }

    /// Validate the configuration without performing I/O.
    pub fn validate(&mut self) -> Result<(), ValidationError> {
        self.feed.validate()?;
        self.outbox.validate()?;
        self.state.validate()?;
        self.engine.validate()?;
        self.logging.normalize();
        Ok(())
    }

    pub fn engine_config(&self) -> Result<EngineConfig, ValidationError> {
        self.engine.to_engine_config()
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct FeedConfig {
    /// Only events from this chat are processed.
    pub source_channel: i64,
    pub path: PathBuf,
}

impl FeedConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        require_path("feed.path", &self.path)
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct OutboxConfig {
    pub prediction_channel: i64,
    pub path: PathBuf,
}

impl OutboxConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        require_path("outbox.path", &self.path)
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct StateConfig {
    #[serde(default = "default_state_path")]
    pub path: PathBuf,
    /// Checkpoint after this many processed events.
    #[serde(default = "default_save_every")]
    pub save_every: usize,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            path: default_state_path(),
            save_every: DEFAULT_SAVE_EVERY,
        }
    }
}

impl StateConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        require_path("state.path", &self.path)?;
        if self.save_every == 0 {
            return Err(ValidationError::InvalidField {
                field: "state.save_every".to_string(),
                message: "save_every must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

fn default_state_path() -> PathBuf {
    PathBuf::from(DEFAULT_STATE_PATH)
}

fn default_save_every() -> usize {
    DEFAULT_SAVE_EVERY
}

/// Engine tuning block; every field has a working default.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct EngineSection {
    #[serde(default = "default_sessions")]
    pub sessions: Vec<SessionWindow>,
    #[serde(default = "default_utc_offset_hours")]
    pub utc_offset_hours: i32,
    #[serde(default = "default_refresh_interval_minutes")]
    pub refresh_interval_minutes: i64,
    #[serde(default = "default_cooldown_minutes")]
    pub cooldown_minutes: i64,
    /// `null` keeps quarantined rules until a refill releases them.
    #[serde(default = "default_quarantine_ttl_minutes")]
    pub quarantine_ttl_minutes: Option<i64>,
    #[serde(default)]
    pub match_scope: MatchScope,
    #[serde(default = "default_auto_activate_learned")]
    pub auto_activate_learned: bool,
    #[serde(default = "default_completion_markers")]
    pub completion_markers: Vec<String>,
    #[serde(default = "default_pending_markers")]
    pub pending_markers: Vec<String>,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            sessions: default_sessions(),
            utc_offset_hours: default_utc_offset_hours(),
            refresh_interval_minutes: default_refresh_interval_minutes(),
            cooldown_minutes: default_cooldown_minutes(),
            quarantine_ttl_minutes: default_quarantine_ttl_minutes(),
            match_scope: MatchScope::default(),
            auto_activate_learned: default_auto_activate_learned(),
            completion_markers: default_completion_markers(),
            pending_markers: default_pending_markers(),
        }
    }
}

impl EngineSection {
    fn validate(&mut self) -> Result<(), ValidationError> {
        if self.sessions.is_empty() {
            return Err(ValidationError::InvalidField {
                field: "engine.sessions".to_string(),
                message: "at least one session window must be specified".to_string(),
            });
        }
        for (idx, window) in self.sessions.iter().enumerate() {
            if window.start_hour >= window.end_hour || window.end_hour > 24 {
                return Err(ValidationError::InvalidField {
                    field: format!("engine.sessions[{idx}]"),
                    message: format!(
                        "window {}..{} must satisfy start < end <= 24",
                        window.start_hour, window.end_hour
                    ),
                });
            }
        }

        if !(-23..=23).contains(&self.utc_offset_hours) {
            return Err(ValidationError::InvalidField {
                field: "engine.utc_offset_hours".to_string(),
                message: "offset must be between -23 and 23".to_string(),
            });
        }

        for (label, minutes) in [
            ("engine.refresh_interval_minutes", self.refresh_interval_minutes),
            ("engine.cooldown_minutes", self.cooldown_minutes),
        ] {
            if minutes < 0 {
                return Err(ValidationError::InvalidField {
                    field: label.to_string(),
                    message: "minutes must not be negative".to_string(),
                });
            }
        }

        if self.quarantine_ttl_minutes.is_some_and(|ttl| ttl <= 0) {
            return Err(ValidationError::InvalidField {
                field: "engine.quarantine_ttl_minutes".to_string(),
                message: "ttl must be positive or null".to_string(),
            });
        }

        self.completion_markers.retain(|marker| !marker.trim().is_empty());
        if self.completion_markers.is_empty() {
            return Err(ValidationError::InvalidField {
                field: "engine.completion_markers".to_string(),
                message: "at least one completion marker is required".to_string(),
            });
        }
        self.pending_markers.retain(|marker| !marker.trim().is_empty());

        Ok(())
    }

    pub fn to_engine_config(&self) -> Result<EngineConfig, ValidationError> {
        let sessions =
            SessionWindows::with_offset_hours(self.sessions.clone(), self.utc_offset_hours)
                .ok_or_else(|| ValidationError::InvalidField {
                    field: "engine.utc_offset_hours".to_string(),
                    message: format!("{} is not a valid offset", self.utc_offset_hours),
                })?;
        Ok(EngineConfig {
            sessions,
            refresh_interval: Duration::minutes(self.refresh_interval_minutes),
            cooldown: Duration::minutes(self.cooldown_minutes),
            quarantine_ttl: self.quarantine_ttl_minutes.map(Duration::minutes),
            match_scope: self.match_scope,
            auto_activate_learned: self.auto_activate_learned,
            markers: Markers {
                completion: self.completion_markers.clone(),
                pending: self.pending_markers.clone(),
            },
            static_rules: StaticRules::default(),
        })
    }
}

fn default_sessions() -> Vec<SessionWindow> {
    DEFAULT_WINDOWS.to_vec()
}

fn default_utc_offset_hours() -> i32 {
    DEFAULT_UTC_OFFSET_HOURS
}

fn default_refresh_interval_minutes() -> i64 {
    DEFAULT_REFRESH_MINUTES
}

fn default_cooldown_minutes() -> i64 {
    DEFAULT_COOLDOWN_MINUTES
}

fn default_quarantine_ttl_minutes() -> Option<i64> {
    Some(DEFAULT_QUARANTINE_TTL_MINUTES)
}

fn default_auto_activate_learned() -> bool {
    true
}

fn default_completion_markers() -> Vec<String> {
    Markers::default().completion
}

fn default_pending_markers() -> Vec<String> {
    Markers::default().pending
}

/// Logging configuration defaults to human-readable output on stderr.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LoggingConfig {
    #[serde(default)]
    pub enable_structured: bool,
    #[serde(default = "default_tracing_level")]
    pub tracing_level: String,
    #[serde(default = "default_log_directory")]
    pub directory: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enable_structured: false,
            tracing_level: default_tracing_level(),
            directory: default_log_directory(),
        }
    }
}

impl LoggingConfig {
    fn normalize(&mut self) {
        if self.tracing_level.trim().is_empty() {
            self.tracing_level = default_tracing_level();
        }
        if self.directory.as_os_str().is_empty() {
            self.directory = default_log_directory();
        }
    }

    pub fn level(&self) -> Option<Level> {
        match self.tracing_level.to_ascii_lowercase().as_str() {
            "trace" => Some(Level::TRACE),
            "debug" => Some(Level::DEBUG),
            "info" => Some(Level::INFO),
            "warn" | "warning" => Some(Level::WARN),
            "error" => Some(Level::ERROR),
            _ => None,
        }
    }
}

fn default_tracing_level() -> String {
    "info".to_string()
}

fn default_log_directory() -> PathBuf {
    PathBuf::from(DEFAULT_LOG_DIRECTORY)
}

fn require_path(field: &str, path: &Path) -> Result<(), ValidationError> {
    if path.as_os_str().is_empty() || path.components().count() == 0 {
        return Err(ValidationError::InvalidField {
            field: field.to_string(),
            message: "path must not be empty".to_string(),
        });
    }
    Ok(())
}

/// Errors surfaced when loading configuration files.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
    #[error("failed to parse config {path:?}: {source}")]
    Parse {
        #[source]
        source: serde_yaml::Error,
        path: PathBuf,
    },
    #[error("invalid configuration in {path:?}: {source}")]
    Invalid {
        path: PathBuf,
        source: ValidationError,
    },
}

impl ConfigError {
    pub fn path(&self) -> &Path {
        match self {
            ConfigError::Read { path, .. }
            | ConfigError::Parse { path, .. }
            | ConfigError::Invalid { path, .. } => path.as_path(),
        }
    }
}

/// Validation failures captured with contextual metadata.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{field}: {message}")]
    InvalidField { field: String, message: String },
}
