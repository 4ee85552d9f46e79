//! Core configuration types.
//! - Config holds runtime settings with sensible defaults.
//! - LogLevel represents verbosity with simple parsing helpers.
//! - ConflictPolicy names the arbiter used when a destination collides.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use super::HTTP_BASE_DEFAULT;
use super::paths;
use crate::transport::DEFAULT_AVAILABILITY_TTL;

/// Program-defined verbosity levels exposed to users/config.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LogLevel {
    /// Only errors
    Quiet,
    /// Warnings and errors (default)
    #[default]
    Normal,
    /// Completed operations
    Info,
    /// Every transport attempt
    Debug,
}

impl LogLevel {
    /// Parse common string names into our LogLevel (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "quiet" | "error" | "none" => Some(LogLevel::Quiet),
            "normal" | "warn" => Some(LogLevel::Normal),
            "info" | "verbose" | "detailed" => Some(LogLevel::Info),
            "debug" | "trace" => Some(LogLevel::Debug),
            _ => None,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogLevel::Quiet => "quiet",
            LogLevel::Normal => "normal",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
        };
        f.write_str(s)
    }
}

impl FromStr for LogLevel {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("invalid log level: '{s}'"))
    }
}

/// What to do when a copy or move would collide with an existing item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConflictPolicy {
    /// Prompt on the terminal.
    #[default]
    Ask,
    Skip,
    Overwrite,
    Cancel,
    /// Pick the first free `name (n).ext`.
    RenameSuffix,
}

impl ConflictPolicy {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ask" | "prompt" => Some(ConflictPolicy::Ask),
            "skip" => Some(ConflictPolicy::Skip),
            "overwrite" | "replace" => Some(ConflictPolicy::Overwrite),
            "cancel" | "abort" => Some(ConflictPolicy::Cancel),
            "rename-suffix" | "rename_suffix" | "suffix" => Some(ConflictPolicy::RenameSuffix),
            _ => None,
        }
    }
}

impl fmt::Display for ConflictPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConflictPolicy::Ask => "ask",
            ConflictPolicy::Skip => "skip",
            ConflictPolicy::Overwrite => "overwrite",
            ConflictPolicy::Cancel => "cancel",
            ConflictPolicy::RenameSuffix => "rename-suffix",
        };
        f.write_str(s)
    }
}

impl FromStr for ConflictPolicy {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("invalid conflict policy: '{s}'"))
    }
}

/// Primary-channel timeouts per operation family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationTimeouts {
    pub default: Duration,
    /// Short, so a stuck socket hands over to the fallback quickly.
    pub move_op: Duration,
    pub copy_file: Duration,
    pub copy_directory: Duration,
    pub load: Duration,
}

impl Default for OperationTimeouts {
    fn default() -> Self {
        Self {
            default: Duration::from_secs(5),
            move_op: Duration::from_millis(1500),
            copy_file: Duration::from_secs(8),
            copy_directory: Duration::from_secs(5),
            load: Duration::from_secs(10),
        }
    }
}

/// Runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the host's HTTP endpoints
    pub http_base: String,
    /// Explicit socket URL; derived from `http_base` when unset
    pub ws_url: Option<String>,
    /// Try the persistent socket before HTTP
    pub use_websocket: bool,
    /// Console verbosity
    pub log_level: LogLevel,
    /// Optional path to a log file
    pub log_file: Option<PathBuf>,
    /// How long a failed socket stays suppressed
    pub availability_ttl: Duration,
    pub timeouts: OperationTimeouts,
    /// Timeout for each fallback HTTP request
    pub fallback_timeout: Duration,
    pub on_conflict: ConflictPolicy,
    /// Known-good directory used to recover stale paths
    pub current_directory: Option<String>,
    /// Reject documents the normalizer does not recognize
    pub strict_documents: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_base: HTTP_BASE_DEFAULT.to_string(),
            ws_url: None,
            use_websocket: true,
            log_level: LogLevel::Normal,
            log_file: paths::default_log_path().ok(),
            availability_ttl: DEFAULT_AVAILABILITY_TTL,
            timeouts: OperationTimeouts::default(),
            fallback_timeout: Duration::from_secs(30),
            on_conflict: ConflictPolicy::Ask,
            current_directory: None,
            strict_documents: false,
        }
    }
}

impl Config {
    /// Construct a Config for `http_base`; other fields use defaults.
    pub fn new(http_base: impl Into<String>) -> Self {
        Self {
            http_base: http_base.into(),
            ..Default::default()
        }
    }
}
