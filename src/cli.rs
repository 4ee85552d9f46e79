//! CLI definition and parsing.
//! Defines Args and provides parse() for command-line handling.
//!
//! Notes:
//! - Global flags override config values (which are loaded from XML if present).
//! - --debug is a shorthand for --log-level debug.
//! - Host paths are passed through as strings; only surrounding shell quotes are trimmed.

use clap::{Parser, Subcommand, ValueHint};
use std::path::PathBuf;

use crate::config::types::{Config, ConflictPolicy, LogLevel};
use crate::conflict::ConflictDecision;

/// Browse, move, copy and load workflow files on a remote host.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Resilient workflow file operations against a remote host")]
pub struct Args {
    /// Override the host base URL (normally configured via XML).
    #[arg(long, global = true, value_name = "URL")]
    pub http_base: Option<String>,

    /// Override the socket URL (default: derived from the base URL).
    #[arg(long, global = true, value_name = "URL")]
    pub ws_url: Option<String>,

    /// Use HTTP only; never open the socket.
    #[arg(long, global = true)]
    pub no_ws: bool,

    /// What to do when the destination already has the item.
    #[arg(long, global = true, value_name = "POLICY", help = "ask, skip, overwrite, cancel or rename-suffix")]
    pub on_conflict: Option<ConflictPolicy>,

    /// Enable debug logging (equivalent to `--log-level debug`).
    #[arg(short = 'd', long, global = true, help = "Enable debug logging (shorthand for --log-level debug)")]
    pub debug: bool,

    /// Set log level. One of: quiet, normal, info, debug.
    #[arg(long, global = true, help = "Set log level: quiet, normal, info, debug")]
    pub log_level: Option<String>,

    /// Print results and logs as JSON.
    #[arg(long, global = true, help = "Emit results and logs as JSON")]
    pub json: bool,

    /// Print where the config file is looked up (or WORKFLOW_COURIER_CONFIG if set), then exit.
    #[arg(long, help = "Print the config file location and exit")]
    pub print_config: bool,

    /// Known-good host directory used to recover stale paths.
    #[arg(long, global = true, value_name = "DIR")]
    pub cwd: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Pre-supplied answer for a destination conflict.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct DecisionArgs {
    /// Replace what is at the destination.
    #[arg(long, conflicts_with_all = ["skip", "rename"])]
    pub overwrite: bool,

    /// Leave the destination alone and do nothing.
    #[arg(long, conflicts_with = "rename")]
    pub skip: bool,

    /// Use this name at the destination instead (extension kept for files).
    #[arg(long, value_name = "NAME")]
    pub rename: Option<String>,
}

impl DecisionArgs {
    pub fn decision(&self) -> Option<ConflictDecision> {
        if self.overwrite {
            Some(ConflictDecision::Overwrite)
        } else if self.skip {
            Some(ConflictDecision::Skip)
        } else {
            self.rename.as_deref().map(ConflictDecision::rename)
        }
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// List a host directory.
    Ls { path: String },
    /// Create a directory under PARENT.
    Mkdir { parent: String, name: String },
    /// Delete a directory and its contents.
    Rmdir { path: String },
    /// Delete a file.
    Rm { path: String },
    /// Rename a file or directory in place.
    Rename { path: String, new_name: String },
    /// Move a file into TARGET directory.
    Mv {
        source: String,
        target: String,
        #[command(flatten)]
        decision: DecisionArgs,
    },
    /// Move a directory into TARGET directory.
    MvDir {
        source: String,
        target: String,
        #[arg(long, value_name = "NAME")]
        new_name: Option<String>,
        #[command(flatten)]
        decision: DecisionArgs,
    },
    /// Copy a file into TARGET directory.
    Cp {
        source: String,
        target: String,
        #[arg(long, value_name = "NAME")]
        new_name: Option<String>,
        #[command(flatten)]
        decision: DecisionArgs,
    },
    /// Copy a directory into TARGET directory.
    CpDir {
        source: String,
        target: String,
        #[arg(long, value_name = "NAME")]
        new_name: Option<String>,
        #[command(flatten)]
        decision: DecisionArgs,
        /// JSON array of {name, action[, new_name]} applied per child.
        #[arg(long, value_name = "FILE", value_hint = ValueHint::FilePath, conflicts_with_all = ["overwrite", "skip", "rename"])]
        plan: Option<PathBuf>,
    },
    /// Exit 0 if the path exists, 1 otherwise.
    Exists { path: String },
    /// Show whether a path exists and its type.
    Info { path: String },
    /// Load a document and print it in the canonical keyed encoding.
    Load {
        path: String,
        /// Fail on documents that are not recognized.
        #[arg(long)]
        strict: bool,
        /// Write the document here instead of stdout.
        #[arg(long, short = 'o', value_name = "FILE", value_hint = ValueHint::FilePath)]
        output: Option<PathBuf>,
    },
    /// Upload a local JSON document to PATH on the host.
    Save {
        path: String,
        #[arg(value_name = "FILE", value_hint = ValueHint::FilePath)]
        file: PathBuf,
    },
    /// Probe both channels.
    Status,
}

/// Trim whitespace and one pair of surrounding quotes left behind by Windows shells.
pub fn clean_path(s: &str) -> String {
    let trimmed = s.trim();
    let quoted = trimmed.len() >= 2
        && ((trimmed.starts_with('"') && trimmed.ends_with('"'))
            || (trimmed.starts_with('\'') && trimmed.ends_with('\'')));
    if quoted {
        trimmed[1..trimmed.len() - 1].to_string()
    } else {
        trimmed.to_string()
    }
}

impl Args {
    /// Effective log level derived from flags.
    /// Precedence: --debug > --log-level value > None (use config default).
    pub fn effective_log_level(&self) -> Option<LogLevel> {
        if self.debug {
            return Some(LogLevel::Debug);
        }
        self.log_level.as_deref().and_then(LogLevel::parse)
    }

    /// Apply CLI overrides to a loaded Config (in-place). No-ops for unset flags.
    pub fn apply_overrides(&self, cfg: &mut Config) {
        if let Some(base) = &self.http_base {
            cfg.http_base = base.trim().to_string();
        }
        if let Some(ws) = &self.ws_url {
            cfg.ws_url = Some(ws.trim().to_string());
        }
        if self.no_ws {
            cfg.use_websocket = false;
        }
        if let Some(policy) = self.on_conflict {
            cfg.on_conflict = policy;
        }
        if let Some(level) = self.effective_log_level() {
            cfg.log_level = level;
        }
        if let Some(dir) = &self.cwd {
            cfg.current_directory = Some(clean_path(dir));
        }
        if let Some(Command::Load { strict: true, .. }) = &self.command {
            cfg.strict_documents = true;
        }
    }
}

pub fn parse() -> Args {
    Args::parse()
}
