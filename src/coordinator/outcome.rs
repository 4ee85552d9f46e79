//! Caller-facing result shapes.
//! Every coordinator failure collapses into `OperationOutcome` at the public boundary.

use serde::Serialize;

use crate::conflict::ConflictDecision;
use crate::errors::CourierError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Completed,
    PartialSuccess,
    UserCancelled,
    UserSkipped,
    Rejected,
    Unreachable,
    PathStale,
    InvalidName,
    UnsupportedDecision,
    FormatError,
}

impl OutcomeKind {
    pub fn of(err: &CourierError) -> Self {
        match err {
            CourierError::TransportUnavailable { .. } => OutcomeKind::Unreachable,
            CourierError::OperationRejected { .. } => OutcomeKind::Rejected,
            CourierError::UserCancelled { .. } => OutcomeKind::UserCancelled,
            CourierError::UserSkipped { .. } => OutcomeKind::UserSkipped,
            CourierError::FormatUnrecognized(_) | CourierError::FormatMalformed(_) => {
                OutcomeKind::FormatError
            }
            CourierError::PathStale { .. } => OutcomeKind::PathStale,
            CourierError::InvalidName { .. } => OutcomeKind::InvalidName,
            CourierError::UnsupportedDecision { .. } => OutcomeKind::UnsupportedDecision,
        }
    }

    /// Process exit status, matching `CourierError::exit_code` for error kinds.
    /// A partial plan still applied what it could, so it exits 0.
    pub fn exit_code(self) -> u8 {
        match self {
            OutcomeKind::Completed | OutcomeKind::PartialSuccess => 0,
            OutcomeKind::UserCancelled | OutcomeKind::UserSkipped => 2,
            OutcomeKind::Rejected
            | OutcomeKind::PathStale
            | OutcomeKind::InvalidName
            | OutcomeKind::UnsupportedDecision => 3,
            OutcomeKind::Unreachable => 4,
            OutcomeKind::FormatError => 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Success,
    Skipped,
    /// Copied, but the original could not be removed afterwards.
    Partial,
    Error,
}

/// Per-child result inside a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemResult {
    pub name: String,
    pub action: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_name: Option<String>,
    pub status: ItemStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub success: usize,
    pub skipped: usize,
    pub errors: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OperationOutcome {
    pub success: bool,
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<OutcomeKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision: Option<ConflictDecision>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<ItemResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<BatchSummary>,
}

impl OperationOutcome {
    pub fn completed(source: Option<String>, target: Option<String>) -> Self {
        Self {
            success: true,
            kind: Some(OutcomeKind::Completed),
            source,
            target,
            ..Default::default()
        }
    }

    pub fn from_error(err: &CourierError) -> Self {
        Self {
            success: false,
            error: Some(err.to_string()),
            kind: Some(OutcomeKind::of(err)),
            ..Default::default()
        }
    }

    pub fn with_decision(mut self, decision: ConflictDecision) -> Self {
        self.decision = Some(decision);
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Stopped by the operator rather than by a fault.
    pub fn is_user_directed(&self) -> bool {
        matches!(
            self.kind,
            Some(OutcomeKind::UserCancelled) | Some(OutcomeKind::UserSkipped)
        )
    }

    pub fn has_partial_items(&self) -> bool {
        self.kind == Some(OutcomeKind::PartialSuccess)
            || self.items.iter().any(|i| i.status == ItemStatus::Partial)
    }
}

/// One row of a directory listing. Lives only as long as the listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathEntry {
    pub name: String,
    pub is_directory: bool,
    pub last_modified_label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DirectoryListing {
    pub path: String,
    pub directories: Vec<PathEntry>,
    pub files: Vec<PathEntry>,
}

impl DirectoryListing {
    pub fn find(&self, name: &str) -> Option<&PathEntry> {
        self.directories
            .iter()
            .chain(self.files.iter())
            .find(|e| e.name == name)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PathInfo {
    pub exists: bool,
    pub is_directory: bool,
    pub is_file: bool,
}
