//! Core library for `workflow_courier`.
//!
//! A client-side layer for browsing, moving, copying and loading workflow documents
//! that live on a remote host reachable over a persistent socket and plain HTTP.
//!
//! - `transport`: the dual-channel dispatcher and its availability cache
//! - `conflict`: decisions, arbiters and the resolution protocol
//! - `coordinator`: one entry point per file operation
//! - `normalizer` / `loader`: document format repair

pub mod cli;
pub mod config;
pub mod conflict;
pub mod coordinator;
pub mod errors;
pub mod loader;
pub mod normalizer;
pub mod notify;
pub mod output;
pub mod platform;
pub mod shutdown;
pub mod transport;

pub use config::{
    Config, ConflictPolicy, LogLevel, OperationTimeouts, default_config_path, default_log_path,
    path_has_symlink_ancestor,
};
pub use conflict::{ConflictDecision, ItemAction, PlannedItem};
pub use coordinator::{
    DirectoryListing, FileOperationCoordinator, HostProbe, OperationOutcome, OutcomeKind, PathInfo,
};
pub use errors::CourierError;
pub use normalizer::{DocumentEncoding, NormalizationFailure, NormalizedDocument};
pub use transport::{ConnectionAvailabilityCache, TransportDispatcher, TransportError};
