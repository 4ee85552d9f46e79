//! File operation coordinator.
//!
//! Every mutating operation follows one template:
//! 1. re-validate the source path, recovering it if it went stale
//! 2. resolve destination conflicts unless a decision was supplied
//! 3. dispatch through the transport dispatcher
//! 4. on a transport failure, retry once over the fallback channel only
//! 5. collapse the result into an `OperationOutcome`
//!
//! Host rejections (`success: false`) are final and never retried.

pub mod hostpath;
pub mod outcome;
mod plan;
mod recovery;
pub mod validate;

use async_trait::async_trait;
use serde_json::Value;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::config::OperationTimeouts;
use crate::conflict::naming::sibling_name;
use crate::conflict::{
    Arbiter, ConflictContext, ConflictDecision, ConflictProtocol, ExistenceProbe, ProbeError,
};
use crate::errors::CourierError;
use crate::loader;
use crate::normalizer::NormalizedDocument;
use crate::transport::{Request, TransportDispatcher, TransportError, op};

pub use outcome::{
    BatchSummary, DirectoryListing, ItemResult, ItemStatus, OperationOutcome, OutcomeKind,
    PathEntry, PathInfo,
};
use validate::validate_name;

/// Send, and on a transport failure retry exactly once over the fallback channel.
///
/// The retry carries the same, already-resolved parameters, so a conflict decision
/// taken for the first attempt is never asked for again.
async fn exchange(dispatcher: &TransportDispatcher, request: &Request) -> Result<Value, CourierError> {
    let first = match dispatcher.send(request).await {
        Ok(reply) => return Ok(reply),
        Err(e) => e,
    };
    warn!(op = request.op(), error = %first, "dispatch failed; retrying once over fallback");
    match dispatcher.send_fallback_only(request).await {
        Ok(reply) => Ok(reply),
        Err(second) => {
            let mut attempts = first.attempts().to_vec();
            attempts.extend(second.attempts().iter().cloned());
            Err(CourierError::from_transport(
                request.op(),
                TransportError::Exhausted(attempts),
            ))
        }
    }
}

fn reply_str(reply: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|k| reply.get(*k).and_then(Value::as_str))
        .map(str::to_string)
}

/// Interpret the host's `{success, error}` envelope.
fn check_reply(operation: &str, reply: &Value) -> Result<(), CourierError> {
    let reason = || reply_str(reply, &["error", "message"]).unwrap_or_else(|| "no reason given".into());
    match reply.get("success").and_then(Value::as_bool) {
        Some(true) => Ok(()),
        Some(false) => Err(CourierError::OperationRejected {
            operation: operation.to_string(),
            reason: reason(),
        }),
        None if reply.get("error").is_some_and(|e| !e.is_null()) => {
            Err(CourierError::OperationRejected {
                operation: operation.to_string(),
                reason: reason(),
            })
        }
        None => Ok(()),
    }
}

fn parse_path_info(reply: &Value) -> PathInfo {
    let flag = |k: &str| reply.get(k).and_then(Value::as_bool).unwrap_or(false);
    PathInfo {
        exists: flag("exists"),
        is_directory: flag("is_directory"),
        is_file: flag("is_file"),
    }
}

fn parse_entries(reply: &Value, key: &str, is_directory: bool) -> Vec<PathEntry> {
    let Some(items) = reply.get(key).and_then(Value::as_array) else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| {
            let name = item.get("name")?.as_str()?.to_string();
            Some(PathEntry {
                name,
                is_directory,
                last_modified_label: item
                    .get("date")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                size: item.get("size").and_then(Value::as_u64),
            })
        })
        .collect()
}

fn parse_listing(path: &str, reply: &Value) -> Result<DirectoryListing, CourierError> {
    let is_error = reply.get("type").and_then(Value::as_str) == Some("error")
        || (reply.get("directories").is_none() && reply.get("files").is_none());
    if is_error {
        return Err(CourierError::OperationRejected {
            operation: op::LIST_DIRECTORY.to_string(),
            reason: reply_str(reply, &["error"])
                .unwrap_or_else(|| format!("'{path}' is not a listable directory")),
        });
    }
    Ok(DirectoryListing {
        path: reply_str(reply, &["path"]).unwrap_or_else(|| path.to_string()),
        directories: parse_entries(reply, "directories", true),
        files: parse_entries(reply, "files", false),
    })
}

/// Existence checks against the host, usable by the conflict protocol and policies.
#[derive(Clone)]
pub struct HostProbe {
    dispatcher: Arc<TransportDispatcher>,
    timeout: Duration,
}

impl HostProbe {
    pub fn new(dispatcher: Arc<TransportDispatcher>, timeout: Duration) -> Self {
        Self {
            dispatcher,
            timeout,
        }
    }

    pub async fn path_info(&self, path: &str) -> Result<PathInfo, CourierError> {
        let request = Request::new(op::PATH_EXISTS)
            .param("path", path)
            .with_timeout(self.timeout);
        let reply = exchange(&self.dispatcher, &request).await?;
        check_reply(op::PATH_EXISTS, &reply)?;
        Ok(parse_path_info(&reply))
    }
}

#[async_trait]
impl ExistenceProbe for HostProbe {
    async fn exists(&self, path: &str) -> Result<bool, ProbeError> {
        self.path_info(path)
            .await
            .map(|info| info.exists)
            .map_err(|e| ProbeError(e.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Transfer {
    MoveFile,
    MoveDirectory,
    CopyFile,
    CopyDirectory,
}

impl Transfer {
    fn op(self) -> &'static str {
        match self {
            Transfer::MoveFile => op::MOVE_FILE,
            Transfer::MoveDirectory => op::MOVE_DIRECTORY,
            Transfer::CopyFile => op::COPY_FILE,
            Transfer::CopyDirectory => op::COPY_DIRECTORY,
        }
    }

    fn is_directory(self) -> bool {
        matches!(self, Transfer::MoveDirectory | Transfer::CopyDirectory)
    }

    /// Moves are cheap to retry, so their primary attempt gives up early.
    fn timeout(self, timeouts: &OperationTimeouts) -> Duration {
        match self {
            Transfer::MoveFile | Transfer::MoveDirectory => timeouts.move_op,
            Transfer::CopyFile => timeouts.copy_file,
            Transfer::CopyDirectory => timeouts.copy_directory,
        }
    }

    fn rename_param(self) -> &'static str {
        match self {
            Transfer::MoveFile => "new_filename",
            _ => "new_name",
        }
    }
}

pub struct FileOperationCoordinator {
    dispatcher: Arc<TransportDispatcher>,
    arbiter: Arc<dyn Arbiter>,
    timeouts: OperationTimeouts,
    strict_documents: bool,
    current_directory: Mutex<Option<String>>,
}

impl FileOperationCoordinator {
    pub fn new(
        dispatcher: Arc<TransportDispatcher>,
        arbiter: Arc<dyn Arbiter>,
        timeouts: OperationTimeouts,
    ) -> Self {
        Self {
            dispatcher,
            arbiter,
            timeouts,
            strict_documents: false,
            current_directory: Mutex::new(None),
        }
    }

    pub fn with_current_directory(self, dir: Option<String>) -> Self {
        *self
            .current_directory
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = dir;
        self
    }

    /// Treat unrecognized documents as errors when loading.
    pub fn with_strict_documents(mut self, strict: bool) -> Self {
        self.strict_documents = strict;
        self
    }

    pub fn dispatcher(&self) -> &Arc<TransportDispatcher> {
        &self.dispatcher
    }

    /// Last directory listed successfully; the known-good ancestor for path recovery.
    pub fn current_directory(&self) -> Option<String> {
        self.current_directory
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_current_directory(&self, dir: &str) {
        *self
            .current_directory
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(dir.to_string());
    }

    fn probe(&self) -> HostProbe {
        HostProbe::new(Arc::clone(&self.dispatcher), self.timeouts.default)
    }

    async fn exchange(&self, request: &Request) -> Result<Value, CourierError> {
        exchange(&self.dispatcher, request).await
    }

    fn finish(&self, operation: &str, result: Result<OperationOutcome, CourierError>) -> OperationOutcome {
        match result {
            Ok(outcome) => outcome,
            Err(err) if err.is_user_directed() => {
                info!(code = err.code(), op = operation, "{err}");
                OperationOutcome::from_error(&err)
            }
            Err(err) => {
                error!(code = err.code(), op = operation, error = %err, "operation failed");
                OperationOutcome::from_error(&err)
            }
        }
    }

    async fn simple(
        &self,
        request: Request,
        source: Option<String>,
        target: Option<String>,
    ) -> Result<OperationOutcome, CourierError> {
        let operation = request.op().to_string();
        let reply = self.exchange(&request).await?;
        check_reply(&operation, &reply)?;
        let target = reply_str(&reply, &["target", "target_path", "path"]).or(target);
        info!(op = %operation, source = ?source, target = ?target, "operation completed");
        Ok(OperationOutcome::completed(source, target))
    }

    pub async fn create_directory(&self, parent: &str, name: &str) -> OperationOutcome {
        let result = async {
            validate_name(name)?;
            let request = Request::new(op::CREATE_DIRECTORY)
                .param("parent_path", parent)
                .param("directory_name", name)
                .with_timeout(self.timeouts.default);
            self.simple(request, None, Some(hostpath::join(parent, name)))
                .await
        }
        .await;
        self.finish(op::CREATE_DIRECTORY, result)
    }

    pub async fn delete_directory(&self, path: &str) -> OperationOutcome {
        let result = async {
            let path = self.recover_source(path).await?;
            let request = Request::new(op::DELETE_DIRECTORY)
                .param("directory_path", path.as_str())
                .with_timeout(self.timeouts.default);
            self.simple(request, Some(path), None).await
        }
        .await;
        self.finish(op::DELETE_DIRECTORY, result)
    }

    pub async fn delete_file(&self, path: &str) -> OperationOutcome {
        let result = async {
            let path = self.recover_source(path).await?;
            let request = Request::new(op::DELETE_FILE)
                .param("file_path", path.as_str())
                .with_timeout(self.timeouts.default);
            self.simple(request, Some(path), None).await
        }
        .await;
        self.finish(op::DELETE_FILE, result)
    }

    /// Rename a file or directory in place with the host's atomic rename.
    pub async fn rename(&self, old_path: &str, new_name: &str) -> OperationOutcome {
        let result = async {
            validate_name(new_name)?;
            let path = self.recover_source(old_path).await?;
            let expected = match hostpath::dirname(&path) {
                Some(parent) => hostpath::join(parent, new_name),
                None => new_name.to_string(),
            };
            let request = Request::new(op::RENAME)
                .param("old_path", path.as_str())
                .param("new_name", new_name)
                .with_timeout(self.timeouts.default);
            self.simple(request, Some(path), Some(expected)).await
        }
        .await;
        self.finish(op::RENAME, result)
    }

    pub async fn move_file(
        &self,
        source: &str,
        target: &str,
        decision: Option<ConflictDecision>,
    ) -> OperationOutcome {
        let result = self
            .transfer(Transfer::MoveFile, source, target, None, decision)
            .await;
        self.finish(op::MOVE_FILE, result)
    }

    pub async fn move_directory(
        &self,
        source: &str,
        target: &str,
        new_name: Option<&str>,
        decision: Option<ConflictDecision>,
    ) -> OperationOutcome {
        let result = self
            .transfer(Transfer::MoveDirectory, source, target, new_name, decision)
            .await;
        self.finish(op::MOVE_DIRECTORY, result)
    }

    pub async fn copy_file(
        &self,
        source: &str,
        target: &str,
        new_name: Option<&str>,
        decision: Option<ConflictDecision>,
    ) -> OperationOutcome {
        let result = self
            .transfer(Transfer::CopyFile, source, target, new_name, decision)
            .await;
        self.finish(op::COPY_FILE, result)
    }

    pub async fn copy_directory(
        &self,
        source: &str,
        target: &str,
        new_name: Option<&str>,
        decision: Option<ConflictDecision>,
    ) -> OperationOutcome {
        let result = self
            .transfer(Transfer::CopyDirectory, source, target, new_name, decision)
            .await;
        self.finish(op::COPY_DIRECTORY, result)
    }

    async fn transfer(
        &self,
        kind: Transfer,
        source: &str,
        target: &str,
        new_name: Option<&str>,
        supplied: Option<ConflictDecision>,
    ) -> Result<OperationOutcome, CourierError> {
        let operation = kind.op();
        if let Some(name) = new_name {
            validate_name(name)?;
        }
        let source = self.recover_source(source).await?;
        let item_name = new_name
            .map(str::to_string)
            .unwrap_or_else(|| hostpath::basename(&source).to_string());

        let context = ConflictContext::new(item_name.clone(), target, kind.is_directory());
        let probe = self.probe();
        let mut protocol = ConflictProtocol::new(&probe, self.arbiter.as_ref());
        let decision = protocol.resolve(&context, supplied).await;

        let mut request = Request::new(operation)
            .param("source_path", source.as_str())
            .param("target_path", target)
            .with_timeout(kind.timeout(&self.timeouts));

        let final_name = match &decision {
            ConflictDecision::Cancel => {
                return Err(CourierError::UserCancelled {
                    operation: operation.to_string(),
                });
            }
            ConflictDecision::Skip => {
                return Err(CourierError::UserSkipped {
                    operation: operation.to_string(),
                });
            }
            ConflictDecision::DetailedPlan { items } => {
                if kind != Transfer::CopyDirectory {
                    return Err(CourierError::UnsupportedDecision {
                        operation: operation.to_string(),
                        decision: decision.label().to_string(),
                    });
                }
                let outcome = self.apply_plan(&source, target, items).await;
                protocol.mark_applied();
                return Ok(outcome.with_decision(decision.clone()));
            }
            ConflictDecision::Proceed => new_name.map(str::to_string),
            ConflictDecision::Overwrite => {
                request = request.param("overwrite", true);
                new_name.map(str::to_string)
            }
            ConflictDecision::Rename { new_name: base } => {
                let derived = if kind.is_directory() {
                    base.trim().to_string()
                } else {
                    sibling_name(&item_name, base)
                };
                validate_name(&derived)?;
                Some(derived)
            }
        };

        if let Some(name) = &final_name {
            request = request.param(kind.rename_param(), name.as_str());
            if kind == Transfer::MoveDirectory {
                request = request.param("operation_type", "rename");
            }
        }

        debug!(op = operation, source = %source, target, decision = decision.label(), "dispatching transfer");
        let reply = self.exchange(&request).await?;
        check_reply(operation, &reply)?;
        protocol.mark_applied();

        let expected = hostpath::join(target, final_name.as_deref().unwrap_or(&item_name));
        let landed = reply_str(&reply, &["target", "target_path"]).unwrap_or(expected);
        info!(op = operation, source = %source, target = %landed, decision = decision.label(), "transfer completed");
        Ok(OperationOutcome::completed(Some(source), Some(landed)).with_decision(decision))
    }

    async fn path_info_checked(&self, path: &str) -> Result<PathInfo, CourierError> {
        self.probe().path_info(path).await
    }

    /// Exists/type probe. Any failure reads as "does not exist".
    pub async fn get_path_info(&self, path: &str) -> PathInfo {
        match self.path_info_checked(path).await {
            Ok(info) => info,
            Err(e) => {
                warn!(path, error = %e, "path probe failed");
                PathInfo::default()
            }
        }
    }

    pub async fn path_exists(&self, path: &str) -> bool {
        self.get_path_info(path).await.exists
    }

    async fn fetch_listing(&self, path: &str) -> Result<DirectoryListing, CourierError> {
        let request = Request::new(op::LIST_DIRECTORY)
            .param("path", path)
            .with_timeout(self.timeouts.default);
        let reply = self.exchange(&request).await?;
        parse_listing(path, &reply)
    }

    /// List one directory and remember it as the current directory.
    pub async fn list_directory(&self, path: &str) -> Result<DirectoryListing, CourierError> {
        let listing = self.fetch_listing(path).await.inspect_err(|e| {
            error!(code = e.code(), path, error = %e, "listing failed");
        })?;
        self.set_current_directory(path);
        debug!(
            path,
            directories = listing.directories.len(),
            files = listing.files.len(),
            "listing received"
        );
        Ok(listing)
    }

    /// Load a document and normalize it into the canonical keyed encoding.
    pub async fn load_document(&self, path: &str) -> Result<NormalizedDocument, CourierError> {
        let request = Request::new(op::LOAD_WORKFLOW)
            .param("path", path)
            .with_timeout(self.timeouts.load);
        let reply = self.exchange(&request).await?;
        let raw = loader::decode_load_reply(path, reply)?;
        let doc = loader::finish(raw, self.strict_documents)?;
        info!(path, encoding = ?doc.source_encoding, repairs = doc.repairs.len(), "document loaded");
        Ok(doc)
    }

    /// Write a document back to the host, replacing what is there.
    pub async fn save_document(&self, path: &str, document: &Value) -> OperationOutcome {
        let result = async {
            let body = serde_json::to_string_pretty(document)
                .map_err(|e| CourierError::FormatMalformed(e.to_string()))?;
            let request = Request::new(op::SAVE_WORKFLOW)
                .param("file_path", path)
                .param("workflow_data", body)
                .with_timeout(self.timeouts.default);
            self.simple(request, None, Some(path.to_string())).await
        }
        .await;
        self.finish(op::SAVE_WORKFLOW, result)
    }
}
