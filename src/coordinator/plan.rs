//! Per-item plans for a directory copy that collided.
//!
//! Each planned child of the source directory is copied into
//! `<target>/<source dir name>/` on its own. Items run one after another, and a
//! shutdown request stops the batch between items.

use tracing::{info, warn};

use super::outcome::{BatchSummary, ItemResult, ItemStatus, OperationOutcome, OutcomeKind};
use super::validate::validate_name;
use super::{FileOperationCoordinator, check_reply, hostpath};
use crate::conflict::naming::sibling_name;
use crate::conflict::{ItemAction, PlannedItem};
use crate::errors::CourierError;
use crate::shutdown;
use crate::transport::{Request, op};

/// How many item errors are quoted in the batch's top-level error.
const QUOTED_ERRORS: usize = 3;

fn item(name: &str, action: &ItemAction, status: ItemStatus) -> ItemResult {
    ItemResult {
        name: name.to_string(),
        action: action.label().to_string(),
        new_name: None,
        status,
        error: None,
    }
}

impl FileOperationCoordinator {
    pub(super) async fn apply_plan(
        &self,
        source_dir: &str,
        target_dir: &str,
        items: &[PlannedItem],
    ) -> OperationOutcome {
        let dest_dir = hostpath::join(target_dir, hostpath::basename(source_dir));
        let mut summary = BatchSummary {
            total: items.len(),
            ..Default::default()
        };
        let mut results = Vec::with_capacity(items.len());

        for planned in items {
            let result = if shutdown::is_requested() {
                ItemResult {
                    error: Some("interrupted".into()),
                    ..item(&planned.name, &planned.action, ItemStatus::Skipped)
                }
            } else {
                self.apply_item(source_dir, &dest_dir, planned).await
            };
            match result.status {
                ItemStatus::Success | ItemStatus::Partial => summary.success += 1,
                ItemStatus::Skipped => summary.skipped += 1,
                ItemStatus::Error => summary.errors += 1,
            }
            results.push(result);
        }

        let partial = results.iter().any(|r| r.status == ItemStatus::Partial);
        let message = format!(
            "{} of {} item(s) copied, {} skipped, {} failed",
            summary.success, summary.total, summary.skipped, summary.errors
        );
        info!(source = source_dir, target = %dest_dir, %message, "plan applied");

        let mut outcome = if summary.errors == 0 {
            OperationOutcome::completed(Some(source_dir.to_string()), Some(dest_dir))
        } else {
            let quoted: Vec<String> = results
                .iter()
                .filter_map(|r| r.error.as_ref().map(|e| format!("{}: {e}", r.name)))
                .take(QUOTED_ERRORS)
                .collect();
            OperationOutcome {
                success: false,
                error: Some(quoted.join("; ")),
                kind: Some(OutcomeKind::Rejected),
                source: Some(source_dir.to_string()),
                target: Some(dest_dir),
                ..Default::default()
            }
        };
        if summary.errors == 0 && partial {
            outcome.kind = Some(OutcomeKind::PartialSuccess);
        }
        outcome.items = results;
        outcome.summary = Some(summary);
        outcome.with_message(message)
    }

    async fn apply_item(&self, source_dir: &str, dest_dir: &str, planned: &PlannedItem) -> ItemResult {
        let failed = |e: CourierError| ItemResult {
            error: Some(e.to_string()),
            ..item(&planned.name, &planned.action, ItemStatus::Error)
        };
        if let Err(e) = validate_name(&planned.name) {
            return failed(e);
        }
        let child = hostpath::join(source_dir, &planned.name);

        match &planned.action {
            ItemAction::Skip => item(&planned.name, &planned.action, ItemStatus::Skipped),
            ItemAction::Overwrite => match self.copy_child(&child, dest_dir, &planned.name, true).await {
                Ok(()) => item(&planned.name, &planned.action, ItemStatus::Success),
                Err(e) => failed(e),
            },
            ItemAction::Rename { new_name } => {
                let full = sibling_name(&planned.name, new_name);
                let renamed = |status: ItemStatus, error: Option<String>| ItemResult {
                    new_name: Some(full.clone()),
                    error,
                    ..item(&planned.name, &planned.action, status)
                };
                if let Err(e) = validate_name(&full) {
                    return renamed(ItemStatus::Error, Some(e.to_string()));
                }
                if let Err(e) = self.copy_child(&child, dest_dir, &full, false).await {
                    return renamed(ItemStatus::Error, Some(e.to_string()));
                }
                // The copy stays even if the original cannot be removed.
                match self.delete_child(&child).await {
                    Ok(()) => renamed(ItemStatus::Success, None),
                    Err(e) => {
                        warn!(item = %planned.name, error = %e, "copied under new name but original was not removed");
                        renamed(
                            ItemStatus::Partial,
                            Some(format!("copied, but the original could not be removed: {e}")),
                        )
                    }
                }
            }
        }
    }

    async fn copy_child(
        &self,
        child: &str,
        dest_dir: &str,
        name: &str,
        overwrite: bool,
    ) -> Result<(), CourierError> {
        let mut request = Request::new(op::COPY_FILE)
            .param("source_path", child)
            .param("target_path", dest_dir)
            .param("new_name", name)
            .with_timeout(self.timeouts.copy_file);
        if overwrite {
            request = request.param("overwrite", true);
        }
        let reply = self.exchange(&request).await?;
        check_reply(op::COPY_FILE, &reply)
    }

    async fn delete_child(&self, child: &str) -> Result<(), CourierError> {
        let request = Request::new(op::DELETE_FILE)
            .param("file_path", child)
            .with_timeout(self.timeouts.default);
        let reply = self.exchange(&request).await?;
        check_reply(op::DELETE_FILE, &reply)
    }
}
