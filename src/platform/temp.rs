//! Unique hidden sibling names for atomic writes.
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

pub(crate) const TMP_PREFIX: &str = ".workflow_courier.tmp.";

static COUNTER: AtomicU64 = AtomicU64::new(0);

/// Pattern: `.workflow_courier.tmp.<pid>.<nanos>.<seq>` next to `target`.
pub(crate) fn tmp_sibling_name(target: &Path) -> PathBuf {
    let pid = std::process::id();
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let seq = COUNTER.fetch_add(1, Ordering::Relaxed);
    target
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join(format!("{TMP_PREFIX}{pid}.{nanos}.{seq}"))
}
