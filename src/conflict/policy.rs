//! Arbiters: whoever decides what to do about a conflict.
//! Batch policies live here; the interactive prompt is in `prompt`.

use async_trait::async_trait;
use std::fmt;
use tracing::{debug, warn};

use super::decision::ConflictDecision;
use super::naming::{MAX_SUFFIX_TRIES, final_name, numbered_name};
use crate::coordinator::hostpath;

/// What the arbiter is shown: the colliding name, where, and whether it is a directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictContext {
    pub item_name: String,
    pub destination: String,
    pub is_directory: bool,
}

impl ConflictContext {
    pub fn new(item_name: impl Into<String>, destination: impl Into<String>, is_directory: bool) -> Self {
        Self {
            item_name: item_name.into(),
            destination: destination.into(),
            is_directory,
        }
    }

    /// Full host path of the colliding item.
    pub fn colliding_path(&self) -> String {
        hostpath::join(&self.destination, &self.item_name)
    }
}

#[async_trait]
pub trait Arbiter: Send + Sync {
    async fn resolve(&self, context: &ConflictContext) -> ConflictDecision;
}

#[derive(Debug)]
pub struct ProbeError(pub String);

impl fmt::Display for ProbeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Asks the host whether a path exists.
#[async_trait]
pub trait ExistenceProbe: Send + Sync {
    async fn exists(&self, path: &str) -> Result<bool, ProbeError>;
}

/// Always answers with the same decision.
#[derive(Debug, Clone)]
pub struct FixedPolicy {
    decision: ConflictDecision,
}

impl FixedPolicy {
    pub fn new(decision: ConflictDecision) -> Self {
        Self { decision }
    }
}

#[async_trait]
impl Arbiter for FixedPolicy {
    async fn resolve(&self, _context: &ConflictContext) -> ConflictDecision {
        self.decision.clone()
    }
}

/// Picks the first free "name (n).ext" at the destination.
pub struct SuffixRenamePolicy<P> {
    probe: P,
}

impl<P: ExistenceProbe> SuffixRenamePolicy<P> {
    pub fn new(probe: P) -> Self {
        Self { probe }
    }
}

#[async_trait]
impl<P: ExistenceProbe> Arbiter for SuffixRenamePolicy<P> {
    async fn resolve(&self, context: &ConflictContext) -> ConflictDecision {
        for n in 2..=MAX_SUFFIX_TRIES {
            let candidate = numbered_name(&context.item_name, n);
            match self
                .probe
                .exists(&hostpath::join(&context.destination, &candidate))
                .await
            {
                Ok(false) => return ConflictDecision::Rename { new_name: candidate },
                Ok(true) => {}
                Err(e) => {
                    // Never pick a name whose availability is unknown.
                    warn!(name = %context.item_name, error = %e, "existence probe failed; cancelling");
                    return ConflictDecision::Cancel;
                }
            }
        }
        debug!(name = %context.item_name, dir = %context.destination, "numbered names exhausted");
        ConflictDecision::Rename {
            new_name: final_name(&context.item_name),
        }
    }
}

#[async_trait]
impl<T: ExistenceProbe + ?Sized> ExistenceProbe for std::sync::Arc<T> {
    async fn exists(&self, path: &str) -> Result<bool, ProbeError> {
        (**self).exists(path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    struct Taken(HashSet<String>);

    #[async_trait]
    impl ExistenceProbe for Taken {
        async fn exists(&self, path: &str) -> Result<bool, ProbeError> {
            Ok(self.0.contains(path))
        }
    }

    struct Broken;

    #[async_trait]
    impl ExistenceProbe for Broken {
        async fn exists(&self, _path: &str) -> Result<bool, ProbeError> {
            Err(ProbeError("host down".into()))
        }
    }

    #[tokio::test]
    async fn suffix_policy_skips_taken_numbers() {
        let taken = Taken(
            ["/w/a (2).json", "/w/a (3).json"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        );
        let policy = SuffixRenamePolicy::new(taken);
        let d = policy
            .resolve(&ConflictContext::new("a.json", "/w", false))
            .await;
        assert_eq!(d, ConflictDecision::rename("a (4).json"));
    }

    #[tokio::test]
    async fn suffix_policy_cancels_when_probe_fails() {
        let policy = SuffixRenamePolicy::new(Broken);
        let d = policy
            .resolve(&ConflictContext::new("a.json", "/w", false))
            .await;
        assert_eq!(d, ConflictDecision::Cancel);
    }

    #[tokio::test]
    async fn fixed_policy_repeats_its_decision() {
        let policy = FixedPolicy::new(ConflictDecision::Skip);
        let ctx = ConflictContext::new("a.json", "/w", false);
        assert_eq!(policy.resolve(&ctx).await, ConflictDecision::Skip);
        assert_eq!(policy.resolve(&ctx).await, ConflictDecision::Skip);
    }
}
