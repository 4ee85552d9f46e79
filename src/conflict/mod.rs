//! Conflict resolution for destination-mutating operations.
//! Decisions are plain data; arbiters (policies or a prompt) produce them.

pub mod decision;
pub mod naming;
pub mod policy;
pub mod prompt;
pub mod protocol;

pub use decision::{ConflictDecision, ItemAction, PlannedItem};
pub use policy::{Arbiter, ConflictContext, ExistenceProbe, FixedPolicy, ProbeError, SuffixRenamePolicy};
pub use prompt::PromptArbiter;
pub use protocol::{ConflictProtocol, ProtocolState};
