//! Conflict resolution state machine: Unchecked -> Checking -> Resolved -> Applied.

use tracing::{debug, warn};

use super::decision::ConflictDecision;
use super::policy::{Arbiter, ConflictContext, ExistenceProbe};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolState {
    Unchecked,
    Checking,
    Resolved(ConflictDecision),
    Applied(ConflictDecision),
}

pub struct ConflictProtocol<'a> {
    probe: &'a dyn ExistenceProbe,
    arbiter: &'a dyn Arbiter,
    state: ProtocolState,
}

impl<'a> ConflictProtocol<'a> {
    pub fn new(probe: &'a dyn ExistenceProbe, arbiter: &'a dyn Arbiter) -> Self {
        Self {
            probe,
            arbiter,
            state: ProtocolState::Unchecked,
        }
    }

    pub fn state(&self) -> &ProtocolState {
        &self.state
    }

    /// Decide what to do for `context`.
    ///
    /// A caller-supplied decision is taken as-is and no probe is made. Otherwise the
    /// destination is probed: no collision short-circuits to `Applied(Proceed)`, a
    /// collision is handed to the arbiter. A failed probe counts as "no collision";
    /// the host still refuses operations it cannot perform.
    pub async fn resolve(
        &mut self,
        context: &ConflictContext,
        supplied: Option<ConflictDecision>,
    ) -> ConflictDecision {
        if let Some(decision) = supplied {
            debug!(item = %context.item_name, decision = decision.label(), "decision supplied by caller");
            self.state = ProtocolState::Resolved(decision.clone());
            return decision;
        }

        self.state = ProtocolState::Checking;
        let colliding = context.colliding_path();
        let exists = match self.probe.exists(&colliding).await {
            Ok(exists) => exists,
            Err(e) => {
                warn!(path = %colliding, error = %e, "destination probe failed; assuming no conflict");
                false
            }
        };

        if !exists {
            self.state = ProtocolState::Applied(ConflictDecision::Proceed);
            return ConflictDecision::Proceed;
        }

        let decision = self.arbiter.resolve(context).await;
        debug!(item = %context.item_name, decision = decision.label(), "conflict resolved by arbiter");
        self.state = ProtocolState::Resolved(decision.clone());
        decision
    }

    /// Record that the resolved decision has been carried out.
    pub fn mark_applied(&mut self) {
        if let ProtocolState::Resolved(decision) = &self.state {
            self.state = ProtocolState::Applied(decision.clone());
        }
    }
}
