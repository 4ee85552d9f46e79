use std::fmt;
use std::time::Duration;
use thiserror::Error;

use super::dispatcher::ChannelKind;

/// One failed strategy attempt, kept so the combined error can explain itself.
#[derive(Debug, Clone)]
pub struct Attempt {
    pub strategy: &'static str,
    pub kind: ChannelKind,
    pub error: TransportError,
}

impl fmt::Display for Attempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.strategy, self.error)
    }
}

#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// Socket handle missing, not open, closing or closed.
    #[error("persistent channel unusable ({0})")]
    Unusable(String),

    /// Skipped because the channel was seen down within the availability TTL.
    #[error("persistent channel recently unavailable; not retried yet")]
    Suppressed,

    #[error("no reply to '{op}' within {timeout:?}")]
    Timeout { op: String, timeout: Duration },

    #[error("cannot connect to {endpoint}: {message}")]
    Unreachable { endpoint: String, message: String },

    #[error("{endpoint} answered with HTTP {status}")]
    Status { endpoint: String, status: u16 },

    #[error("unreadable reply from host: {0}")]
    Decode(String),

    #[error("{}", summarize(.0))]
    Exhausted(Vec<Attempt>),
}

fn summarize(attempts: &[Attempt]) -> String {
    if attempts.is_empty() {
        return "no transport configured".to_string();
    }
    attempts
        .iter()
        .map(|a| a.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl TransportError {
    /// True when the failure says nothing about the operation itself, only that the
    /// host could not be talked to. For `Exhausted` every attempt must qualify.
    pub fn is_unreachable(&self) -> bool {
        match self {
            TransportError::Unusable(_)
            | TransportError::Suppressed
            | TransportError::Timeout { .. }
            | TransportError::Unreachable { .. } => true,
            TransportError::Status { .. } | TransportError::Decode(_) => false,
            TransportError::Exhausted(attempts) => attempts.iter().all(|a| a.error.is_unreachable()),
        }
    }

    /// Attempts recorded for an `Exhausted` error, empty otherwise.
    pub fn attempts(&self) -> &[Attempt] {
        match self {
            TransportError::Exhausted(attempts) => attempts,
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attempt(error: TransportError) -> Attempt {
        Attempt {
            strategy: "test",
            kind: ChannelKind::Fallback,
            error,
        }
    }

    #[test]
    fn exhausted_is_unreachable_only_when_every_attempt_is() {
        let all_down = TransportError::Exhausted(vec![
            attempt(TransportError::Suppressed),
            attempt(TransportError::Unreachable {
                endpoint: "http://h".into(),
                message: "refused".into(),
            }),
        ]);
        assert!(all_down.is_unreachable());

        let host_answered = TransportError::Exhausted(vec![
            attempt(TransportError::Suppressed),
            attempt(TransportError::Status {
                endpoint: "http://h/file_operations".into(),
                status: 500,
            }),
        ]);
        assert!(!host_answered.is_unreachable());
    }

    #[test]
    fn exhausted_message_lists_attempts() {
        let err = TransportError::Exhausted(vec![attempt(TransportError::Decode("eof".into()))]);
        assert_eq!(err.to_string(), "test: unreadable reply from host: eof");
        assert_eq!(
            TransportError::Exhausted(vec![]).to_string(),
            "no transport configured"
        );
    }
}
