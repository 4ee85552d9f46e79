//! Channel handles the dispatcher talks through.

use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::error::TransportError;
use super::request::Request;

/// Hook invoked with every incoming text frame on a persistent channel.
pub type MessageHandler = Arc<dyn Fn(&str) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyState {
    Connecting,
    Open,
    Closing,
    Closed,
}

impl fmt::Display for ReadyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ReadyState::Connecting => "connecting",
            ReadyState::Open => "open",
            ReadyState::Closing => "closing",
            ReadyState::Closed => "closed",
        };
        f.write_str(s)
    }
}

/// Bidirectional, long-lived connection with an overridable incoming-message hook.
pub trait PersistentChannel: Send + Sync {
    fn ready_state(&self) -> ReadyState;

    /// Queue a text frame. Must not block on the network.
    fn send_text(&self, text: String) -> Result<(), TransportError>;

    fn message_handler(&self) -> Option<MessageHandler>;

    /// Install `handler` and return whatever was installed before.
    fn replace_message_handler(&self, handler: Option<MessageHandler>) -> Option<MessageHandler>;
}

/// Stateless request/response channel addressed by operation name and flat parameters.
#[async_trait]
pub trait StatelessChannel: Send + Sync {
    async fn request(&self, request: &Request, timeout: Duration) -> Result<Value, TransportError>;

    /// Cheap reachability check that does not touch any file.
    async fn probe(&self, timeout: Duration) -> Result<(), TransportError>;

    /// Human-readable address used in messages.
    fn endpoint(&self) -> String;
}
