//! Transport dispatcher.
//!
//! Behavior:
//! - Strategies are evaluated in order by one loop; the first success is returned.
//! - Primary strategies are skipped while the availability cache says the socket is down.
//! - Only primary attempts are recorded in the cache; the fallback says nothing about the socket.
//! - Socket requests queue for one turn at a time and check the cache again once they get it.
//! - Each attempt has its own timeout. There is no budget spanning attempts.
//!
//! The primary strategy swaps the socket's message handler for the duration of one request.
//! A guard puts the previous handler back on every exit path.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, warn};
use uuid::Uuid;

use super::cache::ConnectionAvailabilityCache;
use super::channel::{MessageHandler, PersistentChannel, ReadyState, StatelessChannel};
use super::error::{Attempt, TransportError};
use super::request::Request;
use super::wire;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    Primary,
    Fallback,
}

#[async_trait]
pub trait TransportStrategy: Send + Sync {
    fn name(&self) -> &'static str;
    fn kind(&self) -> ChannelKind;
    async fn attempt(&self, request: &Request, timeout: Duration) -> Result<Value, TransportError>;
    async fn probe(&self, timeout: Duration) -> Result<(), TransportError>;
}

/// Restores the previously installed handler when dropped.
struct HandlerGuard<'a> {
    channel: &'a dyn PersistentChannel,
    previous: Option<MessageHandler>,
}

impl<'a> HandlerGuard<'a> {
    fn install(
        channel: &'a dyn PersistentChannel,
        filter: MessageHandler,
        previous: Option<MessageHandler>,
    ) -> Self {
        channel.replace_message_handler(Some(filter));
        Self { channel, previous }
    }
}

impl Drop for HandlerGuard<'_> {
    fn drop(&mut self) {
        self.channel.replace_message_handler(self.previous.take());
    }
}

/// Handler that resolves on our reply and forwards everything else to `previous`.
fn response_filter(
    action: String,
    request_id: String,
    reply: oneshot::Sender<Value>,
    previous: Option<MessageHandler>,
) -> MessageHandler {
    let reply = Mutex::new(Some(reply));
    Arc::new(move |text: &str| match wire::match_response(text, &action, &request_id) {
        Some(payload) => {
            let sender = reply.lock().unwrap_or_else(PoisonError::into_inner).take();
            if let Some(tx) = sender {
                let _ = tx.send(payload);
            }
        }
        None => {
            if let Some(prev) = &previous {
                prev(text);
            }
        }
    })
}

pub struct PersistentStrategy {
    channel: Arc<dyn PersistentChannel>,
    availability: Arc<ConnectionAvailabilityCache>,
    // one handler substitution at a time per socket
    turn: tokio::sync::Mutex<()>,
}

impl PersistentStrategy {
    pub fn new(
        channel: Arc<dyn PersistentChannel>,
        availability: Arc<ConnectionAvailabilityCache>,
    ) -> Self {
        Self {
            channel,
            availability,
            turn: tokio::sync::Mutex::new(()),
        }
    }

    fn ensure_open(&self) -> Result<(), TransportError> {
        match self.channel.ready_state() {
            ReadyState::Open => Ok(()),
            other => Err(TransportError::Unusable(format!("socket {other}"))),
        }
    }
}

#[async_trait]
impl TransportStrategy for PersistentStrategy {
    fn name(&self) -> &'static str {
        "websocket"
    }

    fn kind(&self) -> ChannelKind {
        ChannelKind::Primary
    }

    async fn attempt(&self, request: &Request, timeout: Duration) -> Result<Value, TransportError> {
        self.ensure_open()?;
        let _turn = self.turn.lock().await;
        // the request ahead of us may have marked the socket down
        if !self.availability.should_attempt_primary() {
            return Err(TransportError::Suppressed);
        }
        self.ensure_open()?;

        let request_id = Uuid::new_v4().to_string();
        let text = wire::encode_request(request, &request_id)?;
        let (tx, rx) = oneshot::channel();
        let previous = self.channel.message_handler();
        let filter = response_filter(request.op().to_string(), request_id, tx, previous.clone());
        let _guard = HandlerGuard::install(self.channel.as_ref(), filter, previous);

        self.channel.send_text(text)?;
        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(payload)) => Ok(payload),
            Ok(Err(_)) => Err(TransportError::Unusable("reply slot dropped".into())),
            Err(_) => Err(TransportError::Timeout {
                op: request.op().to_string(),
                timeout,
            }),
        }
    }

    async fn probe(&self, _timeout: Duration) -> Result<(), TransportError> {
        self.ensure_open()
    }
}

pub struct StatelessStrategy {
    channel: Arc<dyn StatelessChannel>,
}

impl StatelessStrategy {
    pub fn new(channel: Arc<dyn StatelessChannel>) -> Self {
        Self { channel }
    }
}

#[async_trait]
impl TransportStrategy for StatelessStrategy {
    fn name(&self) -> &'static str {
        "http"
    }

    fn kind(&self) -> ChannelKind {
        ChannelKind::Fallback
    }

    async fn attempt(&self, request: &Request, timeout: Duration) -> Result<Value, TransportError> {
        self.channel.request(request, timeout).await
    }

    async fn probe(&self, timeout: Duration) -> Result<(), TransportError> {
        self.channel.probe(timeout).await
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct StrategyStatus {
    pub name: &'static str,
    pub primary: bool,
    pub reachable: bool,
    pub detail: Option<String>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ConnectionStatus {
    pub strategies: Vec<StrategyStatus>,
}

impl ConnectionStatus {
    pub fn any_reachable(&self) -> bool {
        self.strategies.iter().any(|s| s.reachable)
    }

    pub fn primary_open(&self) -> bool {
        self.strategies.iter().any(|s| s.primary && s.reachable)
    }

    pub fn fallback_reachable(&self) -> bool {
        self.strategies.iter().any(|s| !s.primary && s.reachable)
    }
}

pub struct TransportDispatcher {
    strategies: Vec<Box<dyn TransportStrategy>>,
    availability: Arc<ConnectionAvailabilityCache>,
    primary_timeout: Duration,
    fallback_timeout: Duration,
}

impl TransportDispatcher {
    pub fn new(availability: Arc<ConnectionAvailabilityCache>) -> Self {
        Self {
            strategies: Vec::new(),
            availability,
            primary_timeout: Duration::from_secs(5),
            fallback_timeout: Duration::from_secs(30),
        }
    }

    /// Standard pair: optional socket first, HTTP second.
    pub fn with_channels(
        availability: Arc<ConnectionAvailabilityCache>,
        primary: Option<Arc<dyn PersistentChannel>>,
        fallback: Arc<dyn StatelessChannel>,
    ) -> Self {
        let mut dispatcher = Self::new(availability);
        if let Some(channel) = primary {
            let strategy = PersistentStrategy::new(channel, Arc::clone(&dispatcher.availability));
            dispatcher = dispatcher.with_strategy(Box::new(strategy));
        }
        dispatcher.with_strategy(Box::new(StatelessStrategy::new(fallback)))
    }

    pub fn with_strategy(mut self, strategy: Box<dyn TransportStrategy>) -> Self {
        self.strategies.push(strategy);
        self
    }

    /// Primary timeout used when a request does not carry its own.
    pub fn with_primary_timeout(mut self, timeout: Duration) -> Self {
        self.primary_timeout = timeout;
        self
    }

    pub fn with_fallback_timeout(mut self, timeout: Duration) -> Self {
        self.fallback_timeout = timeout;
        self
    }

    pub fn availability(&self) -> &ConnectionAvailabilityCache {
        &self.availability
    }

    /// Send over the first strategy that succeeds.
    pub async fn send(&self, request: &Request) -> Result<Value, TransportError> {
        self.run(request, |_| true).await
    }

    /// Send over fallback strategies only, leaving the socket alone.
    pub async fn send_fallback_only(&self, request: &Request) -> Result<Value, TransportError> {
        self.run(request, |kind| kind == ChannelKind::Fallback).await
    }

    async fn run(
        &self,
        request: &Request,
        eligible: impl Fn(ChannelKind) -> bool,
    ) -> Result<Value, TransportError> {
        let mut attempts = Vec::new();
        for strategy in self.strategies.iter().filter(|s| eligible(s.kind())) {
            let kind = strategy.kind();
            let timeout = match kind {
                ChannelKind::Primary => {
                    if !self.availability.should_attempt_primary() {
                        debug!(op = request.op(), strategy = strategy.name(), "skipping suppressed channel");
                        attempts.push(Attempt {
                            strategy: strategy.name(),
                            kind,
                            error: TransportError::Suppressed,
                        });
                        continue;
                    }
                    request.timeout().unwrap_or(self.primary_timeout)
                }
                ChannelKind::Fallback => self.fallback_timeout,
            };

            debug!(op = request.op(), strategy = strategy.name(), ?timeout, "attempt");
            let result = strategy.attempt(request, timeout).await;
            let suppressed = matches!(result, Err(TransportError::Suppressed));
            if kind == ChannelKind::Primary && !suppressed {
                self.availability.record_result(result.is_ok());
            }
            match result {
                Ok(payload) => return Ok(payload),
                Err(error) => {
                    warn!(op = request.op(), strategy = strategy.name(), error = %error, "attempt failed");
                    attempts.push(Attempt {
                        strategy: strategy.name(),
                        kind,
                        error,
                    });
                }
            }
        }
        Err(TransportError::Exhausted(attempts))
    }

    /// Probe every strategy without touching any file on the host.
    pub async fn connection_status(&self) -> ConnectionStatus {
        let mut strategies = Vec::with_capacity(self.strategies.len());
        for strategy in &self.strategies {
            let kind = strategy.kind();
            let timeout = match kind {
                ChannelKind::Primary => self.primary_timeout,
                ChannelKind::Fallback => self.fallback_timeout,
            };
            let result = strategy.probe(timeout).await;
            if kind == ChannelKind::Primary {
                self.availability.record_result(result.is_ok());
            }
            strategies.push(StrategyStatus {
                name: strategy.name(),
                primary: kind == ChannelKind::Primary,
                reachable: result.is_ok(),
                detail: result.err().map(|e| e.to_string()),
            });
        }
        ConnectionStatus { strategies }
    }
}
