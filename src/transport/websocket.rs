//! Persistent channel over a WebSocket (tokio-tungstenite).
//!
//! Implementation notes:
//! - A writer task drains an unbounded queue so `send_text` never blocks.
//! - A reader task hands every text frame to the currently installed handler.
//! - Ready state is an atomic so the dispatcher can check it without awaiting.

use futures::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use super::channel::{MessageHandler, PersistentChannel, ReadyState};
use super::error::TransportError;

const CONNECTING: u8 = 0;
const OPEN: u8 = 1;
const CLOSING: u8 = 2;
const CLOSED: u8 = 3;

fn decode_state(raw: u8) -> ReadyState {
    match raw {
        CONNECTING => ReadyState::Connecting,
        OPEN => ReadyState::Open,
        CLOSING => ReadyState::Closing,
        _ => ReadyState::Closed,
    }
}

type HandlerSlot = Arc<Mutex<Option<MessageHandler>>>;

pub struct WebSocketChannel {
    url: String,
    state: Arc<AtomicU8>,
    outgoing: mpsc::UnboundedSender<Message>,
    handler: HandlerSlot,
    tasks: Vec<JoinHandle<()>>,
}

impl WebSocketChannel {
    /// Open the socket and start the reader/writer tasks.
    pub async fn connect(url: &str, timeout: Duration) -> Result<Self, TransportError> {
        let connected = tokio::time::timeout(timeout, connect_async(url))
            .await
            .map_err(|_| TransportError::Unreachable {
                endpoint: url.to_string(),
                message: format!("handshake did not finish within {timeout:?}"),
            })?
            .map_err(|e| TransportError::Unreachable {
                endpoint: url.to_string(),
                message: e.to_string(),
            })?;
        let (socket, _response) = connected;
        info!(url, "persistent channel connected");

        let state = Arc::new(AtomicU8::new(OPEN));
        let handler: HandlerSlot = Arc::new(Mutex::new(None));
        let (outgoing, mut queue) = mpsc::unbounded_channel::<Message>();
        let (mut sink, mut stream) = socket.split();

        let writer_state = Arc::clone(&state);
        let writer = tokio::spawn(async move {
            while let Some(msg) = queue.recv().await {
                let closing = matches!(msg, Message::Close(_));
                if let Err(e) = sink.send(msg).await {
                    warn!(error = %e, "persistent channel write failed");
                    writer_state.store(CLOSED, Ordering::SeqCst);
                    break;
                }
                if closing {
                    break;
                }
            }
        });

        let reader_state = Arc::clone(&state);
        let reader_handler = Arc::clone(&handler);
        let reader_url = url.to_string();
        let reader = tokio::spawn(async move {
            while let Some(frame) = stream.next().await {
                match frame {
                    Ok(Message::Text(text)) => {
                        let current = reader_handler
                            .lock()
                            .unwrap_or_else(PoisonError::into_inner)
                            .clone();
                        if let Some(h) = current {
                            h(text.as_str());
                        }
                    }
                    Ok(Message::Close(_)) => {
                        debug!(url = %reader_url, "persistent channel closing");
                        reader_state.store(CLOSING, Ordering::SeqCst);
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!(url = %reader_url, error = %e, "persistent channel read failed");
                        break;
                    }
                }
            }
            reader_state.store(CLOSED, Ordering::SeqCst);
        });

        Ok(Self {
            url: url.to_string(),
            state,
            outgoing,
            handler,
            tasks: vec![writer, reader],
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Start a graceful close. The state moves to `Closing` immediately.
    pub fn close(&self) {
        if self
            .state
            .compare_exchange(OPEN, CLOSING, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            let _ = self.outgoing.send(Message::Close(None));
        }
    }
}

impl PersistentChannel for WebSocketChannel {
    fn ready_state(&self) -> ReadyState {
        decode_state(self.state.load(Ordering::SeqCst))
    }

    fn send_text(&self, text: String) -> Result<(), TransportError> {
        let state = self.ready_state();
        if state != ReadyState::Open {
            return Err(TransportError::Unusable(format!("socket {state}")));
        }
        self.outgoing
            .send(Message::Text(text.into()))
            .map_err(|_| TransportError::Unusable("socket writer stopped".into()))
    }

    fn message_handler(&self) -> Option<MessageHandler> {
        self.handler
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn replace_message_handler(&self, handler: Option<MessageHandler>) -> Option<MessageHandler> {
        let mut slot = self.handler.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *slot, handler)
    }
}

impl Drop for WebSocketChannel {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}
