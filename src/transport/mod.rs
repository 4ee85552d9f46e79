//! Wire transport to the host.
//! A persistent socket is preferred; a stateless HTTP channel is the fallback.
//! The dispatcher walks an ordered list of strategies and returns the first success.

pub mod cache;
pub mod channel;
pub mod dispatcher;
mod error;
pub mod http;
pub mod provider;
pub mod request;
pub mod websocket;
pub mod wire;

pub use cache::{ConnectionAvailabilityCache, ConnectionState, DEFAULT_AVAILABILITY_TTL};
pub use channel::{MessageHandler, PersistentChannel, ReadyState, StatelessChannel};
pub use dispatcher::{
    ChannelKind, ConnectionStatus, PersistentStrategy, StatelessStrategy, StrategyStatus,
    TransportDispatcher, TransportStrategy,
};
pub use error::{Attempt, TransportError};
pub use http::HttpChannel;
pub use provider::TransportProvider;
pub use request::{ParamValue, Request, op};
pub use websocket::WebSocketChannel;
