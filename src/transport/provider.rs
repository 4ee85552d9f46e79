//! Locates the persistent channel once, at construction time.
//! Candidates are tried in order; the first that connects wins.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::channel::PersistentChannel;
use super::websocket::WebSocketChannel;

/// Derive `ws(s)://host[:port]/ws` from an `http(s)://` base address.
pub fn derive_ws_url(http_base: &str) -> Option<String> {
    let base = http_base.trim_end_matches('/');
    if let Some(rest) = base.strip_prefix("https://") {
        Some(format!("wss://{rest}/ws"))
    } else {
        base.strip_prefix("http://")
            .map(|rest| format!("ws://{rest}/ws"))
    }
}

#[derive(Debug, Clone)]
pub struct TransportProvider {
    candidates: Vec<String>,
    connect_timeout: Duration,
}

impl TransportProvider {
    pub fn new(candidates: Vec<String>, connect_timeout: Duration) -> Self {
        Self {
            candidates,
            connect_timeout,
        }
    }

    /// Explicit socket URL first (if any), then the one derived from the HTTP base.
    pub fn for_host(http_base: &str, ws_url: Option<&str>, connect_timeout: Duration) -> Self {
        let mut candidates = Vec::new();
        if let Some(url) = ws_url {
            candidates.push(url.to_string());
        }
        if let Some(derived) = derive_ws_url(http_base)
            && !candidates.contains(&derived)
        {
            candidates.push(derived);
        }
        Self::new(candidates, connect_timeout)
    }

    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    /// Connect to the first reachable candidate. `None` means run fallback-only.
    pub async fn resolve_primary(&self) -> Option<Arc<dyn PersistentChannel>> {
        for url in &self.candidates {
            match WebSocketChannel::connect(url, self.connect_timeout).await {
                Ok(channel) => {
                    debug!(url = %url, "persistent channel resolved");
                    return Some(Arc::new(channel));
                }
                Err(e) => {
                    warn!(url = %url, error = %e, "persistent channel candidate failed");
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_socket_url_from_http_base() {
        assert_eq!(
            derive_ws_url("http://127.0.0.1:8188").as_deref(),
            Some("ws://127.0.0.1:8188/ws")
        );
        assert_eq!(
            derive_ws_url("https://example.org/").as_deref(),
            Some("wss://example.org/ws")
        );
        assert_eq!(derive_ws_url("ftp://example.org"), None);
    }

    #[test]
    fn explicit_url_is_tried_before_derived_one() {
        let p = TransportProvider::for_host(
            "http://h:1",
            Some("ws://other:2/socket"),
            Duration::from_secs(1),
        );
        assert_eq!(p.candidates(), ["ws://other:2/socket", "ws://h:1/ws"]);

        let p = TransportProvider::for_host("http://h:1", Some("ws://h:1/ws"), Duration::from_secs(1));
        assert_eq!(p.candidates(), ["ws://h:1/ws"]);
    }
}
