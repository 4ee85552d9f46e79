//! Stateless fallback channel over HTTP (reqwest).
//!
//! Routes:
//! - `GET  /local_files?action=...&path=...` for document loads and listings
//! - `POST /file_operations` with a JSON body for document saves
//! - `GET  /file_operations?action=...&<params>` for everything else
//! - `GET  /system_stats` as a side-effect-free reachability probe

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::trace;

use super::channel::StatelessChannel;
use super::error::TransportError;
use super::request::{Request, op};

#[derive(Debug, Clone)]
pub struct HttpChannel {
    client: Client,
    base: String,
}

impl HttpChannel {
    pub fn new(base: &str) -> Result<Self, TransportError> {
        let client = Client::builder()
            .build()
            .map_err(|e| TransportError::Unreachable {
                endpoint: base.to_string(),
                message: format!("cannot build HTTP client: {e}"),
            })?;
        Ok(Self {
            client,
            base: base.trim_end_matches('/').to_string(),
        })
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    fn url(&self, route: &str) -> String {
        format!("{}/{}", self.base, route)
    }

    fn map_send_error(endpoint: &str, timeout: Duration, op: &str, e: reqwest::Error) -> TransportError {
        if e.is_timeout() {
            TransportError::Timeout {
                op: op.to_string(),
                timeout,
            }
        } else {
            TransportError::Unreachable {
                endpoint: endpoint.to_string(),
                message: e.to_string(),
            }
        }
    }

    async fn read_json(endpoint: &str, response: reqwest::Response) -> Result<Value, TransportError> {
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
            });
        }
        response
            .json::<Value>()
            .await
            .map_err(|e| TransportError::Decode(e.to_string()))
    }
}

#[async_trait]
impl StatelessChannel for HttpChannel {
    async fn request(&self, request: &Request, timeout: Duration) -> Result<Value, TransportError> {
        let action = request.op();
        match action {
            op::LOAD_WORKFLOW | op::LIST_DIRECTORY => {
                let endpoint = self.url("local_files");
                let path = request.get_str("path").unwrap_or_default();
                trace!(%endpoint, action, path, "fallback GET");
                let sent = self
                    .client
                    .get(&endpoint)
                    .query(&[("action", action), ("path", path)])
                    .timeout(timeout)
                    .send()
                    .await
                    .map_err(|e| Self::map_send_error(&endpoint, timeout, action, e))?;
                Self::read_json(&endpoint, sent).await
            }
            op::SAVE_WORKFLOW => {
                let endpoint = self.url("file_operations");
                let mut body = Map::new();
                body.insert("action".into(), Value::String(action.into()));
                for (k, v) in request.params() {
                    body.insert(k.clone(), v.to_json());
                }
                trace!(%endpoint, action, "fallback POST");
                let sent = self
                    .client
                    .post(&endpoint)
                    .json(&Value::Object(body))
                    .timeout(timeout)
                    .send()
                    .await
                    .map_err(|e| Self::map_send_error(&endpoint, timeout, action, e))?;
                Self::read_json(&endpoint, sent).await
            }
            _ => {
                let endpoint = self.url("file_operations");
                let mut query = vec![("action".to_string(), action.to_string())];
                query.extend(request.query_pairs());
                trace!(%endpoint, action, "fallback GET");
                let sent = self
                    .client
                    .get(&endpoint)
                    .query(&query)
                    .timeout(timeout)
                    .send()
                    .await
                    .map_err(|e| Self::map_send_error(&endpoint, timeout, action, e))?;
                Self::read_json(&endpoint, sent).await
            }
        }
    }

    async fn probe(&self, timeout: Duration) -> Result<(), TransportError> {
        let endpoint = self.url("system_stats");
        let response = self
            .client
            .get(&endpoint)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| Self::map_send_error(&endpoint, timeout, "system_stats", e))?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(TransportError::Status {
                endpoint,
                status: response.status().as_u16(),
            })
        }
    }

    fn endpoint(&self) -> String {
        self.base.clone()
    }
}
