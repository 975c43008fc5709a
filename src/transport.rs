//! Transport client for the pod request/response protocol
//!
//! One call, one response, one hard timeout. Retries belong to callers;
//! this layer only classifies failures. It holds no shared mutable state
//! beyond a request-id counter, so it is safe under arbitrary concurrency.
//!
//! ## Protocol
//!
//! Requests are POSTed as JSON:
//! `{"protocol_version": "2.0", "method": "...", "params": [...], "id": N}`.
//! Success responses carry `result`; failures carry
//! `error: {code, message}`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::types::PeerAddress;

/// Protocol version carried in every request envelope
const PROTOCOL_VERSION: &str = "2.0";

/// Classified transport failure.
///
/// `Timeout` and `Unreachable` are distinct on purpose: a silent pod and a
/// refused connection score the same but diagnose differently.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    #[error("call timed out after {0} ms")]
    Timeout(u64),

    #[error("pod unreachable: {0}")]
    Unreachable(String),

    #[error("pod returned error {code}: {message}")]
    Protocol { code: i64, message: String },
}

/// Request envelope
#[derive(Debug, Serialize)]
struct RpcRequest {
    protocol_version: &'static str,
    method: String,
    params: serde_json::Value,
    id: u64,
}

/// Response envelope
#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<serde_json::Value>,
    error: Option<RpcError>,
}

/// Error payload inside a well-formed response
#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

/// Single request/response call against one pod address.
///
/// The trait seam lets tests stand in a scripted peer graph for the real
/// network.
#[async_trait]
pub trait RpcTransport: Send + Sync {
    /// Issue `method(params)` against `address`, enforcing `timeout`.
    async fn call(
        &self,
        address: &PeerAddress,
        method: &str,
        params: serde_json::Value,
        timeout: Duration,
    ) -> Result<serde_json::Value, TransportError>;
}

/// HTTP transport for the pod protocol.
pub struct HttpTransport {
    client: reqwest::Client,
    request_id: AtomicU64,
}

impl HttpTransport {
    /// Build a transport.
    ///
    /// Connection pooling is disabled: each call stands alone, so a wedged
    /// keep-alive socket cannot poison later probes of the same address.
    pub fn new() -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .pool_max_idle_per_host(0)
            .build()
            .map_err(|e| TransportError::Unreachable(format!("client build failed: {}", e)))?;

        Ok(Self {
            client,
            request_id: AtomicU64::new(1),
        })
    }

    fn next_id(&self) -> u64 {
        self.request_id.fetch_add(1, Ordering::SeqCst)
    }

    fn classify(timeout: Duration, err: reqwest::Error) -> TransportError {
        if err.is_timeout() {
            TransportError::Timeout(timeout.as_millis() as u64)
        } else {
            TransportError::Unreachable(err.to_string())
        }
    }
}

#[async_trait]
impl RpcTransport for HttpTransport {
    async fn call(
        &self,
        address: &PeerAddress,
        method: &str,
        params: serde_json::Value,
        timeout: Duration,
    ) -> Result<serde_json::Value, TransportError> {
        let url = format!("http://{}/rpc", address);

        let request = RpcRequest {
            protocol_version: PROTOCOL_VERSION,
            method: method.to_string(),
            params,
            id: self.next_id(),
        };

        // tokio::time::timeout is the outer bound; reqwest's own timeout
        // covers the body read as well.
        let send = self
            .client
            .post(&url)
            .timeout(timeout)
            .json(&request)
            .send();

        let response = match tokio::time::timeout(timeout, send).await {
            Ok(Ok(resp)) => resp,
            Ok(Err(e)) => return Err(Self::classify(timeout, e)),
            Err(_) => return Err(TransportError::Timeout(timeout.as_millis() as u64)),
        };

        if !response.status().is_success() {
            return Err(TransportError::Unreachable(format!(
                "HTTP status {}",
                response.status()
            )));
        }

        let envelope: RpcResponse = response
            .json()
            .await
            .map_err(|e| TransportError::Unreachable(format!("malformed response: {}", e)))?;

        if let Some(error) = envelope.error {
            return Err(TransportError::Protocol {
                code: error.code,
                message: error.message,
            });
        }

        envelope
            .result
            .ok_or_else(|| TransportError::Unreachable("empty result".to_string()))
    }
}
