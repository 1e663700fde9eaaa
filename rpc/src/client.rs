//! HTTP JSON-RPC client.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::{RpcError, Transport};

/// Default timeout for a single request.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default connection timeout.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// JSON-RPC 2.0 client over HTTP.
///
/// Wraps `reqwest::Client` with the endpoint URL and a request id counter.
pub struct RpcClient {
    http: reqwest::Client,
    url: String,
    next_id: AtomicU64,
}

#[derive(Debug, Deserialize)]
struct ErrorObject {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ResponseEnvelope {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<ErrorObject>,
}

impl RpcClient {
    /// Create a client targeting `url` with default timeouts.
    pub fn new(url: impl Into<String>) -> Result<Self, RpcError> {
        Self::with_timeout(url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(url: impl Into<String>, timeout: Duration) -> Result<Self, RpcError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .build()
            .map_err(|e| RpcError::Transport(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            http,
            url: url.into(),
            next_id: AtomicU64::new(1),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Build the request body for one call.
pub(crate) fn envelope(id: u64, method: &str, params: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": method,
        "params": params,
    })
}

/// Extract `result` from a response body, mapping an `error` object to
/// [`RpcError::Remote`].
pub(crate) fn parse_response(body: Value) -> Result<Value, RpcError> {
    let envelope: ResponseEnvelope = serde_json::from_value(body)
        .map_err(|e| RpcError::InvalidResponse(format!("not a JSON-RPC response: {e}")))?;
    if let Some(err) = envelope.error {
        return Err(RpcError::Remote {
            code: err.code,
            message: err.message,
            data: err.data,
        });
    }
    // A missing result is how nodes say "null" for e.g. pending receipts.
    Ok(envelope.result.unwrap_or(Value::Null))
}

#[async_trait]
impl Transport for RpcClient {
    async fn request(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(id, method, "rpc request");

        let response = self
            .http
            .post(&self.url)
            .json(&envelope(id, method, params))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RpcError::Timeout
                } else {
                    RpcError::Transport(format!("request failed: {e}"))
                }
            })?;

        if !response.status().is_success() {
            return Err(RpcError::Http(response.status().as_u16()));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| RpcError::InvalidResponse(format!("invalid JSON response: {e}")))?;

        parse_response(body)
    }
}
