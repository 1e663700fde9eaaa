//! The request seam between chainvote and a JSON-RPC endpoint.

use async_trait::async_trait;
use serde_json::Value;

use crate::RpcError;

/// Anything that can answer a JSON-RPC request: an HTTP node, a browser
/// wallet bridge, or a scripted fake in tests.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send `method` with positional `params` and return the `result` value.
    async fn request(&self, method: &str, params: Value) -> Result<Value, RpcError>;
}
