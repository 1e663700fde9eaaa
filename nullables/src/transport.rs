//! Nullable JSON-RPC transport: scripted answers, recorded requests.

use async_trait::async_trait;
use chainvote_rpc::{codes, RpcError, Transport};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};

type Answer = Result<Value, RpcError>;

/// A transport that answers from a script instead of a node.
///
/// One-shot answers queued with [`respond_once`](Self::respond_once) or
/// [`fail_once`](Self::fail_once) are used first, in order; then the
/// standing answer set with [`respond`](Self::respond). Methods with no
/// answer fail with `METHOD_NOT_FOUND`.
pub struct NullTransport {
    queued: Mutex<HashMap<String, VecDeque<Answer>>>,
    standing: Mutex<HashMap<String, Answer>>,
    requests: Mutex<Vec<(String, Value)>>,
}

impl NullTransport {
    pub fn new() -> Self {
        Self {
            queued: Mutex::new(HashMap::new()),
            standing: Mutex::new(HashMap::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Answer every future `method` call with `value`.
    pub fn respond(&self, method: &str, value: Value) {
        self.standing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(method.to_string(), Ok(value));
    }

    /// Answer the next `method` call with `value`.
    pub fn respond_once(&self, method: &str, value: Value) {
        self.enqueue(method, Ok(value));
    }

    /// Fail the next `method` call with `error`.
    pub fn fail_once(&self, method: &str, error: RpcError) {
        self.enqueue(method, Err(error));
    }

    fn enqueue(&self, method: &str, answer: Answer) {
        self.queued
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(method.to_string())
            .or_default()
            .push_back(answer);
    }

    /// Every request received, in order (for assertions).
    pub fn requests(&self) -> Vec<(String, Value)> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Params of every `method` request, in order.
    pub fn requests_for(&self, method: &str) -> Vec<Value> {
        self.requests()
            .into_iter()
            .filter(|(m, _)| m == method)
            .map(|(_, params)| params)
            .collect()
    }

    pub fn request_count(&self, method: &str) -> usize {
        self.requests_for(method).len()
    }

    /// Clear all state.
    pub fn reset(&self) {
        self.queued.lock().unwrap_or_else(PoisonError::into_inner).clear();
        self.standing.lock().unwrap_or_else(PoisonError::into_inner).clear();
        self.requests.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

impl Default for NullTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for NullTransport {
    async fn request(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((method.to_string(), params));

        let queued = self
            .queued
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(method)
            .and_then(VecDeque::pop_front);
        if let Some(answer) = queued {
            return answer;
        }
        self.standing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(method)
            .cloned()
            .unwrap_or_else(|| {
                Err(RpcError::remote(
                    codes::METHOD_NOT_FOUND,
                    format!("the method {method} does not exist/is not available"),
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn one_shot_answers_come_before_standing() {
        let transport = NullTransport::new();
        transport.respond("eth_chainId", json!("0x106a"));
        transport.respond_once("eth_chainId", json!("0x1"));
        assert_eq!(transport.request("eth_chainId", json!([])).await.unwrap(), json!("0x1"));
        assert_eq!(transport.request("eth_chainId", json!([])).await.unwrap(), json!("0x106a"));
        assert_eq!(transport.request_count("eth_chainId"), 2);
    }

    #[tokio::test]
    async fn unscripted_methods_are_not_found() {
        let transport = NullTransport::new();
        let err = transport.request("eth_foo", json!([1])).await.unwrap_err();
        assert_eq!(err.code(), Some(codes::METHOD_NOT_FOUND));
        assert_eq!(transport.requests(), vec![("eth_foo".to_string(), json!([1]))]);
    }
}
