//! Well-known JSON-RPC error codes (EIP-1193, EIP-1474, wallet extensions).

/// The user rejected the request.
pub const USER_REJECTED: i64 = 4001;
/// The requested account or method has not been authorised by the user.
pub const UNAUTHORIZED: i64 = 4100;
/// The provider does not support the requested method.
pub const UNSUPPORTED_METHOD: i64 = 4200;
/// The provider is disconnected from all chains.
pub const DISCONNECTED: i64 = 4900;
/// The chain is not known to the wallet; follow up with `wallet_addEthereumChain`.
pub const UNRECOGNIZED_CHAIN: i64 = 4902;
/// A request of the same kind is already pending in the wallet UI.
pub const REQUEST_PENDING: i64 = -32002;
/// Generic server error; nodes use it for most execution failures.
pub const SERVER_ERROR: i64 = -32000;
/// Method not found on the node.
pub const METHOD_NOT_FOUND: i64 = -32601;
/// EIP-1474 transaction rejected.
pub const TRANSACTION_REJECTED: i64 = -32003;
/// Execution reverted (geth and most EVM nodes).
pub const EXECUTION_REVERTED: i64 = 3;
