use solana_client::client_error::ClientError;
use thiserror::Error;

/// Errors raised by a single ledger endpoint
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LedgerError {
    /// Transport-level errors (network, connection)
    #[error("Transport error: {message} (endpoint: {endpoint})")]
    Transport { endpoint: String, message: String },

    /// Per-call timeout elapsed
    #[error("Timeout after {timeout_ms}ms (endpoint: {endpoint})")]
    Timeout { endpoint: String, timeout_ms: u64 },

    /// RPC response errors (from the RPC server)
    #[error("RPC response error: {message} (endpoint: {endpoint}, code: {code:?})")]
    RpcResponse {
        endpoint: String,
        message: String,
        code: Option<i64>,
    },

    #[error("Rate limit exceeded (endpoint: {endpoint})")]
    RateLimitExceeded { endpoint: String },

    /// Response arrived but could not be interpreted
    #[error("Decode error: {message} (endpoint: {endpoint})")]
    Decode { endpoint: String, message: String },

    /// Fatal errors that should not be retried
    #[error("Fatal error: {0}")]
    Fatal(String),
}

impl LedgerError {
    /// Check if this error is retryable against another endpoint
    pub fn is_retryable(&self) -> bool {
        match self {
            LedgerError::Transport { .. } => true,
            LedgerError::Timeout { .. } => true,
            LedgerError::RateLimitExceeded { .. } => true,
            // A malformed response from one node says nothing about the next
            LedgerError::Decode { .. } => true,

            LedgerError::RpcResponse { code, .. } => match code {
                Some(c) => (500..600).contains(c) || is_node_unhealthy(*c),
                None => false,
            },

            LedgerError::Fatal(_) => false,
        }
    }

    /// Get the endpoint associated with this error, if any
    pub fn endpoint(&self) -> Option<&str> {
        match self {
            LedgerError::Transport { endpoint, .. } => Some(endpoint),
            LedgerError::Timeout { endpoint, .. } => Some(endpoint),
            LedgerError::RpcResponse { endpoint, .. } => Some(endpoint),
            LedgerError::RateLimitExceeded { endpoint } => Some(endpoint),
            LedgerError::Decode { endpoint, .. } => Some(endpoint),
            LedgerError::Fatal(_) => None,
        }
    }

    pub fn category(&self) -> &'static str {
        match self {
            LedgerError::Transport { .. } => "transport",
            LedgerError::Timeout { .. } => "timeout",
            LedgerError::RpcResponse { .. } => "rpc",
            LedgerError::RateLimitExceeded { .. } => "rate_limit",
            LedgerError::Decode { .. } => "decode",
            LedgerError::Fatal(_) => "fatal",
        }
    }

    /// Create from ClientError with context
    pub fn from_client_error(err: ClientError, endpoint: &str) -> Self {
        Self::classify(&err.to_string(), endpoint)
    }

    /// Classify an error message into a ledger error
    pub fn classify(message: &str, endpoint: &str) -> Self {
        let lower = message.to_lowercase();
        let endpoint = endpoint.to_string();

        if lower.contains("rate limit") || lower.contains("too many requests") || lower.contains("429") {
            LedgerError::RateLimitExceeded { endpoint }
        } else if lower.contains("timeout") || lower.contains("timed out") {
            LedgerError::Timeout {
                endpoint,
                timeout_ms: 0,
            }
        } else if lower.contains("connection")
            || lower.contains("dns")
            || lower.contains("error sending request")
            || lower.contains("broken pipe")
        {
            LedgerError::Transport {
                endpoint,
                message: message.to_string(),
            }
        } else {
            // Extract error code if available
            let code = lower
                .split("code:")
                .nth(1)
                .and_then(|s| s.split(|c: char| !(c.is_ascii_digit() || c == '-')).find(|p| !p.is_empty()))
                .and_then(|s| s.parse::<i64>().ok());

            LedgerError::RpcResponse {
                endpoint,
                message: message.to_string(),
                code,
            }
        }
    }
}

/// JSON-RPC codes for a node that is behind or still starting up
fn is_node_unhealthy(code: i64) -> bool {
    matches!(code, -32005 | -32004 | -32016)
}
