//! Provider error taxonomy (§7): `APIError` family plus
//! `AssignmentTimeoutError`. Every variant exposes `retryable()` so callers
//! (the fallback adapter, the worker's dispatch handshake) can apply the
//! propagation policy uniformly instead of matching on provider internals.

#[derive(Debug, Clone, thiserror::Error)]
pub enum ApiError {
    /// HTTP-like status error. 4xx is non-retryable by default; 5xx is
    /// retryable. `retryable_override` lets a specific provider adapter
    /// correct a status code that doesn't follow the 4xx/5xx convention
    /// (e.g. a 429 rate limit, which is retryable despite being 4xx).
    #[error("status {status}: {message}")]
    Status {
        status: u16,
        message: String,
        retryable_override: Option<bool>,
    },
    #[error("connection error: {0}")]
    Connection(String),
    #[error("timed out after {elapsed_ms}ms (limit {timeout_ms}ms)")]
    Timeout { elapsed_ms: u64, timeout_ms: u64 },
    /// Fatal to the specific accept attempt, never to the worker itself.
    #[error("assignment timeout: {0}")]
    AssignmentTimeout(String),
}

impl ApiError {
    pub fn retryable(&self) -> bool {
        match self {
            ApiError::Status {
                status,
                retryable_override,
                ..
            } => retryable_override.unwrap_or(*status >= 500),
            ApiError::Connection(_) => true,
            ApiError::Timeout { .. } => true,
            ApiError::AssignmentTimeout(_) => false,
        }
    }

    pub fn status(status: u16, message: impl Into<String>) -> Self {
        ApiError::Status {
            status,
            message: message.into(),
            retryable_override: None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_4xx_is_not_retryable_by_default() {
        assert!(!ApiError::status(403, "forbidden").retryable());
    }

    #[test]
    fn status_5xx_is_retryable_by_default() {
        assert!(ApiError::status(503, "unavailable").retryable());
    }

    #[test]
    fn override_wins_over_status_convention() {
        let e = ApiError::Status {
            status: 429,
            message: "rate limited".into(),
            retryable_override: Some(true),
        };
        assert!(e.retryable());
    }

    #[test]
    fn timeout_and_connection_are_retryable() {
        assert!(ApiError::Timeout { elapsed_ms: 1, timeout_ms: 1 }.retryable());
        assert!(ApiError::Connection("reset".into()).retryable());
    }

    #[test]
    fn assignment_timeout_is_not_retryable() {
        assert!(!ApiError::AssignmentTimeout("no slot".into()).retryable());
    }
}
