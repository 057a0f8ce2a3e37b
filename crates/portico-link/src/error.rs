//! Error types for gateway client operations.

use std::fmt;

use portico_protocol::ErrorResponse;

/// Result type alias using [`LinkError`]
pub type Result<T> = std::result::Result<T, LinkError>;

/// Errors that can occur during gateway client operations.
#[derive(Debug)]
pub enum LinkError {
    /// Network or HTTP request errors
    NetworkError(String),

    /// Request timed out
    TimeoutError(String),

    /// Invalid configuration (missing URL, invalid settings)
    ConfigurationError(String),

    /// Message encode/decode errors
    SerializationError(String),

    /// The server answered with the wire error envelope
    Remote {
        /// Server-supplied message
        message: String,
        error_code: i32,
        sql_state: String,
        /// Server-side cause chain, outermost first
        stack_traces: Vec<String>,
    },

    /// The statement was canceled; observed at the next row boundary
    Canceled,

    /// The server answered with an unexpected response variant
    UnexpectedResponse(String),

    /// The connection or statement is already closed
    Closed(String),
}

impl LinkError {
    pub(crate) fn from_error_response(response: ErrorResponse) -> Self {
        Self::Remote {
            message: response.error_message,
            error_code: response.error_code,
            sql_state: response.sql_state,
            stack_traces: response.stack_traces,
        }
    }

    /// The server-side cause chain, outermost first. Empty for local
    /// errors.
    pub fn stack_traces(&self) -> &[String] {
        match self {
            Self::Remote { stack_traces, .. } => stack_traces,
            _ => &[],
        }
    }

    /// User-visible message with the full cause chain joined by ` -> `.
    pub fn detailed_message(&self) -> String {
        match self {
            Self::Remote {
                message,
                stack_traces,
                ..
            } if !stack_traces.is_empty() => {
                let chain = stack_traces.join(" -> ");
                if chain.starts_with(message.as_str()) {
                    chain
                } else {
                    format!("{} -> {}", message, chain)
                }
            }
            other => other.to_string(),
        }
    }
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NetworkError(msg) => write!(f, "Network error: {}", msg),
            Self::TimeoutError(msg) => write!(f, "Request timed out: {}", msg),
            Self::ConfigurationError(msg) => write!(f, "Configuration error: {}", msg),
            Self::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
            Self::Remote { message, .. } => write!(f, "{}", message),
            Self::Canceled => write!(f, "Statement canceled"),
            Self::UnexpectedResponse(msg) => write!(f, "Unexpected response: {}", msg),
            Self::Closed(msg) => write!(f, "Closed: {}", msg),
        }
    }
}

impl std::error::Error for LinkError {}

impl From<reqwest::Error> for LinkError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::TimeoutError(err.to_string())
        } else {
            Self::NetworkError(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use portico_protocol::{ErrorSeverity, RpcMetadata};

    use super::*;

    #[test]
    fn remote_error_joins_cause_chain() {
        let err = LinkError::from_error_response(ErrorResponse {
            error_message: "outer failure".to_string(),
            error_code: -1,
            sql_state: "00000".to_string(),
            severity: ErrorSeverity::Error,
            stack_traces: vec!["outer failure".to_string(), "root cause".to_string()],
            rpc_metadata: RpcMetadata::new("host:1"),
        });
        assert_eq!(err.to_string(), "outer failure");
        assert_eq!(err.detailed_message(), "outer failure -> root cause");
        assert_eq!(err.stack_traces().len(), 2);
    }

    #[test]
    fn canceled_has_the_fixed_message() {
        assert_eq!(LinkError::Canceled.to_string(), "Statement canceled");
    }
}
