use reqwest::StatusCode;
use std::fmt;
use thiserror::Error;

/// Machine-checkable tag for a [`BackendError`]
///
/// Retry policies select retryable failures by kind, never by message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Configuration,
    Connection,
    Query,
    RetryExhausted,
    Cancelled,
}

impl ErrorKind {
    /// Stable snake_case name used in logs and CLI output
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Configuration => "configuration_error",
            Self::Connection => "connection_error",
            Self::Query => "query_error",
            Self::RetryExhausted => "retry_exhausted",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised by backends, the retry executor and the registry
#[derive(Debug, Error)]
pub enum BackendError {
    /// Invalid or missing setup (bad URL, unknown backend kind, logs not configured)
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Transport-level failure reaching the remote service (timeout, DNS, refused, 5xx)
    #[error("Connection error: {message}")]
    Connection {
        message: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    /// The remote service rejected or could not execute the query
    #[error("Query error: {message} (query: {query})")]
    Query { message: String, query: String },

    /// The retry budget was spent; wraps the last retryable error
    #[error("{operation} failed after {attempts} attempts: {source}")]
    RetryExhausted {
        operation: String,
        attempts: u32,
        #[source]
        source: Box<BackendError>,
    },

    /// Caller-initiated cancellation
    #[error("{operation} was cancelled")]
    Cancelled { operation: String },
}

impl BackendError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            source: None,
        }
    }

    pub fn query(message: impl Into<String>, query: impl Into<String>) -> Self {
        Self::Query {
            message: message.into(),
            query: query.into(),
        }
    }

    pub fn cancelled(operation: impl Into<String>) -> Self {
        Self::Cancelled {
            operation: operation.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration { .. } => ErrorKind::Configuration,
            Self::Connection { .. } => ErrorKind::Connection,
            Self::Query { .. } => ErrorKind::Query,
            Self::RetryExhausted { .. } => ErrorKind::RetryExhausted,
            Self::Cancelled { .. } => ErrorKind::Cancelled,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.kind().as_str()
    }

    /// Status code a boundary layer should report for this error
    ///
    /// - Connection failures and exhausted retries: 503
    /// - Query errors: 400
    /// - Configuration errors: 500
    /// - Cancellation: 408
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Configuration { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Connection { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Self::Query { .. } => StatusCode::BAD_REQUEST,
            Self::RetryExhausted { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Self::Cancelled { .. } => StatusCode::REQUEST_TIMEOUT,
        }
    }

    /// Innermost error behind any `RetryExhausted` wrapping
    pub fn root_cause(&self) -> &BackendError {
        match self {
            Self::RetryExhausted { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        // A request that could not even be built points at bad setup (e.g. a malformed URL)
        if err.is_builder() {
            return Self::configuration(format!("Invalid request: {}", err));
        }

        let message = if err.is_timeout() {
            format!("Request timed out: {}", err)
        } else if err.is_connect() {
            format!("Failed to connect: {}", err)
        } else {
            format!("HTTP request error: {}", err)
        };

        Self::Connection {
            message,
            source: Some(err),
        }
    }
}
