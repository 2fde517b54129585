//! Error types for request execution and response decoding.

use thiserror::Error;

/// Errors produced while building, sending or decoding a request.
///
/// Payloads are kept as strings so the error is `Clone`: a response caches
/// the outcome of its single body read, and hooks observe the same error
/// value that is later delivered in the envelope.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// The logical request could not be turned into a wire request.
    #[error("cannot materialize request: {0}")]
    Materialize(String),

    /// The request timed out.
    #[error("request timed out")]
    Timeout,

    /// Connecting to the remote host failed.
    #[error("connection error: {0}")]
    Connection(String),

    /// Any other transport-level failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// Reading the response body failed.
    #[error("failed to read response body: {0}")]
    Body(String),

    /// The body is not valid JSON for the requested shape.
    #[error("JSON error: {0}")]
    Json(String),

    /// The body is not valid XML for the requested shape.
    #[error("XML error: {0}")]
    Xml(String),

    /// A group worker task ended without producing a result.
    #[error("request task failed: {0}")]
    Task(String),
}

impl Error {
    /// Whether this error was raised before any network call was made.
    pub fn is_materialization(&self) -> bool {
        matches!(self, Self::Materialize(_))
    }

    /// Whether this error is a network failure eligible for retry.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Timeout | Self::Connection(_) | Self::Transport(_)
        )
    }

    /// Whether this error came from a decoding helper.
    pub fn is_decoding(&self) -> bool {
        matches!(self, Self::Json(_) | Self::Xml(_))
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_connect() {
            Self::Connection(err.to_string())
        } else if err.is_builder() {
            Self::Materialize(err.to_string())
        } else if err.is_body() || err.is_decode() {
            Self::Body(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Self::Materialize(format!("invalid URL: {err}"))
    }
}

impl From<http::method::InvalidMethod> for Error {
    fn from(err: http::method::InvalidMethod) -> Self {
        Self::Materialize(format!("invalid method: {err}"))
    }
}

impl From<http::header::InvalidHeaderName> for Error {
    fn from(err: http::header::InvalidHeaderName) -> Self {
        Self::Materialize(format!("invalid header name: {err}"))
    }
}

impl From<http::header::InvalidHeaderValue> for Error {
    fn from(err: http::header::InvalidHeaderValue) -> Self {
        Self::Materialize(format!("invalid header value: {err}"))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

impl From<quick_xml::DeError> for Error {
    fn from(err: quick_xml::DeError) -> Self {
        Self::Xml(err.to_string())
    }
}

/// A specialized Result type for request operations.
pub type Result<T> = std::result::Result<T, Error>;
