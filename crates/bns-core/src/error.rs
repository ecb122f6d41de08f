//! Error types for bns-core

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Closed set of error kinds surfaced to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    ApiError,
    ContractError,
    NetworkError,
    ValidationError,
    NotFound,
    UnexpectedResponse,
    CacheError,
    ZonefileError,
    CircuitBreakerOpen,
    PermissionError,
    TimeoutError,
}

impl ErrorKind {
    /// Stable machine-readable code
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ApiError => "API_ERROR",
            ErrorKind::ContractError => "CONTRACT_ERROR",
            ErrorKind::NetworkError => "NETWORK_ERROR",
            ErrorKind::ValidationError => "VALIDATION_ERROR",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::UnexpectedResponse => "UNEXPECTED_RESPONSE",
            ErrorKind::CacheError => "CACHE_ERROR",
            ErrorKind::ZonefileError => "ZONEFILE_ERROR",
            ErrorKind::CircuitBreakerOpen => "CIRCUIT_BREAKER_OPEN",
            ErrorKind::PermissionError => "PERMISSION_ERROR",
            ErrorKind::TimeoutError => "TIMEOUT_ERROR",
        }
    }

    /// Transport-level kinds are the only ones that justify trying another endpoint
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            ErrorKind::ApiError
                | ErrorKind::NetworkError
                | ErrorKind::TimeoutError
                | ErrorKind::PermissionError
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured context attached to every error
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ErrorDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function: Option<String>,
    /// Clarity type tag of the offending response value
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl ErrorDetails {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Structured error: a stable kind, a message, details and an optional cause
#[derive(Error, Debug)]
#[error("{kind}: {message}")]
pub struct Error {
    kind: ErrorKind,
    message: String,
    details: ErrorDetails,
    #[source]
    cause: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl Error {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: ErrorDetails::default(),
            cause: None,
        }
    }

    pub fn api(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ApiError, message)
    }

    pub fn contract(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ContractError, message)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NetworkError, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ValidationError, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnexpectedResponse, message)
    }

    pub fn zonefile(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ZonefileError, message)
    }

    pub fn permission(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::PermissionError, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TimeoutError, message)
    }

    /// Decode mismatch: `expected` was wanted, `actual` is the tag that arrived
    pub fn type_mismatch(expected: &str, actual: &str) -> Self {
        Self::unexpected(format!("expected {}, got {}", expected, actual)).with_response_type(actual)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn details(&self) -> &ErrorDetails {
        &self.details
    }

    pub fn with_details(mut self, details: ErrorDetails) -> Self {
        self.details = details;
        self
    }

    /// Fill in any detail field that is still empty, keeping what is already set
    pub fn merge_details(mut self, details: &ErrorDetails) -> Self {
        let d = &mut self.details;
        d.endpoint = d.endpoint.take().or_else(|| details.endpoint.clone());
        d.network = d.network.take().or_else(|| details.network.clone());
        d.function = d.function.take().or_else(|| details.function.clone());
        d.response_type = d.response_type.take().or_else(|| details.response_type.clone());
        d.status = d.status.or(details.status);
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.details.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_network(mut self, network: impl fmt::Display) -> Self {
        self.details.network = Some(network.to_string());
        self
    }

    pub fn with_function(mut self, function: impl Into<String>) -> Self {
        self.details.function = Some(function.into());
        self
    }

    pub fn with_response_type(mut self, tag: impl Into<String>) -> Self {
        self.details.response_type = Some(tag.into());
        self
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.details.status = Some(status);
        self
    }

    pub fn with_cause<E>(mut self, cause: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.cause = Some(Box::new(cause));
        self
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::unexpected(format!("malformed JSON: {}", err)).with_cause(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::validation(format!("I/O error: {}", err)).with_cause(err)
    }
}
