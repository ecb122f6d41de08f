//! Failure classification
//!
//! Everything that can go wrong below the resolver is first captured as a
//! `RawFailure`, then mapped onto the closed `ErrorKind` taxonomy. The
//! classifier also keeps a short history of failures that did not surface to
//! the caller (indexing API misses, failed primaries) for diagnostics.

use std::collections::VecDeque;
use std::sync::Mutex;

use bns_core::{Error, ErrorDetails, ErrorKind};
use tracing::debug;

const HISTORY_LEN: usize = 32;

/// An unclassified failure
#[derive(Debug)]
pub enum RawFailure {
    /// Already classified
    Structured(Error),
    /// HTTP-level failure, with the status when a response arrived
    Transport {
        status: Option<u16>,
        message: String,
        timeout: bool,
        connect: bool,
        source: Option<reqwest::Error>,
    },
    /// Bare message from a non-transport source
    Message(String),
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl RawFailure {
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        RawFailure::Transport {
            status: Some(status),
            message: message.into(),
            timeout: false,
            connect: false,
            source: None,
        }
    }
}

impl From<reqwest::Error> for RawFailure {
    fn from(err: reqwest::Error) -> Self {
        RawFailure::Transport {
            status: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
            timeout: err.is_timeout(),
            connect: err.is_connect(),
            source: Some(err),
        }
    }
}

impl From<Error> for RawFailure {
    fn from(err: Error) -> Self {
        RawFailure::Structured(err)
    }
}

/// Record of a failure that was absorbed by a fallback
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedFailure {
    pub kind: ErrorKind,
    pub message: String,
    pub details: ErrorDetails,
}

#[derive(Default)]
pub struct ErrorClassifier {
    history: Mutex<VecDeque<RecordedFailure>>,
}

impl ErrorClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map a failure onto the taxonomy, attaching `context` to the details
    pub fn classify(&self, failure: RawFailure, context: &ErrorDetails) -> Error {
        let err = match failure {
            RawFailure::Structured(err) => err,
            RawFailure::Transport {
                status,
                message,
                timeout,
                connect,
                source,
            } => {
                let err = match status {
                    Some(404) => Error::not_found(message),
                    Some(401) | Some(403) => Error::permission(message),
                    Some(s) if s >= 500 => Error::api(format!("server error: {}", message)),
                    None if timeout => Error::timeout(message),
                    None if connect => Error::network(message),
                    _ => Error::api(message),
                };
                let err = match status {
                    Some(s) => err.with_status(s),
                    None => err,
                };
                match source {
                    Some(source) => err.with_cause(source),
                    None => err,
                }
            }
            RawFailure::Message(message) => Error::unexpected(message),
            RawFailure::Other(other) => {
                let message = other.to_string();
                let message = if message.is_empty() {
                    "unknown failure".to_string()
                } else {
                    message
                };
                Error::unexpected(message)
            }
        };
        err.merge_details(context)
    }

    /// Classify a failure that is absorbed by a fallback and remember it
    pub fn record(&self, failure: RawFailure, context: &ErrorDetails) -> Error {
        let err = self.classify(failure, context);
        self.remember(&err);
        err
    }

    /// Remember an already classified, absorbed failure
    pub fn remember(&self, err: &Error) {
        debug!(
            kind = %err.kind(),
            endpoint = ?err.details().endpoint,
            function = ?err.details().function,
            message = err.message(),
            "Recorded absorbed failure"
        );

        let mut history = self.history.lock().unwrap_or_else(|e| e.into_inner());
        if history.len() == HISTORY_LEN {
            history.pop_front();
        }
        history.push_back(RecordedFailure {
            kind: err.kind(),
            message: err.message().to_string(),
            details: err.details().clone(),
        });
    }

    /// Absorbed failures, oldest first
    pub fn recent_failures(&self) -> Vec<RecordedFailure> {
        let history = self.history.lock().unwrap_or_else(|e| e.into_inner());
        history.iter().cloned().collect()
    }
}
