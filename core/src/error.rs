//! Error types for the Klara client core.
//!
//! # Design
//! Transport failures carry one of three classifications and are handed back
//! to callers exactly as the interceptor saw them. Decoding problems with a
//! 2xx body are a separate `ApiError` variant so callers can tell "the
//! backend said no" from "the backend said something we cannot read".
//! `MalformedRecord` belongs to domain construction and never travels through
//! the transport layer.

use std::fmt;

use thiserror::Error;

/// Classification assigned by the response interceptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    ServerResponded,
    NoResponse,
    RequestConstruction,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureKind::ServerResponded => "server_responded",
            FailureKind::NoResponse => "no_response",
            FailureKind::RequestConstruction => "request_construction",
        };
        f.write_str(name)
    }
}

/// A failed round-trip to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The backend answered with a non-2xx status.
    #[error("HTTP {status}: {body}")]
    ServerResponded { status: u16, body: String },

    /// The request went out but no response came back (network, timeout).
    #[error("no response received: {0}")]
    NoResponse(String),

    /// The request could not be built or handed to the network.
    #[error("request could not be sent: {0}")]
    RequestConstruction(String),
}

impl TransportError {
    pub fn kind(&self) -> FailureKind {
        match self {
            TransportError::ServerResponded { .. } => FailureKind::ServerResponded,
            TransportError::NoResponse(_) => FailureKind::NoResponse,
            TransportError::RequestConstruction(_) => FailureKind::RequestConstruction,
        }
    }

    /// Status code, when the backend sent one.
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::ServerResponded { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Errors returned by API operations.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A 2xx body matched none of the accepted response shapes.
    #[error("unexpected response body: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn as_transport(&self) -> Option<&TransportError> {
        match self {
            ApiError::Transport(err) => Some(err),
            ApiError::Decode(_) => None,
        }
    }
}

/// What was wrong with a wire field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldProblem {
    Missing,
    InvalidValue(String),
}

/// A wire record that cannot become a domain entity.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed {entity} record: {}", describe(.field, .problem))]
pub struct MalformedRecord {
    pub entity: &'static str,
    pub field: &'static str,
    pub problem: FieldProblem,
}

fn describe(field: &str, problem: &FieldProblem) -> String {
    match problem {
        FieldProblem::Missing => format!("missing required field `{field}`"),
        FieldProblem::InvalidValue(value) => format!("field `{field}` has invalid value {value:?}"),
    }
}

impl MalformedRecord {
    pub fn missing(entity: &'static str, field: &'static str) -> Self {
        Self {
            entity,
            field,
            problem: FieldProblem::Missing,
        }
    }

    pub fn invalid(entity: &'static str, field: &'static str, value: &str) -> Self {
        Self {
            entity,
            field,
            problem: FieldProblem::InvalidValue(value.to_string()),
        }
    }
}

/// Failure while writing session state to storage.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session storage I/O failed: {0}")]
    Storage(#[from] std::io::Error),

    #[error("session state could not be encoded: {0}")]
    Encode(#[from] serde_json::Error),
}
