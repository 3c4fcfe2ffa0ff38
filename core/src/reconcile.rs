//! Response-shape reconciliation.
//!
//! The backend has shipped more than one contract for the auth and brain-dump
//! endpoints. Every shape the client tolerates is listed here, richest first,
//! and nowhere else. Once the backend settles on one contract, the fallbacks
//! below are the only code to remove.
//!
//! Auth (`/auth/signup`, `/auth/login`):
//! 1. `{"user": {...}, "token": "..."}`
//! 2. `{"user": {...}}`
//! 3. the user object itself
//!
//! Brain dump (`/brain-dumps`):
//! 1. `{"tasks": [...], "shopping_items": [...], "calendar_events": [...]}`
//! 2. legacy echo `{"id", "text", "user_id", "processed", "created_at"}`

use serde::Deserialize;
use serde_json::Value;

use crate::error::ApiError;
use crate::types::{BrainDumpEcho, BrainDumpResponse, User};

const EXTRACTION_KEYS: [&str; 3] = ["tasks", "shopping_items", "calendar_events"];

/// Result of a successful signup or login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSession {
    pub user: User,
    /// Absent when the backend does not issue tokens.
    pub token: Option<String>,
}

/// Decoded brain-dump reply. The two shapes are kept apart on purpose: an
/// echo carries no extracted entities and must not pass for an empty
/// extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrainDumpReply {
    Extracted(BrainDumpResponse),
    Echoed(BrainDumpEcho),
}

impl BrainDumpReply {
    pub fn extracted(&self) -> Option<&BrainDumpResponse> {
        match self {
            BrainDumpReply::Extracted(response) => Some(response),
            BrainDumpReply::Echoed(_) => None,
        }
    }

    pub fn into_extracted(self) -> Option<BrainDumpResponse> {
        match self {
            BrainDumpReply::Extracted(response) => Some(response),
            BrainDumpReply::Echoed(_) => None,
        }
    }
}

#[derive(Deserialize)]
struct Envelope {
    user: User,
    #[serde(default)]
    token: Option<String>,
}

pub fn decode_auth(body: &str) -> Result<AuthSession, ApiError> {
    let value = parse_json(body)?;
    if value.get("user").is_some() {
        let envelope: Envelope = from_value(value, "auth envelope")?;
        if envelope.token.is_none() {
            tracing::debug!("auth response carried no token");
        }
        return Ok(AuthSession {
            user: envelope.user,
            token: envelope.token,
        });
    }
    let user: User = from_value(value, "auth user")?;
    tracing::debug!("auth response was a bare user object");
    Ok(AuthSession { user, token: None })
}

pub fn decode_brain_dump(body: &str) -> Result<BrainDumpReply, ApiError> {
    let value = parse_json(body)?;
    let Some(object) = value.as_object() else {
        return Err(ApiError::Decode(format!("brain dump response is not an object: {body}")));
    };
    if EXTRACTION_KEYS.iter().any(|key| object.contains_key(*key)) {
        return from_value(value, "brain dump extraction").map(BrainDumpReply::Extracted);
    }
    if object.contains_key("text") && object.contains_key("id") {
        tracing::debug!("brain dump response used the legacy echo shape");
        return from_value(value, "brain dump echo").map(BrainDumpReply::Echoed);
    }
    Err(ApiError::Decode(format!("unrecognized brain dump response: {body}")))
}

fn parse_json(body: &str) -> Result<Value, ApiError> {
    serde_json::from_str(body).map_err(|e| ApiError::Decode(e.to_string()))
}

fn from_value<T: serde::de::DeserializeOwned>(value: Value, shape: &str) -> Result<T, ApiError> {
    serde_json::from_value(value).map_err(|e| ApiError::Decode(format!("{shape}: {e}")))
}
