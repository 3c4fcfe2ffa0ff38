//! Wire records and request payloads for the Klara backend.
//!
//! # Design
//! Response records keep the backend's snake_case names and make every field
//! optional. Whether a field is actually required, and whether its value has
//! the right type, is decided once, in the domain constructors in `models`,
//! so a bad field surfaces as a `MalformedRecord` naming that field instead
//! of a generic serde error that sinks the whole reply.
//! `null` and an absent key both decode to `Wire::Absent`.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Backend identifier. The backend uses integers, but some call sites carry
/// ids as strings, so both forms are accepted and sent back as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Number(i64),
    Text(String),
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Number(n) => write!(f, "{n}"),
            RecordId::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for RecordId {
    fn from(n: i64) -> Self {
        RecordId::Number(n)
    }
}

impl From<i32> for RecordId {
    fn from(n: i32) -> Self {
        RecordId::Number(i64::from(n))
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        RecordId::Text(s.to_string())
    }
}

impl From<String> for RecordId {
    fn from(s: String) -> Self {
        RecordId::Text(s)
    }
}

/// An authenticated user as the backend reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: RecordId,
    pub email: String,
    #[serde(
        default,
        rename = "firstName",
        alias = "first_name",
        skip_serializing_if = "Option::is_none"
    )]
    pub display_name: Option<String>,
}

// ---------------------------------------------------------------------------
// Response records
// ---------------------------------------------------------------------------

/// One field of a response record, as received.
///
/// Decoding a field never fails: a value of the wrong JSON type is kept as
/// `Mistyped` so the domain constructor can reject that one record instead
/// of the whole reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Wire<T> {
    /// Absent key or `null`.
    Absent,
    Present(T),
    Mistyped(Value),
}

impl<T> Wire<T> {
    pub fn as_present(&self) -> Option<&T> {
        match self {
            Wire::Present(value) => Some(value),
            Wire::Absent | Wire::Mistyped(_) => None,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Wire::Absent)
    }
}

impl<T> Default for Wire<T> {
    fn default() -> Self {
        Wire::Absent
    }
}

impl<T> From<Option<T>> for Wire<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Wire::Absent, Wire::Present)
    }
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for Wire<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Value::deserialize(deserializer)?;
        if raw.is_null() {
            return Ok(Wire::Absent);
        }
        Ok(match T::deserialize(&raw) {
            Ok(value) => Wire::Present(value),
            Err(_) => Wire::Mistyped(raw),
        })
    }
}

/// A missing list and an explicit `null` both mean "none".
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SubTaskRecord {
    pub id: Wire<RecordId>,
    pub parent_task_id: Wire<RecordId>,
    pub description: Wire<String>,
    pub estimated_time_minutes: Wire<u32>,
    pub due_date: Wire<String>,
    pub order: Wire<u32>,
    pub completed: Wire<bool>,
    pub created_at: Wire<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TaskRecord {
    pub id: Wire<RecordId>,
    pub user_id: Wire<RecordId>,
    pub description: Wire<String>,
    pub due_date: Wire<String>,
    pub estimated_time_minutes: Wire<u32>,
    pub completed: Wire<bool>,
    pub raw_input: Wire<String>,
    pub subtasks: Wire<Vec<SubTaskRecord>>,
    pub created_at: Wire<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ShoppingItemRecord {
    pub id: Wire<RecordId>,
    pub user_id: Wire<RecordId>,
    pub description: Wire<String>,
    pub completed: Wire<bool>,
    pub raw_input: Wire<String>,
    pub created_at: Wire<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CalendarEventRecord {
    pub id: Wire<RecordId>,
    pub user_id: Wire<RecordId>,
    pub description: Wire<String>,
    pub event_date: Wire<String>,
    pub event_time: Wire<String>,
    pub raw_input: Wire<String>,
    pub created_at: Wire<String>,
}

/// Extraction-list form of the brain-dump response. Lists keep backend order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BrainDumpResponse {
    #[serde(deserialize_with = "null_as_empty")]
    pub tasks: Vec<TaskRecord>,
    #[serde(deserialize_with = "null_as_empty")]
    pub shopping_items: Vec<ShoppingItemRecord>,
    #[serde(deserialize_with = "null_as_empty")]
    pub calendar_events: Vec<CalendarEventRecord>,
}

/// Legacy single-entity echo of a stored brain dump.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrainDumpEcho {
    pub id: RecordId,
    pub text: String,
    pub user_id: RecordId,
    #[serde(default)]
    pub processed: bool,
    pub created_at: Option<String>,
}

// ---------------------------------------------------------------------------
// Request payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignupRequest {
    pub email: String,
    #[serde(rename = "firstName")]
    pub first_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrainDumpRequest {
    pub text: String,
    pub user_id: RecordId,
}

/// A subtask the user approved alongside its parent task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSubTask {
    pub description: String,
    pub order: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_time_minutes: Option<u32>,
    /// `YYYY-MM-DD`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTaskRequest {
    pub user_id: RecordId,
    pub description: String,
    /// `YYYY-MM-DD`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    pub estimated_time_minutes: u32,
    pub raw_input: String,
    #[serde(default)]
    pub subtasks: Vec<NewSubTask>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateShoppingItemsRequest {
    pub user_id: RecordId,
    pub items: Vec<String>,
    pub raw_input: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCalendarEventRequest {
    pub user_id: RecordId,
    pub description: String,
    /// `YYYY-MM-DD`
    pub event_date: String,
    /// `HH:MM` or `HH:MM:SS`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_time: Option<String>,
    pub raw_input: String,
}
