//! Domain models built from wire records.
//!
//! # Design
//! Each entity has one `TryFrom<…Record>` impl that reads as a field table:
//! wire name, domain name, and whether the field is `required`, optional, or
//! parsed. Construction is pure. It either yields a complete entity or a
//! `MalformedRecord` naming the first offending field.
//!
//! Timestamps are parsed here rather than left as strings:
//! - `created_at`: RFC 3339, or naive ISO-8601 which is taken as UTC
//! - dates: `YYYY-MM-DD` (a full timestamp gives the date as written)
//! - times: `HH:MM` or `HH:MM:SS`

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_json::Value;

use crate::error::MalformedRecord;
use crate::types::{
    BrainDumpResponse, CalendarEventRecord, RecordId, ShoppingItemRecord, SubTaskRecord,
    TaskRecord, Wire,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubTask {
    pub id: RecordId,
    pub parent_task_id: RecordId,
    pub description: String,
    pub estimated_minutes: Option<u32>,
    pub due_date: Option<NaiveDate>,
    pub order: u32,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: RecordId,
    pub owner_id: RecordId,
    pub description: String,
    pub due_date: Option<NaiveDate>,
    pub estimated_minutes: Option<u32>,
    pub completed: bool,
    pub raw_input_text: String,
    pub subtasks: Vec<SubTask>,
    pub created_at: DateTime<Utc>,
}

impl Task {
    /// Subtasks in display sequence. The owned list keeps backend order.
    pub fn subtasks_by_order(&self) -> Vec<&SubTask> {
        let mut ordered: Vec<&SubTask> = self.subtasks.iter().collect();
        ordered.sort_by_key(|s| s.order);
        ordered
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShoppingItem {
    pub id: RecordId,
    pub owner_id: RecordId,
    pub description: String,
    pub completed: bool,
    pub raw_input_text: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarEvent {
    pub id: RecordId,
    pub owner_id: RecordId,
    pub description: String,
    pub event_date: NaiveDate,
    /// `None` for all-day events.
    pub event_time: Option<NaiveTime>,
    pub raw_input_text: String,
    pub created_at: DateTime<Utc>,
}

/// Domain view of one brain-dump extraction, in backend order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BrainDumpExtraction {
    pub tasks: Vec<Task>,
    pub shopping_items: Vec<ShoppingItem>,
    pub calendar_events: Vec<CalendarEvent>,
}

impl BrainDumpExtraction {
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty() && self.shopping_items.is_empty() && self.calendar_events.is_empty()
    }

    /// Convert every record that is well-formed and report the rest.
    pub fn from_response_lenient(response: BrainDumpResponse) -> (Self, Vec<MalformedRecord>) {
        let mut skipped = Vec::new();
        let extraction = Self {
            tasks: keep_valid(response.tasks, &mut skipped),
            shopping_items: keep_valid(response.shopping_items, &mut skipped),
            calendar_events: keep_valid(response.calendar_events, &mut skipped),
        };
        (extraction, skipped)
    }
}

/// All-or-nothing: the first malformed record fails the whole extraction.
impl TryFrom<BrainDumpResponse> for BrainDumpExtraction {
    type Error = MalformedRecord;

    fn try_from(response: BrainDumpResponse) -> Result<Self, Self::Error> {
        Ok(Self {
            tasks: convert_all(response.tasks)?,
            shopping_items: convert_all(response.shopping_items)?,
            calendar_events: convert_all(response.calendar_events)?,
        })
    }
}

fn convert_all<R, T>(records: Vec<R>) -> Result<Vec<T>, MalformedRecord>
where
    T: TryFrom<R, Error = MalformedRecord>,
{
    records.into_iter().map(T::try_from).collect()
}

fn keep_valid<R, T>(records: Vec<R>, skipped: &mut Vec<MalformedRecord>) -> Vec<T>
where
    T: TryFrom<R, Error = MalformedRecord>,
{
    let mut kept = Vec::with_capacity(records.len());
    for record in records {
        match T::try_from(record) {
            Ok(entity) => kept.push(entity),
            Err(err) => {
                tracing::warn!(entity = err.entity, field = err.field, "skipping malformed record: {err}");
                skipped.push(err);
            }
        }
    }
    kept
}

// ---------------------------------------------------------------------------
// Field decoders
// ---------------------------------------------------------------------------

fn optional<T>(entity: &'static str, field: &'static str, value: Wire<T>) -> Result<Option<T>, MalformedRecord> {
    match value {
        Wire::Absent => Ok(None),
        Wire::Present(value) => Ok(Some(value)),
        Wire::Mistyped(raw) => Err(MalformedRecord::invalid(entity, field, &raw_text(&raw))),
    }
}

fn required<T>(entity: &'static str, field: &'static str, value: Wire<T>) -> Result<T, MalformedRecord> {
    optional(entity, field, value)?.ok_or_else(|| MalformedRecord::missing(entity, field))
}

/// Strings as written, anything else as compact JSON.
fn raw_text(raw: &Value) -> String {
    raw.as_str().map_or_else(|| raw.to_string(), str::to_string)
}

fn timestamp(
    entity: &'static str,
    field: &'static str,
    value: Wire<String>,
) -> Result<DateTime<Utc>, MalformedRecord> {
    let raw = required(entity, field, value)?;
    parse_timestamp(&raw).ok_or_else(|| MalformedRecord::invalid(entity, field, &raw))
}

fn date(entity: &'static str, field: &'static str, value: Wire<String>) -> Result<NaiveDate, MalformedRecord> {
    let raw = required(entity, field, value)?;
    parse_date(&raw).ok_or_else(|| MalformedRecord::invalid(entity, field, &raw))
}

fn optional_date(
    entity: &'static str,
    field: &'static str,
    value: Wire<String>,
) -> Result<Option<NaiveDate>, MalformedRecord> {
    optional(entity, field, value)?
        .map(|raw| parse_date(&raw).ok_or_else(|| MalformedRecord::invalid(entity, field, &raw)))
        .transpose()
}

fn optional_time(
    entity: &'static str,
    field: &'static str,
    value: Wire<String>,
) -> Result<Option<NaiveTime>, MalformedRecord> {
    optional(entity, field, value)?
        .map(|raw| parse_time(&raw).ok_or_else(|| MalformedRecord::invalid(entity, field, &raw)))
        .transpose()
}

pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// The calendar date as written. An offset on a full timestamp is not
/// applied, so `2024-01-02T00:30:00+02:00` is still the 2nd.
pub(crate) fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
        .or_else(|| parse_timestamp(raw).map(|dt| dt.date_naive()))
}

pub(crate) fn parse_time(raw: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(raw, "%H:%M:%S%.f")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .ok()
}

// ---------------------------------------------------------------------------
// Record → entity
// ---------------------------------------------------------------------------

impl TryFrom<SubTaskRecord> for SubTask {
    type Error = MalformedRecord;

    fn try_from(r: SubTaskRecord) -> Result<Self, Self::Error> {
        const E: &str = "subtask";
        Ok(SubTask {
            id: required(E, "id", r.id)?,
            parent_task_id: required(E, "parent_task_id", r.parent_task_id)?,
            description: required(E, "description", r.description)?,
            estimated_minutes: optional(E, "estimated_time_minutes", r.estimated_time_minutes)?,
            due_date: optional_date(E, "due_date", r.due_date)?,
            order: required(E, "order", r.order)?,
            completed: required(E, "completed", r.completed)?,
            created_at: timestamp(E, "created_at", r.created_at)?,
        })
    }
}

impl TryFrom<TaskRecord> for Task {
    type Error = MalformedRecord;

    fn try_from(r: TaskRecord) -> Result<Self, Self::Error> {
        const E: &str = "task";
        Ok(Task {
            id: required(E, "id", r.id)?,
            owner_id: required(E, "user_id", r.user_id)?,
            description: required(E, "description", r.description)?,
            due_date: optional_date(E, "due_date", r.due_date)?,
            estimated_minutes: optional(E, "estimated_time_minutes", r.estimated_time_minutes)?,
            completed: required(E, "completed", r.completed)?,
            raw_input_text: required(E, "raw_input", r.raw_input)?,
            // absent or null means no subtasks
            subtasks: convert_all(optional(E, "subtasks", r.subtasks)?.unwrap_or_default())?,
            created_at: timestamp(E, "created_at", r.created_at)?,
        })
    }
}

impl TryFrom<ShoppingItemRecord> for ShoppingItem {
    type Error = MalformedRecord;

    fn try_from(r: ShoppingItemRecord) -> Result<Self, Self::Error> {
        const E: &str = "shopping_item";
        Ok(ShoppingItem {
            id: required(E, "id", r.id)?,
            owner_id: required(E, "user_id", r.user_id)?,
            description: required(E, "description", r.description)?,
            completed: required(E, "completed", r.completed)?,
            raw_input_text: required(E, "raw_input", r.raw_input)?,
            created_at: timestamp(E, "created_at", r.created_at)?,
        })
    }
}

impl TryFrom<CalendarEventRecord> for CalendarEvent {
    type Error = MalformedRecord;

    fn try_from(r: CalendarEventRecord) -> Result<Self, Self::Error> {
        const E: &str = "calendar_event";
        Ok(CalendarEvent {
            id: required(E, "id", r.id)?,
            owner_id: required(E, "user_id", r.user_id)?,
            description: required(E, "description", r.description)?,
            event_date: date(E, "event_date", r.event_date)?,
            event_time: optional_time(E, "event_time", r.event_time)?,
            raw_input_text: required(E, "raw_input", r.raw_input)?,
            created_at: timestamp(E, "created_at", r.created_at)?,
        })
    }
}
