//! Client data layer for the Klara backend.
//!
//! # Overview
//! Submits brain-dump text for extraction, turns the backend's wire records
//! into typed domain models, and keeps the signed-in user in a persisted
//! session store.
//!
//! # Design
//! - `KlaraClient` is stateless: `build_*` produces an `HttpRequest`,
//!   `parse_*` consumes an `HttpResponse`, no I/O in between.
//! - `ApiClient` runs those requests through a `Transport` (blocking `ureq`
//!   by default, 10 s timeout) and the logging interceptor, which classifies
//!   failures and always hands them back to the caller.
//! - Wire records (`types`) are all-optional; `models` decides what is
//!   required and parses timestamps.
//! - `reconcile` is the one place that knows about competing response shapes.
//! - `SessionStore` is an explicit value over pluggable `SessionStorage`.

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod models;
pub mod reconcile;
pub mod session;
pub mod transport;
pub mod types;

pub use api::{shared, ApiClient};
pub use client::KlaraClient;
pub use config::ClientConfig;
pub use error::{ApiError, FailureKind, FieldProblem, MalformedRecord, SessionError, TransportError};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use models::{BrainDumpExtraction, CalendarEvent, ShoppingItem, SubTask, Task};
pub use reconcile::{AuthSession, BrainDumpReply};
pub use session::{FileStorage, MemoryStorage, SessionStorage, SessionStore};
pub use transport::{Transport, UreqTransport};
pub use types::{
    BrainDumpEcho, BrainDumpResponse, CalendarEventRecord, CreateCalendarEventRequest,
    CreateShoppingItemsRequest, CreateTaskRequest, NewSubTask, RecordId, ShoppingItemRecord,
    SubTaskRecord, TaskRecord, User, Wire,
};
