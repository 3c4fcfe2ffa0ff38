//! Stateless HTTP request builder and response parser for the Klara API.
//!
//! # Design
//! `KlaraClient` holds only a `base_url` and carries no mutable state between
//! calls. Each operation is split into a `build_*` method that produces an
//! `HttpRequest` and a `parse_*` method that consumes an `HttpResponse`.
//! The caller (or `ApiClient`) executes the round-trip in between, so this
//! layer stays deterministic and free of I/O.

use serde::Serialize;

use crate::config::ClientConfig;
use crate::error::{ApiError, TransportError};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::reconcile::{self, AuthSession, BrainDumpReply};
use crate::types::{
    BrainDumpRequest, CalendarEventRecord, CreateCalendarEventRequest,
    CreateShoppingItemsRequest, CreateTaskRequest, LoginRequest, RecordId, ShoppingItemRecord,
    SignupRequest, TaskRecord,
};

pub const SIGNUP_PATH: &str = "/auth/signup";
pub const LOGIN_PATH: &str = "/auth/login";
pub const BRAIN_DUMPS_PATH: &str = "/brain-dumps";
pub const TASKS_PATH: &str = "/tasks";
pub const SHOPPING_ITEMS_PATH: &str = "/shopping-items";
pub const CALENDAR_EVENTS_PATH: &str = "/calendar-events";

/// Synchronous, stateless request builder for the Klara API.
#[derive(Debug, Clone)]
pub struct KlaraClient {
    base_url: String,
}

impl KlaraClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(&config.base_url)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for an endpoint path.
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn post<B: Serialize>(&self, path: &str, body: &B) -> Result<HttpRequest, TransportError> {
        let body = serde_json::to_string(body)
            .map_err(|e| TransportError::RequestConstruction(format!("request body: {e}")))?;
        Ok(HttpRequest::json(
            HttpMethod::Post,
            self.url(path),
            Some(body),
        ))
    }

    pub fn build_signup(&self, email: &str, first_name: &str) -> Result<HttpRequest, TransportError> {
        self.post(
            SIGNUP_PATH,
            &SignupRequest {
                email: email.to_string(),
                first_name: first_name.to_string(),
            },
        )
    }

    pub fn build_login(&self, email: &str) -> Result<HttpRequest, TransportError> {
        self.post(
            LOGIN_PATH,
            &LoginRequest {
                email: email.to_string(),
            },
        )
    }

    pub fn build_submit_brain_dump(
        &self,
        text: &str,
        user_id: RecordId,
    ) -> Result<HttpRequest, TransportError> {
        self.post(
            BRAIN_DUMPS_PATH,
            &BrainDumpRequest {
                text: text.to_string(),
                user_id,
            },
        )
    }

    pub fn build_create_task(&self, input: &CreateTaskRequest) -> Result<HttpRequest, TransportError> {
        self.post(TASKS_PATH, input)
    }

    pub fn build_create_shopping_items(
        &self,
        input: &CreateShoppingItemsRequest,
    ) -> Result<HttpRequest, TransportError> {
        self.post(SHOPPING_ITEMS_PATH, input)
    }

    pub fn build_create_calendar_event(
        &self,
        input: &CreateCalendarEventRequest,
    ) -> Result<HttpRequest, TransportError> {
        self.post(CALENDAR_EVENTS_PATH, input)
    }

    pub fn parse_signup(&self, response: HttpResponse) -> Result<AuthSession, ApiError> {
        check_status(&response)?;
        reconcile::decode_auth(&response.body)
    }

    pub fn parse_login(&self, response: HttpResponse) -> Result<AuthSession, ApiError> {
        check_status(&response)?;
        reconcile::decode_auth(&response.body)
    }

    pub fn parse_submit_brain_dump(&self, response: HttpResponse) -> Result<BrainDumpReply, ApiError> {
        check_status(&response)?;
        reconcile::decode_brain_dump(&response.body)
    }

    pub fn parse_create_task(&self, response: HttpResponse) -> Result<TaskRecord, ApiError> {
        check_status(&response)?;
        decode(&response.body)
    }

    pub fn parse_create_shopping_items(
        &self,
        response: HttpResponse,
    ) -> Result<Vec<ShoppingItemRecord>, ApiError> {
        check_status(&response)?;
        decode(&response.body)
    }

    pub fn parse_create_calendar_event(
        &self,
        response: HttpResponse,
    ) -> Result<CalendarEventRecord, ApiError> {
        check_status(&response)?;
        decode(&response.body)
    }
}

/// Any non-2xx status is a server-responded failure carrying the raw body.
fn check_status(response: &HttpResponse) -> Result<(), TransportError> {
    if response.is_success() {
        return Ok(());
    }
    Err(TransportError::ServerResponded {
        status: response.status,
        body: response.body.clone(),
    })
}

fn decode<T: serde::de::DeserializeOwned>(body: &str) -> Result<T, ApiError> {
    serde_json::from_str(body).map_err(|e| ApiError::Decode(e.to_string()))
}
