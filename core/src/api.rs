//! One-call API operations over a `Transport`.
//!
//! `ApiClient` glues the stateless `KlaraClient` builder/parser to a
//! transport and runs every round-trip through the interceptor. It holds no
//! per-call state, so one instance can serve any number of concurrent callers
//! as long as its transport can.

use std::sync::OnceLock;

use serde::Serialize;

use crate::client::KlaraClient;
use crate::config::ClientConfig;
use crate::error::{ApiError, TransportError};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::reconcile::{AuthSession, BrainDumpReply};
use crate::transport::{self, Transport, UreqTransport};
use crate::types::{
    CalendarEventRecord, CreateCalendarEventRequest, CreateShoppingItemsRequest,
    CreateTaskRequest, RecordId, ShoppingItemRecord, TaskRecord,
};

#[derive(Debug, Clone)]
pub struct ApiClient<T = UreqTransport> {
    client: KlaraClient,
    transport: T,
}

impl ApiClient<UreqTransport> {
    pub fn from_config(config: &ClientConfig) -> Self {
        Self::with_transport(KlaraClient::from_config(config), UreqTransport::from_config(config))
    }

    pub fn from_env() -> Self {
        Self::from_config(&ClientConfig::from_env())
    }
}

/// Process-wide client built from the environment on first use.
pub fn shared() -> &'static ApiClient {
    static SHARED: OnceLock<ApiClient> = OnceLock::new();
    SHARED.get_or_init(|| {
        let client = ApiClient::from_env();
        tracing::info!(base_url = client.client.base_url(), "initialized shared API client");
        client
    })
}

impl<T: Transport> ApiClient<T> {
    pub fn with_transport(client: KlaraClient, transport: T) -> Self {
        Self { client, transport }
    }

    pub fn client(&self) -> &KlaraClient {
        &self.client
    }

    /// Execute a prepared request through the interceptor.
    pub fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        tracing::debug!(method = %request.method, url = %request.url, "sending request");
        let outcome = self.transport.execute(request);
        transport::intercept(request, outcome)
    }

    /// Send `body` as JSON to `path` and return the raw 2xx response body.
    pub fn send<B: Serialize>(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&B>,
    ) -> Result<String, TransportError> {
        let body = match body.map(serde_json::to_string).transpose() {
            Ok(body) => body,
            Err(e) => {
                return Err(reject_unsent(TransportError::RequestConstruction(format!(
                    "request body: {e}"
                ))))
            }
        };
        let request = HttpRequest::json(method, self.client.url(path), body);
        self.execute(&request).map(|response| response.body)
    }

    fn round_trip<R>(
        &self,
        built: Result<HttpRequest, TransportError>,
        parse: impl FnOnce(&KlaraClient, HttpResponse) -> Result<R, ApiError>,
    ) -> Result<R, ApiError> {
        let request = built.map_err(reject_unsent)?;
        let response = self.execute(&request)?;
        parse(&self.client, response)
    }

    pub fn signup(&self, email: &str, first_name: &str) -> Result<AuthSession, ApiError> {
        self.round_trip(self.client.build_signup(email, first_name), KlaraClient::parse_signup)
    }

    /// Passwordless: the email alone identifies the user.
    pub fn login(&self, email: &str) -> Result<AuthSession, ApiError> {
        self.round_trip(self.client.build_login(email), KlaraClient::parse_login)
    }

    /// Submit free text for extraction. The reply holds wire records; build
    /// domain models from it with `BrainDumpExtraction::try_from`.
    pub fn submit_brain_dump(
        &self,
        text: &str,
        user_id: impl Into<RecordId>,
    ) -> Result<BrainDumpReply, ApiError> {
        self.round_trip(
            self.client.build_submit_brain_dump(text, user_id.into()),
            KlaraClient::parse_submit_brain_dump,
        )
    }

    pub fn create_task(&self, input: &CreateTaskRequest) -> Result<TaskRecord, ApiError> {
        self.round_trip(self.client.build_create_task(input), KlaraClient::parse_create_task)
    }

    pub fn create_shopping_items(
        &self,
        input: &CreateShoppingItemsRequest,
    ) -> Result<Vec<ShoppingItemRecord>, ApiError> {
        self.round_trip(
            self.client.build_create_shopping_items(input),
            KlaraClient::parse_create_shopping_items,
        )
    }

    pub fn create_calendar_event(
        &self,
        input: &CreateCalendarEventRequest,
    ) -> Result<CalendarEventRecord, ApiError> {
        self.round_trip(
            self.client.build_create_calendar_event(input),
            KlaraClient::parse_create_calendar_event,
        )
    }
}

fn reject_unsent(err: TransportError) -> TransportError {
    transport::log_failure(None, &err);
    err
}
