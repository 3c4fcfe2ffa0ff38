//! In-memory stand-in for the Klara backend.
//!
//! Serves the auth, brain-dump and approval endpoints with the same JSON
//! shapes the real backend uses. Extraction is a few keyword rules, enough
//! to drive client tests end to end.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{Days, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    pub created_at: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SubTask {
    pub id: i64,
    pub parent_task_id: i64,
    pub description: String,
    pub estimated_time_minutes: Option<u32>,
    pub due_date: Option<String>,
    pub order: u32,
    pub completed: bool,
    pub created_at: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub user_id: i64,
    pub description: String,
    pub due_date: Option<String>,
    pub estimated_time_minutes: Option<u32>,
    pub completed: bool,
    pub raw_input: String,
    pub subtasks: Vec<SubTask>,
    pub created_at: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ShoppingItem {
    pub id: i64,
    pub user_id: i64,
    pub description: String,
    pub completed: bool,
    pub raw_input: String,
    pub created_at: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: i64,
    pub user_id: i64,
    pub description: String,
    pub event_date: String,
    pub event_time: Option<String>,
    pub raw_input: String,
    pub created_at: String,
}

#[derive(Deserialize)]
pub struct SignupInput {
    pub email: String,
    #[serde(rename = "firstName")]
    pub first_name: String,
}

#[derive(Deserialize)]
pub struct LoginInput {
    pub email: String,
}

/// Clients send user ids as numbers or numeric strings.
#[derive(Deserialize)]
#[serde(untagged)]
pub enum UserRef {
    Number(i64),
    Text(String),
}

impl UserRef {
    fn resolve(&self) -> Option<i64> {
        match self {
            UserRef::Number(n) => Some(*n),
            UserRef::Text(s) => s.trim().parse().ok(),
        }
    }
}

#[derive(Deserialize)]
pub struct BrainDumpInput {
    pub text: String,
    pub user_id: UserRef,
}

#[derive(Deserialize)]
pub struct NewSubTaskInput {
    pub description: String,
    pub order: u32,
    pub estimated_time_minutes: Option<u32>,
    pub due_date: Option<String>,
}

#[derive(Deserialize)]
pub struct CreateTaskInput {
    pub user_id: UserRef,
    pub description: String,
    pub due_date: Option<String>,
    pub estimated_time_minutes: u32,
    pub raw_input: String,
    #[serde(default)]
    pub subtasks: Vec<NewSubTaskInput>,
}

#[derive(Deserialize)]
pub struct CreateShoppingItemsInput {
    pub user_id: UserRef,
    pub items: Vec<String>,
    pub raw_input: String,
}

#[derive(Deserialize)]
pub struct CreateCalendarEventInput {
    pub user_id: UserRef,
    pub description: String,
    pub event_date: String,
    pub event_time: Option<String>,
    pub raw_input: String,
}

#[derive(Default)]
pub struct Store {
    next_id: i64,
    users: Vec<User>,
    tasks: Vec<Task>,
    shopping_items: Vec<ShoppingItem>,
    calendar_events: Vec<CalendarEvent>,
}

impl Store {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn add_user(&mut self, email: &str, first_name: Option<String>) -> User {
        let user = User {
            id: self.next_id(),
            email: email.to_string(),
            first_name,
            created_at: now(),
        };
        self.users.push(user.clone());
        user
    }

    fn add_task(&mut self, user_id: i64, description: &str, due_date: Option<String>, raw_input: &str) -> Task {
        let task = Task {
            id: self.next_id(),
            user_id,
            description: description.to_string(),
            due_date,
            estimated_time_minutes: None,
            completed: false,
            raw_input: raw_input.to_string(),
            subtasks: Vec::new(),
            created_at: now(),
        };
        self.tasks.push(task.clone());
        task
    }

    fn add_shopping_item(&mut self, user_id: i64, description: &str, raw_input: &str) -> ShoppingItem {
        let item = ShoppingItem {
            id: self.next_id(),
            user_id,
            description: description.to_string(),
            completed: false,
            raw_input: raw_input.to_string(),
            created_at: now(),
        };
        self.shopping_items.push(item.clone());
        item
    }

    fn add_calendar_event(
        &mut self,
        user_id: i64,
        description: &str,
        event_date: String,
        event_time: Option<String>,
        raw_input: &str,
    ) -> CalendarEvent {
        let event = CalendarEvent {
            id: self.next_id(),
            user_id,
            description: description.to_string(),
            event_date,
            event_time,
            raw_input: raw_input.to_string(),
            created_at: now(),
        };
        self.calendar_events.push(event.clone());
        event
    }
}

pub type Db = Arc<RwLock<Store>>;

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Store::default()));
    Router::new()
        .route("/", get(root))
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
        .route("/brain-dumps", post(submit_brain_dump))
        .route("/tasks", post(create_task))
        .route("/shopping-items", post(create_shopping_items))
        .route("/calendar-events", post(create_calendar_event))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

/// Naive ISO-8601 with microseconds, as the real backend emits.
fn now() -> String {
    Utc::now().naive_utc().format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}

fn unprocessable(detail: &str) -> (StatusCode, Json<Value>) {
    (StatusCode::UNPROCESSABLE_ENTITY, Json(json!({ "detail": detail })))
}

fn valid_date(raw: &str) -> bool {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").is_ok()
}

fn valid_time(raw: &str) -> bool {
    NaiveTime::parse_from_str(raw, "%H:%M:%S").is_ok() || NaiveTime::parse_from_str(raw, "%H:%M").is_ok()
}

async fn root() -> Json<Value> {
    Json(json!({"message": "Klara Backend API", "status": "running"}))
}

async fn signup(
    State(db): State<Db>,
    Json(input): Json<SignupInput>,
) -> Result<(StatusCode, Json<Value>), (StatusCode, Json<Value>)> {
    let mut store = db.write().await;
    if store.users.iter().any(|u| u.email == input.email) {
        return Err((StatusCode::CONFLICT, Json(json!({"detail": "email already registered"}))));
    }
    let user = store.add_user(&input.email, Some(input.first_name));
    tracing::info!(user_id = user.id, "signed up");
    let token = Uuid::new_v4().to_string();
    Ok((StatusCode::CREATED, Json(json!({ "user": user, "token": token }))))
}

/// Get-or-create by email. Answers without a token, like the older backend.
async fn login(State(db): State<Db>, Json(input): Json<LoginInput>) -> Json<Value> {
    let mut store = db.write().await;
    let existing = store.users.iter().find(|u| u.email == input.email).cloned();
    let user = match existing {
        Some(user) => user,
        None => store.add_user(&input.email, None),
    };
    Json(json!({ "user": user }))
}

/// Split the text into clauses and sort each into tasks, shopping items or
/// calendar events:
/// - "buy …" is a shopping item
/// - "… on YYYY-MM-DD [at HH:MM]" is a calendar event
/// - anything else is a task, due tomorrow if it says "tomorrow"
async fn submit_brain_dump(
    State(db): State<Db>,
    Json(input): Json<BrainDumpInput>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let user_id = input.user_id.resolve().ok_or_else(|| unprocessable("invalid user_id"))?;
    if input.text.trim().is_empty() {
        return Err(unprocessable("text must not be empty"));
    }

    let mut store = db.write().await;
    let mut tasks = Vec::new();
    let mut shopping_items = Vec::new();
    let mut calendar_events = Vec::new();

    for clause in input
        .text
        .split([',', ';'])
        .flat_map(|part| part.split(" and "))
        .map(str::trim)
        .filter(|c| !c.is_empty())
    {
        let words: Vec<&str> = clause.split_whitespace().collect();
        if clause.to_lowercase().starts_with("buy ") {
            shopping_items.push(store.add_shopping_item(user_id, clause, &input.text));
        } else if let Some(pos) = words.iter().position(|w| *w == "on") {
            let date = words.get(pos + 1).copied().filter(|d| valid_date(d));
            match date {
                Some(date) => {
                    let time = words
                        .iter()
                        .position(|w| *w == "at")
                        .and_then(|at| words.get(at + 1).copied())
                        .filter(|t| valid_time(t))
                        .map(str::to_string);
                    let description = words[..pos].join(" ");
                    calendar_events.push(store.add_calendar_event(
                        user_id,
                        &description,
                        date.to_string(),
                        time,
                        &input.text,
                    ));
                }
                None => tasks.push(store.add_task(user_id, clause, None, &input.text)),
            }
        } else {
            let due_date = clause
                .contains("tomorrow")
                .then(|| Utc::now().date_naive().checked_add_days(Days::new(1)))
                .flatten()
                .map(|d| d.format("%Y-%m-%d").to_string());
            tasks.push(store.add_task(user_id, clause, due_date, &input.text));
        }
    }

    tracing::info!(
        user_id,
        tasks = tasks.len(),
        shopping_items = shopping_items.len(),
        calendar_events = calendar_events.len(),
        "processed brain dump"
    );
    Ok(Json(json!({
        "tasks": tasks,
        "shopping_items": shopping_items,
        "calendar_events": calendar_events,
    })))
}

async fn create_task(
    State(db): State<Db>,
    Json(input): Json<CreateTaskInput>,
) -> Result<(StatusCode, Json<Task>), (StatusCode, Json<Value>)> {
    let user_id = input.user_id.resolve().ok_or_else(|| unprocessable("invalid user_id"))?;
    let dates = std::iter::once(input.due_date.as_deref())
        .chain(input.subtasks.iter().map(|s| s.due_date.as_deref()));
    for date in dates.flatten() {
        if !valid_date(date) {
            return Err(unprocessable("due_date must be YYYY-MM-DD"));
        }
    }

    let mut store = db.write().await;
    let mut task = store.add_task(user_id, &input.description, input.due_date, &input.raw_input);
    task.estimated_time_minutes = Some(input.estimated_time_minutes);
    for sub in input.subtasks {
        let subtask = SubTask {
            id: store.next_id(),
            parent_task_id: task.id,
            description: sub.description,
            estimated_time_minutes: sub.estimated_time_minutes,
            due_date: sub.due_date,
            order: sub.order,
            completed: false,
            created_at: now(),
        };
        task.subtasks.push(subtask);
    }
    if let Some(stored) = store.tasks.iter_mut().find(|t| t.id == task.id) {
        *stored = task.clone();
    }
    Ok((StatusCode::CREATED, Json(task)))
}

async fn create_shopping_items(
    State(db): State<Db>,
    Json(input): Json<CreateShoppingItemsInput>,
) -> Result<(StatusCode, Json<Vec<ShoppingItem>>), (StatusCode, Json<Value>)> {
    let user_id = input.user_id.resolve().ok_or_else(|| unprocessable("invalid user_id"))?;
    let mut store = db.write().await;
    let items = input
        .items
        .iter()
        .map(|description| store.add_shopping_item(user_id, description, &input.raw_input))
        .collect();
    Ok((StatusCode::CREATED, Json(items)))
}

async fn create_calendar_event(
    State(db): State<Db>,
    Json(input): Json<CreateCalendarEventInput>,
) -> Result<(StatusCode, Json<CalendarEvent>), (StatusCode, Json<Value>)> {
    let user_id = input.user_id.resolve().ok_or_else(|| unprocessable("invalid user_id"))?;
    if !valid_date(&input.event_date) {
        return Err(unprocessable("event_date must be YYYY-MM-DD"));
    }
    if input.event_time.as_deref().is_some_and(|t| !valid_time(t)) {
        return Err(unprocessable("event_time must be HH:MM or HH:MM:SS"));
    }
    let mut store = db.write().await;
    let event = store.add_calendar_event(
        user_id,
        &input.description,
        input.event_date,
        input.event_time,
        &input.raw_input,
    );
    Ok((StatusCode::CREATED, Json(event)))
}
