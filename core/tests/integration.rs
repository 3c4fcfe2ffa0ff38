//! End-to-end flows against the live mock backend.
//!
//! # Design
//! Starts the mock server on a random port, then drives every `ApiClient`
//! operation over real HTTP with the default `ureq` transport, converting
//! replies into domain models the way an application would.

use klara_core::{
    ApiClient, ApiError, BrainDumpExtraction, BrainDumpReply, CalendarEvent, ClientConfig,
    CreateCalendarEventRequest, CreateShoppingItemsRequest, CreateTaskRequest, FailureKind,
    MemoryStorage, NewSubTask, RecordId, SessionStore, ShoppingItem, Task,
};

fn start_mock_server() -> String {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener).await
        })
        .unwrap();
    });

    format!("http://{addr}")
}

fn api(base_url: &str) -> ApiClient {
    ApiClient::from_config(&ClientConfig::new(base_url))
}

#[test]
fn signup_login_and_session_lifecycle() {
    let api = api(&start_mock_server());
    let storage = MemoryStorage::new();

    // Step 1: signup returns a user and a token.
    let session = api.signup("ada@example.com", "Ada").unwrap();
    assert_eq!(session.user.email, "ada@example.com");
    assert_eq!(session.user.display_name.as_deref(), Some("Ada"));
    assert!(session.token.is_some());

    // Step 2: remember the user.
    let mut store = SessionStore::open(storage.clone());
    store.set_user(session.user.clone()).unwrap();

    // Step 3: "restart" and find the same user.
    drop(store);
    let mut store = SessionStore::open(storage.clone());
    assert_eq!(store.user(), Some(&session.user));

    // Step 4: login answers without a token and still succeeds.
    let login = api.login("ada@example.com").unwrap();
    assert_eq!(login.user.id, session.user.id);
    assert!(login.token.is_none());

    // Step 5: sign out.
    store.clear_user().unwrap();
    assert!(SessionStore::open(storage).user().is_none());

    // Step 6: signing up twice is a server-responded error.
    let err = api.signup("ada@example.com", "Ada").unwrap_err();
    let transport = err.as_transport().expect("transport error");
    assert_eq!(transport.kind(), FailureKind::ServerResponded);
    assert_eq!(transport.status(), Some(409));
}

#[test]
fn brain_dump_becomes_domain_models() {
    let api = api(&start_mock_server());
    let user = api.login("sam@example.com").unwrap().user;

    let reply = api
        .submit_brain_dump("buy milk and call mom tomorrow at 3pm", user.id.clone())
        .unwrap();
    let response = match reply {
        BrainDumpReply::Extracted(response) => response,
        BrainDumpReply::Echoed(echo) => panic!("unexpected echo: {echo:?}"),
    };
    let extraction = BrainDumpExtraction::try_from(response).unwrap();

    assert_eq!(extraction.tasks.len(), 1);
    let task = &extraction.tasks[0];
    assert_eq!(task.owner_id, user.id);
    assert_eq!(task.description, "call mom tomorrow at 3pm");
    assert!(task.due_date.is_some());
    assert!(task.subtasks.is_empty());
    assert_eq!(task.raw_input_text, "buy milk and call mom tomorrow at 3pm");

    assert_eq!(extraction.shopping_items.len(), 1);
    assert_eq!(extraction.shopping_items[0].description, "buy milk");
    assert!(extraction.calendar_events.is_empty());
}

#[test]
fn string_user_id_is_accepted() {
    let api = api(&start_mock_server());
    let reply = api
        .submit_brain_dump("dentist on 2024-02-10 at 14:30", "42")
        .unwrap();
    let extraction = BrainDumpExtraction::try_from(reply.into_extracted().unwrap()).unwrap();
    assert_eq!(extraction.calendar_events.len(), 1);
    let event = &extraction.calendar_events[0];
    assert_eq!(event.owner_id, RecordId::Number(42));
    assert_eq!(event.event_date, chrono::NaiveDate::from_ymd_opt(2024, 2, 10).unwrap());
    assert_eq!(event.event_time, chrono::NaiveTime::from_hms_opt(14, 30, 0));
}

#[test]
fn approval_endpoints_round_trip() {
    let api = api(&start_mock_server());

    let task = api
        .create_task(&CreateTaskRequest {
            user_id: RecordId::Number(7),
            description: "Plan party".to_string(),
            due_date: Some("2024-03-02".to_string()),
            estimated_time_minutes: 90,
            raw_input: "plan the party".to_string(),
            subtasks: vec![
                NewSubTask {
                    description: "Send invites".to_string(),
                    order: 2,
                    estimated_time_minutes: None,
                    due_date: None,
                },
                NewSubTask {
                    description: "Book venue".to_string(),
                    order: 1,
                    estimated_time_minutes: Some(30),
                    due_date: Some("2024-02-20".to_string()),
                },
            ],
        })
        .unwrap();
    let task = Task::try_from(task).unwrap();
    assert_eq!(task.estimated_minutes, Some(90));
    assert_eq!(task.subtasks.len(), 2);
    assert!(task.subtasks.iter().all(|s| s.parent_task_id == task.id));
    assert_eq!(task.subtasks_by_order()[0].description, "Book venue");

    let items = api
        .create_shopping_items(&CreateShoppingItemsRequest {
            user_id: RecordId::Number(7),
            items: vec!["milk".to_string(), "eggs".to_string()],
            raw_input: "milk and eggs".to_string(),
        })
        .unwrap();
    let items: Vec<ShoppingItem> = items
        .into_iter()
        .map(ShoppingItem::try_from)
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(items.len(), 2);
    assert!(items.iter().all(|i| !i.completed));

    let event = api
        .create_calendar_event(&CreateCalendarEventRequest {
            user_id: RecordId::Number(7),
            description: "Dentist".to_string(),
            event_date: "2024-02-10".to_string(),
            event_time: None,
            raw_input: "dentist".to_string(),
        })
        .unwrap();
    let event = CalendarEvent::try_from(event).unwrap();
    assert!(event.event_time.is_none());
}

#[test]
fn rejected_payload_surfaces_as_server_error() {
    let api = api(&start_mock_server());
    let err = api
        .create_calendar_event(&CreateCalendarEventRequest {
            user_id: RecordId::Number(7),
            description: "Dentist".to_string(),
            event_date: "next tuesday".to_string(),
            event_time: None,
            raw_input: "dentist".to_string(),
        })
        .unwrap_err();
    assert!(matches!(
        err,
        ApiError::Transport(klara_core::TransportError::ServerResponded { status: 422, .. })
    ));
}

fn start_failing_server() -> String {
    use axum::{http::StatusCode, routing::post, Json, Router};

    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let app = Router::new().route(
                "/brain-dumps",
                post(|| async {
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        Json(serde_json::json!({"error": "timeout"})),
                    )
                }),
            );
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            axum::serve(listener, app).await
        })
        .unwrap();
    });

    format!("http://{addr}")
}

#[test]
fn server_failure_reaches_caller_unmodified() {
    let api = api(&start_failing_server());
    let err = api.submit_brain_dump("anything", 1).unwrap_err();
    match err {
        ApiError::Transport(klara_core::TransportError::ServerResponded { status, body }) => {
            assert_eq!(status, 500);
            let body: serde_json::Value = serde_json::from_str(&body).unwrap();
            assert_eq!(body, serde_json::json!({"error": "timeout"}));
        }
        other => panic!("expected server error, got {other:?}"),
    }
}

#[test]
fn refused_connection_is_no_response() {
    // bind then drop to get a port nothing listens on
    let addr = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap();
    let api = api(&format!("http://{addr}"));

    let err = api.login("a@b.com").unwrap_err();
    let transport = err.as_transport().expect("transport error");
    assert_eq!(transport.kind(), FailureKind::NoResponse);
    assert_eq!(transport.status(), None);
}

#[test]
fn stalled_server_times_out_as_no_response() {
    use std::time::{Duration, Instant};

    use klara_core::{KlaraClient, UreqTransport};

    // accepts the connection, then never answers
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    std::thread::spawn(move || {
        let (_stream, _) = listener.accept().unwrap();
        std::thread::sleep(Duration::from_secs(5));
    });

    let api = ApiClient::with_transport(
        KlaraClient::new(&format!("http://{addr}")),
        UreqTransport::new(Duration::from_millis(200)),
    );
    let started = Instant::now();
    let err = api.login("a@b.com").unwrap_err();

    assert!(started.elapsed() < Duration::from_secs(4));
    let transport = err.as_transport().expect("transport error");
    assert_eq!(transport.kind(), FailureKind::NoResponse);
    assert_eq!(transport.status(), None);
}
