//! End-to-end tests against an in-process stub of the Backend API.
//!
//! The stub serves the same REST/JSON contract the real backend does:
//! form-encoded login, bearer auth on protected routes, `{detail}`
//! validation bodies, multipart document upload, and a scripted task
//! endpoint that advances one state per poll.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Form, Json, Multipart, Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::routing::{delete, get, patch, post};
use axum::Router;
use serde_json::{json, Value};

use docq::client::ApiClient;
use docq::config::{ApiConfig, PollingConfig};
use docq::documents::DocumentFeed;
use docq::error::{ApiError, ValidationDetail};
use docq::health::HealthMonitor;
use docq::lifecycle::ProjectEvent;
use docq::messages::MessageFeed;
use docq::models::{DocumentStatus, ProjectStatus, Role, TaskStatus};
use docq::projects::ProjectFeed;
use docq::session::Session;
use docq::task::TaskMonitor;

const TOKEN: &str = "it-token";
const USERNAME: &str = "ada@example.com";
const PASSWORD: &str = "secret";

// ============ Stub backend ============

#[derive(Default)]
struct Backend {
    projects: Vec<Value>,
    documents: BTreeMap<String, Vec<Value>>,
    messages: BTreeMap<String, Vec<Value>>,
    tasks: BTreeMap<String, TaskScript>,
    next_id: u64,
}

/// A scripted task: each GET returns the next state, sticking on the last.
struct TaskScript {
    states: Vec<Value>,
    cursor: usize,
}

impl Backend {
    fn fresh_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}{}", prefix, self.next_id)
    }
}

type AppState = Arc<Mutex<Backend>>;

type Reply = Result<Json<Value>, (StatusCode, Json<Value>)>;

fn not_found() -> (StatusCode, Json<Value>) {
    (StatusCode::NOT_FOUND, Json(json!({"detail": "Not found"})))
}

fn authorized(headers: &HeaderMap) -> Result<(), (StatusCode, Json<Value>)> {
    let expected = format!("Bearer {}", TOKEN);
    let ok = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == expected);
    if ok {
        Ok(())
    } else {
        Err((
            StatusCode::UNAUTHORIZED,
            Json(json!({"detail": "Not authenticated"})),
        ))
    }
}

async fn get_health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "services": {"database": "up", "embedding": "up"}
    }))
}

async fn post_login(Form(fields): Form<BTreeMap<String, String>>) -> Reply {
    let username = fields.get("username").map(String::as_str);
    let password = fields.get("password").map(String::as_str);
    if username == Some(USERNAME) && password == Some(PASSWORD) {
        Ok(Json(json!({"access_token": TOKEN, "token_type": "bearer"})))
    } else {
        Err((
            StatusCode::UNAUTHORIZED,
            Json(json!({"detail": "Incorrect username or password"})),
        ))
    }
}

async fn post_users(Json(body): Json<Value>) -> Reply {
    let email = body["email"].as_str().unwrap_or_default();
    if !email.contains('@') {
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({"detail": {"email": "value is not a valid email address"}})),
        ));
    }
    Ok(Json(json!({
        "id": "u1",
        "name": body["name"],
        "username": body["username"],
        "email": body["email"],
    })))
}

async fn list_projects(State(state): State<AppState>, headers: HeaderMap) -> Reply {
    authorized(&headers)?;
    let backend = state.lock().unwrap();
    Ok(Json(Value::Array(backend.projects.clone())))
}

async fn create_project(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Reply {
    authorized(&headers)?;
    let name = body["name"].as_str().unwrap_or_default();
    if name.trim().is_empty() {
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({"detail": "Project name must not be empty"})),
        ));
    }
    let mut backend = state.lock().unwrap();
    let id = backend.fresh_id("p");
    let project = json!({"id": id, "name": name, "status": "created"});
    backend.projects.push(project.clone());
    Ok(Json(project))
}

async fn rename_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Reply {
    authorized(&headers)?;
    let mut backend = state.lock().unwrap();
    let project = backend
        .projects
        .iter_mut()
        .find(|p| p["id"] == json!(id))
        .ok_or_else(not_found)?;
    project["name"] = body["name"].clone();
    Ok(Json(project.clone()))
}

async fn delete_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Reply {
    authorized(&headers)?;
    let mut backend = state.lock().unwrap();
    let before = backend.projects.len();
    backend.projects.retain(|p| p["id"] != json!(id));
    if backend.projects.len() == before {
        return Err(not_found());
    }
    backend.documents.remove(&id);
    backend.messages.remove(&id);
    backend.tasks.remove(&id);
    Ok(Json(json!({})))
}

async fn list_documents(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Reply {
    authorized(&headers)?;
    let backend = state.lock().unwrap();
    let docs = backend.documents.get(&id).cloned().unwrap_or_default();
    Ok(Json(Value::Array(docs)))
}

async fn upload_documents(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Reply {
    authorized(&headers)?;
    let mut parts = Vec::new();
    while let Some(field) = multipart.next_field().await.unwrap() {
        if field.name() != Some("documents") {
            continue;
        }
        let filename = field.file_name().unwrap_or("document").to_string();
        let bytes = field.bytes().await.unwrap();
        parts.push((filename, bytes.len()));
    }

    let mut backend = state.lock().unwrap();
    let mut records = Vec::new();
    for (filename, size) in parts {
        // The stub rejects executables the way the real ingester rejects
        // unsupported formats.
        let accepted = !filename.ends_with(".exe");
        let doc_id = backend.fresh_id("d");
        let record = json!({
            "id": doc_id,
            "filename": filename,
            "size": size,
            "status": if accepted { "uploaded" } else { "failed" },
        });
        if accepted {
            backend.documents.entry(id.clone()).or_default().push(record.clone());
        }
        records.push(record);
    }
    Ok(Json(Value::Array(records)))
}

async fn delete_document(
    State(state): State<AppState>,
    Path((id, doc_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Reply {
    authorized(&headers)?;
    let mut backend = state.lock().unwrap();
    let docs = backend.documents.entry(id.clone()).or_default();
    let before = docs.len();
    docs.retain(|d| d["id"] != json!(doc_id));
    if docs.len() == before {
        return Err(not_found());
    }
    // An emptied knowledge base resets the project.
    if docs.is_empty() {
        backend.tasks.remove(&id);
        if let Some(project) = backend.projects.iter_mut().find(|p| p["id"] == json!(id)) {
            project["status"] = json!("created");
        }
    }
    Ok(Json(json!({})))
}

async fn list_chunks(
    State(state): State<AppState>,
    Path((id, doc_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Reply {
    authorized(&headers)?;
    let backend = state.lock().unwrap();
    let exists = backend
        .documents
        .get(&id)
        .is_some_and(|docs| docs.iter().any(|d| d["id"] == json!(doc_id)));
    if !exists {
        return Err(not_found());
    }
    Ok(Json(json!([
        {"id": "c1", "preview": "Revenue grew 12% quarter over quarter", "hasText": true, "hasImage": false},
        {"id": "c2", "preview": "Figure 3: regional breakdown", "hasText": false, "hasImage": true},
    ])))
}

async fn list_messages(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Reply {
    authorized(&headers)?;
    let backend = state.lock().unwrap();
    let messages = backend.messages.get(&id).cloned().unwrap_or_default();
    Ok(Json(Value::Array(messages)))
}

async fn post_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Reply {
    authorized(&headers)?;
    let content = body["content"].as_str().unwrap_or_default().to_string();
    let mut backend = state.lock().unwrap();
    let user_id = backend.fresh_id("m");
    let assistant_id = backend.fresh_id("m");
    let user = json!({"id": user_id, "role": "user", "content": content, "citations": []});
    let assistant = json!({
        "id": assistant_id,
        "role": "assistant",
        "content": format!("According to the documents: {}", content),
        "citations": [
            {"id": "cit1", "documentName": "report.pdf", "pageNumber": 4, "snippet": "…grew 12%…"}
        ],
    });
    let log = backend.messages.entry(id).or_default();
    log.push(user.clone());
    log.push(assistant.clone());
    Ok(Json(json!([user, assistant])))
}

async fn get_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Reply {
    authorized(&headers)?;
    let mut backend = state.lock().unwrap();
    let script = backend.tasks.get_mut(&id).ok_or_else(not_found)?;
    let idx = script.cursor.min(script.states.len() - 1);
    script.cursor += 1;
    let current = script.states[idx].clone();
    if current["status"] == json!("SUCCESS") {
        if let Some(project) = backend.projects.iter_mut().find(|p| p["id"] == json!(id)) {
            project["status"] = json!("processed");
        }
    }
    Ok(Json(current))
}

async fn post_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Reply {
    authorized(&headers)?;
    let mut backend = state.lock().unwrap();
    if let Some(project) = backend.projects.iter_mut().find(|p| p["id"] == json!(id)) {
        project["status"] = json!("processing");
    } else {
        return Err(not_found());
    }
    let states = vec![
        json!({"status": "PENDING"}),
        json!({"status": "PROCESSING", "stage": "chunking", "progress": 0.5}),
        json!({"status": "PROCESSING", "stage": "embedding", "progress": 0.3}),
        json!({"status": "SUCCESS", "progress": 1.0}),
    ];
    let first = states[0].clone();
    backend.tasks.insert(id, TaskScript { states, cursor: 0 });
    Ok(Json(first))
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(get_health))
        .route("/api/login", post(post_login))
        .route("/api/users", post(post_users))
        .route("/api/projects", get(list_projects).post(create_project))
        .route(
            "/api/projects/{id}",
            patch(rename_project).delete(delete_project),
        )
        .route(
            "/api/projects/{id}/documents",
            get(list_documents).post(upload_documents),
        )
        .route(
            "/api/projects/{id}/documents/{doc_id}",
            delete(delete_document),
        )
        .route(
            "/api/projects/{id}/documents/{doc_id}/chunks",
            get(list_chunks),
        )
        .route(
            "/api/projects/{id}/messages",
            get(list_messages).post(post_message),
        )
        .route("/api/projects/{id}/task", get(get_task).post(post_task))
        .with_state(state)
}

async fn spawn_backend() -> SocketAddr {
    let state: AppState = Arc::new(Mutex::new(Backend::default()));
    let app = router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn client_for(addr: SocketAddr, token: Option<&str>) -> Arc<ApiClient> {
    let config = ApiConfig {
        base_url: format!("http://{}", addr),
        timeout_secs: 5,
        token_path: PathBuf::new(),
    };
    let session = Arc::new(Session::ephemeral(token.map(String::from)));
    Arc::new(ApiClient::new(&config, session).unwrap())
}

// ============ Tests ============

#[tokio::test]
async fn health_is_reachable_without_a_token() {
    let addr = spawn_backend().await;
    let client = client_for(addr, None);

    let health = client.health().await.unwrap();
    assert!(health.is_healthy());
    assert_eq!(health.services.get("database").map(String::as_str), Some("up"));
}

#[tokio::test]
async fn signup_then_login_yields_a_working_token() {
    let addr = spawn_backend().await;
    let client = client_for(addr, None);

    let user = client
        .signup("Ada", USERNAME, USERNAME, PASSWORD)
        .await
        .unwrap();
    assert_eq!(user.email, USERNAME);

    let token = client.login(USERNAME, PASSWORD).await.unwrap();
    assert_eq!(token, TOKEN);

    let authed = client_for(addr, Some(&token));
    assert!(authed.projects().await.unwrap().is_empty());
}

#[tokio::test]
async fn login_with_wrong_password_is_an_auth_error() {
    let addr = spawn_backend().await;
    let client = client_for(addr, None);

    match client.login(USERNAME, "wrong").await {
        Err(ApiError::Auth) => {}
        other => panic!("expected Auth, got {:?}", other.map(|_| ())),
    }
}

#[tokio::test]
async fn signup_with_invalid_email_reports_the_offending_field() {
    let addr = spawn_backend().await;
    let client = client_for(addr, None);

    match client.signup("Ada", "ada", "not-an-email", PASSWORD).await {
        Err(ApiError::Validation(ValidationDetail::Fields(fields))) => {
            assert!(fields.contains_key("email"));
        }
        other => panic!("expected field validation error, got {:?}", other.map(|_| ())),
    }
}

#[tokio::test]
async fn stale_token_is_cleared_by_a_401() {
    let addr = spawn_backend().await;
    let client = client_for(addr, Some("expired"));
    assert!(client.session().is_authenticated());

    match client.projects().await {
        Err(ApiError::Auth) => {}
        other => panic!("expected Auth, got {:?}", other.map(|_| ())),
    }
    assert!(!client.session().is_authenticated());
}

#[tokio::test]
async fn project_rename_and_delete() {
    let addr = spawn_backend().await;
    let client = client_for(addr, Some(TOKEN));

    let project = client.create_project("Drafts").await.unwrap();
    let renamed = client.rename_project(&project.id, "Reports").await.unwrap();
    assert_eq!(renamed.name, "Reports");

    client.delete_project(&project.id).await.unwrap();
    assert!(client.projects().await.unwrap().is_empty());

    match client.rename_project(&project.id, "Gone").await {
        Err(ApiError::NotFound) => {}
        other => panic!("expected NotFound, got {:?}", other.map(|_| ())),
    }
}

#[tokio::test]
async fn empty_project_name_is_a_validation_error() {
    let addr = spawn_backend().await;
    let client = client_for(addr, Some(TOKEN));

    match client.create_project("  ").await {
        Err(ApiError::Validation(_)) => {}
        other => panic!("expected Validation, got {:?}", other.map(|_| ())),
    }
}

#[tokio::test]
async fn no_task_before_processing_starts() {
    let addr = spawn_backend().await;
    let client = client_for(addr, Some(TOKEN));
    let project = client.create_project("Docs").await.unwrap();

    assert!(client.task(&project.id).await.unwrap().is_none());

    let monitor = TaskMonitor::new(client.clone(), &project.id, Duration::from_millis(20));
    assert!(monitor.fetch().await.unwrap().is_none());
    assert!(monitor.error().is_none());
}

#[tokio::test]
async fn document_pipeline_end_to_end() {
    let addr = spawn_backend().await;
    let client = client_for(addr, Some(TOKEN));

    let project = client.create_project("Docs").await.unwrap();
    assert_eq!(project.status, ProjectStatus::Created);

    // One good file, one the backend rejects.
    let dir = tempfile::tempdir().unwrap();
    let report = dir.path().join("report.pdf");
    let bogus = dir.path().join("tool.exe");
    std::fs::write(&report, b"%PDF-1.7 quarterly report").unwrap();
    std::fs::write(&bogus, b"MZ").unwrap();

    let feed = DocumentFeed::new(client.clone(), &project.id);
    let records = feed.upload(&[report, bogus]).await.unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].status, DocumentStatus::Uploaded);
    assert_eq!(records[1].status, DocumentStatus::Failed);

    let listed = feed.refresh().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].filename, "report.pdf");

    // Kick off processing and poll to completion.
    let monitor = TaskMonitor::new(client.clone(), &project.id, Duration::from_millis(20));
    let task = monitor.start().await.unwrap();
    assert_eq!(task.status, TaskStatus::Pending);

    let projects = client.projects().await.unwrap();
    assert_eq!(projects[0].status, ProjectStatus::Processing);

    for _ in 0..200 {
        if !monitor.is_polling() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(!monitor.is_polling(), "task never reached a terminal status");
    let finished = monitor.task().unwrap();
    assert_eq!(finished.status, TaskStatus::Success);

    let projects = client.projects().await.unwrap();
    assert_eq!(projects[0].status, ProjectStatus::Processed);

    let chunks = client.chunks(&project.id, &listed[0].id).await.unwrap();
    assert!(!chunks.is_empty());

    // Deleting the last document empties the knowledge base and resets
    // the project.
    let emptied = feed.delete(&listed[0].id).await.unwrap();
    assert!(emptied);

    let projects = client.projects().await.unwrap();
    assert_eq!(projects[0].status, ProjectStatus::Created);
    assert!(client.task(&project.id).await.unwrap().is_none());
}

#[tokio::test]
async fn delete_from_a_stale_feed_does_not_report_an_emptied_knowledge_base() {
    let addr = spawn_backend().await;
    let client = client_for(addr, Some(TOKEN));
    let project = client.create_project("Docs").await.unwrap();

    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("first.pdf");
    let second = dir.path().join("second.pdf");
    std::fs::write(&first, b"%PDF-1.7 first").unwrap();
    std::fs::write(&second, b"%PDF-1.7 second").unwrap();
    let uploaded = client
        .upload_documents(&project.id, &[first, second])
        .await
        .unwrap();
    assert_eq!(uploaded.len(), 2);

    // A fresh feed that never refreshed: its cache is empty, but the
    // server still holds the second document after this delete.
    let feed = DocumentFeed::new(client.clone(), &project.id);
    let emptied = feed.delete(&uploaded[0].id).await.unwrap();
    assert!(!emptied, "one document remains server-side");
    assert_eq!(feed.documents().len(), 1);
    assert_eq!(feed.documents()[0].filename, "second.pdf");

    let emptied = feed.delete(&uploaded[1].id).await.unwrap();
    assert!(emptied);
    assert!(feed.documents().is_empty());
}

#[tokio::test]
async fn project_feed_mutators_keep_the_store_in_sync() {
    let addr = spawn_backend().await;
    let client = client_for(addr, Some(TOKEN));

    let feed = ProjectFeed::new(client, Duration::from_millis(20));
    let project = feed.create("Drafts").await.unwrap();
    assert_eq!(feed.projects().len(), 1);

    feed.rename(&project.id, "Reports").await.unwrap();
    assert_eq!(feed.projects()[0].name, "Reports");

    // Local lifecycle events patch the cached status ahead of the next
    // refresh.
    feed.apply_event(&project.id, ProjectEvent::DocumentsUploaded);
    assert_eq!(feed.projects()[0].status, ProjectStatus::Processing);

    feed.delete(&project.id).await.unwrap();
    assert!(feed.projects().is_empty());
    assert!(feed.error().is_none());
}

#[tokio::test]
async fn project_feed_polls_only_while_something_is_processing() {
    let addr = spawn_backend().await;
    let client = client_for(addr, Some(TOKEN));

    let feed = ProjectFeed::new(client.clone(), Duration::from_millis(20));
    let project = feed.create("Docs").await.unwrap();

    feed.poll_while_processing();
    assert!(!feed.is_polling(), "nothing is processing yet");

    // Starting the task flips the project to processing; the monitor's
    // polls walk the scripted task to SUCCESS, which marks the project
    // processed server-side.
    let monitor = TaskMonitor::new(client, &project.id, Duration::from_millis(20));
    monitor.start().await.unwrap();

    feed.refresh().await.unwrap();
    assert_eq!(feed.projects()[0].status, ProjectStatus::Processing);
    feed.poll_while_processing();
    assert!(feed.is_polling());

    for _ in 0..200 {
        if !feed.is_polling() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(!feed.is_polling(), "poll must stop once nothing is processing");
    assert_eq!(feed.projects()[0].status, ProjectStatus::Processed);
    assert!(feed.error().is_none());
}

#[tokio::test]
async fn health_monitor_stops_once_healthy_unless_continuous() {
    let addr = spawn_backend().await;
    let client = client_for(addr, None);

    let monitor = HealthMonitor::new(client.clone(), Duration::from_millis(20), false);
    monitor.start_polling();
    for _ in 0..100 {
        if !monitor.is_polling() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(!monitor.is_polling(), "stub reports healthy; polling must stop");
    assert!(monitor.health().unwrap().is_healthy());

    // The config knob keeps the monitor polling past healthy.
    let polling = PollingConfig {
        health_interval_ms: 20,
        health_resume_on_degraded: true,
        ..PollingConfig::default()
    };
    let continuous = HealthMonitor::from_config(client, &polling);
    continuous.start_polling();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(continuous.is_polling(), "resume-on-degraded never self-stops");
    assert!(continuous.health().unwrap().is_healthy());
    continuous.stop_polling();
    assert!(!continuous.is_polling());
}

#[tokio::test]
async fn chat_send_commits_the_provisional_message() {
    let addr = spawn_backend().await;
    let client = client_for(addr, Some(TOKEN));
    let project = client.create_project("Docs").await.unwrap();

    let feed = MessageFeed::new(client.clone(), &project.id);
    let confirmed = feed.send("what changed in Q2?").await.unwrap();
    assert_eq!(confirmed.len(), 2);

    let messages = feed.messages();
    assert_eq!(messages.len(), 2);
    assert!(messages.iter().all(|m| !m.pending && !m.error));
    assert_eq!(messages[0].role, Role::User);
    assert_eq!(messages[0].content, "what changed in Q2?");
    assert_eq!(messages[1].role, Role::Assistant);
    assert_eq!(messages[1].citations[0].document_name, "report.pdf");

    // No provisional ids survive a successful send.
    assert!(messages.iter().all(|m| !m.id.starts_with("local-")));
}

#[tokio::test]
async fn chat_send_against_unreachable_backend_keeps_the_failed_message() {
    // Bind and drop a listener so the port is closed.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = client_for(addr, Some(TOKEN));
    let feed = MessageFeed::new(client, "p1");

    match feed.send("anyone there?").await {
        Err(ApiError::Network(_)) => {}
        other => panic!("expected Network, got {:?}", other.map(|_| ())),
    }

    let messages = feed.messages();
    assert_eq!(messages.len(), 1, "failed send must not duplicate");
    assert!(!messages[0].pending);
    assert!(messages[0].error);
    assert!(messages[0].id.starts_with("local-"));

    // The user dismisses it; nothing is retried.
    assert!(feed.dismiss(&messages[0].id));
    assert!(feed.messages().is_empty());
}
