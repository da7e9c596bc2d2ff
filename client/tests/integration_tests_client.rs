use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use axum::extract::{Json, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, patch, post, put};
use axum::Router;
use client::api::{ApiClient, ApiError, RequestOptions};
use client::forms::FormState;
use client::stores::{GoalStore, SearchStore, TaskStore, UserStore};
use client::validation::{Constraint, Field};
use common::SignInPayload;
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::time::{sleep, Duration};

// --- Mock backend ---
// A fresh in-memory backend per test, the same way the server crate builds
// a fresh database per test: no state leaks between cases.

#[derive(Clone)]
struct MockTask {
    id: &'static str,
    text: &'static str,
    completed: bool,
    recycled: bool,
}

struct Backend {
    tasks: Vec<MockTask>,
    signin_hits: usize,
    heartbeats: usize,
    search_hits: Vec<String>,
    goal_delay: HashMap<String, Duration>,
    offset_delay: Option<Duration>,
}

impl Backend {
    fn new() -> Self {
        Self {
            tasks: vec![
                MockTask {
                    id: "task-1",
                    text: "Read the book",
                    completed: false,
                    recycled: false,
                },
                MockTask {
                    id: "task-2",
                    text: "Ship a crate",
                    completed: true,
                    recycled: false,
                },
            ],
            signin_hits: 0,
            heartbeats: 0,
            search_hits: Vec::new(),
            goal_delay: HashMap::new(),
            offset_delay: None,
        }
    }

    fn tasks_completed(&self) -> usize {
        self.tasks.iter().filter(|t| t.completed && !t.recycled).count()
    }

    fn goal_json(&self, goal_id: &str) -> Value {
        let tasks: Vec<Value> = self
            .tasks
            .iter()
            .filter(|t| !t.recycled)
            .map(|t| {
                json!({
                    "id": t.id,
                    "goalId": goal_id,
                    "task": t.text,
                    "description": "",
                    "completed": t.completed,
                    "completedAt": t.completed.then(|| "2025-01-02T03:04:05Z"),
                    "difficulty": "medium",
                    "targetDate": null,
                    "createdAt": "2025-01-01T00:00:00Z",
                    "isRecycled": false,
                    "recycledAt": null,
                })
            })
            .collect();
        let total = tasks.len();
        let completed = self.tasks.iter().filter(|t| t.completed && !t.recycled).count();
        let progress = if total == 0 { 0 } else { completed * 100 / total };
        json!({
            "id": goal_id,
            "userId": "user-1",
            "title": format!("Goal {goal_id}"),
            "description": "",
            "createdAt": "2025-01-01T00:00:00Z",
            "targetDate": null,
            "completedAt": null,
            "status": "active",
            "progress": progress,
            "color": "#1f77b4",
            "public": false,
            "tasks": tasks,
            "isRecycled": false,
            "recycledAt": null,
        })
    }

    fn user_json(&self) -> Value {
        json!({
            "id": "user-1",
            "username": "testuser",
            "name": "Test User",
            "email": "user@example.com",
            "role": "user",
            "presence": "online",
            "lastActive": "2025-01-02T03:04:05Z",
            "goals": [],
            "goalsCompleted": 0,
            "tasksCompleted": self.tasks_completed(),
        })
    }
}

type Shared = Arc<Mutex<Backend>>;

async fn get_goal(State(backend): State<Shared>, Query(params): Query<HashMap<String, String>>) -> Json<Value> {
    let goal_id = params.get("goalId").cloned().unwrap_or_default();
    let delay = backend.lock().goal_delay.get(&goal_id).copied();
    if let Some(delay) = delay {
        sleep(delay).await;
    }
    let body = backend.lock().goal_json(&goal_id);
    Json(body)
}

async fn get_user(State(backend): State<Shared>) -> Json<Value> {
    Json(backend.lock().user_json())
}

async fn heartbeat(State(backend): State<Shared>) -> StatusCode {
    backend.lock().heartbeats += 1;
    StatusCode::NO_CONTENT
}

async fn sign_in(State(backend): State<Shared>, Json(payload): Json<Value>) -> (StatusCode, Json<Value>) {
    backend.lock().signin_hits += 1;
    if payload["email"] == "user@example.com" && payload["password"] == "longenough1" {
        (StatusCode::OK, Json(json!({ "ok": true })))
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({
                "title": "Sign in failed",
                "message": "Email or password is incorrect.",
                "code": "auth/invalid-credentials",
            })),
        )
    }
}

async fn put_task(State(backend): State<Shared>, Json(payload): Json<Value>) -> Json<Value> {
    let task_id = payload["taskId"].as_str().unwrap_or_default().to_string();
    let completed = payload["completed"].as_bool();
    let mut backend = backend.lock();
    for task in &mut backend.tasks {
        if task.id == task_id {
            if let Some(completed) = completed {
                task.completed = completed;
            }
        }
    }
    let goal_id = payload["goalId"].as_str().unwrap_or("goal-1").to_string();
    let body = backend.goal_json(&goal_id)["tasks"]
        .as_array()
        .and_then(|tasks| tasks.iter().find(|t| t["id"] == task_id.as_str()).cloned())
        .unwrap_or(Value::Null);
    Json(body)
}

async fn delete_task(State(backend): State<Shared>, Json(payload): Json<Value>) -> StatusCode {
    let task_id = payload["taskId"].as_str().unwrap_or_default();
    let mut backend = backend.lock();
    for task in &mut backend.tasks {
        if task.id == task_id {
            task.recycled = true;
        }
    }
    StatusCode::NO_CONTENT
}

async fn restore_task(State(backend): State<Shared>, Json(payload): Json<Value>) -> StatusCode {
    let task_id = payload["taskId"].as_str().unwrap_or_default();
    let mut backend = backend.lock();
    for task in &mut backend.tasks {
        if task.id == task_id {
            task.recycled = false;
        }
    }
    StatusCode::NO_CONTENT
}

async fn expired_user() -> (StatusCode, Json<Value>) {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({
            "title": "Session expired",
            "message": "Please sign in again.",
            "code": "auth/expired-token",
        })),
    )
}

async fn search(State(backend): State<Shared>, Query(params): Query<HashMap<String, String>>) -> Json<Value> {
    backend
        .lock()
        .search_hits
        .push(params.get("query").cloned().unwrap_or_default());
    let page = if params.contains_key("offset") {
        let delay = backend.lock().offset_delay;
        if let Some(delay) = delay {
            sleep(delay).await;
        }
        // Second page deliberately overlaps the first to exercise the
        // append-without-duplicates rule.
        json!({
            "profiles": [
                { "id": "p2", "username": "bob", "name": "Bob" },
                { "id": "p3", "username": "carol", "name": "Carol" },
            ],
            "goals": [],
            "tasks": [],
            "nextOffset": null,
        })
    } else {
        json!({
            "profiles": [
                { "id": "p1", "username": "alice", "name": "Alice" },
                { "id": "p2", "username": "bob", "name": "Bob" },
            ],
            "goals": [],
            "tasks": [],
            "nextOffset": "2",
        })
    };
    Json(page)
}

fn mock_router(backend: Shared) -> Router {
    Router::new()
        .route("/auth/signin", post(sign_in))
        .route("/user", get(get_user))
        .route("/user/heartbeat", patch(heartbeat))
        .route("/goal", get(get_goal))
        .route("/task", put(put_task).delete(delete_task))
        .route("/task/restore", put(restore_task))
        .route("/search", get(search))
        .with_state(backend)
}

/// Serves `app` on an ephemeral port and returns its base URL.
async fn spawn_server(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind mock server");
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

async fn setup() -> (Shared, Arc<ApiClient>) {
    let backend = Arc::new(Mutex::new(Backend::new()));
    let base_url = spawn_server(mock_router(backend.clone())).await;
    let api = Arc::new(ApiClient::new(base_url).unwrap());
    (backend, api)
}

#[tokio::test]
async fn stale_goal_response_is_discarded() {
    let (backend, api) = setup().await;
    // Goal A's response resolves well after goal B's.
    backend
        .lock()
        .goal_delay
        .insert("goal-A".to_string(), Duration::from_millis(300));

    let user = UserStore::new(api.clone());
    let goal = GoalStore::new(api, user);

    let (first, second) = tokio::join!(
        goal.get_data(Some("goal-A"), true),
        goal.get_data(Some("goal-B"), true),
    );
    first.unwrap();
    second.unwrap();

    // B was requested last, so B wins even though A landed last.
    assert_eq!(goal.focused_id().as_deref(), Some("goal-B"));
    assert!(!goal.loading());
}

#[tokio::test]
async fn stale_response_leaves_the_spinner_to_the_newer_request() {
    let (backend, api) = setup().await;
    {
        let mut backend = backend.lock();
        backend.goal_delay.insert("goal-A".to_string(), Duration::from_millis(100));
        backend.goal_delay.insert("goal-B".to_string(), Duration::from_millis(300));
    }

    let user = UserStore::new(api.clone());
    let goal = GoalStore::new(api, user);

    // A is requested first and lands first; B is requested second and is
    // still in flight when A's superseded response arrives.
    let store = goal.clone();
    let first = tokio::spawn(async move { store.get_data(Some("goal-A"), true).await });
    sleep(Duration::from_millis(20)).await;
    let store = goal.clone();
    let second = tokio::spawn(async move { store.get_data(Some("goal-B"), true).await });

    // After A landed but before B does, the spinner must still be up: the
    // superseded response may not clear the newer request's loading flag.
    sleep(Duration::from_millis(150)).await;
    assert!(goal.loading(), "stale response must not clear loading");

    first.await.unwrap().unwrap();
    second.await.unwrap().unwrap();
    assert_eq!(goal.focused_id().as_deref(), Some("goal-B"));
    assert!(!goal.loading());
}

#[tokio::test]
async fn deleting_then_undoing_a_task_restores_goal_and_counters() {
    let (_backend, api) = setup().await;
    let user = UserStore::new(api.clone());
    let goal = GoalStore::new(api.clone(), user.clone());
    let task = TaskStore::new(api, goal.clone(), user.clone());

    goal.get_data(Some("goal-1"), true).await.unwrap();
    user.get_data(true).await.unwrap();

    let tasks_before = goal.data().unwrap().tasks;
    let counter_before = user.data().unwrap().tasks_completed;
    assert_eq!(tasks_before.len(), 2);
    assert_eq!(counter_before, 1);

    // Delete the completed task: the goal list shrinks and the counter is
    // re-pulled, not decremented locally.
    let undo = task.delete_task("task-2", "goal-1").await.unwrap();
    assert_eq!(goal.data().unwrap().tasks.len(), 1);
    assert_eq!(user.data().unwrap().tasks_completed, 0);

    // Undo converges back on the pre-delete state.
    task.restore(undo, "goal-1").await.unwrap();
    assert_eq!(goal.data().unwrap().tasks, tasks_before);
    assert_eq!(user.data().unwrap().tasks_completed, counter_before);
}

#[tokio::test]
async fn toggling_completion_takes_progress_from_the_server() {
    let (_backend, api) = setup().await;
    let user = UserStore::new(api.clone());
    let goal = GoalStore::new(api.clone(), user.clone());
    let task = TaskStore::new(api, goal.clone(), user.clone());

    goal.get_data(Some("goal-1"), true).await.unwrap();
    assert_eq!(goal.data().unwrap().progress, 50);

    task.toggle_completed("task-1", "goal-1").await.unwrap();

    let refreshed = goal.data().unwrap();
    let toggled = refreshed.tasks.iter().find(|t| t.id == "task-1").unwrap();
    assert!(toggled.completed);
    // Progress is the server's recomputation, not a client-side guess.
    assert_eq!(refreshed.progress, 100);
    assert_eq!(user.data().unwrap().tasks_completed, 2);
}

#[tokio::test]
async fn task_mutation_for_an_unfocused_goal_refetches_it() {
    let (_backend, api) = setup().await;
    let user = UserStore::new(api.clone());
    let goal = GoalStore::new(api.clone(), user.clone());
    let task = TaskStore::new(api, goal.clone(), user);

    // Nothing focused yet: the mismatch path must fetch goal-1 rather than
    // patching into an empty focus.
    task.toggle_completed("task-1", "goal-1").await.unwrap();
    assert_eq!(goal.focused_id().as_deref(), Some("goal-1"));
}

#[tokio::test]
async fn sign_in_end_to_end() {
    let (backend, api) = setup().await;
    let user = UserStore::new(api);

    let config = [
        (Field::Email, Constraint::Pattern),
        (Field::Password, Constraint::Length { min: Some(8), max: None }),
    ]
    .into_iter()
    .collect();

    // A five-character password is blocked client-side: the field error
    // carries the minimum, and no request reaches the server.
    let mut form = FormState::new();
    form.handle_change(Field::Email, "user@example.com", Some(&Constraint::Pattern));
    form.handle_change(
        Field::Password,
        "short",
        Some(&Constraint::Length { min: Some(8), max: None }),
    );
    assert!(form.validate_all(&config));
    assert!(form.error(Field::Password).unwrap().contains('8'));
    assert_eq!(backend.lock().signin_hits, 0);

    // A valid submission signs in and lands the user aggregate.
    let mut form = FormState::new();
    form.handle_change(Field::Email, "user@example.com", Some(&Constraint::Pattern));
    form.handle_change(
        Field::Password,
        "longenough1",
        Some(&Constraint::Length { min: Some(8), max: None }),
    );
    assert!(!form.validate_all(&config));

    user.sign_in(SignInPayload {
        email: form.value(Field::Email).to_string(),
        password: form.value(Field::Password).to_string(),
    })
    .await
    .unwrap();

    assert_eq!(backend.lock().signin_hits, 1);
    assert_eq!(user.data().unwrap().email, "user@example.com");
    assert!(user.error().is_none());
}

#[tokio::test]
async fn wrong_credentials_populate_the_error_envelope() {
    let (_backend, api) = setup().await;
    let user = UserStore::new(api);

    let result = user
        .sign_in(SignInPayload {
            email: "user@example.com".to_string(),
            password: "wrongpassword".to_string(),
        })
        .await;

    assert!(result.is_err());
    let envelope = user.error().unwrap();
    assert_eq!(envelope.code, "auth/invalid-credentials");
    assert!(!envelope.is_auth_invalid());
}

#[tokio::test]
async fn expired_session_fires_the_redirect_hook() {
    let backend = Arc::new(Mutex::new(Backend::new()));
    let app = Router::new()
        .route("/user", get(expired_user))
        .with_state(backend);
    let base_url = spawn_server(app).await;

    let redirected = Arc::new(AtomicBool::new(false));
    let flag = redirected.clone();
    let api = Arc::new(
        ApiClient::new(base_url)
            .unwrap()
            .with_auth_redirect_hook(move || flag.store(true, Ordering::SeqCst)),
    );
    let user = UserStore::new(api);

    let result = user.get_data(true).await;
    assert!(result.is_err());
    assert!(redirected.load(Ordering::SeqCst));
    assert!(user.error().unwrap().is_auth_invalid());
}

#[tokio::test]
async fn malformed_success_body_is_a_decode_error() {
    // A 200 with a body that is not JSON must surface as a decode failure,
    // not be silently coerced into a null success.
    let app = Router::new().route("/user", get(|| async { "definitely not json" }));
    let base_url = spawn_server(app).await;
    let api = ApiClient::new(base_url).unwrap();

    let err = api
        .request("/user", RequestOptions::get())
        .await
        .expect_err("a malformed success body must not decode");
    assert!(matches!(err, ApiError::Decode(_)));
    assert_eq!(err.envelope().code, "client/decode");
}

#[tokio::test]
async fn heartbeat_ticks_until_the_handle_drops() {
    let (backend, api) = setup().await;
    let user = UserStore::new(api);

    let handle = user.start_heartbeat_with(Duration::from_millis(50));
    sleep(Duration::from_millis(180)).await;
    let beats = backend.lock().heartbeats;
    assert!(beats >= 2, "expected at least two beats, saw {beats}");

    drop(handle);
    sleep(Duration::from_millis(150)).await;
    assert_eq!(backend.lock().heartbeats, beats);
}

#[tokio::test]
async fn load_more_appends_profiles_without_duplicates() {
    let (_backend, api) = setup().await;
    let search = SearchStore::new(api);

    search.search().await.unwrap();
    assert_eq!(search.results().profiles.len(), 2);
    assert_eq!(search.results().next_offset.as_deref(), Some("2"));

    search.load_more_profiles().await;
    let results = search.results();
    let ids: Vec<&str> = results.profiles.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, ["p1", "p2", "p3"]);
    assert!(results.next_offset.is_none());

    // No further pages: a second call is a no-op.
    search.load_more_profiles().await;
    assert_eq!(search.results().profiles.len(), 3);
}

#[tokio::test]
async fn stale_profile_page_is_discarded_after_a_new_search() {
    let (backend, api) = setup().await;
    backend.lock().offset_delay = Some(Duration::from_millis(300));
    let search = SearchStore::new(api);

    search.search().await.unwrap();
    assert_eq!(search.results().profiles.len(), 2);

    // The next page is still in flight when a fresh search replaces the
    // result set; the late page belongs to the superseded query and must
    // not be appended to the new one.
    let store = search.clone();
    let pending_page = tokio::spawn(async move { store.load_more_profiles().await });
    sleep(Duration::from_millis(50)).await;
    search.search().await.unwrap();
    pending_page.await.unwrap();

    let results = search.results();
    let ids: Vec<&str> = results.profiles.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, ["p1", "p2"]);
    assert_eq!(results.next_offset.as_deref(), Some("2"));
}

#[tokio::test]
async fn rapid_keystrokes_debounce_into_one_search() {
    let (backend, api) = setup().await;
    let search = SearchStore::new(api);

    let store = search.clone();
    let first = tokio::spawn(async move { store.set_query("ru").await });
    sleep(Duration::from_millis(100)).await;
    search.set_query("rust").await.unwrap();
    first.await.unwrap().unwrap();

    let hits = backend.lock().search_hits.clone();
    assert_eq!(hits, ["rust"], "only the settled query should fire");
}
