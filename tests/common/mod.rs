#![allow(dead_code)]

use axum::{body::Body, extract::State, http::{header, Request, Response}, middleware::{self, Next}, Router};
use letmeask::{auth::Clients, db::RoomId, session::{User, USER}, AppState, Store};
use serde_json::json;
use sqlx::sqlite::SqlitePoolOptions;
use tower::ServiceExt;
use tower_sessions::{MemoryStore, Session, SessionManagerLayer};

/// Fresh in-memory store; one connection so every query sees the same database.
pub async fn store() -> Store {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("can't open in-memory database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("can't migrate");

    Store::new(pool)
}

fn state(store: Store) -> AppState {
    let clients = Clients::from_json(json!({
        "firebase": { "apikey": "test-key" },
        "google": { "client_id": "id", "client_secret": "secret" },
    }), "http://localhost:8080").expect("bad test clients");

    AppState { store, clients }
}

pub fn app(store: Store) -> Router {
    letmeask::app(state(store))
        .layer(SessionManagerLayer::new(MemoryStore::default()))
}

async fn sign_in(
    State(user): State<User>,
    session: Session,
    request: Request<Body>,
    next: Next,
) -> Response<Body> {
    session.insert(USER, user).await.expect("can't sign in");
    next.run(request).await
}

/// Every request arrives with `user` already in its session.
pub fn app_signed_in_as(store: Store, user: User) -> Router {
    letmeask::app(state(store))
        .layer(middleware::from_fn_with_state(user, sign_in))
        .layer(SessionManagerLayer::new(MemoryStore::default()))
}

pub fn signed_in_app(store: Store) -> Router {
    app_signed_in_as(store, user())
}

pub fn user() -> User {
    User {
        id: "user-1".to_owned(),
        name: "Ada Lovelace".to_owned(),
        avatar: "https://example.com/ada.png".to_owned(),
    }
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    app.oneshot(
        Request::builder()
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    ).await.unwrap()
}

pub async fn get_ws(app: Router, uri: &str) -> Response<Body> {
    app.oneshot(
        Request::builder()
            .uri(uri)
            .header(header::CONNECTION, "upgrade")
            .header(header::UPGRADE, "websocket")
            .header(header::SEC_WEBSOCKET_VERSION, "13")
            .header(header::SEC_WEBSOCKET_KEY, "dGhlIHNhbXBsZSBub25jZQ==")
            .body(Body::empty())
            .unwrap()
    ).await.unwrap()
}

pub async fn post_form(app: Router, uri: &str, form: &str) -> Response<Body> {
    app.oneshot(
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(form.to_owned()))
            .unwrap()
    ).await.unwrap()
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("can't read body");
    String::from_utf8(bytes.to_vec()).expect("body isn't utf-8")
}

pub fn location(response: &Response<Body>) -> Option<&str> {
    response.headers()
        .get(header::LOCATION)
        .map(|value| value.to_str().unwrap())
}

pub async fn count(store: &Store, table: &str) -> i64 {
    let (count,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(store.pool())
        .await
        .unwrap();
    count
}

pub async fn question_count(store: &Store, room_id: RoomId) -> i64 {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM questions WHERE room_id=?")
        .bind(room_id.to_string())
        .fetch_one(store.pool())
        .await
        .unwrap();
    count
}

pub async fn room_ids(store: &Store) -> Vec<String> {
    sqlx::query_as::<_, (String,)>("SELECT id FROM rooms")
        .fetch_all(store.pool())
        .await
        .unwrap()
        .into_iter()
        .map(|(id,)| id)
        .collect()
}
