pub mod appresult;
pub mod auth;
pub mod config;
pub mod db;
pub mod index;
pub mod res;
pub mod rooms;
pub mod session;

use axum::{extract::FromRef, routing::get, Router};
use serde_json::Value;
use tower_http::trace::TraceLayer;

pub use appresult::{AppError, AppResult};
pub use config::Config;
pub use db::Store;

#[derive(Clone, FromRef)]
pub struct AppState {
    pub store: Store,
    pub clients: auth::Clients,
}

pub trait GetField {
    fn get_str_field(&self, field: &str) -> AppResult<String>;
    fn get_obj_field(&self, field: &str) -> AppResult<&Value>;
}

impl GetField for serde_json::Value {
    fn get_str_field(&self, field: &str) -> AppResult<String> {
        Ok(
            self.get(field)
            .ok_or(format!("expected {field} in {self}"))?
            .as_str()
            .ok_or(format!("expected {field} in {self} to be string"))?
            .to_owned()
        )
    }

    fn get_obj_field(&self, field: &str) -> AppResult<&Value> {
        self.get(field)
        .ok_or(format!("expected {field} in {self}").into())
    }
}

/// All routes; the caller adds the session layer.
pub fn app(app_state: AppState) -> Router {
    Router::new()
        .route("/", get(index::index).post(index::join_room))
        .route("/create", get(index::create_room))
        .route("/style.css", get(res::stylesheet))
        .route("/room.js", get(res::room_script))

        .merge(auth::router())
        .nest("/rooms", rooms::router())

        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
}
