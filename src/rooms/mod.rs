mod new;
mod question;
mod room;
mod ws;

use axum::{routing::{get, post}, Router};

use crate::{db::RoomId, AppState};

pub use new::create_room;
pub use question::send_question;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/new", get(new::new_room_page).post(new::new_room))
        .route("/{room_id}", get(room::room))
        .route("/{room_id}/questions", post(question::question))
        .route("/{room_id}/ws", get(ws::room_ws))
}

pub fn room_path(room_id: RoomId) -> String {
    format!("/rooms/{room_id}")
}
