use axum::{debug_handler, extract::{Path, State}, response::{IntoResponse, Redirect, Response}, Form};
use serde::Deserialize;
use tower_sessions::Session;

use crate::{db::{Question, RoomId, Store}, session::{self, User}, AppError, AppResult};

use super::room_path;

#[derive(Deserialize)]
pub(crate) struct QuestionForm {
    content: String,
}

/// Pushes a question into a room on behalf of `user`.
///
/// Blank content is ignored. Signed-out visitors are turned away before the store is touched.
pub async fn send_question(
    store: &Store,
    user: Option<&User>,
    room_id: RoomId,
    content: &str,
) -> AppResult<Option<Question>> {
    let content = content.trim();
    if content.is_empty() {
        return Ok(None);
    }

    let Some(user) = user else {
        return Err(AppError::Unauthorized("Please sign in to send a question."));
    };

    if store.get_room(room_id).await?.is_none() {
        return Err(AppError::NotFound("room"));
    }

    Ok(Some(store.push_question(room_id, content, &user.author()).await?))
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn question(
    State(store): State<Store>,
    session: Session,
    Path(room_id): Path<RoomId>,
    Form(QuestionForm { content }): Form<QuestionForm>,
) -> AppResult<Response> {
    let user = session::current_user(&session).await?;

    send_question(&store, user.as_ref(), room_id, &content).await?;

    Ok(Redirect::to(&room_path(room_id)).into_response())
}
