use axum::{debug_handler, extract::State, response::{Html, IntoResponse, Redirect, Response}, Form};
use serde::Deserialize;
use tower_sessions::Session;

use crate::{auth::login_page_url, db::{Room, Store}, include_res, session::{self, User}, AppResult};

use super::room_path;

#[derive(Debug, Deserialize)]
pub(crate) struct NewRoomForm {
    title: String,
}

/// Creates a room owned by `author`. Blank titles create nothing.
pub async fn create_room(store: &Store, author: &User, title: &str) -> AppResult<Option<Room>> {
    let title = title.trim();
    if title.is_empty() {
        return Ok(None);
    }

    Ok(Some(store.push_room(title, &author.id).await?))
}

#[debug_handler]
pub(crate) async fn new_room_page(
    session: Session,
) -> AppResult<Response> {
    if session::current_user(&session).await?.is_none() {
        return Ok(Redirect::to(&login_page_url("/rooms/new")).into_response());
    }

    Ok(Html(
        include_res!(str, "/pages/rooms/new_room.html")
    ).into_response())
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn new_room(
    State(store): State<Store>,
    session: Session,
    Form(NewRoomForm { title }): Form<NewRoomForm>,
) -> AppResult<Response> {
    let Some(user) = session::current_user(&session).await? else {
        return Ok(Redirect::to(&login_page_url("/rooms/new")).into_response());
    };

    let Some(room) = create_room(&store, &user, &title).await? else {
        return Ok(Redirect::to("/rooms/new").into_response());
    };

    Ok(Redirect::to(&room_path(room.id)).into_response())
}
