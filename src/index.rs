use axum::{debug_handler, extract::State, http::StatusCode, response::{Html, IntoResponse, Redirect, Response}, Form};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::debug;

use crate::{auth::{login_page_url, login_url, ClientProvider}, db::Store, include_res, res, rooms, session::{self, User}, AppResult};

#[derive(Deserialize)]
pub(crate) struct JoinRoomForm {
    room_code: String,
}

pub(crate) fn user_badge(user: Option<&User>, return_url: &str) -> String {
    match user {
        Some(user) => include_res!(str, "/pages/user_badge.html")
            .replace("{name}", &res::escape(&user.name))
            .replace("{avatar}", &res::escape(&user.avatar)),
        None => include_res!(str, "/pages/login_link.html")
            .replace("{href}", &res::escape(&login_page_url(return_url))),
    }
}

fn landing(user: Option<&User>, room_code: &str, alert: Option<&str>) -> String {
    let alert = match alert {
        Some(alert) => include_res!(str, "/pages/alert.html").replace("{message}", &res::escape(alert)),
        None => String::new(),
    };

    include_res!(str, "/pages/index.html")
        .replace("{user}", &user.map(|user| user_badge(Some(user), "/")).unwrap_or_default())
        .replace("{alert}", &alert)
        .replace("{room_code}", &res::escape(room_code))
}

#[debug_handler]
pub async fn index(session: Session) -> AppResult<Html<String>> {
    let user = session::current_user(&session).await?;
    Ok(Html(landing(user.as_ref(), "", None)))
}

/// "Create a room": sign in first when needed, then go to the creation form.
#[debug_handler]
pub async fn create_room(session: Session) -> AppResult<Redirect> {
    if session::current_user(&session).await?.is_none() {
        return Ok(Redirect::to(&login_url(ClientProvider::Google, "/rooms/new")));
    }

    Ok(Redirect::to("/rooms/new"))
}

#[debug_handler(state = crate::AppState)]
pub async fn join_room(
    State(store): State<Store>,
    session: Session,
    Form(JoinRoomForm { room_code }): Form<JoinRoomForm>,
) -> AppResult<Response> {
    if room_code.trim().is_empty() {
        return Ok(Redirect::to("/").into_response());
    }

    let Some(room) = store.find_room(&room_code).await? else {
        debug!("join attempt for unknown room {room_code:?}");
        let user = session::current_user(&session).await?;
        return Ok((
            StatusCode::NOT_FOUND,
            Html(landing(user.as_ref(), &room_code, Some("Room does not exist."))),
        ).into_response());
    };

    Ok(Redirect::to(&rooms::room_path(room.id)).into_response())
}
