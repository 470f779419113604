use axum::{debug_handler, extract::{Path, State}, response::Html};
use serde::Serialize;
use tower_sessions::Session;

use crate::{db::{Question, RoomId, RoomSnapshot, Store}, include_res, index::user_badge, res, session::{self, User}, AppError, AppResult};

use super::room_path;

/// What the live part of the room page shows for one snapshot.
#[derive(Debug, Serialize)]
pub(crate) struct RoomView {
    pub(crate) title: String,
    pub(crate) question_count: usize,
    pub(crate) count_label: String,
    pub(crate) questions_html: String,
}

impl From<&RoomSnapshot> for RoomView {
    fn from(snapshot: &RoomSnapshot) -> Self {
        RoomView {
            title: snapshot.title.clone(),
            question_count: snapshot.questions.len(),
            count_label: count_label(snapshot.questions.len()),
            questions_html: snapshot.questions.iter().map(question_to_html).collect(),
        }
    }
}

pub(crate) fn count_label(count: usize) -> String {
    match count {
        0 => String::new(),
        n => format!("{n} question(s)"),
    }
}

pub(crate) fn question_to_html(question: &Question) -> String {
    let mut classes = vec!["question"];
    if question.is_answered {
        classes.push("answered");
    }
    if question.is_highlighted {
        classes.push("highlighted");
    }

    include_res!(str, "/pages/rooms/question.html")
        .replace("{id}", &question.id.to_string())
        .replace("{classes}", &classes.join(" "))
        .replace("{avatar}", &res::escape(&question.author.avatar))
        .replace("{name}", &res::escape(&question.author.name))
        .replace("{content}", &res::markdown(&question.content))
}

pub(crate) fn room_to_html(snapshot: &RoomSnapshot, user: Option<&User>) -> String {
    let view = RoomView::from(snapshot);
    let room_id = snapshot.id.to_string();

    include_res!(str, "/pages/rooms/room.html")
        .replace("{room_id}", &room_id)
        .replace("{disabled}", if user.is_some() { "" } else { "disabled" })
        .replace("{count_label}", &view.count_label)
        .replace("{user}", &user_badge(user, &room_path(snapshot.id)))
        .replace("{title}", &res::escape(&view.title))
        .replace("{questions}", &view.questions_html)
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn room(
    State(store): State<Store>,
    session: Session,
    Path(room_id): Path<RoomId>,
) -> AppResult<Html<String>> {
    let Some(snapshot) = store.snapshot(room_id).await? else {
        return Err(AppError::NotFound("room"));
    };
    let user = session::current_user(&session).await?;

    Ok(Html(room_to_html(&snapshot, user.as_ref())))
}
