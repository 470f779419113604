use axum::{debug_handler, extract::{ws::{rejection::WebSocketUpgradeRejection, Message, WebSocket}, Path, State, WebSocketUpgrade}, response::{IntoResponse, Response}};
use futures_util::{SinkExt, StreamExt};
use tracing::{debug, warn};

use crate::{db::{RoomFeed, RoomId, Store}, AppError, AppResult};

use super::room::RoomView;

#[debug_handler(state = crate::AppState)]
pub(crate) async fn room_ws(
    Path(room_id): Path<RoomId>,
    State(store): State<Store>,

    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> AppResult<Response> {
    if store.get_room(room_id).await?.is_none() {
        return Err(AppError::NotFound("room"));
    }

    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => return Ok(rejection.into_response()),
    };

    let feed = store.subscribe(room_id);
    Ok(ws.on_upgrade(move |stream| follow_room(stream, feed)).into_response())
}

/// Pushes a fresh view of the room down the socket every time the room changes.
async fn follow_room(stream: WebSocket, mut feed: RoomFeed) {
    let room_id = feed.room_id();
    let (mut sender, mut receiver) = stream.split();

    let mut feed_task = tokio::spawn(async move {
        loop {
            let snapshot = match feed.next().await {
                Ok(Some(snapshot)) => snapshot,
                Ok(None) => break,
                Err(err) => {
                    warn!("feed for room {room_id} failed: {err}");
                    break;
                }
            };

            let Ok(view) = serde_json::to_string(&RoomView::from(&snapshot)) else {
                break;
            };
            if sender.send(Message::Text(view.into())).await.is_err() {
                break;
            }
        }
    });

    // clients only ever listen; drain until they hang up
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            if let Message::Close(_) = msg {
                break;
            }
        }
    });

    tokio::select! {
        _ = &mut feed_task => recv_task.abort(),
        _ = &mut recv_task => feed_task.abort(),
    };

    debug!("watcher left room {room_id}");
}
