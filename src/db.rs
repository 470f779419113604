use serde::{Deserialize, Serialize};
use sqlx::{sqlite::{SqliteConnectOptions, SqlitePoolOptions}, SqlitePool};
use tokio::sync::broadcast::{self, error::{RecvError, TryRecvError}};
use tracing::{debug, info};
use uuid::Uuid;

use crate::AppResult;

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Room {
    #[sqlx(try_from = "String")]
    pub id: RoomId,
    pub title: String,
    pub author_id: String,
}

/// Room code. Generated keys sort by creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub Uuid);

impl TryFrom<String> for RoomId {
    type Error = uuid::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Ok(RoomId(Uuid::parse_str(&value)?))
    }
}

impl std::fmt::Display for RoomId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Author {
    pub name: String,
    pub avatar: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: Uuid,
    pub content: String,
    pub author: Author,
    pub is_answered: bool,
    pub is_highlighted: bool,
}

#[derive(sqlx::FromRow)]
struct QuestionRow {
    id: String,
    content: String,
    author_name: String,
    author_avatar: String,
    is_answered: bool,
    is_highlighted: bool,
}

impl TryFrom<QuestionRow> for Question {
    type Error = uuid::Error;

    fn try_from(row: QuestionRow) -> Result<Self, Self::Error> {
        Ok(Question {
            id: Uuid::parse_str(&row.id)?,
            content: row.content,
            author: Author {
                name: row.author_name,
                avatar: row.author_avatar,
            },
            is_answered: row.is_answered,
            is_highlighted: row.is_highlighted,
        })
    }
}

/// Everything stored under one room, as of one read.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSnapshot {
    pub id: RoomId,
    pub title: String,
    pub author_id: String,
    pub questions: Vec<Question>,
}

#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
    changes: broadcast::Sender<RoomId>,
}

impl Store {
    pub async fn connect(url: &str) -> AppResult<Store> {
        let options: SqliteConnectOptions = url.parse()?;
        let pool = SqlitePoolOptions::new()
            .max_connections(16)
            .connect_with(options.create_if_missing(true))
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;
        info!("database ready at {url}");

        Ok(Store::new(pool))
    }

    /// Wraps a pool whose schema is already migrated.
    pub fn new(pool: SqlitePool) -> Store {
        Store {
            pool,
            changes: broadcast::channel(64).0,
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn get_room(&self, room_id: RoomId) -> AppResult<Option<Room>> {
        Ok(
            sqlx::query_as("SELECT id,title,author_id FROM rooms WHERE id=?")
                .bind(room_id.to_string())
                .fetch_optional(&self.pool)
                .await?
        )
    }

    /// Looks up a room by a user-typed code. Codes that cannot name a room are just absent rooms.
    pub async fn find_room(&self, code: &str) -> AppResult<Option<Room>> {
        let Ok(uuid) = Uuid::parse_str(code.trim()) else {
            return Ok(None);
        };
        self.get_room(RoomId(uuid)).await
    }

    pub async fn push_room(&self, title: &str, author_id: &str) -> AppResult<Room> {
        let room = Room {
            id: RoomId(Uuid::now_v7()),
            title: title.to_owned(),
            author_id: author_id.to_owned(),
        };

        sqlx::query("INSERT INTO rooms (id,title,author_id) VALUES (?,?,?)")
            .bind(room.id.to_string())
            .bind(&room.title)
            .bind(&room.author_id)
            .execute(&self.pool)
            .await?;

        info!("room {} created by u/{author_id}", room.id);
        Ok(room)
    }

    pub async fn push_question(&self, room_id: RoomId, content: &str, author: &Author) -> AppResult<Question> {
        let question = Question {
            id: Uuid::now_v7(),
            content: content.to_owned(),
            author: author.clone(),
            is_answered: false,
            is_highlighted: false,
        };

        sqlx::query("INSERT INTO questions (id,room_id,content,author_name,author_avatar,is_answered,is_highlighted) VALUES (?,?,?,?,?,?,?)")
            .bind(question.id.to_string())
            .bind(room_id.to_string())
            .bind(&question.content)
            .bind(&question.author.name)
            .bind(&question.author.avatar)
            .bind(question.is_answered)
            .bind(question.is_highlighted)
            .execute(&self.pool)
            .await?;

        debug!("question {} pushed to room {room_id}", question.id);
        // nobody listening is fine
        let _ = self.changes.send(room_id);

        Ok(question)
    }

    pub async fn questions(&self, room_id: RoomId) -> AppResult<Vec<Question>> {
        let rows: Vec<QuestionRow> = sqlx::query_as(
            "SELECT id,content,author_name,author_avatar,is_answered,is_highlighted FROM questions WHERE room_id=? ORDER BY id"
        )
            .bind(room_id.to_string())
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Question::try_from).collect::<Result<Vec<_>, _>>()?)
    }

    pub async fn snapshot(&self, room_id: RoomId) -> AppResult<Option<RoomSnapshot>> {
        let Some(Room { id, title, author_id }) = self.get_room(room_id).await? else {
            return Ok(None);
        };

        Ok(Some(RoomSnapshot {
            id,
            title,
            author_id,
            questions: self.questions(room_id).await?,
        }))
    }

    pub fn subscribe(&self, room_id: RoomId) -> RoomFeed {
        RoomFeed {
            store: self.clone(),
            room_id,
            rx: self.changes.subscribe(),
            primed: false,
        }
    }
}

/// Live view of one room: the current snapshot first, then one per change.
pub struct RoomFeed {
    store: Store,
    room_id: RoomId,
    rx: broadcast::Receiver<RoomId>,
    primed: bool,
}

impl RoomFeed {
    pub fn room_id(&self) -> RoomId {
        self.room_id
    }

    pub async fn next(&mut self) -> AppResult<Option<RoomSnapshot>> {
        if !self.primed {
            self.primed = true;
            return self.store.snapshot(self.room_id).await;
        }

        loop {
            match self.rx.recv().await {
                Ok(room_id) if room_id == self.room_id => break,
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    debug!("feed for room {} skipped {skipped} changes", self.room_id);
                    // the snapshot is re-read anyway, so whatever was missed is in it
                    while let Ok(_) | Err(TryRecvError::Lagged(_)) = self.rx.try_recv() {}
                    break;
                }
                Err(RecvError::Closed) => return Ok(None),
            }
        }

        self.store.snapshot(self.room_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn room_ids_reject_garbage() {
        assert!(RoomId::try_from("not-a-room".to_owned()).is_err());
    }

    #[test]
    fn question_serializes_like_the_client_expects() {
        let question = Question {
            id: Uuid::nil(),
            content: "why?".to_owned(),
            author: Author { name: "Ada".to_owned(), avatar: "a.png".to_owned() },
            is_answered: false,
            is_highlighted: true,
        };

        let json = serde_json::to_value(&question).unwrap();
        assert_eq!(json["isHighlighted"], true);
        assert_eq!(json["author"]["name"], "Ada");
    }
}
