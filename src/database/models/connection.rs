use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub status: String,
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub const COLUMNS: &str = "id, sender_id, receiver_id, status, message, created_at, updated_at";

/// A connection joined with the other party's professional profile, from the
/// perspective of the requesting user.
#[derive(Debug, Clone, FromRow)]
pub struct ConnectionWithPeer {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub status: String,
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub other_user_name: Option<String>,
    pub other_user_profession: Option<String>,
    pub other_user_avatar: Option<String>,
}
