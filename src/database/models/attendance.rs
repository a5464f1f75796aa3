use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceLog {
    pub id: Uuid,
    pub user_id: Uuid,
    pub event_id: String,
    pub method: String,
    pub checked_in_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

pub const COLUMNS: &str = "id, user_id, event_id, method, checked_in_at, created_at";
