use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::database::patch::FieldSpec;

/// Full user row. The credential hash is never serialized into responses.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub full_name: Option<String>,
    pub is_active: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub const COLUMNS: &str = "id, email, username, password_hash, full_name, \
                           is_active, last_login, created_at, updated_at";

/// Profile fields a user may change about themselves.
pub const PROFILE_FIELDS: &[FieldSpec] = &[FieldSpec::new("fullName", "full_name")];
