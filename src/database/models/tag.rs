use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::database::patch::FieldSpec;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
    pub color: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub const COLUMNS: &str = "id, name, color, created_at, updated_at";

pub const TABLE: &str = "tags";

pub const UPDATABLE_FIELDS: &[FieldSpec] = &[
    FieldSpec::new("name", "name"),
    FieldSpec::new("color", "color"),
];
