use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::database::patch::FieldSpec;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct BusinessCard {
    pub id: Uuid,
    pub user_id: Uuid,
    pub full_name: String,
    pub job_title: Option<String>,
    pub company_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
    pub color: String,
    pub is_favorite: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Projection used everywhere cards are read or returned; the soft-delete
/// flag stays internal.
pub const COLUMNS: &str = "id, user_id, full_name, job_title, company_name, email, phone, \
                           website, address, notes, color, is_favorite, created_at, updated_at";

pub const TABLE: &str = "business_cards";

pub const UPDATABLE_FIELDS: &[FieldSpec] = &[
    FieldSpec::new("fullName", "full_name"),
    FieldSpec::new("jobTitle", "job_title"),
    FieldSpec::new("companyName", "company_name"),
    FieldSpec::new("email", "email"),
    FieldSpec::new("phone", "phone"),
    FieldSpec::new("website", "website"),
    FieldSpec::new("address", "address"),
    FieldSpec::new("notes", "notes"),
    FieldSpec::new("color", "color"),
    FieldSpec::new("isFavorite", "is_favorite"),
];

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SocialLink {
    pub id: Uuid,
    pub platform: String,
    pub url: String,
    pub display_order: i32,
}
