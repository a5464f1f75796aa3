use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::database::patch::FieldSpec;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub id: Uuid,
    pub user_id: Uuid,
    pub first_name: String,
    pub last_name: Option<String>,
    pub company: Option<String>,
    pub job_title: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub mobile: Option<String>,
    pub fax: Option<String>,
    pub website: Option<String>,
    pub address_line1: Option<String>,
    pub address_line2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub notes: Option<String>,
    pub is_favorite: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub const COLUMNS: &str = "id, user_id, first_name, last_name, company, job_title, email, \
                           phone, mobile, fax, website, address_line1, address_line2, city, \
                           state, postal_code, country, notes, is_favorite, created_at, updated_at";

pub const TABLE: &str = "contacts";

pub const UPDATABLE_FIELDS: &[FieldSpec] = &[
    FieldSpec::new("firstName", "first_name"),
    FieldSpec::new("lastName", "last_name"),
    FieldSpec::new("company", "company"),
    FieldSpec::new("jobTitle", "job_title"),
    FieldSpec::new("email", "email"),
    FieldSpec::new("phone", "phone"),
    FieldSpec::new("mobile", "mobile"),
    FieldSpec::new("fax", "fax"),
    FieldSpec::new("website", "website"),
    FieldSpec::new("addressLine1", "address_line1"),
    FieldSpec::new("addressLine2", "address_line2"),
    FieldSpec::new("city", "city"),
    FieldSpec::new("state", "state"),
    FieldSpec::new("postalCode", "postal_code"),
    FieldSpec::new("country", "country"),
    FieldSpec::new("notes", "notes"),
    FieldSpec::new("isFavorite", "is_favorite"),
];
