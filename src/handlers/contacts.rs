use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::database::models::card::SocialLink;
use crate::database::models::contact::{self, Contact};
use crate::database::models::tag::Tag;
use crate::database::patch::{ensure_owned, OwnedScope, SparsePatch};
use crate::error::ApiError;
use crate::middleware::CurrentUser;
use crate::state::AppState;

use super::cards::{ListQuery, SearchQuery};
use super::validate::{self, FieldErrors};

/// GET /api/contacts - list the caller's contacts, favorites first then by name
pub async fn list_contacts(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Value>, ApiError> {
    let limit = query.limit.unwrap_or(50).clamp(1, 100);
    let offset = query.offset.unwrap_or(0).max(0);

    let mut sql = format!(
        "SELECT {} FROM contacts WHERE user_id = $1 AND is_deleted = FALSE",
        contact::COLUMNS
    );
    let mut next_param = 2;

    let search_pattern = query
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| format!("%{}%", s));
    if search_pattern.is_some() {
        sql.push_str(&format!(
            " AND (first_name ILIKE ${p} OR last_name ILIKE ${p} \
             OR company ILIKE ${p} OR email ILIKE ${p})",
            p = next_param
        ));
        next_param += 1;
    }
    if query.favorite.as_deref() == Some("true") {
        sql.push_str(" AND is_favorite = TRUE");
    }
    sql.push_str(&format!(
        " ORDER BY is_favorite DESC, first_name ASC, last_name ASC LIMIT ${} OFFSET ${}",
        next_param,
        next_param + 1
    ));

    let mut rows_query = sqlx::query_as::<_, Contact>(&sql).bind(user.id);
    if let Some(pattern) = &search_pattern {
        rows_query = rows_query.bind(pattern);
    }
    let rows = rows_query
        .bind(limit)
        .bind(offset)
        .fetch_all(&state.pool)
        .await?;

    let total: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM contacts WHERE user_id = $1 AND is_deleted = FALSE")
            .bind(user.id)
            .fetch_one(&state.pool)
            .await?;

    Ok(Json(json!({
        "success": true,
        "data": rows,
        "pagination": { "total": total, "limit": limit, "offset": offset },
    })))
}

/// GET /api/contacts/:id - single contact with social links and tags embedded
pub async fn get_contact(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let sql = format!(
        "SELECT {} FROM contacts WHERE id = $1 AND user_id = $2 AND is_deleted = FALSE",
        contact::COLUMNS
    );
    let found = sqlx::query_as::<_, Contact>(&sql)
        .bind(id)
        .bind(user.id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Contact not found"))?;

    let social_links = sqlx::query_as::<_, SocialLink>(
        "SELECT id, platform, url, display_order FROM contact_social_links \
         WHERE contact_id = $1 ORDER BY display_order",
    )
    .bind(id)
    .fetch_all(&state.pool)
    .await?;

    let tags = sqlx::query_as::<_, Tag>(
        "SELECT t.id, t.name, t.color, t.created_at, t.updated_at \
         FROM tags t JOIN contact_tags ct ON t.id = ct.tag_id WHERE ct.contact_id = $1",
    )
    .bind(id)
    .fetch_all(&state.pool)
    .await?;

    let mut data = serde_json::to_value(&found)?;
    data["socialLinks"] = serde_json::to_value(&social_links)?;
    data["tags"] = serde_json::to_value(&tags)?;

    Ok(Json(json!({ "success": true, "data": data })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateContactRequest {
    pub first_name: String,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub job_title: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub mobile: Option<String>,
    #[serde(default)]
    pub fax: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub address_line1: Option<String>,
    #[serde(default)]
    pub address_line2: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub is_favorite: Option<bool>,
}

/// POST /api/contacts
pub async fn create_contact(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(payload): Json<CreateContactRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let mut errors = FieldErrors::new();
    if payload.first_name.is_empty() || payload.first_name.len() > 255 {
        errors.add("firstName", "First name is required (1-255 characters)");
    }
    if payload
        .email
        .as_deref()
        .is_some_and(|e| !validate::is_valid_email(e))
    {
        errors.add("email", "Invalid email address");
    }
    errors.into_result()?;

    let sql = format!(
        "INSERT INTO contacts (user_id, first_name, last_name, company, job_title, email, \
         phone, mobile, fax, website, address_line1, address_line2, city, state, \
         postal_code, country, notes, is_favorite) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18) \
         RETURNING {}",
        contact::COLUMNS
    );
    let created = sqlx::query_as::<_, Contact>(&sql)
        .bind(user.id)
        .bind(&payload.first_name)
        .bind(&payload.last_name)
        .bind(&payload.company)
        .bind(&payload.job_title)
        .bind(&payload.email)
        .bind(&payload.phone)
        .bind(&payload.mobile)
        .bind(&payload.fax)
        .bind(&payload.website)
        .bind(&payload.address_line1)
        .bind(&payload.address_line2)
        .bind(&payload.city)
        .bind(&payload.state)
        .bind(&payload.postal_code)
        .bind(&payload.country)
        .bind(&payload.notes)
        .bind(payload.is_favorite.unwrap_or(false))
        .fetch_one(&state.pool)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Contact created successfully",
            "data": created,
        })),
    ))
}

/// PUT /api/contacts/:id - sparse patch over the contact whitelist
pub async fn update_contact(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    let body = validate::as_object(&body)?;

    let mut errors = FieldErrors::new();
    validate::check_optional_required_str(&mut errors, body, "firstName", 255);
    validate::check_optional_str(&mut errors, body, "lastName", 255);
    validate::check_optional_str(&mut errors, body, "company", 255);
    validate::check_optional_str(&mut errors, body, "jobTitle", 255);
    validate::check_optional_email(&mut errors, body, "email");
    validate::check_optional_str(&mut errors, body, "phone", 50);
    validate::check_optional_str(&mut errors, body, "mobile", 50);
    validate::check_optional_str(&mut errors, body, "fax", 50);
    validate::check_optional_str(&mut errors, body, "website", 500);
    validate::check_optional_str(&mut errors, body, "addressLine1", 255);
    validate::check_optional_str(&mut errors, body, "addressLine2", 255);
    validate::check_optional_str(&mut errors, body, "city", 100);
    validate::check_optional_str(&mut errors, body, "state", 100);
    validate::check_optional_str(&mut errors, body, "postalCode", 20);
    validate::check_optional_str(&mut errors, body, "country", 100);
    validate::check_optional_str(&mut errors, body, "notes", 10_000);
    validate::check_optional_bool(&mut errors, body, "isFavorite");
    errors.into_result()?;

    if !ensure_owned(&state.pool, contact::TABLE, id, user.id, true).await? {
        return Err(ApiError::not_found("Contact not found"));
    }

    let patch = SparsePatch::from_body(contact::UPDATABLE_FIELDS, body);
    let updated: Option<Contact> = patch
        .into_update(
            contact::TABLE,
            OwnedScope::soft_deletable(id, user.id),
            contact::COLUMNS,
        )?
        .fetch_updated(&state.pool)
        .await?;

    let data = updated.ok_or_else(|| ApiError::not_found("Contact not found"))?;

    Ok(Json(json!({
        "success": true,
        "message": "Contact updated successfully",
        "data": data,
    })))
}

/// DELETE /api/contacts/:id - soft delete
pub async fn delete_contact(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let deleted = sqlx::query(
        "UPDATE contacts SET is_deleted = TRUE, updated_at = NOW() \
         WHERE id = $1 AND user_id = $2 AND is_deleted = FALSE RETURNING id",
    )
    .bind(id)
    .bind(user.id)
    .fetch_optional(&state.pool)
    .await?;

    if deleted.is_none() {
        return Err(ApiError::not_found("Contact not found"));
    }

    Ok(Json(json!({
        "success": true,
        "message": "Contact deleted successfully",
    })))
}

/// PATCH /api/contacts/:id/favorite - toggle
pub async fn toggle_favorite(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let row: Option<(Uuid, bool)> = sqlx::query_as(
        "UPDATE contacts SET is_favorite = NOT is_favorite, updated_at = NOW() \
         WHERE id = $1 AND user_id = $2 AND is_deleted = FALSE RETURNING id, is_favorite",
    )
    .bind(id)
    .bind(user.id)
    .fetch_optional(&state.pool)
    .await?;

    let (_, is_favorite) = row.ok_or_else(|| ApiError::not_found("Contact not found"))?;

    Ok(Json(json!({
        "success": true,
        "message": "Favorite status updated",
        "data": { "isFavorite": is_favorite },
    })))
}

/// GET /api/contacts/search?q=
pub async fn search_contacts(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Value>, ApiError> {
    let term = query.q.as_deref().map(str::trim).unwrap_or("");
    if term.is_empty() {
        return Err(ApiError::bad_request("Search query is required"));
    }

    let sql = format!(
        "SELECT {} FROM contacts WHERE user_id = $1 AND is_deleted = FALSE \
         AND (first_name ILIKE $2 OR last_name ILIKE $2 OR company ILIKE $2 \
         OR email ILIKE $2 OR notes ILIKE $2) \
         ORDER BY is_favorite DESC, first_name ASC, last_name ASC",
        contact::COLUMNS
    );
    let rows = sqlx::query_as::<_, Contact>(&sql)
        .bind(user.id)
        .bind(format!("%{}%", term))
        .fetch_all(&state.pool)
        .await?;
    let count = rows.len();

    Ok(Json(json!({
        "success": true,
        "data": rows,
        "count": count,
    })))
}
