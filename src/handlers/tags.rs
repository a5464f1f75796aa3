use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::database::models::tag::{self, Tag};
use crate::database::patch::{ensure_owned, OwnedScope, SparsePatch};
use crate::error::ApiError;
use crate::middleware::CurrentUser;
use crate::state::AppState;

use super::validate::{self, FieldErrors};

/// GET /api/tags
pub async fn list_tags(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<Value>, ApiError> {
    let sql = format!(
        "SELECT {} FROM tags WHERE user_id = $1 ORDER BY name ASC",
        tag::COLUMNS
    );
    let rows = sqlx::query_as::<_, Tag>(&sql)
        .bind(user.id)
        .fetch_all(&state.pool)
        .await?;

    Ok(Json(json!({ "success": true, "data": rows })))
}

#[derive(Debug, Deserialize)]
pub struct CreateTagRequest {
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
}

/// POST /api/tags - tag names are unique per owner
pub async fn create_tag(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(payload): Json<CreateTagRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let mut errors = FieldErrors::new();
    if payload.name.is_empty() || payload.name.len() > 100 {
        errors.add("name", "Tag name is required (1-100 characters)");
    }
    if payload
        .color
        .as_deref()
        .is_some_and(|c| !validate::is_valid_hex_color(c))
    {
        errors.add("color", "Color must be a valid hex color");
    }
    errors.into_result()?;

    let existing = sqlx::query("SELECT id FROM tags WHERE user_id = $1 AND name = $2")
        .bind(user.id)
        .bind(&payload.name)
        .fetch_optional(&state.pool)
        .await?;
    if existing.is_some() {
        return Err(ApiError::conflict("Tag with this name already exists"));
    }

    let sql = format!(
        "INSERT INTO tags (user_id, name, color) VALUES ($1, $2, $3) RETURNING {}",
        tag::COLUMNS
    );
    let created = sqlx::query_as::<_, Tag>(&sql)
        .bind(user.id)
        .bind(&payload.name)
        .bind(payload.color.as_deref().unwrap_or("#1E88E5"))
        .fetch_one(&state.pool)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Tag created successfully",
            "data": created,
        })),
    ))
}

/// PUT /api/tags/:id - sparse patch over name/color
pub async fn update_tag(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    let body = validate::as_object(&body)?;

    let mut errors = FieldErrors::new();
    validate::check_optional_required_str(&mut errors, body, "name", 100);
    validate::check_optional_color(&mut errors, body, "color");
    errors.into_result()?;

    if !ensure_owned(&state.pool, tag::TABLE, id, user.id, false).await? {
        return Err(ApiError::not_found("Tag not found"));
    }

    let patch = SparsePatch::from_body(tag::UPDATABLE_FIELDS, body);
    let updated: Option<Tag> = patch
        .into_update(tag::TABLE, OwnedScope::owned_by(id, user.id), tag::COLUMNS)?
        .fetch_updated(&state.pool)
        .await?;

    let data = updated.ok_or_else(|| ApiError::not_found("Tag not found"))?;

    Ok(Json(json!({
        "success": true,
        "message": "Tag updated successfully",
        "data": data,
    })))
}

/// DELETE /api/tags/:id - physical delete; join rows cascade
pub async fn delete_tag(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let deleted = sqlx::query("DELETE FROM tags WHERE id = $1 AND user_id = $2 RETURNING id")
        .bind(id)
        .bind(user.id)
        .fetch_optional(&state.pool)
        .await?;

    if deleted.is_none() {
        return Err(ApiError::not_found("Tag not found"));
    }

    Ok(Json(json!({
        "success": true,
        "message": "Tag deleted successfully",
    })))
}

/// POST /api/tags/cards/:card_id/tags/:tag_id
///
/// Both sides must belong to the caller; attaching twice is a no-op.
pub async fn add_tag_to_card(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path((card_id, tag_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Value>, ApiError> {
    if !ensure_owned(&state.pool, "business_cards", card_id, user.id, false).await? {
        return Err(ApiError::not_found("Business card not found"));
    }
    if !ensure_owned(&state.pool, "tags", tag_id, user.id, false).await? {
        return Err(ApiError::not_found("Tag not found"));
    }

    sqlx::query(
        "INSERT INTO card_tags (card_id, tag_id) VALUES ($1, $2) \
         ON CONFLICT (card_id, tag_id) DO NOTHING",
    )
    .bind(card_id)
    .bind(tag_id)
    .execute(&state.pool)
    .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Tag added to business card",
    })))
}

/// DELETE /api/tags/cards/:card_id/tags/:tag_id
pub async fn remove_tag_from_card(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path((card_id, tag_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Value>, ApiError> {
    let removed = sqlx::query(
        "DELETE FROM card_tags WHERE card_id = $1 AND tag_id = $2 \
         AND EXISTS (SELECT 1 FROM business_cards WHERE id = $1 AND user_id = $3) \
         RETURNING card_id",
    )
    .bind(card_id)
    .bind(tag_id)
    .bind(user.id)
    .fetch_optional(&state.pool)
    .await?;

    if removed.is_none() {
        return Err(ApiError::not_found("Tag association not found"));
    }

    Ok(Json(json!({
        "success": true,
        "message": "Tag removed from business card",
    })))
}

/// POST /api/tags/contacts/:contact_id/tags/:tag_id
pub async fn add_tag_to_contact(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path((contact_id, tag_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Value>, ApiError> {
    if !ensure_owned(&state.pool, "contacts", contact_id, user.id, false).await? {
        return Err(ApiError::not_found("Contact not found"));
    }
    if !ensure_owned(&state.pool, "tags", tag_id, user.id, false).await? {
        return Err(ApiError::not_found("Tag not found"));
    }

    sqlx::query(
        "INSERT INTO contact_tags (contact_id, tag_id) VALUES ($1, $2) \
         ON CONFLICT (contact_id, tag_id) DO NOTHING",
    )
    .bind(contact_id)
    .bind(tag_id)
    .execute(&state.pool)
    .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Tag added to contact",
    })))
}

/// DELETE /api/tags/contacts/:contact_id/tags/:tag_id
pub async fn remove_tag_from_contact(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path((contact_id, tag_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Value>, ApiError> {
    let removed = sqlx::query(
        "DELETE FROM contact_tags WHERE contact_id = $1 AND tag_id = $2 \
         AND EXISTS (SELECT 1 FROM contacts WHERE id = $1 AND user_id = $3) \
         RETURNING contact_id",
    )
    .bind(contact_id)
    .bind(tag_id)
    .bind(user.id)
    .fetch_optional(&state.pool)
    .await?;

    if removed.is_none() {
        return Err(ApiError::not_found("Tag association not found"));
    }

    Ok(Json(json!({
        "success": true,
        "message": "Tag removed from contact",
    })))
}
