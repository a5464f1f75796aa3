use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::database::models::card::{self, BusinessCard, SocialLink};
use crate::database::models::tag::Tag;
use crate::database::patch::{ensure_owned, OwnedScope, SparsePatch};
use crate::error::ApiError;
use crate::middleware::CurrentUser;
use crate::state::AppState;

use super::validate::{self, FieldErrors};

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub search: Option<String>,
    pub favorite: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// GET /api/cards - list the caller's cards, favorites first
pub async fn list_cards(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Value>, ApiError> {
    let limit = query.limit.unwrap_or(50).clamp(1, 100);
    let offset = query.offset.unwrap_or(0).max(0);

    let mut sql = format!(
        "SELECT {} FROM business_cards WHERE user_id = $1 AND is_deleted = FALSE",
        card::COLUMNS
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
            " AND (full_name ILIKE ${p} OR company_name ILIKE ${p} \
             OR job_title ILIKE ${p} OR email ILIKE ${p})",
            p = next_param
        ));
        next_param += 1;
    }
    if query.favorite.as_deref() == Some("true") {
        sql.push_str(" AND is_favorite = TRUE");
    }
    sql.push_str(&format!(
        " ORDER BY is_favorite DESC, created_at DESC LIMIT ${} OFFSET ${}",
        next_param,
        next_param + 1
    ));

    let mut rows_query = sqlx::query_as::<_, BusinessCard>(&sql).bind(user.id);
    if let Some(pattern) = &search_pattern {
        rows_query = rows_query.bind(pattern);
    }
    let rows = rows_query
        .bind(limit)
        .bind(offset)
        .fetch_all(&state.pool)
        .await?;

    let total: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM business_cards WHERE user_id = $1 AND is_deleted = FALSE",
    )
    .bind(user.id)
    .fetch_one(&state.pool)
    .await?;

    Ok(Json(json!({
        "success": true,
        "data": rows,
        "pagination": { "total": total, "limit": limit, "offset": offset },
    })))
}

/// GET /api/cards/:id - single card with social links and tags embedded
pub async fn get_card(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let sql = format!(
        "SELECT {} FROM business_cards WHERE id = $1 AND user_id = $2 AND is_deleted = FALSE",
        card::COLUMNS
    );
    let found = sqlx::query_as::<_, BusinessCard>(&sql)
        .bind(id)
        .bind(user.id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Business card not found"))?;

    let social_links = sqlx::query_as::<_, SocialLink>(
        "SELECT id, platform, url, display_order FROM card_social_links \
         WHERE card_id = $1 ORDER BY display_order",
    )
    .bind(id)
    .fetch_all(&state.pool)
    .await?;

    let tags = sqlx::query_as::<_, Tag>(
        "SELECT t.id, t.name, t.color, t.created_at, t.updated_at \
         FROM tags t JOIN card_tags ct ON t.id = ct.tag_id WHERE ct.card_id = $1",
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
pub struct CreateCardRequest {
    pub full_name: String,
    #[serde(default)]
    pub job_title: Option<String>,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub is_favorite: Option<bool>,
}

/// POST /api/cards
pub async fn create_card(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(payload): Json<CreateCardRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let mut errors = FieldErrors::new();
    if payload.full_name.is_empty() || payload.full_name.len() > 255 {
        errors.add("fullName", "Full name is required (1-255 characters)");
    }
    if payload
        .email
        .as_deref()
        .is_some_and(|e| !validate::is_valid_email(e))
    {
        errors.add("email", "Invalid email address");
    }
    if payload
        .color
        .as_deref()
        .is_some_and(|c| !validate::is_valid_hex_color(c))
    {
        errors.add("color", "Color must be a valid hex color");
    }
    errors.into_result()?;

    let sql = format!(
        "INSERT INTO business_cards (user_id, full_name, job_title, company_name, email, \
         phone, website, address, notes, color, is_favorite) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) RETURNING {}",
        card::COLUMNS
    );
    let created = sqlx::query_as::<_, BusinessCard>(&sql)
        .bind(user.id)
        .bind(&payload.full_name)
        .bind(&payload.job_title)
        .bind(&payload.company_name)
        .bind(&payload.email)
        .bind(&payload.phone)
        .bind(&payload.website)
        .bind(&payload.address)
        .bind(&payload.notes)
        .bind(payload.color.as_deref().unwrap_or("#1E88E5"))
        .bind(payload.is_favorite.unwrap_or(false))
        .fetch_one(&state.pool)
        .await?;

    // Notification row is best-effort; card creation already succeeded
    let pool = state.pool.clone();
    let owner = user.id;
    let card_name = created.full_name.clone();
    crate::services::spawn_best_effort("card notification", async move {
        sqlx::query("INSERT INTO notifications (user_id, type, message) VALUES ($1, $2, $3)")
            .bind(owner)
            .bind("card_added")
            .bind(format!("Business card \"{}\" was added.", card_name))
            .execute(&pool)
            .await?;
        Ok(())
    });

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Business card created successfully",
            "data": created,
        })),
    ))
}

/// PUT /api/cards/:id - sparse patch over the card whitelist
pub async fn update_card(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    let body = validate::as_object(&body)?;

    let mut errors = FieldErrors::new();
    validate::check_optional_required_str(&mut errors, body, "fullName", 255);
    validate::check_optional_str(&mut errors, body, "jobTitle", 255);
    validate::check_optional_str(&mut errors, body, "companyName", 255);
    validate::check_optional_email(&mut errors, body, "email");
    validate::check_optional_str(&mut errors, body, "phone", 50);
    validate::check_optional_str(&mut errors, body, "website", 500);
    validate::check_optional_str(&mut errors, body, "address", 10_000);
    validate::check_optional_str(&mut errors, body, "notes", 10_000);
    validate::check_optional_color(&mut errors, body, "color");
    validate::check_optional_bool(&mut errors, body, "isFavorite");
    errors.into_result()?;

    // Precise 404 before the mutation is attempted
    if !ensure_owned(&state.pool, card::TABLE, id, user.id, true).await? {
        return Err(ApiError::not_found("Business card not found"));
    }

    let patch = SparsePatch::from_body(card::UPDATABLE_FIELDS, body);
    let updated: Option<BusinessCard> = patch
        .into_update(
            card::TABLE,
            OwnedScope::soft_deletable(id, user.id),
            card::COLUMNS,
        )?
        .fetch_updated(&state.pool)
        .await?;

    let data = updated.ok_or_else(|| ApiError::not_found("Business card not found"))?;

    Ok(Json(json!({
        "success": true,
        "message": "Business card updated successfully",
        "data": data,
    })))
}

/// DELETE /api/cards/:id - soft delete
pub async fn delete_card(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let deleted = sqlx::query(
        "UPDATE business_cards SET is_deleted = TRUE, updated_at = NOW() \
         WHERE id = $1 AND user_id = $2 AND is_deleted = FALSE RETURNING id",
    )
    .bind(id)
    .bind(user.id)
    .fetch_optional(&state.pool)
    .await?;

    if deleted.is_none() {
        return Err(ApiError::not_found("Business card not found"));
    }

    Ok(Json(json!({
        "success": true,
        "message": "Business card deleted successfully",
    })))
}

/// PATCH /api/cards/:id/favorite - toggle
pub async fn toggle_favorite(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let row: Option<(Uuid, bool)> = sqlx::query_as(
        "UPDATE business_cards SET is_favorite = NOT is_favorite, updated_at = NOW() \
         WHERE id = $1 AND user_id = $2 AND is_deleted = FALSE RETURNING id, is_favorite",
    )
    .bind(id)
    .bind(user.id)
    .fetch_optional(&state.pool)
    .await?;

    let (_, is_favorite) = row.ok_or_else(|| ApiError::not_found("Business card not found"))?;

    Ok(Json(json!({
        "success": true,
        "message": "Favorite status updated",
        "data": { "isFavorite": is_favorite },
    })))
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

/// GET /api/cards/search?q=
pub async fn search_cards(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Value>, ApiError> {
    let term = query.q.as_deref().map(str::trim).unwrap_or("");
    if term.is_empty() {
        return Err(ApiError::bad_request("Search query is required"));
    }

    let sql = format!(
        "SELECT {} FROM business_cards WHERE user_id = $1 AND is_deleted = FALSE \
         AND (full_name ILIKE $2 OR company_name ILIKE $2 OR job_title ILIKE $2 \
         OR email ILIKE $2 OR notes ILIKE $2) \
         ORDER BY is_favorite DESC, created_at DESC",
        card::COLUMNS
    );
    let rows = sqlx::query_as::<_, BusinessCard>(&sql)
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
