use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::database::models::connection::{self, Connection, ConnectionWithPeer};
use crate::database::models::professional::ProfessionalListing;
use crate::error::ApiError;
use crate::middleware::CurrentUser;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ProfessionalsQuery {
    pub location: Option<String>,
    pub field: Option<String>,
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// GET /api/discover/professionals
///
/// Public profiles excluding the caller's own, with aggregated tags and the
/// caller's connection status towards each, most-connected first.
pub async fn list_professionals(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<ProfessionalsQuery>,
) -> Result<Json<Value>, ApiError> {
    let limit = query.limit.unwrap_or(50).clamp(1, 100);
    let offset = query.offset.unwrap_or(0).max(0);

    let location = query.location.as_deref().filter(|v| *v != "All");
    let field = query.field.as_deref().filter(|v| *v != "All");
    let search_pattern = query
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| format!("%{}%", s));

    let mut sql = String::from(
        "SELECT p.id, p.user_id, p.full_name, p.profession, p.location, p.field, \
         p.avatar_url, p.bio, p.connections_count, \
         COALESCE(json_agg(DISTINCT pt.tag) FILTER (WHERE pt.tag IS NOT NULL), '[]'::json) AS tags, \
         c.status AS connection_status \
         FROM professionals p \
         LEFT JOIN professional_tags pt ON p.id = pt.professional_id \
         LEFT JOIN connections c ON ((c.sender_id = $1 AND c.receiver_id = p.user_id) \
         OR (c.receiver_id = $1 AND c.sender_id = p.user_id)) \
         WHERE p.is_public = TRUE AND (p.user_id != $1 OR p.user_id IS NULL)",
    );
    let mut filters = String::new();
    let mut next_param = 2;
    if location.is_some() {
        filters.push_str(&format!(" AND p.location = ${}", next_param));
        next_param += 1;
    }
    if field.is_some() {
        filters.push_str(&format!(" AND p.field = ${}", next_param));
        next_param += 1;
    }
    if search_pattern.is_some() {
        filters.push_str(&format!(
            " AND (p.full_name ILIKE ${p} OR p.profession ILIKE ${p} OR p.bio ILIKE ${p})",
            p = next_param
        ));
        next_param += 1;
    }
    sql.push_str(&filters);
    sql.push_str(&format!(
        " GROUP BY p.id, c.id \
         ORDER BY p.connections_count DESC, p.created_at DESC LIMIT ${} OFFSET ${}",
        next_param,
        next_param + 1
    ));

    let mut rows_query = sqlx::query_as::<_, ProfessionalListing>(&sql).bind(user.id);
    if let Some(v) = location {
        rows_query = rows_query.bind(v);
    }
    if let Some(v) = field {
        rows_query = rows_query.bind(v);
    }
    if let Some(v) = &search_pattern {
        rows_query = rows_query.bind(v);
    }
    let rows = rows_query
        .bind(limit)
        .bind(offset)
        .fetch_all(&state.pool)
        .await?;

    let count_sql = format!(
        "SELECT COUNT(DISTINCT p.id) FROM professionals p \
         WHERE p.is_public = TRUE AND (p.user_id != $1 OR p.user_id IS NULL){}",
        filters
    );
    let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql).bind(user.id);
    if let Some(v) = location {
        count_query = count_query.bind(v);
    }
    if let Some(v) = field {
        count_query = count_query.bind(v);
    }
    if let Some(v) = &search_pattern {
        count_query = count_query.bind(v);
    }
    let total = count_query.fetch_one(&state.pool).await?;

    let data: Vec<Value> = rows
        .into_iter()
        .map(|p| {
            json!({
                "id": p.id,
                "userId": p.user_id,
                "name": p.full_name,
                "profession": p.profession,
                "location": p.location,
                "field": p.field,
                "avatar": p.avatar_url,
                "bio": p.bio,
                "connections": p.connections_count,
                "tags": p.tags,
                "connectionStatus": p.connection_status,
            })
        })
        .collect();

    Ok(Json(json!({
        "success": true,
        "data": data,
        "pagination": { "total": total, "limit": limit, "offset": offset },
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionRequestBody {
    pub receiver_id: Uuid,
    #[serde(default)]
    pub message: Option<String>,
}

/// POST /api/discover/connections/request
pub async fn send_connection_request(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(payload): Json<ConnectionRequestBody>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    if payload.receiver_id == user.id {
        return Err(ApiError::bad_request(
            "Cannot send connection request to yourself",
        ));
    }

    // At most one connection row per unordered user pair
    let existing = sqlx::query(
        "SELECT id FROM connections \
         WHERE (sender_id = $1 AND receiver_id = $2) OR (sender_id = $2 AND receiver_id = $1)",
    )
    .bind(user.id)
    .bind(payload.receiver_id)
    .fetch_optional(&state.pool)
    .await?;
    if existing.is_some() {
        return Err(ApiError::conflict("Connection request already exists"));
    }

    let sql = format!(
        "INSERT INTO connections (sender_id, receiver_id, message, status) \
         VALUES ($1, $2, $3, 'pending') RETURNING {}",
        connection::COLUMNS
    );
    let created = sqlx::query_as::<_, Connection>(&sql)
        .bind(user.id)
        .bind(payload.receiver_id)
        .bind(&payload.message)
        .fetch_one(&state.pool)
        .await?;

    // Receiver notification is best-effort
    let pool = state.pool.clone();
    let receiver = payload.receiver_id;
    let data = json!({ "connectionId": created.id, "senderId": user.id });
    crate::services::spawn_best_effort("connection notification", async move {
        sqlx::query(
            "INSERT INTO notifications (user_id, type, title, message, data) \
             VALUES ($1, 'connection_request', 'New Connection Request', $2, $3)",
        )
        .bind(receiver)
        .bind("You have received a new connection request")
        .bind(data)
        .execute(&pool)
        .await?;
        Ok(())
    });

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Connection request sent successfully",
            "data": created,
        })),
    ))
}

#[derive(Debug, Deserialize)]
pub struct ConnectionsQuery {
    pub status: Option<String>,
}

/// GET /api/discover/connections
pub async fn list_connections(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<ConnectionsQuery>,
) -> Result<Json<Value>, ApiError> {
    let mut sql = String::from(
        "SELECT c.id, c.sender_id, c.receiver_id, c.status, c.message, c.created_at, c.updated_at, \
         CASE WHEN c.sender_id = $1 THEN p2.full_name ELSE p1.full_name END AS other_user_name, \
         CASE WHEN c.sender_id = $1 THEN p2.profession ELSE p1.profession END AS other_user_profession, \
         CASE WHEN c.sender_id = $1 THEN p2.avatar_url ELSE p1.avatar_url END AS other_user_avatar \
         FROM connections c \
         LEFT JOIN professionals p1 ON c.sender_id = p1.user_id \
         LEFT JOIN professionals p2 ON c.receiver_id = p2.user_id \
         WHERE (c.sender_id = $1 OR c.receiver_id = $1)",
    );
    if query.status.is_some() {
        sql.push_str(" AND c.status = $2");
    }
    sql.push_str(" ORDER BY c.created_at DESC");

    let mut rows_query = sqlx::query_as::<_, ConnectionWithPeer>(&sql).bind(user.id);
    if let Some(status) = &query.status {
        rows_query = rows_query.bind(status);
    }
    let rows = rows_query.fetch_all(&state.pool).await?;

    let data: Vec<Value> = rows
        .into_iter()
        .map(|c| {
            json!({
                "id": c.id,
                "senderId": c.sender_id,
                "receiverId": c.receiver_id,
                "status": c.status,
                "message": c.message,
                "otherUser": {
                    "name": c.other_user_name,
                    "profession": c.other_user_profession,
                    "avatar": c.other_user_avatar,
                },
                "isSender": c.sender_id == user.id,
                "createdAt": c.created_at,
                "updatedAt": c.updated_at,
            })
        })
        .collect();

    Ok(Json(json!({ "success": true, "data": data })))
}

/// PATCH /api/discover/connections/:id/accept - receiver only
pub async fn accept_connection(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let sql = format!(
        "SELECT {} FROM connections WHERE id = $1 AND receiver_id = $2 AND status = 'pending'",
        connection::COLUMNS
    );
    let pending = sqlx::query_as::<_, Connection>(&sql)
        .bind(id)
        .bind(user.id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or_else(|| {
            ApiError::not_found("Connection request not found or already processed")
        })?;

    let sql = format!(
        "UPDATE connections SET status = 'accepted', updated_at = NOW() \
         WHERE id = $1 RETURNING {}",
        connection::COLUMNS
    );
    let updated = sqlx::query_as::<_, Connection>(&sql)
        .bind(id)
        .fetch_one(&state.pool)
        .await?;

    let pool = state.pool.clone();
    let sender = pending.sender_id;
    let data = json!({ "connectionId": id, "acceptedBy": user.id });
    crate::services::spawn_best_effort("connection notification", async move {
        sqlx::query(
            "INSERT INTO notifications (user_id, type, title, message, data) \
             VALUES ($1, 'connection_accepted', 'Connection Accepted', $2, $3)",
        )
        .bind(sender)
        .bind("Your connection request has been accepted")
        .bind(data)
        .execute(&pool)
        .await?;
        Ok(())
    });

    Ok(Json(json!({
        "success": true,
        "message": "Connection request accepted",
        "data": updated,
    })))
}

/// PATCH /api/discover/connections/:id/reject - receiver only
pub async fn reject_connection(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let sql = format!(
        "UPDATE connections SET status = 'rejected', updated_at = NOW() \
         WHERE id = $1 AND receiver_id = $2 AND status = 'pending' RETURNING {}",
        connection::COLUMNS
    );
    let updated = sqlx::query_as::<_, Connection>(&sql)
        .bind(id)
        .bind(user.id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or_else(|| {
            ApiError::not_found("Connection request not found or already processed")
        })?;

    Ok(Json(json!({
        "success": true,
        "message": "Connection request rejected",
        "data": updated,
    })))
}

/// GET /api/discover/locations
pub async fn list_locations(
    State(state): State<AppState>,
) -> Result<Json<Value>, ApiError> {
    let locations: Vec<String> = sqlx::query_scalar(
        "SELECT DISTINCT location FROM professionals \
         WHERE location IS NOT NULL AND is_public = TRUE ORDER BY location",
    )
    .fetch_all(&state.pool)
    .await?;

    let mut data = vec!["All".to_string()];
    data.extend(locations);

    Ok(Json(json!({ "success": true, "data": data })))
}

/// GET /api/discover/fields
pub async fn list_fields(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let fields: Vec<String> = sqlx::query_scalar(
        "SELECT DISTINCT field FROM professionals \
         WHERE field IS NOT NULL AND is_public = TRUE ORDER BY field",
    )
    .fetch_all(&state.pool)
    .await?;

    let mut data = vec!["All".to_string()];
    data.extend(fields);

    Ok(Json(json!({ "success": true, "data": data })))
}
