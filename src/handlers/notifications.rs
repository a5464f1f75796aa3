use axum::{
    extract::{Extension, Path, State},
    response::Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::database::models::notification::{self, Notification};
use crate::error::ApiError;
use crate::middleware::CurrentUser;
use crate::state::AppState;

/// GET /api/notifications - newest first
pub async fn list_notifications(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<Value>, ApiError> {
    let sql = format!(
        "SELECT {} FROM notifications WHERE user_id = $1 ORDER BY created_at DESC",
        notification::COLUMNS
    );
    let rows = sqlx::query_as::<_, Notification>(&sql)
        .bind(user.id)
        .fetch_all(&state.pool)
        .await?;

    Ok(Json(json!({ "success": true, "data": rows })))
}

/// PATCH /api/notifications/:id/read
pub async fn mark_as_read(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let row: Option<(Uuid, bool)> = sqlx::query_as(
        "UPDATE notifications SET is_read = TRUE \
         WHERE id = $1 AND user_id = $2 RETURNING id, is_read",
    )
    .bind(id)
    .bind(user.id)
    .fetch_optional(&state.pool)
    .await?;

    let (id, is_read) = row.ok_or_else(|| ApiError::not_found("Notification not found"))?;

    Ok(Json(json!({
        "success": true,
        "data": { "id": id, "isRead": is_read },
    })))
}

/// DELETE /api/notifications/:id
pub async fn delete_notification(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let deleted =
        sqlx::query("DELETE FROM notifications WHERE id = $1 AND user_id = $2 RETURNING id")
            .bind(id)
            .bind(user.id)
            .fetch_optional(&state.pool)
            .await?;

    if deleted.is_none() {
        return Err(ApiError::not_found("Notification not found"));
    }

    Ok(Json(json!({
        "success": true,
        "message": "Notification deleted",
    })))
}
