use axum::{
    extract::{Extension, Query, State},
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::database::models::attendance::{self, AttendanceLog};
use crate::error::ApiError;
use crate::middleware::CurrentUser;
use crate::state::AppState;

use super::validate::FieldErrors;

const METHODS: &[&str] = &["nfc", "qr", "ble", "wifi", "manual"];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInRequest {
    pub event_id: String,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub checked_in_at: Option<DateTime<Utc>>,
}

fn validate_check_in(record: &CheckInRequest, errors: &mut FieldErrors) {
    if record.event_id.is_empty() || record.event_id.len() > 255 {
        errors.add("eventId", "Event id is required (1-255 characters)");
    }
    if let Some(method) = &record.method {
        if !METHODS.contains(&method.as_str()) {
            errors.add("method", "Method must be one of nfc, qr, ble, wifi, manual");
        }
    }
}

/// POST /api/attendance/check-in
pub async fn check_in(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(payload): Json<CheckInRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let mut errors = FieldErrors::new();
    validate_check_in(&payload, &mut errors);
    errors.into_result()?;

    let sql = format!(
        "INSERT INTO attendance_logs (user_id, event_id, method, checked_in_at) \
         VALUES ($1, $2, $3, COALESCE($4, NOW())) RETURNING {}",
        attendance::COLUMNS
    );
    let created = sqlx::query_as::<_, AttendanceLog>(&sql)
        .bind(user.id)
        .bind(&payload.event_id)
        .bind(payload.method.as_deref().unwrap_or("manual"))
        .bind(payload.checked_in_at)
        .fetch_one(&state.pool)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Checked in",
            "data": created,
        })),
    ))
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// GET /api/attendance - caller's check-in log, newest first
pub async fn list_check_ins(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Value>, ApiError> {
    let limit = query.limit.unwrap_or(50).clamp(1, 100);
    let offset = query.offset.unwrap_or(0).max(0);

    let sql = format!(
        "SELECT {} FROM attendance_logs WHERE user_id = $1 \
         ORDER BY checked_in_at DESC LIMIT $2 OFFSET $3",
        attendance::COLUMNS
    );
    let rows = sqlx::query_as::<_, AttendanceLog>(&sql)
        .bind(user.id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&state.pool)
        .await?;

    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM attendance_logs WHERE user_id = $1")
        .bind(user.id)
        .fetch_one(&state.pool)
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": rows,
        "pagination": { "total": total, "limit": limit, "offset": offset },
    })))
}

#[derive(Debug, Deserialize)]
pub struct BatchCheckInRequest {
    pub records: Vec<CheckInRequest>,
}

/// POST /api/attendance/batch - blind batch insert for offline sync.
/// Records are inserted as-is; there is no conflict resolution.
pub async fn batch_check_in(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(payload): Json<BatchCheckInRequest>,
) -> Result<Json<Value>, ApiError> {
    if payload.records.is_empty() {
        return Err(ApiError::bad_request("At least one record is required"));
    }

    let mut errors = FieldErrors::new();
    for record in &payload.records {
        validate_check_in(record, &mut errors);
    }
    errors.into_result()?;

    let mut tx = state.pool.begin().await?;
    for record in &payload.records {
        sqlx::query(
            "INSERT INTO attendance_logs (user_id, event_id, method, checked_in_at) \
             VALUES ($1, $2, $3, COALESCE($4, NOW()))",
        )
        .bind(user.id)
        .bind(&record.event_id)
        .bind(record.method.as_deref().unwrap_or("manual"))
        .bind(record.checked_in_at)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;

    Ok(Json(json!({
        "success": true,
        "imported": payload.records.len(),
    })))
}
