use axum::{
    extract::{Extension, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::password;
use crate::database::models::user::{self, User};
use crate::database::patch::{OwnedScope, SparsePatch};
use crate::error::ApiError;
use crate::middleware::CurrentUser;
use crate::services::mailer;
use crate::services::otp_service;
use crate::state::AppState;

use super::validate::{self, FieldErrors};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub full_name: Option<String>,
}

/// POST /api/auth/register
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let mut errors = FieldErrors::new();
    if !validate::is_valid_email(&payload.email) {
        errors.add("email", "Invalid email address");
    }
    if !validate::is_valid_username(&payload.username) {
        errors.add(
            "username",
            "Username must be 3-100 characters and contain only letters, numbers, and underscores",
        );
    }
    if payload.password.len() < 8 {
        errors.add("password", "Password must be at least 8 characters long");
    }
    if payload.full_name.as_deref().is_some_and(|n| n.len() > 255) {
        errors.add("fullName", "Must be at most 255 characters");
    }
    errors.into_result()?;

    let existing = sqlx::query("SELECT id FROM users WHERE email = $1 OR username = $2")
        .bind(&payload.email)
        .bind(&payload.username)
        .fetch_optional(&state.pool)
        .await?;
    if existing.is_some() {
        return Err(ApiError::conflict("Email or username already exists"));
    }

    let password_hash = password::hash(&payload.password, state.config.security.bcrypt_cost)?;

    let sql = format!(
        "INSERT INTO users (email, username, password_hash, full_name) \
         VALUES ($1, $2, $3, $4) RETURNING {}",
        user::COLUMNS
    );
    let created = sqlx::query_as::<_, User>(&sql)
        .bind(&payload.email)
        .bind(&payload.username)
        .bind(&password_hash)
        .bind(&payload.full_name)
        .fetch_one(&state.pool)
        .await?;

    let access_token = state.tokens.issue_access_token(created.id)?;
    let refresh_token = state.tokens.issue_refresh_token(created.id)?;

    // Welcome mail must not roll back a successful registration
    let mailer = state.mailer.clone();
    let to = created.email.clone();
    let (subject, body) =
        mailer::welcome_email(created.full_name.as_deref().unwrap_or(&created.username));
    crate::services::spawn_best_effort("welcome email", async move {
        mailer.send(&to, &subject, &body).await
    });

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "User registered successfully",
            "data": {
                "user": created,
                "accessToken": access_token,
                "refreshToken": refresh_token,
            }
        })),
    ))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<Value>, ApiError> {
    let mut errors = FieldErrors::new();
    if !validate::is_valid_email(&payload.email) {
        errors.add("email", "Invalid email address");
    }
    if payload.password.is_empty() {
        errors.add("password", "Password is required");
    }
    errors.into_result()?;

    let sql = format!("SELECT {} FROM users WHERE email = $1", user::COLUMNS);
    let row = sqlx::query_as::<_, User>(&sql)
        .bind(&payload.email)
        .fetch_optional(&state.pool)
        .await?;

    // Unknown email and wrong password get the identical response so the
    // endpoint cannot be used to enumerate accounts
    let Some(account) = row else {
        return Err(ApiError::unauthorized("Invalid email or password"));
    };
    if !account.is_active {
        return Err(ApiError::forbidden("Account is inactive"));
    }
    if !password::verify(&payload.password, &account.password_hash)? {
        return Err(ApiError::unauthorized("Invalid email or password"));
    }

    sqlx::query("UPDATE users SET last_login = NOW() WHERE id = $1")
        .bind(account.id)
        .execute(&state.pool)
        .await?;

    let access_token = state.tokens.issue_access_token(account.id)?;
    let refresh_token = state.tokens.issue_refresh_token(account.id)?;

    Ok(Json(json!({
        "success": true,
        "message": "Login successful",
        "data": {
            "user": account,
            "accessToken": access_token,
            "refreshToken": refresh_token,
        }
    })))
}

/// GET /api/auth/profile
pub async fn get_profile(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<Value>, ApiError> {
    let sql = format!("SELECT {} FROM users WHERE id = $1", user::COLUMNS);
    let profile = sqlx::query_as::<_, User>(&sql)
        .bind(user.id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(json!({ "success": true, "data": profile })))
}

/// PUT /api/auth/profile - sparse patch over the profile whitelist
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    let body = validate::as_object(&body)?;

    let mut errors = FieldErrors::new();
    validate::check_optional_str(&mut errors, body, "fullName", 255);
    errors.into_result()?;

    let patch = SparsePatch::from_body(user::PROFILE_FIELDS, body);
    let updated: Option<User> = patch
        .into_update("users", OwnedScope::self_owned(user.id), user::COLUMNS)?
        .fetch_updated(&state.pool)
        .await?;

    let profile = updated.ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(json!({
        "success": true,
        "message": "Profile updated successfully",
        "data": profile,
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// POST /api/auth/change-password
pub async fn change_password(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<Json<Value>, ApiError> {
    if payload.new_password.len() < 8 {
        let mut errors = FieldErrors::new();
        errors.add("newPassword", "Password must be at least 8 characters long");
        errors.into_result()?;
    }

    let current_hash: String = sqlx::query_scalar("SELECT password_hash FROM users WHERE id = $1")
        .bind(user.id)
        .fetch_one(&state.pool)
        .await?;

    if !password::verify(&payload.current_password, &current_hash)? {
        return Err(ApiError::unauthorized("Current password is incorrect"));
    }

    let new_hash = password::hash(&payload.new_password, state.config.security.bcrypt_cost)?;
    sqlx::query("UPDATE users SET password_hash = $1, updated_at = NOW() WHERE id = $2")
        .bind(&new_hash)
        .bind(user.id)
        .execute(&state.pool)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Password changed successfully",
    })))
}

#[derive(Debug, Deserialize)]
pub struct RequestOtpRequest {
    pub email: String,
    #[serde(default)]
    pub purpose: Option<String>,
}

/// POST /api/auth/request-otp
///
/// Succeeds whether or not delivery works; callers cannot probe the
/// delivery channel through this endpoint.
pub async fn request_otp(
    State(state): State<AppState>,
    Json(payload): Json<RequestOtpRequest>,
) -> Result<Json<Value>, ApiError> {
    if !validate::is_valid_email(&payload.email) {
        let mut errors = FieldErrors::new();
        errors.add("email", "Invalid email address");
        errors.into_result()?;
    }

    let purpose = payload
        .purpose
        .as_deref()
        .unwrap_or(otp_service::DEFAULT_PURPOSE);
    state.otp_service().request(&payload.email, purpose).await?;

    Ok(Json(json!({
        "success": true,
        "message": "OTP sent",
    })))
}

#[derive(Debug, Deserialize)]
pub struct VerifyOtpRequest {
    pub email: String,
    pub otp: String,
    #[serde(default)]
    pub purpose: Option<String>,
}

/// POST /api/auth/verify-otp
pub async fn verify_otp(
    State(state): State<AppState>,
    Json(payload): Json<VerifyOtpRequest>,
) -> Result<Json<Value>, ApiError> {
    let purpose = payload
        .purpose
        .as_deref()
        .unwrap_or(otp_service::DEFAULT_PURPOSE);
    state
        .otp_service()
        .verify(&payload.email, &payload.otp, purpose)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "OTP verified",
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub email: String,
    pub otp: String,
    pub new_password: String,
}

/// POST /api/auth/reset-password-otp
pub async fn reset_password_otp(
    State(state): State<AppState>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<Json<Value>, ApiError> {
    if payload.new_password.len() < 8 {
        let mut errors = FieldErrors::new();
        errors.add("newPassword", "Password must be at least 8 characters long");
        errors.into_result()?;
    }

    state
        .otp_service()
        .reset_password_with_otp(
            &payload.email,
            &payload.otp,
            &payload.new_password,
            state.config.security.bcrypt_cost,
        )
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Password reset successfully",
    })))
}
