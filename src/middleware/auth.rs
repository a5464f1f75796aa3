use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::auth::TokenKind;
use crate::database::models::user;
use crate::error::ApiError;
use crate::state::AppState;

/// Authenticated user context extracted from a verified bearer token and a
/// live users-table lookup, attached to the request for handlers.
#[derive(Clone, Debug)]
pub struct CurrentUser {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub full_name: Option<String>,
}

/// Bearer authentication middleware.
///
/// Per request: missing token rejects 401; a token failing signature or
/// expiry checks rejects 401; a token whose user no longer exists rejects
/// 401; an inactive account rejects 403. Otherwise the resolved user is
/// attached and the request proceeds.
pub async fn require_auth(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = resolve_user(&state, &headers).await?;
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

/// Variant for endpoints that personalize behavior for authenticated callers
/// but must not reject anonymous ones: any failure in the chain silently
/// degrades to "no user".
pub async fn optional_auth(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Response {
    if let Ok(user) = resolve_user(&state, &headers).await {
        request.extensions_mut().insert(user);
    }
    next.run(request).await
}

async fn resolve_user(state: &AppState, headers: &HeaderMap) -> Result<CurrentUser, ApiError> {
    let token = extract_bearer(headers)?;

    let claims = state.tokens.verify(&token)?;
    if claims.kind != TokenKind::Access {
        return Err(ApiError::unauthorized("Access token required"));
    }

    // Token validity includes the referenced user still existing and being
    // active; a stale token for a deleted account must not authenticate.
    let sql = format!("SELECT {} FROM users WHERE id = $1", user::COLUMNS);
    let row = sqlx::query_as::<_, user::User>(&sql)
        .bind(claims.sub)
        .fetch_optional(&state.pool)
        .await?;

    let user = row.ok_or_else(|| ApiError::unauthorized("User not found"))?;
    if !user.is_active {
        return Err(ApiError::forbidden("Account is inactive"));
    }

    Ok(CurrentUser {
        id: user.id,
        email: user.email,
        username: user.username,
        full_name: user.full_name,
    })
}

/// Extract the token from an `Authorization: Bearer <token>` header.
fn extract_bearer(headers: &HeaderMap) -> Result<String, ApiError> {
    let auth_header = headers
        .get("authorization")
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| ApiError::unauthorized("Access token required"))?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| ApiError::unauthorized("Authorization header must use Bearer token format"))?
        .trim();

    if token.is_empty() {
        return Err(ApiError::unauthorized("Empty bearer token"));
    }
    Ok(token.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn missing_header_is_unauthorized() {
        let err = extract_bearer(&HeaderMap::new()).unwrap_err();
        assert_eq!(err.status_code(), 401);
    }

    #[test]
    fn non_bearer_scheme_is_rejected() {
        let err = extract_bearer(&headers_with("Basic abc123")).unwrap_err();
        assert_eq!(err.status_code(), 401);
    }

    #[test]
    fn empty_token_is_rejected() {
        let err = extract_bearer(&headers_with("Bearer   ")).unwrap_err();
        assert_eq!(err.status_code(), 401);
    }

    #[test]
    fn bearer_token_is_extracted() {
        let token = extract_bearer(&headers_with("Bearer abc.def.ghi")).unwrap();
        assert_eq!(token, "abc.def.ghi");
    }
}
