use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::config::SecurityConfig;

pub mod password;

/// Claims embedded in every issued token. Tokens are self-contained: nothing
/// is persisted server-side, so validity is signature + expiry + the user
/// still existing (checked by the auth middleware).
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub kind: TokenKind,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Access,
    Refresh,
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Invalid token signature or format")]
    InvalidSignature,

    #[error("Token expired")]
    Expired,

    #[error("Token generation error: {0}")]
    Generation(String),
}

/// Issues and verifies signed bearer tokens. The signing key is loaded once
/// at startup from configuration; the service is cheap to clone and shared
/// through `AppState`.
#[derive(Clone)]
pub struct TokenService {
    inner: Arc<TokenServiceInner>,
}

struct TokenServiceInner {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenService {
    pub fn new(security: &SecurityConfig) -> Self {
        let secret = security.jwt_secret.as_bytes();
        Self {
            inner: Arc::new(TokenServiceInner {
                encoding_key: EncodingKey::from_secret(secret),
                decoding_key: DecodingKey::from_secret(secret),
                access_ttl: Duration::days(security.access_token_ttl_days),
                refresh_ttl: Duration::days(security.refresh_token_ttl_days),
            }),
        }
    }

    /// Short-lived credential for API requests (default 7 days).
    pub fn issue_access_token(&self, user_id: Uuid) -> Result<String, TokenError> {
        self.issue(user_id, TokenKind::Access, self.inner.access_ttl)
    }

    /// Long-lived credential for re-authentication (default 30 days).
    pub fn issue_refresh_token(&self, user_id: Uuid) -> Result<String, TokenError> {
        self.issue(user_id, TokenKind::Refresh, self.inner.refresh_ttl)
    }

    fn issue(&self, user_id: Uuid, kind: TokenKind, ttl: Duration) -> Result<String, TokenError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id,
            kind,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };

        encode(&Header::default(), &claims, &self.inner.encoding_key)
            .map_err(|e| TokenError::Generation(e.to_string()))
    }

    /// Check signature and expiry, returning the embedded claims. Whether the
    /// referenced user still exists and is active is the caller's problem.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        decode::<Claims>(token, &self.inner.decoding_key, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::InvalidSignature,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> TokenService {
        TokenService::new(&SecurityConfig {
            jwt_secret: "test-secret".to_string(),
            access_token_ttl_days: 7,
            refresh_token_ttl_days: 30,
            bcrypt_cost: 4,
            cors_origin: "*".to_string(),
        })
    }

    #[test]
    fn access_token_round_trips() {
        let service = service();
        let user_id = Uuid::new_v4();

        let token = service.issue_access_token(user_id).unwrap();
        let claims = service.verify(&token).unwrap();

        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.kind, TokenKind::Access);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn refresh_token_carries_kind() {
        let service = service();
        let token = service.issue_refresh_token(Uuid::new_v4()).unwrap();
        let claims = service.verify(&token).unwrap();
        assert_eq!(claims.kind, TokenKind::Refresh);
    }

    #[test]
    fn expired_token_is_rejected_as_expired() {
        let service = service();
        // Issue a token that expired well past the default validation leeway
        let token = service
            .issue(Uuid::new_v4(), TokenKind::Access, Duration::minutes(-10))
            .unwrap();

        assert!(matches!(service.verify(&token), Err(TokenError::Expired)));
    }

    #[test]
    fn token_signed_with_other_secret_is_invalid() {
        let service = service();
        let other = TokenService::new(&SecurityConfig {
            jwt_secret: "other-secret".to_string(),
            access_token_ttl_days: 7,
            refresh_token_ttl_days: 30,
            bcrypt_cost: 4,
            cors_origin: "*".to_string(),
        });

        let token = other.issue_access_token(Uuid::new_v4()).unwrap();
        assert!(matches!(
            service.verify(&token),
            Err(TokenError::InvalidSignature)
        ));
    }

    #[test]
    fn garbage_is_invalid() {
        assert!(matches!(
            service().verify("not-a-token"),
            Err(TokenError::InvalidSignature)
        ));
    }
}
