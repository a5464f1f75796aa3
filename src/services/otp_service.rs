use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use sqlx::PgPool;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::auth::password;
use crate::database::models::otp::Otp;
use crate::services::mailer::{self, Mailer};

pub const DEFAULT_PURPOSE: &str = "verification";
pub const RESET_PURPOSE: &str = "forgot-password";

const CODE_TTL_MINUTES: i64 = 10;

#[derive(Debug, Error)]
pub enum OtpError {
    #[error("No verification code found")]
    NotFound,

    #[error("Verification code already used")]
    AlreadyUsed,

    #[error("Verification code expired")]
    Expired,

    #[error("Verification code mismatch")]
    Mismatch,

    #[error("No active account for this email")]
    UserNotFound,

    #[error(transparent)]
    Storage(#[from] sqlx::Error),

    #[error(transparent)]
    Hash(#[from] bcrypt::BcryptError),
}

/// Issues and verifies one-time codes bound to (email, purpose).
///
/// New codes supersede older ones without deleting them; verification always
/// works against the most recently created row. A code can succeed at most
/// once: consumption is a conditional update, so concurrent verifications
/// race for a single winner.
pub struct OtpService {
    pool: PgPool,
    mailer: Arc<dyn Mailer>,
}

impl OtpService {
    pub fn new(pool: PgPool, mailer: Arc<dyn Mailer>) -> Self {
        Self { pool, mailer }
    }

    /// Create a fresh code and attempt out-of-band delivery. Delivery is
    /// best-effort: a failed send is logged, not surfaced, so callers cannot
    /// probe the delivery channel.
    pub async fn request(&self, email: &str, purpose: &str) -> Result<(), OtpError> {
        let code = generate_code();
        let expires_at = Utc::now() + Duration::minutes(CODE_TTL_MINUTES);

        sqlx::query(
            "INSERT INTO otps (email, code, purpose, expires_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(email)
        .bind(&code)
        .bind(purpose)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        let mailer = self.mailer.clone();
        let to = email.to_string();
        let (subject, body) = mailer::otp_email(&code, purpose);
        crate::services::spawn_best_effort("otp email", async move {
            mailer.send(&to, &subject, &body).await
        });

        Ok(())
    }

    /// Verify the latest code for (email, purpose) and consume it.
    pub async fn verify(&self, email: &str, code: &str, purpose: &str) -> Result<(), OtpError> {
        let row = self.latest(email, purpose).await?;
        let id = evaluate(row.as_ref(), code, Utc::now())?;
        self.consume(id).await
    }

    /// Verify a `forgot-password` code, then replace the account credential.
    /// The code is consumed even when no active account matches the email;
    /// a failed reset must not leave a retryable code behind.
    pub async fn reset_password_with_otp(
        &self,
        email: &str,
        code: &str,
        new_password: &str,
        bcrypt_cost: u32,
    ) -> Result<(), OtpError> {
        self.verify(email, code, RESET_PURPOSE).await?;

        let hashed = password::hash(new_password, bcrypt_cost)?;
        let result = sqlx::query(
            "UPDATE users SET password_hash = $1, updated_at = NOW() \
             WHERE email = $2 AND is_active = TRUE",
        )
        .bind(&hashed)
        .bind(email)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(OtpError::UserNotFound);
        }
        Ok(())
    }

    async fn latest(&self, email: &str, purpose: &str) -> Result<Option<Otp>, sqlx::Error> {
        sqlx::query_as::<_, Otp>(
            "SELECT id, email, code, purpose, expires_at, used, created_at \
             FROM otps WHERE email = $1 AND purpose = $2 \
             ORDER BY created_at DESC LIMIT 1",
        )
        .bind(email)
        .bind(purpose)
        .fetch_optional(&self.pool)
        .await
    }

    /// Mark the code used. The `used = FALSE` guard makes consumption
    /// atomic: of two concurrent verifications, exactly one wins.
    async fn consume(&self, id: Uuid) -> Result<(), OtpError> {
        let result = sqlx::query("UPDATE otps SET used = TRUE WHERE id = $1 AND used = FALSE")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(OtpError::AlreadyUsed);
        }
        Ok(())
    }
}

/// Uniformly random 6-digit decimal code, leading zeros preserved.
fn generate_code() -> String {
    format!("{:06}", rand::thread_rng().gen_range(0..1_000_000u32))
}

/// Check sequence against the fetched row. Order matters for user-facing
/// error precision: existence, then used, then expiry, then code match.
fn evaluate(row: Option<&Otp>, code: &str, now: DateTime<Utc>) -> Result<Uuid, OtpError> {
    let row = row.ok_or(OtpError::NotFound)?;
    if row.used {
        return Err(OtpError::AlreadyUsed);
    }
    if now > row.expires_at {
        return Err(OtpError::Expired);
    }
    if row.code != code {
        return Err(OtpError::Mismatch);
    }
    Ok(row.id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn otp_row(code: &str, used: bool, expires_in_minutes: i64) -> Otp {
        let now = Utc::now();
        Otp {
            id: Uuid::new_v4(),
            email: "bob@example.com".to_string(),
            code: code.to_string(),
            purpose: RESET_PURPOSE.to_string(),
            expires_at: now + Duration::minutes(expires_in_minutes),
            used,
            created_at: now,
        }
    }

    #[test]
    fn generated_codes_are_six_decimal_digits() {
        for _ in 0..100 {
            let code = generate_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn missing_row_is_not_found() {
        assert!(matches!(
            evaluate(None, "123456", Utc::now()),
            Err(OtpError::NotFound)
        ));
    }

    #[test]
    fn used_wins_over_expiry_and_mismatch() {
        // A used, expired row with the wrong code still reports AlreadyUsed
        let row = otp_row("123456", true, -5);
        assert!(matches!(
            evaluate(Some(&row), "999999", Utc::now()),
            Err(OtpError::AlreadyUsed)
        ));
    }

    #[test]
    fn expired_code_fails_even_when_it_matches() {
        let row = otp_row("123456", false, -1);
        assert!(matches!(
            evaluate(Some(&row), "123456", Utc::now()),
            Err(OtpError::Expired)
        ));
    }

    #[test]
    fn wrong_code_is_a_mismatch() {
        let row = otp_row("123456", false, 10);
        assert!(matches!(
            evaluate(Some(&row), "654321", Utc::now()),
            Err(OtpError::Mismatch)
        ));
    }

    #[test]
    fn fresh_matching_code_verifies() {
        let row = otp_row("042137", false, 10);
        assert_eq!(evaluate(Some(&row), "042137", Utc::now()).unwrap(), row.id);
    }
}
