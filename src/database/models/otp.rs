use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// One-time code row. Rows are never updated in place except to set the
/// `used` flag; newer codes supersede older ones for the same
/// (email, purpose) pair.
#[derive(Debug, Clone, FromRow)]
pub struct Otp {
    pub id: Uuid,
    pub email: String,
    pub code: String,
    pub purpose: String,
    pub expires_at: DateTime<Utc>,
    pub used: bool,
    pub created_at: DateTime<Utc>,
}
