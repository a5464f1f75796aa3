use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

/// Discover-page row: a public professional profile with its aggregated tag
/// list and the caller's connection status towards it (if any).
#[derive(Debug, Clone, FromRow)]
pub struct ProfessionalListing {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub full_name: String,
    pub profession: Option<String>,
    pub location: Option<String>,
    pub field: Option<String>,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub connections_count: i32,
    pub tags: Value,
    pub connection_status: Option<String>,
}
