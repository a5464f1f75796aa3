//! Sparse partial-update construction.
//!
//! Every PUT handler hands a whitelist of field descriptors and the raw
//! request body to `SparsePatch`, which produces a parameterized UPDATE
//! touching exactly the fields the request carried. Values are always bound,
//! never interpolated into the query text.

use serde_json::{Map, Value};
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::{FromRow, PgPool};
use thiserror::Error;
use uuid::Uuid;

/// One updatable field: the name clients send and the column it maps to.
/// Whitelists are fixed per entity; iteration is always over the whitelist,
/// never over the request body, so unknown keys are silently ignored.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub api_name: &'static str,
    pub column: &'static str,
}

impl FieldSpec {
    pub const fn new(api_name: &'static str, column: &'static str) -> Self {
        Self { api_name, column }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum PatchError {
    #[error("No fields to update")]
    NoFieldsToUpdate,
}

/// Row scope for an update: the record id plus the owning user. Mutations
/// are never issued without both, so a guessed id belonging to another user
/// matches zero rows. `owner_column` is `user_id` for owned entities and
/// `id` for self-owned rows (a user updating their own profile).
#[derive(Debug, Clone, Copy)]
pub struct OwnedScope {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub owner_column: &'static str,
    pub exclude_soft_deleted: bool,
}

impl OwnedScope {
    pub fn owned_by(id: Uuid, owner_id: Uuid) -> Self {
        Self {
            id,
            owner_id,
            owner_column: "user_id",
            exclude_soft_deleted: false,
        }
    }

    pub fn soft_deletable(id: Uuid, owner_id: Uuid) -> Self {
        Self {
            exclude_soft_deleted: true,
            ..Self::owned_by(id, owner_id)
        }
    }

    pub fn self_owned(id: Uuid) -> Self {
        Self {
            id,
            owner_id: id,
            owner_column: "id",
            exclude_soft_deleted: false,
        }
    }
}

/// The subset of whitelisted fields a request actually carried.
///
/// A field that is present with JSON `null` is kept (and written as SQL
/// NULL); a field that is absent is never touched.
#[derive(Debug, Clone)]
pub struct SparsePatch {
    sets: Vec<(&'static str, Value)>,
}

impl SparsePatch {
    pub fn from_body(fields: &[FieldSpec], body: &Map<String, Value>) -> Self {
        let sets = fields
            .iter()
            .filter_map(|f| body.get(f.api_name).map(|v| (f.column, v.clone())))
            .collect();
        Self { sets }
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Build the UPDATE statement. Placeholders `$1..$n` are the field
    /// values in whitelist order, `$n+1` the record id, `$n+2` the owner id.
    /// `updated_at` is always touched alongside the requested fields.
    pub fn into_update(
        self,
        table: &str,
        scope: OwnedScope,
        returning: &str,
    ) -> Result<PatchQuery, PatchError> {
        if self.sets.is_empty() {
            return Err(PatchError::NoFieldsToUpdate);
        }

        let assignments: Vec<String> = self
            .sets
            .iter()
            .enumerate()
            .map(|(i, (column, _))| format!("\"{}\" = ${}", column, i + 1))
            .collect();

        let id_param = self.sets.len() + 1;
        let owner_param = id_param + 1;

        let mut sql = format!(
            "UPDATE \"{}\" SET {}, updated_at = NOW() WHERE id = ${} AND \"{}\" = ${}",
            table,
            assignments.join(", "),
            id_param,
            scope.owner_column,
            owner_param,
        );
        if scope.exclude_soft_deleted {
            sql.push_str(" AND is_deleted = FALSE");
        }
        sql.push_str(&format!(" RETURNING {}", returning));

        Ok(PatchQuery {
            sql,
            params: self.sets.into_iter().map(|(_, v)| v).collect(),
            id: scope.id,
            owner_id: scope.owner_id,
        })
    }
}

/// A ready-to-execute parameterized update.
#[derive(Debug)]
pub struct PatchQuery {
    sql: String,
    params: Vec<Value>,
    id: Uuid,
    owner_id: Uuid,
}

impl PatchQuery {
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Execute and return the updated projection, or `None` when the row
    /// does not exist under the given owner.
    pub async fn fetch_updated<T>(&self, pool: &PgPool) -> Result<Option<T>, sqlx::Error>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        let mut query = sqlx::query_as::<_, T>(&self.sql);
        for value in &self.params {
            query = bind_value(query, value);
        }
        query.bind(self.id).bind(self.owner_id).fetch_optional(pool).await
    }
}

/// Check that a record exists under the given owner before attempting a
/// mutation, so callers can produce a precise 404 instead of a silent no-op.
pub async fn ensure_owned(
    pool: &PgPool,
    table: &str,
    id: Uuid,
    owner_id: Uuid,
    exclude_soft_deleted: bool,
) -> Result<bool, sqlx::Error> {
    let mut sql = format!(
        "SELECT id FROM \"{}\" WHERE id = $1 AND user_id = $2",
        table
    );
    if exclude_soft_deleted {
        sql.push_str(" AND is_deleted = FALSE");
    }

    let row = sqlx::query(&sql)
        .bind(id)
        .bind(owner_id)
        .fetch_optional(pool)
        .await?;
    Ok(row.is_some())
}

fn bind_value<'q, O>(
    query: sqlx::query::QueryAs<'q, sqlx::Postgres, O, PgArguments>,
    value: &'q Value,
) -> sqlx::query::QueryAs<'q, sqlx::Postgres, O, PgArguments>
where
    O: for<'r> FromRow<'r, PgRow>,
{
    match value {
        Value::Null => {
            let none: Option<String> = None;
            query.bind(none)
        }
        Value::Bool(b) => query.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                query.bind(i)
            } else if let Some(f) = n.as_f64() {
                query.bind(f)
            } else {
                query.bind(n.to_string())
            }
        }
        Value::String(s) => query.bind(s),
        // Arrays and objects go to JSONB columns
        _ => query.bind(value.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const FIELDS: &[FieldSpec] = &[
        FieldSpec::new("fullName", "full_name"),
        FieldSpec::new("jobTitle", "job_title"),
        FieldSpec::new("isFavorite", "is_favorite"),
    ];

    fn body(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    fn scope() -> OwnedScope {
        OwnedScope::soft_deletable(Uuid::new_v4(), Uuid::new_v4())
    }

    #[test]
    fn builds_assignments_in_whitelist_order() {
        let patch = SparsePatch::from_body(
            FIELDS,
            &body(json!({"jobTitle": "Engineer", "fullName": "Alice"})),
        );
        let query = patch
            .into_update("business_cards", scope(), "id, full_name")
            .unwrap();

        assert_eq!(
            query.sql(),
            "UPDATE \"business_cards\" SET \"full_name\" = $1, \"job_title\" = $2, \
             updated_at = NOW() WHERE id = $3 AND \"user_id\" = $4 AND is_deleted = FALSE \
             RETURNING id, full_name"
        );
        assert_eq!(query.params, vec![json!("Alice"), json!("Engineer")]);
    }

    #[test]
    fn absent_fields_are_never_touched() {
        let patch = SparsePatch::from_body(FIELDS, &body(json!({"jobTitle": "Engineer"})));
        let query = patch.into_update("business_cards", scope(), "id").unwrap();

        assert!(!query.sql().contains("full_name"));
        assert!(!query.sql().contains("is_favorite"));
    }

    #[test]
    fn explicit_null_is_written_not_skipped() {
        let patch = SparsePatch::from_body(FIELDS, &body(json!({"jobTitle": null})));
        let query = patch.into_update("business_cards", scope(), "id").unwrap();

        assert!(query.sql().contains("\"job_title\" = $1"));
        assert_eq!(query.params, vec![Value::Null]);
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let patch = SparsePatch::from_body(
            FIELDS,
            &body(json!({"fullName": "Alice", "userId": "evil", "id": "evil"})),
        );
        let query = patch.into_update("business_cards", scope(), "id").unwrap();

        assert!(query.sql().contains("\"full_name\" = $1"));
        assert!(query.sql().ends_with("RETURNING id"));
        assert_eq!(query.params.len(), 1);
    }

    #[test]
    fn empty_patch_fails_before_any_mutation() {
        let patch = SparsePatch::from_body(FIELDS, &body(json!({"unrelated": 1})));
        assert!(patch.is_empty());
        assert_eq!(
            patch
                .into_update("business_cards", scope(), "id")
                .unwrap_err(),
            PatchError::NoFieldsToUpdate
        );
    }

    #[test]
    fn soft_delete_guard_is_optional() {
        let patch = SparsePatch::from_body(FIELDS, &body(json!({"fullName": "A"})));
        let query = patch
            .into_update(
                "tags",
                OwnedScope::owned_by(Uuid::new_v4(), Uuid::new_v4()),
                "id",
            )
            .unwrap();

        assert!(!query.sql().contains("is_deleted"));
    }

    #[test]
    fn self_owned_scope_matches_the_record_itself() {
        let id = Uuid::new_v4();
        let patch = SparsePatch::from_body(FIELDS, &body(json!({"fullName": "A"})));
        let query = patch
            .into_update("users", OwnedScope::self_owned(id), "id")
            .unwrap();

        assert!(query.sql().contains("WHERE id = $2 AND \"id\" = $3"));
    }

    #[test]
    fn always_touches_updated_at() {
        let patch = SparsePatch::from_body(FIELDS, &body(json!({"isFavorite": true})));
        let query = patch.into_update("business_cards", scope(), "id").unwrap();
        assert!(query.sql().contains("updated_at = NOW()"));
    }
}
