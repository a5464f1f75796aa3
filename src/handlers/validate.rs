//! Request validation helpers. All checks run before any storage access so a
//! malformed request never reaches the pool.

use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::error::ApiError;

/// Accumulates per-field problems for a single 400 response.
#[derive(Debug, Default)]
pub struct FieldErrors {
    errors: HashMap<String, String>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.errors.insert(field.to_string(), message.into());
    }

    pub fn into_result(self) -> Result<(), ApiError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::validation_error(
                "Validation error",
                Some(self.errors),
            ))
        }
    }
}

pub fn is_valid_email(s: &str) -> bool {
    if s.contains(char::is_whitespace) {
        return false;
    }
    match s.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.len() >= 3
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}

pub fn is_valid_username(s: &str) -> bool {
    (3..=100).contains(&s.len()) && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

pub fn is_valid_hex_color(s: &str) -> bool {
    s.len() == 7 && s.starts_with('#') && s[1..].chars().all(|c| c.is_ascii_hexdigit())
}

/// Optional string field in a sparse body: absent and explicit null are both
/// fine (null clears the column), anything else must be a string within the
/// length bound.
pub fn check_optional_str(errors: &mut FieldErrors, body: &Map<String, Value>, key: &str, max_len: usize) {
    match body.get(key) {
        None | Some(Value::Null) => {}
        Some(Value::String(s)) if s.len() <= max_len => {}
        Some(Value::String(_)) => errors.add(key, format!("Must be at most {} characters", max_len)),
        Some(_) => errors.add(key, "Must be a string"),
    }
}

/// Like `check_optional_str` but null is not allowed (NOT NULL column).
pub fn check_optional_required_str(
    errors: &mut FieldErrors,
    body: &Map<String, Value>,
    key: &str,
    max_len: usize,
) {
    match body.get(key) {
        None => {}
        Some(Value::String(s)) if !s.is_empty() && s.len() <= max_len => {}
        Some(Value::String(_)) => {
            errors.add(key, format!("Must be 1-{} characters", max_len))
        }
        Some(_) => errors.add(key, "Must be a non-empty string"),
    }
}

pub fn check_optional_bool(errors: &mut FieldErrors, body: &Map<String, Value>, key: &str) {
    match body.get(key) {
        None | Some(Value::Bool(_)) => {}
        Some(_) => errors.add(key, "Must be a boolean"),
    }
}

pub fn check_optional_email(errors: &mut FieldErrors, body: &Map<String, Value>, key: &str) {
    match body.get(key) {
        None | Some(Value::Null) => {}
        Some(Value::String(s)) if is_valid_email(s) => {}
        Some(_) => errors.add(key, "Invalid email address"),
    }
}

pub fn check_optional_color(errors: &mut FieldErrors, body: &Map<String, Value>, key: &str) {
    match body.get(key) {
        None => {}
        Some(Value::String(s)) if is_valid_hex_color(s) => {}
        Some(_) => errors.add(key, "Color must be a valid hex color"),
    }
}

/// Pull the JSON object out of a request body, rejecting non-object bodies.
pub fn as_object(body: &Value) -> Result<&Map<String, Value>, ApiError> {
    body.as_object()
        .ok_or_else(|| ApiError::bad_request("Request body must be a JSON object"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn email_validation() {
        assert!(is_valid_email("alice@example.com"));
        assert!(is_valid_email("a.b+tag@sub.example.org"));
        assert!(!is_valid_email("alice"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("alice@nodot"));
        assert!(!is_valid_email("alice@.com"));
        assert!(!is_valid_email("alice @example.com"));
    }

    #[test]
    fn username_validation() {
        assert!(is_valid_username("alice"));
        assert!(is_valid_username("alice_42"));
        assert!(!is_valid_username("al"));
        assert!(!is_valid_username("has space"));
        assert!(!is_valid_username(&"x".repeat(101)));
    }

    #[test]
    fn hex_color_validation() {
        assert!(is_valid_hex_color("#1E88E5"));
        assert!(is_valid_hex_color("#abcdef"));
        assert!(!is_valid_hex_color("1E88E5"));
        assert!(!is_valid_hex_color("#1E88E"));
        assert!(!is_valid_hex_color("#1E88EZ"));
    }

    #[test]
    fn optional_str_allows_null_but_not_numbers() {
        let body = json!({"notes": null, "phone": 42});
        let map = body.as_object().unwrap();

        let mut errors = FieldErrors::new();
        check_optional_str(&mut errors, map, "notes", 100);
        check_optional_str(&mut errors, map, "absent", 100);
        assert!(errors.into_result().is_ok());

        let mut errors = FieldErrors::new();
        check_optional_str(&mut errors, map, "phone", 100);
        assert!(errors.into_result().is_err());
    }

    #[test]
    fn field_errors_surface_as_400() {
        let mut errors = FieldErrors::new();
        errors.add("email", "Invalid email address");
        let err = errors.into_result().unwrap_err();
        assert_eq!(err.status_code(), 400);
    }
}
