//! Field and identifier checks shared by the entity services.

use once_cell::sync::Lazy;
use regex::Regex;

use super::error::{ServiceError, ServiceResult};
use crate::codec;
use crate::database::models::EntityKind;

static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\S+@\S+\.\S+$").expect("email pattern is valid")
});

/// Decode an opaque id, scoping a failure to `entity`.
pub fn decode_id(entity: EntityKind, opaque: &str) -> ServiceResult<i64> {
    codec::decode(opaque).map_err(|_| {
        tracing::debug!("Rejected {} identifier {:?}", entity, opaque);
        ServiceError::InvalidIdentifier { entity }
    })
}

/// Trimmed value of a field that must be present and non-blank.
pub fn required(field: &'static str, value: &Option<String>) -> ServiceResult<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ServiceError::validation(field, format!("{field} is required")))
}

pub fn email(field: &'static str, value: &str) -> ServiceResult<()> {
    if EMAIL.is_match(value.trim()) {
        Ok(())
    } else {
        Err(ServiceError::validation(field, format!("{field} must be a valid email address")))
    }
}

pub fn password(field: &'static str, value: &str, min_length: usize) -> ServiceResult<()> {
    if value.chars().count() >= min_length {
        Ok(())
    } else {
        Err(ServiceError::validation(
            field,
            format!("{field} must be at least {min_length} characters"),
        ))
    }
}

/// Hierarchy rank: a positive integer that fits the storage column.
pub fn hierarchy_level(field: &'static str, value: i64) -> ServiceResult<i32> {
    i32::try_from(value)
        .ok()
        .filter(|v| *v > 0)
        .ok_or_else(|| ServiceError::validation(field, format!("{field} must be a positive integer")))
}
