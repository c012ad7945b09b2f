//! Container and blob name rules applied before any storage call.

use thiserror::Error;

const MAX_BLOB_NAME_LEN: usize = 1024;
const CONTAINER_NAME_MIN_LEN: usize = 3;
const CONTAINER_NAME_MAX_LEN: usize = 63;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NameError {
    #[error("Invalid container name `{name}`: {reason}")]
    InvalidContainer { name: String, reason: &'static str },
    #[error("Invalid container name `{name}`. Valid containers: {allowed}")]
    ContainerNotAllowed { name: String, allowed: String },
    #[error("Invalid blob name: {0}")]
    InvalidBlobName(&'static str),
}

/// Validate a container name against Azure naming rules.
///
/// - 3–63 characters
/// - lowercase letters, digits and hyphens only
/// - must start and end with a letter or digit
/// - no consecutive hyphens
///
/// When `allowed` is non-empty the name must also be one of its entries
/// (case-insensitive).
pub fn ensure_container_name(name: &str, allowed: &[String]) -> Result<(), NameError> {
    let invalid = |reason| NameError::InvalidContainer {
        name: name.to_string(),
        reason,
    };

    let len = name.len();
    if !(CONTAINER_NAME_MIN_LEN..=CONTAINER_NAME_MAX_LEN).contains(&len) {
        return Err(invalid("must be between 3 and 63 characters"));
    }

    if !name
        .chars()
        .all(|c| matches!(c, 'a'..='z' | '0'..='9' | '-'))
    {
        return Err(invalid(
            "allowed characters are lowercase letters, digits, and hyphens",
        ));
    }

    if name.starts_with('-') || name.ends_with('-') {
        return Err(invalid("must start and end with a lowercase letter or digit"));
    }

    if name.contains("--") {
        return Err(invalid("cannot contain consecutive hyphens"));
    }

    if !allowed.is_empty()
        && !allowed
            .iter()
            .any(|candidate| candidate.eq_ignore_ascii_case(name))
    {
        return Err(NameError::ContainerNotAllowed {
            name: name.to_string(),
            allowed: allowed.join(", "),
        });
    }

    Ok(())
}

/// Blob name rules shared by every backend.
///
/// Names are 1 to 1024 characters, split on `/` into non-empty segments, and
/// no segment may be `.` or `..`. Backslashes and control characters are
/// rejected. Both backends would otherwise rewrite such names, so a listing
/// would not give back what was uploaded.
pub fn ensure_blob_name(name: &str) -> Result<(), NameError> {
    if name.is_empty() {
        return Err(NameError::InvalidBlobName("must not be empty"));
    }
    if name.chars().count() > MAX_BLOB_NAME_LEN {
        return Err(NameError::InvalidBlobName(
            "must be at most 1024 characters",
        ));
    }
    if name.starts_with('/') || name.ends_with('/') || name.contains("//") {
        return Err(NameError::InvalidBlobName(
            "must not start or end with `/` or contain empty path segments",
        ));
    }
    if name.split('/').any(|segment| segment == "." || segment == "..") {
        return Err(NameError::InvalidBlobName(
            "must not contain `.` or `..` path segments",
        ));
    }
    if name.chars().any(|c| c.is_control() || c == '\\') {
        return Err(NameError::InvalidBlobName(
            "must not contain control characters or backslashes",
        ));
    }
    Ok(())
}
