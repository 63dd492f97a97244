//! Input validation used by several commands

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NameValidationError {
    #[error("Name is required and cannot be empty")]
    Required,

    #[error("Name must be between 1 and {max_length} characters")]
    TooLong { max_length: usize },
}

/// Non-blank, at most `max_length` characters
pub fn validate_name(name: &str, max_length: usize) -> Result<(), NameValidationError> {
    if name.trim().is_empty() {
        return Err(NameValidationError::Required);
    }
    if name.chars().count() > max_length {
        return Err(NameValidationError::TooLong { max_length });
    }
    Ok(())
}

pub const MAX_DESCRIPTION_LENGTH: usize = 10_000;

pub fn validate_description(description: Option<&str>) -> Result<(), String> {
    match description {
        Some(d) if d.chars().count() > MAX_DESCRIPTION_LENGTH => Err(format!(
            "Description must be at most {} characters",
            MAX_DESCRIPTION_LENGTH
        )),
        _ => Ok(()),
    }
}

/// Class labels of a project: each non-blank and distinct after trimming
pub fn validate_class_names(class_names: &[String]) -> Result<(), String> {
    let mut seen = std::collections::HashSet::new();
    for name in class_names {
        let name = name.trim();
        if name.is_empty() {
            return Err("Class names cannot be empty".to_string());
        }
        if name.chars().count() > 256 {
            return Err("Class names must be at most 256 characters".to_string());
        }
        if !seen.insert(name) {
            return Err(format!("Duplicate class name '{}'", name));
        }
    }
    Ok(())
}

/// Structural email check: one `@`, non-empty local part, dotted domain
pub fn validate_email(email: &str) -> Result<(), String> {
    let email = email.trim();
    if email.is_empty() {
        return Err("Email is required".to_string());
    }
    if email.len() > 320 {
        return Err("Email must be at most 320 characters".to_string());
    }
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        },
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(format!("'{}' is not a valid email address", email))
    }
}
