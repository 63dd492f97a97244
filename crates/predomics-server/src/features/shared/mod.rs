//! Helpers shared by the feature slices

pub mod error_helpers;
pub mod pagination;
pub mod validation;

#[cfg(test)]
pub mod test_helpers;

pub use pagination::{Paginated, PaginationMetadata, PaginationParams};
pub use validation::{validate_class_names, validate_description, validate_email, validate_name, NameValidationError};

/// `%term%` for `ILIKE`, with LIKE metacharacters escaped. Blank terms
/// mean no filter.
pub fn like_pattern(term: Option<&str>) -> Option<String> {
    term.map(str::trim).filter(|s| !s.is_empty()).map(|s| {
        format!(
            "%{}%",
            s.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
        )
    })
}
