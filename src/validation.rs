//! Query Validation Module
//!
//! Validates free-text search input before any request reaches the gateway.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation error types
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationError {
    #[error("Введите поисковый запрос")]
    Empty,

    #[error("Field '{field}' is too short (min: {min}, got: {got})")]
    TooShort {
        field: String,
        min: usize,
        got: usize,
    },

    #[error("Field '{field}' is too long (max: {max}, got: {got})")]
    TooLong {
        field: String,
        max: usize,
        got: usize,
    },

    #[error("Field '{field}' must be a positive number")]
    NotPositive { field: String },
}

impl ValidationError {
    pub fn field(&self) -> &str {
        match self {
            Self::Empty => "query",
            Self::TooShort { field, .. } => field.as_str(),
            Self::TooLong { field, .. } => field.as_str(),
            Self::NotPositive { field } => field.as_str(),
        }
    }
}

/// Validation result type
pub type ValidationResult<T> = std::result::Result<T, ValidationError>;

/// Query validator
#[derive(Debug, Clone)]
pub struct QueryValidator {
    /// Minimum number of characters for a submitted query
    min_query_chars: usize,
    /// Maximum number of characters for a submitted query
    max_query_chars: usize,
}

impl Default for QueryValidator {
    fn default() -> Self {
        Self::new(1, 200)
    }
}

impl QueryValidator {
    pub fn new(min_query_chars: usize, max_query_chars: usize) -> Self {
        Self {
            min_query_chars: min_query_chars.max(1),
            max_query_chars,
        }
    }

    /// Validate field length (counted in chars, not bytes)
    pub fn validate_length(
        &self,
        field: &str,
        value: &str,
        min: Option<usize>,
        max: Option<usize>,
    ) -> ValidationResult<()> {
        let length = value.chars().count();

        if let Some(min_len) = min {
            if length < min_len {
                return Err(ValidationError::TooShort {
                    field: field.to_string(),
                    min: min_len,
                    got: length,
                });
            }
        }

        if let Some(max_len) = max {
            if length > max_len {
                return Err(ValidationError::TooLong {
                    field: field.to_string(),
                    max: max_len,
                    got: length,
                });
            }
        }

        Ok(())
    }

    /// Validate a search query and return its trimmed form
    pub fn validate_query(&self, text: &str) -> ValidationResult<String> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::Empty);
        }
        self.validate_length(
            "query",
            trimmed,
            Some(self.min_query_chars),
            Some(self.max_query_chars),
        )?;
        Ok(trimmed.to_string())
    }

    /// Validate a page number
    pub fn validate_page(&self, page: usize) -> ValidationResult<()> {
        if page == 0 {
            return Err(ValidationError::NotPositive {
                field: "page".to_string(),
            });
        }
        Ok(())
    }
}
