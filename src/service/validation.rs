//! Field validation for catalog inputs.

use crate::error::AppError;

/// Per-field constraints, checked in declaration order.
#[derive(Clone, Copy, Debug, Default)]
pub struct FieldRule {
    pub required: bool,
    pub max_length: Option<usize>,
}

impl FieldRule {
    pub const fn required() -> Self {
        FieldRule {
            required: true,
            max_length: None,
        }
    }

    pub const fn optional() -> Self {
        FieldRule {
            required: false,
            max_length: None,
        }
    }

    pub const fn max_length(mut self, max: usize) -> Self {
        self.max_length = Some(max);
        self
    }
}

pub struct RequestValidator;

impl RequestValidator {
    /// Check one field. Blank strings count as missing for required fields.
    pub fn check(field: &str, value: Option<&str>, rule: FieldRule) -> Result<(), AppError> {
        let present = value.filter(|v| !v.trim().is_empty());
        if rule.required && present.is_none() {
            return Err(AppError::Validation(format!("{} is required", field)));
        }
        if let (Some(max), Some(v)) = (rule.max_length, value) {
            // Values are stored trimmed.
            if v.trim().chars().count() > max {
                return Err(AppError::Validation(format!(
                    "{} must be at most {} characters",
                    field, max
                )));
            }
        }
        Ok(())
    }

    /// Required field: returns the trimmed value after checking.
    pub fn required(field: &str, value: Option<&str>, rule: FieldRule) -> Result<String, AppError> {
        Self::check(field, value, FieldRule { required: true, ..rule })?;
        Ok(value.map(|v| v.trim().to_string()).unwrap_or_default())
    }
}

/// Blank optional strings are stored as NULL.
pub fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
