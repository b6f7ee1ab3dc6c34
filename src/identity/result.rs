//! Structured outcomes for identity operations. Expected failures are values, not errors.

use serde::Serialize;
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, ToSchema)]
pub struct IdentityError {
    pub code: String,
    pub description: String,
}

impl IdentityError {
    pub fn new(code: impl Into<String>, description: impl Into<String>) -> Self {
        IdentityError {
            code: code.into(),
            description: description.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, ToSchema)]
pub struct IdentityResult {
    pub succeeded: bool,
    pub errors: Vec<IdentityError>,
}

impl IdentityResult {
    pub fn success() -> Self {
        IdentityResult {
            succeeded: true,
            errors: Vec::new(),
        }
    }

    pub fn failed(errors: Vec<IdentityError>) -> Self {
        IdentityResult {
            succeeded: false,
            errors,
        }
    }

    pub fn failed_with(code: &str, description: impl Into<String>) -> Self {
        Self::failed(vec![IdentityError::new(code, description)])
    }

    pub fn has_error(&self, code: &str) -> bool {
        self.errors.iter().any(|e| e.code == code)
    }
}

impl std::fmt::Display for IdentityResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.succeeded {
            return f.write_str("Succeeded");
        }
        let codes: Vec<&str> = self.errors.iter().map(|e| e.code.as_str()).collect();
        write!(f, "Failed: {}", codes.join(","))
    }
}
