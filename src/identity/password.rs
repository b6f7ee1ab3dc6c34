//! Password hashing with Argon2 and the password policy applied at user creation.

use crate::error::AppError;
use crate::identity::IdentityError;
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString},
    Argon2,
};

/// Argon2 work runs on the blocking pool, off the async workers.
pub struct PasswordHasher;

impl PasswordHasher {
    pub async fn hash(password: &str) -> Result<String, AppError> {
        let password = password.to_string();
        tokio::task::spawn_blocking(move || hash_now(&password))
            .await
            .map_err(|e| AppError::PasswordHash(e.to_string()))?
    }

    /// False for a wrong password. Err only when the stored hash cannot be parsed.
    pub async fn verify(password: &str, hash: &str) -> Result<bool, AppError> {
        let (password, hash) = (password.to_string(), hash.to_string());
        tokio::task::spawn_blocking(move || verify_now(&password, &hash))
            .await
            .map_err(|e| AppError::PasswordHash(e.to_string()))?
    }
}

fn hash_now(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AppError::PasswordHash(e.to_string()))
}

fn verify_now(password: &str, hash: &str) -> Result<bool, AppError> {
    let parsed = PasswordHash::new(hash).map_err(|e| AppError::PasswordHash(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PasswordPolicy {
    pub required_length: usize,
    pub required_unique_chars: usize,
    pub require_non_alphanumeric: bool,
    pub require_lowercase: bool,
    pub require_uppercase: bool,
    pub require_digit: bool,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        PasswordPolicy {
            required_length: 6,
            required_unique_chars: 1,
            require_non_alphanumeric: true,
            require_lowercase: true,
            require_uppercase: true,
            require_digit: true,
        }
    }
}

impl PasswordPolicy {
    pub fn with_required_length(mut self, length: usize) -> Self {
        self.required_length = length;
        self
    }

    /// Every rule the password breaks. Empty means the password is acceptable.
    pub fn validate(&self, password: &str) -> Vec<IdentityError> {
        let mut errors = Vec::new();
        if password.chars().count() < self.required_length {
            errors.push(IdentityError::new(
                "PasswordTooShort",
                format!("Passwords must be at least {} characters.", self.required_length),
            ));
        }
        if self.require_non_alphanumeric && password.chars().all(char::is_alphanumeric) {
            errors.push(IdentityError::new(
                "PasswordRequiresNonAlphanumeric",
                "Passwords must have at least one non alphanumeric character.",
            ));
        }
        if self.require_digit && !password.chars().any(|c| c.is_ascii_digit()) {
            errors.push(IdentityError::new(
                "PasswordRequiresDigit",
                "Passwords must have at least one digit ('0'-'9').",
            ));
        }
        if self.require_lowercase && !password.chars().any(char::is_lowercase) {
            errors.push(IdentityError::new(
                "PasswordRequiresLower",
                "Passwords must have at least one lowercase ('a'-'z').",
            ));
        }
        if self.require_uppercase && !password.chars().any(char::is_uppercase) {
            errors.push(IdentityError::new(
                "PasswordRequiresUpper",
                "Passwords must have at least one uppercase ('A'-'Z').",
            ));
        }
        if self.required_unique_chars > 1 {
            let mut seen: Vec<char> = password.chars().collect();
            seen.sort_unstable();
            seen.dedup();
            if seen.len() < self.required_unique_chars {
                errors.push(IdentityError::new(
                    "PasswordRequiresUniqueChars",
                    format!(
                        "Passwords must use at least {} different characters.",
                        self.required_unique_chars
                    ),
                ));
            }
        }
        errors
    }
}
