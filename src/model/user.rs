//! User and role records. A user embeds the identity-owned [`Credential`] rather than extending it.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use utoipa::ToSchema;

pub const FULL_NAME_MAX_LENGTH: usize = 50;

/// Lookup key used for user names, emails and role names.
pub fn normalize(value: &str) -> String {
    value.trim().to_uppercase()
}

/// Credential fields owned by the identity subsystem.
#[derive(Clone, Debug, sqlx::FromRow)]
pub struct Credential {
    pub id: String,
    pub user_name: String,
    pub normalized_user_name: String,
    pub email: Option<String>,
    pub normalized_email: Option<String>,
    pub email_confirmed: bool,
    pub password_hash: Option<String>,
    pub security_stamp: Option<String>,
    pub concurrency_stamp: Option<String>,
    pub phone_number: Option<String>,
    pub phone_number_confirmed: bool,
    pub two_factor_enabled: bool,
    pub lockout_end: Option<DateTime<Utc>>,
    pub lockout_enabled: bool,
    pub access_failed_count: i32,
}

impl Credential {
    /// Fresh credential with a generated id and stamps. Lockout is enabled until turned off.
    pub fn new(user_name: impl Into<String>) -> Self {
        let user_name = user_name.into();
        Credential {
            id: uuid::Uuid::new_v4().to_string(),
            normalized_user_name: normalize(&user_name),
            user_name,
            email: None,
            normalized_email: None,
            email_confirmed: false,
            password_hash: None,
            security_stamp: Some(uuid::Uuid::new_v4().simple().to_string().to_uppercase()),
            concurrency_stamp: Some(uuid::Uuid::new_v4().to_string()),
            phone_number: None,
            phone_number_confirmed: false,
            two_factor_enabled: false,
            lockout_end: None,
            lockout_enabled: true,
            access_failed_count: 0,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        let email = email.into();
        self.normalized_email = Some(normalize(&email));
        self.email = Some(email);
        self
    }

    pub fn with_phone_number(mut self, phone: impl Into<String>) -> Self {
        self.phone_number = Some(phone.into());
        self
    }

    pub fn with_lockout_enabled(mut self, enabled: bool) -> Self {
        self.lockout_enabled = enabled;
        self
    }

    pub fn is_locked_out(&self, now: DateTime<Utc>) -> bool {
        self.lockout_enabled && self.lockout_end.map(|end| end > now).unwrap_or(false)
    }
}

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct User {
    #[sqlx(flatten)]
    pub credential: Credential,
    pub full_name: String,
    pub dob: NaiveDate,
}

impl User {
    pub fn new(credential: Credential, full_name: impl Into<String>, dob: NaiveDate) -> Self {
        User {
            credential,
            full_name: full_name.into(),
            dob,
        }
    }

    pub fn id(&self) -> &str {
        &self.credential.id
    }

    pub fn user_name(&self) -> &str {
        &self.credential.user_name
    }

    pub fn profile(&self, roles: Vec<String>) -> UserProfile {
        UserProfile {
            id: self.credential.id.clone(),
            user_name: self.credential.user_name.clone(),
            email: self.credential.email.clone(),
            phone_number: self.credential.phone_number.clone(),
            full_name: self.full_name.clone(),
            dob: self.dob,
            roles,
        }
    }
}

/// Public view of a user: no hashes or stamps.
#[derive(Clone, Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub user_name: String,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub full_name: String,
    pub dob: NaiveDate,
    pub roles: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, sqlx::FromRow)]
pub struct Role {
    pub id: String,
    pub name: String,
    pub normalized_name: String,
    pub concurrency_stamp: Option<String>,
}

impl Role {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Role {
            id: uuid::Uuid::new_v4().to_string(),
            normalized_name: normalize(&name),
            name,
            concurrency_stamp: Some(uuid::Uuid::new_v4().to_string()),
        }
    }
}
