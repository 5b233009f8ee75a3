use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{require_text, Document, UserId, ValidationError};

pub const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    #[default]
    User,
    Admin,
    Analyst,
    Underwriter,
}

impl UserRole {
    pub fn label(self) -> &'static str {
        match self {
            UserRole::User => "user",
            UserRole::Admin => "admin",
            UserRole::Analyst => "analyst",
            UserRole::Underwriter => "underwriter",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserAccount {
    pub id: UserId,
    pub email: String,
    pub username: Option<String>,
    pub full_name: Option<String>,
    #[serde(skip_serializing, default)]
    pub hashed_password: String,
    pub is_active: bool,
    pub is_verified: bool,
    pub role: UserRole,
    pub permissions: Vec<String>,
    pub company_name: Option<String>,
    pub company_role: Option<String>,
    pub department: Option<String>,
    pub preferences: Document,
    pub last_login: Option<DateTime<Utc>>,
    pub login_count: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub version: u64,
}

impl UserAccount {
    pub(crate) fn record_login(&mut self, now: DateTime<Utc>) {
        self.login_count = self.login_count.saturating_add(1);
        self.last_login = Some(now);
        self.updated_at = Some(now);
    }
}

/// Self-service sign-up payload.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Registration {
    pub email: String,
    pub username: Option<String>,
    pub password: String,
    pub full_name: Option<String>,
    pub company_name: Option<String>,
    pub company_role: Option<String>,
    pub department: Option<String>,
}

impl Registration {
    /// Trims and lowercases the email and drops blank usernames.
    pub(crate) fn normalized(mut self) -> Result<Self, ValidationError> {
        self.email = normalize_email(&self.email);
        require_text("email", &self.email)?;
        if !self.email.contains('@') {
            return Err(ValidationError::Invalid {
                field: "email",
                reason: format!("'{}' is not an email address", self.email),
            });
        }
        self.username = self
            .username
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty());
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ValidationError::Invalid {
                field: "password",
                reason: format!("must be at least {MIN_PASSWORD_LEN} characters"),
            });
        }
        Ok(self)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

pub(crate) fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}
