use std::sync::{Arc, OnceLock};

use chrono::Utc;
use tracing::{debug, info, warn};

use super::domain::{normalize_email, Credentials, Registration, UserAccount, UserRole};
use super::password::PasswordHasher;
use super::repository::UserRepository;
use crate::domain::{DomainError, Document, EntityKind, UserId};
use crate::store::RepositoryError;

const LOGIN_ATTEMPTS: usize = 3;
const UNKNOWN_ACCOUNT_SECRET: &str = "unknown-account-placeholder";

/// Account registration and password authentication. Hashing is blocking
/// work; async callers should run these methods off the runtime threads.
pub struct UserDirectory {
    users: Arc<dyn UserRepository>,
    hasher: Arc<dyn PasswordHasher>,
    /// Verified against when the email is unknown, so that path costs as
    /// much as a wrong password.
    placeholder_hash: OnceLock<String>,
}

impl UserDirectory {
    pub fn new(users: Arc<dyn UserRepository>, hasher: Arc<dyn PasswordHasher>) -> Self {
        Self {
            users,
            hasher,
            placeholder_hash: OnceLock::new(),
        }
    }

    /// Self-service sign-up. New accounts always get [`UserRole::User`].
    pub fn register(&self, registration: Registration) -> Result<UserAccount, DomainError> {
        self.provision(registration, UserRole::User)
    }

    pub fn provision(
        &self,
        registration: Registration,
        role: UserRole,
    ) -> Result<UserAccount, DomainError> {
        let registration = registration.normalized()?;
        if self.users.find_by_email(&registration.email)?.is_some() {
            return Err(DomainError::Duplicate {
                entity: EntityKind::User,
                key: format!("email {}", registration.email),
            });
        }

        let now = Utc::now();
        let account = UserAccount {
            id: UserId::generate(),
            hashed_password: self.hasher.hash(&registration.password)?,
            email: registration.email,
            username: registration.username,
            full_name: registration.full_name,
            is_active: true,
            is_verified: false,
            role,
            permissions: Vec::new(),
            company_name: registration.company_name,
            company_role: registration.company_role,
            department: registration.department,
            preferences: Document::Object(Default::default()),
            last_login: None,
            login_count: 0,
            created_at: now,
            updated_at: None,
            version: 0,
        };
        let stored = self.users.insert(account).map_err(|err| match err {
            RepositoryError::Conflict => DomainError::Duplicate {
                entity: EntityKind::User,
                key: "email or username".to_string(),
            },
            other => other.into(),
        })?;
        info!(user_id = %stored.id, role = stored.role.label(), "user registered");
        Ok(stored)
    }

    /// Verifies the password and records the login. Unknown emails, wrong
    /// passwords and inactive accounts are indistinguishable to the caller.
    pub fn authenticate(&self, credentials: &Credentials) -> Result<UserAccount, DomainError> {
        let email = normalize_email(&credentials.email);
        let Some(account) = self.users.find_by_email(&email)? else {
            self.verify_placeholder(&credentials.password);
            return Err(DomainError::InvalidCredentials);
        };
        if !account.is_active
            || !self
                .hasher
                .verify(&credentials.password, &account.hashed_password)?
        {
            warn!(user_id = %account.id, "login rejected");
            return Err(DomainError::InvalidCredentials);
        }

        let mut current = account;
        for _ in 0..LOGIN_ATTEMPTS {
            let expected_version = current.version;
            let mut updated = current.clone();
            updated.record_login(Utc::now());
            match self.users.compare_and_swap(updated, expected_version) {
                Ok(stored) => {
                    info!(user_id = %stored.id, login_count = stored.login_count, "user logged in");
                    return Ok(stored);
                }
                Err(RepositoryError::VersionMismatch { .. }) => {
                    current = self
                        .users
                        .fetch(&current.id)?
                        .ok_or_else(|| DomainError::not_found(EntityKind::User, current.id))?;
                }
                Err(other) => return Err(other.into()),
            }
        }

        Err(DomainError::Conflict {
            entity: EntityKind::User,
            id: current.id.to_string(),
        })
    }

    fn verify_placeholder(&self, password: &str) {
        let hashed = match self.placeholder_hash.get() {
            Some(hashed) => hashed,
            None => match self.hasher.hash(UNKNOWN_ACCOUNT_SECRET) {
                Ok(hashed) => self.placeholder_hash.get_or_init(|| hashed),
                Err(err) => {
                    debug!(error = %err, "placeholder hash unavailable");
                    return;
                }
            },
        };
        let _ = self.hasher.verify(password, hashed);
    }
}
