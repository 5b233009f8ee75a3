//! User directory: registration and password authentication.

pub mod domain;
mod password;
pub mod repository;
pub mod router;
pub mod service;

pub use domain::{Credentials, Registration, UserAccount, UserRole, MIN_PASSWORD_LEN};
pub use password::{BcryptHasher, PasswordError, PasswordHasher};
pub use repository::UserRepository;
pub use router::account_router;
pub use service::UserDirectory;
