use super::domain::UserAccount;
use crate::domain::UserId;
use crate::store::RepositoryError;

/// Storage abstraction for user accounts.
///
/// `insert` returns [`RepositoryError::Conflict`] when the email or username
/// is already taken. Updates go through `compare_and_swap`, which bumps
/// `version`.
pub trait UserRepository: Send + Sync {
    fn insert(&self, account: UserAccount) -> Result<UserAccount, RepositoryError>;
    fn compare_and_swap(
        &self,
        account: UserAccount,
        expected_version: u64,
    ) -> Result<UserAccount, RepositoryError>;
    fn fetch(&self, id: &UserId) -> Result<Option<UserAccount>, RepositoryError>;
    fn find_by_email(&self, email: &str) -> Result<Option<UserAccount>, RepositoryError>;
}
