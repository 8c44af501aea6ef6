//! Port between the user service and its persistence.

use async_trait::async_trait;

use crate::error::Result;
use crate::user::{
    EmailAddress, NewUser, Pagination, User, UserId, UserPatch,
    UserWithPassword,
};

/// Port for user persistence.
///
/// Absence is reported as `Ok(None)` or `Ok(false)`. Implementations must
/// return [`crate::error::UserError::Conflict`] when a write would break
/// email uniqueness, and must keep that check atomic with the write.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a user and assign its id.
    async fn create_user(&self, user: &NewUser) -> Result<User>;

    async fn get_user_by_id(&self, id: &UserId) -> Result<Option<User>>;

    /// Returns `false` when no user had this id.
    async fn delete_user_by_id(&self, id: &UserId) -> Result<bool>;

    /// Users in insertion order, bounded by `pagination`.
    async fn list_users(&self, pagination: Pagination) -> Result<Vec<User>>;

    /// Merge `patch` into the stored user and return the result.
    async fn update_user_by_id(
        &self,
        id: &UserId,
        patch: &UserPatch,
    ) -> Result<Option<User>>;

    async fn get_user_by_email(
        &self,
        email: &EmailAddress,
    ) -> Result<Option<User>>;

    async fn get_user_by_email_with_password(
        &self,
        email: &EmailAddress,
    ) -> Result<Option<UserWithPassword>>;

    /// Replace the refresh token. `None` clears it.
    async fn update_user_refresh_token_by_id(
        &self,
        id: &UserId,
        refresh_token: Option<String>,
    ) -> Result<bool>;

    /// Returns how many users were removed.
    async fn delete_all_users(&self) -> Result<u64>;
}
