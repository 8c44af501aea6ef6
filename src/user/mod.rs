mod builder;
mod email;
mod id;
mod memory;
mod repository;
mod service;
mod store;

pub use builder::*;
pub use email::*;
pub use id::*;
pub use memory::*;
pub use repository::*;
pub use service::*;
pub use store::*;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{Result, UserError};

/// Flags given to a user created without explicit permissions.
pub const DEFAULT_PERMISSION_FLAGS: i32 = 1;

/// User as returned by lookups. Never carries the credential.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub email: EmailAddress,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub permission_flags: i32,
    #[serde(skip_serializing, default)]
    pub refresh_token: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// [`User`] along with its hashed credential.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UserWithPassword {
    #[serde(flatten)]
    pub user: User,
    pub password: String,
}

/// Payload to create a [`User`].
///
/// `password` is expected to be hashed already.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    #[validate(email(message = "Email must be formatted."))]
    pub email: String,
    #[validate(length(
        min = 1,
        max = 1024,
        message = "Password must not be empty."
    ))]
    pub password: String,
    #[validate(length(max = 255))]
    pub first_name: Option<String>,
    #[validate(length(max = 255))]
    pub last_name: Option<String>,
    pub permission_flags: Option<i32>,
}

/// Partial update of a [`User`]. `None` leaves the field untouched.
#[derive(
    Clone, Debug, Default, PartialEq, Serialize, Deserialize, Validate,
)]
#[serde(rename_all = "camelCase")]
pub struct UserPatch {
    #[validate(email(message = "Email must be formatted."))]
    pub email: Option<String>,
    #[validate(length(
        min = 1,
        max = 1024,
        message = "Password must not be empty."
    ))]
    pub password: Option<String>,
    #[validate(length(max = 255))]
    pub first_name: Option<String>,
    #[validate(length(max = 255))]
    pub last_name: Option<String>,
    pub permission_flags: Option<i32>,
}

impl UserPatch {
    /// Whether the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Merge the patch into `user`, leaving unspecified fields as they are.
    pub fn apply(&self, user: &mut User) {
        if let Some(email) = &self.email {
            user.email = EmailAddress::from(email.clone());
        }
        if let Some(first_name) = &self.first_name {
            user.first_name = Some(first_name.clone());
        }
        if let Some(last_name) = &self.last_name {
            user.last_name = Some(last_name.clone());
        }
        if let Some(flags) = self.permission_flags {
            user.permission_flags = flags;
        }
    }
}

/// Page-bounded window over the user collection.
///
/// Pages are zero-indexed: page `p` covers records
/// `[p * limit, (p + 1) * limit)` in insertion order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pagination {
    limit: u64,
    page: u64,
}

impl Pagination {
    /// Create a new [`Pagination`].
    ///
    /// # Errors
    ///
    /// Returns `Err` if `limit` is not positive or `page` is negative.
    pub fn new(limit: i64, page: i64) -> Result<Self> {
        if limit <= 0 {
            return Err(UserError::invalid(
                "limit",
                "Limit must be greater than zero.",
            ));
        }
        if page < 0 {
            return Err(UserError::invalid(
                "page",
                "Page must be zero or greater.",
            ));
        }

        Ok(Self {
            limit: limit.unsigned_abs(),
            page: page.unsigned_abs(),
        })
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    pub fn page(&self) -> u64 {
        self.page
    }

    /// Number of records to skip, saturating past the end of any store.
    pub fn offset(&self) -> u64 {
        self.limit.saturating_mul(self.page)
    }
}
