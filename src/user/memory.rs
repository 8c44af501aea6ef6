//! In-process user store.

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{Result, UserError};
use crate::user::{
    DEFAULT_PERMISSION_FLAGS, EmailAddress, NewUser, Pagination, User, UserId,
    UserPatch, UserStore, UserWithPassword,
};

#[derive(Debug, Clone)]
struct Record {
    user: User,
    password: String,
}

/// Users kept in memory, in insertion order.
///
/// Every write holds the lock for both the uniqueness check and the
/// mutation.
#[derive(Debug, Default)]
pub struct MemoryUserStore {
    records: RwLock<Vec<Record>>,
}

impl MemoryUserStore {
    /// Create a new, empty [`MemoryUserStore`].
    pub fn new() -> Self {
        Self::default()
    }
}

fn email_taken(records: &[Record], email: &str, except: Option<&UserId>) -> bool {
    records.iter().any(|record| {
        record.user.email.as_str() == email
            && Some(&record.user.id) != except
    })
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create_user(&self, user: &NewUser) -> Result<User> {
        let mut records = self.records.write().await;
        if email_taken(&records, &user.email, None) {
            return Err(UserError::Conflict);
        }

        let created = User {
            id: UserId::generate(),
            email: EmailAddress::from(user.email.clone()),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            permission_flags: user
                .permission_flags
                .unwrap_or(DEFAULT_PERMISSION_FLAGS),
            refresh_token: None,
            created_at: chrono::Utc::now(),
        };
        records.push(Record {
            user: created.clone(),
            password: user.password.clone(),
        });

        Ok(created)
    }

    async fn get_user_by_id(&self, id: &UserId) -> Result<Option<User>> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .find(|record| &record.user.id == id)
            .map(|record| record.user.clone()))
    }

    async fn delete_user_by_id(&self, id: &UserId) -> Result<bool> {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|record| &record.user.id != id);
        Ok(records.len() != before)
    }

    async fn list_users(&self, pagination: Pagination) -> Result<Vec<User>> {
        let records = self.records.read().await;
        let offset = usize::try_from(pagination.offset()).unwrap_or(usize::MAX);
        let limit = usize::try_from(pagination.limit()).unwrap_or(usize::MAX);

        Ok(records
            .iter()
            .skip(offset)
            .take(limit)
            .map(|record| record.user.clone())
            .collect())
    }

    async fn update_user_by_id(
        &self,
        id: &UserId,
        patch: &UserPatch,
    ) -> Result<Option<User>> {
        let mut records = self.records.write().await;
        let Some(index) =
            records.iter().position(|record| &record.user.id == id)
        else {
            return Ok(None);
        };
        if let Some(email) = &patch.email {
            if email_taken(&records, email, Some(id)) {
                return Err(UserError::Conflict);
            }
        }

        let record = &mut records[index];
        patch.apply(&mut record.user);
        if let Some(password) = &patch.password {
            record.password = password.clone();
        }

        Ok(Some(record.user.clone()))
    }

    async fn get_user_by_email(
        &self,
        email: &EmailAddress,
    ) -> Result<Option<User>> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .find(|record| &record.user.email == email)
            .map(|record| record.user.clone()))
    }

    async fn get_user_by_email_with_password(
        &self,
        email: &EmailAddress,
    ) -> Result<Option<UserWithPassword>> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .find(|record| &record.user.email == email)
            .map(|record| UserWithPassword {
                user: record.user.clone(),
                password: record.password.clone(),
            }))
    }

    async fn update_user_refresh_token_by_id(
        &self,
        id: &UserId,
        refresh_token: Option<String>,
    ) -> Result<bool> {
        let mut records = self.records.write().await;
        match records.iter_mut().find(|record| &record.user.id == id) {
            Some(record) => {
                record.user.refresh_token = refresh_token;
                Ok(true)
            },
            None => Ok(false),
        }
    }

    async fn delete_all_users(&self) -> Result<u64> {
        let mut records = self.records.write().await;
        let deleted = records.len() as u64;
        records.clear();
        Ok(deleted)
    }
}
