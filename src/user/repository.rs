//! Handle database requests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};

use crate::error::{Result, ToInternal, UserError};
use crate::user::{
    DEFAULT_PERMISSION_FLAGS, EmailAddress, NewUser, Pagination, User, UserId,
    UserPatch, UserStore, UserWithPassword,
};

const COLUMNS: &str = "id, email, first_name, last_name, permission_flags, refresh_token, created_at";

/// Row of the `users` table, without credential.
#[derive(Debug, sqlx::FromRow)]
struct UserRecord {
    id: String,
    email: String,
    first_name: Option<String>,
    last_name: Option<String>,
    permission_flags: i32,
    refresh_token: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<UserRecord> for User {
    fn from(record: UserRecord) -> Self {
        Self {
            id: UserId::from(record.id),
            email: EmailAddress::from(record.email),
            first_name: record.first_name,
            last_name: record.last_name,
            permission_flags: record.permission_flags,
            refresh_token: record.refresh_token,
            created_at: record.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct UserWithPasswordRecord {
    #[sqlx(flatten)]
    user: UserRecord,
    password: String,
}

/// PostgreSQL user store.
#[derive(Clone)]
pub struct PgUserStore {
    pool: Pool<Postgres>,
}

impl PgUserStore {
    /// Create a new [`PgUserStore`].
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn create_user(&self, user: &NewUser) -> Result<User> {
        let query = format!(
            r#"INSERT INTO users (id, email, password, first_name, last_name, permission_flags)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING {COLUMNS}"#
        );

        let record = sqlx::query_as::<_, UserRecord>(&query)
            .bind(UserId::generate().as_str())
            .bind(&user.email)
            .bind(&user.password)
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(user.permission_flags.unwrap_or(DEFAULT_PERMISSION_FLAGS))
            .fetch_one(&self.pool)
            .await
            .map_err(write_error)?;

        Ok(record.into())
    }

    async fn get_user_by_id(&self, id: &UserId) -> Result<Option<User>> {
        let query = get_by_field_query(Field::Id, false);

        let record = sqlx::query_as::<_, UserRecord>(&query)
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .catch()?;

        Ok(record.map(User::from))
    }

    async fn delete_user_by_id(&self, id: &UserId) -> Result<bool> {
        let result = sqlx::query(r#"DELETE FROM users WHERE id = $1"#)
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .catch()?;

        Ok(result.rows_affected() == 1)
    }

    async fn list_users(&self, pagination: Pagination) -> Result<Vec<User>> {
        let query =
            format!(r#"SELECT {COLUMNS} FROM users ORDER BY seq LIMIT $1 OFFSET $2"#);
        // BIGINT bounds; no table reaches them.
        let limit = i64::try_from(pagination.limit()).unwrap_or(i64::MAX);
        let offset = i64::try_from(pagination.offset()).unwrap_or(i64::MAX);

        let records = sqlx::query_as::<_, UserRecord>(&query)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .catch()?;

        Ok(records.into_iter().map(User::from).collect())
    }

    async fn update_user_by_id(
        &self,
        id: &UserId,
        patch: &UserPatch,
    ) -> Result<Option<User>> {
        let query = format!(
            r#"UPDATE users
                SET email = COALESCE($2, email),
                    password = COALESCE($3, password),
                    first_name = COALESCE($4, first_name),
                    last_name = COALESCE($5, last_name),
                    permission_flags = COALESCE($6, permission_flags)
                WHERE id = $1
                RETURNING {COLUMNS}"#
        );

        let record = sqlx::query_as::<_, UserRecord>(&query)
            .bind(id.as_str())
            .bind(&patch.email)
            .bind(&patch.password)
            .bind(&patch.first_name)
            .bind(&patch.last_name)
            .bind(patch.permission_flags)
            .fetch_optional(&self.pool)
            .await
            .map_err(write_error)?;

        Ok(record.map(User::from))
    }

    async fn get_user_by_email(
        &self,
        email: &EmailAddress,
    ) -> Result<Option<User>> {
        let query = get_by_field_query(Field::Email, false);

        let record = sqlx::query_as::<_, UserRecord>(&query)
            .bind(email.as_str())
            .fetch_optional(&self.pool)
            .await
            .catch()?;

        Ok(record.map(User::from))
    }

    async fn get_user_by_email_with_password(
        &self,
        email: &EmailAddress,
    ) -> Result<Option<UserWithPassword>> {
        let query = get_by_field_query(Field::Email, true);

        let record = sqlx::query_as::<_, UserWithPasswordRecord>(&query)
            .bind(email.as_str())
            .fetch_optional(&self.pool)
            .await
            .catch()?;

        Ok(record.map(|record| UserWithPassword {
            user: record.user.into(),
            password: record.password,
        }))
    }

    async fn update_user_refresh_token_by_id(
        &self,
        id: &UserId,
        refresh_token: Option<String>,
    ) -> Result<bool> {
        let result =
            sqlx::query(r#"UPDATE users SET refresh_token = $2 WHERE id = $1"#)
                .bind(id.as_str())
                .bind(refresh_token)
                .execute(&self.pool)
                .await
                .catch()?;

        Ok(result.rows_affected() == 1)
    }

    async fn delete_all_users(&self) -> Result<u64> {
        let result = sqlx::query(r#"DELETE FROM users"#)
            .execute(&self.pool)
            .await
            .catch()?;

        Ok(result.rows_affected())
    }
}

/// Unique violations become [`UserError::Conflict`].
fn write_error(err: sqlx::Error) -> UserError {
    match err.as_database_error() {
        Some(db_err) if db_err.is_unique_violation() => UserError::Conflict,
        _ => UserError::store(err),
    }
}

#[derive(Debug, Clone, Copy)]
enum Field {
    Id,
    Email,
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Field::Id => write!(f, "id"),
            Field::Email => write!(f, "email"),
        }
    }
}

fn get_by_field_query(field: Field, with_password: bool) -> String {
    let password = if with_password { ", password" } else { "" };
    format!(r#"SELECT {COLUMNS}{password} FROM users WHERE {field} = $1"#)
}
