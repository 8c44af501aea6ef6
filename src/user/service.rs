use std::sync::Arc;

use validator::Validate;

use crate::error::{Result, UserError};
use crate::user::{
    EmailAddress, NewUser, Pagination, User, UserId, UserPatch, UserStore,
    UserWithPassword,
};

/// User manager.
///
/// Stateless aside from its store: every operation checks its input, then
/// issues exactly one store call and hands back whatever the store
/// answered.
#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn UserStore>,
}

impl UserService {
    /// Create a new [`UserService`] on top of `store`.
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        tracing::debug!("created new instance of user service");
        Self { store }
    }

    /// Create a user. The store assigns its id.
    pub async fn create(&self, mut user: NewUser) -> Result<User> {
        user.email = EmailAddress::parse(&user.email)?.into_inner();
        user.validate()?;

        tracing::debug!(email = %user.email, "creating user");
        self.store.create_user(&user).await
    }

    /// Find a user using its `id`.
    pub async fn get_by_id(&self, id: &str) -> Result<User> {
        let id = UserId::parse(id)?;

        tracing::debug!(user_id = %id, "getting user");
        self.store
            .get_user_by_id(&id)
            .await?
            .ok_or(UserError::NotFound)
    }

    /// Permanently delete a user.
    pub async fn delete_by_id(&self, id: &str) -> Result<()> {
        let id = UserId::parse(id)?;

        tracing::debug!(user_id = %id, "deleting user");
        if self.store.delete_user_by_id(&id).await? {
            Ok(())
        } else {
            Err(UserError::NotFound)
        }
    }

    /// List users in insertion order. `page` is zero-indexed.
    pub async fn list(&self, limit: i64, page: i64) -> Result<Vec<User>> {
        let pagination = Pagination::new(limit, page)?;

        tracing::debug!(limit, page, "listing users");
        self.store.list_users(pagination).await
    }

    /// Merge `patch` into a user. An empty patch returns the user as is.
    pub async fn update_by_id(
        &self,
        id: &str,
        mut patch: UserPatch,
    ) -> Result<User> {
        let id = UserId::parse(id)?;
        patch.email = patch
            .email
            .map(|email| EmailAddress::parse(email).map(EmailAddress::into_inner))
            .transpose()?;
        patch.validate()?;

        tracing::debug!(user_id = %id, empty = patch.is_empty(), "updating user");
        self.store
            .update_user_by_id(&id, &patch)
            .await?
            .ok_or(UserError::NotFound)
    }

    /// Find a user using its email. The credential is never included.
    pub async fn get_user_by_email(&self, email: &str) -> Result<User> {
        let email = EmailAddress::parse(email)?;

        tracing::debug!(%email, "getting user by email");
        self.store
            .get_user_by_email(&email)
            .await?
            .ok_or(UserError::NotFound)
    }

    /// Find a user using its email, along with its hashed password.
    pub async fn get_user_by_email_with_password(
        &self,
        email: &str,
    ) -> Result<UserWithPassword> {
        let email = EmailAddress::parse(email)?;

        tracing::debug!(%email, "getting user by email with password");
        self.store
            .get_user_by_email_with_password(&email)
            .await?
            .ok_or(UserError::NotFound)
    }

    /// Replace the refresh token of a user. An empty token clears it.
    pub async fn update_user_refresh_token_by_id(
        &self,
        id: &str,
        refresh_token: &str,
    ) -> Result<()> {
        let id = UserId::parse(id)?;
        let refresh_token =
            (!refresh_token.is_empty()).then(|| refresh_token.to_owned());

        tracing::debug!(
            user_id = %id,
            cleared = refresh_token.is_none(),
            "updating refresh token"
        );
        if self
            .store
            .update_user_refresh_token_by_id(&id, refresh_token)
            .await?
        {
            Ok(())
        } else {
            Err(UserError::NotFound)
        }
    }

    /// Delete every user. Returns how many were removed.
    pub async fn delete_all_users(&self) -> Result<u64> {
        let deleted = self.store.delete_all_users().await?;

        tracing::debug!(deleted, "deleted all users");
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::user::{MemoryUserStore, MockUserStore};

    fn service() -> UserService {
        UserService::new(Arc::new(MemoryUserStore::default()))
    }

    fn new_user(email: &str, password: &str) -> NewUser {
        NewUser::builder().email(email).password(password).build()
    }

    #[tokio::test]
    async fn test_create_then_get() {
        let service = service();
        let payload = NewUser::builder()
            .email("a@x.com")
            .password("h1")
            .first_name(Some("Ada".into()))
            .last_name(Some("Lovelace".into()))
            .permission_flags(Some(7))
            .build();

        let created = service.create(payload).await.unwrap();
        assert!(!created.id.as_str().is_empty());

        let user = service.get_by_id(created.id.as_str()).await.unwrap();
        assert_eq!(user, created);
        assert_eq!(user.email.as_str(), "a@x.com");
        assert_eq!(user.first_name.as_deref(), Some("Ada"));
        assert_eq!(user.last_name.as_deref(), Some("Lovelace"));
        assert_eq!(user.permission_flags, 7);
        assert_eq!(user.refresh_token, None);
    }

    #[tokio::test]
    async fn test_create_with_default_flags() {
        let user = service().create(new_user("a@x.com", "h1")).await.unwrap();
        assert_eq!(user.permission_flags, crate::user::DEFAULT_PERMISSION_FLAGS);
    }

    #[tokio::test]
    async fn test_create_malformed_payload() {
        let service = service();

        let err = service.create(new_user("nope", "h1")).await.unwrap_err();
        assert!(matches!(err, UserError::Validation(_)));

        let err = service.create(new_user("a@x.com", "")).await.unwrap_err();
        assert!(matches!(err, UserError::Validation(_)));

        assert!(service.list(10, 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_id_is_not_found() {
        let service = service();
        service.create(new_user("a@x.com", "h1")).await.unwrap();

        assert!(matches!(
            service.get_by_id("missing").await,
            Err(UserError::NotFound)
        ));
        assert!(matches!(
            service.delete_by_id("missing").await,
            Err(UserError::NotFound)
        ));
        assert!(matches!(
            service
                .update_by_id("missing", UserPatch::default())
                .await,
            Err(UserError::NotFound)
        ));
        assert!(matches!(
            service
                .update_user_refresh_token_by_id("missing", "token")
                .await,
            Err(UserError::NotFound)
        ));

        // Nothing else was touched.
        assert_eq!(service.list(10, 0).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_id_wins_over_taken_email() {
        let service = service();
        let existing = service.create(new_user("a@x.com", "h1")).await.unwrap();

        let res = service
            .update_by_id(
                "missing",
                UserPatch {
                    email: Some("a@x.com".into()),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(res, Err(UserError::NotFound)));

        assert_eq!(
            service.get_by_id(existing.id.as_str()).await.unwrap(),
            existing
        );
    }

    #[tokio::test]
    async fn test_emails_are_normalized_before_validation() {
        let service = service();

        let created = service
            .create(new_user(" A@x.com ", "h1"))
            .await
            .unwrap();
        assert_eq!(created.email.as_str(), "a@x.com");
        assert_eq!(service.get_user_by_email(" A@x.com").await.unwrap(), created);

        let updated = service
            .update_by_id(
                created.id.as_str(),
                UserPatch {
                    email: Some(" B@X.com".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.email.as_str(), "b@x.com");
    }

    #[tokio::test]
    async fn test_empty_identifiers_are_rejected() {
        let service = service();

        assert!(matches!(
            service.get_by_id("").await,
            Err(UserError::Validation(_))
        ));
        assert!(matches!(
            service.delete_by_id(" ").await,
            Err(UserError::Validation(_))
        ));
        assert!(matches!(
            service.update_by_id("", UserPatch::default()).await,
            Err(UserError::Validation(_))
        ));
        assert!(matches!(
            service.update_user_refresh_token_by_id("", "t").await,
            Err(UserError::Validation(_))
        ));
        assert!(matches!(
            service.get_user_by_email("").await,
            Err(UserError::Validation(_))
        ));
        assert!(matches!(
            service.get_user_by_email_with_password("").await,
            Err(UserError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let service = service();
        let first = service.create(new_user("a@x.com", "h1")).await.unwrap();

        let err = service
            .create(new_user("A@X.com", "h2"))
            .await
            .unwrap_err();
        assert!(matches!(err, UserError::Conflict));

        let users = service.list(10, 0).await.unwrap();
        assert_eq!(users, vec![first.clone()]);
        let stored = service
            .get_user_by_email_with_password("a@x.com")
            .await
            .unwrap();
        assert_eq!(stored.password, "h1");
        assert_eq!(stored.user, first);
    }

    #[tokio::test]
    async fn test_empty_patch_is_noop() {
        let service = service();
        let created = service.create(new_user("a@x.com", "h1")).await.unwrap();

        let updated = service
            .update_by_id(created.id.as_str(), UserPatch::default())
            .await
            .unwrap();
        assert_eq!(updated, created);
        assert_eq!(
            service.get_by_id(created.id.as_str()).await.unwrap(),
            created
        );
    }

    #[tokio::test]
    async fn test_patch_changes_single_field() {
        let service = service();
        let created = service
            .create(
                NewUser::builder()
                    .email("a@x.com")
                    .password("h1")
                    .first_name(Some("Ada".into()))
                    .build(),
            )
            .await
            .unwrap();

        let updated = service
            .update_by_id(
                created.id.as_str(),
                UserPatch {
                    last_name: Some("Lovelace".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.last_name.as_deref(), Some("Lovelace"));
        assert_eq!(
            User {
                last_name: None,
                ..updated
            },
            created
        );
    }

    #[tokio::test]
    async fn test_patch_to_taken_email_conflicts() {
        let service = service();
        let first = service.create(new_user("a@x.com", "h1")).await.unwrap();
        let second = service.create(new_user("b@x.com", "h2")).await.unwrap();

        let err = service
            .update_by_id(
                second.id.as_str(),
                UserPatch {
                    email: Some("A@x.com".into()),
                    first_name: Some("Bob".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, UserError::Conflict));

        assert_eq!(
            service.get_by_id(second.id.as_str()).await.unwrap(),
            second
        );
        assert_eq!(service.get_by_id(first.id.as_str()).await.unwrap(), first);
    }

    #[tokio::test]
    async fn test_email_lookups() {
        let service = service();
        let created = service
            .create(
                NewUser::builder()
                    .email("a@x.com")
                    .password("h1")
                    .first_name(Some("Ada".into()))
                    .build(),
            )
            .await
            .unwrap();

        let user = service.get_user_by_email("A@X.COM").await.unwrap();
        let with_password = service
            .get_user_by_email_with_password("a@x.com")
            .await
            .unwrap();

        assert_eq!(user, created);
        assert_eq!(with_password.user, user);
        assert_eq!(with_password.password, "h1");

        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password").is_none());
        let json = serde_json::to_value(&with_password).unwrap();
        assert_eq!(json["password"], "h1");
        assert_eq!(json["email"], "a@x.com");

        assert!(matches!(
            service.get_user_by_email("b@x.com").await,
            Err(UserError::NotFound)
        ));
        assert!(matches!(
            service.get_user_by_email_with_password("b@x.com").await,
            Err(UserError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_list_pages() {
        let service = service();
        let mut created = Vec::new();
        for i in 0..5 {
            created.push(
                service
                    .create(new_user(&format!("user{i}@x.com"), "h"))
                    .await
                    .unwrap(),
            );
        }

        assert_eq!(service.list(2, 0).await.unwrap(), created[0..2]);
        assert_eq!(service.list(2, 1).await.unwrap(), created[2..4]);
        assert_eq!(service.list(2, 2).await.unwrap(), created[4..5]);
        assert!(service.list(2, 3).await.unwrap().is_empty());

        for (limit, page) in [(0, 0), (-1, 0), (2, -1)] {
            assert!(matches!(
                service.list(limit, page).await,
                Err(UserError::Validation(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_refresh_token_rotation() {
        let service = service();
        let created = service.create(new_user("a@x.com", "h1")).await.unwrap();
        let id = created.id.as_str();

        service
            .update_user_refresh_token_by_id(id, "first")
            .await
            .unwrap();
        service
            .update_user_refresh_token_by_id(id, "second")
            .await
            .unwrap();
        let user = service.get_by_id(id).await.unwrap();
        assert_eq!(user.refresh_token.as_deref(), Some("second"));
        assert_eq!(
            User {
                refresh_token: None,
                ..user
            },
            created
        );

        service.update_user_refresh_token_by_id(id, "").await.unwrap();
        assert_eq!(service.get_by_id(id).await.unwrap().refresh_token, None);
    }

    #[tokio::test]
    async fn test_delete_all_users() {
        let service = service();
        for i in 0..3 {
            service
                .create(new_user(&format!("user{i}@x.com"), "h"))
                .await
                .unwrap();
        }

        assert_eq!(service.delete_all_users().await.unwrap(), 3);
        assert!(service.list(10, 0).await.unwrap().is_empty());
        assert_eq!(service.delete_all_users().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_user_lifecycle() {
        let service = service();
        let created = service.create(new_user("a@x.com", "h1")).await.unwrap();
        let id = created.id.as_str();

        assert_eq!(service.get_by_id(id).await.unwrap(), created);

        let updated = service
            .update_by_id(
                id,
                UserPatch {
                    email: Some("a2@x.com".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.email.as_str(), "a2@x.com");
        let stored = service
            .get_user_by_email_with_password("a2@x.com")
            .await
            .unwrap();
        assert_eq!(stored.password, "h1");

        service.delete_by_id(id).await.unwrap();
        assert!(matches!(
            service.get_by_id(id).await,
            Err(UserError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_store_failure_is_propagated() {
        let mut store = MockUserStore::new();
        store.expect_get_user_by_id().times(1).returning(|_| {
            Err(UserError::store(std::io::Error::other("store unavailable")))
        });
        store.expect_delete_all_users().times(1).returning(|| {
            Err(UserError::store(std::io::Error::other("store unavailable")))
        });
        let service = UserService::new(Arc::new(store));

        match service.get_by_id("u1").await {
            Err(UserError::Store(err)) => {
                assert_eq!(err.to_string(), "store unavailable")
            },
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(
            service.delete_all_users().await,
            Err(UserError::Store(_))
        ));
    }

    #[tokio::test]
    async fn test_conflict_from_store_is_kept() {
        let mut store = MockUserStore::new();
        store
            .expect_create_user()
            .times(1)
            .returning(|_| Err(UserError::Conflict));
        let service = UserService::new(Arc::new(store));

        assert!(matches!(
            service.create(new_user("a@x.com", "h1")).await,
            Err(UserError::Conflict)
        ));
    }

    #[tokio::test]
    async fn test_validation_skips_store() {
        // No expectation: any store call would panic.
        let service = UserService::new(Arc::new(MockUserStore::new()));

        assert!(service.list(0, 0).await.is_err());
        assert!(service.get_by_id("").await.is_err());
        assert!(service.create(new_user("bad", "h1")).await.is_err());
        assert!(
            service
                .update_by_id(
                    "u1",
                    UserPatch {
                        email: Some("bad".into()),
                        ..Default::default()
                    }
                )
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_single_delegation_with_normalized_input() {
        let mut store = MockUserStore::new();
        store
            .expect_update_user_refresh_token_by_id()
            .withf(|id, token| id.as_str() == "u1" && token.is_none())
            .times(1)
            .returning(|_, _| Ok(true));
        store
            .expect_list_users()
            .withf(|pagination| {
                pagination.limit() == 2 && pagination.page() == 0
            })
            .times(1)
            .returning(|_| Ok(Vec::new()));
        store
            .expect_get_user_by_email()
            .withf(|email| email.as_str() == "a@x.com")
            .times(1)
            .returning(|_| Ok(None));
        let service = UserService::new(Arc::new(store));

        service
            .update_user_refresh_token_by_id("u1", "")
            .await
            .unwrap();
        assert!(service.list(2, 0).await.unwrap().is_empty());
        assert!(matches!(
            service.get_user_by_email(" A@X.com").await,
            Err(UserError::NotFound)
        ));
    }
}
