//! Typed builder for NewUser.

use crate::user::NewUser;

/// [`NewUser`] builder.
///
/// `build` only exists once both email and password are set.
#[derive(Debug, Clone)]
pub struct UserBuilder<Email, Password> {
    email: Email,
    password: Password,
    first_name: Option<String>,
    last_name: Option<String>,
    permission_flags: Option<i32>,
}

/// Value is missing on [`UserBuilder`].
#[derive(Debug, Clone)]
pub struct Missing;

/// Value is present on [`UserBuilder`].
#[derive(Debug, Clone)]
pub struct Present<T>(pub T);

impl NewUser {
    /// Start building a [`NewUser`].
    pub fn builder() -> UserBuilder<Missing, Missing> {
        UserBuilder::new()
    }
}

impl Default for UserBuilder<Missing, Missing> {
    fn default() -> Self {
        Self::new()
    }
}

impl UserBuilder<Missing, Missing> {
    /// Create a new [`UserBuilder`].
    pub fn new() -> Self {
        Self {
            email: Missing,
            password: Missing,
            first_name: None,
            last_name: None,
            permission_flags: None,
        }
    }
}

impl<Password> UserBuilder<Missing, Password> {
    /// Update `email` field on [`UserBuilder`].
    pub fn email(
        self,
        email: impl Into<String>,
    ) -> UserBuilder<Present<String>, Password> {
        UserBuilder {
            email: Present(email.into()),
            password: self.password,
            first_name: self.first_name,
            last_name: self.last_name,
            permission_flags: self.permission_flags,
        }
    }
}

impl<Email> UserBuilder<Email, Missing> {
    /// Update `password` field on [`UserBuilder`].
    ///
    /// The value must already be hashed.
    pub fn password(
        self,
        password: impl Into<String>,
    ) -> UserBuilder<Email, Present<String>> {
        UserBuilder {
            email: self.email,
            password: Present(password.into()),
            first_name: self.first_name,
            last_name: self.last_name,
            permission_flags: self.permission_flags,
        }
    }
}

impl<Email, Password> UserBuilder<Email, Password> {
    /// Update `first_name` field on [`UserBuilder`].
    pub fn first_name(mut self, first_name: Option<String>) -> Self {
        self.first_name = first_name;
        self
    }

    /// Update `last_name` field on [`UserBuilder`].
    pub fn last_name(mut self, last_name: Option<String>) -> Self {
        self.last_name = last_name;
        self
    }

    /// Update `permission_flags` field on [`UserBuilder`].
    pub fn permission_flags(mut self, flags: Option<i32>) -> Self {
        self.permission_flags = flags;
        self
    }
}

impl UserBuilder<Present<String>, Present<String>> {
    /// Build the [`NewUser`] payload.
    pub fn build(self) -> NewUser {
        NewUser {
            email: self.email.0,
            password: self.password.0,
            first_name: self.first_name,
            last_name: self.last_name,
            permission_flags: self.permission_flags,
        }
    }
}
