//! Email logic management.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, UserError};

/// Value object of a normalized email address.
///
/// Emails are compared case-insensitively, so the inner value is always
/// trimmed and lower-cased.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Converts a caller supplied string into an [`EmailAddress`].
    ///
    /// # Errors
    ///
    /// Returns `Err` if the string is empty or does not hold exactly one
    /// `@` with text on both sides.
    pub fn parse(email: impl AsRef<str>) -> Result<Self> {
        let email = email.as_ref().trim();
        if email.is_empty() {
            return Err(UserError::invalid(
                "email",
                "Email must not be empty.",
            ));
        }

        match email.split_once('@') {
            Some((local, domain))
                if !local.is_empty()
                    && !domain.is_empty()
                    && !domain.contains('@') =>
            {
                Ok(Self(email.to_lowercase()))
            },
            _ => Err(UserError::invalid("email", "Email must be formatted.")),
        }
    }

    /// Returns the same string as a string slice `&str`.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for EmailAddress {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<String> for EmailAddress {
    /// Wrap an email read back from a store.
    fn from(email: String) -> Self {
        Self(email)
    }
}
