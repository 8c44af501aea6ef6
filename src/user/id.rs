//! ID logic management.

use std::fmt;

use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};

use crate::error::{Result, UserError};

const ID_BYTES: usize = 12;

/// Value object of an opaque, store-assigned identifier.
#[derive(
    Debug, Default, Clone, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Converts a caller supplied string into a [`UserId`].
    ///
    /// # Errors
    ///
    /// Returns `Err` if the string is empty once trimmed.
    pub fn parse(id: impl AsRef<str>) -> Result<Self> {
        let trimmed = id.as_ref().trim();
        if trimmed.is_empty() {
            return Err(UserError::invalid("id", "Id must not be empty."));
        }

        Ok(Self(trimmed.to_string()))
    }

    /// Generate a fresh identifier from OS randomness.
    pub fn generate() -> Self {
        let mut bytes = [0u8; ID_BYTES];
        OsRng.fill_bytes(&mut bytes);
        Self(hex::encode(bytes))
    }

    /// Returns the same string as a string slice `&str`.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for UserId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<String> for UserId {
    /// Wrap an identifier read back from a store.
    fn from(id: String) -> Self {
        Self(id)
    }
}
