//! Error handler for the user layer.

use thiserror::Error;
use validator::{ValidationError, ValidationErrors};

pub type Result<T> = std::result::Result<T, UserError>;

/// Enum representing user layer errors.
#[derive(Debug, Error)]
pub enum UserError {
    #[error("validation error occurred")]
    Validation(#[from] ValidationErrors),

    #[error("user not found")]
    NotFound,
    #[error("email is already used by another user")]
    Conflict,

    #[error("store failed: {0}")]
    Store(Box<dyn std::error::Error + Send + Sync>),
}

impl UserError {
    /// Wrap any store-level failure.
    pub fn store<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Store(Box::new(err))
    }

    /// Build a [`UserError::Validation`] for a single field.
    pub fn invalid(field: &'static str, message: &'static str) -> Self {
        let mut errors = ValidationErrors::new();
        errors.add(
            field,
            ValidationError::new(field).with_message(message.into()),
        );
        Self::Validation(errors)
    }
}

pub trait ToInternal<T> {
    fn catch(self) -> Result<T>;
}

impl<T, E> ToInternal<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn catch(self) -> Result<T> {
        self.map_err(UserError::store)
    }
}
