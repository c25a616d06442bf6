//! Account errors.

use thiserror::Error;

use furnish_core::EmailError;

use crate::db::RepositoryError;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// Wrong password, or no account for the email. Callers must not be able
    /// to tell which.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The session points at an account that no longer exists.
    #[error("account not found")]
    UserNotFound,

    #[error("an account with this email already exists")]
    UserAlreadyExists,

    #[error("weak password: {0}")]
    WeakPassword(String),

    /// Blank name or unusable phone number.
    #[error("{0}")]
    InvalidProfile(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("could not hash password")]
    PasswordHash,
}
