//! Error handling for the connection router.
//!
//! Routing failures are values, never panics: each one is translated into
//! a reply envelope for the client and a label for metrics, and the
//! connection (and the process) stay up.

use crate::db::DbError;
use crate::protocol::CodecError;
use thiserror::Error;

/// Errors raised while routing one client envelope.
#[derive(Debug, Error)]
pub enum RouteError {
    #[error("authentication required")]
    AuthRequired,

    #[error("already logged in")]
    AlreadyAuthenticated,

    #[error("username and password are required")]
    MissingCredentials,

    #[error("invalid username or password")]
    BadCredentials,

    #[error("username is already taken")]
    UserExists,

    #[error("store unavailable")]
    Store,

    #[error("malformed envelope: {0}")]
    Malformed(#[from] CodecError),
}

impl RouteError {
    /// Static label for metrics.
    pub fn code(&self) -> &'static str {
        match self {
            Self::AuthRequired => "auth_required",
            Self::AlreadyAuthenticated => "already_authenticated",
            Self::MissingCredentials => "missing_credentials",
            Self::BadCredentials => "bad_credentials",
            Self::UserExists => "user_exists",
            Self::Store => "store_unavailable",
            Self::Malformed(_) => "malformed",
        }
    }
}

impl From<DbError> for RouteError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::MissingCredentials => RouteError::MissingCredentials,
            DbError::BadCredentials => RouteError::BadCredentials,
            DbError::UserExists(_) => RouteError::UserExists,
            // A missing row during a score update reads the same as a bad
            // identity from the client's side.
            DbError::UserNotFound(_) => RouteError::BadCredentials,
            DbError::Sqlx(_) | DbError::Migration(_) => RouteError::Store,
        }
    }
}
