use thiserror::Error;

use crate::config::ConfigError;

#[derive(Error, Debug)]
pub enum GatorError {
    #[error("Unsupported date format: {0:?}")]
    UnsupportedDateFormat(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Feed parsing error: {0}")]
    Parse(String),

    #[error("Store error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Invalid interval: {0}")]
    InvalidInterval(String),

    #[error("Feed not found: {0}")]
    FeedNotFound(String),

    #[error("Feed already exists: {0}")]
    FeedExists(String),

    #[error("Already following: {0}")]
    AlreadyFollowing(String),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("User already exists: {0}")]
    UserExists(String),

    #[error("No user is logged in (run `gator login <name>` first)")]
    NotLoggedIn,

    #[error("{0}")]
    Usage(String),

    #[error("Cancelled by shutdown")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, GatorError>;
