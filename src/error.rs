use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("unauthenticated")]
    Unauthenticated,

    #[error("not found")]
    NotFound,

    #[error("query error: {0}")]
    Query(String),

    #[error("identity error: {0}")]
    Identity(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;
