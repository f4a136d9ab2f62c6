use finder_core::FinderError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Wallet address '{0}' already has a stored request")]
    DuplicateKey(String),

    #[error("Corrupt row for wallet address '{wallet_address}': {reason}")]
    CorruptRow {
        wallet_address: String,
        reason: String,
    },
}

pub type StoreResult<T> = Result<T, StoreError>;

impl From<StoreError> for FinderError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateKey(_) => FinderError::Conflict(err.to_string()),
            other => FinderError::Database(other.to_string()),
        }
    }
}
