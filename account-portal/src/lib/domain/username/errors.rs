use thiserror::Error;

use crate::domain::store::StoreError;

/// Error for Username validation failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UsernameError {
    #[error("Username too short: minimum {min} characters, got {actual}")]
    TooShort { min: usize, actual: usize },

    #[error("Username contains invalid characters (only lowercase letters, digits and underscore allowed)")]
    InvalidCharacters,
}

impl UsernameError {
    pub fn user_message(&self) -> String {
        match self {
            UsernameError::TooShort { min, .. } => {
                format!("Username must be at least {} characters", min)
            }
            UsernameError::InvalidCharacters => {
                "Username can only contain letters, numbers, and underscores".to_string()
            }
        }
    }
}

/// Error for username claims
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClaimError {
    #[error("Username already taken: {0}")]
    AlreadyTaken(String),

    #[error("Username claim failed: {0}")]
    Store(#[from] StoreError),
}
