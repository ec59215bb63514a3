use auth::PasswordError;
use thiserror::Error;

use crate::domain::account::errors::IdentityError;
use crate::domain::store::StoreError;
use crate::domain::username::errors::UsernameError;

/// Top-level error for form submissions
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    // Local validation, raised before any network call
    #[error("Required fields missing")]
    MissingFields,

    #[error("Email missing")]
    MissingEmail,

    #[error("Invalid username: {0}")]
    InvalidUsername(#[from] UsernameError),

    #[error("Weak password: {0}")]
    WeakPassword(PasswordError),

    // Username reservation
    #[error("Username already taken: {0}")]
    UsernameTaken(String),

    /// The account exists but another signup claimed the username first.
    #[error("Account {account_id} created but username {username} was claimed concurrently")]
    UsernameLostRace { account_id: String, username: String },

    /// The account exists but the reservation could not be written.
    #[error("Account {account_id} created but username reservation failed: {source}")]
    UsernameNotReserved {
        account_id: String,
        source: StoreError,
    },

    #[error("Account already has a username")]
    UsernameAlreadyAssigned,

    #[error("No account signed in")]
    NotSignedIn,

    // Collaborator failures
    #[error("Identity provider error: {0}")]
    Identity(#[from] IdentityError),

    #[error("Verification email failed: {0}")]
    VerificationEmail(IdentityError),

    #[error("Sign out failed: {0}")]
    SignOut(IdentityError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl AuthError {
    /// Message shown to the person filling in the form.
    pub fn user_message(&self) -> String {
        match self {
            AuthError::MissingFields => "Please fill in all fields".to_string(),
            AuthError::MissingEmail => "Please enter your email first".to_string(),
            AuthError::InvalidUsername(e) => e.user_message(),
            AuthError::WeakPassword(PasswordError::TooWeak { min, .. }) => {
                format!("Password must be at least {} characters", min)
            }
            AuthError::WeakPassword(_) => "Password is not acceptable".to_string(),
            AuthError::UsernameTaken(_) => {
                "Username already taken. Please choose another.".to_string()
            }
            AuthError::UsernameLostRace { username, .. } => format!(
                "Account created, but @{} was just taken by someone else. Please choose a new username.",
                username
            ),
            AuthError::UsernameNotReserved { .. } => {
                "Account created, but we couldn't reserve your username. Please choose it again."
                    .to_string()
            }
            AuthError::UsernameAlreadyAssigned => "Your account already has a username".to_string(),
            AuthError::NotSignedIn => "Please log in first".to_string(),
            AuthError::Identity(e) => e.user_message().to_string(),
            AuthError::VerificationEmail(IdentityError::TooManyRequests) => {
                "Please wait before requesting another email".to_string()
            }
            AuthError::VerificationEmail(_) => "Error sending verification email".to_string(),
            AuthError::SignOut(_) => "Error logging out".to_string(),
            AuthError::Store(_) => "An error occurred. Please try again.".to_string(),
        }
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::MissingFields => "missing_fields",
            AuthError::MissingEmail => "missing_email",
            AuthError::InvalidUsername(_) => "invalid_username",
            AuthError::WeakPassword(_) => "weak_password",
            AuthError::UsernameTaken(_) => "username_taken",
            AuthError::UsernameLostRace { .. } => "username_lost_race",
            AuthError::UsernameNotReserved { .. } => "username_not_reserved",
            AuthError::UsernameAlreadyAssigned => "username_already_assigned",
            AuthError::NotSignedIn => "not_signed_in",
            AuthError::Identity(e) => e.code(),
            AuthError::VerificationEmail(IdentityError::TooManyRequests) => "too_many_requests",
            AuthError::VerificationEmail(_) => "verification_email_failed",
            AuthError::SignOut(_) => "sign_out_failed",
            AuthError::Store(_) => "store_error",
        }
    }

    /// Whether the account was created and now needs a username chosen.
    pub fn needs_new_username(&self) -> bool {
        matches!(
            self,
            AuthError::UsernameLostRace { .. } | AuthError::UsernameNotReserved { .. }
        )
    }
}
