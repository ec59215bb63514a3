use thiserror::Error;

/// Failures reported by the identity provider
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IdentityError {
    #[error("Email already in use")]
    EmailInUse,

    #[error("Invalid email address")]
    InvalidEmail,

    #[error("Password too weak")]
    WeakPassword,

    #[error("No account for this email")]
    UserNotFound,

    #[error("Wrong password")]
    WrongPassword,

    #[error("Invalid credential")]
    InvalidCredential,

    #[error("Too many requests")]
    TooManyRequests,

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Identity provider error: {0}")]
    Unknown(String),
}

impl IdentityError {
    /// Message shown to the person filling in the form.
    pub fn user_message(&self) -> &'static str {
        match self {
            IdentityError::EmailInUse => "This email is already registered. Try logging in.",
            IdentityError::InvalidEmail => "Please enter a valid email address",
            IdentityError::WeakPassword => "Password should be at least 6 characters",
            IdentityError::UserNotFound => "No account found with this email",
            IdentityError::WrongPassword => "Incorrect password",
            IdentityError::InvalidCredential => "Invalid email or password",
            IdentityError::TooManyRequests => "Too many attempts. Please try again later.",
            IdentityError::NetworkError(_) => "Network error. Check your connection.",
            IdentityError::Unknown(_) => "An error occurred. Please try again.",
        }
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            IdentityError::EmailInUse => "email_in_use",
            IdentityError::InvalidEmail => "invalid_email",
            IdentityError::WeakPassword => "weak_password",
            IdentityError::UserNotFound => "user_not_found",
            IdentityError::WrongPassword => "wrong_password",
            IdentityError::InvalidCredential => "invalid_credential",
            IdentityError::TooManyRequests => "too_many_requests",
            IdentityError::NetworkError(_) => "network_error",
            IdentityError::Unknown(_) => "identity_error",
        }
    }
}
