use crate::password::PasswordError;
use crate::password::PasswordHasher;
use crate::password::PasswordPolicy;
use crate::token::IdTokenClaims;
use crate::token::JwtError;
use crate::token::JwtHandler;

/// Verifies email/password credentials and mints ID tokens.
pub struct Authenticator {
    password_hasher: PasswordHasher,
    password_policy: PasswordPolicy,
    jwt_handler: JwtHandler,
}

/// Authentication operation errors.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum AuthenticationError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Password error: {0}")]
    Password(#[from] PasswordError),

    #[error("Token error: {0}")]
    Token(#[from] JwtError),
}

impl Authenticator {
    pub fn new(token_secret: &[u8]) -> Self {
        Self {
            password_hasher: PasswordHasher::new(),
            password_policy: PasswordPolicy::default(),
            jwt_handler: JwtHandler::new(token_secret),
        }
    }

    pub fn with_password_policy(mut self, policy: PasswordPolicy) -> Self {
        self.password_policy = policy;
        self
    }

    pub fn password_policy(&self) -> PasswordPolicy {
        self.password_policy
    }

    /// Apply the strength policy, then hash for storage.
    ///
    /// # Errors
    /// * `TooWeak` - Password is below the policy minimum
    /// * `HashingFailed` - Argon2 failure
    pub fn hash_password(&self, password: &str) -> Result<String, PasswordError> {
        self.password_policy.check(password)?;
        self.password_hasher.hash(password)
    }

    /// Check a password against its stored hash and, on success, sign `claims`.
    ///
    /// # Errors
    /// * `InvalidCredentials` - Password does not match
    /// * `Password` - Stored hash is unreadable
    /// * `Token` - Signing failed
    pub fn authenticate(
        &self,
        password: &str,
        stored_hash: &str,
        claims: &IdTokenClaims,
    ) -> Result<String, AuthenticationError> {
        if !self.password_hasher.verify(password, stored_hash)? {
            return Err(AuthenticationError::InvalidCredentials);
        }

        Ok(self.jwt_handler.encode(claims)?)
    }

    /// Sign claims for an account whose credentials were already checked,
    /// e.g. right after it was created.
    pub fn issue_token(&self, claims: &IdTokenClaims) -> Result<String, JwtError> {
        self.jwt_handler.encode(claims)
    }

    pub fn validate_token(&self, token: &str) -> Result<IdTokenClaims, JwtError> {
        self.jwt_handler.decode(token)
    }
}
