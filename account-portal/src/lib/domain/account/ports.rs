use async_trait::async_trait;

use super::errors::IdentityError;
use super::models::AccountHandle;

/// External identity provider holding credentials and sessions.
///
/// Implementations are stateless with respect to "who is signed in": the
/// caller's session keeps the current `AccountHandle` and passes it back.
#[async_trait]
pub trait IdentityProvider: Send + Sync + 'static {
    /// Create an email/password account. The new account is signed in.
    ///
    /// # Errors
    /// * `EmailInUse` - An account already uses this email
    /// * `InvalidEmail` - Email is malformed
    /// * `WeakPassword` - Password rejected by the provider's policy
    /// * `NetworkError` - Provider unreachable
    async fn create_account(&self, email: &str, password: &str)
        -> Result<AccountHandle, IdentityError>;

    /// Sign in with email and password.
    ///
    /// # Errors
    /// * `UserNotFound` - No account for this email
    /// * `WrongPassword` - Password does not match
    /// * `InvalidCredential` - Provider does not say which part was wrong
    /// * `TooManyRequests` - Provider throttled the account
    /// * `NetworkError` - Provider unreachable
    async fn sign_in(&self, email: &str, password: &str) -> Result<AccountHandle, IdentityError>;

    /// Set the account's display name.
    ///
    /// # Returns
    /// Handle reflecting the new profile
    async fn update_display_name(
        &self,
        account: &AccountHandle,
        display_name: &str,
    ) -> Result<AccountHandle, IdentityError>;

    /// Send the address-verification email for the account.
    ///
    /// # Errors
    /// * `TooManyRequests` - Too many emails requested recently
    async fn send_verification_email(&self, account: &AccountHandle) -> Result<(), IdentityError>;

    /// Send a password reset email.
    ///
    /// # Errors
    /// * `UserNotFound` - No account for this email
    /// * `InvalidEmail` - Email is malformed
    async fn send_password_reset(&self, email: &str) -> Result<(), IdentityError>;

    /// Re-read the account from the provider, e.g. after the address was verified.
    async fn refresh(&self, account: &AccountHandle) -> Result<AccountHandle, IdentityError>;

    /// End the provider-side session for the account.
    async fn sign_out(&self, account: &AccountHandle) -> Result<(), IdentityError>;

    /// Cheap round trip used by the startup readiness handshake.
    async fn probe(&self) -> Result<(), IdentityError>;
}
