use async_trait::async_trait;

use super::auth_session::AuthSession;
use super::errors::AuthError;
use super::models::AvailabilityReport;
use super::models::FormOutcome;
use super::models::LoginForm;
use super::models::SignupForm;
use super::state::AuthState;
use crate::domain::account::models::AccountHandle;

/// Port for the form handlers the page calls.
#[async_trait]
pub trait AuthServicePort: Send + Sync + 'static {
    /// Live availability of a username candidate while it is typed.
    ///
    /// Never fails: an unreachable store is reported as `Uncertain`.
    async fn check_availability(&self, raw: &str) -> AvailabilityReport;

    /// Create an account and reserve its username.
    ///
    /// # Errors
    /// * `MissingFields`, `InvalidUsername`, `WeakPassword` - Rejected locally
    /// * `UsernameTaken` - Username already reserved, no account created
    /// * `Identity` - Account creation refused by the provider
    /// * `UsernameLostRace` - Account created, username claimed concurrently
    /// * `UsernameNotReserved` - Account created, reservation write failed
    async fn signup(&self, session: &AuthSession, form: SignupForm)
        -> Result<FormOutcome, AuthError>;

    /// Reserve a username for the signed-in account after signup could not.
    ///
    /// # Errors
    /// * `NotSignedIn` - No current account
    /// * `UsernameAlreadyAssigned` - The account already has a username
    /// * `InvalidUsername` - Rejected locally
    /// * `UsernameTaken` - Claimed by another account
    async fn choose_username(&self, session: &AuthSession, raw: &str)
        -> Result<FormOutcome, AuthError>;

    /// # Errors
    /// * `MissingFields` - Email or password empty
    /// * `Identity` - Sign-in refused by the provider
    async fn login(&self, session: &AuthSession, form: LoginForm) -> Result<FormOutcome, AuthError>;

    /// # Errors
    /// * `SignOut` - The provider failed to end the session
    async fn logout(&self, session: &AuthSession) -> Result<FormOutcome, AuthError>;

    /// Without a current account, or once verified, this is a no-op outcome.
    ///
    /// # Errors
    /// * `VerificationEmail` - The provider failed to send the email
    async fn resend_verification(&self, session: &AuthSession) -> Result<FormOutcome, AuthError>;

    /// # Errors
    /// * `MissingEmail` - Email empty
    /// * `Identity` - The provider refused the request
    async fn reset_password(&self, email: &str) -> Result<FormOutcome, AuthError>;

    /// Re-read the current account from the provider and publish it.
    /// A credential the provider no longer accepts signs the session out.
    ///
    /// # Errors
    /// * `Identity` - The provider could not be reached
    async fn reload(&self, session: &AuthSession) -> Result<(), AuthError>;

    /// Resolve the auth state for an account (or none).
    async fn state(&self, account: Option<&AccountHandle>) -> AuthState;
}
