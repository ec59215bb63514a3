use std::sync::Arc;

use async_trait::async_trait;
use auth::PasswordPolicy;

use super::auth_session::AuthSession;
use super::errors::AuthError;
use super::models::Availability;
use super::models::AvailabilityReport;
use super::models::FormOutcome;
use super::models::LoginForm;
use super::models::SignupForm;
use super::ports::AuthServicePort;
use super::state::AuthState;
use super::state::Profile;
use crate::domain::account::errors::IdentityError;
use crate::domain::account::models::AccountHandle;
use crate::domain::account::models::AccountRecord;
use crate::domain::account::ports::IdentityProvider;
use crate::domain::account::records::AccountRecords;
use crate::domain::store::KeyValueStore;
use crate::domain::username::canonicalize;
use crate::domain::username::ClaimError;
use crate::domain::username::Username;
use crate::domain::username::UsernameDirectory;

/// Form handlers over an identity provider and a key-value store.
///
/// Stateless: everything about "who is signed in" lives in the
/// `AuthSession` passed to each call.
pub struct AuthService<S, I>
where
    S: KeyValueStore + ?Sized,
    I: IdentityProvider + ?Sized,
{
    directory: UsernameDirectory<S>,
    records: AccountRecords<S>,
    identity: Arc<I>,
    password_policy: PasswordPolicy,
    owner_emails: Vec<String>,
}

impl<S, I> AuthService<S, I>
where
    S: KeyValueStore + ?Sized,
    I: IdentityProvider + ?Sized,
{
    pub fn new(store: Arc<S>, identity: Arc<I>) -> Self {
        Self {
            directory: UsernameDirectory::new(Arc::clone(&store)),
            records: AccountRecords::new(store),
            identity,
            password_policy: PasswordPolicy::default(),
            owner_emails: Vec::new(),
        }
    }

    pub fn with_password_policy(mut self, policy: PasswordPolicy) -> Self {
        self.password_policy = policy;
        self
    }

    /// Accounts signing in with one of these addresses get the owner badge.
    pub fn with_owner_emails(mut self, emails: impl IntoIterator<Item = String>) -> Self {
        self.owner_emails = emails
            .into_iter()
            .map(|email| email.trim().to_lowercase())
            .filter(|email| !email.is_empty())
            .collect();
        self
    }

    fn is_owner(&self, account: &AccountHandle) -> bool {
        let email = account.email.to_lowercase();
        self.owner_emails.iter().any(|owner| *owner == email)
    }
}

#[async_trait]
impl<S, I> AuthServicePort for AuthService<S, I>
where
    S: KeyValueStore + ?Sized,
    I: IdentityProvider + ?Sized,
{
    async fn check_availability(&self, raw: &str) -> AvailabilityReport {
        let canonical = canonicalize(raw);

        let availability = match Username::new(&canonical) {
            Err(e) => Availability::Invalid(e),
            Ok(username) => match self.directory.is_taken(username.as_str()).await {
                Ok(true) => Availability::Taken,
                Ok(false) => Availability::Available,
                Err(e) => {
                    tracing::warn!(username = %username, error = %e, "Availability uncertain");
                    Availability::Uncertain
                }
            },
        };

        AvailabilityReport {
            canonical,
            availability,
        }
    }

    async fn signup(
        &self,
        session: &AuthSession,
        form: SignupForm,
    ) -> Result<FormOutcome, AuthError> {
        let name = form.name.trim();
        let email = form.email.trim();
        if name.is_empty()
            || form.username.trim().is_empty()
            || email.is_empty()
            || form.password.is_empty()
        {
            return Err(AuthError::MissingFields);
        }

        let username = Username::new(&form.username)?;
        self.password_policy
            .check(&form.password)
            .map_err(AuthError::WeakPassword)?;

        // Advisory only: a clear "taken" saves creating an account for nothing,
        // anything else is settled by the claim below.
        match self.directory.is_taken(username.as_str()).await {
            Ok(true) => return Err(AuthError::UsernameTaken(username.to_string())),
            Ok(false) => {}
            Err(e) => {
                tracing::warn!(username = %username, error = %e, "Availability uncertain, relying on claim");
            }
        }

        let account = self
            .identity
            .create_account(email, &form.password)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, code = e.code(), "Signup rejected by identity provider");
                AuthError::Identity(e)
            })?;
        tracing::info!(account_id = %account.id, "Account created");

        let account = match self.identity.update_display_name(&account, name).await {
            Ok(updated) => updated,
            Err(e) => {
                tracing::warn!(account_id = %account.id, error = %e, "Failed to set display name");
                account
            }
        };
        session.publish(Some(account.clone()));

        let reservation = self.directory.claim(&username, &account.id).await;

        let record = AccountRecord::new(name, reservation.is_ok().then(|| username.to_string()));
        if let Err(e) = self.records.put(&account.id, &record).await {
            tracing::error!(account_id = %account.id, error = %e, "Failed to write account record");
        }

        let verification = self.identity.send_verification_email(&account).await;
        if let Err(e) = &verification {
            tracing::warn!(account_id = %account.id, error = %e, "Failed to send verification email");
        }

        // Republish so subscribers re-read the record written above.
        session.publish(Some(account.clone()));

        match reservation {
            Ok(()) => {
                let outcome = FormOutcome::new("Account created! Please check your email to verify.");
                Ok(match verification {
                    Ok(()) => outcome,
                    Err(_) => outcome.with_follow_up(
                        "We couldn't send the verification email. Use resend to try again.",
                    ),
                })
            }
            Err(ClaimError::AlreadyTaken(username)) => {
                tracing::warn!(
                    account_id = %account.id,
                    username = %username,
                    "Username claimed concurrently after account creation"
                );
                Err(AuthError::UsernameLostRace {
                    account_id: account.id.to_string(),
                    username,
                })
            }
            Err(ClaimError::Store(source)) => {
                tracing::error!(account_id = %account.id, error = %source, "Username reservation failed");
                Err(AuthError::UsernameNotReserved {
                    account_id: account.id.to_string(),
                    source,
                })
            }
        }
    }

    async fn choose_username(
        &self,
        session: &AuthSession,
        raw: &str,
    ) -> Result<FormOutcome, AuthError> {
        let account = session.current_user().ok_or(AuthError::NotSignedIn)?;

        let existing = self.records.get(&account.id).await?;
        if existing.as_ref().is_some_and(|record| record.username.is_some()) {
            return Err(AuthError::UsernameAlreadyAssigned);
        }

        let username = Username::new(raw)?;
        match self.directory.claim(&username, &account.id).await {
            Ok(()) => {}
            Err(ClaimError::AlreadyTaken(taken)) => {
                // An earlier partial signup may already hold it for this account.
                if self.directory.owner_of(&username).await?.as_ref() != Some(&account.id) {
                    return Err(AuthError::UsernameTaken(taken));
                }
                tracing::info!(account_id = %account.id, username = %username, "Completing earlier reservation");
            }
            Err(ClaimError::Store(e)) => return Err(AuthError::Store(e)),
        }

        let record = match existing {
            Some(mut record) => {
                record.username = Some(username.to_string());
                record
            }
            None => AccountRecord::new(
                account.display_name.clone().unwrap_or_default(),
                Some(username.to_string()),
            ),
        };
        self.records.put(&account.id, &record).await?;

        session.publish(Some(account));
        Ok(FormOutcome::new(format!("Username @{} is yours!", username)))
    }

    async fn login(&self, session: &AuthSession, form: LoginForm) -> Result<FormOutcome, AuthError> {
        let email = form.email.trim();
        if email.is_empty() || form.password.is_empty() {
            return Err(AuthError::MissingFields);
        }

        let account = self
            .identity
            .sign_in(email, &form.password)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, code = e.code(), "Login failed");
                AuthError::Identity(e)
            })?;
        tracing::info!(account_id = %account.id, "Login succeeded");

        let owner = self.is_owner(&account);
        session.publish(Some(account));

        let outcome = FormOutcome::new("Login successful!");
        Ok(if owner {
            outcome.with_follow_up("Welcome back, Owner!")
        } else {
            outcome
        })
    }

    async fn logout(&self, session: &AuthSession) -> Result<FormOutcome, AuthError> {
        if let Some(account) = session.current_user() {
            match self.identity.sign_out(&account).await {
                Ok(()) => tracing::info!(account_id = %account.id, "Logged out"),
                // nothing left to end at the provider
                Err(e) if credential_rejected(&e) => {
                    tracing::info!(account_id = %account.id, "Logged out with an expired credential")
                }
                Err(e) => {
                    tracing::error!(account_id = %account.id, error = %e, "Logout failed");
                    return Err(AuthError::SignOut(e));
                }
            }
        }

        session.publish(None);
        Ok(FormOutcome::new("Logged out successfully"))
    }

    async fn resend_verification(&self, session: &AuthSession) -> Result<FormOutcome, AuthError> {
        let Some(account) = session.current_user() else {
            return Ok(FormOutcome::new("Log in to resend the verification email"));
        };
        if account.email_verified {
            return Ok(FormOutcome::new("Your email is already verified"));
        }

        self.identity
            .send_verification_email(&account)
            .await
            .map_err(|e| {
                tracing::warn!(account_id = %account.id, error = %e, "Verification email failed");
                if credential_rejected(&e) {
                    session.publish(None);
                }
                AuthError::VerificationEmail(e)
            })?;

        Ok(FormOutcome::new("Verification email sent! Check your inbox."))
    }

    async fn reset_password(&self, email: &str) -> Result<FormOutcome, AuthError> {
        let email = email.trim();
        if email.is_empty() {
            return Err(AuthError::MissingEmail);
        }

        self.identity.send_password_reset(email).await.map_err(|e| {
            tracing::error!(error = %e, code = e.code(), "Password reset failed");
            AuthError::Identity(e)
        })?;

        Ok(FormOutcome::new("Password reset email sent!"))
    }

    async fn reload(&self, session: &AuthSession) -> Result<(), AuthError> {
        if let Some(account) = session.current_user() {
            match self.identity.refresh(&account).await {
                Ok(refreshed) => session.publish(Some(refreshed)),
                Err(e) if credential_rejected(&e) => {
                    tracing::warn!(account_id = %account.id, "Credential rejected, signing out");
                    session.publish(None);
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    async fn state(&self, account: Option<&AccountHandle>) -> AuthState {
        let Some(account) = account else {
            return AuthState::LoggedOut;
        };

        let record = match self.records.get(&account.id).await {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(account_id = %account.id, error = %e, "Failed to read account record");
                None
            }
        };

        let display_name = account
            .display_name
            .clone()
            .filter(|name| !name.is_empty())
            .or_else(|| record.as_ref().map(|r| r.name.clone()));

        let profile = Profile {
            account_id: account.id.clone(),
            display_name,
            username: record.and_then(|r| r.username),
            is_owner: self.is_owner(account),
        };

        if account.email_verified {
            AuthState::LoggedInVerified(profile)
        } else {
            AuthState::LoggedInUnverified(profile)
        }
    }
}

fn credential_rejected(error: &IdentityError) -> bool {
    matches!(error, IdentityError::InvalidCredential)
}

#[cfg(test)]
mod tests {
    use mockall::mock;
    use serde_json::Value;

    use super::*;
    use crate::domain::account::models::AccountId;
    use crate::domain::store::SetOutcome;
    use crate::domain::store::StoreError;
    use crate::domain::username::UsernameError;
    use crate::outbound::identity::InMemoryIdentityProvider;
    use crate::outbound::identity::OutboundEmail;
    use crate::outbound::store::InMemoryKeyValueStore;

    mock! {
        pub TestKeyValueStore {}

        #[async_trait]
        impl KeyValueStore for TestKeyValueStore {
            async fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;
            async fn set_if_absent(&self, key: &str, value: Value) -> Result<SetOutcome, StoreError>;
            async fn set(&self, key: &str, value: Value) -> Result<(), StoreError>;
            async fn probe(&self) -> Result<(), StoreError>;
        }
    }

    mock! {
        pub TestIdentityProvider {}

        #[async_trait]
        impl IdentityProvider for TestIdentityProvider {
            async fn create_account(&self, email: &str, password: &str) -> Result<AccountHandle, IdentityError>;
            async fn sign_in(&self, email: &str, password: &str) -> Result<AccountHandle, IdentityError>;
            async fn update_display_name(&self, account: &AccountHandle, display_name: &str) -> Result<AccountHandle, IdentityError>;
            async fn send_verification_email(&self, account: &AccountHandle) -> Result<(), IdentityError>;
            async fn send_password_reset(&self, email: &str) -> Result<(), IdentityError>;
            async fn refresh(&self, account: &AccountHandle) -> Result<AccountHandle, IdentityError>;
            async fn sign_out(&self, account: &AccountHandle) -> Result<(), IdentityError>;
            async fn probe(&self) -> Result<(), IdentityError>;
        }
    }

    const SECRET: &[u8] = b"test-secret-key-at-least-32-bytes!!";

    fn handle(id: &str, email: &str) -> AccountHandle {
        AccountHandle {
            id: AccountId::new(id),
            email: email.to_string(),
            display_name: None,
            email_verified: false,
            id_token: format!("token-{}", id),
        }
    }

    fn signup_form(username: &str) -> SignupForm {
        SignupForm {
            name: "Jane Doe".to_string(),
            username: username.to_string(),
            email: "jane@example.com".to_string(),
            password: "secret123".to_string(),
        }
    }

    fn in_memory() -> (
        Arc<InMemoryKeyValueStore>,
        Arc<InMemoryIdentityProvider>,
        AuthService<InMemoryKeyValueStore, InMemoryIdentityProvider>,
    ) {
        let store = Arc::new(InMemoryKeyValueStore::new());
        let identity = Arc::new(InMemoryIdentityProvider::new(SECRET));
        let service = AuthService::new(Arc::clone(&store), Arc::clone(&identity));
        (store, identity, service)
    }

    #[tokio::test]
    async fn test_signup_success() {
        let (store, identity, service) = in_memory();
        let session = AuthSession::new();

        let outcome = service
            .signup(&session, signup_form("jane_doe"))
            .await
            .expect("signup should succeed");
        assert_eq!(outcome.message, "Account created! Please check your email to verify.");
        assert!(outcome.follow_up.is_none());

        let account = session.current_user().expect("new account is signed in");
        assert_eq!(account.display_name.as_deref(), Some("Jane Doe"));

        let reservation = store.get("usernames/jane_doe").await.unwrap();
        assert_eq!(reservation, Some(Value::String(account.id.to_string())));

        let record = store
            .get(&format!("users/{}", account.id))
            .await
            .unwrap()
            .expect("record written");
        assert_eq!(record["username"], "jane_doe");
        assert_eq!(record["name"], "Jane Doe");

        let outbox = identity.outbox().await;
        assert!(matches!(
            outbox.as_slice(),
            [OutboundEmail::Verification { email, .. }] if email == "jane@example.com"
        ));
    }

    #[tokio::test]
    async fn test_signup_missing_fields_makes_no_calls() {
        let mut store = MockTestKeyValueStore::new();
        let mut identity = MockTestIdentityProvider::new();
        store.expect_get().times(0);
        identity.expect_create_account().times(0);

        let service = AuthService::new(Arc::new(store), Arc::new(identity));
        let mut form = signup_form("jane");
        form.name = "   ".to_string();

        let result = service.signup(&AuthSession::new(), form).await;
        assert_eq!(result, Err(AuthError::MissingFields));
    }

    #[tokio::test]
    async fn test_signup_invalid_username_rejected_locally() {
        let mut store = MockTestKeyValueStore::new();
        let mut identity = MockTestIdentityProvider::new();
        store.expect_get().times(0);
        identity.expect_create_account().times(0);

        let service = AuthService::new(Arc::new(store), Arc::new(identity));

        let short = service.signup(&AuthSession::new(), signup_form("jd")).await;
        assert_eq!(
            short,
            Err(AuthError::InvalidUsername(UsernameError::TooShort { min: 3, actual: 2 }))
        );

        let invalid = service.signup(&AuthSession::new(), signup_form("jane-doe")).await;
        assert_eq!(
            invalid,
            Err(AuthError::InvalidUsername(UsernameError::InvalidCharacters))
        );
    }

    #[tokio::test]
    async fn test_signup_weak_password_rejected_locally() {
        let mut identity = MockTestIdentityProvider::new();
        identity.expect_create_account().times(0);

        let service = AuthService::new(Arc::new(MockTestKeyValueStore::new()), Arc::new(identity));
        let mut form = signup_form("jane");
        form.password = "12345".to_string();

        let result = service.signup(&AuthSession::new(), form).await;
        assert!(matches!(result, Err(AuthError::WeakPassword(_))));
        assert_eq!(
            result.unwrap_err().user_message(),
            "Password must be at least 6 characters"
        );
    }

    #[tokio::test]
    async fn test_signup_taken_username_rejected_before_creation() {
        let mut store = MockTestKeyValueStore::new();
        let mut identity = MockTestIdentityProvider::new();

        store
            .expect_get()
            .withf(|key| key == "usernames/taken")
            .times(1)
            .returning(|_| Ok(Some(Value::String("someone".to_string()))));
        identity.expect_create_account().times(0);

        let service = AuthService::new(Arc::new(store), Arc::new(identity));
        let session = AuthSession::new();
        let result = service.signup(&session, signup_form("taken")).await;

        assert_eq!(result, Err(AuthError::UsernameTaken("taken".to_string())));
        assert!(session.current_user().is_none());
    }

    #[tokio::test]
    async fn test_signup_lost_race_reports_compensating_error() {
        let mut store = MockTestKeyValueStore::new();
        let mut identity = MockTestIdentityProvider::new();

        // advisory check passes, the claim loses
        store.expect_get().times(1).returning(|_| Ok(None));
        store
            .expect_set_if_absent()
            .withf(|key, value| key == "usernames/taken" && value == &Value::String("u42".to_string()))
            .times(1)
            .returning(|_, _| Ok(SetOutcome::AlreadyExists));
        store
            .expect_set()
            .withf(|key, value| key == "users/u42" && value["username"].is_null())
            .times(1)
            .returning(|_, _| Ok(()));

        identity
            .expect_create_account()
            .times(1)
            .returning(|email, _| Ok(handle("u42", email)));
        identity
            .expect_update_display_name()
            .times(1)
            .returning(|account, name| {
                let mut updated = account.clone();
                updated.display_name = Some(name.to_string());
                Ok(updated)
            });
        identity
            .expect_send_verification_email()
            .times(1)
            .returning(|_| Ok(()));

        let service = AuthService::new(Arc::new(store), Arc::new(identity));
        let session = AuthSession::new();
        let result = service.signup(&session, signup_form("taken")).await;

        let error = result.unwrap_err();
        assert_eq!(
            error,
            AuthError::UsernameLostRace {
                account_id: "u42".to_string(),
                username: "taken".to_string(),
            }
        );
        assert!(error.needs_new_username());
        assert_ne!(
            error.user_message(),
            AuthError::UsernameTaken("taken".to_string()).user_message()
        );
        // the account exists and stays signed in so a new username can be chosen
        assert_eq!(session.current_user().map(|a| a.id), Some(AccountId::new("u42")));
    }

    #[tokio::test]
    async fn test_signup_continues_when_availability_uncertain() {
        let mut store = MockTestKeyValueStore::new();
        let mut identity = MockTestIdentityProvider::new();

        store
            .expect_get()
            .times(1)
            .returning(|_| Err(StoreError::Unavailable("timeout".to_string())));
        store
            .expect_set_if_absent()
            .times(1)
            .returning(|_, _| Ok(SetOutcome::Created));
        store
            .expect_set()
            .withf(|_, value| value["username"] == "jane")
            .times(1)
            .returning(|_, _| Ok(()));

        identity
            .expect_create_account()
            .times(1)
            .returning(|email, _| Ok(handle("u1", email)));
        identity
            .expect_update_display_name()
            .times(1)
            .returning(|account, _| Ok(account.clone()));
        identity
            .expect_send_verification_email()
            .times(1)
            .returning(|_| Ok(()));

        let service = AuthService::new(Arc::new(store), Arc::new(identity));
        let result = service.signup(&AuthSession::new(), signup_form("jane")).await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_signup_reservation_store_failure() {
        let mut store = MockTestKeyValueStore::new();
        let mut identity = MockTestIdentityProvider::new();

        store.expect_get().times(1).returning(|_| Ok(None));
        store
            .expect_set_if_absent()
            .times(1)
            .returning(|_, _| Err(StoreError::Unavailable("reset".to_string())));
        store.expect_set().times(1).returning(|_, _| Ok(()));

        identity
            .expect_create_account()
            .times(1)
            .returning(|email, _| Ok(handle("u7", email)));
        identity
            .expect_update_display_name()
            .times(1)
            .returning(|account, _| Ok(account.clone()));
        identity
            .expect_send_verification_email()
            .times(1)
            .returning(|_| Ok(()));

        let service = AuthService::new(Arc::new(store), Arc::new(identity));
        let error = service
            .signup(&AuthSession::new(), signup_form("jane"))
            .await
            .unwrap_err();

        assert!(matches!(error, AuthError::UsernameNotReserved { ref account_id, .. } if account_id == "u7"));
        assert!(error.needs_new_username());
    }

    #[tokio::test]
    async fn test_signup_identity_failure_claims_nothing() {
        let mut store = MockTestKeyValueStore::new();
        let mut identity = MockTestIdentityProvider::new();

        store.expect_get().times(1).returning(|_| Ok(None));
        store.expect_set_if_absent().times(0);
        store.expect_set().times(0);
        identity
            .expect_create_account()
            .times(1)
            .returning(|_, _| Err(IdentityError::EmailInUse));

        let service = AuthService::new(Arc::new(store), Arc::new(identity));
        let result = service.signup(&AuthSession::new(), signup_form("jane")).await;

        let error = result.unwrap_err();
        assert_eq!(error, AuthError::Identity(IdentityError::EmailInUse));
        assert_eq!(
            error.user_message(),
            "This email is already registered. Try logging in."
        );
    }

    #[tokio::test]
    async fn test_signup_verification_failure_still_succeeds() {
        let mut store = MockTestKeyValueStore::new();
        let mut identity = MockTestIdentityProvider::new();

        store.expect_get().returning(|_| Ok(None));
        store
            .expect_set_if_absent()
            .returning(|_, _| Ok(SetOutcome::Created));
        store.expect_set().returning(|_, _| Ok(()));
        identity
            .expect_create_account()
            .returning(|email, _| Ok(handle("u8", email)));
        identity
            .expect_update_display_name()
            .returning(|_, _| Err(IdentityError::NetworkError("flaky".to_string())));
        identity
            .expect_send_verification_email()
            .returning(|_| Err(IdentityError::TooManyRequests));

        let service = AuthService::new(Arc::new(store), Arc::new(identity));
        let outcome = service
            .signup(&AuthSession::new(), signup_form("jane"))
            .await
            .expect("account and reservation exist");

        assert!(outcome.follow_up.is_some());
    }

    #[tokio::test]
    async fn test_choose_username_rejected_when_already_assigned() {
        let (_store, _identity, service) = in_memory();
        let session = AuthSession::new();

        service.signup(&session, signup_form("jane")).await.unwrap();
        let result = service.choose_username(&session, "another").await;

        assert_eq!(result, Err(AuthError::UsernameAlreadyAssigned));
    }

    #[tokio::test]
    async fn test_choose_username_completes_account_without_username() {
        let (store, identity, service) = in_memory();
        let session = AuthSession::new();

        let account = identity.create_account("sam@example.com", "secret123").await.unwrap();
        let records = AccountRecords::new(Arc::clone(&store));
        records
            .put(&account.id, &AccountRecord::new("Sam", None))
            .await
            .unwrap();
        session.publish(Some(account.clone()));

        let taken_elsewhere = Username::new("popular").unwrap();
        UsernameDirectory::new(Arc::clone(&store))
            .claim(&taken_elsewhere, &AccountId::new("first-come"))
            .await
            .unwrap();

        let taken = service.choose_username(&session, "popular").await;
        assert_eq!(taken, Err(AuthError::UsernameTaken("popular".to_string())));

        let outcome = service.choose_username(&session, "Sam_2").await.unwrap();
        assert_eq!(outcome.message, "Username @sam_2 is yours!");

        let record = records.get(&account.id).await.unwrap().unwrap();
        assert_eq!(record.username.as_deref(), Some("sam_2"));
        assert_eq!(record.name, "Sam");

        let state = service.state(session.current_user().as_ref()).await;
        assert_eq!(
            state.profile().and_then(|p| p.username.clone()),
            Some("sam_2".to_string())
        );
    }

    #[tokio::test]
    async fn test_choose_username_recovers_own_reservation() {
        let (store, identity, service) = in_memory();
        let session = AuthSession::new();

        let account = identity.create_account("kim@example.com", "secret123").await.unwrap();
        session.publish(Some(account.clone()));
        UsernameDirectory::new(Arc::clone(&store))
            .claim(&Username::new("kim").unwrap(), &account.id)
            .await
            .unwrap();

        let outcome = service.choose_username(&session, "kim").await;
        assert!(outcome.is_ok());

        let record = AccountRecords::new(store).get(&account.id).await.unwrap().unwrap();
        assert_eq!(record.username.as_deref(), Some("kim"));
    }

    #[tokio::test]
    async fn test_choose_username_requires_session() {
        let (_store, _identity, service) = in_memory();
        let result = service.choose_username(&AuthSession::new(), "whoever").await;

        assert_eq!(result, Err(AuthError::NotSignedIn));
    }

    #[tokio::test]
    async fn test_login_success_and_owner_greeting() {
        let (_store, identity, service) = in_memory();
        let service = service.with_owner_emails(vec!["Owner@Example.com".to_string()]);

        identity.create_account("owner@example.com", "secret123").await.unwrap();
        identity.create_account("guest@example.com", "secret123").await.unwrap();

        let session = AuthSession::new();
        let outcome = service
            .login(
                &session,
                LoginForm {
                    email: " owner@example.com ".to_string(),
                    password: "secret123".to_string(),
                },
            )
            .await
            .unwrap();
        assert_eq!(outcome.message, "Login successful!");
        assert_eq!(outcome.follow_up.as_deref(), Some("Welcome back, Owner!"));

        let guest = AuthSession::new();
        let outcome = service
            .login(
                &guest,
                LoginForm {
                    email: "guest@example.com".to_string(),
                    password: "secret123".to_string(),
                },
            )
            .await
            .unwrap();
        assert!(outcome.follow_up.is_none());
        assert!(guest.current_user().is_some());
    }

    #[tokio::test]
    async fn test_login_failures() {
        let mut identity = MockTestIdentityProvider::new();
        identity
            .expect_sign_in()
            .times(1)
            .returning(|_, _| Err(IdentityError::WrongPassword));

        let service = AuthService::new(Arc::new(MockTestKeyValueStore::new()), Arc::new(identity));
        let session = AuthSession::new();

        let missing = service
            .login(&session, LoginForm { email: "a@b.c".to_string(), password: String::new() })
            .await;
        assert_eq!(missing, Err(AuthError::MissingFields));

        let wrong = service
            .login(&session, LoginForm { email: "a@b.c".to_string(), password: "nope".to_string() })
            .await
            .unwrap_err();
        assert_eq!(wrong.user_message(), "Incorrect password");
        assert!(session.current_user().is_none());
    }

    #[tokio::test]
    async fn test_logout_clears_session() {
        let mut identity = MockTestIdentityProvider::new();
        identity.expect_sign_out().times(1).returning(|_| Ok(()));

        let service = AuthService::new(Arc::new(MockTestKeyValueStore::new()), Arc::new(identity));
        let session = AuthSession::new();
        session.publish(Some(handle("u1", "u1@example.com")));

        let outcome = service.logout(&session).await.unwrap();

        assert_eq!(outcome.message, "Logged out successfully");
        assert!(session.current_user().is_none());
    }

    #[tokio::test]
    async fn test_logout_with_expired_credential_signs_out() {
        let mut identity = MockTestIdentityProvider::new();
        identity
            .expect_sign_out()
            .times(1)
            .returning(|_| Err(IdentityError::InvalidCredential));

        let service = AuthService::new(Arc::new(MockTestKeyValueStore::new()), Arc::new(identity));
        let session = AuthSession::new();
        session.publish(Some(handle("u1", "u1@example.com")));

        let outcome = service.logout(&session).await.unwrap();

        assert_eq!(outcome.message, "Logged out successfully");
        assert!(session.current_user().is_none());
    }

    #[tokio::test]
    async fn test_reload_signs_out_rejected_credential() {
        let mut identity = MockTestIdentityProvider::new();
        identity
            .expect_refresh()
            .times(1)
            .returning(|_| Err(IdentityError::InvalidCredential));

        let service = AuthService::new(Arc::new(MockTestKeyValueStore::new()), Arc::new(identity));
        let session = AuthSession::new();
        session.publish(Some(handle("u1", "u1@example.com")));

        assert!(service.reload(&session).await.is_ok());
        assert!(session.current_user().is_none());
        assert_eq!(service.state(session.current_user().as_ref()).await, AuthState::LoggedOut);
    }

    #[tokio::test]
    async fn test_reload_keeps_session_when_provider_unreachable() {
        let mut identity = MockTestIdentityProvider::new();
        identity
            .expect_refresh()
            .times(1)
            .returning(|_| Err(IdentityError::NetworkError("offline".to_string())));

        let service = AuthService::new(Arc::new(MockTestKeyValueStore::new()), Arc::new(identity));
        let session = AuthSession::new();
        session.publish(Some(handle("u1", "u1@example.com")));

        assert!(service.reload(&session).await.is_err());
        assert!(session.current_user().is_some());
    }

    #[tokio::test]
    async fn test_logout_failure_keeps_session() {
        let mut identity = MockTestIdentityProvider::new();
        identity
            .expect_sign_out()
            .times(1)
            .returning(|_| Err(IdentityError::NetworkError("offline".to_string())));

        let service = AuthService::new(Arc::new(MockTestKeyValueStore::new()), Arc::new(identity));
        let session = AuthSession::new();
        session.publish(Some(handle("u1", "u1@example.com")));

        let error = service.logout(&session).await.unwrap_err();

        assert_eq!(error.user_message(), "Error logging out");
        assert!(session.current_user().is_some());
    }

    #[tokio::test]
    async fn test_resend_verification() {
        let mut identity = MockTestIdentityProvider::new();
        identity
            .expect_send_verification_email()
            .times(2)
            .returning({
                let mut calls = 0;
                move |_| {
                    calls += 1;
                    if calls == 1 {
                        Ok(())
                    } else {
                        Err(IdentityError::TooManyRequests)
                    }
                }
            });

        let service = AuthService::new(Arc::new(MockTestKeyValueStore::new()), Arc::new(identity));
        let session = AuthSession::new();

        let signed_out = service.resend_verification(&session).await.unwrap();
        assert_eq!(signed_out.message, "Log in to resend the verification email");

        session.publish(Some(handle("u1", "u1@example.com")));
        let sent = service.resend_verification(&session).await.unwrap();
        assert_eq!(sent.message, "Verification email sent! Check your inbox.");

        let throttled = service.resend_verification(&session).await.unwrap_err();
        assert_eq!(
            throttled.user_message(),
            "Please wait before requesting another email"
        );

        let mut verified = handle("u1", "u1@example.com");
        verified.email_verified = true;
        session.publish(Some(verified));
        assert!(service.resend_verification(&session).await.is_ok());
    }

    #[tokio::test]
    async fn test_reset_password() {
        let (_store, identity, service) = in_memory();
        identity.create_account("lee@example.com", "secret123").await.unwrap();

        assert_eq!(service.reset_password("  ").await, Err(AuthError::MissingEmail));

        let outcome = service.reset_password("lee@example.com").await.unwrap();
        assert_eq!(outcome.message, "Password reset email sent!");

        let unknown = service.reset_password("nobody@example.com").await.unwrap_err();
        assert_eq!(unknown.user_message(), "No account found with this email");
    }

    #[tokio::test]
    async fn test_check_availability() {
        let (store, _identity, service) = in_memory();
        store
            .set("usernames/taken", Value::String("uid".to_string()))
            .await
            .unwrap();

        let available = service.check_availability("Fresh_Name!").await;
        assert_eq!(available.canonical, "fresh_name");
        assert_eq!(available.availability, Availability::Available);

        let taken = service.check_availability("TAKEN").await;
        assert_eq!(taken.availability, Availability::Taken);

        let short = service.check_availability("a!b").await;
        assert_eq!(
            short.availability,
            Availability::Invalid(UsernameError::TooShort { min: 3, actual: 2 })
        );
    }

    #[tokio::test]
    async fn test_check_availability_uncertain_is_not_available() {
        let mut store = MockTestKeyValueStore::new();
        store
            .expect_get()
            .times(1)
            .returning(|_| Err(StoreError::Unavailable("down".to_string())));

        let service = AuthService::new(Arc::new(store), Arc::new(MockTestIdentityProvider::new()));
        let report = service.check_availability("maybe").await;

        assert_eq!(report.availability, Availability::Uncertain);
        assert_ne!(report.availability.message(), Availability::Available.message());
    }

    #[tokio::test]
    async fn test_state_follows_verification() {
        let (_store, identity, service) = in_memory();
        let session = AuthSession::new();

        assert_eq!(service.state(None).await, AuthState::LoggedOut);

        service.signup(&session, signup_form("jane")).await.unwrap();
        let state = service.state(session.current_user().as_ref()).await;
        assert!(matches!(state, AuthState::LoggedInUnverified(ref p) if p.username.as_deref() == Some("jane")));

        let account = session.current_user().unwrap();
        identity.confirm_email(&account.id).await;
        service.reload(&session).await.unwrap();

        let state = service.state(session.current_user().as_ref()).await;
        assert!(matches!(state, AuthState::LoggedInVerified(ref p) if p.display_name.as_deref() == Some("Jane Doe")));
    }
}
