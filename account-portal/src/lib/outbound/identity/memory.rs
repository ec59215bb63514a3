//! In-process identity provider for development and tests.
//!
//! Stands in for the managed identity service. Credentials stay in memory
//! and outgoing emails land in an outbox instead of being delivered. Sign-in throttling mirrors the
//! managed service closely enough for the error messages to be exercised.
//! It is refused when `RUN_MODE=production`; production deployments use
//! the REST provider.

use std::collections::HashMap;

use async_trait::async_trait;
use auth::AuthenticationError;
use auth::Authenticator;
use auth::IdTokenClaims;
use auth::PasswordError;
use auth::PasswordPolicy;
use email_address::EmailAddress;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::account::errors::IdentityError;
use crate::domain::account::models::AccountHandle;
use crate::domain::account::models::AccountId;
use crate::domain::account::ports::IdentityProvider;

const TOKEN_LIFETIME_HOURS: i64 = 1;
const MAX_FAILED_SIGN_INS: u32 = 5;
const ISSUER: &str = "account-portal";

/// Email the provider would have delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundEmail {
    Verification { account_id: AccountId, email: String },
    PasswordReset { email: String },
}

#[derive(Debug, Clone)]
struct StoredAccount {
    id: AccountId,
    email: String,
    password_hash: String,
    display_name: Option<String>,
    email_verified: bool,
    failed_sign_ins: u32,
}

/// Self-contained identity provider with argon2 password hashes and locally
/// signed ID tokens. Emails are collected in an outbox instead of sent.
pub struct InMemoryIdentityProvider {
    authenticator: Authenticator,
    // keyed by lowercased email
    accounts: RwLock<HashMap<String, StoredAccount>>,
    outbox: RwLock<Vec<OutboundEmail>>,
}

impl InMemoryIdentityProvider {
    pub fn new(token_secret: &[u8]) -> Self {
        Self {
            authenticator: Authenticator::new(token_secret),
            accounts: RwLock::new(HashMap::new()),
            outbox: RwLock::new(Vec::new()),
        }
    }

    pub fn with_password_policy(mut self, policy: PasswordPolicy) -> Self {
        self.authenticator = self.authenticator.with_password_policy(policy);
        self
    }

    /// Mark the account's address as verified, as following the emailed
    /// link would.
    pub async fn confirm_email(&self, id: &AccountId) -> bool {
        let mut accounts = self.accounts.write().await;
        match accounts.values_mut().find(|account| account.id == *id) {
            Some(account) => {
                account.email_verified = true;
                true
            }
            None => false,
        }
    }

    pub async fn outbox(&self) -> Vec<OutboundEmail> {
        self.outbox.read().await.clone()
    }

    fn handle_for(&self, account: &StoredAccount) -> Result<AccountHandle, IdentityError> {
        let id_token = self
            .authenticator
            .issue_token(&claims_for(account))
            .map_err(|e| IdentityError::Unknown(e.to_string()))?;

        Ok(to_handle(account, id_token))
    }

    /// Resolve the stored account behind a handle, checking its token.
    async fn stored(&self, handle: &AccountHandle) -> Result<StoredAccount, IdentityError> {
        let claims = self
            .authenticator
            .validate_token(&handle.id_token)
            .map_err(|e| {
                tracing::warn!(account_id = %handle.id, error = %e, "Rejected ID token");
                IdentityError::InvalidCredential
            })?;
        if claims.sub != handle.id.as_str() {
            return Err(IdentityError::InvalidCredential);
        }

        self.accounts
            .read()
            .await
            .values()
            .find(|account| account.id == handle.id)
            .cloned()
            .ok_or(IdentityError::UserNotFound)
    }
}

fn claims_for(account: &StoredAccount) -> IdTokenClaims {
    let claims = IdTokenClaims::for_account(
        &account.id,
        &account.email,
        account.email_verified,
        TOKEN_LIFETIME_HOURS,
    )
    .with_issuer(ISSUER);

    match &account.display_name {
        Some(name) => claims.with_name(name),
        None => claims,
    }
}

fn to_handle(account: &StoredAccount, id_token: String) -> AccountHandle {
    AccountHandle {
        id: account.id.clone(),
        email: account.email.clone(),
        display_name: account.display_name.clone(),
        email_verified: account.email_verified,
        id_token,
    }
}

fn normalize_email(email: &str) -> Result<String, IdentityError> {
    let email = email.trim();
    if !EmailAddress::is_valid(email) {
        return Err(IdentityError::InvalidEmail);
    }
    Ok(email.to_lowercase())
}

#[async_trait]
impl IdentityProvider for InMemoryIdentityProvider {
    async fn create_account(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AccountHandle, IdentityError> {
        let key = normalize_email(email)?;
        let password_hash = self
            .authenticator
            .hash_password(password)
            .map_err(|e| match e {
                PasswordError::TooWeak { .. } => IdentityError::WeakPassword,
                other => IdentityError::Unknown(other.to_string()),
            })?;

        let mut accounts = self.accounts.write().await;
        if accounts.contains_key(&key) {
            return Err(IdentityError::EmailInUse);
        }

        let account = StoredAccount {
            id: AccountId::new(Uuid::new_v4().simple().to_string()),
            email: email.trim().to_string(),
            password_hash,
            display_name: None,
            email_verified: false,
            failed_sign_ins: 0,
        };
        let handle = self.handle_for(&account)?;
        accounts.insert(key, account);

        Ok(handle)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AccountHandle, IdentityError> {
        let key = normalize_email(email)?;

        let mut accounts = self.accounts.write().await;
        let account = accounts.get_mut(&key).ok_or(IdentityError::UserNotFound)?;
        if account.failed_sign_ins >= MAX_FAILED_SIGN_INS {
            return Err(IdentityError::TooManyRequests);
        }

        match self
            .authenticator
            .authenticate(password, &account.password_hash, &claims_for(account))
        {
            Ok(id_token) => {
                account.failed_sign_ins = 0;
                Ok(to_handle(account, id_token))
            }
            Err(AuthenticationError::InvalidCredentials) => {
                account.failed_sign_ins += 1;
                Err(IdentityError::WrongPassword)
            }
            Err(e) => Err(IdentityError::Unknown(e.to_string())),
        }
    }

    async fn update_display_name(
        &self,
        account: &AccountHandle,
        display_name: &str,
    ) -> Result<AccountHandle, IdentityError> {
        let stored = self.stored(account).await?;

        let mut accounts = self.accounts.write().await;
        let entry = accounts
            .get_mut(&stored.email.to_lowercase())
            .ok_or(IdentityError::UserNotFound)?;
        entry.display_name = Some(display_name.to_string());

        self.handle_for(entry)
    }

    async fn send_verification_email(&self, account: &AccountHandle) -> Result<(), IdentityError> {
        let stored = self.stored(account).await?;

        self.outbox.write().await.push(OutboundEmail::Verification {
            account_id: stored.id,
            email: stored.email,
        });
        Ok(())
    }

    async fn send_password_reset(&self, email: &str) -> Result<(), IdentityError> {
        let key = normalize_email(email)?;
        let stored_email = self
            .accounts
            .read()
            .await
            .get(&key)
            .map(|account| account.email.clone())
            .ok_or(IdentityError::UserNotFound)?;

        self.outbox
            .write()
            .await
            .push(OutboundEmail::PasswordReset {
                email: stored_email,
            });
        Ok(())
    }

    async fn refresh(&self, account: &AccountHandle) -> Result<AccountHandle, IdentityError> {
        let stored = self.stored(account).await?;
        self.handle_for(&stored)
    }

    async fn sign_out(&self, account: &AccountHandle) -> Result<(), IdentityError> {
        // tokens are self-contained; nothing to revoke beyond checking it is ours
        self.stored(account).await.map(|_| ())
    }

    async fn probe(&self) -> Result<(), IdentityError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"test-secret-key-at-least-32-bytes!!";

    #[tokio::test]
    async fn test_create_then_sign_in() {
        let provider = InMemoryIdentityProvider::new(SECRET);

        let created = provider
            .create_account("Jane@Example.com", "secret123")
            .await
            .unwrap();
        assert!(!created.email_verified);

        let signed_in = provider
            .sign_in("jane@example.com", "secret123")
            .await
            .unwrap();
        assert_eq!(signed_in.id, created.id);
        assert_eq!(signed_in.email, "Jane@Example.com");
    }

    #[tokio::test]
    async fn test_create_account_errors() {
        let provider = InMemoryIdentityProvider::new(SECRET);
        provider.create_account("a@example.com", "secret123").await.unwrap();

        assert_eq!(
            provider.create_account("A@example.com", "secret123").await,
            Err(IdentityError::EmailInUse)
        );
        assert_eq!(
            provider.create_account("not-an-email", "secret123").await,
            Err(IdentityError::InvalidEmail)
        );
        assert_eq!(
            provider.create_account("b@example.com", "123").await,
            Err(IdentityError::WeakPassword)
        );
    }

    #[tokio::test]
    async fn test_sign_in_errors_and_throttling() {
        let provider = InMemoryIdentityProvider::new(SECRET);
        provider.create_account("a@example.com", "secret123").await.unwrap();

        assert_eq!(
            provider.sign_in("nobody@example.com", "secret123").await,
            Err(IdentityError::UserNotFound)
        );

        for _ in 0..MAX_FAILED_SIGN_INS {
            assert_eq!(
                provider.sign_in("a@example.com", "wrong-password").await,
                Err(IdentityError::WrongPassword)
            );
        }
        assert_eq!(
            provider.sign_in("a@example.com", "secret123").await,
            Err(IdentityError::TooManyRequests)
        );
    }

    #[tokio::test]
    async fn test_profile_and_verification_flow() {
        let provider = InMemoryIdentityProvider::new(SECRET);
        let account = provider.create_account("a@example.com", "secret123").await.unwrap();

        let named = provider.update_display_name(&account, "Ada").await.unwrap();
        assert_eq!(named.display_name.as_deref(), Some("Ada"));

        provider.send_verification_email(&named).await.unwrap();
        assert_eq!(
            provider.outbox().await,
            vec![OutboundEmail::Verification {
                account_id: account.id.clone(),
                email: "a@example.com".to_string(),
            }]
        );

        assert!(provider.confirm_email(&account.id).await);
        let refreshed = provider.refresh(&named).await.unwrap();
        assert!(refreshed.email_verified);
        assert_eq!(refreshed.display_name.as_deref(), Some("Ada"));
    }

    #[tokio::test]
    async fn test_forged_handle_is_rejected() {
        let provider = InMemoryIdentityProvider::new(SECRET);
        let mut account = provider.create_account("a@example.com", "secret123").await.unwrap();
        account.id_token = "forged".to_string();

        assert_eq!(
            provider.refresh(&account).await,
            Err(IdentityError::InvalidCredential)
        );
    }

    #[tokio::test]
    async fn test_password_reset() {
        let provider = InMemoryIdentityProvider::new(SECRET);
        provider.create_account("a@example.com", "secret123").await.unwrap();

        provider.send_password_reset("A@example.com").await.unwrap();
        assert_eq!(
            provider.send_password_reset("b@example.com").await,
            Err(IdentityError::UserNotFound)
        );
        assert_eq!(
            provider.outbox().await,
            vec![OutboundEmail::PasswordReset {
                email: "a@example.com".to_string()
            }]
        );
    }
}
