use std::time::Duration;

use async_trait::async_trait;
use auth::IdTokenClaims;
use auth::JwtHandler;
use serde::de::DeserializeOwned;
use serde::de::IgnoredAny;
use serde::Deserialize;
use serde::Serialize;

use crate::domain::account::errors::IdentityError;
use crate::domain::account::models::AccountHandle;
use crate::domain::account::models::AccountId;
use crate::domain::account::ports::IdentityProvider;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for a managed identity service's `accounts:*` REST API.
///
/// Signing out is local to the caller: the service keeps no session that
/// could be ended, so `sign_out` only forgets the handle.
pub struct RestIdentityProvider {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    // reads claims from tokens this process cannot verify
    tokens: JwtHandler,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PasswordResponse {
    local_id: String,
    email: String,
    id_token: String,
    #[serde(default)]
    display_name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateProfileRequest<'a> {
    id_token: &'a str,
    display_name: &'a str,
    return_secure_token: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateProfileResponse {
    #[serde(default)]
    id_token: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct OobCodeRequest<'a> {
    request_type: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    id_token: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<&'a str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LookupRequest<'a> {
    id_token: &'a str,
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<LookupUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupUser {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    email_verified: bool,
    #[serde(default)]
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

impl RestIdentityProvider {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self::with_client(client, endpoint, api_key))
    }

    pub fn with_client(
        client: reqwest::Client,
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            tokens: JwtHandler::new(&[]),
        }
    }

    async fn call<B, R>(&self, method: &str, body: &B) -> Result<R, IdentityError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let response = self
            .client
            .post(format!("{}/accounts:{}", self.endpoint, method))
            .query(&[("key", self.api_key.as_str())])
            .json(body)
            .send()
            .await
            .map_err(|e| IdentityError::NetworkError(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return response
                .json::<R>()
                .await
                .map_err(|e| IdentityError::Unknown(e.to_string()));
        }

        match response.json::<ErrorEnvelope>().await {
            Ok(envelope) => {
                tracing::debug!(method, status = status.as_u16(), code = %envelope.error.message, "Identity request refused");
                Err(map_error_code(&envelope.error.message))
            }
            Err(_) => Err(IdentityError::Unknown(format!("{} from accounts:{}", status, method))),
        }
    }

    fn email_verified(&self, id_token: &str) -> bool {
        match self.tokens.decode_unverified::<IdTokenClaims>(id_token) {
            Ok(claims) => claims.email_verified,
            Err(e) => {
                tracing::debug!(error = %e, "Unreadable ID token, assuming unverified");
                false
            }
        }
    }

    fn handle_from(&self, response: PasswordResponse) -> AccountHandle {
        AccountHandle {
            email_verified: self.email_verified(&response.id_token),
            id: AccountId::new(response.local_id),
            email: response.email,
            display_name: response.display_name.filter(|name| !name.is_empty()),
            id_token: response.id_token,
        }
    }
}

/// Map a service error message such as `WEAK_PASSWORD : Password should
/// be at least 6 characters` to its domain error.
fn map_error_code(message: &str) -> IdentityError {
    let code = message.split(" : ").next().unwrap_or(message).trim();

    match code {
        "EMAIL_EXISTS" => IdentityError::EmailInUse,
        "INVALID_EMAIL" | "MISSING_EMAIL" => IdentityError::InvalidEmail,
        "WEAK_PASSWORD" => IdentityError::WeakPassword,
        "EMAIL_NOT_FOUND" | "USER_NOT_FOUND" => IdentityError::UserNotFound,
        "INVALID_PASSWORD" => IdentityError::WrongPassword,
        "INVALID_LOGIN_CREDENTIALS" | "INVALID_ID_TOKEN" | "TOKEN_EXPIRED" | "USER_DISABLED" => {
            IdentityError::InvalidCredential
        }
        "TOO_MANY_ATTEMPTS_TRY_LATER" => IdentityError::TooManyRequests,
        other => IdentityError::Unknown(other.to_string()),
    }
}

#[async_trait]
impl IdentityProvider for RestIdentityProvider {
    async fn create_account(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AccountHandle, IdentityError> {
        let response: PasswordResponse = self
            .call(
                "signUp",
                &PasswordRequest {
                    email,
                    password,
                    return_secure_token: true,
                },
            )
            .await?;

        Ok(self.handle_from(response))
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AccountHandle, IdentityError> {
        let response: PasswordResponse = self
            .call(
                "signInWithPassword",
                &PasswordRequest {
                    email,
                    password,
                    return_secure_token: true,
                },
            )
            .await?;

        Ok(self.handle_from(response))
    }

    async fn update_display_name(
        &self,
        account: &AccountHandle,
        display_name: &str,
    ) -> Result<AccountHandle, IdentityError> {
        let response: UpdateProfileResponse = self
            .call(
                "update",
                &UpdateProfileRequest {
                    id_token: &account.id_token,
                    display_name,
                    return_secure_token: true,
                },
            )
            .await?;

        let mut updated = account.clone();
        updated.display_name = response
            .display_name
            .or_else(|| Some(display_name.to_string()));
        if let Some(id_token) = response.id_token {
            updated.id_token = id_token;
        }
        Ok(updated)
    }

    async fn send_verification_email(&self, account: &AccountHandle) -> Result<(), IdentityError> {
        let _: IgnoredAny = self
            .call(
                "sendOobCode",
                &OobCodeRequest {
                    request_type: "VERIFY_EMAIL",
                    id_token: Some(&account.id_token),
                    email: None,
                },
            )
            .await?;
        Ok(())
    }

    async fn send_password_reset(&self, email: &str) -> Result<(), IdentityError> {
        let _: IgnoredAny = self
            .call(
                "sendOobCode",
                &OobCodeRequest {
                    request_type: "PASSWORD_RESET",
                    id_token: None,
                    email: Some(email),
                },
            )
            .await?;
        Ok(())
    }

    async fn refresh(&self, account: &AccountHandle) -> Result<AccountHandle, IdentityError> {
        let response: LookupResponse = self
            .call(
                "lookup",
                &LookupRequest {
                    id_token: &account.id_token,
                },
            )
            .await?;

        let user = response
            .users
            .into_iter()
            .find(|user| user.local_id == account.id.as_str())
            .ok_or(IdentityError::UserNotFound)?;

        Ok(AccountHandle {
            id: account.id.clone(),
            email: user.email.unwrap_or_else(|| account.email.clone()),
            display_name: user.display_name.or_else(|| account.display_name.clone()),
            email_verified: user.email_verified,
            id_token: account.id_token.clone(),
        })
    }

    async fn sign_out(&self, account: &AccountHandle) -> Result<(), IdentityError> {
        tracing::debug!(account_id = %account.id, "Dropping provider session");
        Ok(())
    }

    async fn probe(&self) -> Result<(), IdentityError> {
        // any answer, even a refusal of the empty token, means the service is up
        match self
            .call::<_, IgnoredAny>("lookup", &LookupRequest { id_token: "" })
            .await
        {
            Err(IdentityError::NetworkError(e)) => Err(IdentityError::NetworkError(e)),
            _ => Ok(()),
        }
    }
}
