use std::fmt;

use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

/// Opaque account identifier assigned by the identity provider
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Signed-in account as reported by the identity provider.
#[derive(Clone, PartialEq, Eq)]
pub struct AccountHandle {
    pub id: AccountId,
    pub email: String,
    pub display_name: Option<String>,
    pub email_verified: bool,
    /// Provider-issued ID token proving the sign-in
    pub id_token: String,
}

impl fmt::Debug for AccountHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountHandle")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("display_name", &self.display_name)
            .field("email_verified", &self.email_verified)
            .finish_non_exhaustive()
    }
}

/// Account record stored at `users/<account id>`.
///
/// `username` is null until a username has been claimed for the account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountRecord {
    pub username: Option<String>,
    pub name: String,
    /// Milliseconds since the Unix epoch
    pub created_at: i64,
}

impl AccountRecord {
    pub fn new(name: impl Into<String>, username: Option<String>) -> Self {
        Self {
            username,
            name: name.into(),
            created_at: Utc::now().timestamp_millis(),
        }
    }
}
