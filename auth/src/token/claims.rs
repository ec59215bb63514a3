use chrono::Duration;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

/// Claims carried by an account's ID token.
///
/// Field names follow the ID tokens issued by managed identity services, so
/// the same type reads tokens minted locally and tokens handed back by a
/// remote provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IdTokenClaims {
    /// Account identifier
    pub sub: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(default)]
    pub email_verified: bool,

    /// Display name, when the account has one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,

    /// Issued at (Unix timestamp)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,

    /// Expiration time (Unix timestamp)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}

impl IdTokenClaims {
    /// Claims for a freshly authenticated account, valid for `lifetime_hours`.
    pub fn for_account(
        account_id: impl ToString,
        email: impl ToString,
        email_verified: bool,
        lifetime_hours: i64,
    ) -> Self {
        let now = Utc::now();

        Self {
            sub: account_id.to_string(),
            email: Some(email.to_string()),
            email_verified,
            name: None,
            iss: None,
            iat: Some(now.timestamp()),
            exp: Some((now + Duration::hours(lifetime_hours)).timestamp()),
        }
    }

    pub fn with_name(mut self, name: impl ToString) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn with_issuer(mut self, iss: impl ToString) -> Self {
        self.iss = Some(iss.to_string());
        self
    }

    /// A token without `exp` never expires.
    pub fn is_expired(&self, current_timestamp: i64) -> bool {
        self.exp.is_some_and(|exp| exp < current_timestamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_account() {
        let claims = IdTokenClaims::for_account("uid-7", "jane@example.com", true, 1);

        assert_eq!(claims.sub, "uid-7");
        assert_eq!(claims.email.as_deref(), Some("jane@example.com"));
        assert!(claims.email_verified);

        let lifetime = claims.exp.unwrap() - claims.iat.unwrap();
        assert_eq!(lifetime, 60 * 60);
    }

    #[test]
    fn test_reads_provider_shaped_payload() {
        let payload = serde_json::json!({
            "sub": "abc123",
            "email": "bob@example.com",
            "email_verified": false,
            "aud": "my-project",
            "user_id": "abc123",
            "exp": 2000000000
        });

        let claims: IdTokenClaims = serde_json::from_value(payload).unwrap();
        assert_eq!(claims.sub, "abc123");
        assert!(!claims.email_verified);
        assert!(claims.name.is_none());
    }

    #[test]
    fn test_missing_verification_flag_means_unverified() {
        let claims: IdTokenClaims = serde_json::from_value(serde_json::json!({ "sub": "x" })).unwrap();
        assert!(!claims.email_verified);
    }

    #[test]
    fn test_is_expired() {
        let mut claims = IdTokenClaims::for_account("u", "u@example.com", false, 1);
        claims.exp = Some(1000);

        assert!(!claims.is_expired(1000));
        assert!(claims.is_expired(1001));

        claims.exp = None;
        assert!(!claims.is_expired(i64::MAX));
    }
}
