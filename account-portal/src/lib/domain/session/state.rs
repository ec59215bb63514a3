use serde::Serialize;

use crate::domain::account::models::AccountId;

/// What the page knows about the signed-in account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub account_id: AccountId,
    pub display_name: Option<String>,
    /// None until a username has been reserved for the account
    pub username: Option<String>,
    pub is_owner: bool,
}

/// Authentication state of one client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    LoggedOut,
    LoggedInUnverified(Profile),
    LoggedInVerified(Profile),
}

impl AuthState {
    pub fn profile(&self) -> Option<&Profile> {
        match self {
            AuthState::LoggedOut => None,
            AuthState::LoggedInUnverified(profile) | AuthState::LoggedInVerified(profile) => {
                Some(profile)
            }
        }
    }
}

/// Everything the page toggles, as data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthView {
    pub show_auth_forms: bool,
    pub show_user_info: bool,
    pub display_name: Option<String>,
    pub username_label: Option<String>,
    pub verified_badge: bool,
    pub unverified_badge: bool,
    pub verification_notice: bool,
    pub owner_badge: bool,
    /// The account has no reserved username and should be asked for one
    pub needs_username: bool,
}

const DEFAULT_GREETING: &str = "Welcome!";

/// Map a state to the view the page applies.
pub fn render(state: &AuthState) -> AuthView {
    let Some(profile) = state.profile() else {
        return AuthView {
            show_auth_forms: true,
            show_user_info: false,
            display_name: None,
            username_label: None,
            verified_badge: false,
            unverified_badge: false,
            verification_notice: false,
            owner_badge: false,
            needs_username: false,
        };
    };

    let verified = matches!(state, AuthState::LoggedInVerified(_));
    let display_name = profile
        .display_name
        .as_deref()
        .filter(|name| !name.is_empty())
        .unwrap_or(DEFAULT_GREETING);

    AuthView {
        show_auth_forms: false,
        show_user_info: true,
        display_name: Some(display_name.to_string()),
        username_label: profile.username.as_ref().map(|name| format!("@{}", name)),
        verified_badge: verified,
        unverified_badge: !verified,
        verification_notice: !verified,
        owner_badge: profile.is_owner,
        needs_username: profile.username.is_none(),
    }
}
