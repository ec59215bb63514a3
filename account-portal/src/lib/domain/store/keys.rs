//! Key layout shared by every store backend.
//!
//! `usernames/<username>` holds the owning account id as a JSON string.
//! `users/<account id>` holds the account record.

use crate::domain::account::models::AccountId;
use crate::domain::username::models::Username;

pub const USERNAMES: &str = "usernames";
pub const USERS: &str = "users";

pub fn username_key(username: &Username) -> String {
    format!("{}/{}", USERNAMES, username.as_str())
}

/// Key for a raw candidate that has not been validated.
pub fn raw_username_key(candidate: &str) -> String {
    format!("{}/{}", USERNAMES, candidate)
}

pub fn account_key(id: &AccountId) -> String {
    format!("{}/{}", USERS, id.as_str())
}
