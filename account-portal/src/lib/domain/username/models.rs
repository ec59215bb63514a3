use std::fmt;

use serde::Serialize;

use super::errors::UsernameError;

/// Canonical username.
///
/// Lowercase, at least three characters, drawn only from `[a-z0-9_]`.
/// Two usernames are the same handle iff their strings are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Username(String);

impl Username {
    pub const MIN_LENGTH: usize = 3;

    /// Validate a submitted candidate.
    ///
    /// The candidate is trimmed and lowercased first, like a form submission.
    /// It is not stripped: characters outside the allowed set are reported
    /// rather than silently dropped.
    ///
    /// # Errors
    /// * `TooShort` - Fewer than 3 characters survive canonicalization
    /// * `InvalidCharacters` - Contains characters other than `[a-z0-9_]`
    pub fn new(candidate: &str) -> Result<Self, UsernameError> {
        let normalized = candidate.trim().to_lowercase();
        let canonical = canonicalize(&normalized);

        let length = canonical.chars().count();
        if length < Self::MIN_LENGTH {
            return Err(UsernameError::TooShort {
                min: Self::MIN_LENGTH,
                actual: length,
            });
        }

        if canonical != normalized {
            return Err(UsernameError::InvalidCharacters);
        }

        Ok(Self(canonical))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Lowercase `raw` and drop every character outside `[a-z0-9_]`.
///
/// Total: any input yields a (possibly empty) canonical string.
pub fn canonicalize(raw: &str) -> String {
    raw.chars()
        .flat_map(char::to_lowercase)
        .filter(|c| is_allowed(*c))
        .collect()
}

fn is_allowed(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_'
}

/// Validate a candidate (see [`Username::new`]).
pub fn validate(candidate: &str) -> Result<Username, UsernameError> {
    Username::new(candidate)
}
