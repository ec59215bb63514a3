use super::errors::PasswordError;

/// Minimum-strength rule applied before a password ever leaves the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordPolicy {
    min_length: usize,
}

impl PasswordPolicy {
    /// Length the managed identity service enforces for email/password accounts.
    pub const DEFAULT_MIN_LENGTH: usize = 6;

    pub fn new(min_length: usize) -> Self {
        Self { min_length }
    }

    pub fn min_length(&self) -> usize {
        self.min_length
    }

    /// Reject passwords shorter than the configured minimum.
    ///
    /// Length is counted in characters, not bytes.
    ///
    /// # Errors
    /// * `TooWeak` - Password is shorter than `min_length`
    pub fn check(&self, password: &str) -> Result<(), PasswordError> {
        let actual = password.chars().count();
        if actual < self.min_length {
            return Err(PasswordError::TooWeak {
                min: self.min_length,
                actual,
            });
        }
        Ok(())
    }
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MIN_LENGTH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_requires_six_characters() {
        let policy = PasswordPolicy::default();

        assert_eq!(
            policy.check("12345"),
            Err(PasswordError::TooWeak { min: 6, actual: 5 })
        );
        assert!(policy.check("123456").is_ok());
    }

    #[test]
    fn test_counts_characters_not_bytes() {
        let policy = PasswordPolicy::new(3);

        // three characters, six bytes
        assert!(policy.check("äöü").is_ok());
    }

    #[test]
    fn test_empty_password() {
        let policy = PasswordPolicy::new(1);
        assert!(policy.check("").is_err());
    }
}
