use crate::domain::username::UsernameError;

/// Raw signup form fields, exactly as submitted
#[derive(Debug, Clone, Default)]
pub struct SignupForm {
    pub name: String,
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Raw login form fields, exactly as submitted
#[derive(Debug, Clone, Default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Successful form submission: the message to show, plus an optional
/// second notice (e.g. the owner greeting after login).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormOutcome {
    pub message: String,
    pub follow_up: Option<String>,
}

impl FormOutcome {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            follow_up: None,
        }
    }

    pub fn with_follow_up(mut self, follow_up: impl Into<String>) -> Self {
        self.follow_up = Some(follow_up.into());
        self
    }
}

/// Live availability of a username candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Availability {
    Available,
    Taken,
    Invalid(UsernameError),
    /// The store could not answer. Not the same as available.
    Uncertain,
}

impl Availability {
    pub fn status(&self) -> &'static str {
        match self {
            Availability::Available => "available",
            Availability::Taken => "taken",
            Availability::Invalid(_) => "invalid",
            Availability::Uncertain => "uncertain",
        }
    }

    pub fn message(&self) -> String {
        match self {
            Availability::Available => "✓ Username available".to_string(),
            Availability::Taken => "❌ Username already taken".to_string(),
            Availability::Invalid(e) => e.user_message(),
            Availability::Uncertain => {
                "Couldn't check availability right now. Try again in a moment.".to_string()
            }
        }
    }
}

/// Availability answer for the live feedback while typing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailabilityReport {
    /// The candidate as it will be stored
    pub canonical: String,
    pub availability: Availability,
}
