//! Credential primitives shared by the account portal.
//!
//! Provides the pieces an identity provider needs to stand behind an
//! email/password account:
//! - Password hashing (Argon2id) and a minimum-strength policy
//! - ID token issuing and decoding (JWT, HS256)
//! - Credential verification that ties the two together
//!
//! The portal talks to a managed identity service in production. These
//! primitives back its in-process stand-in and let the portal read the
//! claims carried by the tokens a remote provider hands back.
//!
//! # Examples
//!
//! ## Password Hashing
//! ```
//! use auth::PasswordHasher;
//!
//! let hasher = PasswordHasher::new();
//! let hash = hasher.hash("hunter22").unwrap();
//! assert!(hasher.verify("hunter22", &hash).unwrap());
//! ```
//!
//! ## Password Policy
//! ```
//! use auth::PasswordPolicy;
//!
//! let policy = PasswordPolicy::new(6);
//! assert!(policy.check("abc").is_err());
//! assert!(policy.check("abcdef").is_ok());
//! ```
//!
//! ## Signing In
//! ```
//! use auth::{Authenticator, IdTokenClaims};
//!
//! let authenticator = Authenticator::new(b"secret_key_at_least_32_bytes_long!");
//! let hash = authenticator.hash_password("password123").unwrap();
//!
//! let claims = IdTokenClaims::for_account("uid-1", "jane@example.com", false, 1);
//! let token = authenticator.authenticate("password123", &hash, &claims).unwrap();
//!
//! let decoded: IdTokenClaims = authenticator.validate_token(&token).unwrap();
//! assert_eq!(decoded.sub, "uid-1");
//! ```

pub mod authenticator;
pub mod password;
pub mod token;

pub use authenticator::AuthenticationError;
pub use authenticator::Authenticator;
pub use password::PasswordError;
pub use password::PasswordHasher;
pub use password::PasswordPolicy;
pub use token::IdTokenClaims;
pub use token::JwtError;
pub use token::JwtHandler;
