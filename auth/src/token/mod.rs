pub mod claims;
pub mod errors;
pub mod handler;

pub use claims::IdTokenClaims;
pub use errors::JwtError;
pub use handler::JwtHandler;
