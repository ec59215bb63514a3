pub mod directory;
pub mod errors;
pub mod models;

pub use directory::UsernameDirectory;
pub use errors::ClaimError;
pub use errors::UsernameError;
pub use models::canonicalize;
pub use models::Username;
