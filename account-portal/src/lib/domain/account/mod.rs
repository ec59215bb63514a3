pub mod errors;
pub mod models;
pub mod ports;
pub mod records;

pub use errors::IdentityError;
pub use models::AccountHandle;
pub use models::AccountId;
pub use models::AccountRecord;
pub use ports::IdentityProvider;
pub use records::AccountRecords;
