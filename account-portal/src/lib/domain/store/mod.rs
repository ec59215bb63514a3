pub mod errors;
pub mod keys;
pub mod ports;

pub use errors::StoreError;
pub use ports::KeyValueStore;
pub use ports::SetOutcome;
