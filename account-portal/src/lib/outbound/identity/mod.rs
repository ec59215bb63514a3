pub mod memory;
pub mod rest;

pub use memory::InMemoryIdentityProvider;
pub use memory::OutboundEmail;
pub use rest::RestIdentityProvider;
