pub mod account;
pub mod session;
pub mod store;
pub mod username;
