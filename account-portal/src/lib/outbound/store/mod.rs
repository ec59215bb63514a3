pub mod memory;
pub mod postgres;
pub mod realtime;

pub use memory::InMemoryKeyValueStore;
pub use postgres::PostgresKeyValueStore;
pub use realtime::RealtimeKeyValueStore;
