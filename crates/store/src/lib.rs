//! Thread store implementations for Blinker.

pub mod in_memory;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use in_memory::InMemoryThreadStore;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteThreadStore;
