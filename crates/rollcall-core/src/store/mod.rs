//! Built-in store implementations.

mod sqlite;

pub use sqlite::SqliteStore;
