mod credentials;
mod schema;
mod sqlite;

pub use sqlite::SqliteBackend;
