//! Embedded SQL storage used by the Droplink services.
//!
//! Services only see the [`SQLStore`] trait; [`SqliteStore`] is the one
//! implementation, backed by bundled SQLite.

pub mod error;
pub mod sqlite;
pub mod traits;

pub use error::SQLError;
pub use sqlite::SqliteStore;
pub use traits::{Row, SQLStore, Value};
