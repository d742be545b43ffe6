//! Small key-value storage for short-lived client grants.
//!
//! Keys are namespaced with `/` (for example `ads/<session>`).

pub mod error;
pub mod memory;
pub mod redb;
pub mod traits;

pub use error::KVError;
pub use memory::MemoryStore;
pub use redb::RedbStore;
pub use traits::KVStore;
