pub mod clock;
pub mod config;
pub mod error;
pub mod module;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::ServiceConfig;
pub use error::ServiceError;
pub use module::Module;
pub use types::{ListParams, ListResult, format_timestamp, merge_patch, new_id, now_rfc3339};
