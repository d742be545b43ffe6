mod analytics;
mod forum;
mod link;
mod profile;
mod session;
mod tip;

pub use analytics::*;
pub use forum::*;
pub use link::*;
pub use profile::*;
pub use session::*;
pub use tip::*;
