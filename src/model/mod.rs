pub mod config;
pub mod format;
pub mod metadata;
pub mod task;

pub use config::*;
pub use format::*;
pub use metadata::*;
pub use task::*;
