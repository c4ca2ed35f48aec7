pub mod config_io;
pub mod template_io;
