pub mod file_name;
pub mod session;
pub mod synthesize;

pub use session::{CaptureEvent, CaptureSession, Provenance};
pub use synthesize::{CaptureEngine, DocumentOutput};
