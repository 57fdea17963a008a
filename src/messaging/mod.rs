pub mod upload;

pub use upload::{UploadNotifier, UploadPlan};
