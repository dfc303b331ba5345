pub mod batch;
pub mod config;
pub mod locate;
pub mod report;

// Re-export vision types for convenience
pub use facefit_vision::{FaceDetector, FaceHint, LocalizationResult, Localizer, Rect};
pub use report::LocalizationReport;
