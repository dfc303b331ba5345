//! Adaptive single-face localization.
//!
//! A raw detector run gives noisy, scale-dependent candidates. [`Localizer`]
//! stabilizes them with three searches driven by repeated detector calls:
//! shrink-to-fit, a center scan and a size scan.

pub mod center;
pub mod detector;
pub mod error;
pub mod framing;
pub mod geometry;
pub mod localize;
pub mod scan;
pub mod shrink;
pub mod size;
pub mod validity;

#[cfg(feature = "yunet")]
pub mod model;
#[cfg(feature = "yunet")]
pub mod yunet;

// Re-export commonly used types
pub use detector::{CropDetector, FaceDetector, RegionDetector};
pub use error::LocalizeError;
pub use framing::{FaceHint, FramingParams};
pub use geometry::{Point, Rect};
pub use localize::{LocalizationResult, Localizer, SearchParams};
pub use validity::MinSize;
#[cfg(feature = "yunet")]
pub use yunet::YuNetDetector;
