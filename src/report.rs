//! Serializable per-image results.

use anyhow::Result;
use facefit_vision::{FaceHint, LocalizationResult, Rect};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RectRecord {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl From<Rect> for RectRecord {
    fn from(r: Rect) -> Self {
        Self {
            x: r.x,
            y: r.y,
            width: r.width,
            height: r.height,
        }
    }
}

impl From<RectRecord> for Rect {
    fn from(r: RectRecord) -> Self {
        Rect::new(r.x, r.y, r.width, r.height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HintRecord {
    pub center_x: i32,
    pub center_y: i32,
    pub radius: i32,
}

impl From<FaceHint> for HintRecord {
    fn from(h: FaceHint) -> Self {
        Self {
            center_x: h.center.x,
            center_y: h.center.y,
            radius: h.radius,
        }
    }
}

/// Outcome for one image. Rectangles are in the pixels of the image file,
/// not of the downscaled copy the search ran on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalizationReport {
    pub image: String,
    pub width: u32,
    pub height: u32,
    /// Downscale applied before searching.
    pub scale: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<HintRecord>,
    pub fitted_frame: Option<RectRecord>,
    pub position_frame: Option<RectRecord>,
    pub position_face: Option<RectRecord>,
    pub final_face: Option<RectRecord>,
    pub size_stable: bool,
    pub probes: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl LocalizationReport {
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            width: 0,
            height: 0,
            scale: 1.0,
            hint: None,
            fitted_frame: None,
            position_frame: None,
            position_face: None,
            final_face: None,
            size_stable: false,
            probes: 0,
            error: None,
        }
    }

    /// A report for an image that could not be processed.
    pub fn failed(image: impl Into<String>, err: &anyhow::Error) -> Self {
        Self {
            error: Some(format!("{:#}", err)),
            ..Self::new(image)
        }
    }

    /// Record `result`, found on a copy of the image scaled by `scale`.
    pub fn with_result(mut self, result: &LocalizationResult, scale: f64) -> Self {
        let map = |r: Option<Rect>| r.map(|r| RectRecord::from(unscale(&r, scale)));
        self.scale = scale;
        self.fitted_frame = map(result.fitted_frame);
        self.position_frame = map(result.position_frame);
        self.position_face = map(result.position_face);
        self.final_face = map(result.final_face);
        self.size_stable = result.size_stable;
        self.probes = result.probes;
        self
    }

    pub fn is_located(&self) -> bool {
        self.final_face.is_some()
    }

    pub fn to_json_line(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Map a rectangle from a copy scaled by `scale` back to the source image.
pub fn unscale(r: &Rect, scale: f64) -> Rect {
    if scale == 1.0 || scale <= 0.0 {
        return *r;
    }
    let s = |v: i32| (f64::from(v) / scale).round() as i32;
    Rect::new(s(r.x), s(r.y), s(r.width), s(r.height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_result_unscales() {
        let result = LocalizationResult {
            final_face: Some(Rect::new(10, 20, 30, 41)),
            size_stable: true,
            probes: 7,
            ..LocalizationResult::default()
        };
        let report = LocalizationReport::new("a.jpg").with_result(&result, 0.5);
        assert_eq!(report.final_face, Some(RectRecord::from(Rect::new(20, 40, 60, 82))));
        assert!(report.is_located());
        assert_eq!(report.probes, 7);
        assert!(report.fitted_frame.is_none());
    }

    #[test]
    fn test_json_line_skips_empty_error() -> Result<()> {
        let line = LocalizationReport::new("a.jpg").to_json_line()?;
        assert!(!line.contains("error"));
        assert!(!line.contains('\n'));

        let failed = LocalizationReport::failed("b.jpg", &anyhow::anyhow!("boom"));
        let parsed: LocalizationReport = serde_json::from_str(&failed.to_json_line()?)?;
        assert_eq!(parsed.error.as_deref(), Some("boom"));
        Ok(())
    }
}
