//! The three-stage search: shrink-to-fit, center scan, size scan.

use image::{DynamicImage, GrayImage};

use crate::center::find_center;
use crate::detector::{CropDetector, FaceDetector, RegionDetector, DEFAULT_DOWNSAMPLE};
use crate::error::{LocalizeError, Result};
use crate::framing::{crop_padded, crop_ratio, FaceHint, FramingParams};
use crate::geometry::Rect;
use crate::shrink::shrink_to_fit;
use crate::size::{find_size, SizeParams};
use crate::validity::MinSize;

/// Tunables of one localization run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchParams {
    /// Starting region for shrink-to-fit, relative to the image.
    pub outer_frame_ratio: f64,
    /// Growth applied to the shrink-to-fit result before the center scan.
    pub base_growth: f64,
    pub shrink_delta: f64,
    pub shrink_min_delta: f64,
    pub center_steps: usize,
    pub size_steps: usize,
    pub size_min_ratio: f64,
    pub size_max_ratio: f64,
    /// Allowed center drift during the size scan, relative to the face
    /// diagonal.
    pub tolerance_ratio: f64,
    /// Minimum face size relative to the image, per axis. Searches around a
    /// hint derive it from the crop ratio instead.
    pub min_face_factor: f64,
    /// Report the position face as final even when the size scan found no
    /// consistent run.
    pub accept_unstable_size: bool,
}

impl Default for SearchParams {
    fn default() -> Self {
        let framing = FramingParams::default();
        Self {
            outer_frame_ratio: 1.0 / 1.2,
            base_growth: 1.1,
            shrink_delta: 0.1,
            shrink_min_delta: 0.01,
            center_steps: 21,
            size_steps: 21,
            size_min_ratio: 0.5,
            size_max_ratio: 2.0,
            tolerance_ratio: framing.tolerance_fraction / framing.face_crop_ratio,
            min_face_factor: 0.15,
            accept_unstable_size: false,
        }
    }
}

impl SearchParams {
    pub fn validate(&self) -> Result<()> {
        let r = self.outer_frame_ratio;
        if !(r > 0.0 && r <= 1.0) {
            return Err(LocalizeError::invalid(
                "outer_frame_ratio",
                format!("must be in (0, 1], got {}", r),
            ));
        }
        if !(self.base_growth >= 1.0 && self.base_growth.is_finite()) {
            return Err(LocalizeError::invalid(
                "base_growth",
                format!("must be at least 1, got {}", self.base_growth),
            ));
        }
        if r * self.base_growth > 1.0 + f64::EPSILON {
            return Err(LocalizeError::invalid(
                "base_growth",
                format!(
                    "outer_frame_ratio * base_growth must not exceed 1, got {}",
                    r * self.base_growth
                ),
            ));
        }
        if self.shrink_delta.is_nan() || self.shrink_delta <= 0.0 {
            return Err(LocalizeError::invalid(
                "shrink_delta",
                format!("must be positive, got {}", self.shrink_delta),
            ));
        }
        if self.shrink_min_delta.is_nan() || self.shrink_min_delta <= 0.0 {
            return Err(LocalizeError::invalid(
                "shrink_min_delta",
                format!("must be positive, got {}", self.shrink_min_delta),
            ));
        }
        if self.center_steps == 0 {
            return Err(LocalizeError::invalid("center_steps", "must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.min_face_factor) {
            return Err(LocalizeError::invalid(
                "min_face_factor",
                format!("must be in [0, 1], got {}", self.min_face_factor),
            ));
        }
        self.size_params().validate()
    }

    /// Minimum accepted face size for an image of `bounds`' size.
    pub fn min_face_size(&self, bounds: &Rect) -> MinSize {
        MinSize::new(
            (f64::from(bounds.width) * self.min_face_factor).round() as i32,
            (f64::from(bounds.height) * self.min_face_factor).round() as i32,
        )
    }

    pub fn size_params(&self) -> SizeParams {
        SizeParams {
            min_ratio: self.size_min_ratio,
            max_ratio: self.size_max_ratio,
            num_steps: self.size_steps,
            tolerance_ratio: self.tolerance_ratio,
        }
    }

    /// Thresholds for a search area `ratio` times the hinted face size.
    pub fn for_crop_ratio(&self, framing: &FramingParams, ratio: f64) -> Self {
        Self {
            min_face_factor: framing.min_face_fraction / ratio,
            tolerance_ratio: framing.tolerance_fraction / ratio,
            ..*self
        }
    }
}

/// Everything a run found. Rectangles are in the coordinates of the image
/// the run was given.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LocalizationResult {
    /// Tightest region still holding a face, `None` when not even the outer
    /// region did.
    pub fitted_frame: Option<Rect>,
    /// Search window centered on the stable position.
    pub position_frame: Option<Rect>,
    /// Face merged from the center scan.
    pub position_face: Option<Rect>,
    /// Face after size stabilization.
    pub final_face: Option<Rect>,
    /// Whether the size scan found a consistent run.
    pub size_stable: bool,
    /// Number of detector invocations.
    pub probes: usize,
}

impl LocalizationResult {
    pub fn is_empty(&self) -> bool {
        self.final_face.is_none()
    }

    /// Translate every rectangle by `origin`'s top-left corner.
    pub fn offset_by(&self, origin: &Rect) -> Self {
        let map = |r: Option<Rect>| r.map(|r| r.offset_by(origin));
        Self {
            fitted_frame: map(self.fitted_frame),
            position_frame: map(self.position_frame),
            position_face: map(self.position_face),
            final_face: map(self.final_face),
            ..*self
        }
    }
}

/// Runs the search with a fixed set of parameters.
#[derive(Debug, Clone)]
pub struct Localizer {
    params: SearchParams,
    downsample: u32,
}

impl Default for Localizer {
    fn default() -> Self {
        Self {
            params: SearchParams::default(),
            downsample: DEFAULT_DOWNSAMPLE,
        }
    }
}

impl Localizer {
    pub fn new(params: SearchParams) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            params,
            downsample: DEFAULT_DOWNSAMPLE,
        })
    }

    /// Downsampling used by the image entry points.
    pub fn with_downsample(mut self, factor: u32) -> Self {
        self.downsample = factor.max(1);
        self
    }

    pub fn params(&self) -> &SearchParams {
        &self.params
    }

    /// Localize the face in `detector`'s image.
    pub fn localize<R>(&self, detector: &mut R) -> Result<LocalizationResult>
    where
        R: RegionDetector + ?Sized,
    {
        let p = &self.params;
        let bounds = detector.bounds();
        if bounds.is_empty() {
            return Err(LocalizeError::degenerate(format!(
                "empty image {}x{}",
                bounds.width, bounds.height
            )));
        }
        let start_probes = detector.probes();
        let min = p.min_face_size(&bounds);
        let mut result = LocalizationResult::default();

        let outer = bounds.scale_concentric(p.outer_frame_ratio);
        let shrink = shrink_to_fit(detector, outer, min, p.shrink_delta, p.shrink_min_delta)?;
        if shrink.found {
            result.fitted_frame = Some(shrink.rect);
            log::info!("fitted frame {} (scale {:.3})", shrink.rect, shrink.scale);
        } else {
            log::info!(
                "no face of at least {}x{} in {}, scanning from it anyway",
                min.width,
                min.height,
                outer
            );
        }

        let base = shrink.rect.scale_concentric(p.base_growth);
        let center = find_center(detector, base, min, p.center_steps)?;
        let Some(position) = center.position else {
            result.probes = detector.probes() - start_probes;
            return Ok(result);
        };
        result.position_frame = Some(position.frame);
        result.position_face = Some(position.face);
        log::info!(
            "position frame {}, face {}",
            position.frame,
            position.face
        );

        let size = find_size(detector, position.frame, position.face, min, &p.size_params())?;
        result.size_stable = size.stable;
        if size.stable || p.accept_unstable_size {
            result.final_face = Some(size.face);
            log::info!("final face {}", size.face);
        }
        result.probes = detector.probes() - start_probes;
        Ok(result)
    }

    pub fn localize_gray<D: FaceDetector>(
        &self,
        gray: &GrayImage,
        oracle: D,
    ) -> Result<LocalizationResult> {
        let mut detector = CropDetector::new(gray, oracle).with_downsample(self.downsample);
        self.localize(&mut detector)
    }

    pub fn localize_image<D: FaceDetector>(
        &self,
        image: &DynamicImage,
        oracle: D,
    ) -> Result<LocalizationResult> {
        self.localize_gray(&image.to_luma8(), oracle)
    }

    /// Localize inside the area around `hint`, with thresholds derived from
    /// the crop ratio. Results are in `image` coordinates.
    pub fn localize_around<D: FaceDetector>(
        &self,
        image: &DynamicImage,
        hint: &FaceHint,
        framing: &FramingParams,
        oracle: D,
    ) -> Result<LocalizationResult> {
        framing.validate()?;
        let ratio = crop_ratio(
            image.width(),
            image.height(),
            hint,
            framing.min_crop_width,
            framing.face_crop_ratio,
        )?;
        let region = hint.face_rect(ratio);
        let gray = crop_padded(&image.to_luma8(), &region);
        log::info!("searching {} around hint (crop ratio {:.3})", region, ratio);

        let local = Localizer::new(self.params.for_crop_ratio(framing, ratio))?
            .with_downsample(self.downsample);
        Ok(local.localize_gray(&gray, oracle)?.offset_by(&region))
    }
}
