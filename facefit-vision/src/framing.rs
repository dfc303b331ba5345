//! Pre-cropping around a rough face hint and image size normalization.

use image::{imageops, imageops::FilterType, DynamicImage, GenericImageView, ImageBuffer, Pixel};

use crate::error::{LocalizeError, Result};
use crate::geometry::{Point, Rect};

/// Landscape images are fitted into this size, portrait ones into its
/// transpose.
pub const STANDARD_WIDTH: u32 = 640;
pub const STANDARD_HEIGHT: u32 = 480;

/// A rough face location, e.g. from a hand-labelled file list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaceHint {
    pub center: Point,
    pub radius: i32,
}

impl FaceHint {
    pub const fn new(center: Point, radius: i32) -> Self {
        Self { center, radius }
    }

    pub fn from_face(face: &Rect) -> Self {
        Self::new(face.center(), face.radius())
    }

    /// Square around the hint center with half-side `radius * ratio`.
    pub fn face_rect(&self, ratio: f64) -> Rect {
        let half = (f64::from(self.radius) * ratio).round() as i32;
        Rect::new(
            self.center.x - half,
            self.center.y - half,
            2 * half,
            2 * half,
        )
    }

    /// Same hint in an image scaled by `factor`.
    pub fn scaled(&self, factor: f64) -> Self {
        let s = |v: i32| (f64::from(v) * factor).round() as i32;
        Self::new(Point::new(s(self.center.x), s(self.center.y)), s(self.radius))
    }
}

/// How large the search area around a hint is, relative to the hint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FramingParams {
    /// Search diameter over hinted face diameter.
    pub face_crop_ratio: f64,
    /// Minimum search area width in pixels, when the image allows it.
    pub min_crop_width: i32,
    /// Minimum face size as a fraction of the search area.
    pub min_face_fraction: f64,
    /// Allowed center drift as a fraction of the search area.
    pub tolerance_fraction: f64,
}

impl Default for FramingParams {
    fn default() -> Self {
        Self {
            face_crop_ratio: 2.5,
            min_crop_width: 70,
            min_face_fraction: 0.8,
            tolerance_fraction: 0.1,
        }
    }
}

impl FramingParams {
    pub fn validate(&self) -> Result<()> {
        if self.face_crop_ratio.is_nan() || self.face_crop_ratio <= 0.0 {
            return Err(LocalizeError::invalid(
                "face_crop_ratio",
                format!("must be positive, got {}", self.face_crop_ratio),
            ));
        }
        if self.min_crop_width < 0 {
            return Err(LocalizeError::invalid(
                "min_crop_width",
                format!("must be non-negative, got {}", self.min_crop_width),
            ));
        }
        for (name, v) in [
            ("min_face_fraction", self.min_face_fraction),
            ("tolerance_fraction", self.tolerance_fraction),
        ] {
            if v.is_nan() || v < 0.0 {
                return Err(LocalizeError::invalid(
                    name,
                    format!("must be non-negative, got {}", v),
                ));
            }
        }
        Ok(())
    }
}

/// Pick the crop ratio for a hint.
///
/// At least `init_ratio`, raised so that the crop is `min_crop_width` wide
/// unless the image edge furthest from the hint center is closer than that.
pub fn crop_ratio(
    width: u32,
    height: u32,
    hint: &FaceHint,
    min_crop_width: i32,
    init_ratio: f64,
) -> Result<f64> {
    let bounds = Rect::from_size(width, height);
    if !bounds.contains_point(hint.center) {
        return Err(LocalizeError::degenerate(format!(
            "hint center ({}, {}) outside the {}x{} image",
            hint.center.x, hint.center.y, width, height
        )));
    }
    if hint.radius <= 0 {
        return Err(LocalizeError::degenerate(format!(
            "hint radius must be positive, got {}",
            hint.radius
        )));
    }

    let furthest_edge = [
        hint.center.x,
        hint.center.y,
        bounds.width - hint.center.x,
        bounds.height - hint.center.y,
    ]
    .into_iter()
    .max()
    .unwrap_or(0);
    let target_radius = (min_crop_width / 2).min(furthest_edge);
    let ratio = init_ratio.max(f64::from(target_radius) / f64::from(hint.radius));
    log::debug!("crop ratio for hint {:?}: {:.3}", hint, ratio);
    Ok(ratio)
}

/// Copy `region` out of `image`. Parts outside the image stay black.
pub fn crop_padded<P>(
    image: &ImageBuffer<P, Vec<P::Subpixel>>,
    region: &Rect,
) -> ImageBuffer<P, Vec<P::Subpixel>>
where
    P: Pixel + 'static,
{
    let bounds = Rect::from_size(image.width(), image.height());
    let width = region.width.max(0) as u32;
    let height = region.height.max(0) as u32;
    if bounds.contains(region) {
        return imageops::crop_imm(image, region.x as u32, region.y as u32, width, height)
            .to_image();
    }
    let mut canvas = ImageBuffer::new(width, height);
    imageops::overlay(
        &mut canvas,
        image,
        -i64::from(region.x),
        -i64::from(region.y),
    );
    canvas
}

/// Downscale `image` to fit in `max_width` x `max_height`, keeping the
/// aspect ratio. Never upscales. Returns the image and the scale applied.
pub fn fit_within(image: &DynamicImage, max_width: u32, max_height: u32) -> (DynamicImage, f64) {
    let (w, h) = image.dimensions();
    if w == 0 || h == 0 {
        return (image.clone(), 1.0);
    }
    let scale = (f64::from(max_width) / f64::from(w)).min(f64::from(max_height) / f64::from(h));
    if scale >= 1.0 {
        return (image.clone(), 1.0);
    }
    let new_w = ((f64::from(w) * scale).round() as u32).max(1);
    let new_h = ((f64::from(h) * scale).round() as u32).max(1);
    (
        image.resize_exact(new_w, new_h, FilterType::Triangle),
        scale,
    )
}

/// [`fit_within`] the given landscape bounds, transposed for portrait images.
pub fn fit_oriented(image: &DynamicImage, max_width: u32, max_height: u32) -> (DynamicImage, f64) {
    let (long, short) = (max_width.max(max_height), max_width.min(max_height));
    if image.width() > image.height() {
        fit_within(image, long, short)
    } else {
        fit_within(image, short, long)
    }
}

/// [`fit_oriented`] into 640x480.
pub fn fit_standard(image: &DynamicImage) -> (DynamicImage, f64) {
    fit_oriented(image, STANDARD_WIDTH, STANDARD_HEIGHT)
}
