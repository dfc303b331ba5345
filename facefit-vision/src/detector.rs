//! Boundary between the search and the face detector.
//!
//! A [`FaceDetector`] sees pixels only. [`CropDetector`] adapts it into a
//! [`RegionDetector`], which the search stages call with rectangles in the
//! coordinate space of the full image.

use image::{imageops, imageops::FilterType, GrayImage};

use crate::error::{LocalizeError, Result};
use crate::framing::crop_padded;
use crate::geometry::{sort_by_area_desc, Rect};

/// Default downsampling applied to every crop before detection.
pub const DEFAULT_DOWNSAMPLE: u32 = 2;

/// An object detector run on a single grayscale image.
///
/// Returned rectangles are in `gray`'s pixel coordinates, in any order.
pub trait FaceDetector {
    fn detect(&mut self, gray: &GrayImage) -> anyhow::Result<Vec<Rect>>;
}

impl<D: FaceDetector + ?Sized> FaceDetector for &mut D {
    fn detect(&mut self, gray: &GrayImage) -> anyhow::Result<Vec<Rect>> {
        (**self).detect(gray)
    }
}

impl<D: FaceDetector + ?Sized> FaceDetector for Box<D> {
    fn detect(&mut self, gray: &GrayImage) -> anyhow::Result<Vec<Rect>> {
        (**self).detect(gray)
    }
}

/// Detection restricted to a region of one fixed image.
pub trait RegionDetector {
    /// Bounds of the image probes are taken from.
    fn bounds(&self) -> Rect;

    /// Candidates found inside `rect` (the whole image for `None`), largest
    /// first, in image coordinates.
    fn detect(&mut self, rect: Option<&Rect>) -> Result<Vec<Rect>>;

    /// Number of `detect` calls made so far.
    fn probes(&self) -> usize;
}

impl<R: RegionDetector + ?Sized> RegionDetector for &mut R {
    fn bounds(&self) -> Rect {
        (**self).bounds()
    }

    fn detect(&mut self, rect: Option<&Rect>) -> Result<Vec<Rect>> {
        (**self).detect(rect)
    }

    fn probes(&self) -> usize {
        (**self).probes()
    }
}

/// Crops, downsamples and forwards each probe to a [`FaceDetector`].
pub struct CropDetector<'a, D> {
    image: &'a GrayImage,
    oracle: D,
    downsample: u32,
    probes: usize,
}

impl<'a, D: FaceDetector> CropDetector<'a, D> {
    pub fn new(image: &'a GrayImage, oracle: D) -> Self {
        Self {
            image,
            oracle,
            downsample: DEFAULT_DOWNSAMPLE,
            probes: 0,
        }
    }

    /// Integer factor the crop is shrunk by before detection; `1` disables it.
    pub fn with_downsample(mut self, factor: u32) -> Self {
        self.downsample = factor.max(1);
        self
    }

    pub fn into_inner(self) -> D {
        self.oracle
    }
}

impl<D: FaceDetector> RegionDetector for CropDetector<'_, D> {
    fn bounds(&self) -> Rect {
        Rect::from_size(self.image.width(), self.image.height())
    }

    fn detect(&mut self, rect: Option<&Rect>) -> Result<Vec<Rect>> {
        self.probes += 1;
        let region = rect.copied().unwrap_or_else(|| self.bounds());
        if region.is_empty() {
            log::debug!("probe {}: empty region {}", self.probes, region);
            return Ok(vec![]);
        }

        let cropped = crop_padded(self.image, &region);
        let (crop_w, crop_h) = cropped.dimensions();
        let small_w = crop_w / self.downsample;
        let small_h = crop_h / self.downsample;
        if small_w == 0 || small_h == 0 {
            log::debug!("probe {}: region {} too small to detect in", self.probes, region);
            return Ok(vec![]);
        }
        let small = if self.downsample == 1 {
            cropped
        } else {
            imageops::resize(&cropped, small_w, small_h, FilterType::Triangle)
        };

        let raw = self.oracle.detect(&small).map_err(LocalizeError::Oracle)?;

        // Undo the downsample, then the crop offset.
        let sx = f64::from(crop_w) / f64::from(small_w);
        let sy = f64::from(crop_h) / f64::from(small_h);
        let mut faces: Vec<Rect> = raw
            .iter()
            .map(|r| {
                Rect::new(
                    (f64::from(r.x) * sx).round() as i32,
                    (f64::from(r.y) * sy).round() as i32,
                    (f64::from(r.width) * sx).round() as i32,
                    (f64::from(r.height) * sy).round() as i32,
                )
                .offset_by(&region)
                .clip_to(&region)
            })
            .filter(|r| !r.is_empty())
            .collect();
        sort_by_area_desc(&mut faces);

        log::debug!(
            "probe {}: region {} -> {} candidate(s){}",
            self.probes,
            region,
            faces.len(),
            faces
                .first()
                .map(|f| format!(", largest {}", f))
                .unwrap_or_default()
        );
        Ok(faces)
    }

    fn probes(&self) -> usize {
        self.probes
    }
}
