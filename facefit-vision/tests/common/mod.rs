#![allow(dead_code)]

use anyhow::Result;
use facefit_vision::error::Result as LocalizeResult;
use facefit_vision::{FaceDetector, Rect, RegionDetector};
use image::GrayImage;

/// Route `log` output through the test harness; `RUST_LOG=debug` shows
/// every probe.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Region-level oracle driven by a closure over the probed rectangle.
pub struct Scripted<F> {
    bounds: Rect,
    script: F,
    probes: usize,
}

impl<F> Scripted<F>
where
    F: FnMut(&Rect) -> Vec<Rect>,
{
    pub fn new(width: i32, height: i32, script: F) -> Self {
        Self {
            bounds: Rect::new(0, 0, width, height),
            script,
            probes: 0,
        }
    }
}

impl<F> RegionDetector for Scripted<F>
where
    F: FnMut(&Rect) -> Vec<Rect>,
{
    fn bounds(&self) -> Rect {
        self.bounds
    }

    fn detect(&mut self, rect: Option<&Rect>) -> LocalizeResult<Vec<Rect>> {
        self.probes += 1;
        let rect = rect.copied().unwrap_or(self.bounds);
        let mut faces = (self.script)(&rect);
        facefit_vision::geometry::sort_by_area_desc(&mut faces);
        Ok(faces)
    }

    fn probes(&self) -> usize {
        self.probes
    }
}

/// A `size` x `size` face centered in every probe of at least `min_area`
/// pixels, clipped to the probe.
pub fn centered_face(size: i32, min_area: i64) -> impl FnMut(&Rect) -> Vec<Rect> {
    move |probe| {
        if probe.area() < min_area {
            return vec![];
        }
        let face = Rect::centered_at(probe.center(), size, size).clip_to(probe);
        if face.is_empty() {
            vec![]
        } else {
            vec![face]
        }
    }
}

/// Pixel-level oracle: a square face centered in whatever it is shown,
/// optionally preceded by a small spurious hit in the top-left corner.
pub struct CenteredInput {
    pub size: i32,
    pub spurious: bool,
    pub calls: usize,
}

impl CenteredInput {
    pub fn new(size: i32) -> Self {
        Self {
            size,
            spurious: false,
            calls: 0,
        }
    }

    pub fn with_spurious(size: i32) -> Self {
        Self {
            spurious: true,
            ..Self::new(size)
        }
    }
}

impl FaceDetector for CenteredInput {
    fn detect(&mut self, gray: &GrayImage) -> Result<Vec<Rect>> {
        self.calls += 1;
        let bounds = Rect::from_size(gray.width(), gray.height());
        let face = Rect::centered_at(bounds.center(), self.size, self.size).clip_to(&bounds);
        let mut faces = Vec::new();
        if self.spurious {
            faces.push(Rect::new(1, 1, 4, 4).clip_to(&bounds));
        }
        faces.push(face);
        Ok(faces)
    }
}
