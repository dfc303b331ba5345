//! Single-image localization as run by the CLI.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use facefit_vision::framing::{crop_padded, fit_oriented};
use facefit_vision::{FaceDetector, FaceHint, Localizer, Rect};
use image::DynamicImage;
use log::info;

use crate::config::Config;
use crate::report::LocalizationReport;

pub fn localizer(cfg: &Config) -> Result<Localizer> {
    let localizer = Localizer::new(cfg.search.params()).context("invalid [search] config")?;
    Ok(localizer.with_downsample(cfg.detector.downsample))
}

/// Localize the face in an already loaded image.
///
/// `hint` is in `image` pixels. The search runs on a copy fitted to the
/// configured bounds; the report is in `image` pixels again.
pub fn locate_image<D: FaceDetector>(
    cfg: &Config,
    name: &str,
    image: &DynamicImage,
    hint: Option<FaceHint>,
    detector: D,
) -> Result<LocalizationReport> {
    let (fitted, scale) = fit_oriented(image, cfg.framing.max_width, cfg.framing.max_height);
    info!(
        "{}: {}x{} searched at {}x{}",
        name,
        image.width(),
        image.height(),
        fitted.width(),
        fitted.height()
    );

    let localizer = localizer(cfg)?;
    let result = match hint {
        Some(hint) => localizer.localize_around(
            &fitted,
            &hint.scaled(scale),
            &cfg.framing.params(),
            detector,
        ),
        None => localizer.localize_image(&fitted, detector),
    }
    .with_context(|| format!("localizing face in {}", name))?;

    let mut report = LocalizationReport::new(name).with_result(&result, scale);
    report.width = image.width();
    report.height = image.height();
    report.hint = hint.map(Into::into);
    match report.final_face {
        Some(face) => info!("{}: face at {}", name, Rect::from(face)),
        None => info!("{}: no stable face", name),
    }
    Ok(report)
}

pub fn locate_file<D: FaceDetector>(
    cfg: &Config,
    path: &Path,
    hint: Option<FaceHint>,
    detector: D,
) -> Result<(LocalizationReport, DynamicImage)> {
    let image = image::open(path).with_context(|| format!("opening image {}", path.display()))?;
    let report = locate_image(cfg, &path.display().to_string(), &image, hint, detector)?;
    Ok((report, image))
}

/// `<IMAGE>.framed.jpg` next to the image.
pub fn framed_path(image: &Path) -> PathBuf {
    let mut name = image.as_os_str().to_owned();
    name.push(".framed.jpg");
    PathBuf::from(name)
}

/// Write the `face` region of `image` to `out`, padding with black where it
/// leaves the image.
pub fn save_crop(image: &DynamicImage, face: Rect, out: &Path) -> Result<()> {
    if face.is_empty() {
        anyhow::bail!("cannot save empty crop {}", face);
    }
    let crop = crop_padded(&image.to_rgb8(), &face);
    crop.save(out)
        .with_context(|| format!("saving crop to {}", out.display()))?;
    info!("Saved {}x{} crop to {}", crop.width(), crop.height(), out.display());
    Ok(())
}
