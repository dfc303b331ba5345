//! Center stabilization: slide a fixed-size window along X, then along Y,
//! and take the middle of the range of offsets that still hold a face.

use crate::detector::RegionDetector;
use crate::error::{LocalizeError, Result};
use crate::geometry::{Point, Rect};
use crate::scan::{scan_span, ScanTrace};
use crate::validity::{is_valid, MinSize};

/// Stable position found by [`find_center`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    /// The base window re-centered on the stable point.
    pub frame: Rect,
    /// Average of the faces detected at the X and Y midpoints.
    pub face: Rect,
}

/// Both axis scans plus the position derived from them, if any.
#[derive(Debug, Clone)]
pub struct CenterScan {
    pub x: ScanTrace,
    pub y: ScanTrace,
    pub position: Option<Position>,
}

/// Scan `base` across the image along each axis.
///
/// The step is `(image_dim - base_dim) / num_steps` pixels. `base` must be
/// non-empty and no larger than the image.
pub fn find_center<R>(
    detector: &mut R,
    base: Rect,
    min: MinSize,
    num_steps: usize,
) -> Result<CenterScan>
where
    R: RegionDetector + ?Sized,
{
    let bounds = detector.bounds();
    if num_steps == 0 {
        return Err(LocalizeError::invalid("center_steps", "must be at least 1"));
    }
    if base.is_empty() {
        return Err(LocalizeError::degenerate(format!(
            "empty base region {}",
            base
        )));
    }
    if base.width > bounds.width || base.height > bounds.height {
        return Err(LocalizeError::RegionTooLarge {
            base,
            width: bounds.width as u32,
            height: bounds.height as u32,
        });
    }

    let steps = num_steps as i32;
    let dx = (bounds.width - base.width) / steps;
    let dy = (bounds.height - base.height) / steps;

    let x = scan_span(
        detector,
        num_steps,
        |offset| base.translate(offset * dx, 0),
        |faces| is_valid(faces, min),
    )?;
    let y = scan_span(
        detector,
        num_steps,
        |offset| base.translate(0, offset * dy),
        |faces| is_valid(faces, min),
    )?;
    log::debug!(
        "center: x span {:?} (step {}px), y span {:?} (step {}px)",
        x.span(),
        dx,
        y.span(),
        dy
    );

    let position = stable_position(&base, &x, &y);
    Ok(CenterScan { x, y, position })
}

fn stable_position(base: &Rect, x: &ScanTrace, y: &ScanTrace) -> Option<Position> {
    let (Some(fx), Some(fy)) = (x.mid_frame(), y.mid_frame()) else {
        let axis = if x.span().is_empty() { "x" } else { "y" };
        log::warn!("center: no stable offset on the {} axis", axis);
        return None;
    };
    let (face_x, face_y) = (fx.best_face()?, fy.best_face()?);

    let center = Point::new(fx.rect.center().x, fy.rect.center().y);
    let frame = base.recenter(center);
    let face = Rect::average(face_x, face_y);
    if !frame.contains(&face) {
        log::warn!(
            "center: merged face {} falls outside position frame {}",
            face,
            frame
        );
        return None;
    }
    Some(Position { frame, face })
}
