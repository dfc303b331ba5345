//! Shrink-to-fit: the tightest concentric crop that still holds a face.

use crate::detector::RegionDetector;
use crate::error::{LocalizeError, Result};
use crate::geometry::Rect;
use crate::validity::{is_valid, MinSize};

/// Result of [`shrink_to_fit`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShrinkOutcome {
    /// Smallest region that produced a valid detection, or the outer region.
    pub rect: Rect,
    /// Scale of `rect` relative to the outer region.
    pub scale: f64,
    /// False when not even the outer region produced a valid detection.
    pub found: bool,
}

/// Bisection over multiplicative scale factors.
///
/// Shrinks `outer` by `1 + delta` until the detection becomes invalid, then
/// halves `delta` and refines from the last good factor, until `delta`
/// drops below `min_delta`. The first probe is `outer` itself; when that
/// fails the outer region is returned unchanged with `found == false`.
pub fn shrink_to_fit<R>(
    detector: &mut R,
    outer: Rect,
    min: MinSize,
    delta: f64,
    min_delta: f64,
) -> Result<ShrinkOutcome>
where
    R: RegionDetector + ?Sized,
{
    if min_delta.is_nan() || min_delta <= 0.0 {
        return Err(LocalizeError::invalid(
            "shrink_min_delta",
            format!("must be positive, got {}", min_delta),
        ));
    }
    if delta.is_nan() || delta <= 0.0 {
        return Err(LocalizeError::invalid(
            "shrink_delta",
            format!("must be positive, got {}", delta),
        ));
    }

    let mut delta = delta;
    let mut outcome = ShrinkOutcome {
        rect: outer,
        scale: 1.0 + delta,
        found: false,
    };

    while delta >= min_delta {
        let mut scale = outcome.scale;
        loop {
            scale /= 1.0 + delta;
            let rect = outer.scale_concentric(scale);
            if rect.is_empty() {
                break;
            }
            let faces = detector.detect(Some(&rect))?;
            if !is_valid(&faces, min) {
                break;
            }
            outcome = ShrinkOutcome {
                rect,
                scale,
                found: true,
            };
        }
        if !outcome.found {
            log::debug!("shrink: no valid detection in outer region {}", outer);
            outcome.scale = 1.0;
            return Ok(outcome);
        }
        delta /= 2.0;
    }

    log::debug!(
        "shrink: {} -> {} (scale {:.4})",
        outer,
        outcome.rect,
        outcome.scale
    );
    Ok(outcome)
}
