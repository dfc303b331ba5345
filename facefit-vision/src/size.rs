//! Size stabilization: rescale the positioned frame over a geometric range
//! and keep the face found at the middle of the consistent run.

use crate::detector::RegionDetector;
use crate::error::{LocalizeError, Result};
use crate::geometry::Rect;
use crate::scan::{scan_span, ScanTrace};
use crate::validity::{is_valid_and_consistent, MinSize};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizeParams {
    /// Smallest frame scale probed.
    pub min_ratio: f64,
    /// Largest frame scale probed.
    pub max_ratio: f64,
    pub num_steps: usize,
    /// Allowed center drift, as a fraction of the face diagonal.
    pub tolerance_ratio: f64,
}

impl Default for SizeParams {
    fn default() -> Self {
        Self {
            min_ratio: 0.5,
            max_ratio: 2.0,
            num_steps: 21,
            tolerance_ratio: 0.04,
        }
    }
}

impl SizeParams {
    pub fn validate(&self) -> Result<()> {
        if self.num_steps == 0 {
            return Err(LocalizeError::invalid("size_steps", "must be at least 1"));
        }
        if !(self.min_ratio > 0.0 && self.min_ratio.is_finite()) {
            return Err(LocalizeError::invalid(
                "size_min_ratio",
                format!("must be positive, got {}", self.min_ratio),
            ));
        }
        if !(self.max_ratio >= self.min_ratio && self.max_ratio.is_finite()) {
            return Err(LocalizeError::invalid(
                "size_max_ratio",
                format!(
                    "must be at least size_min_ratio ({}), got {}",
                    self.min_ratio, self.max_ratio
                ),
            ));
        }
        if self.tolerance_ratio.is_nan() || self.tolerance_ratio < 0.0 {
            return Err(LocalizeError::invalid(
                "tolerance_ratio",
                format!("must be non-negative, got {}", self.tolerance_ratio),
            ));
        }
        Ok(())
    }

    /// Log-space distance between consecutive probe scales.
    pub fn ratio_step(&self) -> f64 {
        (self.max_ratio / self.min_ratio).ln() / self.num_steps as f64
    }
}

/// Outcome of [`find_size`].
#[derive(Debug, Clone)]
pub struct SizeEstimate {
    /// The stabilized face, or the input face when `stable` is false.
    pub face: Rect,
    pub stable: bool,
    /// Center tolerance used for the consistency check, in pixels.
    pub tolerance: f64,
    pub trace: ScanTrace,
}

/// Scan scales of `frame` and pick the face at the middle of the run whose
/// detections stay valid and centered on `face`.
///
/// Never fails on a missing span: the input `face` comes back with
/// `stable == false`.
pub fn find_size<R>(
    detector: &mut R,
    frame: Rect,
    face: Rect,
    min: MinSize,
    params: &SizeParams,
) -> Result<SizeEstimate>
where
    R: RegionDetector + ?Sized,
{
    params.validate()?;
    if frame.is_empty() {
        return Err(LocalizeError::degenerate(format!(
            "empty position frame {}",
            frame
        )));
    }

    let reference = face.center();
    let tolerance = (face.diagonal() * params.tolerance_ratio).round();
    let ratio_step = params.ratio_step();

    let trace = scan_span(
        detector,
        params.num_steps,
        |offset| frame.scale_concentric((ratio_step * f64::from(offset)).exp()),
        |faces| is_valid_and_consistent(faces, min, reference, tolerance),
    )?;

    match trace.mid_frame().and_then(|f| f.best_face().copied()) {
        Some(found) => {
            log::debug!(
                "size: span {:?} of {} steps, face {} -> {} (tolerance {}px)",
                trace.span(),
                trace.num_steps(),
                face,
                found,
                tolerance
            );
            Ok(SizeEstimate {
                face: found,
                stable: true,
                tolerance,
                trace,
            })
        }
        None => {
            log::warn!(
                "size: no consistent detection around {} (tolerance {}px), keeping position face",
                face,
                tolerance
            );
            Ok(SizeEstimate {
                face,
                stable: false,
                tolerance,
                trace,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;

    /// Finds a face half the probe's size, centered on the probe, while the
    /// probe width stays within `lo..=hi`.
    struct Proportional {
        lo: i32,
        hi: i32,
        probes: usize,
    }

    impl RegionDetector for Proportional {
        fn bounds(&self) -> Rect {
            Rect::new(0, 0, 640, 480)
        }

        fn detect(&mut self, rect: Option<&Rect>) -> Result<Vec<Rect>> {
            self.probes += 1;
            let r = *rect.unwrap();
            if (self.lo..=self.hi).contains(&r.width) {
                Ok(vec![Rect::centered_at(r.center(), r.width / 2, r.height / 2)])
            } else {
                Ok(vec![])
            }
        }

        fn probes(&self) -> usize {
            self.probes
        }
    }

    struct Never;

    impl RegionDetector for Never {
        fn bounds(&self) -> Rect {
            Rect::new(0, 0, 640, 480)
        }

        fn detect(&mut self, _rect: Option<&Rect>) -> Result<Vec<Rect>> {
            Ok(vec![])
        }

        fn probes(&self) -> usize {
            0
        }
    }

    #[test]
    fn test_unrestricted_run_keeps_frame_scale() {
        let frame = Rect::new(220, 140, 200, 200);
        let face = Rect::new(270, 190, 100, 100);
        let mut det = Proportional {
            lo: 0,
            hi: i32::MAX,
            probes: 0,
        };
        let est = find_size(&mut det, frame, face, MinSize::new(10, 10), &SizeParams::default())
            .unwrap();
        assert!(est.stable);
        assert_eq!(est.trace.span().len(), 21);
        assert_eq!(est.face, face);
        assert_eq!(det.probes, 21);
    }

    #[test]
    fn test_restricted_run_moves_to_middle_of_span() {
        let frame = Rect::new(220, 140, 200, 200);
        let face = Rect::new(270, 190, 100, 100);
        // Only scales above 1 are accepted, but the middle (scale 1) must be
        // too, so restrict from 200 upward.
        let mut det = Proportional {
            lo: 200,
            hi: i32::MAX,
            probes: 0,
        };
        let est = find_size(&mut det, frame, face, MinSize::new(10, 10), &SizeParams::default())
            .unwrap();
        assert!(est.stable);
        assert_eq!(est.trace.span().mid(), Some(15));
        assert!(est.face.width > face.width);
        assert_eq!(est.face.center(), Point::new(320, 240));
    }

    #[test]
    fn test_never_valid_returns_input_face() {
        let frame = Rect::new(220, 140, 200, 200);
        let face = Rect::new(270, 190, 100, 100);
        let est = find_size(&mut Never, frame, face, MinSize::new(10, 10), &SizeParams::default())
            .unwrap();
        assert!(!est.stable);
        assert_eq!(est.face, face);
        assert!(est.trace.span().is_none());
        // round(hypot(100, 100) * 0.04) = round(5.66)
        assert_eq!(est.tolerance, 6.0);
    }

    #[test]
    fn test_rejects_inverted_ratios() {
        let params = SizeParams {
            min_ratio: 2.0,
            max_ratio: 0.5,
            ..SizeParams::default()
        };
        let err = find_size(
            &mut Never,
            Rect::new(0, 0, 10, 10),
            Rect::new(0, 0, 5, 5),
            MinSize::default(),
            &params,
        )
        .unwrap_err();
        assert!(matches!(err, LocalizeError::InvalidParameter { name: "size_max_ratio", .. }));
    }
}
