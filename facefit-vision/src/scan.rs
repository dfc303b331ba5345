//! Middle-outward span scan shared by the center and size searches.
//!
//! A scan walks `num_steps` probe positions starting at the middle index,
//! first down towards `0`, then up towards `num_steps - 1`, stopping each
//! direction at the first probe that fails the predicate. The valid run
//! around the middle is the scan's [`Span`].

use crate::detector::RegionDetector;
use crate::error::Result;
use crate::geometry::Rect;

/// A probed region and the candidates found in it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CroppedFrame {
    pub rect: Rect,
    pub faces: Vec<Rect>,
}

impl CroppedFrame {
    /// Largest candidate, if any.
    pub fn best_face(&self) -> Option<&Rect> {
        self.faces.first()
    }
}

/// Inclusive range of scan indices whose probes were all valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub min_index: i32,
    pub max_index: i32,
}

impl Span {
    /// No probe succeeded.
    pub const NONE: Span = Span {
        min_index: -1,
        max_index: -1,
    };

    pub fn is_none(&self) -> bool {
        self.min_index < 0 || self.max_index < 0
    }

    pub fn len(&self) -> usize {
        if self.is_none() {
            0
        } else {
            (self.max_index - self.min_index + 1) as usize
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Midpoint index, rounding down.
    pub fn mid(&self) -> Option<usize> {
        if self.is_none() {
            return None;
        }
        Some(((self.min_index + self.max_index) / 2) as usize)
    }

    fn extend(&mut self, index: usize) {
        let i = index as i32;
        if self.is_none() {
            self.min_index = i;
            self.max_index = i;
        } else {
            self.min_index = self.min_index.min(i);
            self.max_index = self.max_index.max(i);
        }
    }
}

/// Frames recorded by one scan, indexed by scan step.
#[derive(Debug, Clone)]
pub struct ScanTrace {
    frames: Vec<Option<CroppedFrame>>,
    span: Span,
}

impl ScanTrace {
    fn with_capacity(num_steps: usize) -> Self {
        Self {
            frames: vec![None; num_steps],
            span: Span::NONE,
        }
    }

    pub fn span(&self) -> Span {
        self.span
    }

    pub fn num_steps(&self) -> usize {
        self.frames.len()
    }

    pub fn frame(&self, index: usize) -> Option<&CroppedFrame> {
        self.frames.get(index).and_then(Option::as_ref)
    }

    /// The frame at the span midpoint.
    pub fn mid_frame(&self) -> Option<&CroppedFrame> {
        self.span.mid().and_then(|i| self.frame(i))
    }

    /// Recorded frames in index order.
    pub fn frames(&self) -> impl Iterator<Item = (usize, &CroppedFrame)> {
        self.frames
            .iter()
            .enumerate()
            .filter_map(|(i, f)| f.as_ref().map(|f| (i, f)))
    }
}

/// Index of the scan's starting step.
pub fn middle_index(num_steps: usize) -> usize {
    num_steps / 2
}

/// Run a middle-outward scan.
///
/// `region` maps a signed step offset (`index - num_steps / 2`) to the
/// rectangle to probe; `accept` decides whether the probe's candidates are
/// good enough to extend the span. The upward pass only runs when the middle
/// probe was accepted, so a non-empty span always contains the middle index.
pub fn scan_span<R, F, P>(
    detector: &mut R,
    num_steps: usize,
    mut region: F,
    mut accept: P,
) -> Result<ScanTrace>
where
    R: RegionDetector + ?Sized,
    F: FnMut(i32) -> Rect,
    P: FnMut(&[Rect]) -> bool,
{
    let mut trace = ScanTrace::with_capacity(num_steps);
    if num_steps == 0 {
        return Ok(trace);
    }
    let middle = middle_index(num_steps);

    let mut probe = |index: usize, trace: &mut ScanTrace| -> Result<bool> {
        let rect = region(index as i32 - middle as i32);
        let faces = detector.detect(Some(&rect))?;
        if !accept(&faces) {
            return Ok(false);
        }
        trace.frames[index] = Some(CroppedFrame { rect, faces });
        trace.span.extend(index);
        Ok(true)
    };

    for index in (0..=middle).rev() {
        if !probe(index, &mut trace)? {
            break;
        }
    }
    if trace.frame(middle).is_some() {
        for index in middle + 1..num_steps {
            if !probe(index, &mut trace)? {
                break;
            }
        }
    }

    Ok(trace)
}
