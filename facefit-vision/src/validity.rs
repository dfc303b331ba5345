//! Predicates deciding whether a probe's candidates count as a detection.
//!
//! Only the first (largest) candidate is ever inspected.

use crate::geometry::{Point, Rect};

/// Minimum width and height a detection must reach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MinSize {
    pub width: i32,
    pub height: i32,
}

impl MinSize {
    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }
}

/// Non-empty and the largest candidate is at least `min` in both dimensions.
pub fn is_valid(candidates: &[Rect], min: MinSize) -> bool {
    candidates
        .first()
        .is_some_and(|face| face.width >= min.width && face.height >= min.height)
}

/// Non-empty and the largest candidate's center lies within `tolerance`
/// pixels of `reference`.
pub fn is_consistent(candidates: &[Rect], reference: Point, tolerance: f64) -> bool {
    candidates
        .first()
        .is_some_and(|face| face.center().distance(&reference) <= tolerance)
}

pub fn is_valid_and_consistent(
    candidates: &[Rect],
    min: MinSize,
    reference: Point,
    tolerance: f64,
) -> bool {
    is_valid(candidates, min) && is_consistent(candidates, reference, tolerance)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_valid() {
        let min = MinSize::new(20, 30);
        assert!(!is_valid(&[], min));
        assert!(is_valid(&[Rect::new(0, 0, 20, 30)], min));
        assert!(!is_valid(&[Rect::new(0, 0, 19, 300)], min));
        // Only the first candidate counts.
        assert!(!is_valid(
            &[Rect::new(0, 0, 10, 10), Rect::new(0, 0, 50, 50)],
            min
        ));
    }

    #[test]
    fn test_is_consistent() {
        let face = Rect::new(90, 90, 20, 20); // center (100, 100)
        assert!(is_consistent(&[face], Point::new(103, 104), 5.0));
        assert!(!is_consistent(&[face], Point::new(104, 104), 5.0));
        assert!(!is_consistent(&[], Point::new(100, 100), 1e9));
    }

    #[test]
    fn test_spurious_second_candidate_ignored() {
        let big = Rect::new(0, 0, 100, 100);
        let spurious = Rect::new(300, 300, 10, 10);
        let min = MinSize::new(50, 50);
        assert!(is_valid_and_consistent(
            &[big, spurious],
            min,
            Point::new(50, 50),
            2.0
        ));
        assert!(!is_valid_and_consistent(
            &[spurious, big],
            min,
            Point::new(50, 50),
            2.0
        ));
    }
}
