//! Integer pixel-space rectangles and points.
//!
//! All coordinates are `i32` so that probe regions may extend past the image
//! edges (negative origins) while the search moves them around.

use std::fmt;

/// A point in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    pub fn distance(&self, other: &Point) -> f64 {
        f64::from(self.x - other.x).hypot(f64::from(self.y - other.y))
    }
}

/// Axis-aligned rectangle: top-left corner plus size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle anchored at the origin, covering a `width` x `height` image.
    pub fn from_size(width: u32, height: u32) -> Self {
        Self::new(0, 0, clamp_dim(width), clamp_dim(height))
    }

    /// Rectangle of the given size centered on `center`.
    pub fn centered_at(center: Point, width: i32, height: i32) -> Self {
        Self::new(center.x - width / 2, center.y - height / 2, width, height)
    }

    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    pub fn area(&self) -> i64 {
        i64::from(self.width) * i64::from(self.height)
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2, self.y + self.height / 2)
    }

    /// Average of half-width and half-height.
    pub fn radius(&self) -> i32 {
        (self.width + self.height) / 4
    }

    /// Length of the diagonal.
    pub fn diagonal(&self) -> f64 {
        f64::from(self.width).hypot(f64::from(self.height))
    }

    /// True iff `inner` lies fully within `self`.
    pub fn contains(&self, inner: &Rect) -> bool {
        inner.x >= self.x
            && inner.y >= self.y
            && inner.right() <= self.right()
            && inner.bottom() <= self.bottom()
    }

    pub fn contains_point(&self, p: Point) -> bool {
        p.x >= self.x && p.y >= self.y && p.x < self.right() && p.y < self.bottom()
    }

    /// Scale width and height by `factor` keeping the center fixed.
    pub fn scale_concentric(&self, factor: f64) -> Rect {
        let cx = f64::from(self.x) + f64::from(self.width) / 2.0;
        let cy = f64::from(self.y) + f64::from(self.height) / 2.0;
        let width = (f64::from(self.width) * factor).round();
        let height = (f64::from(self.height) * factor).round();
        Rect::new(
            (cx - width / 2.0).round() as i32,
            (cy - height / 2.0).round() as i32,
            width as i32,
            height as i32,
        )
    }

    pub fn translate(&self, dx: i32, dy: i32) -> Rect {
        Rect::new(self.x + dx, self.y + dy, self.width, self.height)
    }

    /// Map a rectangle expressed relative to `origin` back into `origin`'s
    /// parent coordinate space.
    pub fn offset_by(&self, origin: &Rect) -> Rect {
        self.translate(origin.x, origin.y)
    }

    /// Same size, moved so that its center is `center`.
    pub fn recenter(&self, center: Point) -> Rect {
        Rect::centered_at(center, self.width, self.height)
    }

    /// Intersection with `bounds`; zero-sized when they do not overlap.
    pub fn clip_to(&self, bounds: &Rect) -> Rect {
        let x0 = self.x.max(bounds.x);
        let y0 = self.y.max(bounds.y);
        let x1 = self.right().min(bounds.right());
        let y1 = self.bottom().min(bounds.bottom());
        if x1 <= x0 || y1 <= y0 {
            return Rect::new(x0, y0, 0, 0);
        }
        Rect::new(x0, y0, x1 - x0, y1 - y0)
    }

    /// Component-wise mean of two rectangles.
    pub fn average(a: &Rect, b: &Rect) -> Rect {
        Rect::new(
            (a.x + b.x) / 2,
            (a.y + b.y) / 2,
            (a.width + b.width) / 2,
            (a.height + b.height) / 2,
        )
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {}, {}x{}]",
            self.x, self.y, self.width, self.height
        )
    }
}

fn clamp_dim(v: u32) -> i32 {
    i32::try_from(v).unwrap_or(i32::MAX)
}

/// Sort candidates largest-first. Stable, so equal areas keep their order.
pub fn sort_by_area_desc(rects: &mut [Rect]) {
    rects.sort_by(|a, b| b.area().cmp(&a.area()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    #[test]
    fn test_center_and_radius() {
        let r = Rect::new(10, 20, 100, 60);
        assert_eq!(r.center(), Point::new(60, 50));
        assert_eq!(r.radius(), 40);
    }

    #[test]
    fn test_scale_concentric_keeps_center() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..2000 {
            let r = Rect::new(
                rng.gen_range(-200..200),
                rng.gen_range(-200..200),
                rng.gen_range(1..800),
                rng.gen_range(1..800),
            );
            let f = rng.gen_range(0.05..4.0);
            let s = r.scale_concentric(f);
            let (c0, c1) = (r.center(), s.center());
            assert!(
                (c0.x - c1.x).abs() <= 1 && (c0.y - c1.y).abs() <= 1,
                "{} scaled by {} moved center {:?} -> {:?}",
                r,
                f,
                c0,
                c1
            );
        }
    }

    #[test]
    fn test_scale_concentric_roundtrip() {
        let r = Rect::new(37, 41, 211, 157);
        let back = r.scale_concentric(1.7).scale_concentric(1.0 / 1.7);
        assert!((back.x - r.x).abs() <= 1);
        assert!((back.y - r.y).abs() <= 1);
        assert!((back.width - r.width).abs() <= 1);
        assert!((back.height - r.height).abs() <= 1);
    }

    #[test]
    fn test_contains() {
        let r = Rect::new(5, 5, 50, 40);
        assert!(r.contains(&r));
        assert!(!r.scale_concentric(0.5).contains(&r));
        assert!(r.contains(&r.scale_concentric(0.5)));
        assert!(!r.contains(&r.translate(1, 0)));
    }

    #[test]
    fn test_offset_and_clip() {
        let face = Rect::new(3, 4, 10, 10);
        let crop = Rect::new(100, 200, 50, 50);
        assert_eq!(face.offset_by(&crop), Rect::new(103, 204, 10, 10));

        let bounds = Rect::new(0, 0, 100, 100);
        assert_eq!(
            Rect::new(-10, 90, 30, 30).clip_to(&bounds),
            Rect::new(0, 90, 20, 10)
        );
        assert!(Rect::new(200, 200, 5, 5).clip_to(&bounds).is_empty());
    }

    #[test]
    fn test_sort_by_area() {
        let mut v = vec![
            Rect::new(0, 0, 10, 10),
            Rect::new(0, 0, 30, 30),
            Rect::new(5, 5, 20, 5),
        ];
        sort_by_area_desc(&mut v);
        assert_eq!(v[0].width, 30);
        assert_eq!(v[2].height, 5);
    }
}
