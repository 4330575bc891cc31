//! Geometry primitives consumed by the impression tracker.
//!
//! The tracker never computes layout. Callers hand it an element's measured
//! size and two rectangles in a shared coordinate space (typically
//! window-relative pixels): the element's bounds and the visible viewport.
//! Everything here is plain arithmetic on those inputs.

use std::fmt;

/// Measured size of an element in whole pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

impl Size {
    /// Create a new size.
    pub fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    /// Area in square pixels, computed in `i64` so large layouts cannot overflow.
    pub fn area(&self) -> i64 {
        self.width as i64 * self.height as i64
    }

    /// Whether either dimension is zero or negative.
    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Axis-aligned rectangle given by its edges.
///
/// `left <= right` and `top <= bottom` for a well-formed rectangle, with `y`
/// growing downwards as in window coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl Rect {
    /// Create a rectangle from its edges.
    pub fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Create a rectangle from an origin and a size.
    pub fn from_origin_size(left: f32, top: f32, size: Size) -> Self {
        Self {
            left,
            top,
            right: left + size.width as f32,
            bottom: top + size.height as f32,
        }
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    /// Overlap of two rectangles.
    ///
    /// Unlike a clamped intersection, the result keeps negative extents when
    /// the rectangles are disjoint so callers can tell "touching" (zero) from
    /// "apart" (negative) on each axis.
    pub fn overlap(&self, other: &Rect) -> Rect {
        Rect {
            left: self.left.max(other.left),
            top: self.top.max(other.top),
            right: self.right.min(other.right),
            bottom: self.bottom.min(other.bottom),
        }
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {}, {}, {}]",
            self.left, self.top, self.right, self.bottom
        )
    }
}

/// Outcome of measuring one geometry report.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Visibility {
    /// The element and viewport are apart on at least one axis.
    Outside,
    /// The element has no positive area, so no ratio can be formed.
    Degenerate,
    /// The element overlaps the viewport by the given fraction of its own area.
    Partial(f32),
}

impl Visibility {
    /// Measure how much of an element lies inside the viewport.
    pub fn measure(size: Size, bounds: &Rect, viewport: &Rect) -> Self {
        let overlap = bounds.overlap(viewport);

        let visible_height = overlap.height();
        if visible_height < 0.0 {
            return Visibility::Outside;
        }
        let visible_width = overlap.width();
        if visible_width < 0.0 {
            return Visibility::Outside;
        }

        if size.is_empty() {
            return Visibility::Degenerate;
        }

        let visible_area = visible_width * visible_height;
        Visibility::Partial(visible_area / size.area() as f32)
    }

    /// Whether this measurement meets `threshold`.
    ///
    /// The boundary is inclusive. A `NaN` ratio (from `NaN` edges) never meets
    /// any threshold.
    pub fn meets(&self, threshold: f32) -> bool {
        match self {
            Visibility::Outside | Visibility::Degenerate => false,
            Visibility::Partial(ratio) => *ratio >= threshold,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    mod rect {
        use super::*;

        #[test]
        fn test_overlap_identical() {
            let rect = Rect::new(0.0, 0.0, 10.0, 10.0);
            assert_eq!(rect.overlap(&rect), rect);
        }

        #[test]
        fn test_overlap_disjoint_keeps_negative_extent() {
            let a = Rect::new(0.0, 0.0, 10.0, 10.0);
            let b = Rect::new(0.0, 20.0, 10.0, 30.0);
            let overlap = a.overlap(&b);
            assert!(overlap.height() < 0.0);
            assert_eq!(overlap.width(), 10.0);
        }

        #[test]
        fn test_from_origin_size() {
            let rect = Rect::from_origin_size(5.0, 7.0, Size::new(10, 20));
            assert_eq!(rect, Rect::new(5.0, 7.0, 15.0, 27.0));
        }

        #[test]
        fn test_display() {
            let rect = Rect::new(0.0, 1.5, 10.0, 20.0);
            assert_eq!(format!("{}", rect), "[0, 1.5, 10, 20]");
        }
    }

    mod visibility {
        use super::*;

        #[test]
        fn test_fully_visible() {
            let rect = Rect::new(0.0, 0.0, 10.0, 10.0);
            let vis = Visibility::measure(Size::new(10, 10), &rect, &rect);
            assert_eq!(vis, Visibility::Partial(1.0));
            assert!(vis.meets(1.0));
        }

        #[test]
        fn test_small_overlap() {
            let rect = Rect::new(0.0, 0.0, 3.0, 3.0);
            let vis = Visibility::measure(Size::new(10, 10), &rect, &rect);
            match vis {
                Visibility::Partial(ratio) => assert!((ratio - 0.09).abs() < 1e-6),
                other => panic!("Expected partial visibility, got {:?}", other),
            }
            assert!(!vis.meets(0.5));
        }

        #[test]
        fn test_outside_vertically() {
            let bounds = Rect::new(0.0, 100.0, 10.0, 110.0);
            let viewport = Rect::new(0.0, 0.0, 10.0, 50.0);
            let vis = Visibility::measure(Size::new(10, 10), &bounds, &viewport);
            assert_eq!(vis, Visibility::Outside);
            assert!(!vis.meets(0.0));
        }

        #[test]
        fn test_outside_horizontally() {
            let bounds = Rect::new(100.0, 0.0, 110.0, 10.0);
            let viewport = Rect::new(0.0, 0.0, 50.0, 10.0);
            let vis = Visibility::measure(Size::new(10, 10), &bounds, &viewport);
            assert_eq!(vis, Visibility::Outside);
        }

        #[test]
        fn test_touching_edge_is_zero_not_outside() {
            let bounds = Rect::new(0.0, 10.0, 10.0, 20.0);
            let viewport = Rect::new(0.0, 0.0, 10.0, 10.0);
            let vis = Visibility::measure(Size::new(10, 10), &bounds, &viewport);
            assert_eq!(vis, Visibility::Partial(0.0));
        }

        #[test]
        fn test_zero_area_element_does_not_divide_by_zero() {
            let rect = Rect::new(0.0, 0.0, 0.0, 0.0);
            let vis = Visibility::measure(Size::new(0, 10), &rect, &rect);
            assert_eq!(vis, Visibility::Degenerate);
            assert!(!vis.meets(0.0));
        }

        #[test]
        fn test_negative_size_is_degenerate() {
            let rect = Rect::new(0.0, 0.0, 10.0, 10.0);
            let vis = Visibility::measure(Size::new(-10, 10), &rect, &rect);
            assert_eq!(vis, Visibility::Degenerate);

            // Both dimensions negative still yields a positive product.
            let vis = Visibility::measure(Size::new(-10, -10), &rect, &rect);
            assert_eq!(vis, Visibility::Degenerate);
        }

        #[test]
        fn test_threshold_boundary_inclusive() {
            // Half of a 10x10 element.
            let bounds = Rect::new(0.0, 0.0, 10.0, 10.0);
            let viewport = Rect::new(0.0, 0.0, 10.0, 5.0);
            let vis = Visibility::measure(Size::new(10, 10), &bounds, &viewport);
            assert!(vis.meets(0.5));
            assert!(!vis.meets(0.500_001));
        }

        #[test]
        fn test_nan_never_meets() {
            assert!(!Visibility::Partial(f32::NAN).meets(0.0));
        }
    }

    proptest! {
        #[test]
        fn prop_ratio_within_unit_interval_when_inside_bounds(
            w in 1i32..500,
            h in 1i32..500,
            dx in 0i32..500,
            dy in 0i32..500,
        ) {
            let size = Size::new(w, h);
            let bounds = Rect::from_origin_size(0.0, 0.0, size);
            let viewport = Rect::new(dx as f32, dy as f32, 1000.0, 1000.0);
            match Visibility::measure(size, &bounds, &viewport) {
                Visibility::Outside => prop_assert!(dx > w || dy > h),
                Visibility::Degenerate => prop_assert!(false, "positive size reported degenerate"),
                Visibility::Partial(ratio) => {
                    prop_assert!(ratio >= 0.0);
                    prop_assert!(ratio <= 1.0 + f32::EPSILON);
                }
            }
        }

        #[test]
        fn prop_overlap_is_commutative(
            a in (0i32..100, 0i32..100, 1i32..100, 1i32..100),
            b in (0i32..100, 0i32..100, 1i32..100, 1i32..100),
        ) {
            let ra = Rect::from_origin_size(a.0 as f32, a.1 as f32, Size::new(a.2, a.3));
            let rb = Rect::from_origin_size(b.0 as f32, b.1 as f32, Size::new(b.2, b.3));
            prop_assert_eq!(ra.overlap(&rb), rb.overlap(&ra));
        }
    }
}
