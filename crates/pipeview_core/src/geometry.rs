//! Geometry value types shared by signals, views and painters
//!
//! All types are plain `Copy` values. Signals carry them by value, so a
//! handler can never observe a downstream mutation of a position or size.

use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Mul, Neg, Sub};

// ─────────────────────────────────────────────────────────────────────────────
// Points and sizes
// ─────────────────────────────────────────────────────────────────────────────

/// 2D point (also used as a displacement)
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ZERO: Point = Point { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point
    pub fn distance(self, other: Point) -> f64 {
        let d = self - other;
        (d.x * d.x + d.y * d.y).sqrt()
    }

    /// Component-wise approximate equality
    pub fn approx_eq(self, other: Point, epsilon: f64) -> bool {
        (self.x - other.x).abs() <= epsilon && (self.y - other.y).abs() <= epsilon
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Point {
    fn add_assign(&mut self, rhs: Point) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Point {
    type Output = Point;

    fn mul(self, rhs: f64) -> Point {
        Point::new(self.x * rhs, self.y * rhs)
    }
}

impl Neg for Point {
    type Output = Point;

    fn neg(self) -> Point {
        Point::new(-self.x, -self.y)
    }
}

/// 2D size
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const ZERO: Size = Size {
        width: 0.0,
        height: 0.0,
    };

    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Convert to a Rect at the origin (0, 0)
    pub const fn to_rect(self) -> Rect {
        Rect {
            origin: Point::ZERO,
            size: self,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Rectangles
// ─────────────────────────────────────────────────────────────────────────────

/// Axis-aligned rectangle
///
/// Written as `[min_x, max_x] × [min_y, max_y]` in docs and tests.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub origin: Point,
    pub size: Size,
}

impl Rect {
    pub const ZERO: Rect = Rect {
        origin: Point::ZERO,
        size: Size::ZERO,
    };

    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            origin: Point::new(x, y),
            size: Size::new(width, height),
        }
    }

    /// Build a rect from its extents
    pub fn from_bounds(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self::new(min_x, min_y, max_x - min_x, max_y - min_y)
    }

    /// Smallest rect containing all given points
    pub fn bounding(points: &[Point]) -> Self {
        let Some(first) = points.first() else {
            return Rect::ZERO;
        };
        let (mut min, mut max) = (*first, *first);
        for p in &points[1..] {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
        }
        Rect::from_bounds(min.x, min.y, max.x, max.y)
    }

    pub fn min_x(&self) -> f64 {
        self.origin.x
    }

    pub fn min_y(&self) -> f64 {
        self.origin.y
    }

    pub fn max_x(&self) -> f64 {
        self.origin.x + self.size.width
    }

    pub fn max_y(&self) -> f64 {
        self.origin.y + self.size.height
    }

    pub fn width(&self) -> f64 {
        self.size.width
    }

    pub fn height(&self) -> f64 {
        self.size.height
    }

    pub fn center(&self) -> Point {
        Point::new(
            self.origin.x + self.size.width * 0.5,
            self.origin.y + self.size.height * 0.5,
        )
    }

    /// True if the rect covers no area
    pub fn is_empty(&self) -> bool {
        self.size.width <= 0.0 || self.size.height <= 0.0
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.min_x()
            && point.x <= self.max_x()
            && point.y >= self.min_y()
            && point.y <= self.max_y()
    }

    /// Smallest rect containing both rects
    ///
    /// An empty rect contributes nothing, so the union of a rect with
    /// `Rect::ZERO` is the rect itself.
    pub fn union(&self, other: &Rect) -> Rect {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        Rect::from_bounds(
            self.min_x().min(other.min_x()),
            self.min_y().min(other.min_y()),
            self.max_x().max(other.max_x()),
            self.max_y().max(other.max_y()),
        )
    }

    /// True if the rects share any point
    pub fn intersects(&self, other: &Rect) -> bool {
        self.min_x() <= other.max_x()
            && other.min_x() <= self.max_x()
            && self.min_y() <= other.max_y()
            && other.min_y() <= self.max_y()
    }

    pub fn translate(&self, offset: Point) -> Rect {
        Rect {
            origin: self.origin + offset,
            size: self.size,
        }
    }

    /// Corner points in clockwise order starting at the origin
    pub fn corners(&self) -> [Point; 4] {
        [
            Point::new(self.min_x(), self.min_y()),
            Point::new(self.max_x(), self.min_y()),
            Point::new(self.max_x(), self.max_y()),
            Point::new(self.min_x(), self.max_y()),
        ]
    }

    pub fn approx_eq(&self, other: &Rect, epsilon: f64) -> bool {
        self.origin.approx_eq(other.origin, epsilon)
            && (self.size.width - other.size.width).abs() <= epsilon
            && (self.size.height - other.size.height).abs() <= epsilon
    }
}

impl From<Size> for Rect {
    fn from(size: Size) -> Self {
        size.to_rect()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Affine transforms
// ─────────────────────────────────────────────────────────────────────────────

/// 2D affine transform
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Affine2D {
    /// Matrix elements [a, b, c, d, tx, ty]
    /// | a  c  tx |
    /// | b  d  ty |
    /// | 0  0   1 |
    pub elements: [f64; 6],
}

impl Default for Affine2D {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Affine2D {
    pub const IDENTITY: Affine2D = Affine2D {
        elements: [1.0, 0.0, 0.0, 1.0, 0.0, 0.0],
    };

    pub fn translation(x: f64, y: f64) -> Self {
        Self {
            elements: [1.0, 0.0, 0.0, 1.0, x, y],
        }
    }

    pub fn scale(sx: f64, sy: f64) -> Self {
        Self {
            elements: [sx, 0.0, 0.0, sy, 0.0, 0.0],
        }
    }

    /// Rotation by `angle` radians around the origin
    pub fn rotation(angle: f64) -> Self {
        let (sin, cos) = angle.sin_cos();
        Self {
            elements: [cos, sin, -sin, cos, 0.0, 0.0],
        }
    }

    /// Linear part given as a row-major 2x2 matrix, no translation
    pub fn linear(m00: f64, m01: f64, m10: f64, m11: f64) -> Self {
        Self {
            elements: [m00, m10, m01, m11, 0.0, 0.0],
        }
    }

    /// `self` applied after `first`
    pub fn then_after(&self, first: &Affine2D) -> Affine2D {
        let [a1, b1, c1, d1, tx1, ty1] = first.elements;
        let [a2, b2, c2, d2, tx2, ty2] = self.elements;
        Affine2D {
            elements: [
                a2 * a1 + c2 * b1,
                b2 * a1 + d2 * b1,
                a2 * c1 + c2 * d1,
                b2 * c1 + d2 * d1,
                a2 * tx1 + c2 * ty1 + tx2,
                b2 * tx1 + d2 * ty1 + ty2,
            ],
        }
    }

    pub fn determinant(&self) -> f64 {
        let [a, b, c, d, _, _] = self.elements;
        a * d - b * c
    }

    /// Inverse transform, `None` if the transform collapses the plane
    ///
    /// The determinant is compared against the size of the linear part, so a
    /// uniform scale by any finite non-zero factor stays invertible.
    pub fn invert(&self) -> Option<Affine2D> {
        let det = self.determinant();
        let [a, b, c, d, tx, ty] = self.elements;
        let largest = a.abs().max(b.abs()).max(c.abs()).max(d.abs());
        if !det.is_finite() || det == 0.0 || det.abs() <= f64::EPSILON * largest * largest {
            return None;
        }
        let inv = 1.0 / det;
        let (ia, ib, ic, id) = (d * inv, -b * inv, -c * inv, a * inv);
        Some(Affine2D {
            elements: [ia, ib, ic, id, -(ia * tx + ic * ty), -(ib * tx + id * ty)],
        })
    }

    pub fn transform_point(&self, p: Point) -> Point {
        let [a, b, c, d, tx, ty] = self.elements;
        Point::new(a * p.x + c * p.y + tx, b * p.x + d * p.y + ty)
    }

    /// Bounding box of the transformed rect
    pub fn transform_rect(&self, rect: &Rect) -> Rect {
        let corners = rect.corners().map(|p| self.transform_point(p));
        Rect::bounding(&corners)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Color
// ─────────────────────────────────────────────────────────────────────────────

/// RGBA color with components in [0, 1]
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);
    pub const BLACK: Color = Color::rgb(0.0, 0.0, 0.0);
    pub const GRAY: Color = Color::rgb(0.5, 0.5, 0.5);
    pub const BLUE: Color = Color::rgb(0.0, 0.0, 1.0);
    pub const TRANSPARENT: Color = Color::rgba(0.0, 0.0, 0.0, 0.0);

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_rect_union_ignores_empty() {
        let a = Rect::from_bounds(0.0, 0.0, 10.0, 5.0);
        assert_eq!(a.union(&Rect::ZERO), a);
        assert_eq!(Rect::ZERO.union(&a), a);

        let b = Rect::from_bounds(10.0, 0.0, 18.0, 5.0);
        assert_eq!(a.union(&b), Rect::from_bounds(0.0, 0.0, 18.0, 5.0));
    }

    #[test]
    fn test_affine_invert_roundtrip() {
        let t = Affine2D::translation(3.0, -2.0)
            .then_after(&Affine2D::rotation(0.7))
            .then_after(&Affine2D::scale(1.1, 1.1));
        let inv = t.invert().unwrap();
        let p = Point::new(12.5, -4.0);
        assert!(inv.transform_point(t.transform_point(p)).approx_eq(p, EPS));
    }

    #[test]
    fn test_affine_singular_has_no_inverse() {
        assert!(Affine2D::linear(1.0, 0.0, 0.0, 0.0).invert().is_none());
        // a quarter turn about an in-plane axis, cos(90°) is not exactly zero
        let (_, cos) = std::f64::consts::FRAC_PI_2.sin_cos();
        assert!(Affine2D::linear(cos, 0.0, 0.0, 1.0).invert().is_none());
    }

    #[test]
    fn test_affine_tiny_scale_is_invertible() {
        let t = Affine2D::translation(50.0, 50.0).then_after(&Affine2D::scale(1e-7, 1e-7));
        let inv = t.invert().unwrap();
        let p = Point::new(50.0 + 3e-7, 50.0 - 1e-7);
        assert!(inv.transform_point(p).approx_eq(Point::new(3.0, -1.0), 1e-6));
    }

    #[test]
    fn test_then_after_order() {
        // scale first, then translate
        let t = Affine2D::translation(5.0, 0.0).then_after(&Affine2D::scale(2.0, 2.0));
        assert!(t.transform_point(Point::new(1.0, 1.0)).approx_eq(Point::new(7.0, 2.0), EPS));
    }

    #[test]
    fn test_transform_rect_bounds() {
        let r = Rect::from_bounds(0.0, 0.0, 100.0, 100.0);
        let zoom = Affine2D::translation(-5.0, -5.0).then_after(&Affine2D::scale(1.1, 1.1));
        let out = zoom.transform_rect(&r);
        assert!(out.approx_eq(&Rect::from_bounds(-5.0, -5.0, 105.0, 105.0), EPS));
    }
}
