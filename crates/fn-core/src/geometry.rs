//! Geometry primitives shared by the mapper, anchors, and the reconciler.
//!
//! Screen space uses `kurbo` types directly (pixels relative to the top-level
//! viewport). Diagram-intrinsic space has its own `DiagramPoint` so the two
//! can never be mixed up by accident, and so anchors serialize cleanly.

use kurbo::{Affine, Point};
use serde::{Deserialize, Serialize};

/// Determinants smaller than this are treated as singular.
const SINGULAR_EPSILON: f64 = 1e-12;

// ─── Diagram-intrinsic point ─────────────────────────────────────────────

/// A point in the diagram's own coordinate system, invariant under pan/zoom.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DiagramPoint {
    pub x: f64,
    pub y: f64,
}

impl DiagramPoint {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Round both axes to `places` decimal places (storage precision).
    pub fn rounded(&self, places: i32) -> Self {
        let f = 10f64.powi(places);
        Self {
            x: (self.x * f).round() / f,
            y: (self.y * f).round() / f,
        }
    }

    pub fn midpoint(&self, other: DiagramPoint) -> Self {
        Self {
            x: (self.x + other.x) / 2.0,
            y: (self.y + other.y) / 2.0,
        }
    }

    fn to_kurbo(self) -> Point {
        Point::new(self.x, self.y)
    }

    fn from_kurbo(p: Point) -> Self {
        Self { x: p.x, y: p.y }
    }
}

pub(crate) fn point_is_finite(p: Point) -> bool {
    p.x.is_finite() && p.y.is_finite()
}

// ─── Screen matrix ───────────────────────────────────────────────────────

/// The diagram's screen transformation: `screen = M · intrinsic`.
///
/// Coefficients follow the SVG `matrix(a b c d e f)` convention, which is
/// also `kurbo::Affine`'s layout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenMatrix(Affine);

impl ScreenMatrix {
    pub const IDENTITY: ScreenMatrix = ScreenMatrix(Affine::IDENTITY);

    pub fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        ScreenMatrix(Affine::new([a, b, c, d, e, f]))
    }

    /// Uniform scale followed by a translation (the common pan/zoom case).
    pub fn scale_translate(scale: f64, tx: f64, ty: f64) -> Self {
        Self::new(scale, 0.0, 0.0, scale, tx, ty)
    }

    pub fn coeffs(&self) -> [f64; 6] {
        self.0.as_coeffs()
    }

    pub fn determinant(&self) -> f64 {
        let [a, b, c, d, _, _] = self.coeffs();
        a * d - b * c
    }

    pub fn is_finite(&self) -> bool {
        self.coeffs().iter().all(|v| v.is_finite())
    }

    /// Inverse matrix, or `None` when the matrix is singular or non-finite.
    pub fn invert(&self) -> Option<ScreenMatrix> {
        if !self.is_finite() {
            return None;
        }
        let det = self.determinant();
        if !det.is_finite() || det.abs() < SINGULAR_EPSILON {
            return None;
        }
        let inv = ScreenMatrix(self.0.inverse());
        inv.is_finite().then_some(inv)
    }

    /// Average per-axis magnitude of the linear part.
    ///
    /// With no rotation this is just the zoom factor.
    pub fn effective_scale(&self) -> f64 {
        let [a, b, c, d, _, _] = self.coeffs();
        (a.hypot(b) + c.hypot(d)) / 2.0
    }

    /// Map a diagram point through the matrix. May be non-finite.
    pub fn apply(&self, p: DiagramPoint) -> Point {
        self.0 * p.to_kurbo()
    }

    /// Map a screen point through the matrix. Only meaningful on an inverse.
    pub fn map_screen(&self, p: Point) -> DiagramPoint {
        DiagramPoint::from_kurbo(self.0 * p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invert_identity() {
        let inv = ScreenMatrix::IDENTITY.invert().unwrap();
        assert_eq!(inv, ScreenMatrix::IDENTITY);
    }

    #[test]
    fn invert_scale_translate() {
        let m = ScreenMatrix::scale_translate(2.0, 10.0, -4.0);
        let inv = m.invert().unwrap();
        let [a, _, _, d, e, f] = inv.coeffs();
        assert!((a - 0.5).abs() < 1e-12);
        assert!((d - 0.5).abs() < 1e-12);
        assert!((e + 5.0).abs() < 1e-12);
        assert!((f - 2.0).abs() < 1e-12);
    }

    #[test]
    fn singular_matrix_has_no_inverse() {
        assert!(ScreenMatrix::new(0.0, 0.0, 0.0, 0.0, 10.0, 10.0).invert().is_none());
        // Rank-1: columns are parallel.
        assert!(ScreenMatrix::new(1.0, 2.0, 2.0, 4.0, 0.0, 0.0).invert().is_none());
    }

    #[test]
    fn non_finite_matrix_has_no_inverse() {
        assert!(ScreenMatrix::new(f64::NAN, 0.0, 0.0, 1.0, 0.0, 0.0).invert().is_none());
        assert!(ScreenMatrix::new(1.0, 0.0, 0.0, 1.0, f64::INFINITY, 0.0).invert().is_none());
    }

    #[test]
    fn effective_scale_averages_axes() {
        assert_eq!(ScreenMatrix::scale_translate(0.3, 5.0, 5.0).effective_scale(), 0.3);
        let m = ScreenMatrix::new(2.0, 0.0, 0.0, 4.0, 0.0, 0.0);
        assert_eq!(m.effective_scale(), 3.0);
        // 90° rotation keeps unit magnitude.
        let r = ScreenMatrix::new(0.0, 1.0, -1.0, 0.0, 0.0, 0.0);
        assert!((r.effective_scale() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn rounding_to_storage_precision() {
        let p = DiagramPoint::new(1.234_567_89, -9.876_543_21).rounded(5);
        assert_eq!(p, DiagramPoint::new(1.23457, -9.87654));
    }
}
