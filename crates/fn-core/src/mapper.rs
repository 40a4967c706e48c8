//! Bidirectional screen ↔ diagram-intrinsic conversion.
//!
//! All screen measurements (overlay rects, pointer events) are taken in the
//! top-level window's frame. The diagram may live inside nested same-origin
//! frames, whose accumulated top-left offset the matrix alone does not know
//! about, so it is subtracted before inverting and added back after mapping.

use crate::geometry::{DiagramPoint, ScreenMatrix, point_is_finite};
use crate::resolver::ResolvedTransform;
use kurbo::{Point, Vec2};

/// Conversion context for one reconciliation tick.
///
/// Built from a fresh `ResolvedTransform` and never kept across ticks. A
/// mapper whose matrix cannot be inverted fails in *both* directions.
#[derive(Debug, Clone, Copy)]
pub struct CoordinateMapper {
    matrix: ScreenMatrix,
    inverse: Option<ScreenMatrix>,
    frame_offset: Vec2,
}

impl CoordinateMapper {
    pub fn new(matrix: ScreenMatrix, frame_offset: Vec2) -> Self {
        let inverse = matrix.invert();
        if inverse.is_none() {
            log::debug!("screen matrix is not invertible: {:?}", matrix.coeffs());
        }
        Self {
            matrix,
            inverse,
            frame_offset,
        }
    }

    pub fn from_transform(transform: &ResolvedTransform) -> Self {
        Self::new(transform.matrix, transform.frame_offset)
    }

    /// Whether conversions can succeed at all.
    pub fn is_usable(&self) -> bool {
        self.inverse.is_some()
    }

    pub fn matrix(&self) -> ScreenMatrix {
        self.matrix
    }

    pub fn effective_scale(&self) -> f64 {
        self.matrix.effective_scale()
    }

    /// Screen pixel (top-level window) → diagram-intrinsic point.
    pub fn to_intrinsic(&self, screen: Point) -> Option<DiagramPoint> {
        let inverse = self.inverse?;
        let local = screen - self.frame_offset;
        let p = inverse.map_screen(local);
        if !p.is_finite() {
            log::warn!("screen→diagram produced non-finite point for {screen:?}");
            return None;
        }
        Some(p)
    }

    /// Diagram-intrinsic point → screen pixel (top-level window).
    ///
    /// Returns `None` for non-finite output; such a value must never reach
    /// an element's style.
    pub fn to_screen(&self, p: DiagramPoint) -> Option<Point> {
        self.inverse?;
        let screen = self.matrix.apply(p) + self.frame_offset;
        if !point_is_finite(screen) {
            log::warn!(
                "diagram→screen produced non-finite point for {p:?} (matrix {:?})",
                self.matrix.coeffs()
            );
            return None;
        }
        Some(screen)
    }
}
