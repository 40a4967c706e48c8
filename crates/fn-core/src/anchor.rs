//! Anchors: where an overlay sits in diagram-intrinsic space.
//!
//! An anchor is captured from an overlay's screen rect whenever the user
//! places it (creation, drag end, highlight drawn) and is replaced wholesale
//! on the next placement, never edited in place.

use crate::geometry::DiagramPoint;
use crate::id::NoteId;
use crate::mapper::CoordinateMapper;
use kurbo::{Point, Rect, Size};
use std::collections::HashMap;

// ─── Anchor ──────────────────────────────────────────────────────────────

/// Intrinsic-space corners of a placed overlay.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Corners {
    pub top_left: DiagramPoint,
    pub top_right: DiagramPoint,
    pub bottom_left: DiagramPoint,
    /// Absent on records written by clients that only stored three corners.
    pub bottom_right: Option<DiagramPoint>,
    /// Stored alongside the corners; not used for placement.
    pub center: Option<DiagramPoint>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Anchor {
    /// Full capture: size follows the diagram geometry.
    Corners(Corners),
    /// Fallback when corner capture failed: one reference point plus the
    /// pixel size at capture. Size is re-derived from the scale ratio.
    Point {
        origin: DiagramPoint,
        width: f64,
        height: f64,
        /// Effective scale when captured; `None` for records that only kept
        /// a top/left pair, whose size is then used as-is.
        captured_scale: Option<f64>,
    },
}

/// Screen-space result of projecting an anchor through the live transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    pub top_left: Point,
    pub size: Size,
}

impl Anchor {
    /// Reference point used for placement.
    pub fn origin(&self) -> DiagramPoint {
        match self {
            Anchor::Corners(c) => c.top_left,
            Anchor::Point { origin, .. } => *origin,
        }
    }

    pub fn corners(&self) -> Option<&Corners> {
        match self {
            Anchor::Corners(c) => Some(c),
            Anchor::Point { .. } => None,
        }
    }

    /// Project into screen space. `None` when any mapping fails.
    pub fn project(&self, mapper: &CoordinateMapper) -> Option<Projection> {
        match self {
            Anchor::Corners(c) => {
                let tl = mapper.to_screen(c.top_left)?;
                let tr = mapper.to_screen(c.top_right)?;
                let bl = mapper.to_screen(c.bottom_left)?;
                Some(Projection {
                    top_left: tl,
                    size: Size::new(tl.distance(tr), tl.distance(bl)),
                })
            }
            Anchor::Point {
                origin,
                width,
                height,
                captured_scale,
            } => {
                let tl = mapper.to_screen(*origin)?;
                let ratio = match captured_scale {
                    Some(s) if s.is_finite() && *s > 0.0 => mapper.effective_scale() / s,
                    _ => 1.0,
                };
                let size = Size::new(width * ratio, height * ratio);
                if !(size.width.is_finite() && size.height.is_finite()) {
                    return None;
                }
                Some(Projection { top_left: tl, size })
            }
        }
    }
}

// ─── Capture ─────────────────────────────────────────────────────────────

/// Capture an anchor from an overlay's current screen rect.
///
/// All four corners (plus center) are converted. If any conversion fails the
/// top-left corner alone is kept together with the pixel size. Returns
/// `None` only when no transform is available or even the top-left fails.
pub fn capture_anchor(rect: Rect, mapper: Option<&CoordinateMapper>) -> Option<Anchor> {
    let mapper = mapper?;
    let rect = rect.abs();

    let corners = (|| {
        Some(Corners {
            top_left: mapper.to_intrinsic(Point::new(rect.x0, rect.y0))?,
            top_right: mapper.to_intrinsic(Point::new(rect.x1, rect.y0))?,
            bottom_left: mapper.to_intrinsic(Point::new(rect.x0, rect.y1))?,
            bottom_right: Some(mapper.to_intrinsic(Point::new(rect.x1, rect.y1))?),
            center: Some(mapper.to_intrinsic(rect.center())?),
        })
    })();
    if let Some(corners) = corners {
        return Some(Anchor::Corners(corners));
    }

    let origin = mapper.to_intrinsic(Point::new(rect.x0, rect.y0))?;
    log::warn!("corner capture failed for {rect:?}; anchoring top-left with cached size");
    Some(Anchor::Point {
        origin,
        width: rect.width(),
        height: rect.height(),
        captured_scale: Some(mapper.effective_scale()),
    })
}

// ─── Size locks ──────────────────────────────────────────────────────────

/// Exact creation-time pixel sizes, keyed by note.
///
/// A locked note keeps this size on every tick instead of one re-derived
/// from projected corners, which is unstable near degenerate zoom levels.
#[derive(Debug, Clone, Default)]
pub struct SizeLocks {
    sizes: HashMap<NoteId, Size>,
}

impl SizeLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock a note's size. Non-finite or empty sizes are ignored.
    pub fn lock(&mut self, id: NoteId, size: Size) {
        if size.width.is_finite() && size.height.is_finite() && size.width > 0.0 && size.height > 0.0
        {
            self.sizes.insert(id, size);
        }
    }

    pub fn unlock(&mut self, id: NoteId) {
        self.sizes.remove(&id);
    }

    pub fn get(&self, id: NoteId) -> Option<Size> {
        self.sizes.get(&id).copied()
    }

    pub fn is_locked(&self, id: NoteId) -> bool {
        self.sizes.contains_key(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::ScreenMatrix;
    use kurbo::Vec2;

    fn mapper(scale: f64, tx: f64, ty: f64) -> CoordinateMapper {
        CoordinateMapper::new(ScreenMatrix::scale_translate(scale, tx, ty), Vec2::ZERO)
    }

    #[test]
    fn capture_converts_all_corners() {
        let m = mapper(2.0, 100.0, 0.0);
        let anchor = capture_anchor(Rect::new(100.0, 100.0, 400.0, 220.0), Some(&m)).unwrap();
        let c = anchor.corners().expect("corner anchor");
        assert_eq!(c.top_left, DiagramPoint::new(0.0, 50.0));
        assert_eq!(c.top_right, DiagramPoint::new(150.0, 50.0));
        assert_eq!(c.bottom_left, DiagramPoint::new(0.0, 110.0));
        assert_eq!(c.bottom_right, Some(DiagramPoint::new(150.0, 110.0)));
        assert_eq!(c.center, Some(DiagramPoint::new(75.0, 80.0)));
    }

    #[test]
    fn capture_without_transform_fails() {
        assert!(capture_anchor(Rect::new(0.0, 0.0, 10.0, 10.0), None).is_none());
        let singular = CoordinateMapper::new(ScreenMatrix::new(0.0, 0.0, 0.0, 0.0, 0.0, 0.0), Vec2::ZERO);
        assert!(capture_anchor(Rect::new(0.0, 0.0, 10.0, 10.0), Some(&singular)).is_none());
    }

    #[test]
    fn capture_falls_back_to_point_when_a_corner_overflows() {
        // The far corner overflows to infinity through the inverse while the
        // top-left stays finite.
        let m = mapper(1e-3, 0.0, 0.0);
        let anchor = capture_anchor(Rect::new(0.0, 0.0, f64::MAX, 10.0), Some(&m)).unwrap();
        match anchor {
            Anchor::Point {
                origin,
                captured_scale,
                ..
            } => {
                assert_eq!(origin, DiagramPoint::new(0.0, 0.0));
                assert_eq!(captured_scale, Some(1e-3));
            }
            other => panic!("expected point fallback, got {other:?}"),
        }
    }

    #[test]
    fn corner_projection_tracks_zoom() {
        let capture = mapper(1.0, 0.0, 0.0);
        let anchor = capture_anchor(Rect::new(100.0, 100.0, 400.0, 220.0), Some(&capture)).unwrap();
        let p = anchor.project(&mapper(2.0, 100.0, 100.0)).unwrap();
        assert_eq!(p.top_left, Point::new(300.0, 300.0));
        assert_eq!(p.size, Size::new(600.0, 240.0));
    }

    #[test]
    fn point_projection_rescales_size() {
        let anchor = Anchor::Point {
            origin: DiagramPoint::new(10.0, 10.0),
            width: 300.0,
            height: 100.0,
            captured_scale: Some(1.0),
        };
        let p = anchor.project(&mapper(0.5, 0.0, 0.0)).unwrap();
        assert_eq!(p.top_left, Point::new(5.0, 5.0));
        assert_eq!(p.size, Size::new(150.0, 50.0));

        let unscaled = Anchor::Point {
            origin: DiagramPoint::new(10.0, 10.0),
            width: 300.0,
            height: 100.0,
            captured_scale: None,
        };
        assert_eq!(
            unscaled.project(&mapper(0.5, 0.0, 0.0)).unwrap().size,
            Size::new(300.0, 100.0)
        );
    }

    #[test]
    fn size_locks_ignore_degenerate_sizes() {
        let id = NoteId::intern("lock-test");
        let mut locks = SizeLocks::new();
        locks.lock(id, Size::new(0.0, 10.0));
        assert!(!locks.is_locked(id));
        locks.lock(id, Size::new(300.0, 150.0));
        assert_eq!(locks.get(id), Some(Size::new(300.0, 150.0)));
        locks.unlock(id);
        assert!(locks.get(id).is_none());
    }
}
