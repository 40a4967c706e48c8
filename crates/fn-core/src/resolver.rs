//! Transform resolution: which element is "the canvas", and what its live
//! screen matrix is.
//!
//! The DOM walk itself lives in the WASM bridge. This module holds the seam
//! (`TransformResolver`) plus the pure selection rules so they can be tested
//! without a browser.

use crate::geometry::ScreenMatrix;
use kurbo::{Rect, Vec2};

/// The diagram's screen mapping for the current frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedTransform {
    /// `screen = matrix · intrinsic`, relative to the diagram's own window.
    pub matrix: ScreenMatrix,
    /// Sum of the top-left corners of every same-origin frame element
    /// between the diagram's window and the top-level window.
    pub frame_offset: Vec2,
}

impl ResolvedTransform {
    pub fn new(matrix: ScreenMatrix) -> Self {
        Self {
            matrix,
            frame_offset: Vec2::ZERO,
        }
    }

    pub fn with_frame_offset(mut self, offset: Vec2) -> Self {
        self.frame_offset = offset;
        self
    }
}

/// Produces a fresh transform on demand.
///
/// Returns `None` when no canvas element can be found or its matrix is
/// unavailable; callers treat that as "resolution unavailable" and keep
/// overlays where they are.
pub trait TransformResolver {
    fn resolve(&mut self) -> Option<ResolvedTransform>;
}

impl<F> TransformResolver for F
where
    F: FnMut() -> Option<ResolvedTransform>,
{
    fn resolve(&mut self) -> Option<ResolvedTransform> {
        self()
    }
}

// ─── Canvas selection ────────────────────────────────────────────────────

/// Which kind of element a candidate is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateKind {
    /// An `<svg>` root.
    SvgRoot,
    /// A `<g transform=...>` group inside the chosen root.
    TransformGroup,
}

/// A possible canvas element and where it was found.
#[derive(Debug, Clone)]
pub struct CanvasCandidate<T> {
    pub handle: T,
    pub kind: CandidateKind,
    /// Rendered bounding box in the candidate's own window.
    pub bounds: Rect,
    /// Accumulated frame offset of the window the candidate lives in.
    pub frame_offset: Vec2,
}

impl<T> CanvasCandidate<T> {
    pub fn area(&self) -> f64 {
        let a = self.bounds.width().abs() * self.bounds.height().abs();
        if a.is_finite() { a } else { 0.0 }
    }
}

/// Pick the largest-by-rendered-area candidate.
///
/// Zero-area candidates (hidden, collapsed) never win. Ties keep the first
/// candidate in document order.
pub fn pick_largest<T>(
    candidates: impl IntoIterator<Item = CanvasCandidate<T>>,
) -> Option<CanvasCandidate<T>> {
    let mut best: Option<CanvasCandidate<T>> = None;
    for candidate in candidates {
        let area = candidate.area();
        if area <= 0.0 {
            continue;
        }
        match &best {
            Some(b) if b.area() >= area => {}
            _ => best = Some(candidate),
        }
    }
    best
}

/// Choose the canvas: the largest SVG root, refined to its largest
/// transform-bearing group when `prefer_group` is set and one exists.
///
/// `groups_of` is asked for the groups inside the winning root only.
pub fn choose_canvas<T, G>(
    roots: impl IntoIterator<Item = CanvasCandidate<T>>,
    prefer_group: bool,
    groups_of: G,
) -> Option<CanvasCandidate<T>>
where
    G: FnOnce(&CanvasCandidate<T>) -> Vec<CanvasCandidate<T>>,
{
    let root = pick_largest(roots)?;
    if !prefer_group {
        return Some(root);
    }
    match pick_largest(groups_of(&root)) {
        Some(group) => Some(group),
        None => Some(root),
    }
}

/// Sum the top-left corners of the frame elements enclosing a window.
/// Non-finite corners are skipped.
pub fn accumulate_frame_offset(frame_origins: impl IntoIterator<Item = (f64, f64)>) -> Vec2 {
    frame_origins
        .into_iter()
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .fold(Vec2::ZERO, |acc, (x, y)| acc + Vec2::new(x, y))
}
