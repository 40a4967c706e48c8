//! Per-frame reconciliation: re-derive every overlay's screen placement from
//! its anchor and the live transform.
//!
//! A tick is O(overlays) and never does I/O. Failure handling is
//! stale-but-visible throughout: when the transform is missing, a mapping
//! fails, or a computed position looks like a mid-transition artifact, the
//! overlay simply stays where it was.

use crate::anchor::{Anchor, SizeLocks};
use crate::config::{JumpThresholds, ReconcileConfig};
use crate::id::OverlayId;
use crate::mapper::CoordinateMapper;
use crate::resolver::ResolvedTransform;
use kurbo::{Point, Size};

// ─── Overlay state ───────────────────────────────────────────────────────

/// How an overlay's displayed size responds to zoom.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Sizing {
    /// Note editors: fixed-layout element scaled by a clamped factor
    /// relative to its baseline size.
    Scaled { base: Size },
    /// Highlight rectangles: width/height follow the projected geometry.
    Exact,
}

/// Where and how an overlay should be drawn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub top_left: Point,
    /// Displayed size in pixels (after scaling).
    pub size: Size,
    /// CSS scale factor; always 1.0 for `Sizing::Exact`.
    pub scale: f64,
    pub opacity: f64,
}

/// Reconciliation-relevant state carried by one overlay.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayState {
    pub anchor: Option<Anchor>,
    pub sizing: Sizing,
    /// While set, the reconciler never writes this overlay.
    pub dragging: bool,
    /// Currently displayed top-left.
    pub position: Point,
    /// Last position that passed jump suppression.
    pub last_accepted: Option<Point>,
    /// Last placement handed to the display.
    pub placement: Option<Placement>,
}

impl OverlayState {
    pub fn new(position: Point, sizing: Sizing) -> Self {
        Self {
            anchor: None,
            sizing,
            dragging: false,
            position,
            last_accepted: None,
            placement: None,
        }
    }

    pub fn with_anchor(mut self, anchor: Option<Anchor>) -> Self {
        self.anchor = anchor;
        self
    }

    /// Replace the anchor after a user placement and accept `position` as
    /// the new reference for jump suppression.
    pub fn reanchor(&mut self, anchor: Option<Anchor>, position: Point) {
        self.anchor = anchor;
        self.position = position;
        self.last_accepted = Some(position);
    }
}

// ─── Outcomes ────────────────────────────────────────────────────────────

/// Why a computed position was rejected as an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JumpKind {
    /// Large move while heavily zoomed out.
    ZoomedOut,
    /// Sudden collapse into the region around the viewport origin.
    CollapsedToOrigin,
}

/// Why an overlay was left at its previous position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaleReason {
    TransformUnavailable,
    MappingFailed,
    BadDimensions,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// New placement; the display must be updated.
    Placed(Placement),
    /// Accepted, but identical to what is already displayed.
    Unchanged,
    Suppressed(JumpKind),
    Stale(StaleReason),
    Dragging,
    Unanchored,
}

/// Aggregate of one tick over all overlays.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    /// Overlays whose display must be written, in iteration order.
    pub placed: Vec<(OverlayId, Placement)>,
    pub unchanged: usize,
    pub suppressed: usize,
    pub stale: usize,
    pub dragging: usize,
    pub unanchored: usize,
}

impl TickReport {
    fn record(&mut self, id: OverlayId, outcome: TickOutcome) {
        match outcome {
            TickOutcome::Placed(p) => self.placed.push((id, p)),
            TickOutcome::Unchanged => self.unchanged += 1,
            TickOutcome::Suppressed(_) => self.suppressed += 1,
            TickOutcome::Stale(_) => self.stale += 1,
            TickOutcome::Dragging => self.dragging += 1,
            TickOutcome::Unanchored => self.unanchored += 1,
        }
    }
}

// ─── Reconciler ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct Reconciler {
    config: ReconcileConfig,
}

impl Reconciler {
    pub fn new(config: ReconcileConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ReconcileConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: ReconcileConfig) {
        self.config = config;
    }

    /// Run one tick over every overlay.
    ///
    /// `transform` must be freshly resolved for this frame.
    pub fn tick<'a>(
        &self,
        transform: Option<&ResolvedTransform>,
        overlays: impl IntoIterator<Item = (OverlayId, &'a mut OverlayState)>,
        locks: &SizeLocks,
    ) -> TickReport {
        let mapper = transform
            .map(CoordinateMapper::from_transform)
            .filter(CoordinateMapper::is_usable);
        let mut report = TickReport::default();
        for (id, state) in overlays {
            let outcome = self.reconcile_one(id, state, mapper.as_ref(), locks);
            report.record(id, outcome);
        }
        if report.suppressed > 0 || report.stale > 0 {
            log::trace!(
                "tick: {} placed, {} suppressed, {} stale",
                report.placed.len(),
                report.suppressed,
                report.stale
            );
        }
        report
    }

    /// Reconcile a single overlay against an already-built mapper.
    pub fn reconcile_one(
        &self,
        id: OverlayId,
        state: &mut OverlayState,
        mapper: Option<&CoordinateMapper>,
        locks: &SizeLocks,
    ) -> TickOutcome {
        if state.dragging {
            return TickOutcome::Dragging;
        }
        let Some(anchor) = state.anchor else {
            return TickOutcome::Unanchored;
        };
        let Some(mapper) = mapper else {
            return TickOutcome::Stale(StaleReason::TransformUnavailable);
        };
        let Some(projection) = anchor.project(mapper) else {
            return TickOutcome::Stale(StaleReason::MappingFailed);
        };

        // Highlights follow the projection as-is.
        let exact = state.sizing == Sizing::Exact;
        let scale = mapper.effective_scale();
        if !exact
            && let Some(prior) = state.last_accepted
            && let Some(kind) = check_jump(&self.config.jump, prior, projection.top_left, scale)
        {
            log::warn!(
                "suppressed {kind:?} jump for {id}: {prior:?} -> {:?} at scale {scale:.3}",
                projection.top_left
            );
            return TickOutcome::Suppressed(kind);
        }

        let size = match (state.sizing, id.note().and_then(|n| locks.get(n))) {
            (Sizing::Scaled { .. }, Some(locked)) => locked,
            _ => projection.size,
        };
        if !exact && !(self.config.dimension_ok(size.width) && self.config.dimension_ok(size.height)) {
            log::trace!("rejecting {id}: projected size {size:?} out of range");
            return TickOutcome::Stale(StaleReason::BadDimensions);
        }

        let placement = self.place(state.sizing, projection.top_left, size);
        state.position = placement.top_left;
        state.last_accepted = Some(placement.top_left);
        if state.placement == Some(placement) {
            return TickOutcome::Unchanged;
        }
        state.placement = Some(placement);
        TickOutcome::Placed(placement)
    }

    fn place(&self, sizing: Sizing, top_left: Point, size: Size) -> Placement {
        match sizing {
            Sizing::Exact => Placement {
                top_left,
                size,
                scale: 1.0,
                opacity: 1.0,
            },
            Sizing::Scaled { base } => {
                let base_w = if base.width > 0.0 { base.width } else { self.config.base_width };
                let base_h = if base.height > 0.0 { base.height } else { self.config.base_height };
                let raw = (size.width / base_w).min(size.height / base_h);
                let scale = self.config.clamp_display_scale(raw);
                let opacity = if scale < self.config.fade_below_scale {
                    self.config.faded_opacity
                } else {
                    1.0
                };
                Placement {
                    top_left,
                    size: Size::new(base_w * scale, base_h * scale),
                    scale,
                    opacity,
                }
            }
        }
    }
}

/// Classify a move from `prior` to `next` as a transient artifact.
pub fn check_jump(
    thresholds: &JumpThresholds,
    prior: Point,
    next: Point,
    scale: f64,
) -> Option<JumpKind> {
    let displacement = prior.distance(next);
    if scale < thresholds.zoomed_out_scale && displacement > thresholds.zoomed_out_max_jump {
        return Some(JumpKind::ZoomedOut);
    }
    let region = thresholds.origin_region;
    let far = thresholds.far_from_origin;
    let near_origin = next.x < region && next.y < region;
    let came_from_afar = prior.x.abs() > far || prior.y.abs() > far;
    if near_origin && came_from_afar && displacement > thresholds.origin_jump {
        return Some(JumpKind::CollapsedToOrigin);
    }
    None
}
