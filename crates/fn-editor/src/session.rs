//! The one active pointer interaction: dragging an overlay or drawing a
//! highlight rectangle.
//!
//! Exactly one slot exists. Starting a drag while drawing (or the reverse)
//! is refused rather than interleaved.

use fn_core::{OverlayId, Point, Rect};

/// Grab state for an overlay being dragged.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragGrab {
    pub overlay: OverlayId,
    pointer_start: Point,
    origin_start: Point,
}

impl DragGrab {
    /// Overlay top-left for the current pointer, clamped to the viewport
    /// origin.
    pub fn position_for(&self, pointer: Point) -> Point {
        let moved = self.origin_start + (pointer - self.pointer_start);
        Point::new(moved.x.max(0.0), moved.y.max(0.0))
    }
}

/// Rectangle-drawing progress for the editor that asked for it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawState {
    pub owner: OverlayId,
    pub start: Option<Point>,
    pub preview: Option<Rect>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Interaction {
    #[default]
    Idle,
    Dragging(DragGrab),
    Drawing(DrawState),
}

/// Result of a click while drawing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DrawClick {
    /// First corner placed; preview starts at zero size.
    Started(Point),
    /// Rectangle finalised; drawing mode is over.
    Finished { owner: OverlayId, rect: Rect },
    /// Click landed on an overlay or closed a zero-size rectangle.
    Ignored,
    /// Not drawing.
    Inactive,
}

#[derive(Debug, Default)]
pub struct InteractionSession {
    slot: Interaction,
}

impl InteractionSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> &Interaction {
        &self.slot
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.slot, Interaction::Idle)
    }

    pub fn is_drawing(&self) -> bool {
        matches!(self.slot, Interaction::Drawing(_))
    }

    pub fn dragged(&self) -> Option<OverlayId> {
        match self.slot {
            Interaction::Dragging(grab) => Some(grab.overlay),
            _ => None,
        }
    }

    /// Whether `id` takes part in the active interaction.
    pub fn involves(&self, id: OverlayId) -> bool {
        match self.slot {
            Interaction::Dragging(grab) => grab.overlay == id,
            Interaction::Drawing(draw) => draw.owner == id,
            Interaction::Idle => false,
        }
    }

    // ─── Drag ────────────────────────────────────────────────────────────

    pub fn begin_drag(&mut self, overlay: OverlayId, pointer: Point, origin: Point) -> bool {
        if !self.is_idle() {
            log::debug!("drag of {overlay} refused: {:?} in progress", self.slot);
            return false;
        }
        self.slot = Interaction::Dragging(DragGrab {
            overlay,
            pointer_start: pointer,
            origin_start: origin,
        });
        true
    }

    pub fn drag_to(&self, pointer: Point) -> Option<(OverlayId, Point)> {
        match self.slot {
            Interaction::Dragging(grab) => Some((grab.overlay, grab.position_for(pointer))),
            _ => None,
        }
    }

    pub fn end_drag(&mut self) -> Option<OverlayId> {
        let id = self.dragged()?;
        self.slot = Interaction::Idle;
        Some(id)
    }

    // ─── Drawing ─────────────────────────────────────────────────────────

    /// Enter drawing mode for `owner`. Replaces an earlier drawing; refused
    /// during a drag.
    pub fn start_drawing(&mut self, owner: OverlayId) -> bool {
        match self.slot {
            Interaction::Dragging(_) => return false,
            Interaction::Drawing(prev) => {
                log::debug!("drawing for {} replaced by {owner}", prev.owner);
            }
            Interaction::Idle => {}
        }
        self.slot = Interaction::Drawing(DrawState {
            owner,
            start: None,
            preview: None,
        });
        true
    }

    /// `on_overlay` is the overlay under the click, if any.
    pub fn draw_click(&mut self, at: Point, on_overlay: Option<OverlayId>) -> DrawClick {
        let Interaction::Drawing(draw) = &mut self.slot else {
            return DrawClick::Inactive;
        };
        if on_overlay.is_some() {
            return DrawClick::Ignored;
        }
        let Some(start) = draw.start else {
            draw.start = Some(at);
            draw.preview = Some(Rect::from_points(at, at));
            return DrawClick::Started(at);
        };
        let rect = Rect::from_points(start, at);
        if rect.width() < 1.0 || rect.height() < 1.0 {
            return DrawClick::Ignored;
        }
        let owner = draw.owner;
        self.slot = Interaction::Idle;
        DrawClick::Finished { owner, rect }
    }

    /// Update the preview rectangle. `None` before the first click.
    pub fn draw_move(&mut self, at: Point) -> Option<Rect> {
        let Interaction::Drawing(draw) = &mut self.slot else {
            return None;
        };
        let start = draw.start?;
        let rect = Rect::from_points(start, at);
        draw.preview = Some(rect);
        Some(rect)
    }

    /// Escape: leave drawing mode. Returns whether anything was cancelled.
    pub fn cancel_drawing(&mut self) -> bool {
        if self.is_drawing() {
            self.slot = Interaction::Idle;
            true
        } else {
            false
        }
    }

    /// Drop whatever is active if it involves `id` (the overlay is gone).
    pub fn release(&mut self, id: OverlayId) {
        if self.involves(id) {
            self.slot = Interaction::Idle;
        }
    }
}
