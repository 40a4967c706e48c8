//! Overlay lifecycle: creation, destruction, drag, highlight drawing, and the
//! per-frame tick over the live set.

use crate::pending::OpTracker;
use crate::session::{DrawClick, InteractionSession};
use fn_core::{
    Anchor, CoordinateMapper, NoteId, NoteRecord, OverlayId, OverlayState, Point, Rect,
    ReconcileConfig, Reconciler, ResolvedTransform, Size, SizeLocks, Sizing, TickReport, Vec2,
    capture_anchor,
};
use std::collections::HashMap;

/// Vertical step between notes that have no usable anchor.
const STAGGER_STEP: f64 = 30.0;
/// Where unanchored notes are stacked.
const STAGGER_ORIGIN: Point = Point::new(100.0, 200.0);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayKind {
    /// Unsaved note editor.
    Editor,
    /// Displayed, persisted note.
    Note(NoteId),
    /// Rectangle drawn from an editor or note.
    Highlight { owner: OverlayId },
    /// The floating toolbar. Never anchored, never reconciled.
    Toolbar,
}

impl OverlayKind {
    fn sizing(self, rect: Rect) -> Sizing {
        match self {
            OverlayKind::Highlight { .. } => Sizing::Exact,
            _ => Sizing::Scaled { base: rect.size() },
        }
    }

    pub fn is_reconciled(self) -> bool {
        !matches!(self, OverlayKind::Toolbar)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Overlay {
    pub kind: OverlayKind,
    pub state: OverlayState,
}

/// Anchor write-back produced when a saved note is dropped after a drag.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnchorWrite {
    pub note: NoteId,
    pub anchor: Anchor,
}

/// Outcome of a click routed through drawing mode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DrawOutcome {
    Started(Point),
    /// A highlight overlay was created at `rect`.
    Created { highlight: OverlayId, rect: Rect },
    Ignored,
    /// Finished, but the highlight could not be anchored to the canvas.
    Unanchored,
    Inactive,
}

#[derive(Debug, Default)]
pub struct OverlayManager {
    overlays: HashMap<OverlayId, Overlay>,
    reconciler: Reconciler,
    locks: SizeLocks,
    session: InteractionSession,
    ops: OpTracker,
}

impl OverlayManager {
    pub fn new(config: ReconcileConfig) -> Self {
        Self {
            reconciler: Reconciler::new(config),
            ..Self::default()
        }
    }

    pub fn config(&self) -> &ReconcileConfig {
        self.reconciler.config()
    }

    pub fn set_config(&mut self, config: ReconcileConfig) {
        self.reconciler.set_config(config);
    }

    pub fn get(&self, id: OverlayId) -> Option<&Overlay> {
        self.overlays.get(&id)
    }

    pub fn contains(&self, id: OverlayId) -> bool {
        self.overlays.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.overlays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.overlays.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = OverlayId> + '_ {
        self.overlays.keys().copied()
    }

    pub fn session(&self) -> &InteractionSession {
        &self.session
    }

    pub fn ops(&mut self) -> &mut OpTracker {
        &mut self.ops
    }

    pub fn locks(&self) -> &SizeLocks {
        &self.locks
    }

    // ─── Create / destroy ────────────────────────────────────────────────

    /// Insert an overlay placed at `rect` on screen and capture its anchor
    /// against `transform`.
    pub fn create(
        &mut self,
        kind: OverlayKind,
        rect: Rect,
        transform: Option<&ResolvedTransform>,
    ) -> OverlayId {
        let anchor = if kind.is_reconciled() {
            let mapper = transform.map(CoordinateMapper::from_transform);
            capture_anchor(rect, mapper.as_ref())
        } else {
            None
        };
        let mut state = OverlayState::new(rect.origin(), kind.sizing(rect));
        state.reanchor(anchor, rect.origin());
        self.insert(kind, state)
    }

    /// Insert an overlay whose anchor is already known, e.g. from a stored
    /// record. It is shown at `rect` until the first tick places it.
    pub fn create_anchored(&mut self, kind: OverlayKind, rect: Rect, anchor: Option<Anchor>) -> OverlayId {
        let state = OverlayState::new(rect.origin(), kind.sizing(rect)).with_anchor(anchor);
        self.insert(kind, state)
    }

    fn insert(&mut self, kind: OverlayKind, state: OverlayState) -> OverlayId {
        let id = match kind {
            OverlayKind::Note(note) => OverlayId::Note(note),
            _ => OverlayId::transient(),
        };
        if self.overlays.contains_key(&id) {
            self.destroy(id);
        }
        log::debug!("created {kind:?} overlay {id}");
        self.overlays.insert(id, Overlay { kind, state });
        id
    }

    /// Remove an overlay and everything it owns. Returns every removed id.
    pub fn destroy(&mut self, id: OverlayId) -> Vec<OverlayId> {
        let mut removed = Vec::new();
        if self.overlays.remove(&id).is_none() {
            return removed;
        }
        self.forget(id);
        removed.push(id);
        let owned: Vec<OverlayId> = self
            .overlays
            .iter()
            .filter(|(_, o)| o.kind == OverlayKind::Highlight { owner: id })
            .map(|(k, _)| *k)
            .collect();
        for child in owned {
            removed.extend(self.destroy(child));
        }
        removed
    }

    fn forget(&mut self, id: OverlayId) {
        self.session.release(id);
        self.ops.invalidate(id);
    }

    /// The note was deleted remotely: remove its overlays and its size lock.
    pub fn deleted(&mut self, note: NoteId) -> Vec<OverlayId> {
        self.locks.unlock(note);
        self.destroy(OverlayId::Note(note))
    }

    /// Drop overlays whose visual element no longer exists.
    pub fn retain_live(&mut self, is_live: impl Fn(OverlayId) -> bool) -> Vec<OverlayId> {
        let gone: Vec<OverlayId> = self.ids().filter(|id| !is_live(*id)).collect();
        let mut removed = Vec::new();
        for id in gone {
            removed.extend(self.destroy(id));
        }
        if !removed.is_empty() {
            log::debug!("{} overlays left the document", removed.len());
        }
        removed
    }

    /// Remove every displayed note. Returns the removed ids and the number
    /// of notes (not counting their highlights).
    pub fn clear_notes(&mut self) -> (Vec<OverlayId>, usize) {
        let notes: Vec<OverlayId> = self
            .overlays
            .iter()
            .filter(|(_, o)| matches!(o.kind, OverlayKind::Note(_)))
            .map(|(id, _)| *id)
            .collect();
        let count = notes.len();
        let mut removed = Vec::new();
        for id in notes {
            removed.extend(self.destroy(id));
        }
        (removed, count)
    }

    /// Replace all displayed notes with `records`. `note_size` is the
    /// footprint of a freshly displayed note element. Records without an id
    /// are skipped. Returns the removed ids and the created ones.
    pub fn display_records(
        &mut self,
        records: &[NoteRecord],
        note_size: Size,
    ) -> (Vec<OverlayId>, Vec<OverlayId>) {
        let (removed, _) = self.clear_notes();
        let mut created = Vec::with_capacity(records.len());
        for (i, record) in records.iter().enumerate() {
            let Some(note) = record.id else {
                continue;
            };
            let origin = STAGGER_ORIGIN + Vec2::new(0.0, STAGGER_STEP * i as f64);
            let rect = Rect::from_origin_size(origin, note_size);
            let anchor = record.anchor(note_size.width, note_size.height);
            created.push(self.create_anchored(OverlayKind::Note(note), rect, anchor));
        }
        (removed, created)
    }

    /// A draft was saved as `note`: remember its on-screen size for that
    /// note and remove the editor. Highlights drawn from it stay, owned by
    /// the note.
    pub fn saved(&mut self, draft: OverlayId, note: NoteId, size: Size) -> Vec<OverlayId> {
        self.locks.lock(note, size);
        let target = OverlayId::Note(note);
        for o in self.overlays.values_mut() {
            if o.kind == (OverlayKind::Highlight { owner: draft }) {
                o.kind = OverlayKind::Highlight { owner: target };
            }
        }
        self.destroy(draft)
    }

    // ─── Drag ────────────────────────────────────────────────────────────

    pub fn begin_drag(&mut self, id: OverlayId, pointer: Point) -> bool {
        let Some(overlay) = self.overlays.get_mut(&id) else {
            return false;
        };
        if matches!(overlay.kind, OverlayKind::Highlight { .. }) {
            return false;
        }
        if !self.session.begin_drag(id, pointer, overlay.state.position) {
            return false;
        }
        overlay.state.dragging = true;
        true
    }

    /// New top-left of the dragged overlay for `pointer`.
    pub fn drag_to(&mut self, pointer: Point) -> Option<(OverlayId, Point)> {
        let (id, position) = self.session.drag_to(pointer)?;
        let overlay = self.overlays.get_mut(&id)?;
        overlay.state.position = position;
        Some((id, position))
    }

    /// Drop the dragged overlay at its current screen `rect` and re-anchor
    /// it. A saved note yields the anchor fields to write back.
    pub fn end_drag(&mut self, rect: Rect, transform: Option<&ResolvedTransform>) -> Option<AnchorWrite> {
        let id = self.session.end_drag()?;
        let overlay = self.overlays.get_mut(&id)?;
        overlay.state.dragging = false;
        if !overlay.kind.is_reconciled() {
            overlay.state.position = rect.origin();
            return None;
        }
        let mapper = transform.map(CoordinateMapper::from_transform);
        let Some(anchor) = capture_anchor(rect, mapper.as_ref()) else {
            // Old anchor stays; the next tick moves the overlay back.
            log::warn!("could not re-anchor {id} after drag");
            overlay.state.position = rect.origin();
            return None;
        };
        overlay.state.reanchor(Some(anchor), rect.origin());
        overlay.state.placement = None;
        match overlay.kind {
            OverlayKind::Note(note) => Some(AnchorWrite { note, anchor }),
            _ => None,
        }
    }

    /// Anchor to persist for `id`, captured from its current screen rect.
    /// When the canvas cannot be mapped now, the anchor from creation is
    /// kept.
    pub fn capture_for_save(
        &mut self,
        id: OverlayId,
        rect: Rect,
        transform: Option<&ResolvedTransform>,
    ) -> Option<Anchor> {
        let overlay = self.overlays.get_mut(&id)?;
        let mapper = transform.map(CoordinateMapper::from_transform);
        match capture_anchor(rect, mapper.as_ref()) {
            Some(anchor) => {
                overlay.state.reanchor(Some(anchor), rect.origin());
                Some(anchor)
            }
            None => overlay.state.anchor,
        }
    }

    // ─── Drawing ─────────────────────────────────────────────────────────

    pub fn start_drawing(&mut self, owner: OverlayId) -> bool {
        self.overlays.contains_key(&owner) && self.session.start_drawing(owner)
    }

    pub fn draw_move(&mut self, at: Point) -> Option<Rect> {
        self.session.draw_move(at)
    }

    pub fn cancel_drawing(&mut self) -> bool {
        self.session.cancel_drawing()
    }

    /// Route a click while drawing. `on_overlay` is the overlay under the
    /// pointer, if any.
    pub fn draw_click(
        &mut self,
        at: Point,
        on_overlay: Option<OverlayId>,
        transform: Option<&ResolvedTransform>,
    ) -> DrawOutcome {
        match self.session.draw_click(at, on_overlay) {
            DrawClick::Started(p) => DrawOutcome::Started(p),
            DrawClick::Ignored => DrawOutcome::Ignored,
            DrawClick::Inactive => DrawOutcome::Inactive,
            DrawClick::Finished { owner, rect } => {
                let mapper = transform.map(CoordinateMapper::from_transform);
                match capture_anchor(rect, mapper.as_ref()) {
                    Some(anchor @ Anchor::Corners(_)) => {
                        let kind = OverlayKind::Highlight { owner };
                        let mut state = OverlayState::new(rect.origin(), Sizing::Exact);
                        state.reanchor(Some(anchor), rect.origin());
                        let highlight = self.insert(kind, state);
                        DrawOutcome::Created { highlight, rect }
                    }
                    _ => {
                        log::warn!("highlight for {owner} could not be converted to canvas space");
                        DrawOutcome::Unanchored
                    }
                }
            }
        }
    }

    // ─── Tick ────────────────────────────────────────────────────────────

    /// One reconciliation pass over every anchored overlay.
    pub fn tick(&mut self, transform: Option<&ResolvedTransform>) -> TickReport {
        let overlays = self
            .overlays
            .iter_mut()
            .filter(|(_, o)| o.kind.is_reconciled())
            .map(|(id, o)| (*id, &mut o.state));
        self.reconciler.tick(transform, overlays, &self.locks)
    }
}
