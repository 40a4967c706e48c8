//! Integration tests: overlay lifecycle driven the way the page drives it.
//!
//! Editor → save → display → pan/zoom ticks → drag → anchor write-back,
//! with completions checked against generation tickets.

mod common;

use common::{FakeOrg, init_logging};
use fn_core::record::fields;
use fn_core::{
    DiagramId, NoteDraft, NoteId, OverlayId, Point, Rect, ResolvedTransform, ScreenMatrix, Size,
};
use fn_editor::{
    DrawOutcome, Method, NoteStore, OpKind, OverlayKind, OverlayManager, StoreConfig,
};
use serde_json::Value;

const NOTE_SIZE: Size = Size::new(300.0, 120.0);

fn pan_zoom(scale: f64, tx: f64, ty: f64) -> ResolvedTransform {
    ResolvedTransform::new(ScreenMatrix::scale_translate(scale, tx, ty))
}

#[tokio::test]
async fn editor_to_displayed_note_follows_the_canvas() {
    init_logging();
    let org = FakeOrg::full();
    let store = NoteStore::new(&org, StoreConfig::default());
    let mut overlays = OverlayManager::default();
    let diagram = DiagramId::new("301Ab000000x1yZ");
    let t0 = pan_zoom(1.0, 0.0, 0.0);

    // Open an editor at (100,100)-(400,220) and save it.
    let editor_rect = Rect::from_origin_size((100.0, 100.0), NOTE_SIZE);
    let editor = overlays.create(OverlayKind::Editor, editor_rect, Some(&t0));
    let anchor = overlays.get(editor).unwrap().state.anchor;
    let ticket = overlays.ops().begin(editor, OpKind::Edit);
    let saved = store
        .create(&NoteDraft {
            diagram_id: diagram.clone(),
            text: "Why two paths here?".into(),
            anchor,
        })
        .await
        .unwrap()
        .unwrap();
    assert!(overlays.ops().finish(ticket));
    overlays.saved(editor, saved, editor_rect.size());
    assert!(overlays.is_empty());

    // Display: the note comes back from the query and is placed on the
    // first tick after a pan of +50px.
    let records = store.query(&diagram).await.unwrap();
    let (_, created) = overlays.display_records(&records, NOTE_SIZE);
    assert_eq!(created, vec![OverlayId::Note(saved)]);

    let report = overlays.tick(Some(&pan_zoom(1.0, 50.0, 0.0)));
    assert_eq!(report.placed.len(), 1);
    assert_eq!(report.placed[0].1.top_left, Point::new(150.0, 100.0));

    // Zoom 2x around a new pan: position follows, size stays locked.
    let report = overlays.tick(Some(&pan_zoom(2.0, 100.0, 100.0)));
    let placement = report.placed[0].1;
    assert!((placement.top_left - Point::new(300.0, 300.0)).hypot() < 1e-6);
    assert_eq!(placement.size, NOTE_SIZE);

    // Canvas disappears: nothing moves.
    let report = overlays.tick(None);
    assert_eq!(report.stale, 1);
    assert_eq!(
        overlays.get(OverlayId::Note(saved)).unwrap().state.position,
        Point::new(300.0, 300.0)
    );
}

#[tokio::test]
async fn dragged_note_writes_its_new_anchor() {
    let org = FakeOrg::full();
    let store = NoteStore::new(&org, StoreConfig::default());
    let mut overlays = OverlayManager::default();
    let t = pan_zoom(0.5, 0.0, 0.0);

    let note = store
        .create(&NoteDraft {
            diagram_id: DiagramId::new("301"),
            text: "drag me".into(),
            anchor: None,
        })
        .await
        .unwrap()
        .unwrap();
    let id = overlays.create(
        OverlayKind::Note(note),
        Rect::from_origin_size((200.0, 200.0), NOTE_SIZE),
        Some(&t),
    );

    assert!(overlays.begin_drag(id, Point::new(210.0, 210.0)));
    for step in 0..10 {
        let (_, p) = overlays.drag_to(Point::new(210.0 + step as f64 * 10.0, 210.0)).unwrap();
        // The reconciler is told a very different story each frame.
        let report = overlays.tick(Some(&pan_zoom(0.5, step as f64 * 37.0, 12.0)));
        assert_eq!(report.dragging, 1);
        assert_eq!(overlays.get(id).unwrap().state.position, p);
    }
    let write = overlays
        .end_drag(Rect::from_origin_size((290.0, 200.0), NOTE_SIZE), Some(&t))
        .unwrap();
    store.update_anchor(write.note, &write.anchor).await.unwrap();

    let stored = org.record(note.as_str()).unwrap();
    // Screen 290 at scale 0.5 is intrinsic 580.
    assert_eq!(stored[fields::TLX], Value::from(580.0));
    assert_eq!(stored[fields::BRY], Value::from(640.0));
    assert_eq!(org.requests(Method::Patch).len(), 1);
}

#[tokio::test]
async fn drag_during_update_keeps_the_update_ticket() {
    let org = FakeOrg::full();
    let store = NoteStore::new(&org, StoreConfig::default());
    let mut overlays = OverlayManager::default();
    let t = pan_zoom(1.0, 0.0, 0.0);

    let note = store
        .create(&NoteDraft {
            diagram_id: DiagramId::new("301"),
            text: "before".into(),
            anchor: None,
        })
        .await
        .unwrap()
        .unwrap();
    let id = overlays.create(
        OverlayKind::Note(note),
        Rect::from_origin_size((200.0, 200.0), NOTE_SIZE),
        Some(&t),
    );

    // Update clicked; the note is dragged before the reply arrives.
    let update = overlays.ops().begin(id, OpKind::Edit);
    assert!(overlays.begin_drag(id, Point::new(210.0, 210.0)));
    overlays.drag_to(Point::new(260.0, 210.0));
    let write = overlays
        .end_drag(Rect::from_origin_size((250.0, 200.0), NOTE_SIZE), Some(&t))
        .unwrap();
    let moved = overlays.ops().begin(id, OpKind::Anchor);

    store.update_text(note, "after").await.unwrap();
    store.update_anchor(write.note, &write.anchor).await.unwrap();

    // Both completions still apply, so the update re-enables its buttons.
    assert!(overlays.ops().finish(update));
    assert!(overlays.ops().finish(moved));
    assert_eq!(org.requests(Method::Patch).len(), 2);
}

#[tokio::test]
async fn completion_for_closed_editor_is_ignored() {
    let org = FakeOrg::full();
    let store = NoteStore::new(&org, StoreConfig::default());
    let mut overlays = OverlayManager::default();

    let editor = overlays.create(
        OverlayKind::Editor,
        Rect::from_origin_size((100.0, 100.0), NOTE_SIZE),
        Some(&pan_zoom(1.0, 0.0, 0.0)),
    );
    let ticket = overlays.ops().begin(editor, OpKind::Edit);
    assert!(overlays.ops().in_flight(editor, OpKind::Edit));

    // The user closes the editor while the save is in flight.
    overlays.destroy(editor);
    let saved = store
        .create(&NoteDraft {
            diagram_id: DiagramId::new("301"),
            text: "late".into(),
            anchor: None,
        })
        .await
        .unwrap();
    assert!(saved.is_some());
    assert!(!overlays.ops().finish(ticket));
    assert!(overlays.is_empty());
}

#[test]
fn highlight_tracks_zoom_exactly() {
    let mut overlays = OverlayManager::default();
    let t0 = pan_zoom(1.0, 0.0, 0.0);
    let editor = overlays.create(
        OverlayKind::Editor,
        Rect::from_origin_size((600.0, 100.0), NOTE_SIZE),
        Some(&t0),
    );
    assert!(overlays.start_drawing(editor));
    assert!(matches!(
        overlays.draw_click(Point::new(300.0, 300.0), None, Some(&t0)),
        DrawOutcome::Started(_)
    ));
    // Clicking the editor itself does not finish the rectangle.
    assert_eq!(
        overlays.draw_click(Point::new(650.0, 150.0), Some(editor), Some(&t0)),
        DrawOutcome::Ignored
    );
    assert_eq!(
        overlays.draw_move(Point::new(400.0, 350.0)),
        Some(Rect::new(300.0, 300.0, 400.0, 350.0))
    );
    let DrawOutcome::Created { highlight, .. } =
        overlays.draw_click(Point::new(400.0, 350.0), None, Some(&t0))
    else {
        panic!("expected a highlight");
    };

    let report = overlays.tick(Some(&pan_zoom(3.0, -200.0, -200.0)));
    let (_, placement) = report
        .placed
        .iter()
        .copied()
        .find(|(id, _)| *id == highlight)
        .unwrap();
    assert_eq!(placement.top_left, Point::new(700.0, 700.0));
    assert_eq!(placement.size, Size::new(300.0, 150.0));
    assert_eq!(placement.scale, 1.0);
}

#[test]
fn hide_reports_note_count() {
    let mut overlays = OverlayManager::default();
    let t = pan_zoom(1.0, 0.0, 0.0);
    for (i, name) in ["h1", "h2", "h3"].iter().enumerate() {
        overlays.create(
            OverlayKind::Note(NoteId::intern(name)),
            Rect::from_origin_size((300.0, 300.0 + i as f64 * 150.0), NOTE_SIZE),
            Some(&t),
        );
    }
    overlays.create(OverlayKind::Toolbar, Rect::new(0.0, 0.0, 200.0, 40.0), None);
    let (removed, count) = overlays.clear_notes();
    assert_eq!(count, 3);
    assert_eq!(removed.len(), 3);
    assert_eq!(overlays.len(), 1);
}
