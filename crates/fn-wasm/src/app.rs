//! Page controller: owns the overlay engine and wires it to the document,
//! the frame loop, the navigation signals, and the relay.
//!
//! All state sits behind one `RefCell`. Borrows never outlive a single DOM
//! callback and are released before any `.await` or blocking dialog.

use crate::dom::{self, DomResolver};
use crate::relay::{RelayProxy, describe_js};
use crate::ui::{self, Action, Dispatch, View};
use fn_core::{
    DiagramId, NoteDraft, NoteId, OverlayId, Point, ReconcileConfig, Rect, Size,
    TransformResolver,
};
use fn_editor::{
    ContextChange, ContextWatcher, DrawOutcome, NoteStore, OpKind, OverlayKind, OverlayManager,
    RemoteError, SignalSource, StoreConfig, Ticket, WatcherConfig,
};
use serde::Deserialize;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{
    Document, Event, EventTarget, HtmlElement, KeyboardEvent, MouseEvent, MutationObserver,
    MutationObserverInit, Node, Window,
};

const TOOLBAR_AT: Point = Point::new(20.0, 80.0);
const TOOLBAR_SIZE: Size = Size::new(360.0, 44.0);
const EDITOR_AT: Point = Point::new(60.0, 150.0);

/// Host-supplied settings; every field is optional in the JSON.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub reconcile: ReconcileConfig,
    pub watcher: WatcherConfig,
    pub store: StoreConfig,
    /// Refine the canvas to its largest `<g transform>` group.
    pub prefer_transform_group: bool,
    pub log_level: Option<String>,
}

// ─── State ──────────────────────────────────────────────────────────────

struct DocListener {
    event: &'static str,
    capture: bool,
    closure: Closure<dyn FnMut(Event)>,
}

#[derive(Default)]
struct Hooks {
    running: bool,
    /// Bumped on every start so a stopped frame loop cannot resume.
    epoch: u64,
    interval: Option<(i32, Closure<dyn FnMut()>)>,
    observer: Option<(MutationObserver, Closure<dyn FnMut()>)>,
    listeners: Vec<DocListener>,
}

struct State {
    overlays: OverlayManager,
    watcher: ContextWatcher,
    resolver: DomResolver,
    views: HashMap<OverlayId, View>,
    toolbar: Option<OverlayId>,
    preview: Option<HtmlElement>,
    /// Ticket owner for the display query, which belongs to no overlay.
    display_slot: OverlayId,
    note_size: Size,
    hooks: Hooks,
}

impl State {
    fn unmount(&mut self, ids: impl IntoIterator<Item = OverlayId>) {
        for id in ids {
            if let Some(view) = self.views.remove(&id) {
                view.unmount();
            }
            if self.toolbar == Some(id) {
                self.toolbar = None;
            }
        }
    }

    fn destroy(&mut self, id: OverlayId) {
        let removed = self.overlays.destroy(id);
        self.unmount(removed);
    }

    fn clear_preview(&mut self) {
        if let Some(preview) = self.preview.take() {
            preview.remove();
        }
    }

    /// The overlay whose element contains `target`.
    fn overlay_at(&self, target: Option<EventTarget>) -> Option<OverlayId> {
        let node = target?.dyn_into::<Node>().ok()?;
        self.views
            .iter()
            .find(|(_, v)| v.root.contains(Some(&node)))
            .map(|(id, _)| *id)
    }

    /// Remove overlays; the toolbar survives when `keep_toolbar` is set.
    fn teardown(&mut self, keep_toolbar: bool) {
        self.overlays.cancel_drawing();
        self.clear_preview();
        let slot = self.display_slot;
        self.overlays.ops().invalidate(slot);
        let doomed: Vec<OverlayId> = self
            .overlays
            .ids()
            .filter(|id| !(keep_toolbar && self.toolbar == Some(*id)))
            .collect();
        for id in doomed {
            self.destroy(id);
        }
    }
}

// ─── App ────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct App {
    window: Window,
    document: Document,
    state: Rc<RefCell<State>>,
    store: Rc<NoteStore<RelayProxy>>,
}

impl App {
    pub fn new(window: Window, relay: js_sys::Function, settings: Settings) -> Result<Self, JsValue> {
        let document = window
            .document()
            .ok_or_else(|| JsValue::from_str("window has no document"))?;
        let href = window.location().href()?;
        let note_size = Size::new(settings.reconcile.base_width, settings.reconcile.base_height);
        let state = State {
            overlays: OverlayManager::new(settings.reconcile),
            watcher: ContextWatcher::new(settings.watcher, &href),
            resolver: DomResolver::new(document.clone(), settings.prefer_transform_group),
            views: HashMap::new(),
            toolbar: None,
            preview: None,
            display_slot: OverlayId::transient(),
            note_size,
            hooks: Hooks::default(),
        };
        Ok(Self {
            window,
            document,
            state: Rc::new(RefCell::new(state)),
            store: Rc::new(NoteStore::new(RelayProxy::new(relay), settings.store)),
        })
    }

    fn dispatcher(&self) -> Dispatch {
        let app = self.clone();
        Rc::new(move |action| app.dispatch(action))
    }

    pub fn dispatch(&self, action: Action) {
        let result = match action {
            Action::NewNote => self.open_editor().map(drop),
            Action::DisplayNotes => {
                let app = self.clone();
                wasm_bindgen_futures::spawn_local(async move {
                    match app.display_notes().await {
                        Ok(0) => app.toast("No notes found for this flow."),
                        Ok(n) => app.toast(&format!("Displayed {n} note(s).")),
                        Err(e) => app.report("display notes", &e),
                    }
                });
                Ok(())
            }
            Action::HideNotes => {
                let count = self.hide_notes();
                self.toast(&format!("Hid {count} note(s)."));
                Ok(())
            }
            Action::DragStart(id, pointer) => {
                self.state.borrow_mut().overlays.begin_drag(id, pointer);
                Ok(())
            }
            Action::Save(id) => {
                self.save(id);
                Ok(())
            }
            Action::Update(id) => {
                self.update(id);
                Ok(())
            }
            Action::Delete(id) => {
                self.delete(id);
                Ok(())
            }
            Action::Close(id) => {
                self.state.borrow_mut().destroy(id);
                Ok(())
            }
            Action::Draw(id) => {
                self.start_drawing(id);
                Ok(())
            }
        };
        if let Err(e) = result {
            log::error!("{action:?} failed: {}", describe_js(&e));
        }
    }

    pub fn overlay_count(&self) -> usize {
        self.state.borrow().overlays.len()
    }

    pub fn on_diagram(&self) -> bool {
        self.state.borrow().watcher.current().on_diagram
    }

    pub fn set_reconcile_config(&self, config: ReconcileConfig) {
        let mut s = self.state.borrow_mut();
        s.note_size = Size::new(config.base_width, config.base_height);
        s.overlays.set_config(config);
    }

    // ─── Lifecycle ───────────────────────────────────────────────────────

    /// Install the frame loop, navigation signals, and pointer handling.
    pub fn start(&self) -> Result<(), JsValue> {
        let epoch = {
            let mut s = self.state.borrow_mut();
            if s.hooks.running {
                return Ok(());
            }
            s.hooks.running = true;
            s.hooks.epoch += 1;
            s.hooks.epoch
        };
        self.listen_document()?;
        self.watch_context()?;
        self.run_frames(epoch)?;
        if self.on_diagram() {
            let dispatch = self.dispatcher();
            self.ensure_toolbar(&dispatch);
        }
        log::debug!("started");
        Ok(())
    }

    /// Remove every handler and every overlay.
    pub fn stop(&self) {
        let mut s = self.state.borrow_mut();
        if !s.hooks.running {
            return;
        }
        s.hooks.running = false;
        if let Some((handle, _poll)) = s.hooks.interval.take() {
            self.window.clear_interval_with_handle(handle);
        }
        if let Some((observer, _callback)) = s.hooks.observer.take() {
            observer.disconnect();
        }
        for l in s.hooks.listeners.drain(..) {
            if let Err(e) = self.document.remove_event_listener_with_callback_and_bool(
                l.event,
                l.closure.as_ref().unchecked_ref(),
                l.capture,
            ) {
                log::warn!("cannot remove {} listener: {}", l.event, describe_js(&e));
            }
        }
        s.teardown(false);
        log::debug!("stopped");
    }

    fn listen_document(&self) -> Result<(), JsValue> {
        let mut listeners = Vec::new();

        let app = self.clone();
        listeners.push(self.listen("mousemove", false, move |e| {
            if let Some(mouse) = e.dyn_ref::<MouseEvent>() {
                app.pointer_move(ui::pointer(mouse));
            }
        })?);

        let app = self.clone();
        listeners.push(self.listen("mouseup", false, move |_| app.pointer_up())?);

        // Capture phase, so drawing clicks never reach the canvas.
        let app = self.clone();
        listeners.push(self.listen("click", true, move |e| {
            if let Some(mouse) = e.dyn_ref::<MouseEvent>() {
                app.click(mouse);
            }
        })?);

        let app = self.clone();
        listeners.push(self.listen("keydown", true, move |e| {
            if let Some(key) = e.dyn_ref::<KeyboardEvent>()
                && key.key() == "Escape"
                && app.cancel_drawing()
            {
                e.prevent_default();
            }
        })?);

        self.state.borrow_mut().hooks.listeners = listeners;
        Ok(())
    }

    fn listen(
        &self,
        event: &'static str,
        capture: bool,
        f: impl FnMut(Event) + 'static,
    ) -> Result<DocListener, JsValue> {
        let closure = Closure::wrap(Box::new(f) as Box<dyn FnMut(Event)>);
        self.document.add_event_listener_with_callback_and_bool(
            event,
            closure.as_ref().unchecked_ref(),
            capture,
        )?;
        Ok(DocListener {
            event,
            capture,
            closure,
        })
    }

    /// Feed the context watcher from an interval poll and a DOM observer.
    fn watch_context(&self) -> Result<(), JsValue> {
        let poll_ms = self.state.borrow().watcher.config().poll_interval_ms;

        let app = self.clone();
        let poll = Closure::wrap(Box::new(move || app.signal(SignalSource::Poll)) as Box<dyn FnMut()>);
        let handle = self.window.set_interval_with_callback_and_timeout_and_arguments_0(
            poll.as_ref().unchecked_ref(),
            i32::try_from(poll_ms).unwrap_or(i32::MAX),
        )?;

        let app = self.clone();
        let mutated =
            Closure::wrap(Box::new(move || app.signal(SignalSource::Mutation)) as Box<dyn FnMut()>);
        let observer = MutationObserver::new(mutated.as_ref().unchecked_ref())?;
        let init = MutationObserverInit::new();
        init.set_child_list(true);
        init.set_subtree(true);
        if let Some(body) = self.document.body() {
            observer.observe_with_options(&body, &init)?;
        }

        let mut s = self.state.borrow_mut();
        s.hooks.interval = Some((handle, poll));
        s.hooks.observer = Some((observer, mutated));
        Ok(())
    }

    fn signal(&self, source: SignalSource) {
        let href = match self.window.location().href() {
            Ok(href) => href,
            Err(e) => {
                log::warn!("cannot read page URL: {}", describe_js(&e));
                return;
            }
        };
        self.state
            .borrow_mut()
            .watcher
            .signal(source, &href, js_sys::Date::now());
    }

    fn run_frames(&self, epoch: u64) -> Result<(), JsValue> {
        let slot: Rc<RefCell<Option<Closure<dyn FnMut(f64)>>>> = Rc::new(RefCell::new(None));
        let next = Rc::clone(&slot);
        let app = self.clone();
        *slot.borrow_mut() = Some(Closure::wrap(Box::new(move |_now: f64| {
            let current = {
                let s = app.state.borrow();
                s.hooks.running && s.hooks.epoch == epoch
            };
            if !current {
                // Drop our own closure to end the loop.
                let _ = next.borrow_mut().take();
                return;
            }
            app.frame();
            if let Some(cb) = next.borrow().as_ref()
                && let Err(e) = app.window.request_animation_frame(cb.as_ref().unchecked_ref())
            {
                log::error!("frame loop stopped: {}", describe_js(&e));
            }
        }) as Box<dyn FnMut(f64)>));
        if let Some(cb) = slot.borrow().as_ref() {
            self.window.request_animation_frame(cb.as_ref().unchecked_ref())?;
        }
        Ok(())
    }

    // ─── Frame ───────────────────────────────────────────────────────────

    /// One frame: settle navigation, drop detached overlays, reconcile.
    /// Returns how many overlays moved.
    pub fn frame(&self) -> usize {
        let change = self
            .state
            .borrow_mut()
            .watcher
            .flush(js_sys::Date::now());
        if let Some(change) = change {
            self.context_changed(change, &self.dispatcher());
        }

        let mut guard = self.state.borrow_mut();
        let s = &mut *guard;
        let views = &s.views;
        let removed = s
            .overlays
            .retain_live(|id| views.get(&id).is_some_and(View::is_connected));
        s.unmount(removed);

        let transform = s.resolver.resolve();
        let report = s.overlays.tick(transform.as_ref());
        for (id, placement) in &report.placed {
            let (Some(view), Some(overlay)) = (s.views.get(id), s.overlays.get(*id)) else {
                continue;
            };
            let exact = matches!(overlay.kind, OverlayKind::Highlight { .. });
            if let Err(e) = dom::apply_placement(&view.root, placement, exact) {
                log::warn!("cannot place {id}: {}", describe_js(&e));
            }
        }
        if report.suppressed > 0 {
            log::trace!("{} suspicious placements held back", report.suppressed);
        }
        report.placed.len()
    }

    fn context_changed(&self, change: ContextChange, dispatch: &Dispatch) {
        match change {
            ContextChange::Entered(_) | ContextChange::Rebuilt => self.ensure_toolbar(dispatch),
            ContextChange::Switched { .. } => {
                self.state.borrow_mut().teardown(true);
                self.ensure_toolbar(dispatch);
            }
            ContextChange::Left => self.state.borrow_mut().teardown(false),
        }
    }

    fn ensure_toolbar(&self, dispatch: &Dispatch) {
        let mut s = self.state.borrow_mut();
        if let Some(id) = s.toolbar {
            if s.views.get(&id).is_some_and(View::is_connected) {
                return;
            }
            s.destroy(id);
        }
        let rect = Rect::from_origin_size(TOOLBAR_AT, TOOLBAR_SIZE);
        let id = s.overlays.create(OverlayKind::Toolbar, rect, None);
        match ui::toolbar(&self.document, id, TOOLBAR_AT, dispatch) {
            Ok(view) => {
                s.views.insert(id, view);
                s.toolbar = Some(id);
                log::debug!("toolbar injected");
            }
            Err(e) => {
                log::warn!("toolbar injection failed: {}", describe_js(&e));
                s.overlays.destroy(id);
            }
        }
    }

    // ─── Pointer ─────────────────────────────────────────────────────────

    fn pointer_move(&self, pointer: Point) {
        let mut s = self.state.borrow_mut();
        if let Some((id, position)) = s.overlays.drag_to(pointer) {
            if let Some(view) = s.views.get(&id)
                && let Err(e) = dom::set_position(&view.root, position)
            {
                log::warn!("cannot move {id}: {}", describe_js(&e));
            }
            return;
        }
        if let Some(rect) = s.overlays.draw_move(pointer)
            && let Some(preview) = &s.preview
            && let Err(e) = dom::set_rect(preview, rect)
        {
            log::warn!("cannot resize preview: {}", describe_js(&e));
        }
    }

    fn pointer_up(&self) {
        let pending = {
            let mut s = self.state.borrow_mut();
            let Some(id) = s.overlays.session().dragged() else {
                return;
            };
            let Some(rect) = s.views.get(&id).map(|v| dom::client_rect(&v.root)) else {
                return;
            };
            let transform = s.resolver.resolve();
            s.overlays.end_drag(rect, transform.as_ref()).map(|write| {
                let ticket = s
                    .overlays
                    .ops()
                    .begin(OverlayId::Note(write.note), OpKind::Anchor);
                (write, ticket)
            })
        };
        let Some((write, ticket)) = pending else {
            return;
        };
        let app = self.clone();
        wasm_bindgen_futures::spawn_local(async move {
            let result = app.store.update_anchor(write.note, &write.anchor).await;
            if !app.finish(ticket) {
                return;
            }
            match result {
                Ok(()) => log::debug!("anchor of {} saved", write.note),
                Err(e) => app.report("save the note position", &e),
            }
        });
    }

    fn click(&self, e: &MouseEvent) {
        let mut s = self.state.borrow_mut();
        if !s.overlays.session().is_drawing() {
            return;
        }
        let on_overlay = s.overlay_at(e.target());
        let transform = s.resolver.resolve();
        let outcome = s
            .overlays
            .draw_click(ui::pointer(e), on_overlay, transform.as_ref());
        match outcome {
            DrawOutcome::Started(at) => {
                s.clear_preview();
                match ui::preview(&self.document, at) {
                    Ok(preview) => s.preview = Some(preview),
                    Err(err) => log::warn!("cannot show preview: {}", describe_js(&err)),
                }
            }
            DrawOutcome::Created { highlight, rect } => {
                s.clear_preview();
                match ui::highlight(&self.document, highlight, rect) {
                    Ok(view) => {
                        s.views.insert(highlight, view);
                    }
                    Err(err) => {
                        log::warn!("cannot show highlight: {}", describe_js(&err));
                        s.destroy(highlight);
                    }
                }
                self.drawing_cursor(false);
            }
            DrawOutcome::Unanchored => {
                s.clear_preview();
                self.drawing_cursor(false);
                drop(s);
                self.toast("Could not place the rectangle on the canvas.");
            }
            DrawOutcome::Ignored | DrawOutcome::Inactive => {}
        }
        if on_overlay.is_none() {
            e.prevent_default();
            e.stop_propagation();
        }
    }

    pub fn start_drawing(&self, owner: OverlayId) -> bool {
        let mut s = self.state.borrow_mut();
        if !s.overlays.start_drawing(owner) {
            return false;
        }
        s.clear_preview();
        self.drawing_cursor(true);
        true
    }

    pub fn cancel_drawing(&self) -> bool {
        let mut s = self.state.borrow_mut();
        if !s.overlays.cancel_drawing() {
            return false;
        }
        s.clear_preview();
        self.drawing_cursor(false);
        true
    }

    fn drawing_cursor(&self, on: bool) {
        if let Some(body) = self.document.body()
            && let Err(e) = body
                .style()
                .set_property("cursor", if on { "crosshair" } else { "" })
        {
            log::warn!("cannot set cursor: {}", describe_js(&e));
        }
    }

    // ─── Notes ───────────────────────────────────────────────────────────

    pub fn open_editor(&self) -> Result<OverlayId, JsValue> {
        let dispatch = self.dispatcher();
        let mut s = self.state.borrow_mut();
        let rect = Rect::from_origin_size(EDITOR_AT, s.note_size);
        let transform = s.resolver.resolve();
        let id = s.overlays.create(OverlayKind::Editor, rect, transform.as_ref());
        match ui::editor(&self.document, id, rect, &dispatch) {
            Ok(view) => {
                s.views.insert(id, view);
                Ok(id)
            }
            Err(e) => {
                s.overlays.destroy(id);
                Err(e)
            }
        }
    }

    fn save(&self, editor: OverlayId) {
        let (draft, size, ticket) = {
            let mut s = self.state.borrow_mut();
            let Some(view) = s.views.get(&editor) else {
                return;
            };
            let rect = dom::client_rect(&view.root);
            let text = view.text_value();
            // Layout size, unaffected by the display scale.
            let size = Size::new(
                f64::from(view.root.offset_width()),
                f64::from(view.root.offset_height()),
            );
            let transform = s.resolver.resolve();
            let anchor = s.overlays.capture_for_save(editor, rect, transform.as_ref());
            let draft = NoteDraft {
                diagram_id: s
                    .watcher
                    .current()
                    .diagram
                    .clone()
                    .unwrap_or_else(|| DiagramId::new("")),
                text,
                anchor,
            };
            if let Some(view) = s.views.get(&editor) {
                view.set_busy(true);
            }
            (draft, size, s.overlays.ops().begin(editor, OpKind::Edit))
        };
        let app = self.clone();
        wasm_bindgen_futures::spawn_local(async move {
            let result = app.store.create(&draft).await;
            if !app.finish(ticket) {
                log::debug!("save finished after {} closed", ticket.owner());
                return;
            }
            match result {
                Ok(Some(note)) => {
                    let mut s = app.state.borrow_mut();
                    let removed = s.overlays.saved(ticket.owner(), note, size);
                    s.unmount(removed);
                    drop(s);
                    app.toast("Note saved successfully!");
                }
                Ok(None) => {
                    app.state.borrow_mut().destroy(ticket.owner());
                    app.toast("Note saved.");
                }
                Err(e) => {
                    app.set_busy(ticket.owner(), false);
                    app.report("save note", &e);
                }
            }
        });
    }

    fn update(&self, id: OverlayId) {
        let Some(note) = id.note() else {
            return;
        };
        let (text, ticket) = {
            let mut s = self.state.borrow_mut();
            let Some(view) = s.views.get(&id) else {
                return;
            };
            let text = view.text_value();
            view.set_busy(true);
            (text, s.overlays.ops().begin(id, OpKind::Edit))
        };
        let app = self.clone();
        wasm_bindgen_futures::spawn_local(async move {
            let result = app.store.update_text(note, &text).await;
            if !app.finish(ticket) {
                return;
            }
            match result {
                Ok(()) => {
                    app.state.borrow_mut().destroy(id);
                    app.toast("Note updated.");
                }
                Err(e) => {
                    app.set_busy(id, false);
                    app.report("update note", &e);
                }
            }
        });
    }

    fn delete(&self, id: OverlayId) {
        let Some(note) = id.note() else {
            return;
        };
        let confirmed = self
            .window
            .confirm_with_message("Are you sure you want to delete this note?")
            .unwrap_or(false);
        if !confirmed {
            return;
        }
        let ticket = self.state.borrow_mut().overlays.ops().begin(id, OpKind::Edit);
        self.set_busy(id, true);
        let app = self.clone();
        wasm_bindgen_futures::spawn_local(async move {
            let result = app.store.delete(note).await;
            if !app.finish(ticket) {
                return;
            }
            match result {
                Ok(()) => {
                    let mut s = app.state.borrow_mut();
                    let removed = s.overlays.deleted(note);
                    s.unmount(removed);
                    drop(s);
                    app.toast("Note deleted.");
                }
                Err(e) => {
                    app.set_busy(id, false);
                    app.report("delete note", &e);
                }
            }
        });
    }

    /// Fetch this diagram's notes and show them, replacing any on screen.
    /// Resolves to the number shown; a display overtaken by navigation or
    /// a hide shows nothing.
    pub async fn display_notes(&self) -> Result<usize, RemoteError> {
        let (diagram, ticket) = {
            let mut s = self.state.borrow_mut();
            let diagram = s
                .watcher
                .current()
                .diagram
                .clone()
                .ok_or(RemoteError::MissingDiagramId)?;
            let slot = s.display_slot;
            (diagram, s.overlays.ops().begin(slot, OpKind::Query))
        };
        let records = self.store.query(&diagram).await;
        if !self.finish(ticket) {
            log::debug!("display for {diagram} superseded");
            return Ok(0);
        }
        let records = records?;

        let dispatch = self.dispatcher();
        let mut s = self.state.borrow_mut();
        let note_size = s.note_size;
        let (removed, created) = s.overlays.display_records(&records, note_size);
        s.unmount(removed);
        let texts: HashMap<NoteId, &str> = records
            .iter()
            .filter_map(|r| Some((r.id?, r.text.as_deref().unwrap_or_default())))
            .collect();
        let mut shown = 0;
        for id in created {
            let (Some(note), Some(overlay)) = (id.note(), s.overlays.get(id)) else {
                continue;
            };
            let rect = Rect::from_origin_size(overlay.state.position, note_size);
            let text = texts.get(&note).copied().unwrap_or_default();
            match ui::note(&self.document, id, rect, text, &dispatch) {
                Ok(view) => {
                    s.views.insert(id, view);
                    shown += 1;
                }
                Err(e) => {
                    log::warn!("cannot show note {note}: {}", describe_js(&e));
                    s.overlays.destroy(id);
                }
            }
        }
        Ok(shown)
    }

    /// Remove every displayed note. Returns how many were removed.
    pub fn hide_notes(&self) -> usize {
        let mut s = self.state.borrow_mut();
        let slot = s.display_slot;
        s.overlays.ops().invalidate(slot);
        let (removed, count) = s.overlays.clear_notes();
        s.unmount(removed);
        count
    }

    // ─── Feedback ────────────────────────────────────────────────────────

    fn set_busy(&self, id: OverlayId, busy: bool) {
        if let Some(view) = self.state.borrow().views.get(&id) {
            view.set_busy(busy);
        }
    }

    fn finish(&self, ticket: Ticket) -> bool {
        self.state.borrow_mut().overlays.ops().finish(ticket)
    }

    fn toast(&self, message: &str) {
        if let Err(e) = dom::show_toast(&self.document, message) {
            log::warn!("cannot show toast: {}", describe_js(&e));
        }
    }

    /// Surface a failed user action with a blocking alert.
    fn report(&self, action: &str, error: &RemoteError) {
        log::warn!("{action} failed: {error}");
        let message = if error.is_validation() {
            error.to_string()
        } else {
            format!("Failed to {action}: {error}")
        };
        if let Err(e) = self.window.alert_with_message(&message) {
            log::error!("cannot show alert: {}", describe_js(&e));
        }
    }
}
