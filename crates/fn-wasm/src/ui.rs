//! Overlay element construction: toolbar, note editor, displayed note,
//! highlight rectangle, drawing preview.
//!
//! Builders only create elements and route user input to an [`Action`];
//! everything stateful happens in the app.

use crate::dom::{self, Z_PREVIEW};
use fn_core::{OverlayId, Point, Rect, Size};
use std::rc::Rc;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{Document, Event, HtmlButtonElement, HtmlElement, HtmlTextAreaElement, MouseEvent};

pub type Listener = Closure<dyn FnMut(Event)>;
pub type Dispatch = Rc<dyn Fn(Action)>;

/// User input coming from overlay elements.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    // ── Toolbar ──
    NewNote,
    DisplayNotes,
    HideNotes,

    // ── Per overlay ──
    /// Pointer pressed on an overlay's drag handle.
    DragStart(OverlayId, Point),
    Save(OverlayId),
    Update(OverlayId),
    Delete(OverlayId),
    Close(OverlayId),
    Draw(OverlayId),
}

/// A mounted overlay element and the handlers attached to it.
pub struct View {
    pub root: HtmlElement,
    pub text: Option<HtmlTextAreaElement>,
    buttons: Vec<HtmlButtonElement>,
    listeners: Vec<Listener>,
}

impl View {
    fn new(root: HtmlElement) -> Self {
        Self {
            root,
            text: None,
            buttons: Vec::new(),
            listeners: Vec::new(),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.root.is_connected()
    }

    pub fn text_value(&self) -> String {
        self.text.as_ref().map(|t| t.value()).unwrap_or_default()
    }

    /// Disable the buttons while a request started from this view is in
    /// flight.
    pub fn set_busy(&self, busy: bool) {
        for button in &self.buttons {
            button.set_disabled(busy);
        }
    }

    /// Detach from the document. Handlers are dropped with the view.
    pub fn unmount(self) {
        self.root.remove();
        drop(self.listeners);
    }

    fn on(&mut self, target: &web_sys::EventTarget, event: &str, f: impl FnMut(Event) + 'static) -> Result<(), JsValue> {
        let closure = Closure::wrap(Box::new(f) as Box<dyn FnMut(Event)>);
        target.add_event_listener_with_callback(event, closure.as_ref().unchecked_ref())?;
        self.listeners.push(closure);
        Ok(())
    }

    fn button(&mut self, document: &Document, label: &str, dispatch: &Dispatch, action: Action) -> Result<HtmlButtonElement, JsValue> {
        let button: HtmlButtonElement = dom::element(document, "button")?;
        button.set_type("button");
        button.set_text_content(Some(label));
        // Keep a press on a button from starting a drag.
        self.on(&button, "mousedown", |e| e.stop_propagation())?;
        let dispatch = Rc::clone(dispatch);
        self.on(&button, "click", move |e| {
            e.stop_propagation();
            dispatch(action);
        })?;
        self.buttons.push(button.clone());
        Ok(button)
    }

    fn drag_handle(&mut self, document: &Document, title: &str, id: OverlayId, dispatch: &Dispatch) -> Result<HtmlElement, JsValue> {
        let handle: HtmlElement = dom::element(document, "div")?;
        handle.set_class_name("flownotes-drag-handle");
        handle.set_text_content(Some(title));
        dom::set_styles(&handle, &[("cursor", "move"), ("user-select", "none")])?;
        let dispatch = Rc::clone(dispatch);
        self.on(&handle, "mousedown", move |e| {
            let Some(mouse) = e.dyn_ref::<MouseEvent>() else {
                return;
            };
            if mouse.button() != 0 {
                return;
            }
            e.prevent_default();
            dispatch(Action::DragStart(id, pointer(mouse)));
        })?;
        Ok(handle)
    }

    fn textarea(&mut self, document: &Document, value: &str) -> Result<HtmlTextAreaElement, JsValue> {
        let text: HtmlTextAreaElement = dom::element(document, "textarea")?;
        text.set_value(value);
        text.set_placeholder("Write a note about this part of the flow…");
        text.set_rows(5);
        self.on(&text, "mousedown", |e| e.stop_propagation())?;
        self.text = Some(text.clone());
        Ok(text)
    }
}

pub fn pointer(e: &MouseEvent) -> Point {
    Point::new(f64::from(e.client_x()), f64::from(e.client_y()))
}

fn mount(document: &Document, root: &HtmlElement) -> Result<(), JsValue> {
    let body = document
        .body()
        .ok_or_else(|| JsValue::from_str("document has no body"))?;
    body.append_child(root)?;
    Ok(())
}

// ─── Builders ───────────────────────────────────────────────────────────

pub fn toolbar(document: &Document, id: OverlayId, at: Point, dispatch: &Dispatch) -> Result<View, JsValue> {
    let root = dom::overlay_element(document, &id.to_string(), "flownotes-toolbar")?;
    dom::set_styles(&root, &[("display", "inline-flex"), ("gap", "8px")])?;
    dom::set_position(&root, at)?;
    let mut view = View::new(root.clone());
    let handle = view.drag_handle(document, "FlowNotes", id, dispatch)?;
    let new_note = view.button(document, "New note", dispatch, Action::NewNote)?;
    let display = view.button(document, "Display notes", dispatch, Action::DisplayNotes)?;
    let hide = view.button(document, "Hide notes", dispatch, Action::HideNotes)?;
    root.append_child(&handle)?;
    root.append_child(&new_note)?;
    root.append_child(&display)?;
    root.append_child(&hide)?;
    mount(document, &root)?;
    Ok(view)
}

/// Editor for a note that has not been saved yet.
pub fn editor(document: &Document, id: OverlayId, rect: Rect, dispatch: &Dispatch) -> Result<View, JsValue> {
    let root = dom::overlay_element(document, &id.to_string(), "flownotes-popout")?;
    dom::set_rect(&root, rect)?;
    let mut view = View::new(root.clone());

    let header = view.drag_handle(document, "New note", id, dispatch)?;
    let close = view.button(document, "×", dispatch, Action::Close(id))?;
    header.append_child(&close)?;
    root.append_child(&header)?;
    let text = view.textarea(document, "")?;
    root.append_child(&text)?;

    let footer: HtmlElement = dom::element(document, "div")?;
    let draw = view.button(document, "Draw rectangle", dispatch, Action::Draw(id))?;
    let save = view.button(document, "Save", dispatch, Action::Save(id))?;
    footer.append_child(&draw)?;
    footer.append_child(&save)?;
    root.append_child(&footer)?;
    mount(document, &root)?;
    Ok(view)
}

/// A persisted note, editable in place.
pub fn note(document: &Document, id: OverlayId, rect: Rect, text: &str, dispatch: &Dispatch) -> Result<View, JsValue> {
    let root = dom::overlay_element(document, &id.to_string(), "flownotes-displayed-note")?;
    dom::set_rect(&root, rect)?;
    let mut view = View::new(root.clone());

    let header = view.drag_handle(document, "Note", id, dispatch)?;
    let delete = view.button(document, "Delete", dispatch, Action::Delete(id))?;
    let close = view.button(document, "×", dispatch, Action::Close(id))?;
    header.append_child(&delete)?;
    header.append_child(&close)?;
    root.append_child(&header)?;
    let body = view.textarea(document, text)?;
    root.append_child(&body)?;

    let footer: HtmlElement = dom::element(document, "div")?;
    let draw = view.button(document, "Draw rectangle", dispatch, Action::Draw(id))?;
    let update = view.button(document, "Update & Close", dispatch, Action::Update(id))?;
    footer.append_child(&draw)?;
    footer.append_child(&update)?;
    root.append_child(&footer)?;
    mount(document, &root)?;
    Ok(view)
}

pub fn highlight(document: &Document, id: OverlayId, rect: Rect) -> Result<View, JsValue> {
    let root = dom::overlay_element(document, &id.to_string(), "flownotes-canvas-rectangle")?;
    dom::set_styles(
        &root,
        &[
            ("border", "2px solid #5bc0be"),
            ("background", "rgba(91, 192, 190, 0.15)"),
            ("box-sizing", "border-box"),
            ("pointer-events", "none"),
        ],
    )?;
    dom::set_rect(&root, rect)?;
    mount(document, &root)?;
    Ok(View::new(root))
}

/// Dashed rectangle following the pointer while drawing.
pub fn preview(document: &Document, at: Point) -> Result<HtmlElement, JsValue> {
    let root: HtmlElement = dom::element(document, "div")?;
    root.set_id("flownotes-draw-preview");
    dom::set_styles(
        &root,
        &[
            ("position", "fixed"),
            ("border", "2px dashed #5bc0be"),
            ("background", "rgba(91, 192, 190, 0.1)"),
            ("pointer-events", "none"),
            ("z-index", Z_PREVIEW),
        ],
    )?;
    dom::set_rect(&root, Rect::from_origin_size(at, Size::ZERO))?;
    mount(document, &root)?;
    Ok(root)
}
