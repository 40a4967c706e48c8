//! DOM side of the overlay engine: locating the canvas and writing overlay
//! styles.

use fn_core::resolver::{CandidateKind, CanvasCandidate, accumulate_frame_offset, choose_canvas};
use fn_core::{Placement, Point, Rect, ResolvedTransform, ScreenMatrix, TransformResolver};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{Document, Element, HtmlElement, HtmlIFrameElement, NodeList, SvgGraphicsElement};

/// Nested frames deeper than this are not searched.
const MAX_FRAME_DEPTH: usize = 6;

/// Stacking level for overlays; the preview sits one below.
pub const Z_OVERLAY: &str = "2147483647";
pub const Z_PREVIEW: &str = "2147483646";

// ─── Transform resolution ───────────────────────────────────────────────

/// Finds the diagram canvas in the page and reads its screen matrix.
///
/// The canvas is the largest `<svg>` across the top document and every
/// same-origin frame beneath it. Cross-origin frames have no readable
/// document and are skipped.
pub struct DomResolver {
    document: Document,
    prefer_group: bool,
}

impl DomResolver {
    pub fn new(document: Document, prefer_group: bool) -> Self {
        Self {
            document,
            prefer_group,
        }
    }

    fn collect_roots(
        document: &Document,
        chain: &mut Vec<(f64, f64)>,
        out: &mut Vec<CanvasCandidate<SvgGraphicsElement>>,
    ) {
        let frame_offset = accumulate_frame_offset(chain.iter().copied());
        for el in query_document(document, "svg") {
            out.push(CanvasCandidate {
                bounds: client_rect(&el),
                // Elements from child frames fail `instanceof` against this
                // realm's constructors, so the cast is unchecked.
                handle: el.unchecked_into(),
                kind: CandidateKind::SvgRoot,
                frame_offset,
            });
        }
        if chain.len() >= MAX_FRAME_DEPTH {
            return;
        }
        for el in query_document(document, "iframe") {
            let rect = client_rect(&el);
            let frame: HtmlIFrameElement = el.unchecked_into();
            let Some(inner) = frame.content_document() else {
                continue;
            };
            chain.push((rect.x0, rect.y0));
            Self::collect_roots(&inner, chain, out);
            chain.pop();
        }
    }
}

impl TransformResolver for DomResolver {
    fn resolve(&mut self) -> Option<ResolvedTransform> {
        let mut roots = Vec::new();
        Self::collect_roots(&self.document, &mut Vec::new(), &mut roots);
        let canvas = choose_canvas(roots, self.prefer_group, |root| {
            query_element(&root.handle, "g[transform]")
                .map(|el| CanvasCandidate {
                    bounds: client_rect(&el),
                    handle: el.unchecked_into(),
                    kind: CandidateKind::TransformGroup,
                    frame_offset: root.frame_offset,
                })
                .collect()
        })?;
        let ctm = canvas.handle.get_screen_ctm()?;
        let matrix = ScreenMatrix::new(
            f64::from(ctm.a()),
            f64::from(ctm.b()),
            f64::from(ctm.c()),
            f64::from(ctm.d()),
            f64::from(ctm.e()),
            f64::from(ctm.f()),
        );
        if !matrix.is_finite() {
            log::trace!("canvas matrix is not finite");
            return None;
        }
        Some(ResolvedTransform::new(matrix).with_frame_offset(canvas.frame_offset))
    }
}

/// Elements matching `selector` in `document`; a bad selector yields none.
fn query_document(document: &Document, selector: &str) -> impl Iterator<Item = Element> {
    elements(document.query_selector_all(selector).ok())
}

fn query_element(root: &Element, selector: &str) -> impl Iterator<Item = Element> {
    elements(root.query_selector_all(selector).ok())
}

fn elements(list: Option<NodeList>) -> impl Iterator<Item = Element> {
    let len = list.as_ref().map_or(0, NodeList::length);
    (0..len).filter_map(move |i| {
        list.as_ref()
            .and_then(|l| l.item(i))
            .map(|n| n.unchecked_into::<Element>())
    })
}

/// Rendered bounds of `el` in its own window.
pub fn client_rect(el: &Element) -> Rect {
    let r = el.get_bounding_client_rect();
    Rect::new(r.left(), r.top(), r.right(), r.bottom())
}

// ─── Overlay elements ───────────────────────────────────────────────────

/// Create a fixed-position element tagged with its overlay id.
pub fn overlay_element(document: &Document, overlay_id: &str, class: &str) -> Result<HtmlElement, JsValue> {
    let el: HtmlElement = element(document, "div")?;
    el.set_class_name(class);
    el.set_attribute("data-overlay-id", overlay_id)?;
    set_styles(
        &el,
        &[
            ("position", "fixed"),
            ("z-index", Z_OVERLAY),
            ("transform-origin", "top left"),
        ],
    )?;
    Ok(el)
}

pub fn element<T: JsCast>(document: &Document, tag: &str) -> Result<T, JsValue> {
    document
        .create_element(tag)?
        .dyn_into::<T>()
        .map_err(|_| JsValue::from_str(&format!("<{tag}> has an unexpected type")))
}

pub fn set_styles(el: &HtmlElement, styles: &[(&str, &str)]) -> Result<(), JsValue> {
    let style = el.style();
    for (name, value) in styles {
        style.set_property(name, value)?;
    }
    Ok(())
}

pub fn set_position(el: &HtmlElement, p: Point) -> Result<(), JsValue> {
    let style = el.style();
    style.set_property("left", &px(p.x))?;
    style.set_property("top", &px(p.y))
}

pub fn set_rect(el: &HtmlElement, rect: Rect) -> Result<(), JsValue> {
    set_position(el, rect.origin())?;
    let style = el.style();
    style.set_property("width", &px(rect.width()))?;
    style.set_property("height", &px(rect.height()))
}

/// Write a reconciled placement. `exact` elements take the projected size
/// directly; the rest keep their layout size and are scaled.
pub fn apply_placement(el: &HtmlElement, placement: &Placement, exact: bool) -> Result<(), JsValue> {
    if exact {
        set_rect(el, Rect::from_origin_size(placement.top_left, placement.size))?;
    } else {
        set_position(el, placement.top_left)?;
        el.style()
            .set_property("transform", &format!("scale({})", placement.scale))?;
    }
    el.style()
        .set_property("opacity", &placement.opacity.to_string())
}

fn px(v: f64) -> String {
    format!("{v}px")
}

/// Transient message in the bottom-right corner.
pub fn show_toast(document: &Document, message: &str) -> Result<(), JsValue> {
    let Some(body) = document.body() else {
        return Ok(());
    };
    let toast: HtmlElement = element(document, "div")?;
    toast.set_class_name("flownotes-toast");
    toast.set_text_content(Some(message));
    set_styles(
        &toast,
        &[
            ("position", "fixed"),
            ("bottom", "20px"),
            ("right", "20px"),
            ("z-index", Z_OVERLAY),
        ],
    )?;
    body.append_child(&toast)?;
    let remove = Closure::once_into_js(move || toast.remove());
    if let Some(window) = web_sys::window() {
        window.set_timeout_with_callback_and_timeout_and_arguments_0(remove.unchecked_ref(), 2800)?;
    }
    Ok(())
}
