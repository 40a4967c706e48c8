//! WASM bridge for Flow Notes. Runs the overlay engine inside the flow
//! editor page.
//!
//! Compiled via `wasm-pack build --target web` and loaded by the extension's
//! content script, which passes in the relay function that forwards data
//! requests to the background worker.

mod app;
mod console_log;
mod dom;
mod relay;
mod ui;

use app::{App, Settings};
use fn_core::ReconcileConfig;
use fn_core::page::{DIAGRAM_ID_PARAM, diagram_id_from_url};
use log::LevelFilter;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;

/// The content script's handle on the overlay engine.
///
/// Everything the page shows (toolbar, editors, notes, highlights) is owned
/// here; JS only constructs it, starts it, and forwards relay requests.
#[wasm_bindgen]
pub struct FlowNotes {
    app: App,
}

#[wasm_bindgen]
impl FlowNotes {
    /// Create the engine. `relay(request)` must return a promise of the
    /// background worker's reply. `settings` is optional JSON.
    #[wasm_bindgen(constructor)]
    pub fn new(relay: js_sys::Function, settings: Option<String>) -> Result<FlowNotes, JsValue> {
        // Set up panic hook for better error messages in console
        console_error_panic_hook_setup();

        let settings: Settings = match settings.as_deref().map(str::trim) {
            Some(json) if !json.is_empty() => serde_json::from_str(json)
                .map_err(|e| JsValue::from_str(&format!("invalid settings: {e}")))?,
            _ => Settings::default(),
        };
        let level = settings
            .log_level
            .as_deref()
            .map_or(LevelFilter::Warn, console_log::parse_level);
        console_log::init(level);

        let window = web_sys::window().ok_or_else(|| JsValue::from_str("no global window"))?;
        Ok(Self {
            app: App::new(window, relay, settings)?,
        })
    }

    /// Begin watching the page: frame loop, navigation, pointer input.
    pub fn start(&self) -> Result<(), JsValue> {
        self.app.start()
    }

    /// Stop watching and remove every overlay.
    pub fn stop(&self) {
        self.app.stop()
    }

    /// Run one reconciliation pass now. Returns how many overlays moved.
    pub fn tick(&self) -> usize {
        self.app.frame()
    }

    /// Open an empty note editor. Returns its overlay id.
    pub fn open_editor(&self) -> Result<String, JsValue> {
        self.app.open_editor().map(|id| id.to_string())
    }

    /// Fetch and show the current flow's notes. Resolves to the number
    /// shown; rejects with the error message.
    pub fn display_notes(&self) -> js_sys::Promise {
        let app = self.app.clone();
        future_to_promise(async move {
            match app.display_notes().await {
                Ok(n) => Ok(JsValue::from(u32::try_from(n).unwrap_or(u32::MAX))),
                Err(e) => Err(JsValue::from_str(&e.to_string())),
            }
        })
    }

    /// Remove displayed notes. Returns how many were removed.
    pub fn hide_notes(&self) -> usize {
        self.app.hide_notes()
    }

    /// Leave highlight drawing mode, as Escape does.
    pub fn cancel_drawing(&self) -> bool {
        self.app.cancel_drawing()
    }

    pub fn overlay_count(&self) -> usize {
        self.app.overlay_count()
    }

    #[wasm_bindgen(getter)]
    pub fn on_diagram(&self) -> bool {
        self.app.on_diagram()
    }

    /// Replace the reconciliation settings (partial JSON, rest defaulted).
    pub fn set_reconcile_config(&self, json: &str) -> Result<(), JsValue> {
        let config = ReconcileConfig::from_json(json).map_err(|e| JsValue::from_str(&e))?;
        self.app.set_reconcile_config(config);
        Ok(())
    }
}

fn console_error_panic_hook_setup() {
    #[cfg(target_arch = "wasm32")]
    {
        use std::sync::Once;
        static SET_HOOK: Once = Once::new();
        SET_HOOK.call_once(|| {
            std::panic::set_hook(Box::new(|info| {
                let msg = format!("FlowNotes WASM panic: {info}");
                web_sys::console::error_1(&msg.into());
            }));
        });
    }
}

// ─── Standalone helpers (no engine needed) ───────────────────────────────

/// The flow id in a page URL, if any.
#[wasm_bindgen]
pub fn flow_id_from_url(href: &str) -> Option<String> {
    diagram_id_from_url(href, DIAGRAM_ID_PARAM).map(|id| id.as_str().to_string())
}

/// Default settings as JSON, for the options page to start from.
#[wasm_bindgen]
pub fn default_settings() -> String {
    serde_json::json!({
        "reconcile": ReconcileConfig::default(),
        "watcher": fn_editor::WatcherConfig::default(),
        "store": fn_editor::StoreConfig::default(),
        "prefer_transform_group": false,
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn flow_id_is_read_from_url() {
        assert_eq!(
            flow_id_from_url(
                "https://acme.lightning.force.com/builder_platform_interaction/flowBuilder.app?flowId=301Ab"
            ),
            Some("301Ab".to_string())
        );
        assert_eq!(flow_id_from_url("https://acme.lightning.force.com/"), None);
    }

    #[test]
    fn default_settings_round_trip() {
        let settings: Settings = serde_json::from_str(&default_settings()).unwrap();
        assert_eq!(settings.reconcile, ReconcileConfig::default());
        assert_eq!(settings.store.object, "FlowNote__c");
        assert!(!settings.prefer_transform_group);
    }

    #[test]
    fn partial_settings_fill_defaults() {
        let settings: Settings =
            serde_json::from_str(r#"{"watcher":{"debounce_ms":50},"log_level":"debug"}"#).unwrap();
        assert_eq!(settings.watcher.debounce_ms, 50.0);
        assert_eq!(settings.watcher.poll_interval_ms, 1000);
        assert_eq!(settings.log_level.as_deref(), Some("debug"));
    }
}
