//! Proxy relay backed by a host-supplied JS function.
//!
//! The content script hands us `relay(request) => Promise<reply>`, which
//! forwards the request to the background worker. Requests and replies
//! cross the boundary as plain JSON objects.

use fn_editor::{Proxy, ProxyRequest, ProxyResponse, RemoteError};
use serde::Deserialize;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;

/// What the background worker sends back. A reply carrying `error` never
/// reached the data store.
#[derive(Debug, Deserialize)]
struct RelayReply {
    #[serde(default)]
    error: Option<String>,
    #[serde(flatten)]
    response: ProxyResponse,
}

pub struct RelayProxy {
    relay: js_sys::Function,
}

impl RelayProxy {
    pub fn new(relay: js_sys::Function) -> Self {
        Self { relay }
    }
}

impl Proxy for RelayProxy {
    async fn send(&self, request: ProxyRequest) -> Result<ProxyResponse, RemoteError> {
        log::trace!("relay {:?} {}", request.method, request.path);
        let arg = to_js(&request)?;
        let promise = self
            .relay
            .call1(&JsValue::NULL, &arg)
            .map_err(|e| RemoteError::Transport(describe_js(&e)))?;
        let reply = JsFuture::from(js_sys::Promise::resolve(&promise))
            .await
            .map_err(|e| RemoteError::Transport(describe_js(&e)))?;
        parse_reply(&reply)
    }
}

fn to_js(request: &ProxyRequest) -> Result<JsValue, RemoteError> {
    let json = serde_json::to_string(request)
        .map_err(|e| RemoteError::Transport(format!("cannot encode request: {e}")))?;
    js_sys::JSON::parse(&json).map_err(|e| RemoteError::Transport(describe_js(&e)))
}

fn parse_reply(reply: &JsValue) -> Result<ProxyResponse, RemoteError> {
    if reply.is_undefined() || reply.is_null() {
        return Err(RemoteError::Transport("no response from background".into()));
    }
    let json: String = js_sys::JSON::stringify(reply)
        .map_err(|e| RemoteError::Transport(describe_js(&e)))?
        .into();
    decode_reply(&json)
}

fn decode_reply(json: &str) -> Result<ProxyResponse, RemoteError> {
    let reply: RelayReply = serde_json::from_str(json)
        .map_err(|e| RemoteError::Transport(format!("malformed relay reply: {e}")))?;
    match reply.error {
        Some(error) if !reply.response.ok => Err(RemoteError::Transport(error)),
        _ => Ok(reply.response),
    }
}

/// Best-effort text for a thrown JS value.
pub fn describe_js(value: &JsValue) -> String {
    if let Some(s) = value.as_string() {
        return s;
    }
    match value.dyn_ref::<js_sys::Error>() {
        Some(err) => err.message().into(),
        None => format!("{value:?}"),
    }
}
