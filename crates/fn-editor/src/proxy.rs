//! The relay seam: one request/response call that performs HTTP against the
//! data store with whatever credentials the host context holds.

use crate::error::RemoteError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Patch,
    Delete,
}

/// Message handed to the relay.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProxyRequest {
    pub path: String,
    pub method: Method,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

impl ProxyRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method: Method::Get,
            body: None,
        }
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method: Method::Delete,
            body: None,
        }
    }

    pub fn with_body(path: impl Into<String>, method: Method, body: Value) -> Self {
        Self {
            path: path.into(),
            method,
            body: Some(body),
        }
    }
}

/// What the relay reports back. The body is the raw response text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProxyResponse {
    pub ok: bool,
    pub status: u16,
    pub body: String,
    pub content_type: String,
}

impl ProxyResponse {
    /// Parse the body as JSON; empty or malformed bodies become `None`.
    pub fn json(&self) -> Option<Value> {
        if self.body.trim().is_empty() {
            return None;
        }
        match serde_json::from_str(&self.body) {
            Ok(v) => Some(v),
            Err(e) => {
                log::warn!("unparsable response body ({} bytes): {e}", self.body.len());
                None
            }
        }
    }
}

/// Transport to the data store.
///
/// `Err` is reserved for relay failures; an HTTP error status is still a
/// successful exchange and comes back as `Ok` with `ok == false`.
#[allow(async_fn_in_trait)]
pub trait Proxy {
    async fn send(&self, request: ProxyRequest) -> Result<ProxyResponse, RemoteError>;
}

impl<P: Proxy> Proxy for &P {
    async fn send(&self, request: ProxyRequest) -> Result<ProxyResponse, RemoteError> {
        (**self).send(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn request_wire_shape() {
        let req = ProxyRequest::with_body("/x", Method::Patch, json!({"NoteText__c": "hi"}));
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({"path": "/x", "method": "PATCH", "body": {"NoteText__c": "hi"}})
        );
        let req = ProxyRequest::get("/q");
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({"path": "/q", "method": "GET"})
        );
    }

    #[test]
    fn response_tolerates_missing_fields() {
        let resp: ProxyResponse = serde_json::from_str(r#"{"ok":true,"status":204}"#).unwrap();
        assert!(resp.ok);
        assert_eq!(resp.body, "");
        assert_eq!(resp.json(), None);
        let resp = ProxyResponse {
            body: "<html>".into(),
            ..Default::default()
        };
        assert_eq!(resp.json(), None);
    }
}
