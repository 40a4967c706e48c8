//! Remote note store over the relay.
//!
//! Writes are filtered through the object's describe result (only creatable
//! or updatable fields are sent). When the data store still rejects a column,
//! the offending anchor fields are stripped and the write is retried once.

use crate::error::RemoteError;
use crate::proxy::{Method, Proxy, ProxyRequest, ProxyResponse};
use fn_core::record::{anchor_fields, fields};
use fn_core::{Anchor, DiagramId, NoteDraft, NoteId, NoteRecord};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use smallvec::SmallVec;
use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;
use std::sync::LazyLock;

static NO_SUCH_COLUMN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"No such column '(\w+)'").expect("valid column regex"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub api_version: String,
    pub object: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            api_version: "v60.0".to_string(),
            object: "FlowNote__c".to_string(),
        }
    }
}

impl StoreConfig {
    fn data_root(&self) -> String {
        format!("/services/data/{}", self.api_version)
    }

    pub fn object_path(&self) -> String {
        format!("{}/sobjects/{}", self.data_root(), self.object)
    }

    pub fn record_path(&self, id: NoteId) -> String {
        format!("{}/{}", self.object_path(), id)
    }

    pub fn describe_path(&self) -> String {
        format!("{}/describe", self.object_path())
    }

    pub fn query_path(&self, soql: &str) -> String {
        let encoded: String = url::form_urlencoded::byte_serialize(soql.as_bytes()).collect();
        format!("{}/query?q={encoded}", self.data_root())
    }
}

/// Escape a value for interpolation into a quoted SOQL literal.
pub fn escape_soql(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Column names the data store reported as nonexistent.
pub fn rejected_columns(body: &str) -> SmallVec<[String; 4]> {
    NO_SUCH_COLUMN
        .captures_iter(body)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .collect()
}

// ─── Field capabilities ──────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct DescribeBody {
    #[serde(default)]
    fields: Vec<DescribeField>,
}

#[derive(Debug, Deserialize)]
struct DescribeField {
    name: String,
    #[serde(default)]
    createable: bool,
    #[serde(default)]
    updateable: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteKind {
    Create,
    Update,
}

/// Per-field write permissions from the object's describe call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldCaps {
    known: HashSet<String>,
    createable: HashSet<String>,
    updateable: HashSet<String>,
}

impl FieldCaps {
    pub fn from_describe(body: &str) -> Option<Self> {
        let parsed: DescribeBody = match serde_json::from_str(body) {
            Ok(d) => d,
            Err(e) => {
                log::warn!("describe response unparsable: {e}");
                return None;
            }
        };
        let mut caps = FieldCaps::default();
        for f in parsed.fields {
            if f.createable {
                caps.createable.insert(f.name.clone());
            }
            if f.updateable {
                caps.updateable.insert(f.name.clone());
            }
            caps.known.insert(f.name);
        }
        Some(caps)
    }

    pub fn exists(&self, field: &str) -> bool {
        self.known.contains(field)
    }

    pub fn allows(&self, field: &str, kind: WriteKind) -> bool {
        match kind {
            WriteKind::Create => self.createable.contains(field),
            WriteKind::Update => self.updateable.contains(field),
        }
    }

    /// Drop fields this write may not carry. Returns the dropped names.
    pub fn filter(&self, payload: &mut Map<String, Value>, kind: WriteKind) -> Vec<String> {
        let mut dropped = Vec::new();
        payload.retain(|name, _| {
            let keep = self.allows(name, kind);
            if !keep {
                dropped.push(name.clone());
            }
            keep
        });
        dropped
    }
}

// ─── Store ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct CreateResult {
    id: Option<NoteId>,
}

#[derive(Debug, Default, Deserialize)]
struct QueryResult {
    #[serde(default)]
    records: Vec<Value>,
}

pub struct NoteStore<P> {
    proxy: P,
    config: StoreConfig,
    caps: RefCell<Option<Rc<FieldCaps>>>,
}

impl<P: Proxy> NoteStore<P> {
    pub fn new(proxy: P, config: StoreConfig) -> Self {
        Self {
            proxy,
            config,
            caps: RefCell::new(None),
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Field capabilities, fetched once per store. A failed describe is not
    /// cached and leaves writes unfiltered.
    pub async fn describe(&self) -> Option<Rc<FieldCaps>> {
        if let Some(caps) = self.caps.borrow().as_ref() {
            return Some(Rc::clone(caps));
        }
        let resp = match self.proxy.send(ProxyRequest::get(self.config.describe_path())).await {
            Ok(r) if r.ok => r,
            Ok(r) => {
                log::warn!("describe failed with HTTP {}", r.status);
                return None;
            }
            Err(e) => {
                log::warn!("describe failed: {e}");
                return None;
            }
        };
        let caps = Rc::new(FieldCaps::from_describe(&resp.body)?);
        *self.caps.borrow_mut() = Some(Rc::clone(&caps));
        Some(caps)
    }

    /// Create a note. Returns the new record id when the response carries
    /// one.
    pub async fn create(&self, draft: &NoteDraft) -> Result<Option<NoteId>, RemoteError> {
        let text = draft.text.trim();
        if text.is_empty() {
            return Err(RemoteError::EmptyText);
        }
        if draft.diagram_id.as_str().is_empty() {
            return Err(RemoteError::MissingDiagramId);
        }
        let mut payload = draft.to_fields();
        payload.insert(fields::TEXT.to_string(), Value::from(text));
        let resp = self
            .write(Method::Post, self.config.object_path(), payload, WriteKind::Create)
            .await?;
        let id = resp
            .json()
            .and_then(|v| serde_json::from_value::<CreateResult>(v).ok())
            .and_then(|r| r.id);
        log::debug!("created note {id:?}");
        Ok(id)
    }

    pub async fn update_text(&self, id: NoteId, text: &str) -> Result<(), RemoteError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(RemoteError::EmptyText);
        }
        let mut payload = Map::new();
        payload.insert(fields::TEXT.to_string(), Value::from(text));
        self.write(Method::Patch, self.config.record_path(id), payload, WriteKind::Update)
            .await
            .map(drop)
    }

    /// Persist a re-captured anchor after a drag.
    pub async fn update_anchor(&self, id: NoteId, anchor: &Anchor) -> Result<(), RemoteError> {
        self.write(
            Method::Patch,
            self.config.record_path(id),
            anchor_fields(anchor),
            WriteKind::Update,
        )
        .await
        .map(drop)
    }

    pub async fn delete(&self, id: NoteId) -> Result<(), RemoteError> {
        let resp = self
            .proxy
            .send(ProxyRequest::delete(self.config.record_path(id)))
            .await?;
        check(resp).map(drop)
    }

    /// All notes of `diagram`, newest first. Malformed bodies and records
    /// without an id are dropped, never fatal.
    pub async fn query(&self, diagram: &DiagramId) -> Result<Vec<NoteRecord>, RemoteError> {
        let caps = self.describe().await;
        let mut columns: Vec<&str> = std::iter::once(fields::ID)
            .chain([fields::DIAGRAM_ID, fields::TEXT, fields::CREATED_DATE])
            .chain(fields::ANCHOR)
            .filter(|c| match &caps {
                Some(caps) if c.ends_with("__c") => caps.exists(c),
                _ => true,
            })
            .collect();

        let mut resp = self.send_query(&columns, diagram).await?;
        if !resp.ok {
            let rejected = rejected_columns(&resp.body);
            let before = columns.len();
            columns.retain(|c| !rejected.iter().any(|r| r == c));
            if columns.len() == before {
                return Err(status_error(&resp));
            }
            log::warn!("query retried without rejected columns {rejected:?}");
            resp = check(self.send_query(&columns, diagram).await?)?;
        }

        let result: QueryResult = resp
            .json()
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default();
        let total = result.records.len();
        let records: Vec<NoteRecord> = result
            .records
            .into_iter()
            .filter_map(|v| serde_json::from_value::<NoteRecord>(v).ok())
            .filter(|r| r.id.is_some())
            .collect();
        if records.len() < total {
            log::warn!("dropped {} malformed note records", total - records.len());
        }
        log::debug!("query for {diagram}: {} notes", records.len());
        Ok(records)
    }

    async fn send_query(&self, columns: &[&str], diagram: &DiagramId) -> Result<ProxyResponse, RemoteError> {
        let soql = format!(
            "SELECT {} FROM {} WHERE {} = '{}' ORDER BY {} DESC",
            columns.join(", "),
            self.config.object,
            fields::DIAGRAM_ID,
            escape_soql(diagram.as_str()),
            fields::CREATED_DATE,
        );
        self.proxy
            .send(ProxyRequest::get(self.config.query_path(&soql)))
            .await
    }

    /// Filter, send, and on a rejected-column error strip and retry once.
    async fn write(
        &self,
        method: Method,
        path: String,
        mut payload: Map<String, Value>,
        kind: WriteKind,
    ) -> Result<ProxyResponse, RemoteError> {
        let dropped = match self.describe().await {
            Some(caps) => caps.filter(&mut payload, kind),
            None => Vec::new(),
        };
        if !dropped.is_empty() {
            log::debug!("not writable ({kind:?}): {dropped:?}");
        }
        if payload.is_empty() {
            log::warn!("nothing writable left for {path}");
            return Err(RemoteError::RejectedFields(dropped));
        }

        let resp = self
            .proxy
            .send(ProxyRequest::with_body(&path, method, Value::Object(payload.clone())))
            .await?;
        if resp.ok {
            return Ok(resp);
        }

        let stripped: SmallVec<[String; 4]> = rejected_columns(&resp.body)
            .into_iter()
            .filter(|name| fields::ANCHOR.contains(&name.as_str()))
            .filter(|name| payload.remove(name).is_some())
            .collect();
        if stripped.is_empty() {
            return Err(status_error(&resp));
        }
        log::warn!("retrying {method:?} {path} without {stripped:?}");

        let retry = self
            .proxy
            .send(ProxyRequest::with_body(&path, method, Value::Object(payload)))
            .await?;
        if retry.ok {
            return Ok(retry);
        }
        let still: Vec<String> = rejected_columns(&retry.body).into_vec();
        if still.is_empty() {
            Err(status_error(&retry))
        } else {
            Err(RemoteError::RejectedFields(still))
        }
    }
}

fn check(resp: ProxyResponse) -> Result<ProxyResponse, RemoteError> {
    if resp.ok { Ok(resp) } else { Err(status_error(&resp)) }
}

/// Best human-readable message from an error response: the first
/// `message` of the usual error array, else the raw body.
fn status_error(resp: &ProxyResponse) -> RemoteError {
    let message = resp
        .json()
        .and_then(|v| {
            v.as_array()
                .and_then(|a| a.first())
                .and_then(|e| e.get("message"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| resp.body.trim().to_string());
    RemoteError::Status {
        status: resp.status,
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn soql_escaping() {
        assert_eq!(escape_soql(r"a'b\c"), r"a\'b\\c");
        assert_eq!(escape_soql("301Ab000"), "301Ab000");
    }

    #[test]
    fn paths() {
        let c = StoreConfig::default();
        assert_eq!(c.object_path(), "/services/data/v60.0/sobjects/FlowNote__c");
        assert_eq!(
            c.record_path(NoteId::intern("a01")),
            "/services/data/v60.0/sobjects/FlowNote__c/a01"
        );
        assert_eq!(c.describe_path(), "/services/data/v60.0/sobjects/FlowNote__c/describe");
        assert_eq!(
            c.query_path("SELECT Id FROM X WHERE Y = 'z'"),
            "/services/data/v60.0/query?q=SELECT+Id+FROM+X+WHERE+Y+%3D+%27z%27"
        );
    }

    #[test]
    fn rejected_column_pattern() {
        let body = r#"[{"message":"\nBRX__c, BRY__c\n ^\nERROR at Row:1:Column:40\nNo such column 'BRX__c' on sobject of type FlowNote__c","errorCode":"INVALID_FIELD"},{"message":"No such column 'BRY__c' on sobject of type FlowNote__c","errorCode":"INVALID_FIELD"}]"#;
        assert_eq!(rejected_columns(body).into_vec(), vec!["BRX__c", "BRY__c"]);
        assert!(rejected_columns("Session expired").is_empty());
    }

    #[test]
    fn caps_filter() {
        let caps = FieldCaps::from_describe(
            r#"{"name":"FlowNote__c","fields":[{"name":"Id","createable":false,"updateable":false},{"name":"NoteText__c","createable":true,"updateable":true},{"name":"FlowId__c","createable":true,"updateable":false}]}"#,
        )
        .unwrap();
        let mut p = Map::new();
        p.insert("NoteText__c".into(), Value::from("x"));
        p.insert("FlowId__c".into(), Value::from("301"));
        p.insert("Top__c".into(), Value::from(1.0));
        let mut update = p.clone();
        assert_eq!(caps.filter(&mut p, WriteKind::Create), vec!["Top__c".to_string()]);
        assert_eq!(p.len(), 2);
        caps.filter(&mut update, WriteKind::Update);
        assert_eq!(update.keys().collect::<Vec<_>>(), vec!["NoteText__c"]);
        assert!(FieldCaps::from_describe("not json").is_none());
    }

    #[test]
    fn status_error_prefers_message() {
        let resp = ProxyResponse {
            ok: false,
            status: 401,
            body: r#"[{"message":"Session expired or invalid","errorCode":"INVALID_SESSION_ID"}]"#.into(),
            content_type: "application/json".into(),
        };
        assert_eq!(
            status_error(&resp),
            RemoteError::Status {
                status: 401,
                message: "Session expired or invalid".into()
            }
        );
    }
}
