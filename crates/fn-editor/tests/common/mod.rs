//! In-memory stand-in for the data store behind the relay.

#![allow(dead_code)]

use fn_editor::{Method, Proxy, ProxyRequest, ProxyResponse, RemoteError};
use serde_json::{Map, Value, json};
use std::cell::{Cell, RefCell};
use std::collections::HashSet;

pub const OBJECT_PATH: &str = "/services/data/v60.0/sobjects/FlowNote__c";
pub const QUERY_PREFIX: &str = "/services/data/v60.0/query?q=";

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub struct FakeOrg {
    /// Columns that exist on the object.
    columns: HashSet<String>,
    /// Raw describe body; `None` answers describe with HTTP 500.
    describe: Option<String>,
    /// Raw query body overriding the stored records.
    query_body: Option<String>,
    /// Relay is down: every call fails at transport level.
    offline: bool,
    records: RefCell<Vec<Map<String, Value>>>,
    next_id: Cell<u32>,
    pub log: RefCell<Vec<ProxyRequest>>,
}

impl FakeOrg {
    /// Object with every note column the client knows about.
    pub fn full() -> Self {
        Self::with_columns(&[
            "Id", "CreatedDate", "FlowId__c", "NoteText__c", "TLX__c", "TLY__c", "TRX__c",
            "TRY__c", "BLX__c", "BLY__c", "BRX__c", "BRY__c", "CenterX__c", "CenterY__c",
            "Top__c", "Left__c",
        ])
    }

    pub fn with_columns(columns: &[&str]) -> Self {
        Self {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            describe: None,
            query_body: None,
            offline: false,
            records: RefCell::new(Vec::new()),
            next_id: Cell::new(1),
            log: RefCell::new(Vec::new()),
        }
    }

    pub fn describe(mut self, body: &str) -> Self {
        self.describe = Some(body.to_string());
        self
    }

    pub fn query_body(mut self, body: &str) -> Self {
        self.query_body = Some(body.to_string());
        self
    }

    pub fn offline(mut self) -> Self {
        self.offline = true;
        self
    }

    pub fn requests(&self, method: Method) -> Vec<ProxyRequest> {
        self.log
            .borrow()
            .iter()
            .filter(|r| r.method == method)
            .cloned()
            .collect()
    }

    pub fn describe_calls(&self) -> usize {
        self.log
            .borrow()
            .iter()
            .filter(|r| r.path.ends_with("/describe"))
            .count()
    }

    pub fn record_count(&self) -> usize {
        self.records.borrow().len()
    }

    pub fn record(&self, id: &str) -> Option<Map<String, Value>> {
        self.records
            .borrow()
            .iter()
            .find(|r| r.get("Id").and_then(Value::as_str) == Some(id))
            .cloned()
    }

    fn unknown<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> Vec<&'a str> {
        names
            .into_iter()
            .filter(|n| !self.columns.contains(*n))
            .collect()
    }

    fn handle(&self, req: &ProxyRequest) -> ProxyResponse {
        if req.path.ends_with("/describe") {
            return match &self.describe {
                Some(body) => ok(200, body.clone()),
                None => fail(500, "UNKNOWN_EXCEPTION", "describe unavailable"),
            };
        }
        if let Some(q) = req.path.strip_prefix(QUERY_PREFIX) {
            return self.query(q);
        }
        let body = req.body.as_ref().and_then(Value::as_object);
        match req.method {
            Method::Post if req.path == OBJECT_PATH => {
                let fields = body.cloned().unwrap_or_default();
                if let Some(resp) = self.reject(fields.keys().map(String::as_str)) {
                    return resp;
                }
                let id = format!("a0B00000000{:04}", self.next_id.get());
                self.next_id.set(self.next_id.get() + 1);
                let mut record = fields;
                record.insert("Id".into(), Value::from(id.as_str()));
                self.records.borrow_mut().push(record);
                ok(201, json!({"id": id, "success": true, "errors": []}).to_string())
            }
            Method::Patch => {
                let fields = body.cloned().unwrap_or_default();
                if let Some(resp) = self.reject(fields.keys().map(String::as_str)) {
                    return resp;
                }
                let id = req.path.rsplit('/').next().unwrap_or_default();
                let mut records = self.records.borrow_mut();
                match records
                    .iter_mut()
                    .find(|r| r.get("Id").and_then(Value::as_str) == Some(id))
                {
                    Some(r) => {
                        r.extend(fields);
                        ok(204, String::new())
                    }
                    None => fail(404, "NOT_FOUND", "The requested resource does not exist"),
                }
            }
            Method::Delete => {
                let id = req.path.rsplit('/').next().unwrap_or_default();
                let mut records = self.records.borrow_mut();
                let before = records.len();
                records.retain(|r| r.get("Id").and_then(Value::as_str) != Some(id));
                if records.len() < before {
                    ok(204, String::new())
                } else {
                    fail(404, "ENTITY_IS_DELETED", "entity is deleted")
                }
            }
            _ => fail(404, "NOT_FOUND", "The requested resource does not exist"),
        }
    }

    fn query(&self, encoded: &str) -> ProxyResponse {
        let soql: String = url::form_urlencoded::parse(format!("q={encoded}").as_bytes())
            .map(|(_, v)| v.into_owned())
            .next()
            .unwrap_or_default();
        let select = soql
            .strip_prefix("SELECT ")
            .and_then(|s| s.split(" FROM ").next())
            .unwrap_or_default();
        if let Some(resp) = self.reject(select.split(", ")) {
            return resp;
        }
        if let Some(body) = &self.query_body {
            return ok(200, body.clone());
        }
        let records: Vec<Value> = self
            .records
            .borrow()
            .iter()
            .rev()
            .map(|r| Value::Object(r.clone()))
            .collect();
        ok(
            200,
            json!({"totalSize": records.len(), "done": true, "records": records}).to_string(),
        )
    }

    fn reject<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> Option<ProxyResponse> {
        let unknown = self.unknown(names);
        if unknown.is_empty() {
            return None;
        }
        let errors: Vec<Value> = unknown
            .iter()
            .map(|c| {
                json!({
                    "message": format!("No such column '{c}' on sobject of type FlowNote__c"),
                    "errorCode": "INVALID_FIELD",
                })
            })
            .collect();
        Some(ProxyResponse {
            ok: false,
            status: 400,
            body: Value::from(errors).to_string(),
            content_type: "application/json".into(),
        })
    }
}

impl Proxy for FakeOrg {
    async fn send(&self, request: ProxyRequest) -> Result<ProxyResponse, RemoteError> {
        self.log.borrow_mut().push(request.clone());
        if self.offline {
            return Err(RemoteError::Transport("Extension context invalidated.".into()));
        }
        Ok(self.handle(&request))
    }
}

fn ok(status: u16, body: String) -> ProxyResponse {
    ProxyResponse {
        ok: true,
        status,
        body,
        content_type: "application/json;charset=UTF-8".into(),
    }
}

fn fail(status: u16, code: &str, message: &str) -> ProxyResponse {
    ProxyResponse {
        ok: false,
        status,
        body: json!([{"message": message, "errorCode": code}]).to_string(),
        content_type: "application/json;charset=UTF-8".into(),
    }
}
