use appdata_access::Identity;
use serde_json::Value;

use crate::Method;

/// One inbound request, after the transport layer has verified the caller
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    /// The verb
    pub method: Method,
    /// The slash-delimited resource path
    pub path: String,
    /// The verified caller
    pub identity: Identity,
    /// The decoded JSON body, if any was sent
    pub body: Option<Value>,
}

impl Request {
    /// A body-less request
    pub fn new(method: Method, path: impl Into<String>, identity: Identity) -> Self {
        Self {
            method,
            path: path.into(),
            identity,
            body: None,
        }
    }

    /// Attaches a JSON body
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// A successful reply. `body` is `None` for the empty payload mutating
/// methods answer with.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Response {
    /// The JSON payload
    pub body: Option<Value>,
}

impl Response {
    /// The empty success payload
    pub fn empty() -> Self {
        Self::default()
    }

    /// A JSON payload
    pub fn json(body: Value) -> Self {
        Self { body: Some(body) }
    }

    /// The serialized payload; the empty payload serializes to an empty
    /// string
    pub fn to_body_string(&self) -> String {
        self.body
            .as_ref()
            .map(Value::to_string)
            .unwrap_or_default()
    }
}
