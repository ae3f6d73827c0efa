//! Line-delimited JSON-RPC front door.
//!
//! Each stdin line is one request, each stdout line one response:
//!
//! ```text
//! -> {"id":1,"method":"list_roles"}
//! <- {"id":1,"result":{"roles":[{"id":"qa","name":"QA Engineer",...}]}}
//! -> {"id":2,"method":"start_squad_members","params":{"members":[{"roleId":"qa","task":"..."}]}}
//! <- {"id":2,"result":{"squadId":"...","members":[...]}}
//! ```
//!
//! Requests are served concurrently, so responses may come back out of
//! order; the `id` ties them together.

mod handler;
mod server;

pub use handler::Handler;
pub use server::{serve, serve_stdio};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The line was not valid JSON or not a request object.
pub const PARSE_ERROR: i64 = -32700;
/// No such method.
pub const METHOD_NOT_FOUND: i64 = -32601;
/// The method failed.
pub const INTERNAL_ERROR: i64 = -32603;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
}

impl Response {
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            result: Some(result),
            error: None,
            id,
        }
    }

    pub fn failure(id: Option<Value>, code: i64, message: impl Into<String>) -> Self {
        Self {
            result: None,
            error: Some(RpcError {
                code,
                message: message.into(),
            }),
            id,
        }
    }
}
