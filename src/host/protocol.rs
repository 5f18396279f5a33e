//! JSON-RPC protocol types for the router server

use serde::{Deserialize, Serialize};

/// JSON-RPC request; one per input line
#[derive(Debug, Deserialize)]
pub struct Request {
    pub id: Option<serde_json::Value>,
    pub method: String,
    pub params: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct Response {
    pub id: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorResponse>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: i32,
    pub message: String,
}

impl Response {
    pub fn success(id: Option<serde_json::Value>, result: serde_json::Value) -> Self {
        Response { id, result: Some(result), error: None }
    }

    pub fn error(id: Option<serde_json::Value>, code: i32, message: String) -> Self {
        Response { id, result: None, error: Some(ErrorResponse { code, message }) }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

pub mod error_codes {
    pub const PARSE_ERROR: i32 = -32700;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;

    pub const NO_BOARD_LOADED: i32 = 2;
    pub const LAYER_NOT_FOUND: i32 = 3;
    pub const ROUTER_REJECTED: i32 = 4;
}

/// Deserialize `params` into `T`, or an INVALID_PARAMS response naming `expected`
pub fn parse_params<T: for<'de> Deserialize<'de>>(
    id: &Option<serde_json::Value>,
    params: Option<serde_json::Value>,
    expected: &str,
) -> Result<T, Response> {
    params
        .and_then(|p| serde_json::from_value(p).ok())
        .ok_or_else(|| Response::error(id.clone(), error_codes::INVALID_PARAMS, format!("Invalid params: expected {expected}")))
}
