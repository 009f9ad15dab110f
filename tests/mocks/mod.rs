//! wiremock servers standing in for Prometheus and Loki
#![allow(dead_code)]

pub mod loki_mock;
pub mod prometheus_mock;

use serde_json::{json, Value};
use wiremock::ResponseTemplate;

/// `{"status":"success","data":{...}}`
pub fn success(result_type: &str, result: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "status": "success",
        "data": { "resultType": result_type, "result": result }
    }))
}

/// Error envelope as both APIs return it for rejected queries
pub fn api_error(status: u16, error_type: &str, error: &str) -> ResponseTemplate {
    ResponseTemplate::new(status).set_body_json(json!({
        "status": "error",
        "errorType": error_type,
        "error": error
    }))
}
