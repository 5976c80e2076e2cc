use serde_json::{json, Map, Value};

use crate::error::Outcome;
use crate::server::{Content, Request, Response};

/// Example handler: echoes the request back as JSON.
///
/// Useful for checking what the router captured and how the body was decoded.
pub fn echo_handler(req: &mut Request) -> Outcome {
    let params: Map<String, Value> = req
        .parameters
        .iter()
        .map(|(k, v)| (k.to_string(), Value::String(v.clone())))
        .collect();
    let query: Map<String, Value> = req
        .query_pairs()
        .iter()
        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
        .collect();
    let body = match req.content() {
        Some(Content::Json(value)) => value.clone(),
        Some(Content::Form(pairs)) => pairs
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect::<Map<_, _>>()
            .into(),
        Some(Content::Raw) => json!({ "raw_bytes": req.body_bytes()?.len() }),
        Some(Content::Empty) | None => Value::Null,
    };

    Ok(Response::json(&json!({
        "request_id": req.id.to_string(),
        "method": req.method.as_str(),
        "path": req.path(),
        "params": params,
        "query": query,
        "body": body,
    })))
}
