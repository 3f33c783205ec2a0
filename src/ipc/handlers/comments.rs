use super::context::calc_inputs;
use crate::comments;
use crate::ipc::error::ok;
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn handle_catalog(state: &mut AppState, req: &Request) -> serde_json::Value {
    let inputs = match calc_inputs(state, req) {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    ok(
        &req.id,
        json!({
            "locale": inputs.locale,
            "comments": comments::catalog(inputs.locale),
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "comments.catalog" => Some(handle_catalog(state, req)),
        _ => None,
    }
}
