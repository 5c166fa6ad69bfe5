use crate::ipc::error::ok;
use crate::ipc::helpers::{require_session, HandlerErr};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

const SUMMARY_MAX_CHARS: usize = 20_000;

fn form_get(state: &AppState) -> Result<serde_json::Value, HandlerErr> {
    let binding = require_session(state)?;
    Ok(json!({ "form": binding.form }))
}

fn form_save(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    require_session(state)?;
    let summary = match params.get("summary") {
        None | Some(serde_json::Value::Null) => String::new(),
        Some(v) => v
            .as_str()
            .ok_or_else(|| HandlerErr::new("bad_params", "summary must be string"))?
            .to_string(),
    };
    if summary.chars().count() > SUMMARY_MAX_CHARS {
        return Err(HandlerErr::new(
            "bad_params",
            format!("summary must be at most {} characters", SUMMARY_MAX_CHARS),
        ));
    }
    let Some(binding) = state.session.binding_mut() else {
        return Err(HandlerErr::new("not_authenticated", "log in first"));
    };
    binding.form.summary = summary;
    tracing::debug!(identifier = %binding.identifier, "form saved");
    Ok(json!({ "form": binding.form }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "form.get" => form_get(state),
        "form.save" => form_save(state, &req.params),
        _ => return None,
    };
    Some(match result {
        Ok(v) => ok(&req.id, v),
        Err(e) => e.response(&req.id),
    })
}
