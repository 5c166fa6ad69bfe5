use super::handlers;
use super::types::{AppState, Request};
use crate::ipc::error::err;

pub fn handle_request(state: &mut AppState, req: Request) -> serde_json::Value {
    let span = tracing::debug_span!("request", id = %req.id, method = %req.method);
    let _enter = span.enter();

    if let Some(resp) = handlers::core::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::setup::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::auth::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::form::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::uploads::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::book::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::admin::try_handle(state, &req) {
        return resp;
    }

    tracing::warn!(method = %req.method, "unknown method");
    err(
        &req.id,
        "not_implemented",
        format!("unknown method: {}", req.method),
        None,
    )
}
