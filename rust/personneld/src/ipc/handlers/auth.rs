use crate::auth::{AuthError, Screen};
use crate::ipc::error::ok;
use crate::ipc::helpers::{get_required_str, require_workspace, HandlerErr};
use crate::ipc::types::{load_roster, AppState, Request};
use serde_json::json;

fn login(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    require_workspace(state)?;
    let identifier = get_required_str(params, "identifier")?;
    let secret = get_required_str(params, "secret")?;
    let screen = match params.get("screen").and_then(|v| v.as_str()) {
        None => Screen::User,
        Some(raw) => Screen::parse(raw)
            .ok_or_else(|| HandlerErr::new("bad_params", "screen must be one of: user, admin"))?,
    };

    let outcome = match load_roster(&mut state.roster_cache, state.config.as_ref()) {
        Ok(roster) => state.session.login(roster, &identifier, &secret, screen),
        Err(e) => Err(AuthError::from(e)),
    };
    match outcome {
        Ok(binding) => {
            tracing::info!(identifier = %binding.identifier, role = binding.role.as_str(), ?screen, "login succeeded");
        }
        Err(e) => {
            tracing::warn!(identifier = %identifier.trim(), ?screen, reason = e.code(), "login rejected");
            return Err(HandlerErr::new(e.code(), e.to_string()));
        }
    }
    Ok(state.session.to_json())
}

fn handle_login(state: &mut AppState, req: &Request) -> serde_json::Value {
    match login(state, &req.params) {
        Ok(v) => ok(&req.id, v),
        Err(e) => e.response(&req.id),
    }
}

fn handle_logout(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Some(b) = state.session.binding() {
        tracing::info!(identifier = %b.identifier, "logout");
    }
    state.session.logout();
    ok(&req.id, state.session.to_json())
}

fn handle_session(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(&req.id, json!({ "session": state.session.to_json() }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "auth.login" => Some(handle_login(state, req)),
        "auth.logout" => Some(handle_logout(state, req)),
        "auth.session" => Some(handle_session(state, req)),
        _ => None,
    }
}
