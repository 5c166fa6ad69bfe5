use crate::auth::SessionBinding;
use crate::catalog::Module;
use crate::ipc::error::err;
use crate::ipc::types::AppState;
use serde_json::json;

pub struct HandlerErr {
    pub code: &'static str,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl HandlerErr {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn response(self, id: &str) -> serde_json::Value {
        err(id, self.code, self.message, self.details)
    }
}

pub fn get_required_str(params: &serde_json::Value, key: &str) -> Result<String, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| HandlerErr::new("bad_params", format!("missing {}", key)))
}

pub fn get_optional_str(params: &serde_json::Value, key: &str) -> Option<String> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

pub fn require_workspace(state: &AppState) -> Result<(), HandlerErr> {
    if state.config.is_none() {
        return Err(HandlerErr::new("no_workspace", "select a workspace first"));
    }
    Ok(())
}

pub fn require_session<'a>(state: &'a AppState) -> Result<&'a SessionBinding, HandlerErr> {
    state
        .session
        .binding()
        .ok_or_else(|| HandlerErr::new("not_authenticated", "log in first"))
}

pub fn require_admin<'a>(state: &'a AppState) -> Result<&'a SessionBinding, HandlerErr> {
    let binding = require_session(state)?;
    if !binding.is_admin() {
        return Err(HandlerErr::new(
            "insufficient_privilege",
            "administrator role required",
        ));
    }
    Ok(binding)
}

pub fn require_module<'a>(
    state: &'a AppState,
    module: Module,
) -> Result<&'a SessionBinding, HandlerErr> {
    let binding = require_admin(state)?;
    if !binding.can_access(module) {
        return Err(
            HandlerErr::new("module_forbidden", format!("no access to module {}", module.key()))
                .with_details(json!({ "module": module.key() })),
        );
    }
    Ok(binding)
}
