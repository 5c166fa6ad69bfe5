use crate::catalog::Module;
use crate::ipc::error::ok;
use crate::ipc::helpers::{
    get_optional_str, get_required_str, require_admin, require_module, require_workspace,
    HandlerErr,
};
use crate::ipc::types::{load_roster, AppState, Request};
use crate::roster::Roster;
use serde_json::json;

fn roster_for_admin(state: &mut AppState) -> Result<Roster, HandlerErr> {
    load_roster(&mut state.roster_cache, state.config.as_ref())
        .cloned()
        .map_err(|e| HandlerErr::new("storage_unavailable", e.to_string()))
}

fn teacher_link(base: &str, identifier: &str) -> String {
    format!("{}?tid={}", base.trim_end_matches('/'), identifier)
}

fn admin_roster(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    require_workspace(state)?;
    require_admin(state)?;
    let roster = roster_for_admin(state)?;
    let base_url = get_optional_str(params, "baseUrl");
    let rows: Vec<serde_json::Value> = roster
        .records()
        .iter()
        .map(|r| {
            let mut row = json!(r);
            if let Some(base) = base_url.as_deref() {
                row["link"] = json!(teacher_link(base, &r.identifier));
            }
            row
        })
        .collect();
    Ok(json!({ "count": rows.len(), "records": rows }))
}

fn admin_modules(state: &AppState) -> Result<serde_json::Value, HandlerErr> {
    let binding = require_admin(state)?;
    let modules: Vec<serde_json::Value> = binding
        .grants
        .modules()
        .into_iter()
        .map(|m| json!({ "key": m.key(), "label": m.label() }))
        .collect();
    Ok(json!({ "role": binding.role.as_str(), "modules": modules }))
}

fn admin_module_open(state: &AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let raw = get_required_str(params, "module")?;
    let module = Module::parse(&raw)
        .ok_or_else(|| HandlerErr::new("bad_params", format!("unknown module: {}", raw)))?;
    require_module(state, module)?;
    Ok(json!({ "module": module.key(), "label": module.label() }))
}

/// Upload totals per roster record, shown on the PA module dashboard.
fn admin_file_counts(state: &mut AppState) -> Result<serde_json::Value, HandlerErr> {
    require_workspace(state)?;
    require_module(state, Module::Pa)?;
    let roster = roster_for_admin(state)?;
    let Some(store) = state.upload_store() else {
        return Err(HandlerErr::new("no_workspace", "select a workspace first"));
    };
    let mut rows = Vec::with_capacity(roster.len());
    for r in roster.records() {
        let count = store
            .count_files(&r.identifier)
            .map_err(|e| HandlerErr::new("storage_unavailable", format!("{e:#}")))?;
        rows.push(json!({
            "identifier": r.identifier,
            "name": r.name,
            "fileCount": count,
        }));
    }
    Ok(json!({ "rows": rows }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "admin.roster" => admin_roster(state, &req.params),
        "admin.modules" => admin_modules(state),
        "admin.module.open" => admin_module_open(state, &req.params),
        "admin.fileCounts" => admin_file_counts(state),
        _ => return None,
    };
    Some(match result {
        Ok(v) => ok(&req.id, v),
        Err(e) => e.response(&req.id),
    })
}
