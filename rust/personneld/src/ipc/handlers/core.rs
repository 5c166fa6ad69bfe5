use crate::auth::Session;
use crate::catalog::{Module, Section};
use crate::config::WorkspaceConfig;
use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use serde_json::json;
use std::path::PathBuf;

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string()),
            "session": state.session.to_json(),
        }),
    )
}

fn handle_workspace_select(state: &mut AppState, req: &Request) -> serde_json::Value {
    let p = req
        .params
        .get("path")
        .and_then(|v| v.as_str())
        .map(PathBuf::from);
    let Some(path) = p else {
        return err(&req.id, "bad_params", "missing params.path", None);
    };

    let conn = match db::open_db(&path) {
        Ok(conn) => conn,
        Err(e) => return err(&req.id, "db_open_failed", format!("{e:#}"), None),
    };
    let config = match WorkspaceConfig::load(&conn, &path) {
        Ok(c) => c,
        Err(e) => return err(&req.id, "db_query_failed", format!("{e:#}"), None),
    };

    // A different roster may sit behind the new workspace.
    state.roster_cache.set_ttl(config.cache_ttl);
    state.session = Session::Anonymous;
    tracing::info!(workspace = %path.display(), roster = %config.roster_csv.display(), "workspace selected");

    let result = json!({
        "workspacePath": path.to_string_lossy(),
        "rosterPath": config.roster_csv.to_string_lossy(),
        "dataDir": config.data_dir.to_string_lossy(),
    });
    state.workspace = Some(path);
    state.db = Some(conn);
    state.config = Some(config);
    ok(&req.id, result)
}

fn handle_sections_list(req: &Request) -> serde_json::Value {
    let sections: Vec<serde_json::Value> = Section::ALL
        .iter()
        .enumerate()
        .map(|(i, s)| {
            json!({
                "order": i + 1,
                "key": s.key(),
                "dir": s.dir_name(),
                "label": s.label(),
            })
        })
        .collect();
    ok(&req.id, json!({ "sections": sections }))
}

fn handle_modules_list(req: &Request) -> serde_json::Value {
    let modules: Vec<serde_json::Value> = Module::ALL
        .iter()
        .map(|m| json!({ "key": m.key(), "label": m.label() }))
        .collect();
    ok(&req.id, json!({ "modules": modules }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "workspace.select" => Some(handle_workspace_select(state, req)),
        "sections.list" => Some(handle_sections_list(req)),
        "modules.list" => Some(handle_modules_list(req)),
        _ => None,
    }
}
