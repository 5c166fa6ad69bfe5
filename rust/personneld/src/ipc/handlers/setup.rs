use crate::config::{self, SetupSection, WorkspaceConfig};
use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn handle_setup_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match req.params.get("section").and_then(|v| v.as_str()) {
        Some(raw) => {
            let Some(section) = SetupSection::parse(raw) else {
                return err(&req.id, "bad_params", "unknown section", None);
            };
            match config::load_section(conn, section) {
                Ok(v) => ok(&req.id, json!({ section.name(): v })),
                Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
            }
        }
        None => match config::load_all(conn) {
            Ok(v) => ok(&req.id, v),
            Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
        },
    }
}

fn handle_setup_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let (Some(conn), Some(workspace)) = (state.db.as_ref(), state.workspace.as_ref()) else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let Some(section_raw) = req.params.get("section").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing section", None);
    };
    let Some(section) = SetupSection::parse(section_raw) else {
        return err(&req.id, "bad_params", "unknown section", None);
    };
    let Some(patch_obj) = req.params.get("patch").and_then(|v| v.as_object()) else {
        return err(&req.id, "bad_params", "patch must be an object", None);
    };

    let mut current = match config::load_section(conn, section) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    if let Err(msg) = config::merge_section_patch(section, &mut current, patch_obj) {
        return err(&req.id, "bad_params", msg, None);
    }
    if let Err(e) = db::settings_set_json(conn, section.key(), &current) {
        return err(&req.id, "db_update_failed", e.to_string(), None);
    }
    let reloaded = match WorkspaceConfig::load(conn, workspace) {
        Ok(c) => c,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    if section == SetupSection::Roster {
        state.roster_cache.set_ttl(reloaded.cache_ttl);
    }
    state.config = Some(reloaded);
    tracing::info!(section = section.name(), "settings updated");
    ok(&req.id, json!({ section.name(): current }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "setup.get" => Some(handle_setup_get(state, req)),
        "setup.update" => Some(handle_setup_update(state, req)),
        _ => None,
    }
}
