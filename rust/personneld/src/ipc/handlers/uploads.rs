use crate::catalog::Section;
use crate::ipc::error::ok;
use crate::ipc::helpers::{get_required_str, require_session, require_workspace, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::uploads::{sanitize_name, UploadedFile};
use serde_json::json;
use std::path::PathBuf;

struct PendingUpload {
    original_name: String,
    bytes: Vec<u8>,
}

fn file_json(f: &UploadedFile) -> serde_json::Value {
    json!({
        "section": f.section.key(),
        "sectionDir": f.section.dir_name(),
        "filename": f.filename,
        "uploadedAt": f.uploaded_at,
        "path": f.path.to_string_lossy(),
        "isPdf": f.is_pdf(),
    })
}

fn read_pending(entry: &serde_json::Value) -> Result<PendingUpload, HandlerErr> {
    let source = PathBuf::from(get_required_str(entry, "sourcePath")?);
    let original_name = match entry.get("originalName").and_then(|v| v.as_str()) {
        Some(n) if !n.trim().is_empty() => n.trim().to_string(),
        _ => source
            .file_name()
            .and_then(|s| s.to_str())
            .map(|s| s.to_string())
            .ok_or_else(|| HandlerErr::new("bad_params", "sourcePath has no file name"))?,
    };
    let original_name = sanitize_name(&original_name)
        .map_err(|e| HandlerErr::new("bad_params", format!("{e:#}")))?;
    if !source.is_file() {
        return Err(HandlerErr::new("not_found", "source file not found")
            .with_details(json!({ "path": source.to_string_lossy() })));
    }
    let bytes = std::fs::read(&source).map_err(|e| {
        HandlerErr::new("io_failed", e.to_string())
            .with_details(json!({ "path": source.to_string_lossy() }))
    })?;
    Ok(PendingUpload {
        original_name,
        bytes,
    })
}

fn uploads_save(state: &AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    require_workspace(state)?;
    let binding = require_session(state)?;
    let section_raw = get_required_str(params, "section")?;
    let section = Section::parse(&section_raw)
        .ok_or_else(|| HandlerErr::new("bad_params", format!("unknown section: {}", section_raw)))?;

    // Read and name-check every source before writing anything so a bad
    // entry stores nothing.
    let pending: Vec<PendingUpload> = match params.get("files").and_then(|v| v.as_array()) {
        Some(entries) => entries.iter().map(read_pending).collect::<Result<_, _>>()?,
        None if params.get("sourcePath").is_some() => vec![read_pending(params)?],
        None => Vec::new(),
    };
    if pending.is_empty() {
        return Err(HandlerErr::new("bad_params", "no files selected"));
    }

    let Some(store) = state.upload_store() else {
        return Err(HandlerErr::new("no_workspace", "select a workspace first"));
    };
    let now = chrono::Local::now().naive_local();
    let mut saved: Vec<UploadedFile> = Vec::with_capacity(pending.len());
    for p in pending {
        match store.save_upload(&binding.identifier, section, &p.original_name, &p.bytes, now) {
            Ok(f) => saved.push(f),
            Err(e) => {
                discard(&saved);
                return Err(HandlerErr::new("storage_unavailable", format!("{e:#}")));
            }
        }
    }
    let rows: Vec<serde_json::Value> = saved.iter().map(file_json).collect();
    Ok(json!({ "count": rows.len(), "saved": rows }))
}

/// Removes the files of a batch that failed partway.
fn discard(saved: &[UploadedFile]) {
    for f in saved {
        if let Err(e) = std::fs::remove_file(&f.path) {
            tracing::warn!(file = %f.path.display(), error = %e, "failed to remove partial upload");
        }
    }
}

fn uploads_list(state: &AppState) -> Result<serde_json::Value, HandlerErr> {
    require_workspace(state)?;
    let binding = require_session(state)?;
    let Some(store) = state.upload_store() else {
        return Err(HandlerErr::new("no_workspace", "select a workspace first"));
    };
    let files = store
        .list_files(&binding.identifier)
        .map_err(|e| HandlerErr::new("storage_unavailable", format!("{e:#}")))?;
    let rows: Vec<serde_json::Value> = files.iter().map(file_json).collect();
    Ok(json!({
        "count": rows.len(),
        "files": rows,
        "root": store.uploads_root().to_string_lossy(),
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "uploads.save" => uploads_save(state, &req.params),
        "uploads.list" => uploads_list(state),
        _ => return None,
    };
    Some(match result {
        Ok(v) => ok(&req.id, v),
        Err(e) => e.response(&req.id),
    })
}
