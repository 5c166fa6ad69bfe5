use crate::book::{self, BookError, CoverFont};
use crate::catalog::Section;
use crate::ipc::error::ok;
use crate::ipc::helpers::{get_optional_str, require_session, require_workspace, HandlerErr};
use crate::ipc::types::{AppState, Request};
use anyhow::Context;
use serde_json::json;
use std::path::{Path, PathBuf};

fn write_book(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.to_string_lossy()))?;
    }
    std::fs::write(path, bytes)
        .with_context(|| format!("failed to write book {}", path.to_string_lossy()))
}

fn book_assemble(state: &AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    require_workspace(state)?;
    let binding = require_session(state)?;
    let (Some(config), Some(store)) = (state.config.as_ref(), state.upload_store()) else {
        return Err(HandlerErr::new("no_workspace", "select a workspace first"));
    };
    let include_cover = match params.get("includeCover") {
        None | Some(serde_json::Value::Null) => config.include_cover_by_default,
        Some(v) => v
            .as_bool()
            .ok_or_else(|| HandlerErr::new("bad_params", "includeCover must be boolean"))?,
    };

    let cover = if include_cover {
        let rendered = match config.cover_font.as_deref() {
            Some(path) => {
                let font = CoverFont::load(path).map_err(|e| {
                    HandlerErr::new("io_failed", format!("{e:#}"))
                        .with_details(json!({ "path": path.to_string_lossy() }))
                })?;
                book::render_cover_with_font(
                    &binding.identifier,
                    &binding.display_name,
                    &binding.form,
                    &font,
                )
            }
            None => book::render_cover(&binding.identifier, &binding.display_name, &binding.form),
        };
        Some(rendered.map_err(|e| HandlerErr::new("render_failed", format!("{e:#}")))?)
    } else {
        None
    };

    let assembled = match book::assemble(&store, &binding.identifier, &Section::ALL, cover.as_deref()) {
        Ok(b) => b,
        Err(BookError::NoContent) => {
            return Err(HandlerErr::new("no_content", "no PDF files to combine yet"))
        }
        Err(e) => return Err(HandlerErr::new(e.code(), e.to_string())),
    };

    let file_name = book::book_file_name(&binding.identifier, &config.book_label);
    let out_path = get_optional_str(params, "outPath")
        .map(PathBuf::from)
        .unwrap_or_else(|| config.data_dir.join("books").join(&file_name));
    write_book(&out_path, &assembled.bytes).map_err(|e| {
        HandlerErr::new("io_failed", format!("{e:#}"))
            .with_details(json!({ "path": out_path.to_string_lossy() }))
    })?;

    Ok(json!({
        "path": out_path.to_string_lossy(),
        "fileName": file_name,
        "mime": "application/pdf",
        "pageCount": assembled.page_count,
        "byteCount": assembled.bytes.len(),
        "included": assembled.included,
        "skipped": assembled.skipped,
        "coverIncluded": include_cover,
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "book.assemble" => Some(match book_assemble(state, &req.params) {
            Ok(v) => ok(&req.id, v),
            Err(e) => e.response(&req.id),
        }),
        _ => None,
    }
}
