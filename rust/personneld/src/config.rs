//! Workspace settings. Each section is a JSON object stored under
//! `setup.<section>`; stored values are merged over the defaults on read.

use crate::db;
use rusqlite::Connection;
use serde_json::{json, Map, Value};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_ROSTER_FILE: &str = "teachers.csv";
pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_BOOK_LABEL: &str = "PA_book";
pub const DEFAULT_CACHE_TTL_SECONDS: u64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupSection {
    Roster,
    Book,
    Uploads,
}

impl SetupSection {
    pub const ALL: [SetupSection; 3] = [Self::Roster, Self::Book, Self::Uploads];

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "roster" => Some(Self::Roster),
            "book" => Some(Self::Book),
            "uploads" => Some(Self::Uploads),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Roster => "roster",
            Self::Book => "book",
            Self::Uploads => "uploads",
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            Self::Roster => "setup.roster",
            Self::Book => "setup.book",
            Self::Uploads => "setup.uploads",
        }
    }
}

fn default_section(section: SetupSection) -> Value {
    match section {
        SetupSection::Roster => json!({
            "csvPath": "",
            "cacheTtlSeconds": DEFAULT_CACHE_TTL_SECONDS
        }),
        SetupSection::Book => json!({
            "label": DEFAULT_BOOK_LABEL,
            "includeCoverByDefault": true,
            "coverFontPath": ""
        }),
        SetupSection::Uploads => json!({
            "dataDir": ""
        }),
    }
}

fn parse_bool(v: &Value, key: &str) -> Result<bool, String> {
    v.as_bool().ok_or_else(|| format!("{} must be boolean", key))
}

fn parse_i64_range(v: &Value, key: &str, min: i64, max: i64) -> Result<i64, String> {
    let n = v.as_i64().ok_or_else(|| format!("{} must be integer", key))?;
    if !(min..=max).contains(&n) {
        return Err(format!("{} must be in {}..={}", key, min, max));
    }
    Ok(n)
}

fn parse_string_max(v: &Value, key: &str, max_len: usize) -> Result<String, String> {
    let s = v.as_str().ok_or_else(|| format!("{} must be string", key))?;
    let s = s.trim();
    if s.len() > max_len {
        return Err(format!("{} length must be <= {}", key, max_len));
    }
    Ok(s.to_string())
}

pub fn merge_section_patch(
    section: SetupSection,
    current: &mut Value,
    patch: &Map<String, Value>,
) -> Result<(), String> {
    let obj = current
        .as_object_mut()
        .ok_or_else(|| "internal setup object must be a JSON object".to_string())?;
    for (k, v) in patch {
        match section {
            SetupSection::Roster => match k.as_str() {
                "csvPath" => {
                    obj.insert(k.clone(), Value::String(parse_string_max(v, k, 1024)?));
                }
                "cacheTtlSeconds" => {
                    obj.insert(k.clone(), Value::from(parse_i64_range(v, k, 0, 86_400)?));
                }
                _ => return Err(format!("unknown roster field: {}", k)),
            },
            SetupSection::Book => match k.as_str() {
                "label" => {
                    let s = parse_string_max(v, k, 64)?;
                    if s.is_empty() {
                        return Err("label must not be empty".into());
                    }
                    if s.contains(['/', '\\']) {
                        return Err("label must not contain path separators".into());
                    }
                    obj.insert(k.clone(), Value::String(s));
                }
                "includeCoverByDefault" => {
                    obj.insert(k.clone(), Value::Bool(parse_bool(v, k)?));
                }
                "coverFontPath" => {
                    obj.insert(k.clone(), Value::String(parse_string_max(v, k, 1024)?));
                }
                _ => return Err(format!("unknown book field: {}", k)),
            },
            SetupSection::Uploads => match k.as_str() {
                "dataDir" => {
                    obj.insert(k.clone(), Value::String(parse_string_max(v, k, 1024)?));
                }
                _ => return Err(format!("unknown uploads field: {}", k)),
            },
        }
    }
    Ok(())
}

pub fn load_section(conn: &Connection, section: SetupSection) -> anyhow::Result<Value> {
    let mut current = default_section(section);
    if let Some(saved) = db::settings_get_json(conn, section.key())? {
        if let Some(saved_obj) = saved.as_object() {
            // Malformed stored values fall back to defaults.
            if let Err(msg) = merge_section_patch(section, &mut current, saved_obj) {
                tracing::warn!(section = section.name(), error = %msg, "ignoring invalid stored settings");
                current = default_section(section);
            }
        }
    }
    Ok(current)
}

pub fn load_all(conn: &Connection) -> anyhow::Result<Value> {
    let mut out = Map::new();
    for section in SetupSection::ALL {
        out.insert(section.name().to_string(), load_section(conn, section)?);
    }
    Ok(Value::Object(out))
}

/// Typed view of the settings, with paths resolved against the workspace.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkspaceConfig {
    pub roster_csv: PathBuf,
    pub cache_ttl: Duration,
    pub book_label: String,
    pub include_cover_by_default: bool,
    /// TrueType font embedded in the cover page; `None` uses Helvetica.
    pub cover_font: Option<PathBuf>,
    pub data_dir: PathBuf,
}

impl WorkspaceConfig {
    pub fn defaults(workspace: &Path) -> Self {
        Self {
            roster_csv: workspace.join(DEFAULT_ROSTER_FILE),
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECONDS),
            book_label: DEFAULT_BOOK_LABEL.to_string(),
            include_cover_by_default: true,
            cover_font: None,
            data_dir: workspace.join(DEFAULT_DATA_DIR),
        }
    }

    pub fn load(conn: &Connection, workspace: &Path) -> anyhow::Result<Self> {
        let roster = load_section(conn, SetupSection::Roster)?;
        let book = load_section(conn, SetupSection::Book)?;
        let uploads = load_section(conn, SetupSection::Uploads)?;
        let defaults = Self::defaults(workspace);

        Ok(Self {
            roster_csv: resolve_path(workspace, str_field(&roster, "csvPath"))
                .unwrap_or(defaults.roster_csv),
            cache_ttl: roster
                .get("cacheTtlSeconds")
                .and_then(|v| v.as_u64())
                .map(Duration::from_secs)
                .unwrap_or(defaults.cache_ttl),
            book_label: match str_field(&book, "label") {
                "" => defaults.book_label,
                s => s.to_string(),
            },
            include_cover_by_default: book
                .get("includeCoverByDefault")
                .and_then(|v| v.as_bool())
                .unwrap_or(defaults.include_cover_by_default),
            cover_font: resolve_path(workspace, str_field(&book, "coverFontPath")),
            data_dir: resolve_path(workspace, str_field(&uploads, "dataDir"))
                .unwrap_or(defaults.data_dir),
        })
    }
}

fn str_field<'a>(section: &'a Value, key: &str) -> &'a str {
    section.get(key).and_then(|v| v.as_str()).unwrap_or("")
}

fn resolve_path(workspace: &Path, raw: &str) -> Option<PathBuf> {
    if raw.is_empty() {
        return None;
    }
    let p = PathBuf::from(raw);
    Some(if p.is_absolute() { p } else { workspace.join(p) })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_workspace(prefix: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "{}-{}",
            prefix,
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .expect("clock")
                .as_nanos()
        ))
    }

    #[test]
    fn defaults_resolve_against_workspace() {
        let ws = temp_workspace("personneld-config-defaults");
        let conn = db::open_db(&ws).unwrap();
        let cfg = WorkspaceConfig::load(&conn, &ws).unwrap();
        assert_eq!(cfg, WorkspaceConfig::defaults(&ws));
        drop(conn);
        let _ = std::fs::remove_dir_all(ws);
    }

    #[test]
    fn patch_validation_rejects_bad_values() {
        let mut book = default_section(SetupSection::Book);
        let bad: Map<String, Value> = serde_json::from_value(json!({ "label": "a/b" })).unwrap();
        assert!(merge_section_patch(SetupSection::Book, &mut book, &bad).is_err());
        let mut roster = default_section(SetupSection::Roster);
        let bad: Map<String, Value> =
            serde_json::from_value(json!({ "cacheTtlSeconds": -1 })).unwrap();
        assert!(merge_section_patch(SetupSection::Roster, &mut roster, &bad).is_err());
        let unknown: Map<String, Value> = serde_json::from_value(json!({ "x": 1 })).unwrap();
        assert!(merge_section_patch(SetupSection::Uploads, &mut roster, &unknown).is_err());
    }

    #[test]
    fn stored_values_override_defaults() {
        let ws = temp_workspace("personneld-config-stored");
        let conn = db::open_db(&ws).unwrap();
        db::settings_set_json(
            &conn,
            SetupSection::Roster.key(),
            &json!({ "csvPath": "people/staff.csv", "cacheTtlSeconds": 5 }),
        )
        .unwrap();
        db::settings_set_json(
            &conn,
            SetupSection::Book.key(),
            &json!({ "label": "Portfolio", "coverFontPath": "fonts/THSarabunNew.ttf" }),
        )
        .unwrap();
        let cfg = WorkspaceConfig::load(&conn, &ws).unwrap();
        assert_eq!(cfg.roster_csv, ws.join("people/staff.csv"));
        assert_eq!(cfg.cache_ttl, Duration::from_secs(5));
        assert_eq!(cfg.book_label, "Portfolio");
        assert!(cfg.include_cover_by_default);
        assert_eq!(cfg.cover_font, Some(ws.join("fonts/THSarabunNew.ttf")));
        drop(conn);
        let _ = std::fs::remove_dir_all(ws);
    }
}
