//! The user record store: typed roster rows loaded from `teachers.csv`.

use crate::catalog::Role;
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const ROSTER_COLUMNS: [&str; 7] = [
    "teacher_id",
    "name",
    "email",
    "department",
    "pin",
    "role",
    "admin_modules",
];

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub identifier: String,
    pub name: String,
    pub email: String,
    pub department: String,
    #[serde(skip_serializing)]
    pub secret: String,
    pub role: Role,
    pub admin_modules: String,
}

impl UserRecord {
    /// Module names listed in `admin_modules`, trimmed, empties dropped.
    pub fn administered_modules(&self) -> Vec<String> {
        self.admin_modules
            .split(',')
            .map(|m| m.trim())
            .filter(|m| !m.is_empty())
            .map(|m| m.to_string())
            .collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Roster {
    records: Vec<UserRecord>,
}

impl Roster {
    pub fn new(records: Vec<UserRecord>) -> Self {
        Self { records }
    }

    pub fn find(&self, identifier: &str) -> Option<&UserRecord> {
        self.records.iter().find(|r| r.identifier == identifier)
    }

    pub fn records(&self) -> &[UserRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Read side of the record store. Only loading is needed; rows are edited
/// outside this program.
pub trait RosterSource {
    fn load(&self) -> Result<Roster, StoreError>;
}

#[derive(Debug, Clone)]
pub struct CsvRoster {
    path: PathBuf,
}

impl CsvRoster {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RosterSource for CsvRoster {
    fn load(&self) -> Result<Roster, StoreError> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(t) => t,
            // An absent file is an empty roster, not an outage.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(path = %self.path.display(), "roster file not found");
                return Ok(Roster::default());
            }
            Err(e) => {
                return Err(StoreError::Unavailable(format!(
                    "{}: {}",
                    self.path.to_string_lossy(),
                    e
                )))
            }
        };
        let roster = parse_roster(&text);
        tracing::debug!(path = %self.path.display(), records = roster.len(), "roster loaded");
        Ok(roster)
    }
}

fn parse_csv_record(line: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    let mut buf = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '"' {
            if in_quotes && chars.peek() == Some(&'"') {
                buf.push('"');
                chars.next();
                continue;
            }
            in_quotes = !in_quotes;
            continue;
        }
        if ch == ',' && !in_quotes {
            out.push(std::mem::take(&mut buf));
            continue;
        }
        buf.push(ch);
    }
    out.push(buf);
    out
}

/// Parses roster CSV text. Columns are matched by header name; a missing
/// column reads as empty for every row.
pub fn parse_roster(text: &str) -> Roster {
    let mut lines = text.lines();
    let Some(header_line) = lines.next() else {
        return Roster::default();
    };
    let header: Vec<String> = parse_csv_record(header_line.trim_start_matches('\u{feff}'))
        .into_iter()
        .map(|h| h.trim().to_ascii_lowercase())
        .collect();
    let index_of = |col: &str| header.iter().position(|h| h == col);
    let idx: Vec<Option<usize>> = ROSTER_COLUMNS.iter().map(|c| index_of(*c)).collect();

    let mut seen: HashSet<String> = HashSet::new();
    let mut records = Vec::new();
    for (line_no, raw_line) in lines.enumerate() {
        if raw_line.trim().is_empty() {
            continue;
        }
        let fields = parse_csv_record(raw_line);
        let cell = |i: usize| -> String {
            idx[i]
                .and_then(|j| fields.get(j))
                .map(|s| s.trim().to_string())
                .unwrap_or_default()
        };
        let identifier = cell(0);
        if identifier.is_empty() {
            continue;
        }
        if !seen.insert(identifier.clone()) {
            tracing::warn!(line = line_no + 2, identifier = %identifier, "duplicate roster identifier ignored");
            continue;
        }
        records.push(UserRecord {
            identifier,
            name: cell(1),
            email: cell(2),
            department: cell(3),
            secret: cell(4),
            role: Role::parse(&cell(5)),
            admin_modules: cell(6),
        });
    }
    Roster::new(records)
}
