//! Upload storage: `<root>/uploads/<identifier>/<section-dir>/<timestamp>_<name>`.
//!
//! Files are only ever added. The timestamp prefix is what orders files
//! within a section when a book is assembled.

use crate::catalog::Section;
use anyhow::{anyhow, Context};
use chrono::NaiveDateTime;
use serde::Serialize;
use std::path::{Path, PathBuf};

const TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S";
const TIMESTAMP_LEN: usize = 15;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFile {
    pub identifier: String,
    pub section: Section,
    pub filename: String,
    pub path: PathBuf,
    pub uploaded_at: String,
}

impl UploadedFile {
    pub fn is_pdf(&self) -> bool {
        Path::new(&self.filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("pdf"))
            .unwrap_or(false)
    }
}

/// The timestamp portion of a stored filename: everything before the first `_`.
pub fn timestamp_prefix(filename: &str) -> &str {
    filename.split_once('_').map(|(ts, _)| ts).unwrap_or(filename)
}

#[derive(Debug, Clone)]
pub struct UploadStore {
    root: PathBuf,
}

impl UploadStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            root: data_dir.into(),
        }
    }

    pub fn uploads_root(&self) -> PathBuf {
        self.root.join("uploads")
    }

    pub fn person_dir(&self, identifier: &str) -> anyhow::Result<PathBuf> {
        validate_identifier(identifier)?;
        Ok(self.uploads_root().join(identifier))
    }

    pub fn section_dir(&self, identifier: &str, section: Section) -> anyhow::Result<PathBuf> {
        Ok(self.person_dir(identifier)?.join(section.dir_name()))
    }

    pub fn ensure_dirs(&self, identifier: &str) -> anyhow::Result<()> {
        let base = self.person_dir(identifier)?;
        for section in Section::ALL {
            let dir = base.join(section.dir_name());
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("failed to create directory {}", dir.to_string_lossy()))?;
        }
        Ok(())
    }

    /// Stores `bytes` under a timestamp-qualified name. If a file with the
    /// same second and name already exists a `-NNN` counter is added to the
    /// timestamp so the earlier upload is kept.
    pub fn save_upload(
        &self,
        identifier: &str,
        section: Section,
        original_name: &str,
        bytes: &[u8],
        now: NaiveDateTime,
    ) -> anyhow::Result<UploadedFile> {
        let name = sanitize_name(original_name)?;
        self.ensure_dirs(identifier)?;
        let dir = self.section_dir(identifier, section)?;

        let stamp = now.format(TIMESTAMP_FORMAT).to_string();
        let mut prefix = stamp.clone();
        let mut counter = 1u32;
        let mut path = dir.join(format!("{}_{}", prefix, name));
        while path.exists() {
            prefix = format!("{}-{:03}", stamp, counter);
            path = dir.join(format!("{}_{}", prefix, name));
            counter += 1;
        }

        std::fs::write(&path, bytes)
            .with_context(|| format!("failed to write upload {}", path.to_string_lossy()))?;
        tracing::info!(identifier, section = section.dir_name(), file = %path.display(), size = bytes.len(), "upload saved");

        Ok(UploadedFile {
            identifier: identifier.to_string(),
            section,
            filename: format!("{}_{}", prefix, name),
            path,
            uploaded_at: prefix,
        })
    }

    /// Files in one section, ordered by timestamp prefix then filename.
    pub fn list_section(
        &self,
        identifier: &str,
        section: Section,
    ) -> anyhow::Result<Vec<UploadedFile>> {
        let dir = self.section_dir(identifier, section)?;
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut files = Vec::new();
        for ent in std::fs::read_dir(&dir)
            .with_context(|| format!("failed to list {}", dir.to_string_lossy()))?
        {
            let ent = ent?;
            let path = ent.path();
            if !path.is_file() {
                continue;
            }
            let Some(filename) = path.file_name().and_then(|s| s.to_str()).map(str::to_string)
            else {
                continue;
            };
            files.push(UploadedFile {
                identifier: identifier.to_string(),
                section,
                uploaded_at: timestamp_prefix(&filename).to_string(),
                filename,
                path,
            });
        }
        files.sort_by(|a, b| {
            prefix_order(&a.uploaded_at)
                .cmp(&prefix_order(&b.uploaded_at))
                .then_with(|| a.filename.cmp(&b.filename))
        });
        Ok(files)
    }

    /// All of a person's files, sections in book order.
    pub fn list_files(&self, identifier: &str) -> anyhow::Result<Vec<UploadedFile>> {
        let mut out = Vec::new();
        for section in Section::ALL {
            out.extend(self.list_section(identifier, section)?);
        }
        Ok(out)
    }

    pub fn count_files(&self, identifier: &str) -> anyhow::Result<usize> {
        Ok(self.list_files(identifier)?.len())
    }
}

/// Sort key for a timestamp prefix: the timestamp, then the collision
/// counter compared as a number.
fn prefix_order(prefix: &str) -> (&str, u64) {
    let counter = prefix
        .get(TIMESTAMP_LEN..)
        .and_then(|rest| rest.strip_prefix('-'))
        .and_then(|n| n.parse().ok());
    match (prefix.get(..TIMESTAMP_LEN), counter) {
        (Some(stamp), Some(n)) => (stamp, n),
        _ => (prefix, 0),
    }
}

fn validate_identifier(identifier: &str) -> anyhow::Result<()> {
    if identifier.is_empty()
        || identifier == "."
        || identifier == ".."
        || identifier.contains(['/', '\\'])
    {
        return Err(anyhow!("invalid identifier for storage: {:?}", identifier));
    }
    Ok(())
}

/// The stored form of an uploaded file's name: its last path component,
/// trimmed. Empty, `.` and `..` are rejected.
pub fn sanitize_name(original: &str) -> anyhow::Result<String> {
    let base = original
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or("")
        .trim();
    if base.is_empty() || base == "." || base == ".." {
        return Err(anyhow!("invalid file name: {:?}", original));
    }
    Ok(base.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_dir(prefix: &str) -> PathBuf {
        let p = std::env::temp_dir().join(format!(
            "{}-{}",
            prefix,
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .expect("clock")
                .as_nanos()
        ));
        std::fs::create_dir_all(&p).expect("create temp dir");
        p
    }

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 5, 1)
            .and_then(|d| d.and_hms_opt(h, m, s))
            .expect("valid time")
    }

    #[test]
    fn save_creates_all_section_dirs_and_prefixes_timestamp() {
        let root = temp_dir("personneld-uploads-save");
        let store = UploadStore::new(&root);
        let f = store
            .save_upload("T001", Section::Memo, "C:\\docs\\memo.pdf", b"%PDF", at(8, 0, 0))
            .expect("save");
        assert_eq!(f.filename, "20250501-080000_memo.pdf");
        assert_eq!(f.uploaded_at, "20250501-080000");
        for section in Section::ALL {
            assert!(store.section_dir("T001", section).unwrap().is_dir());
        }
        let _ = std::fs::remove_dir_all(root);
    }

    #[test]
    fn same_second_same_name_does_not_overwrite() {
        let root = temp_dir("personneld-uploads-collide");
        let store = UploadStore::new(&root);
        let a = store
            .save_upload("T001", Section::Cover, "a.pdf", b"first", at(9, 0, 0))
            .unwrap();
        let b = store
            .save_upload("T001", Section::Cover, "a.pdf", b"second", at(9, 0, 0))
            .unwrap();
        assert_ne!(a.path, b.path);
        assert_eq!(std::fs::read(&a.path).unwrap(), b"first");
        let listed = store.list_section("T001", Section::Cover).unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].filename, a.filename);
        let _ = std::fs::remove_dir_all(root);
    }

    #[test]
    fn many_same_second_uploads_list_in_save_order() {
        let root = temp_dir("personneld-uploads-burst");
        let store = UploadStore::new(&root);
        let saved: Vec<String> = (0..12)
            .map(|_| {
                store
                    .save_upload("T001", Section::Memo, "scan.pdf", b"x", at(9, 30, 0))
                    .unwrap()
                    .filename
            })
            .collect();
        assert_eq!(saved[1], "20250501-093000-001_scan.pdf");
        assert_eq!(saved[11], "20250501-093000-011_scan.pdf");
        let listed: Vec<String> = store
            .list_section("T001", Section::Memo)
            .unwrap()
            .into_iter()
            .map(|f| f.filename)
            .collect();
        assert_eq!(listed, saved);
        let _ = std::fs::remove_dir_all(root);
    }

    #[test]
    fn counters_compare_numerically_past_padding() {
        let mut prefixes = vec![
            "20250501-093000-1000",
            "20250501-093000-999",
            "20250501-093000",
            "20250501-093000-002",
            "20250501-092959",
        ];
        prefixes.sort_by(|a, b| prefix_order(a).cmp(&prefix_order(b)));
        assert_eq!(
            prefixes,
            vec![
                "20250501-092959",
                "20250501-093000",
                "20250501-093000-002",
                "20250501-093000-999",
                "20250501-093000-1000",
            ]
        );
    }

    #[test]
    fn listing_orders_sections_canonically_and_files_by_timestamp() {
        let root = temp_dir("personneld-uploads-list");
        let store = UploadStore::new(&root);
        store
            .save_upload("T001", Section::Part2Challenge, "late.pdf", b"x", at(7, 0, 0))
            .unwrap();
        store
            .save_upload("T001", Section::Memo, "z.pdf", b"x", at(10, 0, 0))
            .unwrap();
        store
            .save_upload("T001", Section::Memo, "y.pdf", b"x", at(8, 0, 0))
            .unwrap();
        let names: Vec<String> = store
            .list_files("T001")
            .unwrap()
            .into_iter()
            .map(|f| f.filename)
            .collect();
        assert_eq!(
            names,
            vec![
                "20250501-080000_y.pdf",
                "20250501-100000_z.pdf",
                "20250501-070000_late.pdf"
            ]
        );
        assert_eq!(store.count_files("T001").unwrap(), 3);
        assert_eq!(store.count_files("T404").unwrap(), 0);
        let _ = std::fs::remove_dir_all(root);
    }

    #[test]
    fn rejects_path_like_identifiers() {
        let store = UploadStore::new(std::env::temp_dir());
        assert!(store.person_dir("../etc").is_err());
        assert!(store.person_dir("").is_err());
    }

    #[test]
    fn pdf_detection_is_case_insensitive() {
        let f = UploadedFile {
            identifier: "T".into(),
            section: Section::Cover,
            filename: "20250101-000000_SCAN.PDF".into(),
            path: PathBuf::from("x"),
            uploaded_at: "20250101-000000".into(),
        };
        assert!(f.is_pdf());
        assert_eq!(timestamp_prefix("20250101-000000_a_b.docx"), "20250101-000000");
    }
}
