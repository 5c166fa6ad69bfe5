use std::path::PathBuf;

use rusqlite::Connection;
use serde::Deserialize;

use crate::auth::Session;
use crate::cache::TtlCache;
use crate::config::{WorkspaceConfig, DEFAULT_CACHE_TTL_SECONDS};
use crate::roster::{CsvRoster, Roster, RosterSource, StoreError};
use crate::uploads::UploadStore;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub db: Option<Connection>,
    pub config: Option<WorkspaceConfig>,
    pub roster_cache: TtlCache<Roster>,
    pub session: Session,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            workspace: None,
            db: None,
            config: None,
            roster_cache: TtlCache::invalidate_after(std::time::Duration::from_secs(
                DEFAULT_CACHE_TTL_SECONDS,
            )),
            session: Session::default(),
        }
    }

    pub fn upload_store(&self) -> Option<UploadStore> {
        self.config.as_ref().map(|c| UploadStore::new(&c.data_dir))
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

/// Reads the roster through the cache. Takes the fields rather than the
/// whole state so callers can keep borrowing the session.
pub fn load_roster<'a>(
    cache: &'a mut TtlCache<Roster>,
    config: Option<&WorkspaceConfig>,
) -> Result<&'a Roster, StoreError> {
    let Some(config) = config else {
        return Err(StoreError::Unavailable("no workspace selected".to_string()));
    };
    let source = CsvRoster::new(config.roster_csv.clone());
    cache.get_or_try_load(|| source.load())
}
