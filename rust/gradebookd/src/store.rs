use crate::db;
use crate::model::AppData;
use anyhow::Context;
use rusqlite::Connection;
use std::path::Path;
use tracing::warn;

/// Where the gradebook document lives between sessions.
///
/// `save` reports success as a plain bool and never retries; callers decide
/// what to tell the user.
pub trait StateStore {
    fn load(&self) -> anyhow::Result<Option<AppData>>;
    fn save(&self, data: &AppData) -> bool;
}

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(workspace: &Path) -> anyhow::Result<Self> {
        let conn = db::open_db(workspace)
            .with_context(|| format!("failed to open workspace {}", workspace.to_string_lossy()))?;
        Ok(Self { conn })
    }
}

impl StateStore for SqliteStore {
    fn load(&self) -> anyhow::Result<Option<AppData>> {
        let Some(text) = db::storage_get(&self.conn, db::STATE_KEY)? else {
            return Ok(None);
        };
        let data: AppData =
            serde_json::from_str(&text).context("stored gradebook document is invalid JSON")?;
        Ok(Some(data))
    }

    fn save(&self, data: &AppData) -> bool {
        let text = match serde_json::to_string(data) {
            Ok(t) => t,
            Err(e) => {
                warn!(error = %e, "failed to serialize gradebook document");
                return false;
            }
        };
        match db::storage_set(&self.conn, db::STATE_KEY, &text) {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "failed to write gradebook document");
                false
            }
        }
    }
}
