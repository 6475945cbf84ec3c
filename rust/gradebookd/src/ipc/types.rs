use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

use crate::model::AppData;
use crate::repair::repair_app_data;
use crate::store::{SqliteStore, StateStore};

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub store: Option<Box<dyn StateStore>>,
    pub data: AppData,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    pub fn new() -> Self {
        Self {
            workspace: None,
            store: None,
            data: AppData::default(),
        }
    }

    pub fn open_workspace(&mut self, path: &Path) -> anyhow::Result<()> {
        let store = SqliteStore::open(path)?;
        self.attach(Some(path.to_path_buf()), Box::new(store))
    }

    /// Loads (or seeds) the document from `store` and makes it the live state.
    pub fn attach(
        &mut self,
        workspace: Option<PathBuf>,
        store: Box<dyn StateStore>,
    ) -> anyhow::Result<()> {
        let loaded = store.load()?;
        let fresh = loaded.is_none();
        let mut data = loaded.unwrap_or_else(AppData::with_default_dataset);
        let fixes = repair_app_data(&mut data);
        if (fresh || fixes > 0) && !store.save(&data) {
            warn!(fresh, fixes, "could not write repaired gradebook document");
        }
        info!(
            datasets = data.result_datasets.len(),
            fixes,
            fresh,
            "workspace attached"
        );

        self.workspace = workspace;
        self.store = Some(store);
        self.data = data;
        Ok(())
    }

    /// Writes the live document. `false` means the write failed or no workspace
    /// is attached; nothing is retried.
    pub fn persist(&self) -> bool {
        match self.store.as_ref() {
            Some(store) => store.save(&self.data),
            None => false,
        }
    }
}
