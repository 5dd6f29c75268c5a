//! Locally persisted UI preferences

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ClientResult;

/// Key of a column that older versions persisted and is no longer shown
const LEGACY_COMPLETED_KEY: &str = "completed";

/// Which kitchen board columns are visible
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KitchenColumns {
    pub new: bool,
    pub preparing: bool,
    pub ready: bool,
}

impl Default for KitchenColumns {
    fn default() -> Self {
        Self {
            new: true,
            preparing: true,
            ready: true,
        }
    }
}

/// JSON file holding [`KitchenColumns`]
#[derive(Debug, Clone)]
pub struct PrefsStore {
    path: PathBuf,
}

impl PrefsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored columns, falling back to all visible
    ///
    /// A file that is not an object with the three boolean keys is deleted.
    /// A legacy `completed` entry is dropped and the file rewritten.
    pub fn load(&self) -> KitchenColumns {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return KitchenColumns::default(),
            Err(e) => {
                tracing::error!(
                    path = %self.path.display(),
                    error = %e,
                    "Failed to read preferences"
                );
                return KitchenColumns::default();
            }
        };

        let mut value = match serde_json::from_str::<Value>(&raw) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Discarding unreadable preferences"
                );
                self.discard();
                return KitchenColumns::default();
            }
        };

        let columns = match serde_json::from_value::<KitchenColumns>(value.clone()) {
            Ok(columns) => columns,
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Discarding malformed preferences"
                );
                self.discard();
                return KitchenColumns::default();
            }
        };

        let legacy = value
            .as_object_mut()
            .and_then(|obj| obj.remove(LEGACY_COMPLETED_KEY))
            .is_some();
        if legacy {
            tracing::info!(path = %self.path.display(), "Dropping legacy completed column");
            if let Err(e) = self.write(&value) {
                tracing::error!(error = %e, "Failed to rewrite preferences");
            }
        }

        columns
    }

    pub fn save(&self, columns: &KitchenColumns) -> ClientResult<()> {
        self.write(&serde_json::to_value(columns)?)
    }

    fn write(&self, value: &Value) -> ClientResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_vec(value)?)?;
        Ok(())
    }

    fn discard(&self) {
        if let Err(e) = fs::remove_file(&self.path) {
            tracing::debug!(error = %e, "Failed to remove preferences file");
        }
    }
}
