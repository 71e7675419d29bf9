pub mod queries;

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use postboard_types::Snapshot;
use tracing::{debug, info};

/// Flat-file store holding the whole data set as one JSON document.
///
/// Reads are served from memory. Every mutation rewrites the complete
/// document; if the write fails, the in-memory copy is left untouched.
pub struct Database {
    path: PathBuf,
    data: Mutex<Snapshot>,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }

        let data = if path.exists() {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            if raw.trim().is_empty() {
                Snapshot::default()
            } else {
                serde_json::from_str(&raw)
                    .with_context(|| format!("parsing {}", path.display()))?
            }
        } else {
            let data = Snapshot::default();
            write_document(path, &data)?;
            data
        };

        info!(
            "Database opened at {} ({} users, {} messages)",
            path.display(),
            data.users.len(),
            data.messages.len()
        );
        Ok(Self {
            path: path.to_path_buf(),
            data: Mutex::new(data),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn with_data<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Snapshot) -> T,
    {
        let data = self
            .data
            .lock()
            .map_err(|e| anyhow::anyhow!("DB lock poisoned: {}", e))?;
        Ok(f(&data))
    }

    /// Apply `f` to a draft of the data set and persist the draft if it changed.
    pub fn with_data_mut<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Snapshot) -> T,
    {
        let mut data = self
            .data
            .lock()
            .map_err(|e| anyhow::anyhow!("DB lock poisoned: {}", e))?;

        let mut draft = data.clone();
        let out = f(&mut draft);
        if draft != *data {
            write_document(&self.path, &draft)?;
            *data = draft;
            debug!("Database written to {}", self.path.display());
        }
        Ok(out)
    }
}

/// Write the document next to its destination, then rename over it.
fn write_document(path: &Path, data: &Snapshot) -> Result<()> {
    let json = serde_json::to_vec_pretty(data)?;
    let tmp = path.with_extension("json.tmp");
    {
        let mut file =
            fs::File::create(&tmp).with_context(|| format!("creating {}", tmp.display()))?;
        file.write_all(&json)?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path).with_context(|| format!("replacing {}", path.display()))?;
    Ok(())
}
