//! Gesture Persistence
//!
//! The engine loads its gesture bank and trained models through a
//! [`GestureStore`] when it opens and writes them back on save/shutdown.
//!
//! On-disk layout of [`JsonStore`]:
//!
//! ```text
//! <data_dir>/
//! ├── gestures.json      bank + metadata
//! └── nets/
//!     └── <name>.json    one trained model per classifier
//! ```
//!
//! Files are written to `<file>.json.tmp` first and renamed into place.

use super::bank::GestureBank;
use crate::classifier::model::TrainedModel;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Current gesture bank file format version
pub const BANK_FORMAT_VERSION: &str = "1.0";

const BANK_FILE: &str = "gestures.json";
const MODELS_DIR: &str = "nets";

/// Where gestures and trained models live between runs
pub trait GestureStore: Send {
    /// Load the saved bank. A store with nothing saved yields an empty bank.
    fn load_bank(&self) -> crate::Result<GestureBank>;

    fn save_bank(&mut self, bank: &GestureBank) -> crate::Result<()>;

    /// Names of classifiers with a saved model, sorted
    fn list_models(&self) -> crate::Result<Vec<String>>;

    /// Load a saved model. `NotFound` if there is none.
    fn load_model(&self, name: &str) -> crate::Result<TrainedModel>;

    fn save_model(&mut self, name: &str, model: &TrainedModel) -> crate::Result<()>;

    /// Remove a saved model. Removing a missing model is not an error.
    fn delete_model(&mut self, name: &str) -> crate::Result<()>;
}

/// Bank file header
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BankMetadata {
    /// Stable bank id, kept across saves
    pub id: Uuid,
    pub saved_at: DateTime<Utc>,
    pub gesture_count: usize,
    pub example_count: usize,
    pub format_version: String,
}

impl Default for BankMetadata {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4(),
            saved_at: Utc::now(),
            gesture_count: 0,
            example_count: 0,
            format_version: BANK_FORMAT_VERSION.to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct BankFile {
    #[serde(default)]
    metadata: BankMetadata,
    #[serde(default)]
    gestures: GestureBank,
}

/// JSON files under a data directory
#[derive(Debug, Clone)]
pub struct JsonStore {
    root: PathBuf,
    bank_id: Option<Uuid>,
}

impl JsonStore {
    /// Open a store rooted at `root`. Directories are created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            bank_id: None,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn bank_path(&self) -> PathBuf {
        self.root.join(BANK_FILE)
    }

    pub fn models_dir(&self) -> PathBuf {
        self.root.join(MODELS_DIR)
    }

    pub fn model_path(&self, name: &str) -> crate::Result<PathBuf> {
        validate_model_name(name)?;
        Ok(self.models_dir().join(format!("{}.json", name)))
    }

    fn read_bank_file(&self) -> crate::Result<Option<BankFile>> {
        let path = self.bank_path();
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&path)?;
        let file: BankFile = serde_json::from_str(&content)?;
        if file.metadata.format_version != BANK_FORMAT_VERSION {
            warn!(
                path = %path.display(),
                found = %file.metadata.format_version,
                expected = BANK_FORMAT_VERSION,
                "Gesture bank has different format version; some fields may use default values"
            );
        }
        Ok(Some(file))
    }
}

impl GestureStore for JsonStore {
    fn load_bank(&self) -> crate::Result<GestureBank> {
        match self.read_bank_file()? {
            Some(file) => {
                debug!(
                    gestures = file.gestures.len(),
                    examples = file.gestures.example_count(),
                    "Loaded gesture bank"
                );
                Ok(file.gestures)
            }
            None => Ok(GestureBank::new()),
        }
    }

    fn save_bank(&mut self, bank: &GestureBank) -> crate::Result<()> {
        let id = match self.bank_id {
            Some(id) => id,
            None => {
                let id = self
                    .read_bank_file()
                    .ok()
                    .flatten()
                    .map(|f| f.metadata.id)
                    .unwrap_or_else(Uuid::new_v4);
                self.bank_id = Some(id);
                id
            }
        };

        let file = BankFile {
            metadata: BankMetadata {
                id,
                saved_at: Utc::now(),
                gesture_count: bank.len(),
                example_count: bank.example_count(),
                format_version: BANK_FORMAT_VERSION.to_string(),
            },
            gestures: bank.clone(),
        };
        write_atomically(&self.bank_path(), &serde_json::to_string_pretty(&file)?)?;
        debug!(gestures = bank.len(), path = %self.bank_path().display(), "Saved gesture bank");
        Ok(())
    }

    fn list_models(&self) -> crate::Result<Vec<String>> {
        let dir = self.models_dir();
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in std::fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.extension().map(|e| e == "json").unwrap_or(false) {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    fn load_model(&self, name: &str) -> crate::Result<TrainedModel> {
        let path = self.model_path(name)?;
        if !path.exists() {
            return Err(crate::Error::NotFound(format!("saved model '{}'", name)));
        }
        let content = std::fs::read_to_string(&path)?;
        let model: TrainedModel = serde_json::from_str(&content)?;
        model.validate()?;
        if model.metadata.format_version != crate::classifier::model::MODEL_FORMAT_VERSION {
            warn!(
                classifier = %name,
                found = %model.metadata.format_version,
                "Trained model has different format version"
            );
        }
        Ok(model)
    }

    fn save_model(&mut self, name: &str, model: &TrainedModel) -> crate::Result<()> {
        let path = self.model_path(name)?;
        write_atomically(&path, &serde_json::to_string_pretty(model)?)?;
        debug!(classifier = %name, path = %path.display(), "Saved trained model");
        Ok(())
    }

    fn delete_model(&mut self, name: &str) -> crate::Result<()> {
        let path = self.model_path(name)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory store. Clones share the same contents.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryContents>>,
}

#[derive(Debug, Default)]
struct MemoryContents {
    bank: GestureBank,
    models: BTreeMap<String, TrainedModel>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the saved bank
    pub fn bank(&self) -> GestureBank {
        self.inner.lock().bank.clone()
    }
}

impl GestureStore for MemoryStore {
    fn load_bank(&self) -> crate::Result<GestureBank> {
        Ok(self.inner.lock().bank.clone())
    }

    fn save_bank(&mut self, bank: &GestureBank) -> crate::Result<()> {
        self.inner.lock().bank = bank.clone();
        Ok(())
    }

    fn list_models(&self) -> crate::Result<Vec<String>> {
        Ok(self.inner.lock().models.keys().cloned().collect())
    }

    fn load_model(&self, name: &str) -> crate::Result<TrainedModel> {
        self.inner
            .lock()
            .models
            .get(name)
            .cloned()
            .ok_or_else(|| crate::Error::NotFound(format!("saved model '{}'", name)))
    }

    fn save_model(&mut self, name: &str, model: &TrainedModel) -> crate::Result<()> {
        self.inner.lock().models.insert(name.to_string(), model.clone());
        Ok(())
    }

    fn delete_model(&mut self, name: &str) -> crate::Result<()> {
        self.inner.lock().models.remove(name);
        Ok(())
    }
}

fn validate_model_name(name: &str) -> crate::Result<()> {
    let bad = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\'])
        || name.chars().any(char::is_control);
    if bad {
        return Err(crate::Error::Storage(format!(
            "'{}' cannot be used as a model file name",
            name
        )));
    }
    Ok(())
}

/// Write `<path>.tmp` then rename it over `path`
fn write_atomically(path: &Path, content: &str) -> crate::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp_path = path.with_extension("json.tmp");
    std::fs::write(&tmp_path, content)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}
