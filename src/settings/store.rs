use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::settings::types::{PipelineSettings, SettingsError};

/// Persistent pipeline settings backed by a JSON file.
pub struct SettingsStore {
    path: PathBuf,
    data: Mutex<PipelineSettings>,
}

impl SettingsStore {
    /// Create a new store, loading from disk if the file exists.
    ///
    /// An unreadable or invalid file is logged and replaced by defaults.
    pub fn new(path: PathBuf) -> Self {
        let data = Self::load(&path).unwrap_or_else(|e| {
            tracing::warn!("Ignoring settings at {}: {e}", path.display());
            PipelineSettings::default()
        });
        Self {
            path,
            data: Mutex::new(data),
        }
    }

    /// Load settings from a JSON file, returning defaults on a missing file.
    pub fn load(path: &Path) -> Result<PipelineSettings, SettingsError> {
        if !path.exists() {
            return Ok(PipelineSettings::default());
        }
        let contents = std::fs::read_to_string(path)?;
        let settings: PipelineSettings = serde_json::from_str(&contents)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Save current settings to disk atomically (write .tmp then rename).
    pub fn save(&self) -> Result<(), SettingsError> {
        let data = self.data.lock().clone();
        let json = serde_json::to_string_pretty(&data)?;

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, &json)?;
        std::fs::rename(&tmp_path, &self.path)?;

        Ok(())
    }

    /// Current settings.
    pub fn get(&self) -> PipelineSettings {
        self.data.lock().clone()
    }

    /// Apply `change` if the result validates; otherwise keep the old values.
    pub fn update(
        &self,
        change: impl FnOnce(&mut PipelineSettings),
    ) -> Result<(), SettingsError> {
        let mut data = self.data.lock();
        let mut next = data.clone();
        change(&mut next);
        next.validate()?;
        *data = next;
        Ok(())
    }
}
