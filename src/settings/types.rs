use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::convert::{FormatConverter, Gray16Depth};
use crate::display::target::{DisplayTargetAdapter, DEFAULT_ROW_ALIGNMENT};

/// Largest row alignment accepted from a settings file.
const MAX_ROW_ALIGNMENT: usize = 256;

/// Settings errors.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("settings file is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid setting: {0}")]
    Invalid(String),
}

/// Tunables for the conversion pipeline, persisted as camelCase JSON.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct PipelineSettings {
    /// Significant bits in a Y16 sample (1..=16).
    pub gray16_significant_bits: u8,
    /// Row alignment in bytes for display targets (0 or 1 = none).
    pub row_alignment: usize,
    /// How many initial frames the bridge logs at debug level.
    pub first_frames_logged: u64,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            gray16_significant_bits: Gray16Depth::TWELVE_BIT.significant_bits(),
            row_alignment: DEFAULT_ROW_ALIGNMENT,
            first_frames_logged: 3,
        }
    }
}

impl PipelineSettings {
    /// Check every value is in range.
    pub fn validate(&self) -> Result<(), SettingsError> {
        self.gray16_depth()?;
        if self.row_alignment > MAX_ROW_ALIGNMENT {
            return Err(SettingsError::Invalid(format!(
                "rowAlignment {} exceeds {MAX_ROW_ALIGNMENT}",
                self.row_alignment
            )));
        }
        Ok(())
    }

    pub fn gray16_depth(&self) -> Result<Gray16Depth, SettingsError> {
        Gray16Depth::new(self.gray16_significant_bits).ok_or_else(|| {
            SettingsError::Invalid(format!(
                "gray16SignificantBits must be 1..=16, got {}",
                self.gray16_significant_bits
            ))
        })
    }

    /// Converter configured from these settings.
    pub fn converter(&self) -> Result<FormatConverter, SettingsError> {
        Ok(FormatConverter::new(self.gray16_depth()?))
    }

    /// Display adapter configured from these settings.
    pub fn adapter(&self) -> Result<DisplayTargetAdapter, SettingsError> {
        self.validate()?;
        Ok(DisplayTargetAdapter::new(self.converter()?, self.row_alignment))
    }
}
