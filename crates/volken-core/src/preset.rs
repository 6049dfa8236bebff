//! Named cloud presets.
//!
//! The host hands preset text (RON) to the library; where that text lives on
//! disk is the host's concern. Parsed presets are kept in memory by name.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::config::CloudConfig;

/// Name of the always-present built-in preset.
pub const DEFAULT_PRESET: &str = "Default";

#[derive(Debug, Error)]
pub enum PresetError {
    #[error("Failed to parse cloud preset RON: {0}")]
    Parse(String),
    #[error("Unknown cloud preset '{0}'")]
    UnknownPreset(String),
}

/// Parse a single preset. Missing fields take their "Default" preset values.
pub fn parse_preset(ron_str: &str) -> Result<CloudConfig, PresetError> {
    let options = ron::Options::default();
    let config: CloudConfig = options
        .from_str(ron_str)
        .map_err(|e| PresetError::Parse(e.to_string()))?;

    for issue in config.validate() {
        log::warn!(
            "preset field {} = {} will be clamped to {}",
            issue.field,
            issue.value,
            issue.clamped_to
        );
    }

    Ok(config)
}

/// Serialize a preset to pretty RON (for the host to store).
pub fn preset_to_string(config: &CloudConfig) -> Result<String, PresetError> {
    ron::ser::to_string_pretty(config, ron::ser::PrettyConfig::default())
        .map_err(|e| PresetError::Parse(e.to_string()))
}

/// In-memory set of named presets.
#[derive(Debug, Clone)]
pub struct PresetLibrary {
    presets: BTreeMap<String, CloudConfig>,
}

impl Default for PresetLibrary {
    fn default() -> Self {
        Self::with_builtin()
    }
}

impl PresetLibrary {
    /// Library holding only the built-in "Default" preset.
    pub fn with_builtin() -> Self {
        let mut presets = BTreeMap::new();
        presets.insert(DEFAULT_PRESET.to_string(), CloudConfig::create_default());
        Self { presets }
    }

    pub fn insert(&mut self, name: impl Into<String>, config: CloudConfig) {
        self.presets.insert(name.into(), config);
    }

    /// Parse and store a preset. On parse failure the library is unchanged.
    pub fn load_from_str(&mut self, name: &str, ron_str: &str) -> Result<(), PresetError> {
        let config = parse_preset(ron_str)?;
        log::info!("Loaded cloud preset '{name}'");
        self.presets.insert(name.to_string(), config);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<&CloudConfig, PresetError> {
        self.presets
            .get(name)
            .ok_or_else(|| PresetError::UnknownPreset(name.to_string()))
    }

    /// Clone the named preset, falling back to "Default" when it is missing.
    pub fn load_or_default(&self, name: &str) -> CloudConfig {
        match self.presets.get(name) {
            Some(config) => config.clone(),
            None => {
                log::warn!("Cloud preset '{name}' not found, using '{DEFAULT_PRESET}'");
                self.presets
                    .get(DEFAULT_PRESET)
                    .cloned()
                    .unwrap_or_else(CloudConfig::create_default)
            }
        }
    }

    /// Preset names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        self.presets.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.presets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }
}
