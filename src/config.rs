use anyhow::{Context as _, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub show: ShowSettings,
}

impl Config {
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config at {}", path.display()))?;
        let cfg: Self = toml::from_str(&text)
            .with_context(|| format!("failed to parse config at {}", path.display()))?;
        Ok(cfg)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShowSettings {
    /// Names starting with this are hidden from unfiltered listings.
    #[serde(default = "default_internal_prefix")]
    pub internal_prefix: String,

    #[serde(default = "default_true")]
    pub strict_expansion: bool,
}

impl Default for ShowSettings {
    fn default() -> Self {
        Self {
            internal_prefix: default_internal_prefix(),
            strict_expansion: true,
        }
    }
}

fn default_internal_prefix() -> String {
    "_".to_string()
}

fn default_true() -> bool {
    true
}
