use std::path::Path;

use anyhow::Context;

use super::types::Config;

/// Name of the per-directory config file.
pub const CONFIG_FILE: &str = ".labrun";

impl Config {
    /// Load config from a `.labrun` file in the given directory.
    pub fn load(dir: &Path) -> anyhow::Result<Option<Self>> {
        let path = dir.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(None);
        }
        Self::load_file(&path).map(Some)
    }

    /// Load config from an explicit YAML file.
    pub fn load_file(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&contents)
            .with_context(|| format!("invalid config {}", path.display()))?;
        Ok(config)
    }
}
