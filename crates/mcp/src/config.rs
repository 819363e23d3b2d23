// Server configuration loaded from nestpath.toml

use anyhow::{Context, Result};
use crate::server::DEFAULT_MAX_LINE_LENGTH;
use nestpath_core::{Expander, MAX_EXPAND_DEPTH};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct McpConfig {
    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub expand: ExpandSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSection {
    /// Name reported in `serverInfo`
    #[serde(default = "default_server_name")]
    pub name: String,

    /// Longest accepted message line in bytes
    #[serde(default = "default_max_line_length")]
    pub max_line_length: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpandSection {
    /// Decode layers applied per string
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Run the expander over `tools/call` arguments before dispatch
    #[serde(default)]
    pub expand_arguments: bool,
}

fn default_server_name() -> String {
    "nestpath".to_string()
}

fn default_max_line_length() -> usize {
    DEFAULT_MAX_LINE_LENGTH
}

fn default_max_depth() -> usize {
    MAX_EXPAND_DEPTH
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            name: default_server_name(),
            max_line_length: default_max_line_length(),
        }
    }
}

impl Default for ExpandSection {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            expand_arguments: false,
        }
    }
}

impl McpConfig {
    pub fn load(config_path: &Path) -> Result<Self> {
        // Load config file if it exists, otherwise use defaults
        if !config_path.exists() {
            tracing::info!("Configuration file not found, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(config_path)
            .context("Failed to read configuration file")?;
        toml::from_str(&content).context("Failed to parse configuration file")
    }

    /// Expander configured with the `[expand]` settings
    pub fn expander(&self) -> Expander {
        Expander::with_max_depth(self.expand.max_depth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = McpConfig::load(&dir.path().join("absent.toml")).unwrap();

        assert_eq!(config.server.name, "nestpath");
        assert_eq!(config.server.max_line_length, DEFAULT_MAX_LINE_LENGTH);
        assert_eq!(config.expand.max_depth, MAX_EXPAND_DEPTH);
        assert!(!config.expand.expand_arguments);
    }

    #[test]
    fn test_load_overrides() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[expand]\nmax_depth = 3\nexpand_arguments = true").unwrap();

        let config = McpConfig::load(file.path()).unwrap();
        assert_eq!(config.server.name, "nestpath");
        assert_eq!(config.expand.max_depth, 3);
        assert!(config.expand.expand_arguments);
        assert_eq!(config.expander().max_depth(), 3);
    }

    #[test]
    fn test_load_server_section() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server]\nname = \"paths\"\nmax_line_length = 4096").unwrap();

        let config = McpConfig::load(file.path()).unwrap();
        assert_eq!(config.server.name, "paths");
        assert_eq!(config.server.max_line_length, 4096);
        assert_eq!(config.expand.max_depth, MAX_EXPAND_DEPTH);
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[expand]\nmax_depth = \"deep\"").unwrap();

        let err = McpConfig::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse configuration file"));
    }
}
