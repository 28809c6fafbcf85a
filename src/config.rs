use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::loader::{BoardLoader, DefaultLayout, LayoutFile};
use crate::logger::ReportFormat;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Settings for the command-line driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Layout file to load; the built-in opening when absent.
    pub layout: Option<PathBuf>,
    pub report_format: ReportFormat,
    /// Default `tracing` filter directive, overridden by `RUST_LOG`.
    pub log_filter: String,
    /// Print the board after every change.
    pub show_board: bool,
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig {
            layout: None,
            report_format: ReportFormat::Text,
            log_filter: "info".to_string(),
            show_board: true,
        }
    }
}

impl GameConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn loader(&self) -> Box<dyn BoardLoader> {
        match &self.layout {
            Some(path) => Box::new(LayoutFile::new(path)),
            None => Box::new(DefaultLayout),
        }
    }
}
