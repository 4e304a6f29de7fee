//! Mockup payloads
//!
//! Static JSON documents describing alternative dashboard layouts, selected
//! by mode and searched for across a list of directories.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error};

/// Mockup layout option
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MockupMode {
    #[default]
    OptionA,
    OptionB,
    OptionHybrid,
}

impl MockupMode {
    pub const ALL: [MockupMode; 3] = [
        MockupMode::OptionA,
        MockupMode::OptionB,
        MockupMode::OptionHybrid,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MockupMode::OptionA => "option_a",
            MockupMode::OptionB => "option_b",
            MockupMode::OptionHybrid => "option_hybrid",
        }
    }

    pub fn file_name(&self) -> &'static str {
        match self {
            MockupMode::OptionA => "option_a_enablements.json",
            MockupMode::OptionB => "option_b_shared_steps.json",
            MockupMode::OptionHybrid => "option_hybrid.json",
        }
    }

    fn valid_modes() -> String {
        Self::ALL
            .iter()
            .map(|m| m.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl std::fmt::Display for MockupMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MockupMode {
    type Err = MockupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| MockupError::InvalidMode {
                mode: s.to_string(),
                valid: Self::valid_modes(),
            })
    }
}

/// Mockup loading errors
#[derive(Error, Debug)]
pub enum MockupError {
    #[error("Invalid mode: {mode}. Valid modes are: {valid}")]
    InvalidMode { mode: String, valid: String },

    #[error("Failed to read mockup data file {file}: {details}")]
    Unreadable {
        file: String,
        details: String,
        attempted_paths: Vec<PathBuf>,
    },
}

/// Mockup document; fields beyond the header are passed through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MockupData {
    pub option: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(flatten)]
    pub rest: serde_json::Map<String, serde_json::Value>,
}

fn read_mockup(path: &Path) -> Result<MockupData, String> {
    let content = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
    serde_json::from_str(&content).map_err(|e| e.to_string())
}

/// Load the mockup for `mode` from the first directory that has a valid one.
pub fn load_mockup(dirs: &[PathBuf], mode: MockupMode) -> Result<MockupData, MockupError> {
    let mut attempted_paths = Vec::with_capacity(dirs.len());
    let mut first_error = None;

    for dir in dirs {
        let path = dir.join(mode.file_name());
        match read_mockup(&path) {
            Ok(data) => {
                debug!("Loaded {} mockup from {:?}", mode, path);
                return Ok(data);
            }
            Err(e) => {
                debug!("Mockup not usable at {:?}: {}", path, e);
                first_error.get_or_insert(e);
                attempted_paths.push(path);
            }
        }
    }

    error!("Failed to read {} from {:?}", mode.file_name(), attempted_paths);
    Err(MockupError::Unreadable {
        file: mode.file_name().to_string(),
        details: first_error.unwrap_or_else(|| "no mockup directories configured".to_string()),
        attempted_paths,
    })
}
