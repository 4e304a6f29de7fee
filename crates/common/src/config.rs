//! Dashboard configuration

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

/// Dashboard configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// HTTP listen address
    pub web_addr: String,

    /// Directory of `.feature` files
    pub features_dir: PathBuf,

    /// Execution results document written by the test runner
    pub results_path: PathBuf,

    /// Directory of markdown behavior records
    pub evidence_dir: PathBuf,

    /// Directories searched, in order, for mockup payloads
    pub mockup_dirs: Vec<PathBuf>,

    /// Root holding `.dashboard-projects.json`
    pub dashboard_root: PathBuf,

    /// Lifetime of the filesystem dashboard cache
    pub dashboard_cache_ttl_secs: u64,

    /// YAML timeout strategy
    pub timeout_config: PathBuf,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            web_addr: "127.0.0.1:3000".to_string(),
            features_dir: PathBuf::from("features"),
            results_path: PathBuf::from("public/bdd-data/behave-results.json"),
            evidence_dir: PathBuf::from("../DUX-Governance/instances/behaviors"),
            mockup_dirs: vec![
                PathBuf::from("../specs/mockups"),
                PathBuf::from("../../specs/mockups"),
            ],
            dashboard_root: PathBuf::from("."),
            dashboard_cache_ttl_secs: 60,
            timeout_config: PathBuf::from("timeout-strategy.yaml"),
        }
    }
}

impl DashboardConfig {
    /// Load configuration from file, falling back to defaults when absent
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content =
                std::fs::read_to_string(path).map_err(|e| Error::source_read(path, e))?;
            let config: Self = toml::from_str(&content)?;
            debug!("Loaded configuration from {:?}", path);
            Ok(config)
        } else {
            debug!("No configuration at {:?}, using defaults", path);
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| Error::InvalidConfig(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Override fields from `BDDBOARD_*` environment variables
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup("BDDBOARD_WEB_ADDR") {
            self.web_addr = addr;
        }
        if let Some(dir) = lookup("BDDBOARD_FEATURES_DIR") {
            self.features_dir = PathBuf::from(dir);
        }
        if let Some(path) = lookup("BDDBOARD_RESULTS_PATH") {
            self.results_path = PathBuf::from(path);
        }
        if let Some(dir) = lookup("BDDBOARD_EVIDENCE_DIR") {
            self.evidence_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup("BDDBOARD_DASHBOARD_ROOT") {
            self.dashboard_root = PathBuf::from(dir);
        }
    }

    pub fn dashboard_cache_ttl(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.dashboard_cache_ttl_secs)
    }
}
