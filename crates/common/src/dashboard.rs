//! Filesystem dashboard
//!
//! Scans every registered project's feature directory, lints each file and
//! summarizes the result. The summary is expensive enough to be worth a
//! short-lived cache; see [`DashboardCache`].

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};
use crate::quality::{QualityLayers, QualityReport};

/// Registry file looked up in the dashboard root
pub const REGISTRY_FILE: &str = ".dashboard-projects.json";

/// Default lifetime of a cached dashboard
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60);

/// Directories never descended into during discovery
const IGNORED_DIRS: [&str; 2] = ["node_modules", "venv"];

static SCENARIO_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\s*(Scenario|Scenario Outline):").expect("valid scenario header regex")
});

// ============================================================================
// Registry
// ============================================================================

/// A project whose features appear on the dashboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub name: String,
    pub features_path: PathBuf,
    #[serde(default = "default_source")]
    pub source: String,
}

fn default_source() -> String {
    "local".to_string()
}

impl Project {
    fn fallback() -> Self {
        Self {
            id: "discrete-connection".to_string(),
            name: "Discrete Connection".to_string(),
            features_path: PathBuf::from("./features"),
            source: default_source(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ProjectRegistry {
    projects: Vec<Project>,
}

/// Load the project registry from `root`.
///
/// An absent registry yields the single default project; a malformed one is
/// an error.
pub fn load_project_registry(root: &Path) -> Result<Vec<Project>> {
    let path = root.join(REGISTRY_FILE);

    if !path.exists() {
        warn!("No {} found in {:?}, using the default project", REGISTRY_FILE, root);
        return Ok(vec![Project::fallback()]);
    }

    let content = std::fs::read_to_string(&path).map_err(|e| Error::source_read(&path, e))?;
    let registry: ProjectRegistry =
        serde_json::from_str(&content).map_err(|e| Error::parse(&path, e.to_string()))?;

    Ok(registry.projects)
}

/// Every `.feature` file below the project's features path, sorted.
pub fn find_feature_files(project: &Project, root: &Path) -> Vec<PathBuf> {
    let base = root.join(&project.features_path);

    if !base.exists() {
        error!("Features path not found for {}: {:?}", project.id, base);
        return Vec::new();
    }

    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(&base)
        .into_iter()
        .filter_entry(|e| {
            !(e.file_type().is_dir()
                && IGNORED_DIRS.iter().any(|ignored| e.file_name() == *ignored))
        })
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.file_type().is_file()
                && e.path()
                    .extension()
                    .map(|ext| ext == "feature")
                    .unwrap_or(false)
        })
        .map(|e| e.into_path())
        .collect();
    files.sort();

    files
}

/// Number of `Scenario:` / `Scenario Outline:` headers in feature text
pub fn count_scenarios(source: &str) -> usize {
    SCENARIO_HEADER.find_iter(source).count()
}

// ============================================================================
// Summaries
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureSummary {
    pub file_name: String,
    pub scenario_count: usize,
    pub lint_score: u8,
    pub quality_layers: QualityLayers,
}

impl FeatureSummary {
    pub fn from_source(file_name: impl Into<String>, source: &str) -> Self {
        let quality = QualityReport::evaluate(source);
        Self {
            file_name: file_name.into(),
            scenario_count: count_scenarios(source),
            lint_score: quality.score,
            quality_layers: quality.layers,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSummary {
    pub id: String,
    pub name: String,
    pub feature_count: usize,
    pub scenario_count: usize,
    pub avg_lint_score: u8,
    pub features: Vec<FeatureSummary>,
}

impl ProjectSummary {
    pub fn new(project: &Project, features: Vec<FeatureSummary>) -> Self {
        let total_score: u32 = features.iter().map(|f| f.lint_score as u32).sum();
        let avg_lint_score = if features.is_empty() {
            0
        } else {
            (total_score as f64 / features.len() as f64).round() as u8
        };

        Self {
            id: project.id.clone(),
            name: project.name.clone(),
            feature_count: features.len(),
            scenario_count: features.iter().map(|f| f.scenario_count).sum(),
            avg_lint_score,
            features,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardData {
    pub projects: Vec<ProjectSummary>,
    pub last_updated: DateTime<Utc>,
}

fn summarize_project(project: &Project, root: &Path) -> ProjectSummary {
    let features = find_feature_files(project, root)
        .iter()
        .filter_map(|path| match std::fs::read_to_string(path) {
            Ok(source) => {
                let file_name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default();
                Some(FeatureSummary::from_source(file_name, &source))
            }
            Err(e) => {
                warn!("Skipping unreadable feature file {:?}: {}", path, e);
                None
            }
        })
        .collect();

    ProjectSummary::new(project, features)
}

/// Scan every registered project below `root`.
pub fn generate_dashboard_data(root: &Path) -> Result<DashboardData> {
    let projects = load_project_registry(root)?;

    let summaries: Vec<ProjectSummary> = projects
        .iter()
        .map(|project| summarize_project(project, root))
        .collect();

    debug!("Scanned {} projects under {:?}", summaries.len(), root);

    Ok(DashboardData {
        projects: summaries,
        last_updated: Utc::now(),
    })
}

// ============================================================================
// Cache
// ============================================================================

#[derive(Debug, Clone)]
struct CacheEntry {
    data: DashboardData,
    timestamp: Instant,
}

/// Time-bounded cache of the last dashboard scan.
///
/// The lock is held only to read or replace the entry, never while scanning.
/// Concurrent misses each rescan and the last one to finish wins; scans are
/// idempotent so any of them is a valid answer.
#[derive(Debug)]
pub struct DashboardCache {
    entry: RwLock<Option<CacheEntry>>,
    ttl: Duration,
}

impl Default for DashboardCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_TTL)
    }
}

impl DashboardCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entry: RwLock::new(None),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Cached data if it is still fresh at `now`
    fn fresh_at(&self, now: Instant) -> Option<DashboardData> {
        self.entry
            .read()
            .as_ref()
            .filter(|entry| now.saturating_duration_since(entry.timestamp) < self.ttl)
            .map(|entry| entry.data.clone())
    }

    fn store(&self, data: DashboardData, timestamp: Instant) {
        *self.entry.write() = Some(CacheEntry { data, timestamp });
    }

    /// Drop the cached entry so the next read rescans.
    pub fn invalidate(&self) {
        *self.entry.write() = None;
    }

    fn get_or_refresh_at<F>(&self, now: Instant, compute: F) -> Result<DashboardData>
    where
        F: FnOnce() -> Result<DashboardData>,
    {
        if let Some(data) = self.fresh_at(now) {
            debug!("Dashboard cache hit");
            return Ok(data);
        }

        info!("Dashboard cache miss, rescanning");
        let data = compute()?;
        self.store(data.clone(), now);
        Ok(data)
    }
}

/// Dashboard data for `root`, served from `cache` while fresh.
pub fn get_cached_dashboard_data(cache: &DashboardCache, root: &Path) -> Result<DashboardData> {
    cache.get_or_refresh_at(Instant::now(), || generate_dashboard_data(root))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn write(path: &Path, content: &str) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn test_count_scenarios() {
        let source = "Feature: F\n  Scenario: one\n  Scenario Outline: two\n  # Scenario: comment\nScenario:three\n";
        assert_eq!(count_scenarios(source), 3);
    }

    #[test]
    fn test_default_project_without_registry() {
        let dir = tempfile::TempDir::new().unwrap();
        let projects = load_project_registry(dir.path()).unwrap();
        assert_eq!(projects, vec![Project::fallback()]);
    }

    #[test]
    fn test_malformed_registry_is_error() {
        let dir = tempfile::TempDir::new().unwrap();
        write(&dir.path().join(REGISTRY_FILE), "{\"projects\": 3}");
        assert!(matches!(
            load_project_registry(dir.path()),
            Err(Error::Parse { .. })
        ));
    }

    #[test]
    fn test_discovery_skips_ignored_dirs() {
        let dir = tempfile::TempDir::new().unwrap();
        let root = dir.path();
        write(&root.join("features/a.feature"), "Feature: A\n");
        write(&root.join("features/nested/b.feature"), "Feature: B\n");
        write(&root.join("features/node_modules/pkg/c.feature"), "Feature: C\n");
        write(&root.join("features/venv/d.feature"), "Feature: D\n");
        write(&root.join("features/notes.md"), "not a feature");

        let files = find_feature_files(&Project::fallback(), root);
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.feature", "b.feature"]);
    }

    #[test]
    fn test_missing_features_path_yields_nothing() {
        let dir = tempfile::TempDir::new().unwrap();
        assert!(find_feature_files(&Project::fallback(), dir.path()).is_empty());
    }

    #[test]
    fn test_generate_dashboard_data() {
        let dir = tempfile::TempDir::new().unwrap();
        let root = dir.path();
        write(
            &root.join(REGISTRY_FILE),
            r#"{"projects":[{"id":"core","name":"Core","featuresPath":"specs"}]}"#,
        );
        write(
            &root.join("specs/checkout.feature"),
            "Feature: Bella checks order\n  Scenario: Totals\n    Then the order total is <2 seconds\n  Scenario: Refund\n    Given nothing\n",
        );
        write(&root.join("specs/empty.feature"), "Feature: Empty\n");

        let data = generate_dashboard_data(root).unwrap();
        assert_eq!(data.projects.len(), 1);

        let project = &data.projects[0];
        assert_eq!(project.id, "core");
        assert_eq!(project.feature_count, 2);
        assert_eq!(project.scenario_count, 2);
        // (75 + 0) / 2 rounds half away from zero
        assert_eq!(project.avg_lint_score, 38);
        assert_eq!(project.features[0].file_name, "checkout.feature");
        assert!(project.features[0].quality_layers.usable);

        let json = serde_json::to_value(&data).unwrap();
        assert!(json["lastUpdated"].is_string());
        assert_eq!(json["projects"][0]["avgLintScore"], 38);
        assert_eq!(json["projects"][0]["features"][0]["qualityLayers"]["functional"], true);
    }

    fn sample() -> DashboardData {
        DashboardData {
            projects: Vec::new(),
            last_updated: Utc::now(),
        }
    }

    #[test]
    fn test_cache_serves_fresh_data() {
        let cache = DashboardCache::new(Duration::from_secs(60));
        let computed = Cell::new(0);
        let start = Instant::now();

        let compute = || {
            computed.set(computed.get() + 1);
            Ok(sample())
        };
        cache.get_or_refresh_at(start, compute).unwrap();
        cache
            .get_or_refresh_at(start + Duration::from_secs(30), compute)
            .unwrap();
        assert_eq!(computed.get(), 1);

        cache
            .get_or_refresh_at(start + Duration::from_secs(61), compute)
            .unwrap();
        assert_eq!(computed.get(), 2);

        cache.invalidate();
        cache
            .get_or_refresh_at(start + Duration::from_secs(62), compute)
            .unwrap();
        assert_eq!(computed.get(), 3);
    }

    #[test]
    fn test_cache_does_not_store_failures() {
        let cache = DashboardCache::default();
        let now = Instant::now();
        let failed = cache.get_or_refresh_at(now, || Err(Error::Internal("boom".to_string())));
        assert!(failed.is_err());
        assert!(cache.fresh_at(now).is_none());
        assert_eq!(cache.ttl(), DEFAULT_CACHE_TTL);
    }
}
