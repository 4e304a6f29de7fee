//! BDD Board Common Library
//!
//! Feature parsing, result reconciliation, quality scoring, evidence
//! linking and progress aggregation shared by the web server and the CLI.

pub mod config;
pub mod dashboard;
pub mod error;
pub mod evidence;
pub mod gherkin;
pub mod mockups;
pub mod progress;
pub mod quality;
pub mod reconciler;
pub mod report;
pub mod results;
pub mod timeouts;
pub mod types;

// Re-export commonly used types
pub use config::DashboardConfig;
pub use dashboard::{generate_dashboard_data, get_cached_dashboard_data, DashboardCache, DashboardData};
pub use error::{Error, Result};
pub use evidence::{EvidenceLinker, EvidenceRecord, EvidenceRule};
pub use gherkin::{parse_feature_directory, parse_feature_file, parse_feature_source, slugify};
pub use mockups::{load_mockup, MockupData, MockupError, MockupMode};
pub use progress::{AggregateMetrics, Card, FeatureProgress, ProgressSnapshot};
pub use quality::{QualityLayers, QualityReport};
pub use reconciler::{features_from_results, reconcile};
pub use report::{DataSource, FeatureDetail, FeatureReport};
pub use results::ExecutionFeature;
pub use timeouts::{PerformanceReport, TimeoutManager, TimeoutStrategy};
pub use types::*;

/// BDD Board version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
