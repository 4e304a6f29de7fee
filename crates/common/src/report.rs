//! Feature report pipeline
//!
//! parse → reconcile → link evidence → aggregate, rebuilt from the source
//! files on every call.

use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::DashboardConfig;
use crate::error::{Error, Result};
use crate::evidence::{load_evidence_records, EvidenceLinker, EvidenceRecord};
use crate::gherkin::parse_feature_directory;
use crate::progress::{card_tree, AggregateMetrics, Card, FeatureProgress, ProgressSnapshot};
use crate::reconciler::{features_from_results, reconcile};
use crate::results::{load_execution_results, ExecutionFeature};
use crate::types::Feature;

/// Where the report's feature tree came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    /// Parsed `.feature` files, reconciled against results
    FeatureFiles,
    /// Built from the results document alone
    ExecutionResults,
    /// Neither source produced anything
    Empty,
}

impl std::fmt::Display for DataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataSource::FeatureFiles => write!(f, "feature_files"),
            DataSource::ExecutionResults => write!(f, "execution_results"),
            DataSource::Empty => write!(f, "empty"),
        }
    }
}

/// Reconciled features with everything derived from them
#[derive(Debug, Clone, Serialize)]
pub struct FeatureReport {
    pub features: Vec<Feature>,
    pub progress: Vec<FeatureProgress>,
    pub metrics: AggregateMetrics,
    pub cards: Vec<Card>,
    pub generated_at: DateTime<Utc>,
    pub data_source: DataSource,
    #[serde(skip)]
    evidence_ids: HashMap<String, Vec<String>>,
}

/// Everything known about one feature
#[derive(Debug, Clone, Serialize)]
pub struct FeatureDetail {
    pub feature: Feature,
    pub progress: FeatureProgress,
    pub card: Card,
    pub evidence_ids: Vec<String>,
}

/// Read a results document; absent or malformed means no results.
pub fn load_results_or_empty(path: &Path) -> Vec<ExecutionFeature> {
    if !path.exists() {
        debug!("No execution results at {:?}", path);
        return Vec::new();
    }

    match load_execution_results(path) {
        Ok(results) => results,
        Err(e) => {
            warn!("Ignoring execution results: {}", e);
            Vec::new()
        }
    }
}

impl FeatureReport {
    /// Build the report from the configured source locations.
    pub fn build(config: &DashboardConfig) -> Self {
        let parsed = parse_feature_directory(&config.features_dir);
        let results = load_results_or_empty(&config.results_path);
        let evidence = load_evidence_records(&config.evidence_dir);

        let report = Self::from_parts(
            parsed,
            &results,
            &evidence,
            &EvidenceLinker::default(),
            Utc::now(),
        );
        info!(
            "Built feature report: {} features from {}",
            report.features.len(),
            report.data_source
        );
        report
    }

    /// Assemble a report from already-loaded inputs.
    pub fn from_parts(
        parsed: Vec<Feature>,
        results: &[ExecutionFeature],
        evidence: &[EvidenceRecord],
        linker: &EvidenceLinker,
        generated_at: DateTime<Utc>,
    ) -> Self {
        let (features, data_source) = if !parsed.is_empty() {
            (reconcile(&parsed, results), DataSource::FeatureFiles)
        } else if !results.is_empty() {
            (features_from_results(results), DataSource::ExecutionResults)
        } else {
            (Vec::new(), DataSource::Empty)
        };

        let counts: HashMap<&str, usize> = features
            .iter()
            .map(|f| (f.id.as_str(), linker.evidence_count(&f.name, evidence)))
            .collect();
        let evidence_of = |f: &Feature| counts.get(f.id.as_str()).copied().unwrap_or(0);

        let progress = features
            .iter()
            .map(|f| FeatureProgress::new(f, evidence_of(f)))
            .collect();
        let cards = card_tree(&features, evidence_of);
        let metrics = AggregateMetrics::from_features(&features);
        let evidence_ids = features
            .iter()
            .map(|f| (f.id.clone(), linker.evidence_ids(&f.name, evidence)))
            .collect();

        Self {
            features,
            progress,
            metrics,
            cards,
            generated_at,
            data_source,
            evidence_ids,
        }
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot::from_metrics(&self.metrics, self.generated_at)
    }

    /// Drill-down for one feature id.
    pub fn feature(&self, id: &str) -> Result<FeatureDetail> {
        let index = self
            .features
            .iter()
            .position(|f| f.id == id)
            .ok_or_else(|| Error::NotFound {
                kind: "feature".to_string(),
                id: id.to_string(),
            })?;

        Ok(FeatureDetail {
            feature: self.features[index].clone(),
            progress: self.progress[index].clone(),
            card: self.cards[index].clone(),
            evidence_ids: self.evidence_ids.get(id).cloned().unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gherkin::parse_feature_source;
    use crate::results::parse_execution_results;
    use crate::types::Status;

    const RESULTS: &str = r#"[{
      "name": "Workspace Ownership",
      "elements": [{
        "type": "scenario",
        "name": "Assign owner",
        "steps": [
          { "keyword": "Given ", "name": "a workspace", "result": { "status": "passed" } },
          { "keyword": "Then ", "name": "it has an owner", "result": { "status": "passed" } }
        ]
      }]
    }]"#;

    fn results() -> Vec<ExecutionFeature> {
        parse_execution_results(RESULTS, Path::new("results.json")).unwrap()
    }

    #[test]
    fn test_empty_inputs() {
        let report =
            FeatureReport::from_parts(vec![], &[], &[], &EvidenceLinker::default(), Utc::now());
        assert_eq!(report.data_source, DataSource::Empty);
        assert!(report.features.is_empty());
        assert!(report.cards.is_empty());
        assert_eq!(report.metrics, AggregateMetrics::default());
    }

    #[test]
    fn test_parsed_features_take_precedence() {
        let parsed = parse_feature_source(
            "Feature: Workspace Ownership\n  Scenario: Assign owner\n    Given a workspace\n    Then it has an owner\n",
            "workspace_ownership",
        )
        .unwrap();
        let report = FeatureReport::from_parts(
            vec![parsed],
            &results(),
            &[],
            &EvidenceLinker::default(),
            Utc::now(),
        );

        assert_eq!(report.data_source, DataSource::FeatureFiles);
        assert_eq!(report.features[0].status, Status::Passed);
        assert_eq!(report.progress[0].percentage, 100);
        assert_eq!(report.snapshot().bdd_progress.passed_steps, 2);
    }

    #[test]
    fn test_falls_back_to_results_document() {
        let report =
            FeatureReport::from_parts(vec![], &results(), &[], &EvidenceLinker::default(), Utc::now());
        assert_eq!(report.data_source, DataSource::ExecutionResults);
        assert_eq!(report.features[0].id, "workspace_ownership");
        assert_eq!(report.features[0].lint_score, None);
    }

    #[test]
    fn test_feature_detail_lookup() {
        let evidence = vec![EvidenceRecord {
            object_type: "behavior".to_string(),
            id: "workspace-owner".to_string(),
            user_enablement: "grants owner permissions".to_string(),
            end_user: None,
            observable_signals: vec![],
            acceptance_criteria: vec![],
            evidence: vec!["e1".to_string(), "e2".to_string()],
            tags: vec![],
        }];
        let report = FeatureReport::from_parts(
            vec![],
            &results(),
            &evidence,
            &EvidenceLinker::default(),
            Utc::now(),
        );

        let detail = report.feature("workspace_ownership").unwrap();
        assert_eq!(detail.progress.evidence_count, 2);
        assert_eq!(detail.card.metrics.evidence, 2);
        assert_eq!(detail.evidence_ids, vec!["e1", "e2"]);

        assert!(matches!(
            report.feature("missing"),
            Err(Error::NotFound { .. })
        ));
    }

    #[test]
    fn test_build_tolerates_missing_sources() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = DashboardConfig {
            features_dir: dir.path().join("features"),
            results_path: dir.path().join("results.json"),
            evidence_dir: dir.path().join("behaviors"),
            ..DashboardConfig::default()
        };
        let report = FeatureReport::build(&config);
        assert_eq!(report.data_source, DataSource::Empty);
    }
}
