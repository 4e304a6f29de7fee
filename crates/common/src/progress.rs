//! Aggregation/Projection Layer
//!
//! Derives summary metrics and the nested card tree from reconciled
//! features. Everything here is a projection: statuses are read, never
//! recomputed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Feature, Scenario, Status, Step};

/// Integer percentage `round(100 × part / total)`.
///
/// 0 when `total` is 0. A non-zero `part` never rounds down to 0, so a
/// percentage of 0 always means nothing has passed.
pub fn percentage(part: usize, total: usize) -> u8 {
    if total == 0 || part == 0 {
        return 0;
    }
    let value = (100.0 * part.min(total) as f64 / total as f64).round() as u8;
    value.max(1)
}

// ============================================================================
// Flat metrics
// ============================================================================

/// Per-status counts at one granularity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub undefined: usize,
    pub skipped: usize,
    pub pending: usize,
    /// Share of `passed` in `total`
    pub percentage: u8,
}

impl StatusCounts {
    pub fn from_statuses<I>(statuses: I) -> Self
    where
        I: IntoIterator<Item = Status>,
    {
        let mut counts = Self::default();
        for status in statuses {
            counts.total += 1;
            match status {
                Status::Passed => counts.passed += 1,
                Status::Failed => counts.failed += 1,
                Status::Undefined => counts.undefined += 1,
                Status::Skipped => counts.skipped += 1,
                Status::Pending => counts.pending += 1,
            }
        }
        counts.percentage = percentage(counts.passed, counts.total);
        counts
    }

    pub fn count(&self, status: Status) -> usize {
        match status {
            Status::Passed => self.passed,
            Status::Failed => self.failed,
            Status::Undefined => self.undefined,
            Status::Skipped => self.skipped,
            Status::Pending => self.pending,
        }
    }
}

/// Totals at feature, scenario and step granularity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateMetrics {
    pub features: StatusCounts,
    pub scenarios: StatusCounts,
    pub steps: StatusCounts,
}

impl AggregateMetrics {
    pub fn from_features(features: &[Feature]) -> Self {
        let scenarios = || features.iter().flat_map(|f| f.scenarios.iter());

        Self {
            features: StatusCounts::from_statuses(features.iter().map(|f| f.status)),
            scenarios: StatusCounts::from_statuses(scenarios().map(|s| s.status)),
            steps: StatusCounts::from_statuses(
                scenarios().flat_map(|s| s.steps.iter()).map(|s| s.status),
            ),
        }
    }
}

/// One row of the per-feature progress table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureProgress {
    pub id: String,
    pub name: String,
    pub status: Status,
    pub passed_scenarios: usize,
    pub total_scenarios: usize,
    pub percentage: u8,
    pub evidence_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lint_score: Option<u8>,
}

impl FeatureProgress {
    pub fn new(feature: &Feature, evidence_count: usize) -> Self {
        let passed = feature.count_scenarios(Status::Passed);
        let total = feature.scenarios.len();

        Self {
            id: feature.id.clone(),
            name: feature.name.clone(),
            status: feature.status,
            passed_scenarios: passed,
            total_scenarios: total,
            percentage: percentage(passed, total),
            evidence_count,
            lint_score: feature.lint_score,
        }
    }
}

// ============================================================================
// Progress snapshot
// ============================================================================

/// Step-level progress numbers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BddProgress {
    pub total_features: usize,
    pub total_scenarios: usize,
    pub total_steps: usize,
    pub passed_steps: usize,
    pub failed_steps: usize,
    pub undefined_steps: usize,
    pub skipped_steps: usize,
    pub pending_steps: usize,
    /// Passed steps as a share of all steps
    pub implementation_completeness: u8,
    /// Steps with a definition (anything but undefined)
    pub definition_coverage: u8,
    /// Steps that actually ran (passed or failed)
    pub step_execution_rate: u8,
}

/// Fixed-shape progress body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub bdd_progress: BddProgress,
    pub generated_at: DateTime<Utc>,
}

impl ProgressSnapshot {
    pub fn from_metrics(metrics: &AggregateMetrics, generated_at: DateTime<Utc>) -> Self {
        let steps = &metrics.steps;

        Self {
            bdd_progress: BddProgress {
                total_features: metrics.features.total,
                total_scenarios: metrics.scenarios.total,
                total_steps: steps.total,
                passed_steps: steps.passed,
                failed_steps: steps.failed,
                undefined_steps: steps.undefined,
                skipped_steps: steps.skipped,
                pending_steps: steps.pending,
                implementation_completeness: percentage(steps.passed, steps.total),
                definition_coverage: percentage(steps.total - steps.undefined, steps.total),
                step_execution_rate: percentage(steps.passed + steps.failed, steps.total),
            },
            generated_at,
        }
    }
}

// ============================================================================
// Card tree
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardKind {
    Feature,
    Scenario,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CardStatus {
    #[serde(rename = "NOT STARTED")]
    NotStarted,
    #[serde(rename = "IN PROGRESS")]
    InProgress,
    #[serde(rename = "PASSING")]
    Passing,
    #[serde(rename = "FAILING")]
    Failing,
}

impl CardStatus {
    /// Display status of a node given its own status and completed signals.
    pub fn from_node(status: Status, completed: usize) -> Self {
        match status {
            Status::Failed => CardStatus::Failing,
            Status::Passed => CardStatus::Passing,
            _ if completed > 0 => CardStatus::InProgress,
            _ => CardStatus::NotStarted,
        }
    }
}

impl std::fmt::Display for CardStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CardStatus::NotStarted => write!(f, "NOT STARTED"),
            CardStatus::InProgress => write!(f, "IN PROGRESS"),
            CardStatus::Passing => write!(f, "PASSING"),
            CardStatus::Failing => write!(f, "FAILING"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardStepStatus {
    Passing,
    Failing,
    Pending,
    Undefined,
}

impl From<Status> for CardStepStatus {
    fn from(status: Status) -> Self {
        match status {
            Status::Passed => CardStepStatus::Passing,
            Status::Failed => CardStepStatus::Failing,
            Status::Pending | Status::Skipped => CardStepStatus::Pending,
            Status::Undefined => CardStepStatus::Undefined,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signals {
    pub completed: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardMetrics {
    pub signals: Signals,
    pub evidence: usize,
    pub percentage: u8,
}

impl CardMetrics {
    fn new(completed: usize, total: usize, evidence: usize) -> Self {
        Self {
            signals: Signals { completed, total },
            evidence,
            percentage: percentage(completed, total),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardStep {
    pub step: String,
    pub status: CardStepStatus,
}

impl From<&Step> for CardStep {
    fn from(step: &Step) -> Self {
        Self {
            step: step.line.clone(),
            status: step.status.into(),
        }
    }
}

/// Display node mirroring Feature → Scenario → Step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: CardKind,
    pub status: CardStatus,
    pub metrics: CardMetrics,
    #[serde(default)]
    pub children: Vec<Card>,
    #[serde(default)]
    pub steps: Vec<CardStep>,
}

impl Card {
    /// Feature card; signals are passed scenarios out of all scenarios.
    pub fn from_feature(feature: &Feature, evidence: usize) -> Self {
        let completed = feature.count_scenarios(Status::Passed);

        Self {
            id: feature.id.clone(),
            title: feature.name.clone(),
            kind: CardKind::Feature,
            status: CardStatus::from_node(feature.status, completed),
            metrics: CardMetrics::new(completed, feature.scenarios.len(), evidence),
            children: feature
                .scenarios
                .iter()
                .map(|scenario| Card::from_scenario(&feature.id, scenario))
                .collect(),
            steps: Vec::new(),
        }
    }

    /// Scenario card; signals are passed steps out of all steps.
    pub fn from_scenario(feature_id: &str, scenario: &Scenario) -> Self {
        let completed = scenario.count_steps(Status::Passed);

        Self {
            id: format!("{}-{}", feature_id, scenario.id),
            title: scenario.name.clone(),
            kind: CardKind::Scenario,
            status: CardStatus::from_node(scenario.status, completed),
            metrics: CardMetrics::new(completed, scenario.steps.len(), 0),
            children: Vec::new(),
            steps: scenario.steps.iter().map(CardStep::from).collect(),
        }
    }
}

/// Card tree for a list of features; `evidence_of` supplies each feature's
/// evidence count.
pub fn card_tree<F>(features: &[Feature], evidence_of: F) -> Vec<Card>
where
    F: Fn(&Feature) -> usize,
{
    features
        .iter()
        .map(|feature| Card::from_feature(feature, evidence_of(feature)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StepKeyword;

    fn scenario(id: &str, statuses: &[Status]) -> Scenario {
        let mut scenario = Scenario::new(id, format!("Scenario {}", id));
        for (i, status) in statuses.iter().enumerate() {
            let mut step = Step::new(format!("{}-step-{}", id, i + 1), StepKeyword::Given, "x");
            step.status = *status;
            scenario.steps.push(step);
        }
        scenario.status = scenario.rolled_up_status();
        scenario
    }

    fn feature(scenarios: Vec<Scenario>) -> Feature {
        let mut feature = Feature::new("workspace_ownership", "Workspace Ownership");
        feature.scenarios = scenarios;
        feature.status = feature.rolled_up_status();
        feature
    }

    #[test]
    fn test_percentage_bounds() {
        assert_eq!(percentage(0, 0), 0);
        assert_eq!(percentage(0, 7), 0);
        assert_eq!(percentage(1, 3), 33);
        assert_eq!(percentage(2, 3), 67);
        assert_eq!(percentage(3, 3), 100);
        assert_eq!(percentage(1, 500), 1);
    }

    #[test]
    fn test_empty_feature_list() {
        let metrics = AggregateMetrics::from_features(&[]);
        assert_eq!(metrics, AggregateMetrics::default());
        assert!(card_tree(&[], |_| 0).is_empty());

        let snapshot = ProgressSnapshot::from_metrics(&metrics, Utc::now());
        assert_eq!(snapshot.bdd_progress, BddProgress::default());
    }

    #[test]
    fn test_failed_scenario_progress_is_zero() {
        let f = feature(vec![scenario(
            "S1",
            &[Status::Passed, Status::Passed, Status::Failed],
        )]);
        let row = FeatureProgress::new(&f, 0);
        assert_eq!(row.status, Status::Failed);
        assert_eq!(row.passed_scenarios, 0);
        assert_eq!(row.total_scenarios, 1);
        assert_eq!(row.percentage, 0);
    }

    #[test]
    fn test_metrics_count_every_level() {
        let features = vec![
            feature(vec![
                scenario("S1", &[Status::Passed, Status::Passed]),
                scenario("S2", &[Status::Passed, Status::Undefined]),
            ]),
            feature(vec![scenario("S1", &[Status::Skipped])]),
        ];
        let metrics = AggregateMetrics::from_features(&features);

        assert_eq!(metrics.features.total, 2);
        assert_eq!(metrics.features.undefined, 1);
        assert_eq!(metrics.features.skipped, 1);
        assert_eq!(metrics.scenarios.total, 3);
        assert_eq!(metrics.scenarios.passed, 1);
        assert_eq!(metrics.scenarios.percentage, 33);
        assert_eq!(metrics.steps.total, 5);
        assert_eq!(metrics.steps.count(Status::Passed), 3);
        assert_eq!(metrics.steps.percentage, 60);
    }

    #[test]
    fn test_snapshot_rates() {
        let features = vec![feature(vec![scenario(
            "S1",
            &[Status::Passed, Status::Failed, Status::Pending, Status::Undefined],
        )])];
        let metrics = AggregateMetrics::from_features(&features);
        let progress = ProgressSnapshot::from_metrics(&metrics, Utc::now()).bdd_progress;

        assert_eq!(progress.total_steps, 4);
        assert_eq!(progress.implementation_completeness, 25);
        assert_eq!(progress.definition_coverage, 75);
        assert_eq!(progress.step_execution_rate, 50);
    }

    #[test]
    fn test_card_tree_shape() {
        let f = feature(vec![
            scenario("S1", &[Status::Passed, Status::Passed]),
            scenario("S2", &[Status::Passed, Status::Undefined]),
            scenario("S3", &[Status::Undefined]),
        ]);
        let cards = card_tree(std::slice::from_ref(&f), |_| 4);
        assert_eq!(cards.len(), 1);

        let card = &cards[0];
        assert_eq!(card.kind, CardKind::Feature);
        assert_eq!(card.status, CardStatus::InProgress);
        assert_eq!(card.metrics.signals, Signals { completed: 1, total: 3 });
        assert_eq!(card.metrics.evidence, 4);
        assert_eq!(card.metrics.percentage, 33);
        assert_eq!(card.children.len(), 3);

        assert_eq!(card.children[0].id, "workspace_ownership-S1");
        assert_eq!(card.children[0].status, CardStatus::Passing);
        assert_eq!(card.children[1].status, CardStatus::InProgress);
        assert_eq!(card.children[2].status, CardStatus::NotStarted);
        assert_eq!(card.children[1].steps[1].status, CardStepStatus::Undefined);
        assert_eq!(card.children[0].steps[0].step, "Given x");
    }

    #[test]
    fn test_card_serializes_display_strings() {
        let f = feature(vec![scenario("S1", &[Status::Failed])]);
        let json = serde_json::to_value(Card::from_feature(&f, 0)).unwrap();
        assert_eq!(json["type"], "feature");
        assert_eq!(json["status"], "FAILING");
        assert_eq!(json["children"][0]["steps"][0]["status"], "failing");
        assert_eq!(json["metrics"]["signals"]["total"], 1);
    }
}
