//! End-to-end pipeline tests
//!
//! Builds a fixture tree of feature files, a results document and an
//! evidence corpus, then runs the full report pipeline over it.

use std::fs;
use std::path::Path;

use bddboard_common::evidence::load_evidence_records;
use bddboard_common::gherkin::parse_feature_directory;
use bddboard_common::report::load_results_or_empty;
use bddboard_common::{
    reconcile, AggregateMetrics, DashboardConfig, DataSource, EvidenceLinker, FeatureReport,
    QualityReport, Status,
};
use tempfile::TempDir;

const OWNERSHIP_FEATURE: &str = r#"# jtbd: "Every workspace has an accountable owner"
@ownership
Feature: Workspace Ownership
  Owners answer access reviews.

  Scenario: Assign primary owner
    Given a workspace "fraud-detection"
    When I assign "sarah@bank.com" as owner
    Then the owner is recorded

  Scenario: Transfer ownership
    Given a workspace "fraud-detection"
    When I transfer ownership to "john@bank.com"
    Then "john@bank.com" is the owner
"#;

const CHECKOUT_FEATURE: &str = r#"Feature: Bella checks order
  Scenario: Totals
    Given Bella has an order
    Then the order total is <2 seconds
"#;

const BROKEN_FEATURE: &str = "Scenario: orphan\n  Given no feature header\n";

fn results_document() -> serde_json::Value {
    serde_json::json!([
        {
            "name": "Workspace Ownership",
            "status": "failed",
            "elements": [
                {
                    "type": "scenario",
                    "name": "Assign primary owner",
                    "steps": [
                        { "keyword": "Given ", "name": "a workspace \"fraud-detection\"", "result": { "status": "passed" } },
                        { "keyword": "When ", "name": "I assign \"sarah@bank.com\" as owner", "result": { "status": "passed" } },
                        { "keyword": "Then ", "name": "the owner is recorded", "result": { "status": "failed", "error_message": "expected owner" } }
                    ]
                }
            ]
        }
    ])
}

fn write_fixture(root: &Path) -> DashboardConfig {
    let features = root.join("features");
    let behaviors = root.join("behaviors");
    fs::create_dir_all(&features).unwrap();
    fs::create_dir_all(&behaviors).unwrap();

    fs::write(features.join("workspace_ownership.feature"), OWNERSHIP_FEATURE).unwrap();
    fs::write(features.join("checkout.feature"), CHECKOUT_FEATURE).unwrap();
    fs::write(features.join("broken.feature"), BROKEN_FEATURE).unwrap();

    let results = root.join("behave-results.json");
    fs::write(&results, results_document().to_string()).unwrap();

    fs::write(
        behaviors.join("owner-access.md"),
        "# Owner access\n\n```json\n{\"object_type\":\"behavior\",\"id\":\"owner-access\",\"user_enablement\":\"grants owner permissions\",\"evidence\":[\"e1\",\"e2\",\"e3\"]}\n```\n",
    )
    .unwrap();
    fs::write(behaviors.join("garbage.md"), "no json here").unwrap();

    DashboardConfig {
        features_dir: features,
        results_path: results,
        evidence_dir: behaviors,
        ..DashboardConfig::default()
    }
}

#[test]
fn test_full_report() {
    let dir = TempDir::new().unwrap();
    let config = write_fixture(dir.path());

    let report = FeatureReport::build(&config);
    assert_eq!(report.data_source, DataSource::FeatureFiles);
    // broken.feature is skipped, the rest are sorted by file name
    let ids: Vec<_> = report.features.iter().map(|f| f.id.as_str()).collect();
    assert_eq!(ids, vec!["checkout", "workspace_ownership"]);

    let ownership = report.feature("workspace_ownership").unwrap();
    assert_eq!(ownership.feature.status, Status::Failed);
    assert_eq!(ownership.feature.scenarios[0].status, Status::Failed);
    assert_eq!(ownership.feature.scenarios[1].status, Status::Undefined);
    assert_eq!(
        ownership.feature.scenarios[0].steps[2].error_message.as_deref(),
        Some("expected owner")
    );
    assert_eq!(ownership.progress.percentage, 0);
    assert_eq!(ownership.progress.evidence_count, 3);
    assert_eq!(ownership.card.metrics.evidence, 3);
    assert_eq!(
        ownership.feature.jtbd.as_deref(),
        Some("Every workspace has an accountable owner")
    );

    let checkout = report.feature("checkout").unwrap();
    assert_eq!(checkout.feature.lint_score, Some(75));
    assert_eq!(checkout.progress.evidence_count, 0);

    let snapshot = report.snapshot().bdd_progress;
    assert_eq!(snapshot.total_features, 2);
    assert_eq!(snapshot.total_scenarios, 3);
    assert_eq!(snapshot.total_steps, 8);
    assert_eq!(snapshot.passed_steps, 2);
    assert_eq!(snapshot.failed_steps, 1);
    assert_eq!(snapshot.undefined_steps, 5);
}

#[test]
fn test_workspace_ownership_scenario_fails() {
    let dir = TempDir::new().unwrap();
    let config = write_fixture(dir.path());

    let parsed = parse_feature_directory(&config.features_dir);
    let results = load_results_or_empty(&config.results_path);
    let reconciled = reconcile(&parsed, &results);

    let ownership = reconciled
        .iter()
        .find(|f| f.name == "Workspace Ownership")
        .unwrap();
    let steps: Vec<Status> = ownership.scenarios[0].steps.iter().map(|s| s.status).collect();
    assert_eq!(steps, vec![Status::Passed, Status::Passed, Status::Failed]);
    assert_eq!(ownership.scenarios[0].status, Status::Failed);

    // "Transfer ownership" has no element in the results document.
    let transfer = &ownership.scenarios[1];
    assert_eq!(transfer.status, Status::Undefined);
    assert!(transfer.steps.iter().all(|s| s.status == Status::Undefined));
    assert_eq!(ownership.status, Status::Failed);
}

#[test]
fn test_reconcile_twice_is_identical() {
    let dir = TempDir::new().unwrap();
    let config = write_fixture(dir.path());

    let parsed = parse_feature_directory(&config.features_dir);
    let results = load_results_or_empty(&config.results_path);

    let once = reconcile(&parsed, &results);
    let twice = reconcile(&once, &results);
    assert_eq!(
        serde_json::to_string(&once).unwrap(),
        serde_json::to_string(&twice).unwrap()
    );
}

#[test]
fn test_results_only_fallback() {
    let dir = TempDir::new().unwrap();
    let mut config = write_fixture(dir.path());
    config.features_dir = dir.path().join("no-features-here");

    let report = FeatureReport::build(&config);
    assert_eq!(report.data_source, DataSource::ExecutionResults);
    assert_eq!(report.features.len(), 1);
    assert_eq!(report.features[0].id, "workspace_ownership");
    // Explicit feature status from the document wins.
    assert_eq!(report.features[0].status, Status::Failed);
}

#[test]
fn test_malformed_results_are_ignored() {
    let dir = TempDir::new().unwrap();
    let config = write_fixture(dir.path());
    fs::write(&config.results_path, "[{\"name\": ").unwrap();

    let report = FeatureReport::build(&config);
    assert_eq!(report.data_source, DataSource::FeatureFiles);
    assert!(report
        .features
        .iter()
        .all(|f| f.status == Status::Undefined));
}

#[test]
fn test_empty_feature_list() {
    let metrics = AggregateMetrics::from_features(&[]);
    assert_eq!(metrics.features.total, 0);
    assert_eq!(metrics.scenarios.total, 0);
    assert_eq!(metrics.steps.total, 0);
    assert_eq!(metrics.steps.percentage, 0);
}

#[test]
fn test_percentages_and_scores_in_range() {
    let dir = TempDir::new().unwrap();
    let config = write_fixture(dir.path());
    let report = FeatureReport::build(&config);

    for row in &report.progress {
        assert!(row.percentage <= 100);
        assert_eq!(
            row.percentage == 0,
            row.total_scenarios == 0 || row.passed_scenarios == 0
        );
        if let Some(score) = row.lint_score {
            assert!([0, 25, 50, 75, 100].contains(&score));
        }
    }

    let full = QualityReport::evaluate(
        "Feature: Maya can review\n  Scenario: S\n    Then 10 users see it\n",
    );
    assert_eq!(full.score, 100);
}

#[test]
fn test_evidence_linking() {
    let dir = TempDir::new().unwrap();
    let config = write_fixture(dir.path());
    let records = load_evidence_records(&config.evidence_dir);
    assert_eq!(records.len(), 1);

    let linker = EvidenceLinker::default();
    assert_eq!(linker.evidence_count("Workspace Ownership Assignment", &records), 3);
    assert_eq!(linker.evidence_count("Checkout", &records), 0);
}
