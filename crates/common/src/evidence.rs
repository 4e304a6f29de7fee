//! Evidence Linker
//!
//! Associates a feature with an external "behavior" record by keyword rules
//! and reports how much evidence that record carries. This is a best-effort
//! heuristic, not a foreign-key join: several features may land on the same
//! record and related evidence can be missed entirely.

use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, Result};

static JSON_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```json\s*\n(.*?)\n```").expect("valid json block regex"));

/// Behavior record loaded from the evidence corpus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceRecord {
    #[serde(default)]
    pub object_type: String,
    pub id: String,
    #[serde(default)]
    pub user_enablement: String,
    #[serde(default)]
    pub end_user: Option<String>,
    #[serde(default)]
    pub observable_signals: Vec<String>,
    #[serde(default)]
    pub acceptance_criteria: Vec<String>,
    #[serde(default)]
    pub evidence: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl EvidenceRecord {
    /// Lower-cased text the rules search: enablement followed by id.
    pub fn search_text(&self) -> String {
        format!("{} {}", self.user_enablement, self.id).to_lowercase()
    }
}

/// One keyword pair: when the feature name contains `feature_keyword`, a
/// record whose search text contains `evidence_keyword` matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceRule {
    pub feature_keyword: String,
    pub evidence_keyword: String,
}

impl EvidenceRule {
    pub fn new(feature_keyword: &str, evidence_keyword: &str) -> Self {
        Self {
            feature_keyword: feature_keyword.to_lowercase(),
            evidence_keyword: evidence_keyword.to_lowercase(),
        }
    }

    /// Both arguments must already be lower-cased.
    pub fn matches(&self, feature_name: &str, search_text: &str) -> bool {
        feature_name.contains(&self.feature_keyword) && search_text.contains(&self.evidence_keyword)
    }
}

/// Ordered keyword rules used when none are configured
pub fn default_rules() -> Vec<EvidenceRule> {
    [
        ("ownership", "owner"),
        ("connect", "connect"),
        ("signal", "signal"),
        ("interest", "interest"),
        ("health", "health"),
        ("privacy", "privacy"),
        ("reputation", "reputation"),
    ]
    .iter()
    .map(|(feature, evidence)| EvidenceRule::new(feature, evidence))
    .collect()
}

/// Keyword-rule matcher between feature names and evidence records
#[derive(Debug, Clone)]
pub struct EvidenceLinker {
    rules: Vec<EvidenceRule>,
}

impl Default for EvidenceLinker {
    fn default() -> Self {
        Self::new(default_rules())
    }
}

impl EvidenceLinker {
    pub fn new(rules: Vec<EvidenceRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[EvidenceRule] {
        &self.rules
    }

    /// First record (in corpus order) that any rule matches.
    pub fn matching_record<'r>(
        &self,
        feature_name: &str,
        records: &'r [EvidenceRecord],
    ) -> Option<&'r EvidenceRecord> {
        let name = feature_name.to_lowercase();

        records.iter().find(|record| {
            let text = record.search_text();
            self.rules.iter().any(|rule| rule.matches(&name, &text))
        })
    }

    /// Evidence count of the matched record, 0 when nothing matches.
    pub fn evidence_count(&self, feature_name: &str, records: &[EvidenceRecord]) -> usize {
        self.matching_record(feature_name, records)
            .map(|record| record.evidence.len())
            .unwrap_or(0)
    }

    /// Evidence ids for drill-down: the first record whose search text
    /// contains the first word of the feature name.
    pub fn evidence_ids(&self, feature_name: &str, records: &[EvidenceRecord]) -> Vec<String> {
        let name = feature_name.to_lowercase();
        let Some(first_word) = name.split_whitespace().next() else {
            return Vec::new();
        };

        records
            .iter()
            .find(|record| record.search_text().contains(first_word))
            .map(|record| record.evidence.clone())
            .unwrap_or_default()
    }
}

/// Extract the first fenced JSON block of a markdown document as a record.
pub fn parse_evidence_markdown(content: &str, origin: &Path) -> Result<EvidenceRecord> {
    let block = JSON_BLOCK
        .captures(content)
        .and_then(|c| c.get(1))
        .ok_or_else(|| Error::parse(origin, "no fenced json block"))?;

    serde_json::from_str(block.as_str()).map_err(|e| Error::parse(origin, e.to_string()))
}

/// Load every `.md` record in `dir`, sorted by file name.
///
/// Files that fail to read or parse are skipped with a warning; a missing
/// directory yields an empty corpus.
pub fn load_evidence_records(dir: &Path) -> Vec<EvidenceRecord> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Evidence corpus unavailable at {:?}: {}", dir, e);
            return Vec::new();
        }
    };

    let mut files: Vec<PathBuf> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.extension().map(|e| e == "md").unwrap_or(false))
        .collect();
    files.sort();

    let records: Vec<EvidenceRecord> = files
        .iter()
        .filter_map(|path| {
            let parsed = std::fs::read_to_string(path)
                .map_err(|e| Error::source_read(path, e))
                .and_then(|content| parse_evidence_markdown(&content, path));
            match parsed {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!("Skipping evidence record: {}", e);
                    None
                }
            }
        })
        .collect();

    debug!("Loaded {} evidence records from {:?}", records.len(), dir);
    records
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, enablement: &str, evidence: &[&str]) -> EvidenceRecord {
        EvidenceRecord {
            object_type: "behavior".to_string(),
            id: id.to_string(),
            user_enablement: enablement.to_string(),
            end_user: None,
            observable_signals: Vec::new(),
            acceptance_criteria: Vec::new(),
            evidence: evidence.iter().map(|e| e.to_string()).collect(),
            tags: Vec::new(),
        }
    }

    #[test]
    fn test_ownership_maps_to_owner_record() {
        let records = vec![record("owner-access", "grants owner permissions", &["e1", "e2", "e3"])];
        let linker = EvidenceLinker::default();
        assert_eq!(linker.evidence_count("Workspace Ownership Assignment", &records), 3);
    }

    #[test]
    fn test_no_match_is_zero() {
        let records = vec![record("billing", "pays invoices", &["e1"])];
        let linker = EvidenceLinker::default();
        assert_eq!(linker.evidence_count("Workspace Ownership", &records), 0);
        assert_eq!(linker.evidence_count("Anything", &[]), 0);
    }

    #[test]
    fn test_first_matching_record_wins() {
        let records = vec![
            record("signals-a", "reads health signals", &["a"]),
            record("health-b", "checks health", &["b1", "b2"]),
        ];
        let linker = EvidenceLinker::default();
        // "health" matches both records; the earlier one in the corpus wins.
        assert_eq!(linker.evidence_count("Service Health", &records), 1);
    }

    #[test]
    fn test_rule_order_within_custom_linker() {
        let linker = EvidenceLinker::new(vec![EvidenceRule::new("Vault", "secret")]);
        let records = vec![record("secret-store", "stores secrets", &["x", "y"])];
        assert_eq!(linker.evidence_count("HashiCorp Vault Integration", &records), 2);
        assert_eq!(linker.rules().len(), 1);
    }

    #[test]
    fn test_evidence_ids_by_first_word() {
        let records = vec![
            record("billing", "pays invoices", &["b"]),
            record("privacy-controls", "hides private data", &["p1", "p2"]),
        ];
        let linker = EvidenceLinker::default();
        assert_eq!(linker.evidence_ids("Privacy Settings", &records), vec!["p1", "p2"]);
        assert!(linker.evidence_ids("   ", &records).is_empty());
    }

    #[test]
    fn test_parse_markdown_record() {
        let md = "# Behavior\n\nSome prose.\n\n```json\n{\"object_type\":\"behavior\",\"id\":\"b-1\",\"user_enablement\":\"Bella can connect\",\"evidence\":[\"e1\"]}\n```\n";
        let rec = parse_evidence_markdown(md, Path::new("b-1.md")).unwrap();
        assert_eq!(rec.id, "b-1");
        assert_eq!(rec.evidence.len(), 1);

        let err = parse_evidence_markdown("no block", Path::new("x.md")).unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }

    #[test]
    fn test_load_skips_bad_records() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("good.md"),
            "```json\n{\"id\":\"owner\",\"user_enablement\":\"owners\",\"evidence\":[\"a\",\"b\"]}\n```\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("bad.md"), "```json\n{broken\n```\n").unwrap();
        std::fs::write(dir.path().join("skip.txt"), "ignored").unwrap();

        let records = load_evidence_records(dir.path());
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "owner");
        assert!(load_evidence_records(Path::new("/no/such/dir")).is_empty());
    }
}
