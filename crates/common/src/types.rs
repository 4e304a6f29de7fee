//! Core types for BDD Board
//!
//! The Feature → Scenario → Step tree produced by the Gherkin parser and
//! annotated by the result reconciler.

use serde::{Deserialize, Serialize};

/// Execution status of a step, scenario or feature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Passed,
    Failed,
    Skipped,
    Pending,
    /// Also the fallback for any status string a test runner invents
    /// (`untested`, `executing`, ...).
    #[serde(other)]
    Undefined,
}

impl Default for Status {
    fn default() -> Self {
        Self::Undefined
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::Passed => write!(f, "passed"),
            Status::Failed => write!(f, "failed"),
            Status::Undefined => write!(f, "undefined"),
            Status::Skipped => write!(f, "skipped"),
            Status::Pending => write!(f, "pending"),
        }
    }
}

impl Status {
    /// Statuses in rollup precedence order; the first one present among the
    /// children decides the parent. `Passed` is the result only when none of
    /// these appear.
    pub const PRECEDENCE: [Status; 4] = [
        Status::Failed,
        Status::Undefined,
        Status::Pending,
        Status::Skipped,
    ];

    /// Roll child statuses up into a parent status.
    ///
    /// An empty set of children rolls up to `Passed`.
    pub fn rollup<I>(children: I) -> Status
    where
        I: IntoIterator<Item = Status>,
    {
        let mut seen = [false; 4];
        for status in children {
            if let Some(rank) = Self::PRECEDENCE.iter().position(|s| *s == status) {
                seen[rank] = true;
            }
        }

        Self::PRECEDENCE
            .iter()
            .zip(seen)
            .find(|(_, present)| *present)
            .map(|(status, _)| *status)
            .unwrap_or(Status::Passed)
    }
}

/// Gherkin step keyword
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StepKeyword {
    Given,
    When,
    Then,
    And,
    But,
}

impl StepKeyword {
    pub const ALL: [StepKeyword; 5] = [
        StepKeyword::Given,
        StepKeyword::When,
        StepKeyword::Then,
        StepKeyword::And,
        StepKeyword::But,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StepKeyword::Given => "Given",
            StepKeyword::When => "When",
            StepKeyword::Then => "Then",
            StepKeyword::And => "And",
            StepKeyword::But => "But",
        }
    }

    /// Case-sensitive lookup of a keyword as written in a feature file or
    /// results document (surrounding whitespace ignored).
    pub fn from_keyword(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        Self::ALL.iter().copied().find(|k| k.as_str() == raw)
    }
}

impl std::fmt::Display for StepKeyword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single Given/When/Then/And/But clause
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub id: String,
    pub keyword: StepKeyword,
    /// Step text without the keyword; this is what results are matched on
    pub text: String,
    /// Full trimmed source line including the keyword, for display
    pub line: String,
    pub status: Status,
    /// Duration in seconds reported by the test runner
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl Step {
    pub fn new(id: impl Into<String>, keyword: StepKeyword, text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            id: id.into(),
            keyword,
            line: format!("{} {}", keyword, text),
            text,
            status: Status::Undefined,
            duration: None,
            error_message: None,
        }
    }
}

/// One concrete example within a feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub steps: Vec<Step>,
    pub status: Status,
}

impl Scenario {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            tags: Vec::new(),
            steps: Vec::new(),
            status: Status::Undefined,
        }
    }

    /// Status derived from the current step statuses.
    pub fn rolled_up_status(&self) -> Status {
        Status::rollup(self.steps.iter().map(|s| s.status))
    }

    pub fn count_steps(&self, status: Status) -> usize {
        self.steps.iter().filter(|s| s.status == status).count()
    }
}

/// Top-level behavior specification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    /// File stem or name slug; the only join key across subsystems
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jtbd: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_state: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub scenarios: Vec<Scenario>,
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lint_score: Option<u8>,
}

impl Feature {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            jtbd: None,
            target: None,
            current_state: None,
            tags: Vec::new(),
            scenarios: Vec::new(),
            status: Status::Undefined,
            lint_score: None,
        }
    }

    /// Status derived from the current scenario statuses.
    pub fn rolled_up_status(&self) -> Status {
        Status::rollup(self.scenarios.iter().map(|s| s.status))
    }

    pub fn count_scenarios(&self, status: Status) -> usize {
        self.scenarios.iter().filter(|s| s.status == status).count()
    }

    pub fn step_count(&self) -> usize {
        self.scenarios.iter().map(|s| s.steps.len()).sum()
    }
}
