//! Execution results document
//!
//! Typed view of the JSON array a test runner (behave's JSON formatter)
//! writes: features → elements → steps → result. Optional fields get their
//! defaults here so nothing downstream re-checks them.

use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::gherkin::slugify;
use crate::types::{Feature, Scenario, Status, Step, StepKeyword};

/// Per-feature record produced by the test runner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionFeature {
    pub name: String,
    #[serde(default)]
    pub elements: Vec<ExecutionElement>,
    #[serde(default)]
    pub status: Option<Status>,
    #[serde(default)]
    pub location: Option<String>,
}

/// A scenario (or background) entry of a feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionElement {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default = "default_element_type")]
    pub kind: String,
    #[serde(default)]
    pub steps: Vec<ExecutionStep>,
    #[serde(default)]
    pub status: Option<Status>,
}

fn default_element_type() -> String {
    "scenario".to_string()
}

impl ExecutionElement {
    pub fn is_scenario(&self) -> bool {
        self.kind == "scenario"
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionStep {
    pub keyword: String,
    pub name: String,
    #[serde(default)]
    pub result: Option<StepResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    #[serde(default)]
    pub status: Option<Status>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default, deserialize_with = "message_lines")]
    pub error_message: Option<String>,
}

/// behave writes `error_message` either as a string or as a list of lines.
fn message_lines<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Message {
        One(String),
        Lines(Vec<String>),
    }

    Ok(Option::<Message>::deserialize(deserializer)?.map(|m| match m {
        Message::One(s) => s,
        Message::Lines(lines) => lines.join("\n"),
    }))
}

impl ExecutionFeature {
    pub fn scenarios(&self) -> impl Iterator<Item = &ExecutionElement> {
        self.elements.iter().filter(|e| e.is_scenario())
    }

    /// Status-less Feature tree mirroring this record.
    ///
    /// The id is the slug of the name; scenario and step ids are positional.
    /// Steps whose keyword is not Given/When/Then/And/But are dropped.
    pub fn skeleton(&self) -> Feature {
        let mut feature = Feature::new(slugify(&self.name), self.name.clone());

        for element in self.scenarios() {
            let mut scenario = Scenario::new(
                format!("S{}", feature.scenarios.len() + 1),
                element.name.clone(),
            );

            for step in &element.steps {
                match StepKeyword::from_keyword(&step.keyword) {
                    Some(keyword) => {
                        let id = format!("{}-step-{}", scenario.id, scenario.steps.len() + 1);
                        scenario.steps.push(Step::new(id, keyword, step.name.clone()));
                    }
                    None => debug!(
                        "Ignoring step with keyword {:?} in {:?}",
                        step.keyword, self.name
                    ),
                }
            }

            feature.scenarios.push(scenario);
        }

        feature
    }
}

/// Parse a results document from JSON text.
pub fn parse_execution_results(json: &str, origin: &Path) -> Result<Vec<ExecutionFeature>> {
    serde_json::from_str(json).map_err(|e| Error::parse(origin, e.to_string()))
}

/// Read and parse a results document.
pub fn load_execution_results(path: &Path) -> Result<Vec<ExecutionFeature>> {
    let json = std::fs::read_to_string(path).map_err(|e| Error::source_read(path, e))?;
    parse_execution_results(&json, path)
}
