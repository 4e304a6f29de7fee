//! Result Reconciler
//!
//! Assigns execution status to a parsed Feature tree from a results
//! document, then rolls statuses up bottom-up.
//!
//! Matching rules, applied in order at each level:
//! 1. feature ↔ result feature: exact, case-sensitive name equality
//! 2. scenario ↔ scenario element: exact name equality within the matched feature
//! 3. step ↔ result step: trimmed keyword equality and exact text equality
//!
//! When a name occurs more than once, the n-th occurrence on the parsed side
//! pairs with the n-th occurrence on the results side, falling back to the
//! first. Anything unmatched passes through unchanged.
//!
//! Reconciliation is pure: the input tree is never mutated and re-running it
//! on its own output with the same document gives the same tree.

use std::collections::HashMap;

use tracing::debug;

use crate::results::{ExecutionElement, ExecutionFeature, ExecutionStep};
use crate::types::{Feature, Scenario, Step};

/// Pick the `occurrence`-th candidate satisfying `is_match`, or the first one.
fn aligned<'r, T>(
    candidates: impl IntoIterator<Item = &'r T>,
    occurrence: usize,
    is_match: impl Fn(&T) -> bool,
) -> Option<&'r T>
where
    T: 'r,
{
    let mut first = None;
    for (i, candidate) in candidates.into_iter().filter(|c| is_match(*c)).enumerate() {
        if i == occurrence {
            return Some(candidate);
        }
        first.get_or_insert(candidate);
    }
    first
}

/// Counts how often each key has been seen so far.
#[derive(Default)]
struct Occurrences<'k> {
    seen: HashMap<Vec<&'k str>, usize>,
}

impl<'k> Occurrences<'k> {
    fn next(&mut self, key: Vec<&'k str>) -> usize {
        let counter = self.seen.entry(key).or_insert(0);
        let occurrence = *counter;
        *counter += 1;
        occurrence
    }
}

/// Reconcile a list of features against a results document.
pub fn reconcile(features: &[Feature], results: &[ExecutionFeature]) -> Vec<Feature> {
    let mut occurrences = Occurrences::default();

    features
        .iter()
        .map(|feature| {
            let occurrence = occurrences.next(vec![feature.name.as_str()]);
            match aligned(results, occurrence, |r| r.name == feature.name) {
                Some(result) => apply_feature(feature, result),
                None => {
                    debug!("No execution result for feature {:?}", feature.name);
                    feature.clone()
                }
            }
        })
        .collect()
}

/// Reconcile a single feature; it is treated as the first of its name.
pub fn reconcile_feature(feature: &Feature, results: &[ExecutionFeature]) -> Feature {
    match results.iter().find(|r| r.name == feature.name) {
        Some(result) => apply_feature(feature, result),
        None => feature.clone(),
    }
}

/// Build features straight from a results document.
///
/// Each record becomes a skeleton tree (slug id, positional scenario ids)
/// which is then reconciled against the same document.
pub fn features_from_results(results: &[ExecutionFeature]) -> Vec<Feature> {
    let skeletons: Vec<Feature> = results.iter().map(ExecutionFeature::skeleton).collect();
    reconcile(&skeletons, results)
}

fn apply_feature(feature: &Feature, result: &ExecutionFeature) -> Feature {
    let mut occurrences = Occurrences::default();

    let scenarios: Vec<Scenario> = feature
        .scenarios
        .iter()
        .map(|scenario| {
            let occurrence = occurrences.next(vec![scenario.name.as_str()]);
            match aligned(result.scenarios(), occurrence, |e| e.name == scenario.name) {
                Some(element) => apply_scenario(scenario, element),
                None => scenario.clone(),
            }
        })
        .collect();

    let mut reconciled = Feature {
        scenarios,
        ..feature.clone()
    };
    reconciled.status = result.status.unwrap_or_else(|| reconciled.rolled_up_status());
    reconciled
}

fn apply_scenario(scenario: &Scenario, element: &ExecutionElement) -> Scenario {
    let mut occurrences = Occurrences::default();

    let steps: Vec<Step> = scenario
        .steps
        .iter()
        .map(|step| {
            let occurrence = occurrences.next(vec![step.keyword.as_str(), step.text.as_str()]);
            match aligned(&element.steps, occurrence, |r| step_matches(step, r)) {
                Some(executed) => apply_step(step, executed),
                None => step.clone(),
            }
        })
        .collect();

    let mut reconciled = Scenario {
        steps,
        ..scenario.clone()
    };
    reconciled.status = element.status.unwrap_or_else(|| reconciled.rolled_up_status());
    reconciled
}

fn step_matches(step: &Step, executed: &ExecutionStep) -> bool {
    executed.keyword.trim() == step.keyword.as_str() && executed.name == step.text
}

fn apply_step(step: &Step, executed: &ExecutionStep) -> Step {
    let mut updated = step.clone();

    if let Some(result) = &executed.result {
        if let Some(status) = result.status {
            updated.status = status;
        }
        if result.duration.is_some() {
            updated.duration = result.duration;
        }
        if result.error_message.is_some() {
            updated.error_message = result.error_message.clone();
        }
    }

    updated
}
