//! Quality Scorer
//!
//! Heuristic lint score over feature text. Four independent layers, each
//! worth 25 points:
//! - functional: a `Then` step exists
//! - reliable: measurable criteria (time/size bounds, percentages, counts)
//! - usable: a named persona instead of the generic "user"
//! - delightful: enablement language ("can ...", "so that", "enables")
//!
//! Layers are evaluated independently; a score of 25 says one layer holds,
//! not which one.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Points contributed by each satisfied layer
pub const LAYER_POINTS: u8 = 25;

/// Persona names recognized by the usable layer (case-sensitive)
pub const PERSONA_NAMES: [&str; 5] = ["Bella", "Maya", "Alice", "Joel", "Bob"];

static THEN_STEP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*Then\s+").expect("valid Then regex"));

static MEASURABLE: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)<\d+\s*(second|minute|hour|ms|MB|GB)",
        r">\d+%",
        r"(?i)\d+\s*(users|scenarios|features)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid measurable regex"))
    .collect()
});

static ENABLEMENT: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)\bcan\s+\w+",
        r"(?i)\bso that\b",
        r"(?i)\benables\b",
        r"(?i)\bfeels\s+confident",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid enablement regex"))
    .collect()
});

/// The four quality layers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityLayers {
    pub functional: bool,
    pub reliable: bool,
    pub usable: bool,
    pub delightful: bool,
}

impl QualityLayers {
    pub fn evaluate(source: &str) -> Self {
        Self {
            functional: THEN_STEP.is_match(source),
            reliable: MEASURABLE.iter().any(|re| re.is_match(source)),
            usable: PERSONA_NAMES.iter().any(|name| source.contains(name)),
            delightful: ENABLEMENT.iter().any(|re| re.is_match(source)),
        }
    }

    pub fn satisfied(&self) -> u8 {
        [self.functional, self.reliable, self.usable, self.delightful]
            .iter()
            .filter(|layer| **layer)
            .count() as u8
    }

    /// Score in {0, 25, 50, 75, 100}
    pub fn score(&self) -> u8 {
        self.satisfied() * LAYER_POINTS
    }
}

/// Lint result for one piece of feature text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityReport {
    pub score: u8,
    pub layers: QualityLayers,
}

impl QualityReport {
    pub fn evaluate(source: &str) -> Self {
        let layers = QualityLayers::evaluate(source);
        Self {
            score: layers.score(),
            layers,
        }
    }
}
