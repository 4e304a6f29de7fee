//! Gherkin Feature Parser
//!
//! Line-oriented parser turning `.feature` text into a status-less
//! Feature → Scenario → Step tree:
//! - `Feature:` header and free-text description
//! - `Scenario:` / `Scenario Outline:` blocks with positional ids
//! - `Given`/`When`/`Then`/`And`/`But` steps
//! - `@tag` lines and `# jtbd:` / `# target:` / `# current:` metadata comments

use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::quality::QualityReport;
use crate::types::{Feature, Scenario, Step, StepKeyword};

static CURRENT_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^current(\s+pain)?:\s*").expect("valid current-state regex"));

/// Derive a feature id from a display name.
///
/// Lower-cases the name and collapses every run of non-alphanumeric
/// characters into a single `_`, dropping leading and trailing separators.
/// Both the feature-file and the results-document entry points use this, so
/// `"Workspace Ownership"` is `workspace_ownership` either way.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_separator = false;

    for c in name.chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() {
            if pending_separator && !slug.is_empty() {
                slug.push('_');
            }
            pending_separator = false;
            slug.push(c);
        } else {
            pending_separator = true;
        }
    }

    slug
}

/// Split a step line into keyword and remaining text.
///
/// Keywords are case-sensitive and must be followed by a space.
pub fn split_step_line(line: &str) -> Option<(StepKeyword, &str)> {
    StepKeyword::ALL.iter().find_map(|keyword| {
        line.strip_prefix(keyword.as_str())
            .and_then(|rest| rest.strip_prefix(' '))
            .map(|rest| (*keyword, rest.trim()))
    })
}

fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let n = prefix.len();
    if s.len() >= n && s.is_char_boundary(n) && s[..n].eq_ignore_ascii_case(prefix) {
        Some(&s[n..])
    } else {
        None
    }
}

fn strip_quotes(s: &str) -> &str {
    let is_quote = |c: char| c == '"' || c == '\'';
    let s = s.strip_prefix(is_quote).unwrap_or(s);
    s.strip_suffix(is_quote).unwrap_or(s)
}

fn scenario_header(line: &str) -> Option<&str> {
    line.strip_prefix("Scenario Outline:")
        .or_else(|| line.strip_prefix("Scenario:"))
        .map(str::trim)
}

#[derive(Default)]
struct Metadata {
    jtbd: Option<String>,
    target: Option<String>,
    current_state: Option<String>,
}

impl Metadata {
    /// Absorb a comment body (text after `#`). Later comments win.
    fn absorb(&mut self, comment: &str) {
        let body = comment.trim();

        if let Some(rest) = strip_prefix_ignore_case(body, "jtbd:") {
            self.jtbd = Some(strip_quotes(rest.trim()).to_string());
        } else if let Some(rest) = strip_prefix_ignore_case(body, "target:") {
            self.target = Some(rest.trim().to_string());
        } else if let Some(m) = CURRENT_PREFIX.find(body) {
            self.current_state = Some(body[m.end()..].trim().to_string());
        }
    }
}

/// Parse feature-file text into a Feature tree with every status `undefined`.
///
/// `id` becomes the feature id. Fails only when the text has no
/// `Feature:` header.
pub fn parse_feature_source(source: &str, id: &str) -> Result<Feature> {
    let mut feature: Option<Feature> = None;
    let mut metadata = Metadata::default();
    let mut description: Vec<&str> = Vec::new();
    let mut in_description = false;
    let mut pending_tags: Vec<String> = Vec::new();
    let mut scenarios: Vec<Scenario> = Vec::new();
    let mut current: Option<Scenario> = None;

    for raw in source.lines() {
        let line = raw.trim();

        if line.is_empty() {
            continue;
        }

        if let Some(comment) = line.strip_prefix('#') {
            metadata.absorb(comment);
            continue;
        }

        if line.starts_with('@') {
            pending_tags.extend(
                line.split_whitespace()
                    .filter(|t| t.starts_with('@'))
                    .map(str::to_string),
            );
            continue;
        }

        if let Some(name) = line.strip_prefix("Feature:") {
            if feature.is_none() {
                let mut f = Feature::new(id, name.trim());
                f.tags = std::mem::take(&mut pending_tags);
                feature = Some(f);
                in_description = true;
            }
            continue;
        }

        if let Some(name) = scenario_header(line) {
            scenarios.extend(current.take());
            let mut scenario = Scenario::new(format!("S{}", scenarios.len() + 1), name);
            scenario.tags = std::mem::take(&mut pending_tags);
            current = Some(scenario);
            in_description = false;
            continue;
        }

        // Background steps are shared setup, not part of any scenario.
        if line.starts_with("Background:") {
            scenarios.extend(current.take());
            in_description = false;
            continue;
        }

        if let Some((keyword, text)) = split_step_line(line) {
            if let Some(scenario) = current.as_mut() {
                let mut step = Step::new(
                    format!("{}-step-{}", scenario.id, scenario.steps.len() + 1),
                    keyword,
                    text,
                );
                step.line = line.to_string();
                scenario.steps.push(step);
            }
            continue;
        }

        if in_description && feature.is_some() {
            description.push(line);
        }
    }

    scenarios.extend(current.take());

    let mut feature = feature.ok_or_else(|| Error::parse(id, "missing `Feature:` header"))?;
    if !description.is_empty() {
        feature.description = Some(description.join(" "));
    }
    feature.jtbd = metadata.jtbd;
    feature.target = metadata.target;
    feature.current_state = metadata.current_state;
    feature.scenarios = scenarios;

    Ok(feature)
}

/// Read and parse one `.feature` file, scoring its text.
///
/// The feature id is the file name without extension.
pub fn load_feature_file(path: &Path) -> Result<Feature> {
    let source = std::fs::read_to_string(path).map_err(|e| Error::source_read(path, e))?;
    let id = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();

    let mut feature = parse_feature_source(&source, &id).map_err(|e| match e {
        Error::Parse { reason, .. } => Error::parse(path, reason),
        other => other,
    })?;
    feature.lint_score = Some(QualityReport::evaluate(&source).score);

    Ok(feature)
}

/// Parse one `.feature` file, logging and returning `None` on failure.
pub fn parse_feature_file(path: &Path) -> Option<Feature> {
    match load_feature_file(path) {
        Ok(feature) => {
            debug!(
                "Parsed feature {} ({} scenarios) from {:?}",
                feature.id,
                feature.scenarios.len(),
                path
            );
            Some(feature)
        }
        Err(e) => {
            warn!("Skipping feature file: {}", e);
            None
        }
    }
}

/// List the `.feature` files directly inside `dir`, sorted by path.
pub fn feature_files_in(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir).map_err(|e| Error::source_read(dir, e))?;

    let mut files: Vec<PathBuf> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && path.extension().map(|e| e == "feature").unwrap_or(false))
        .collect();
    files.sort();

    Ok(files)
}

/// Parse every `.feature` file in a directory.
///
/// Unreadable or malformed files are skipped; an unreadable directory
/// yields no features.
pub fn parse_feature_directory(dir: &Path) -> Vec<Feature> {
    match feature_files_in(dir) {
        Ok(files) => files.iter().filter_map(|path| parse_feature_file(path)).collect(),
        Err(e) => {
            warn!("Cannot scan feature directory: {}", e);
            Vec::new()
        }
    }
}
