//! Feature text quality scoring

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use bddboard_common::gherkin::feature_files_in;
use bddboard_common::{DashboardConfig, QualityReport};
use clap::Args;
use serde::Serialize;

use crate::output::{print_list, print_success, print_warning, OutputFormat, TableDisplay};

#[derive(Args, Debug)]
pub struct LintArgs {
    /// Feature files or directories to score (defaults to the features directory)
    pub paths: Vec<PathBuf>,

    /// Fail when any file scores below this value
    #[arg(long)]
    pub min_score: Option<u8>,
}

#[derive(Debug, Serialize)]
pub struct LintRow {
    pub file: String,
    #[serde(flatten)]
    pub report: QualityReport,
}

impl TableDisplay for LintRow {
    fn headers() -> Vec<&'static str> {
        vec!["File", "Score", "Functional", "Reliable", "Usable", "Delightful"]
    }

    fn row(&self) -> Vec<String> {
        let mark = |on: bool| if on { "yes" } else { "no" }.to_string();
        let layers = &self.report.layers;
        vec![
            self.file.clone(),
            self.report.score.to_string(),
            mark(layers.functional),
            mark(layers.reliable),
            mark(layers.usable),
            mark(layers.delightful),
        ]
    }
}

/// Score every readable file; unreadable files and directories are
/// reported and left out.
pub fn lint_files(paths: &[PathBuf]) -> (Vec<LintRow>, Vec<PathBuf>) {
    let mut files = Vec::new();
    let mut unreadable = Vec::new();

    for path in paths {
        if !path.is_dir() {
            files.push(path.clone());
            continue;
        }
        match feature_files_in(path) {
            Ok(found) => files.extend(found),
            Err(e) => {
                print_warning(&e.to_string());
                unreadable.push(path.clone());
            }
        }
    }

    let mut rows = Vec::new();
    for path in files {
        match std::fs::read_to_string(&path) {
            Ok(source) => rows.push(LintRow {
                file: display_path(&path),
                report: QualityReport::evaluate(&source),
            }),
            Err(e) => {
                print_warning(&format!("Cannot read {}: {}", path.display(), e));
                unreadable.push(path);
            }
        }
    }

    (rows, unreadable)
}

fn display_path(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

pub fn execute(args: LintArgs, config: DashboardConfig, format: OutputFormat) -> Result<()> {
    let paths = if args.paths.is_empty() {
        vec![config.features_dir]
    } else {
        args.paths
    };

    let (rows, unreadable) = lint_files(&paths);
    print_list(&rows, format)?;

    if !unreadable.is_empty() {
        bail!("{} file(s) could not be read", unreadable.len());
    }

    if let Some(min) = args.min_score {
        let below = rows.iter().filter(|row| row.report.score < min).count();
        if below > 0 {
            bail!("{} file(s) scored below {}", below, min);
        }
    }

    if matches!(format, OutputFormat::Table | OutputFormat::Plain) {
        print_success(&format!("Scored {} feature file(s)", rows.len()));
    }

    Ok(())
}
