//! Feature progress and card tree commands

use std::path::PathBuf;

use anyhow::Result;
use bddboard_common::progress::{Card, CardStatus, CardStepStatus};
use bddboard_common::{DashboardConfig, FeatureProgress, FeatureReport};
use clap::Args;
use colored::Colorize;

use crate::output::{print_info, print_list, render_document, OutputFormat, TableDisplay};

/// Source overrides shared by `features` and `cards`
#[derive(Args, Debug, Default)]
pub struct SourceArgs {
    /// Directory of .feature files
    #[arg(long)]
    pub features_dir: Option<PathBuf>,

    /// Execution results document (behave JSON)
    #[arg(long)]
    pub results: Option<PathBuf>,

    /// Directory of markdown behavior records
    #[arg(long)]
    pub evidence_dir: Option<PathBuf>,
}

impl SourceArgs {
    pub fn apply(&self, config: &mut DashboardConfig) {
        if let Some(dir) = &self.features_dir {
            config.features_dir = dir.clone();
        }
        if let Some(path) = &self.results {
            config.results_path = path.clone();
        }
        if let Some(dir) = &self.evidence_dir {
            config.evidence_dir = dir.clone();
        }
    }
}

impl TableDisplay for FeatureProgress {
    fn headers() -> Vec<&'static str> {
        vec!["ID", "Name", "Status", "Scenarios", "Progress", "Evidence", "Lint"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.name.clone(),
            self.status.to_string(),
            format!("{}/{}", self.passed_scenarios, self.total_scenarios),
            format!("{}%", self.percentage),
            self.evidence_count.to_string(),
            self.lint_score
                .map(|s| s.to_string())
                .unwrap_or_else(|| "-".to_string()),
        ]
    }
}

pub fn execute(args: SourceArgs, mut config: DashboardConfig, format: OutputFormat) -> Result<()> {
    args.apply(&mut config);
    let report = FeatureReport::build(&config);

    if let Some(document) = render_document(&report, format)? {
        println!("{}", document);
        return Ok(());
    }

    print_list(&report.progress, format)?;

    let steps = &report.metrics.steps;
    print_info(&format!(
        "{} features, {} scenarios, {} steps ({} passed, {} failed, {} undefined) from {}",
        report.metrics.features.total,
        report.metrics.scenarios.total,
        steps.total,
        steps.passed,
        steps.failed,
        steps.undefined,
        report.data_source
    ));

    Ok(())
}

/// Indented text rendering of a card tree
pub fn render_cards(cards: &[Card]) -> String {
    let mut lines = Vec::new();

    for card in cards {
        lines.push(card_line(card, ""));
        for child in &card.children {
            lines.push(card_line(child, "  └ "));
            for step in &child.steps {
                let marker = match step.status {
                    CardStepStatus::Passing => "✓".green(),
                    CardStepStatus::Failing => "✗".red(),
                    CardStepStatus::Pending => "…".yellow(),
                    CardStepStatus::Undefined => "?".dimmed(),
                };
                lines.push(format!("      {} {}", marker, step.step));
            }
        }
    }

    lines.join("\n")
}

fn card_line(card: &Card, indent: &str) -> String {
    let label = card.status.to_string();
    let status = match card.status {
        CardStatus::Passing => label.green(),
        CardStatus::Failing => label.red(),
        CardStatus::InProgress => label.yellow(),
        CardStatus::NotStarted => label.dimmed(),
    };

    format!(
        "{}[{}] {}  {}/{} signals  {} evidence  {}%",
        indent,
        status,
        card.title,
        card.metrics.signals.completed,
        card.metrics.signals.total,
        card.metrics.evidence,
        card.metrics.percentage
    )
}

pub fn execute_cards(args: SourceArgs, mut config: DashboardConfig, format: OutputFormat) -> Result<()> {
    args.apply(&mut config);
    let report = FeatureReport::build(&config);

    match render_document(&report.cards, format)? {
        Some(document) => println!("{}", document),
        None if report.cards.is_empty() => println!("No items found."),
        None => println!("{}", render_cards(&report.cards)),
    }

    Ok(())
}
