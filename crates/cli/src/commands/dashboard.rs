//! Multi-project dashboard summary

use std::path::PathBuf;

use anyhow::{Context, Result};
use bddboard_common::dashboard::{FeatureSummary, ProjectSummary};
use bddboard_common::{generate_dashboard_data, DashboardConfig};
use clap::Args;

use crate::output::{print_info, render_document, render_list, OutputFormat, TableDisplay};

#[derive(Args, Debug)]
pub struct DashboardArgs {
    /// Root containing the project registry (defaults to the configured root)
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Also list the feature files of every project
    #[arg(long)]
    pub features: bool,
}

impl TableDisplay for ProjectSummary {
    fn headers() -> Vec<&'static str> {
        vec!["ID", "Name", "Features", "Scenarios", "Avg Lint"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.name.clone(),
            self.feature_count.to_string(),
            self.scenario_count.to_string(),
            self.avg_lint_score.to_string(),
        ]
    }
}

impl TableDisplay for FeatureSummary {
    fn headers() -> Vec<&'static str> {
        vec!["File", "Scenarios", "Lint"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.file_name.clone(),
            self.scenario_count.to_string(),
            self.lint_score.to_string(),
        ]
    }
}

pub fn execute(args: DashboardArgs, config: DashboardConfig, format: OutputFormat) -> Result<()> {
    let root = args.root.unwrap_or(config.dashboard_root);
    let data = generate_dashboard_data(&root)
        .with_context(|| format!("Failed to build dashboard for {}", root.display()))?;

    if let Some(document) = render_document(&data, format)? {
        println!("{}", document);
        return Ok(());
    }

    println!("{}", render_list(&data.projects, format)?);

    if args.features {
        for project in &data.projects {
            println!();
            println!("{}:", project.name);
            println!("{}", render_list(&project.features, format)?);
        }
    }

    print_info(&format!(
        "Last updated {}",
        data.last_updated.format("%Y-%m-%d %H:%M:%S UTC")
    ));

    Ok(())
}
