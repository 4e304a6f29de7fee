//! Timeout calculation report

use std::path::PathBuf;

use anyhow::Result;
use bddboard_common::{DashboardConfig, TimeoutManager};
use clap::Args;
use serde::Serialize;

use crate::output::{print_info, print_list, render_document, OutputFormat, TableDisplay};

#[derive(Args, Debug)]
pub struct TimeoutsArgs {
    /// Timeout strategy YAML (defaults to the configured file)
    #[arg(long)]
    pub strategy: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
pub struct TimeoutRow {
    pub name: String,
    pub milliseconds: u64,
}

impl TableDisplay for TimeoutRow {
    fn headers() -> Vec<&'static str> {
        vec!["Timeout", "Milliseconds"]
    }

    fn row(&self) -> Vec<String> {
        vec![self.name.clone(), self.milliseconds.to_string()]
    }
}

pub fn execute(args: TimeoutsArgs, config: DashboardConfig, format: OutputFormat) -> Result<()> {
    let path = args.strategy.unwrap_or(config.timeout_config);
    let manager = TimeoutManager::from_file(&path);
    let report = manager.performance_report();

    if let Some(document) = render_document(&report, format)? {
        println!("{}", document);
        return Ok(());
    }

    let rows: Vec<TimeoutRow> = report
        .calculated_timeouts
        .iter()
        .map(|(name, ms)| TimeoutRow {
            name: name.clone(),
            milliseconds: *ms,
        })
        .collect();
    print_list(&rows, format)?;

    let system = &report.system_info;
    print_info(&format!(
        "Environment {} (x{:.2}), {} CPUs{}{}",
        report.environment,
        report.scaling_factor,
        system.cpu_count,
        if system.is_slow_machine { ", slow machine" } else { "" },
        if system.is_high_load { ", high load" } else { "" },
    ));

    Ok(())
}
