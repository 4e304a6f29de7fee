//! Output formatting for CLI

use clap::ValueEnum;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

/// Output format
#[derive(Debug, Clone, Copy, ValueEnum, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable table format
    #[default]
    Table,
    /// JSON format
    Json,
    /// YAML format
    Yaml,
    /// Plain text format
    Plain,
}

/// Trait for items that can be displayed in a table
pub trait TableDisplay {
    fn headers() -> Vec<&'static str>;
    fn row(&self) -> Vec<String>;
}

fn table<T: TableDisplay>(rows: impl IntoIterator<Item = Vec<String>>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(T::headers());
    for row in rows {
        table.add_row(row);
    }

    table
}

/// Render a value as JSON or YAML; `None` for the tabular formats.
pub fn render_document<T: Serialize + ?Sized>(
    value: &T,
    format: OutputFormat,
) -> anyhow::Result<Option<String>> {
    Ok(match format {
        OutputFormat::Json => Some(serde_json::to_string_pretty(value)?),
        OutputFormat::Yaml => Some(serde_yaml::to_string(value)?),
        OutputFormat::Table | OutputFormat::Plain => None,
    })
}

/// Render a list of items in the given format.
pub fn render_list<T: Serialize + TableDisplay>(
    items: &[T],
    format: OutputFormat,
) -> anyhow::Result<String> {
    if let Some(document) = render_document(items, format)? {
        return Ok(document);
    }
    if items.is_empty() {
        return Ok("No items found.".to_string());
    }

    Ok(match format {
        OutputFormat::Plain => items
            .iter()
            .map(|item| {
                T::headers()
                    .iter()
                    .zip(item.row())
                    .map(|(header, value)| format!("{}: {}", header, value))
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .collect::<Vec<_>>()
            .join("\n---\n"),
        _ => table::<T>(items.iter().map(T::row)).to_string(),
    })
}

/// Print a list of items
pub fn print_list<T: Serialize + TableDisplay>(
    items: &[T],
    format: OutputFormat,
) -> anyhow::Result<()> {
    println!("{}", render_list(items, format)?);
    Ok(())
}

/// Print success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green(), message);
}

/// Print warning message
pub fn print_warning(message: &str) {
    eprintln!("{} {}", "!".yellow(), message);
}

/// Print info message
pub fn print_info(message: &str) {
    println!("{} {}", "i".blue(), message);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Row {
        name: String,
        score: u8,
    }

    impl TableDisplay for Row {
        fn headers() -> Vec<&'static str> {
            vec!["Name", "Score"]
        }

        fn row(&self) -> Vec<String> {
            vec![self.name.clone(), self.score.to_string()]
        }
    }

    fn rows() -> Vec<Row> {
        vec![
            Row { name: "checkout".to_string(), score: 75 },
            Row { name: "ownership".to_string(), score: 25 },
        ]
    }

    #[test]
    fn test_plain_output() {
        let out = render_list(&rows(), OutputFormat::Plain).unwrap();
        assert_eq!(out, "Name: checkout\nScore: 75\n---\nName: ownership\nScore: 25");
    }

    #[test]
    fn test_json_and_yaml_output() {
        let json = render_list(&rows(), OutputFormat::Json).unwrap();
        assert!(json.contains("\"score\": 75"));

        let yaml = render_list(&rows(), OutputFormat::Yaml).unwrap();
        assert!(yaml.contains("name: checkout"));
    }

    #[test]
    fn test_table_output() {
        let out = render_list(&rows(), OutputFormat::Table).unwrap();
        assert!(out.contains("Score"));
        assert!(out.contains("ownership"));
        assert_eq!(render_list::<Row>(&[], OutputFormat::Table).unwrap(), "No items found.");
    }
}
