//! Output formatting for CLI commands.
//!
//! This module renders result envelopes either as pretty JSON or as
//! colored text with tables.

use colored::Colorize;
use serde_json::{Map, Value};
use std::fmt::Write;
use tabled::{Table, Tabled};

use crate::planner::Action;
use crate::reconciler::{DiffReport, ErrorReport, ResultEnvelope};

use super::commands::OutputFormat;

/// Longest cell rendered before truncation.
const MAX_CELL_LEN: usize = 60;

/// Output formatter for CLI.
#[derive(Debug)]
pub struct OutputFormatter {
    /// Output format.
    format: OutputFormat,
}

/// Attribute row for table display.
#[derive(Tabled)]
struct FieldRow {
    #[tabled(rename = "Field")]
    field: String,
    #[tabled(rename = "Value")]
    value: String,
}

/// Listed instance row for table display.
#[derive(Tabled)]
struct ItemRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "ID")]
    id: String,
}

/// Diff row for table display.
#[derive(Tabled)]
struct DiffRow {
    #[tabled(rename = "Field")]
    field: String,
    #[tabled(rename = "Before")]
    before: String,
    #[tabled(rename = "After")]
    after: String,
}

impl OutputFormatter {
    /// Creates a new output formatter.
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats a result envelope for display.
    #[must_use]
    pub fn format_envelope(&self, envelope: &ResultEnvelope) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(envelope).unwrap_or_default(),
            OutputFormat::Text => Self::format_envelope_text(envelope),
        }
    }

    fn format_envelope_text(envelope: &ResultEnvelope) -> String {
        let status = if envelope.failed {
            format!("{} FAILED", "✗".red())
        } else if envelope.changed {
            format!("{} CHANGED", "~".yellow())
        } else {
            format!("{} OK", "✓".green())
        };

        let mut output = format!("{status}: {}\n", envelope.msg);

        if let Some(action) = envelope.action {
            let _ = writeln!(output, "   Action: {}", Self::format_action(action));
        }

        if let Some(error) = &envelope.error {
            let _ = writeln!(output, "   {}", Self::format_error(error));
        }

        if let (Some(key), Some(resource)) = (envelope.resource_key, &envelope.resource) {
            let _ = write!(output, "\n{key}:\n");
            match resource {
                Value::Object(map) => {
                    let _ = writeln!(output, "{}", Self::format_fields(map));
                }
                Value::Array(items) if items.is_empty() => {
                    output.push_str("   (none)\n");
                }
                Value::Array(items) => {
                    let _ = writeln!(output, "{}", Self::format_items(items));
                }
                other => {
                    let _ = writeln!(output, "   {}", Self::display_value(other));
                }
            }
        }

        if let Some(diff) = &envelope.diff {
            let _ = write!(output, "\nDiff:\n{}\n", Self::format_diff(diff));
        }

        output
    }

    fn format_fields(map: &Map<String, Value>) -> String {
        let rows: Vec<FieldRow> = map
            .iter()
            .map(|(field, value)| FieldRow {
                field: field.clone(),
                value: Self::truncate(&Self::display_value(value), MAX_CELL_LEN),
            })
            .collect();
        Table::new(rows).to_string()
    }

    fn format_items(items: &[Value]) -> String {
        let rows: Vec<ItemRow> = items
            .iter()
            .enumerate()
            .map(|(i, item)| ItemRow {
                index: i + 1,
                name: Self::first_field(item, &["name", "zone"]),
                status: Self::first_field(item, &["status", "value"]),
                id: Self::first_field(item, &["id", "zone_id"]),
            })
            .collect();
        Table::new(rows).to_string()
    }

    fn format_diff(diff: &DiffReport) -> String {
        let rows: Vec<DiffRow> = diff
            .after
            .iter()
            .map(|(field, after)| DiffRow {
                field: field.clone(),
                before: diff
                    .before
                    .get(field)
                    .map_or_else(|| String::from("-"), Self::display_value)
                    .red()
                    .to_string(),
                after: Self::display_value(after).green().to_string(),
            })
            .collect();
        Table::new(rows).to_string()
    }

    fn format_error(error: &ErrorReport) -> String {
        let mut detail = error.kind.as_str().to_string();
        if let Some(status) = error.status {
            let _ = write!(detail, ", HTTP {status}");
        }
        if let Some(code) = error.code {
            let _ = write!(detail, ", code {code}");
        }
        format!("Error ({detail}): {}", error.message)
    }

    /// Formats an action with color.
    fn format_action(action: Action) -> String {
        match action {
            Action::Create => "+create".green().to_string(),
            Action::Update => "~update".yellow().to_string(),
            Action::Replace => "-/+replace".yellow().to_string(),
            Action::Delete => "-delete".red().to_string(),
            Action::NoOp => "noop".dimmed().to_string(),
        }
    }

    fn first_field(item: &Value, keys: &[&str]) -> String {
        keys.iter()
            .find_map(|key| item.get(key))
            .map_or_else(|| String::from("-"), Self::display_value)
    }

    fn display_value(value: &Value) -> String {
        match value {
            Value::Null => String::from("-"),
            Value::String(s) => s.clone(),
            Value::Array(items) => format!("[{} items]", items.len()),
            other => other.to_string(),
        }
    }

    /// Truncates a string to a maximum number of characters.
    fn truncate(s: &str, max_len: usize) -> String {
        if s.chars().count() <= max_len {
            s.to_string()
        } else {
            let head: String = s.chars().take(max_len - 3).collect();
            format!("{head}...")
        }
    }
}
