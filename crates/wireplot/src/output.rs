use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// A command result: serialized whole for JSON, shown as field/value rows
/// otherwise.
pub struct Report<'a, T: Serialize> {
    pub value: &'a T,
    pub rows: Vec<(&'static str, String)>,
}

impl<'a, T: Serialize> Report<'a, T> {
    pub fn new(value: &'a T) -> Self {
        Self {
            value,
            rows: Vec::new(),
        }
    }

    pub fn row(mut self, field: &'static str, value: impl ToString) -> Self {
        self.rows.push((field, value.to_string()));
        self
    }

    pub fn print(&self, format: OutputFormat) {
        println!("{}", self.render(format));
    }

    pub fn render(&self, format: OutputFormat) -> String {
        match format {
            OutputFormat::Json => {
                serde_json::to_string(self.value).unwrap_or_else(|_| "{}".to_string())
            }
            OutputFormat::Table => {
                let mut table = Table::new();
                table
                    .load_preset(UTF8_FULL)
                    .set_content_arrangement(ContentArrangement::Dynamic)
                    .set_header(vec!["FIELD", "VALUE"]);
                for (field, value) in &self.rows {
                    table.add_row(vec![field.to_string(), value.clone()]);
                }
                table.to_string()
            }
            OutputFormat::Pretty => self
                .rows
                .iter()
                .map(|(field, value)| format!("{field}={value}"))
                .collect::<Vec<_>>()
                .join(" "),
        }
    }
}

/// `x, y` for table and pretty rows.
pub fn coords(x: f64, y: f64) -> String {
    format!("{x}, {y}")
}
