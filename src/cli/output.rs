//! Rendering of command results in the selected output format

use console::style;
use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tabled::{builder::Builder, settings::Style};

use crate::cli::OutputFormat;

/// Rows of text cells under a header
#[derive(Debug, Clone, Default)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new<I, S>(headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push_row<I, S>(&mut self, row: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rows.push(row.into_iter().map(Into::into).collect());
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Render as text for the tabular formats
    pub fn render(&self, format: OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Csv => self.to_delimited(b','),
            OutputFormat::Tsv => self.to_delimited(b'\t'),
            OutputFormat::Md => Ok(self.to_tabled(true)),
            _ => Ok(self.to_tabled(false)),
        }
    }

    fn to_tabled(&self, markdown: bool) -> String {
        let mut builder = Builder::default();
        builder.push_record(self.headers.iter().cloned());
        for row in &self.rows {
            builder.push_record(row.iter().cloned());
        }
        let mut table = builder.build();
        if markdown {
            table.with(Style::markdown());
        } else {
            table.with(Style::rounded());
        }
        let mut rendered = table.to_string();
        rendered.push('\n');
        rendered
    }

    fn to_delimited(&self, delimiter: u8) -> Result<String> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(delimiter)
            .from_writer(Vec::new());
        writer.write_record(&self.headers).into_diagnostic()?;
        for row in &self.rows {
            writer.write_record(row).into_diagnostic()?;
        }
        let bytes = writer.into_inner().map_err(|e| miette::miette!("{}", e))?;
        String::from_utf8(bytes).into_diagnostic()
    }
}

/// Serialize a structured result as JSON or YAML
pub fn render_structured<T: Serialize>(value: &T, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => {
            let mut json = serde_json::to_string_pretty(value).into_diagnostic()?;
            json.push('\n');
            Ok(json)
        }
        _ => serde_yml::to_string(value).into_diagnostic(),
    }
}

/// Write to a file when a path is given, stdout otherwise
pub fn write_output(content: &str, output_path: Option<&Path>, quiet: bool) -> Result<()> {
    match output_path {
        Some(path) => {
            let file = File::create(path).into_diagnostic()?;
            let mut writer = BufWriter::new(file);
            writer.write_all(content.as_bytes()).into_diagnostic()?;
            writer.flush().into_diagnostic()?;
            if !quiet {
                println!("{} Report written to {}", style("✓").green(), style(path.display()).cyan());
            }
        }
        None => print!("{}", content),
    }
    Ok(())
}

/// Fixed-precision number for table cells
pub fn number(value: f64, decimals: usize) -> String {
    format!("{:.*}", decimals, value)
}
