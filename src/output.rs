use std::io::{self, Write};

use serde::Serialize;
use tracing::info;

use crate::app::{ExportResult, ProgressEvent, ProgressSink, ReportResult};
use crate::table::Table;

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Interactive,
    NonInteractive,
}

pub struct JsonOutput;

#[derive(Serialize)]
pub struct ReportDocument<'a> {
    #[serde(flatten)]
    pub report: &'a ReportResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub export: Option<&'a ExportResult>,
}

impl JsonOutput {
    pub fn print_report(result: &ReportResult, export: Option<&ExportResult>) -> io::Result<()> {
        Self::print_json(&ReportDocument {
            report: result,
            export,
        })
    }

    pub fn print_table(table: &Table) -> io::Result<()> {
        Self::print_json(table)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl ProgressSink for JsonOutput {
    fn event(&self, _event: ProgressEvent) {}
}

pub struct TextOutput;

impl TextOutput {
    pub fn print_report(result: &ReportResult) -> io::Result<()> {
        let mut stdout = io::stdout().lock();
        writeln!(stdout, "Scan overview ({})", result.generated_at)?;
        for section in &result.sections {
            let marker = if section.synthetic { " [synthetic]" } else { "" };
            writeln!(
                stdout,
                "  {}{marker}: {} rows x {} columns",
                section.title,
                section.table.len(),
                section.table.columns().len()
            )?;
        }
        Ok(())
    }

    pub fn print_export(result: &ExportResult) -> io::Result<()> {
        let mut stdout = io::stdout().lock();
        for file in &result.files {
            writeln!(stdout, "  wrote {} ({} rows)", file.path, file.rows)?;
        }
        Ok(())
    }
}

impl ProgressSink for TextOutput {
    fn event(&self, event: ProgressEvent) {
        match event.elapsed {
            Some(elapsed) => info!(elapsed_ms = elapsed.as_millis() as u64, "{}", event.message),
            None => info!("{}", event.message),
        }
    }
}
