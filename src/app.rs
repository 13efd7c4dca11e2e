use std::time::{Duration, Instant};

use camino::{Utf8Path, Utf8PathBuf};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use tracing::info;

use crate::domain::{ExportFormat, ScanType};
use crate::error::OverviewError;
use crate::export::export_table;
use crate::overview::extract_overview;
use crate::store::MetadataStore;
use crate::synthetic::SyntheticSpec;
use crate::table::Table;

#[derive(Debug, Clone, Serialize)]
pub struct ReportResult {
    pub generated_at: String,
    pub sections: Vec<ReportSection>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportSection {
    pub scan_type: ScanType,
    pub title: String,
    pub file_stem: String,
    pub synthetic: bool,
    pub table: Table,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportResult {
    pub format: ExportFormat,
    pub files: Vec<ExportedFile>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportedFile {
    pub scan_type: ScanType,
    pub path: String,
    pub rows: usize,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

pub struct App<S: MetadataStore> {
    store: S,
    synthetic: SyntheticSpec,
}

impl<S: MetadataStore> App<S> {
    pub fn new(store: S, synthetic: SyntheticSpec) -> Self {
        Self { store, synthetic }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn report(
        &self,
        scan_types: &[ScanType],
        sink: &dyn ProgressSink,
    ) -> Result<ReportResult, OverviewError> {
        let mut sections = Vec::with_capacity(scan_types.len());
        for scan_type in scan_types {
            sections.push(self.section(*scan_type, sink)?);
        }

        Ok(ReportResult {
            generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            sections,
        })
    }

    pub fn export(
        &self,
        report: &ReportResult,
        dir: &Utf8Path,
        format: ExportFormat,
        sink: &dyn ProgressSink,
    ) -> Result<ExportResult, OverviewError> {
        let mut files = Vec::with_capacity(report.sections.len());
        for section in &report.sections {
            sink.event(ProgressEvent {
                message: format!("phase=Export; writing {}.{}", section.file_stem, format),
                elapsed: None,
            });
            let start = Instant::now();
            let path: Utf8PathBuf = export_table(&section.table, dir, &section.file_stem, format)?;
            sink.event(ProgressEvent {
                message: format!("phase=Export; wrote {path}"),
                elapsed: Some(start.elapsed()),
            });
            files.push(ExportedFile {
                scan_type: section.scan_type,
                path: path.to_string(),
                rows: section.table.len(),
            });
        }

        info!(files = files.len(), dir = %dir, "export finished");
        Ok(ExportResult { format, files })
    }

    fn section(
        &self,
        scan_type: ScanType,
        sink: &dyn ProgressSink,
    ) -> Result<ReportSection, OverviewError> {
        let start = Instant::now();
        let (table, synthetic) = match scan_type.record_type() {
            Some(record_type) => {
                sink.event(ProgressEvent {
                    message: format!("phase=Query; FIND RECORD {record_type}"),
                    elapsed: None,
                });
                let rows = extract_overview(&self.store, &record_type)?;
                (Table::from_overview(&rows), false)
            }
            None => {
                sink.event(ProgressEvent {
                    message: format!(
                        "phase=Generate; {} rows x {} cols for {scan_type}",
                        self.synthetic.rows, self.synthetic.cols
                    ),
                    elapsed: None,
                });
                (self.synthetic.generate(), true)
            }
        };

        sink.event(ProgressEvent {
            message: format!("phase=Done; {} ({} rows)", scan_type.title(), table.len()),
            elapsed: Some(start.elapsed()),
        });

        Ok(ReportSection {
            scan_type,
            title: scan_type.title().to_string(),
            file_stem: scan_type.file_stem().to_string(),
            synthetic,
            table,
        })
    }
}
