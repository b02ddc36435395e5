//! CSV daily report writer.

use std::fs;
use std::path::Path;

use crate::domain::error::ScreenerError;
use crate::domain::report_row::COLUMNS;
use crate::ports::report_port::{DailyReport, ReportPort};

pub struct CsvReportAdapter;

impl CsvReportAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CsvReportAdapter {
    fn default() -> Self {
        Self::new()
    }
}

fn report_error(path: &Path, reason: impl ToString) -> ScreenerError {
    ScreenerError::Report {
        path: path.display().to_string(),
        reason: reason.to_string(),
    }
}

impl ReportPort for CsvReportAdapter {
    fn write(&self, report: &DailyReport, output_path: &Path) -> Result<(), ScreenerError> {
        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent)?;
        }

        // No symbols at all: an empty file, not even a header.
        if report.input_symbols == 0 {
            fs::write(output_path, "")?;
            return Ok(());
        }

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(output_path)?;
        writer.write_record(COLUMNS)?;
        for row in &report.rows {
            writer.serialize(row)?;
        }
        writer.flush().map_err(|e| report_error(output_path, e))?;
        Ok(())
    }

    fn extension(&self) -> &'static str {
        "csv"
    }
}
