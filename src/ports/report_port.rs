//! Report generation port trait.

use crate::domain::error::ScreenerError;
use crate::domain::report_row::ScreenRow;
use std::path::Path;

/// Everything a daily report needs: the sorted rows plus run context.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyReport {
    /// JST run date as `YYYYMMDD`.
    pub date: String,
    pub input_symbols: usize,
    pub rows: Vec<ScreenRow>,
    /// `"<symbol>: <reason>"` entries for symbols that could not be processed.
    pub errors: Vec<String>,
    /// Provenance line naming the data sources.
    pub provenance: String,
}

/// Port for writing a daily screening report.
pub trait ReportPort {
    fn write(&self, report: &DailyReport, output_path: &Path) -> Result<(), ScreenerError>;

    /// File extension the writer produces, without the dot.
    fn extension(&self) -> &'static str;
}
