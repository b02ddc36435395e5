//! Curated local CSV source (`local`).
//!
//! Layout under the data directory:
//!
//! - `<symbol>_annual.csv`, `<symbol>_quarterly.csv` with columns
//!   `period_label,end_date,revenue,ordinary_income,scope,accounting_standard,unit[,is_forecast]`
//! - `companies.csv` with columns
//!   `symbol,name,market,per,pbr,dividend_yield,credit_ratio,market_cap`
//!
//! A missing file means there is no curated data for the symbol.

use crate::domain::error::ScreenerError;
use crate::domain::record::{AnnualRecord, CompanyInfo, QuarterlyRecord, SourceTag};
use crate::domain::units::normalize_market;
use crate::ports::source_port::FinancialSource;
use chrono::NaiveDate;
use std::path::{Path, PathBuf};

pub struct CsvSource {
    base_path: PathBuf,
}

/// Header-indexed view of one CSV row.
struct Row<'a> {
    headers: &'a csv::StringRecord,
    record: &'a csv::StringRecord,
    line: u64,
}

impl<'a> Row<'a> {
    fn get(&self, column: &str) -> Option<&'a str> {
        self.headers
            .iter()
            .position(|h| h.trim() == column)
            .and_then(|i| self.record.get(i))
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }

    fn text(&self, column: &str) -> Option<String> {
        self.get(column).map(str::to_string)
    }

    fn required(&self, column: &str) -> Result<&'a str, ScreenerError> {
        self.get(column).ok_or_else(|| {
            ScreenerError::parse(format!("line {}: missing {} column", self.line, column))
        })
    }

    fn number(&self, column: &str) -> Result<Option<f64>, ScreenerError> {
        match self.get(column) {
            None => Ok(None),
            Some(v) => v.replace(',', "").parse::<f64>().map(Some).map_err(|e| {
                ScreenerError::parse(format!(
                    "line {}: invalid {} value {:?}: {}",
                    self.line, column, v, e
                ))
            }),
        }
    }

    fn date(&self, column: &str) -> Result<NaiveDate, ScreenerError> {
        let value = self.required(column)?;
        NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|e| {
            ScreenerError::parse(format!(
                "line {}: invalid {} {:?}: {}",
                self.line, column, value, e
            ))
        })
    }

    fn flag(&self, column: &str) -> bool {
        matches!(
            self.get(column).map(str::to_lowercase).as_deref(),
            Some("true" | "1" | "yes")
        )
    }
}

impl CsvSource {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn symbol_path(&self, symbol: &str, kind: &str) -> PathBuf {
        self.base_path.join(format!("{}_{}.csv", symbol, kind))
    }

    /// Read every row of `path`, or nothing when the file does not exist.
    fn read_rows<T>(
        path: &Path,
        mut convert: impl FnMut(&Row<'_>) -> Result<T, ScreenerError>,
    ) -> Result<Vec<T>, ScreenerError> {
        if !path.exists() {
            return Ok(Vec::new());
        }
        let mut rdr = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
        let headers = rdr.headers()?.clone();
        let mut out = Vec::new();
        for (i, result) in rdr.records().enumerate() {
            let record = result?;
            let row = Row {
                headers: &headers,
                record: &record,
                line: i as u64 + 2,
            };
            out.push(convert(&row).map_err(|e| match e {
                ScreenerError::Parse { reason } => {
                    ScreenerError::parse(format!("{}: {}", path.display(), reason))
                }
                other => other,
            })?);
        }
        Ok(out)
    }
}

impl FinancialSource for CsvSource {
    fn tag(&self) -> SourceTag {
        SourceTag::Local
    }

    fn annual(&self, symbol: &str) -> Result<Vec<AnnualRecord>, ScreenerError> {
        Self::read_rows(&self.symbol_path(symbol, "annual"), |row| {
            Ok(AnnualRecord {
                period_label: row.required("period_label")?.to_string(),
                end_date: row.date("end_date")?,
                revenue: row.number("revenue")?,
                ordinary_income: row.number("ordinary_income")?,
                scope: row.text("scope"),
                accounting_standard: row.text("accounting_standard"),
                unit: row.text("unit").unwrap_or_else(|| "JPY".into()),
                source: SourceTag::Local,
                is_forecast: row.flag("is_forecast"),
            })
        })
    }

    fn quarterly(&self, symbol: &str) -> Result<Vec<QuarterlyRecord>, ScreenerError> {
        let rows = Self::read_rows(&self.symbol_path(symbol, "quarterly"), |row| {
            Ok((
                row.flag("is_forecast"),
                QuarterlyRecord {
                    period_label: row.required("period_label")?.to_string(),
                    end_date: row.date("end_date")?,
                    revenue: row.number("revenue")?,
                    ordinary_income: row.number("ordinary_income")?,
                    scope: row.text("scope"),
                    accounting_standard: row.text("accounting_standard"),
                    unit: row.text("unit").unwrap_or_else(|| "JPY".into()),
                    source: SourceTag::Local,
                },
            ))
        })?;
        Ok(rows
            .into_iter()
            .filter(|(forecast, _)| !forecast)
            .map(|(_, record)| record)
            .collect())
    }

    fn company_info(&self, symbol: &str) -> Result<Option<CompanyInfo>, ScreenerError> {
        let path = self.base_path.join("companies.csv");
        let companies = Self::read_rows(&path, |row| {
            if row.get("symbol") != Some(symbol) {
                return Ok(None);
            }
            let market_label = row.text("market");
            Ok(Some(CompanyInfo {
                symbol: symbol.to_string(),
                name: row.text("name"),
                market: market_label.as_deref().map(normalize_market),
                market_label,
                source: Some(SourceTag::Local),
                per: row.number("per")?,
                pbr: row.number("pbr")?,
                dividend_yield: row.number("dividend_yield")?,
                credit_ratio: row.number("credit_ratio")?,
                market_cap: row.number("market_cap")?,
            }))
        })?;
        Ok(companies.into_iter().flatten().next())
    }
}
