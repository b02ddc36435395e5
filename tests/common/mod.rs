#![allow(dead_code)]

use chrono::NaiveDate;
use std::cell::Cell;
use std::collections::HashMap;
use takane::domain::error::ScreenerError;
use takane::domain::record::{AnnualRecord, CompanyInfo, QuarterlyRecord, SourceTag};
use takane::domain::units::last_day_of_month;
use takane::ports::source_port::FinancialSource;

/// In-memory source keyed by symbol. `empty_calls` makes the first N
/// annual+quarterly fetch pairs come back empty to exercise retries.
pub struct MockSource {
    pub tag: SourceTag,
    pub annual: HashMap<String, Vec<AnnualRecord>>,
    pub quarterly: HashMap<String, Vec<QuarterlyRecord>>,
    pub info: HashMap<String, CompanyInfo>,
    pub errors: HashMap<String, String>,
    pub empty_calls: Cell<usize>,
    blanking: Cell<bool>,
    pub annual_calls: Cell<usize>,
    pub info_calls: Cell<usize>,
}

impl MockSource {
    pub fn new(tag: SourceTag) -> Self {
        Self {
            tag,
            annual: HashMap::new(),
            quarterly: HashMap::new(),
            info: HashMap::new(),
            errors: HashMap::new(),
            empty_calls: Cell::new(0),
            blanking: Cell::new(false),
            annual_calls: Cell::new(0),
            info_calls: Cell::new(0),
        }
    }

    pub fn with_annual(mut self, symbol: &str, records: Vec<AnnualRecord>) -> Self {
        self.annual.insert(symbol.to_string(), records);
        self
    }

    pub fn with_quarterly(mut self, symbol: &str, records: Vec<QuarterlyRecord>) -> Self {
        self.quarterly.insert(symbol.to_string(), records);
        self
    }

    pub fn with_info(mut self, info: CompanyInfo) -> Self {
        self.info.insert(info.symbol.clone(), info);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }

    pub fn empty_for_first(self, calls: usize) -> Self {
        self.empty_calls.set(calls);
        self
    }

    fn check(&self, symbol: &str) -> Result<(), ScreenerError> {
        match self.errors.get(symbol) {
            Some(reason) => Err(ScreenerError::source_failure(self.tag, symbol, reason.clone())),
            None => Ok(()),
        }
    }
}

impl FinancialSource for MockSource {
    fn tag(&self) -> SourceTag {
        self.tag
    }

    fn annual(&self, symbol: &str) -> Result<Vec<AnnualRecord>, ScreenerError> {
        self.annual_calls.set(self.annual_calls.get() + 1);
        self.check(symbol)?;
        let blank = self.empty_calls.get() > 0;
        self.blanking.set(blank);
        if blank {
            self.empty_calls.set(self.empty_calls.get() - 1);
            return Ok(Vec::new());
        }
        Ok(self.annual.get(symbol).cloned().unwrap_or_default())
    }

    fn quarterly(&self, symbol: &str) -> Result<Vec<QuarterlyRecord>, ScreenerError> {
        self.check(symbol)?;
        if self.blanking.get() {
            return Ok(Vec::new());
        }
        Ok(self.quarterly.get(symbol).cloned().unwrap_or_default())
    }

    fn company_info(&self, symbol: &str) -> Result<Option<CompanyInfo>, ScreenerError> {
        self.info_calls.set(self.info_calls.get() + 1);
        self.check(symbol)?;
        Ok(self.info.get(symbol).cloned())
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn annual(year: i32, income: f64, revenue: f64, source: SourceTag) -> AnnualRecord {
    AnnualRecord {
        period_label: format!("{}.03", year),
        end_date: date(year, 3, 31),
        revenue: Some(revenue),
        ordinary_income: Some(income),
        scope: None,
        accounting_standard: None,
        unit: "JPY".into(),
        source,
        is_forecast: false,
    }
}

pub fn forecast(year: i32, income: f64, source: SourceTag) -> AnnualRecord {
    AnnualRecord {
        is_forecast: true,
        period_label: format!("予{}.03", year),
        ..annual(year, income, income * 10.0, source)
    }
}

/// Quarter `q` (1-4) of calendar `year`, ending on the last day of its
/// final month.
pub fn quarter(year: i32, q: u32, income: f64, revenue: f64, source: SourceTag) -> QuarterlyRecord {
    QuarterlyRecord {
        period_label: format!("{}Q{}", year, q),
        end_date: last_day_of_month(year, q * 3).unwrap(),
        revenue: Some(revenue),
        ordinary_income: Some(income),
        scope: None,
        accounting_standard: None,
        unit: "JPY".into(),
        source,
    }
}

/// Five years of income growing `growth` per year, most recent last.
pub fn growing_years(first_year: i32, base: f64, growth: f64, source: SourceTag) -> Vec<AnnualRecord> {
    (0..5)
        .map(|i| {
            let income = base * (1.0 + growth).powi(i);
            annual(first_year + i, income, income * 10.0, source)
        })
        .collect()
}

pub fn company(symbol: &str, name: &str, per: Option<f64>) -> CompanyInfo {
    CompanyInfo {
        symbol: symbol.to_string(),
        name: Some(name.to_string()),
        market: Some("プライム".into()),
        market_label: Some("東証Ｐ".into()),
        per,
        ..CompanyInfo::default()
    }
}
