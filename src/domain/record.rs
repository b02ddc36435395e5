//! Financial record types shared by sources, the reconciler and the metric engine.

use chrono::NaiveDate;
use std::fmt;
use std::str::FromStr;

/// Provenance tag of a record. The string forms are what configuration and
/// reports use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SourceTag {
    Local,
    Kabutan,
    YahooJp,
    AlphaVantage,
}

impl SourceTag {
    pub const ALL: [SourceTag; 4] = [
        SourceTag::Local,
        SourceTag::Kabutan,
        SourceTag::YahooJp,
        SourceTag::AlphaVantage,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceTag::Local => "local",
            SourceTag::Kabutan => "kabutan",
            SourceTag::YahooJp => "yahoo_jp",
            SourceTag::AlphaVantage => "alpha_vantage",
        }
    }
}

impl fmt::Display for SourceTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceTag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        SourceTag::ALL
            .into_iter()
            .find(|tag| tag.as_str() == normalized)
            .ok_or_else(|| format!("unknown source tag: {}", s.trim()))
    }
}

/// Parse a comma separated list of source tags, e.g. `local, kabutan, yahoo_jp`.
pub fn parse_source_list(input: &str) -> Result<Vec<SourceTag>, String> {
    let mut tags = Vec::new();
    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            continue;
        }
        let tag: SourceTag = trimmed.parse()?;
        if !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    Ok(tags)
}

/// One fiscal year's figures for one symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnualRecord {
    pub period_label: String,
    pub end_date: NaiveDate,
    pub revenue: Option<f64>,
    pub ordinary_income: Option<f64>,
    pub scope: Option<String>,
    pub accounting_standard: Option<String>,
    pub unit: String,
    pub source: SourceTag,
    pub is_forecast: bool,
}

/// One fiscal quarter's figures for one symbol. Forecast quarters are
/// dropped by the sources before they get here.
#[derive(Debug, Clone, PartialEq)]
pub struct QuarterlyRecord {
    pub period_label: String,
    pub end_date: NaiveDate,
    pub revenue: Option<f64>,
    pub ordinary_income: Option<f64>,
    pub scope: Option<String>,
    pub accounting_standard: Option<String>,
    pub unit: String,
    pub source: SourceTag,
}

/// Common view over annual and quarterly records.
pub trait FinancialRecord: Clone {
    fn end_date(&self) -> NaiveDate;
    fn source(&self) -> SourceTag;
    fn revenue(&self) -> Option<f64>;
    fn ordinary_income(&self) -> Option<f64>;
    fn period_label(&self) -> &str;

    fn is_forecast(&self) -> bool {
        false
    }
}

impl FinancialRecord for AnnualRecord {
    fn end_date(&self) -> NaiveDate {
        self.end_date
    }

    fn source(&self) -> SourceTag {
        self.source
    }

    fn revenue(&self) -> Option<f64> {
        self.revenue
    }

    fn ordinary_income(&self) -> Option<f64> {
        self.ordinary_income
    }

    fn period_label(&self) -> &str {
        &self.period_label
    }

    fn is_forecast(&self) -> bool {
        self.is_forecast
    }
}

impl FinancialRecord for QuarterlyRecord {
    fn end_date(&self) -> NaiveDate {
        self.end_date
    }

    fn source(&self) -> SourceTag {
        self.source
    }

    fn revenue(&self) -> Option<f64> {
        self.revenue
    }

    fn ordinary_income(&self) -> Option<f64> {
        self.ordinary_income
    }

    fn period_label(&self) -> &str {
        &self.period_label
    }
}

/// Company metadata and valuation ratios.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CompanyInfo {
    pub symbol: String,
    pub name: Option<String>,
    /// Normalized market segment, e.g. `プライム`.
    pub market: Option<String>,
    /// Market segment as the source printed it, e.g. `東証Ｐ`.
    pub market_label: Option<String>,
    pub source: Option<SourceTag>,
    pub per: Option<f64>,
    pub pbr: Option<f64>,
    pub dividend_yield: Option<f64>,
    pub credit_ratio: Option<f64>,
    pub market_cap: Option<f64>,
}
