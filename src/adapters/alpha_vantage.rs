//! Alpha Vantage JSON source (`alpha_vantage`) for US symbols.

use std::cell::RefCell;
use std::thread;
use std::time::Duration;

use chrono::{Datelike, NaiveDate};
use serde_json::Value;
use tracing::debug;

use crate::adapters::http::{HttpFetch, fetch};
use crate::domain::error::ScreenerError;
use crate::domain::record::{AnnualRecord, CompanyInfo, QuarterlyRecord, SourceTag};
use crate::ports::source_port::FinancialSource;

pub const QUERY_URL: &str = "https://www.alphavantage.co/query";

const ERROR_KEYS: [&str; 3] = ["Error Message", "Note", "Information"];

/// Reject rate-limit and error envelopes, which arrive with a 200 status.
fn check_envelope(data: &Value) -> Result<(), String> {
    for key in ERROR_KEYS {
        if let Some(message) = data.get(key).and_then(Value::as_str) {
            return Err(format!("{}: {}", key, message));
        }
    }
    Ok(())
}

fn number(item: &Value, key: &str) -> Option<f64> {
    match item.get(key)? {
        Value::String(s) if s != "None" && s != "-" => s.trim().parse().ok(),
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

fn text(item: &Value, key: &str) -> Option<String> {
    item.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty() && *s != "None")
        .map(str::to_string)
}

struct Report {
    end_date: NaiveDate,
    revenue: Option<f64>,
    income: Option<f64>,
    currency: String,
}

fn reports(data: &Value, key: &str) -> Vec<Report> {
    let Some(items) = data.get(key).and_then(Value::as_array) else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| {
            let raw = item.get("fiscalDateEnding")?.as_str()?;
            let end_date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()?;
            Some(Report {
                end_date,
                revenue: number(item, "totalRevenue"),
                income: number(item, "operatingIncome"),
                currency: text(item, "reportedCurrency").unwrap_or_else(|| "USD".into()),
            })
        })
        .collect()
}

pub fn parse_annual(data: &Value) -> Vec<AnnualRecord> {
    reports(data, "annualReports")
        .into_iter()
        .map(|r| AnnualRecord {
            period_label: r.end_date.year().to_string(),
            end_date: r.end_date,
            revenue: r.revenue,
            ordinary_income: r.income,
            scope: None,
            accounting_standard: None,
            unit: r.currency,
            source: SourceTag::AlphaVantage,
            is_forecast: false,
        })
        .collect()
}

pub fn parse_quarterly(data: &Value) -> Vec<QuarterlyRecord> {
    reports(data, "quarterlyReports")
        .into_iter()
        .map(|r| QuarterlyRecord {
            period_label: format!("{}Q{}", r.end_date.year(), (r.end_date.month() - 1) / 3 + 1),
            end_date: r.end_date,
            revenue: r.revenue,
            ordinary_income: r.income,
            scope: None,
            accounting_standard: None,
            unit: r.currency,
            source: SourceTag::AlphaVantage,
        })
        .collect()
}

/// Company overview. `None` when the payload carries no name.
pub fn parse_overview(symbol: &str, data: &Value) -> Option<CompanyInfo> {
    let name = text(data, "Name")?;
    let exchange = text(data, "Exchange");
    Some(CompanyInfo {
        symbol: symbol.to_string(),
        name: Some(name),
        market: exchange.clone(),
        market_label: exchange,
        source: Some(SourceTag::AlphaVantage),
        per: number(data, "PERatio"),
        pbr: number(data, "PriceToBookRatio"),
        dividend_yield: number(data, "DividendYield"),
        credit_ratio: None,
        market_cap: number(data, "MarketCapitalization"),
    })
}

pub struct AlphaVantageSource<H> {
    http: H,
    api_key: String,
    throttle: Duration,
    income_statement: RefCell<Option<(String, Value)>>,
}

impl<H: HttpFetch> AlphaVantageSource<H> {
    pub fn new(http: H, api_key: impl Into<String>, throttle: Duration) -> Self {
        Self {
            http,
            api_key: api_key.into(),
            throttle,
            income_statement: RefCell::new(None),
        }
    }

    fn call(&self, function: &str, symbol: &str) -> Result<Value, ScreenerError> {
        let query = [
            ("function", function),
            ("symbol", symbol),
            ("apikey", self.api_key.as_str()),
        ];
        let body = fetch(&self.http, SourceTag::AlphaVantage, symbol, QUERY_URL, &query);
        if !self.throttle.is_zero() {
            debug!(seconds = self.throttle.as_secs_f64(), "alpha vantage throttle");
            thread::sleep(self.throttle);
        }
        let data: Value = serde_json::from_str(&body?).map_err(|e| {
            ScreenerError::source_failure(SourceTag::AlphaVantage, symbol, format!("invalid JSON: {}", e))
        })?;
        check_envelope(&data)
            .map_err(|reason| ScreenerError::source_failure(SourceTag::AlphaVantage, symbol, reason))?;
        Ok(data)
    }

    /// Always calls the API and keeps the payload for the quarterly call
    /// that follows, so a retry after an empty response asks again.
    fn load_income_statement(&self, symbol: &str) -> Result<Value, ScreenerError> {
        self.income_statement.borrow_mut().take();
        let data = self.call("INCOME_STATEMENT", symbol)?;
        *self.income_statement.borrow_mut() = Some((symbol.to_string(), data.clone()));
        Ok(data)
    }

    fn take_income_statement(&self, symbol: &str) -> Result<Value, ScreenerError> {
        let kept = self.income_statement.borrow_mut().take();
        match kept {
            Some((cached, data)) if cached == symbol => Ok(data),
            _ => self.call("INCOME_STATEMENT", symbol),
        }
    }
}

impl<H: HttpFetch> FinancialSource for AlphaVantageSource<H> {
    fn tag(&self) -> SourceTag {
        SourceTag::AlphaVantage
    }

    fn annual(&self, symbol: &str) -> Result<Vec<AnnualRecord>, ScreenerError> {
        Ok(parse_annual(&self.load_income_statement(symbol)?))
    }

    fn quarterly(&self, symbol: &str) -> Result<Vec<QuarterlyRecord>, ScreenerError> {
        Ok(parse_quarterly(&self.take_income_statement(symbol)?))
    }

    fn company_info(&self, symbol: &str) -> Result<Option<CompanyInfo>, ScreenerError> {
        Ok(parse_overview(symbol, &self.call("OVERVIEW", symbol)?))
    }
}
