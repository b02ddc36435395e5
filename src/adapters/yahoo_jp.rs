//! Yahoo!ファイナンス performance page source (`yahoo_jp`).
//!
//! The page embeds its data as a JSON fragment in the HTML. We cut out the
//! `"performance":{"performance":[...]}` block and read one record per node.

use chrono::NaiveDate;
use serde_json::Value;
use tracing::debug;

use crate::adapters::http::{HttpFetch, fetch};
use crate::domain::error::ScreenerError;
use crate::domain::record::{AnnualRecord, QuarterlyRecord, SourceTag};
use crate::ports::source_port::FinancialSource;

pub const PERFORMANCE_URL: &str = "https://finance.yahoo.co.jp/quote";

const BLOCK_START: &str = r#""performance":{"performance""#;
const BLOCK_END: &str = r#"},"stockRanking""#;

/// Extract the performance node list, or `None` when the page does not
/// carry a decodable block.
pub fn extract_performance(html: &str) -> Option<Vec<Value>> {
    let start = html.find(BLOCK_START)?;
    let end = start + html[start..].find(BLOCK_END)?;
    let json_text = format!("{{{}}}", &html[start..=end])
        .replace(r#""$undefined""#, "null")
        .replace("$undefined", "null");

    let data: Value = match serde_json::from_str(&json_text) {
        Ok(data) => data,
        Err(e) => {
            debug!(error = %e, "failed to decode yahoo performance block");
            return None;
        }
    };
    data.get("performance")?
        .get("performance")?
        .as_array()
        .cloned()
}

fn number(node: &Value, key: &str) -> Option<f64> {
    match node.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn text(node: &Value, key: &str) -> Option<String> {
    match node.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn end_date(node: &Value) -> Option<NaiveDate> {
    let raw = node.get("endDate")?.as_str()?;
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

/// Fields shared by annual and quarterly nodes.
struct Node {
    end_date: NaiveDate,
    fiscal_year: String,
    fiscal_quarter: Option<String>,
    revenue: Option<f64>,
    ordinary_income: Option<f64>,
    accounting_standard: Option<String>,
}

fn nodes(html: &str) -> Vec<Node> {
    extract_performance(html)
        .unwrap_or_default()
        .iter()
        .filter_map(|node| {
            Some(Node {
                end_date: end_date(node)?,
                fiscal_year: text(node, "fiscalYear").unwrap_or_else(|| "None".into()),
                fiscal_quarter: text(node, "fiscalQuarter"),
                revenue: number(node, "netSales"),
                ordinary_income: number(node, "ordinaryIncome"),
                accounting_standard: text(node, "accountingStandard"),
            })
        })
        .collect()
}

pub fn parse_annual(html: &str) -> Vec<AnnualRecord> {
    nodes(html)
        .into_iter()
        .map(|node| {
            let period_label = match node.fiscal_quarter.map(|q| q.to_uppercase()) {
                Some(q) if q.starts_with('Q') => format!("{}{}", node.fiscal_year, q),
                _ => node.fiscal_year,
            };
            AnnualRecord {
                period_label,
                end_date: node.end_date,
                revenue: node.revenue,
                ordinary_income: node.ordinary_income,
                scope: None,
                accounting_standard: node.accounting_standard,
                unit: "JPY".into(),
                source: SourceTag::YahooJp,
                is_forecast: false,
            }
        })
        .collect()
}

pub fn parse_quarterly(html: &str) -> Vec<QuarterlyRecord> {
    nodes(html)
        .into_iter()
        .map(|node| QuarterlyRecord {
            period_label: match node.fiscal_quarter {
                Some(q) => format!("{}{}", node.fiscal_year, q),
                None => node.fiscal_year,
            },
            end_date: node.end_date,
            revenue: node.revenue,
            ordinary_income: node.ordinary_income,
            scope: None,
            accounting_standard: node.accounting_standard,
            unit: "JPY".into(),
            source: SourceTag::YahooJp,
        })
        .collect()
}

pub struct YahooJapanSource<H> {
    http: H,
}

impl<H: HttpFetch> YahooJapanSource<H> {
    pub fn new(http: H) -> Self {
        Self { http }
    }

    fn page(&self, symbol: &str, query: &[(&str, &str)]) -> Result<String, ScreenerError> {
        let url = format!("{}/{}/performance", PERFORMANCE_URL, symbol);
        fetch(&self.http, SourceTag::YahooJp, symbol, &url, query)
    }
}

impl<H: HttpFetch> FinancialSource for YahooJapanSource<H> {
    fn tag(&self) -> SourceTag {
        SourceTag::YahooJp
    }

    fn annual(&self, symbol: &str) -> Result<Vec<AnnualRecord>, ScreenerError> {
        Ok(parse_annual(&self.page(symbol, &[])?))
    }

    fn quarterly(&self, symbol: &str) -> Result<Vec<QuarterlyRecord>, ScreenerError> {
        Ok(parse_quarterly(&self.page(symbol, &[("term", "quarter")])?))
    }
}
