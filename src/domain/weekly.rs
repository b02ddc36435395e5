//! Weekly rollup over a window of daily report rows.
//!
//! Two selections are made: symbols whose momentum score reached the
//! new-high threshold, and symbols whose quality ratio reached the official
//! threshold. Each symbol appears at most once per selection.

use chrono::{Duration, NaiveDate};
use std::collections::HashMap;

use crate::domain::scoring::MOMENTUM_LABEL_MAX;
use crate::domain::settings::WeeklySettings;

/// One daily report row as read back for the rollup.
#[derive(Debug, Clone, PartialEq)]
pub struct WeeklyRow {
    pub report_date: NaiveDate,
    pub symbol: String,
    pub name_jp: String,
    pub market: String,
    pub market_cap: Option<f64>,
    pub score_new_high: u8,
    pub official_score: Option<u8>,
    pub official_applicable: Option<u8>,
    pub annual_last1_yoy: Option<f64>,
    pub annual_last2_cagr: Option<f64>,
    pub q_last_pretax_yoy: Option<f64>,
    pub q_last_revenue_yoy: Option<f64>,
    pub notes: String,
}

fn optional_float(value: Option<&str>) -> Option<f64> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .and_then(|v| v.parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

fn optional_count(value: Option<&str>) -> Option<u8> {
    optional_float(value)
        .filter(|v| *v >= 0.0 && *v <= u8::MAX as f64)
        .map(|v| v.trunc() as u8)
}

impl WeeklyRow {
    /// Build a row from named CSV cells. Unparsable optional numbers become
    /// absent; an unparsable momentum score rejects the row.
    pub fn from_fields<'r>(
        report_date: NaiveDate,
        field: impl Fn(&str) -> Option<&'r str>,
    ) -> Option<Self> {
        let text = |name: &str| field(name).map(|v| v.trim().to_string()).unwrap_or_default();
        let score_new_high = optional_count(Some(field("score_0to7").unwrap_or("0")))?;
        Some(Self {
            report_date,
            symbol: text("symbol"),
            name_jp: text("name_jp"),
            market: text("market"),
            market_cap: optional_float(field("market_cap")),
            score_new_high,
            official_score: optional_count(field("official_score")),
            official_applicable: optional_count(field("official_applicable")),
            annual_last1_yoy: optional_float(field("annual_last1_yoy")),
            annual_last2_cagr: optional_float(field("annual_last2_cagr")),
            q_last_pretax_yoy: optional_float(field("q_last_pretax_yoy")),
            q_last_revenue_yoy: optional_float(field("q_last_revenue_yoy")),
            notes: text("notes"),
        })
    }
}

/// A selected row with its ranking ratio and display form (`6/7`, `7/8`).
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryEntry {
    pub row: WeeklyRow,
    pub ratio: f64,
    pub display: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct WeeklySummary {
    pub new_high: Vec<SummaryEntry>,
    pub official: Vec<SummaryEntry>,
}

/// Inclusive `[as_of - (days - 1), as_of]` window.
pub fn report_window(as_of: NaiveDate, days: u32) -> (NaiveDate, NaiveDate) {
    let span = i64::from(days.max(1) - 1);
    (as_of - Duration::days(span), as_of)
}

/// Date of a daily report file stem such as `screen_20251022`.
pub fn parse_report_date(stem: &str, prefix: &str) -> Option<NaiveDate> {
    let date_part = stem.strip_prefix(prefix)?.strip_prefix('_')?;
    if date_part.len() != 8 || !date_part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    NaiveDate::parse_from_str(date_part, "%Y%m%d").ok()
}

fn score_new_high(row: &WeeklyRow, threshold: u8) -> Option<(f64, String)> {
    if row.score_new_high < threshold {
        return None;
    }
    let max = MOMENTUM_LABEL_MAX;
    Some((
        row.score_new_high as f64 / max as f64,
        format!("{}/{}", row.score_new_high, max),
    ))
}

fn score_official(row: &WeeklyRow, threshold: f64) -> Option<(f64, String)> {
    let (score, applicable) = (row.official_score?, row.official_applicable?);
    if applicable == 0 {
        return None;
    }
    let ratio = score as f64 / applicable as f64;
    (ratio >= threshold).then(|| (ratio, format!("{}/{}", score, applicable)))
}

fn select_best(
    rows: &[WeeklyRow],
    score: impl Fn(&WeeklyRow) -> Option<(f64, String)>,
) -> Vec<SummaryEntry> {
    let mut best: HashMap<&str, SummaryEntry> = HashMap::new();
    for row in rows {
        let Some((ratio, display)) = score(row) else {
            continue;
        };
        let replace = match best.get(row.symbol.as_str()) {
            None => true,
            Some(existing) => {
                ratio > existing.ratio
                    || (ratio == existing.ratio && row.report_date > existing.row.report_date)
            }
        };
        if replace {
            best.insert(
                row.symbol.as_str(),
                SummaryEntry {
                    row: row.clone(),
                    ratio,
                    display,
                },
            );
        }
    }

    let mut entries: Vec<SummaryEntry> = best.into_values().collect();
    entries.sort_by(|a, b| {
        b.ratio
            .total_cmp(&a.ratio)
            .then_with(|| a.row.report_date.cmp(&b.row.report_date))
            .then_with(|| a.row.symbol.cmp(&b.row.symbol))
    });
    entries
}

pub fn build_summary(rows: &[WeeklyRow], settings: &WeeklySettings) -> WeeklySummary {
    WeeklySummary {
        new_high: select_best(rows, |r| score_new_high(r, settings.new_high_threshold)),
        official: select_best(rows, |r| {
            score_official(r, settings.official_ratio_threshold)
        }),
    }
}
