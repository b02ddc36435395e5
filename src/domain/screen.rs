//! Batch orchestration of one screening run.

use std::thread;
use std::time::Duration;

use tracing::{info, warn};

use crate::domain::aggregator::FinancialDataProvider;
use crate::domain::metrics::{AnnualChecks, QuarterlyChecks, annual_checks, quarterly_checks};
use crate::domain::reconcile::Timeline;
use crate::domain::record::{AnnualRecord, CompanyInfo, QuarterlyRecord};
use crate::domain::report_row::{ScreenRow, sort_rows};
use crate::domain::scoring::{ScoreCard, score_symbol};
use crate::domain::settings::ScreenSettings;
use crate::ports::digest_port::DigestPort;
use crate::ports::report_port::DailyReport;

pub const NO_DATA_REASON: &str = "財務データを取得できませんでした";

/// Retry policy shared by the financial and company-info fetches.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    fn pause(&self) {
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
    }
}

/// Everything computed for one symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub annual: Timeline<AnnualRecord>,
    pub quarterly: Timeline<QuarterlyRecord>,
    pub info: Option<CompanyInfo>,
    pub annual_checks: AnnualChecks,
    pub quarterly_checks: QuarterlyChecks,
    pub card: ScoreCard,
}

impl Evaluation {
    pub fn has_data(&self) -> bool {
        !self.annual.is_empty() || !self.quarterly.is_empty()
    }

    pub fn row(&self, symbol: &str) -> ScreenRow {
        ScreenRow::build(
            symbol,
            &self.annual_checks,
            &self.quarterly_checks,
            self.info.as_ref(),
            &self.card,
        )
    }
}

/// Score already-fetched data.
pub fn evaluate(
    annual: Timeline<AnnualRecord>,
    quarterly: Timeline<QuarterlyRecord>,
    info: Option<CompanyInfo>,
) -> Evaluation {
    let annual_checks = annual_checks(&annual);
    let quarterly_checks = quarterly_checks(&quarterly);
    let card = score_symbol(&annual_checks, &quarterly_checks, info.as_ref());
    Evaluation {
        annual,
        quarterly,
        info,
        annual_checks,
        quarterly_checks,
        card,
    }
}

/// Fetch both timelines, retrying while every source comes back empty.
pub fn fetch_financials(
    provider: &FinancialDataProvider<'_>,
    symbol: &str,
    retry: RetryPolicy,
) -> (Timeline<AnnualRecord>, Timeline<QuarterlyRecord>) {
    let mut attempt = 1;
    loop {
        let annual = provider.get_annual(symbol);
        let quarterly = provider.get_quarterly(symbol);
        if !annual.is_empty() || !quarterly.is_empty() || attempt >= retry.attempts {
            return (annual, quarterly);
        }
        info!(symbol, attempt, "no financial data yet, retrying");
        retry.pause();
        attempt += 1;
    }
}

/// Fetch company info, retrying while no source knows the company.
pub fn fetch_company_info(
    provider: &FinancialDataProvider<'_>,
    symbol: &str,
    retry: RetryPolicy,
) -> Option<CompanyInfo> {
    let mut attempt = 1;
    loop {
        let info = provider.get_company_info(symbol);
        if info.is_some() || attempt >= retry.attempts {
            return info;
        }
        info!(symbol, attempt, "no company info yet, retrying");
        retry.pause();
        attempt += 1;
    }
}

/// Fetch and score one symbol.
pub fn screen_symbol(
    provider: &FinancialDataProvider<'_>,
    symbol: &str,
    retry: RetryPolicy,
) -> Evaluation {
    let (annual, quarterly) = fetch_financials(provider, symbol, retry);
    let info = fetch_company_info(provider, symbol, retry);
    let evaluation = evaluate(annual, quarterly, info);
    if evaluation.quarterly_checks.has_gaps {
        warn!(symbol, "quarterly timeline has missing quarters; YoY lag may compare the wrong periods");
    }
    evaluation
}

/// Result of a whole run, before rendering.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScreenOutcome {
    pub input_symbols: usize,
    pub rows: Vec<ScreenRow>,
    pub errors: Vec<String>,
}

impl ScreenOutcome {
    pub fn into_report(self, date: &str, provenance: &str) -> DailyReport {
        DailyReport {
            date: date.to_string(),
            input_symbols: self.input_symbols,
            rows: self.rows,
            errors: self.errors,
            provenance: provenance.to_string(),
        }
    }
}

pub fn run_screen(
    provider: &FinancialDataProvider<'_>,
    symbols: &[String],
    settings: &ScreenSettings,
    digest: Option<&dyn DigestPort>,
) -> ScreenOutcome {
    let retry = RetryPolicy {
        attempts: settings.retry_attempts,
        delay: settings.retry_delay,
    };
    let total = symbols.len();
    let mut outcome = ScreenOutcome {
        input_symbols: total,
        ..ScreenOutcome::default()
    };

    for (idx, symbol) in symbols.iter().enumerate() {
        info!("[{}/{}] {}", idx + 1, total, symbol);

        let evaluation = screen_symbol(provider, symbol, retry);
        if !evaluation.has_data() {
            warn!(symbol, "no financial data from any source");
            outcome.errors.push(format!("{}: {}", symbol, NO_DATA_REASON));
        }

        let mut row = evaluation.row(symbol);
        if let Some(digest) = digest {
            if row.score_0to7 >= settings.digest_min_score {
                row = row.with_digest(digest.digest(symbol));
            }
        }
        outcome.rows.push(row);

        if idx + 1 < total && !settings.symbol_delay.is_zero() {
            thread::sleep(settings.symbol_delay);
        }
    }

    sort_rows(&mut outcome.rows);
    info!(
        rows = outcome.rows.len(),
        errors = outcome.errors.len(),
        "screening finished"
    );
    outcome
}
