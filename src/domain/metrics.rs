//! Growth and margin metrics over canonical timelines.
//!
//! Both timelines are most-recent-first, so index 0 is the latest period and
//! "the previous period" is index `i + 1` (annual) or `i + 4` (quarterly,
//! same quarter one year earlier).
//!
//! Every derived value is an `Option`: a missing figure or a zero denominator
//! yields `None` for that one value. Checks that cannot be evaluated are
//! `None` as well, never `Some(false)`.

use crate::domain::record::FinancialRecord;
use crate::domain::reconcile::Timeline;
use chrono::Datelike;

pub const MIN_ANNUAL_PERIODS: usize = 3;
pub const MIN_QUARTERLY_PERIODS: usize = 5;
pub const ANNUAL_WINDOW: usize = 5;
pub const QUARTER_LAG: usize = 4;
pub const RECENT_QUARTERS: usize = 3;

pub const STABLE_GROWTH_MIN: f64 = 0.05;
pub const STABLE_GROWTH_MAX: f64 = 0.10;
pub const BIG_DROP: f64 = -0.20;
pub const SMALL_DECLINE: f64 = -0.05;
pub const PROFIT_YOY_TARGET: f64 = 0.20;
pub const REVENUE_YOY_TARGET: f64 = 0.10;

/// `(current - base) / base`, absent when either side is missing or the base is zero.
pub fn pct_change(current: Option<f64>, base: Option<f64>) -> Option<f64> {
    let (current, base) = (current?, base?);
    if base == 0.0 {
        return None;
    }
    let value = (current - base) / base;
    value.is_finite().then_some(value)
}

/// `numerator / denominator`, absent when either side is missing or the denominator is zero.
pub fn ratio(numerator: Option<f64>, denominator: Option<f64>) -> Option<f64> {
    let (numerator, denominator) = (numerator?, denominator?);
    if denominator == 0.0 {
        return None;
    }
    let value = numerator / denominator;
    value.is_finite().then_some(value)
}

fn lagged_change<R: FinancialRecord>(
    records: &[R],
    lag: usize,
    field: impl Fn(&R) -> Option<f64>,
) -> Vec<Option<f64>> {
    (0..records.len())
        .map(|i| {
            let base = records.get(i + lag).and_then(&field);
            pct_change(field(&records[i]), base)
        })
        .collect()
}

fn margins<R: FinancialRecord>(records: &[R]) -> Vec<Option<f64>> {
    records
        .iter()
        .map(|r| ratio(r.ordinary_income(), r.revenue()))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AnnualChecks {
    pub enough_years: bool,
    pub periods: usize,
    /// Ordinary-income YoY for every period; the oldest is always `None`.
    pub ordinary_yoy: Vec<Option<f64>>,
    pub margin: Vec<Option<f64>>,
    /// Computable YoY values among the five most recent periods, most recent first.
    pub window_yoy: Vec<f64>,
    pub stable_growth: Option<bool>,
    pub no_big_drop: Option<bool>,
    pub no_decline_small: Option<bool>,
    pub avg_growth: Option<f64>,
    pub last1_yoy: Option<f64>,
    pub last2_cagr: Option<f64>,
}

impl AnnualChecks {
    fn insufficient(periods: usize) -> Self {
        Self {
            enough_years: false,
            periods,
            ..Self::default()
        }
    }
}

pub fn annual_checks<R: FinancialRecord>(timeline: &Timeline<R>) -> AnnualChecks {
    let records = timeline.records();
    if records.len() < MIN_ANNUAL_PERIODS {
        return AnnualChecks::insufficient(records.len());
    }

    let ordinary_yoy = lagged_change(records, 1, |r| r.ordinary_income());
    let margin = margins(records);

    let window_yoy: Vec<f64> = ordinary_yoy
        .iter()
        .take(ANNUAL_WINDOW)
        .flatten()
        .copied()
        .collect();

    let stable_growth = window_yoy.len() >= 3
        && window_yoy
            .iter()
            .all(|&x| (STABLE_GROWTH_MIN..=STABLE_GROWTH_MAX).contains(&x));

    let (no_big_drop, no_decline_small, avg_growth) = if window_yoy.is_empty() {
        (None, None, None)
    } else {
        (
            Some(window_yoy.iter().all(|&x| x > BIG_DROP)),
            Some(window_yoy.iter().all(|&x| x >= SMALL_DECLINE)),
            Some(window_yoy.iter().sum::<f64>() / window_yoy.len() as f64),
        )
    };

    // Spans indices 0 and 2: three data points, two years apart.
    let last2_cagr = ratio(records[0].ordinary_income(), records[2].ordinary_income())
        .map(|growth| growth.powf(0.5) - 1.0)
        .filter(|v| v.is_finite());

    AnnualChecks {
        enough_years: true,
        periods: records.len(),
        last1_yoy: ordinary_yoy[0],
        ordinary_yoy,
        margin,
        window_yoy,
        stable_growth: Some(stable_growth),
        no_big_drop,
        no_decline_small,
        avg_growth,
        last2_cagr,
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct QuarterlyChecks {
    pub enough_quarters: bool,
    pub periods: usize,
    /// Set when consecutive quarter ends are not three months apart; the
    /// four-period lag then compares against the wrong quarter.
    pub has_gaps: bool,
    pub ordinary_yoy: Vec<Option<f64>>,
    pub revenue_yoy: Vec<Option<f64>>,
    pub margin: Vec<Option<f64>>,
    pub last_q_ok: Option<bool>,
    pub sequential_ok: Option<bool>,
    pub accelerating: Option<bool>,
    pub improving_margin: Option<bool>,
    pub recent_profit_yoy: Vec<Option<f64>>,
    pub recent_revenue_yoy: Vec<Option<f64>>,
}

impl QuarterlyChecks {
    fn insufficient(periods: usize) -> Self {
        Self {
            enough_quarters: false,
            periods,
            ..Self::default()
        }
    }

    pub fn last_profit_yoy(&self) -> Option<f64> {
        self.ordinary_yoy.first().copied().flatten()
    }

    pub fn last_revenue_yoy(&self) -> Option<f64> {
        self.revenue_yoy.first().copied().flatten()
    }
}

fn meets(value: Option<f64>, target: f64) -> bool {
    value.is_some_and(|v| v >= target)
}

fn months_between(later: chrono::NaiveDate, earlier: chrono::NaiveDate) -> i32 {
    (later.year() - earlier.year()) * 12 + later.month() as i32 - earlier.month() as i32
}

pub fn quarterly_checks<R: FinancialRecord>(timeline: &Timeline<R>) -> QuarterlyChecks {
    let records = timeline.records();
    if records.len() < MIN_QUARTERLY_PERIODS {
        return QuarterlyChecks::insufficient(records.len());
    }

    let has_gaps = records
        .windows(2)
        .any(|w| months_between(w[0].end_date(), w[1].end_date()) != 3);

    let ordinary_yoy = lagged_change(records, QUARTER_LAG, |r| r.ordinary_income());
    let revenue_yoy = lagged_change(records, QUARTER_LAG, |r| r.revenue());
    let margin = margins(records);

    let recent_profit_yoy: Vec<Option<f64>> =
        ordinary_yoy.iter().take(RECENT_QUARTERS).copied().collect();
    let recent_revenue_yoy: Vec<Option<f64>> =
        revenue_yoy.iter().take(RECENT_QUARTERS).copied().collect();

    let last_q_ok = match (ordinary_yoy[0], revenue_yoy[0]) {
        (Some(profit), Some(revenue)) => {
            Some(profit >= PROFIT_YOY_TARGET && revenue >= REVENUE_YOY_TARGET)
        }
        _ => None,
    };

    let any_recent = recent_profit_yoy
        .iter()
        .chain(recent_revenue_yoy.iter())
        .any(Option::is_some);
    let sequential_ok = any_recent.then(|| {
        let last_two_clear = (0..2).all(|i| {
            meets(recent_profit_yoy[i], PROFIT_YOY_TARGET)
                && meets(recent_revenue_yoy[i], REVENUE_YOY_TARGET)
        });
        let profit_hits = recent_profit_yoy
            .iter()
            .filter(|v| meets(**v, PROFIT_YOY_TARGET))
            .count();
        let revenue_hits = recent_revenue_yoy
            .iter()
            .filter(|v| meets(**v, REVENUE_YOY_TARGET))
            .count();
        last_two_clear || (profit_hits >= 2 && revenue_hits >= 2)
    });

    let accelerating = match (ordinary_yoy[0], ordinary_yoy[1]) {
        (Some(latest), Some(prior)) => Some(latest >= prior),
        _ => None,
    };

    let improving_margin = match (margin[0], margin[QUARTER_LAG]) {
        (Some(latest), Some(year_ago)) => Some(latest >= year_ago),
        _ => None,
    };

    QuarterlyChecks {
        enough_quarters: true,
        periods: records.len(),
        has_gaps,
        ordinary_yoy,
        revenue_yoy,
        margin,
        last_q_ok,
        sequential_ok,
        accelerating,
        improving_margin,
        recent_profit_yoy,
        recent_revenue_yoy,
    }
}
