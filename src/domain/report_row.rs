//! One output row per screened symbol.

use serde::Serialize;

use crate::domain::metrics::{AnnualChecks, QuarterlyChecks};
use crate::domain::record::CompanyInfo;
use crate::domain::scoring::{QualityRule, ScoreCard};

/// CSV header, in field order.
pub const COLUMNS: [&str; 26] = [
    "symbol",
    "name_jp",
    "market",
    "market_cap",
    "per",
    "score_0to7",
    "official_score",
    "official_applicable",
    "rule1_new_high",
    "rule2_growth",
    "rule3_no_decline",
    "rule4_recent20",
    "rule5_sales",
    "rule6_profit",
    "rule7_resilience",
    "rule8_per",
    "annual_last1_yoy",
    "annual_last2_cagr",
    "q_last_pretax_yoy",
    "q_last_revenue_yoy",
    "q_last_ok_20_10",
    "q_seq_ok",
    "q_accelerating",
    "q_improving_margin",
    "notes",
    "digest",
];

/// Flattened screening result. Field names are the CSV column names; absent
/// values serialize as empty cells.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScreenRow {
    pub symbol: String,
    pub name_jp: String,
    pub market: String,
    pub market_cap: Option<f64>,
    pub per: Option<f64>,
    pub score_0to7: u8,
    pub official_score: u8,
    pub official_applicable: u8,
    pub rule1_new_high: Option<bool>,
    pub rule2_growth: Option<bool>,
    pub rule3_no_decline: Option<bool>,
    pub rule4_recent20: Option<bool>,
    pub rule5_sales: Option<bool>,
    pub rule6_profit: Option<bool>,
    pub rule7_resilience: Option<bool>,
    pub rule8_per: Option<bool>,
    pub annual_last1_yoy: Option<f64>,
    pub annual_last2_cagr: Option<f64>,
    pub q_last_pretax_yoy: Option<f64>,
    pub q_last_revenue_yoy: Option<f64>,
    pub q_last_ok_20_10: Option<bool>,
    pub q_seq_ok: Option<bool>,
    pub q_accelerating: Option<bool>,
    pub q_improving_margin: Option<bool>,
    pub notes: String,
    pub digest: String,
}

impl ScreenRow {
    pub fn build(
        symbol: &str,
        annual: &AnnualChecks,
        quarterly: &QuarterlyChecks,
        info: Option<&CompanyInfo>,
        card: &ScoreCard,
    ) -> Self {
        let rule = |r: QualityRule| card.quality.outcome(r).as_option();
        Self {
            symbol: symbol.to_string(),
            name_jp: info.and_then(|i| i.name.clone()).unwrap_or_default(),
            market: info.and_then(|i| i.market.clone()).unwrap_or_default(),
            market_cap: info.and_then(|i| i.market_cap),
            per: info.and_then(|i| i.per),
            score_0to7: card.momentum.score,
            official_score: card.quality.score,
            official_applicable: card.quality.applicable,
            rule1_new_high: rule(QualityRule::NewHigh),
            rule2_growth: rule(QualityRule::AverageGrowth),
            rule3_no_decline: rule(QualityRule::NoDecline),
            rule4_recent20: rule(QualityRule::RecentGrowth),
            rule5_sales: rule(QualityRule::QuarterlySales),
            rule6_profit: rule(QualityRule::QuarterlyProfit),
            rule7_resilience: rule(QualityRule::Resilience),
            rule8_per: rule(QualityRule::Valuation),
            annual_last1_yoy: annual.last1_yoy,
            annual_last2_cagr: annual.last2_cagr,
            q_last_pretax_yoy: quarterly.last_profit_yoy(),
            q_last_revenue_yoy: quarterly.last_revenue_yoy(),
            q_last_ok_20_10: quarterly.last_q_ok,
            q_seq_ok: quarterly.sequential_ok,
            q_accelerating: quarterly.accelerating,
            q_improving_margin: quarterly.improving_margin,
            notes: card.notes.clone(),
            digest: String::new(),
        }
    }

    pub fn with_digest(mut self, digest: impl Into<String>) -> Self {
        self.digest = digest.into();
        self
    }
}

/// Sort rows by momentum score descending, then symbol ascending.
pub fn sort_rows(rows: &mut [ScreenRow]) {
    rows.sort_by(|a, b| {
        b.score_0to7
            .cmp(&a.score_0to7)
            .then_with(|| a.symbol.cmp(&b.symbol))
    });
}
