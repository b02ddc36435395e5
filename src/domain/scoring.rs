//! Momentum and quality scoring over metric-engine checks.
//!
//! The two rule sets treat missing data differently. The momentum score
//! counts an unevaluable check as not satisfied and notes it; the quality
//! score drops unevaluable rules from its denominator.

use crate::domain::metrics::{
    AnnualChecks, PROFIT_YOY_TARGET, QuarterlyChecks, REVENUE_YOY_TARGET, SMALL_DECLINE,
};
use crate::domain::record::CompanyInfo;

/// Eight checks are summed although the report column is labelled `0to7`.
pub const MOMENTUM_LABEL_MAX: u8 = 7;
pub const MOMENTUM_CHECKS: usize = 8;
pub const QUALITY_RULES: usize = 8;

pub const RECENT_GROWTH_TARGET: f64 = 0.20;
pub const AVG_GROWTH_TARGET: f64 = 0.07;
pub const MAX_PER: f64 = 60.0;

pub const NOTE_ANNUAL_INSUFFICIENT: &str = "年次データ不足";
pub const NOTE_QUARTERLY_INSUFFICIENT: &str = "四半期データ不足";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MomentumCheck {
    StableGrowth,
    NoBigDrop,
    LastYearGrowth,
    TwoYearCagr,
    LastQuarter,
    Sequential,
    Accelerating,
    ImprovingMargin,
}

impl MomentumCheck {
    pub const ALL: [MomentumCheck; MOMENTUM_CHECKS] = [
        MomentumCheck::StableGrowth,
        MomentumCheck::NoBigDrop,
        MomentumCheck::LastYearGrowth,
        MomentumCheck::TwoYearCagr,
        MomentumCheck::LastQuarter,
        MomentumCheck::Sequential,
        MomentumCheck::Accelerating,
        MomentumCheck::ImprovingMargin,
    ];

    pub fn is_annual(&self) -> bool {
        matches!(
            self,
            MomentumCheck::StableGrowth
                | MomentumCheck::NoBigDrop
                | MomentumCheck::LastYearGrowth
                | MomentumCheck::TwoYearCagr
        )
    }

    /// Note appended when the check is not satisfied.
    pub fn unmet_note(&self) -> &'static str {
        match self {
            MomentumCheck::StableGrowth => "年率5–10%の安定成長は未達",
            MomentumCheck::NoBigDrop => "途中に大幅減益あり",
            MomentumCheck::LastYearGrowth => "直近1年+20%未満",
            MomentumCheck::TwoYearCagr => "直近2年CAGR+20%未満",
            MomentumCheck::LastQuarter => "直近Q: 経常+20% & 売上+10% 未達",
            MomentumCheck::Sequential => "直近2–3Qの連続クリア未達",
            MomentumCheck::Accelerating => "経常成長の加速なし",
            MomentumCheck::ImprovingMargin => "経常利益率のYoY改善なし",
        }
    }

    fn evaluate(&self, annual: &AnnualChecks, quarterly: &QuarterlyChecks) -> bool {
        let at_least = |v: Option<f64>| v.is_some_and(|x| x >= RECENT_GROWTH_TARGET);
        match self {
            MomentumCheck::StableGrowth => annual.stable_growth == Some(true),
            MomentumCheck::NoBigDrop => annual.no_big_drop == Some(true),
            MomentumCheck::LastYearGrowth => at_least(annual.last1_yoy),
            MomentumCheck::TwoYearCagr => at_least(annual.last2_cagr),
            MomentumCheck::LastQuarter => quarterly.last_q_ok == Some(true),
            MomentumCheck::Sequential => quarterly.sequential_ok == Some(true),
            MomentumCheck::Accelerating => quarterly.accelerating == Some(true),
            MomentumCheck::ImprovingMargin => quarterly.improving_margin == Some(true),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MomentumScore {
    pub score: u8,
    /// Outcome per check in [`MomentumCheck::ALL`] order.
    pub passed: [bool; MOMENTUM_CHECKS],
    pub notes: Vec<&'static str>,
}

impl MomentumScore {
    pub fn passed(&self, check: MomentumCheck) -> bool {
        MomentumCheck::ALL
            .iter()
            .position(|c| *c == check)
            .map(|i| self.passed[i])
            .unwrap_or(false)
    }
}

pub fn momentum_score(annual: &AnnualChecks, quarterly: &QuarterlyChecks) -> MomentumScore {
    let mut passed = [false; MOMENTUM_CHECKS];
    let mut notes = Vec::new();

    for (i, check) in MomentumCheck::ALL.iter().enumerate() {
        let enough = if check.is_annual() {
            annual.enough_years
        } else {
            quarterly.enough_quarters
        };
        if !enough {
            continue;
        }
        passed[i] = check.evaluate(annual, quarterly);
        if !passed[i] {
            notes.push(check.unmet_note());
        }
    }

    let mut ordered = Vec::with_capacity(notes.len() + 2);
    if !annual.enough_years {
        ordered.push(NOTE_ANNUAL_INSUFFICIENT);
    }
    ordered.extend(notes.iter().filter(|n| is_annual_note(n)));
    if !quarterly.enough_quarters {
        ordered.push(NOTE_QUARTERLY_INSUFFICIENT);
    }
    ordered.extend(notes.iter().filter(|n| !is_annual_note(n)));

    MomentumScore {
        score: passed.iter().filter(|p| **p).count() as u8,
        passed,
        notes: ordered,
    }
}

fn is_annual_note(note: &str) -> bool {
    MomentumCheck::ALL
        .iter()
        .any(|c| c.is_annual() && c.unmet_note() == note)
}

/// Three-valued result of one quality rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleOutcome {
    Pass,
    Fail,
    Inapplicable,
}

impl RuleOutcome {
    fn from_check(check: Option<bool>) -> Self {
        match check {
            Some(true) => RuleOutcome::Pass,
            Some(false) => RuleOutcome::Fail,
            None => RuleOutcome::Inapplicable,
        }
    }

    pub fn as_option(&self) -> Option<bool> {
        match self {
            RuleOutcome::Pass => Some(true),
            RuleOutcome::Fail => Some(false),
            RuleOutcome::Inapplicable => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityRule {
    NewHigh,
    AverageGrowth,
    NoDecline,
    RecentGrowth,
    QuarterlySales,
    QuarterlyProfit,
    Resilience,
    Valuation,
}

impl QualityRule {
    pub const ALL: [QualityRule; QUALITY_RULES] = [
        QualityRule::NewHigh,
        QualityRule::AverageGrowth,
        QualityRule::NoDecline,
        QualityRule::RecentGrowth,
        QualityRule::QuarterlySales,
        QualityRule::QuarterlyProfit,
        QualityRule::Resilience,
        QualityRule::Valuation,
    ];

    /// Report column for the rule's outcome.
    pub fn column(&self) -> &'static str {
        match self {
            QualityRule::NewHigh => "rule1_new_high",
            QualityRule::AverageGrowth => "rule2_growth",
            QualityRule::NoDecline => "rule3_no_decline",
            QualityRule::RecentGrowth => "rule4_recent20",
            QualityRule::QuarterlySales => "rule5_sales",
            QualityRule::QuarterlyProfit => "rule6_profit",
            QualityRule::Resilience => "rule7_resilience",
            QualityRule::Valuation => "rule8_per",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QualityScore {
    /// Outcome per rule in [`QualityRule::ALL`] order.
    pub outcomes: [RuleOutcome; QUALITY_RULES],
    pub score: u8,
    pub applicable: u8,
}

impl QualityScore {
    pub fn outcome(&self, rule: QualityRule) -> RuleOutcome {
        QualityRule::ALL
            .iter()
            .position(|r| *r == rule)
            .map(|i| self.outcomes[i])
            .unwrap_or(RuleOutcome::Inapplicable)
    }

    pub fn ratio(&self) -> Option<f64> {
        (self.applicable > 0).then(|| self.score as f64 / self.applicable as f64)
    }
}

fn two_of_recent(values: &[Option<f64>], target: f64) -> Option<bool> {
    let computable: Vec<f64> = values.iter().flatten().copied().collect();
    if computable.is_empty() {
        return None;
    }
    Some(computable.iter().filter(|&&v| v >= target).count() >= 2)
}

pub fn quality_score(
    annual: &AnnualChecks,
    quarterly: &QuarterlyChecks,
    info: Option<&CompanyInfo>,
) -> QualityScore {
    // Symbols arrive from the 52-week-high listing; the rule only counts
    // once there is some financial data to score alongside it.
    let has_data = annual.periods > 0 || quarterly.periods > 0;
    let new_high = has_data.then_some(true);

    let average_growth = annual.avg_growth.map(|g| g >= AVG_GROWTH_TARGET);

    let no_decline = annual.no_decline_small;

    let recent_growth = match (annual.last1_yoy, annual.last2_cagr) {
        (Some(last1), Some(cagr)) => {
            Some(last1 >= RECENT_GROWTH_TARGET && cagr >= RECENT_GROWTH_TARGET)
        }
        _ => None,
    };

    let quarterly_sales = two_of_recent(&quarterly.recent_revenue_yoy, REVENUE_YOY_TARGET);
    let quarterly_profit = two_of_recent(&quarterly.recent_profit_yoy, PROFIT_YOY_TARGET);

    let recent_quarters: Vec<f64> = quarterly.recent_profit_yoy.iter().flatten().copied().collect();
    // The three most recent positions, not the three most recent computable
    // values: a missing year leaves a hole instead of pulling in an older one.
    let recent_years: Vec<f64> = annual.ordinary_yoy.iter().take(3).flatten().copied().collect();
    let resilience = (!recent_quarters.is_empty() && !recent_years.is_empty()).then(|| {
        recent_quarters.iter().all(|&v| v >= 0.0)
            && recent_years.iter().all(|&v| v >= SMALL_DECLINE)
    });

    let valuation = info.and_then(|i| i.per).map(|per| per <= MAX_PER);

    let outcomes = [
        new_high,
        average_growth,
        no_decline,
        recent_growth,
        quarterly_sales,
        quarterly_profit,
        resilience,
        valuation,
    ]
    .map(RuleOutcome::from_check);

    QualityScore {
        score: outcomes.iter().filter(|o| **o == RuleOutcome::Pass).count() as u8,
        applicable: outcomes
            .iter()
            .filter(|o| **o != RuleOutcome::Inapplicable)
            .count() as u8,
        outcomes,
    }
}

/// Both scores plus the joined notes for one symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreCard {
    pub momentum: MomentumScore,
    pub quality: QualityScore,
    pub notes: String,
}

pub fn score_symbol(
    annual: &AnnualChecks,
    quarterly: &QuarterlyChecks,
    info: Option<&CompanyInfo>,
) -> ScoreCard {
    let momentum = momentum_score(annual, quarterly);
    let quality = quality_score(annual, quarterly, info);

    let mut notes: Vec<String> = momentum.notes.iter().map(|n| n.to_string()).collect();
    if (quality.applicable as usize) < QUALITY_RULES {
        notes.push(format!("公式スコア上限{}/{}", quality.applicable, QUALITY_RULES));
    }

    ScoreCard {
        momentum,
        quality,
        notes: notes.join("; "),
    }
}
