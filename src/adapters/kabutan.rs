//! Kabutan (kabutan.jp) HTML source (`kabutan`).
//!
//! The finance page carries two `業績推移` tables: a short annual one and a
//! longer quarterly one, told apart by row count. Figures are printed in the
//! unit named in the `ul.info` note following the table.

use std::cell::RefCell;

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

use crate::adapters::http::{HttpFetch, fetch};
use crate::domain::error::ScreenerError;
use crate::domain::record::{AnnualRecord, CompanyInfo, QuarterlyRecord, SourceTag};
use crate::domain::units::{
    DEFAULT_UNIT, last_day_of_month, normalize_market, parse_quarter_range, parse_unit,
    parse_year_month, to_number, unit_multiplier,
};
use crate::ports::source_port::FinancialSource;

pub const FINANCE_URL: &str = "https://kabutan.jp/stock/finance";
pub const COMPANY_URL: &str = "https://kabutan.jp/stock/";

const RESULTS_HEADING: &str = "業績推移";
const ANNUAL_ROWS: (usize, usize) = (6, 10);
const QUARTERLY_ROWS: (usize, usize) = (11, 20);

static OUTLINE: Lazy<Selector> =
    Lazy::new(|| Selector::parse("h2, h3, table, ul.info").expect("valid outline selector"));
static TR: Lazy<Selector> = Lazy::new(|| Selector::parse("tr").expect("valid tr selector"));
static BODY_ROWS: Lazy<Selector> =
    Lazy::new(|| Selector::parse("tbody tr").expect("valid tbody selector"));
static CELLS: Lazy<Selector> = Lazy::new(|| Selector::parse("th, td").expect("valid cell selector"));
static TD: Lazy<Selector> = Lazy::new(|| Selector::parse("td").expect("valid td selector"));
static SPAN: Lazy<Selector> = Lazy::new(|| Selector::parse("span").expect("valid span selector"));
static LI: Lazy<Selector> = Lazy::new(|| Selector::parse("li").expect("valid li selector"));
static COMPANY_NAME: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.company_block h3").expect("valid name selector"));
static MARKET: Lazy<Selector> =
    Lazy::new(|| Selector::parse("span.market").expect("valid market selector"));
static PER_HEADER: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"abbr[title="Price Earnings Ratio"]"#).expect("valid PER selector")
});

/// Concatenated, per-node trimmed text of an element.
fn text_of(element: ElementRef<'_>) -> String {
    element.text().map(str::trim).collect()
}

fn is_blank(value: &str) -> bool {
    matches!(value, "" | "-" | "—" | "－")
}

/// `12.5倍` / `2.10％` style ratios. Percentages come back as fractions.
pub fn parse_ratio(value: &str, percent: bool) -> Option<f64> {
    let value = value.trim();
    if is_blank(value) {
        return None;
    }
    let is_percent = percent || value.ends_with('%') || value.ends_with('％');
    let cleaned: String = value
        .chars()
        .filter(|c| !matches!(c, ',' | '%' | '％' | '倍'))
        .collect();
    let number: f64 = cleaned.trim().parse().ok()?;
    Some(if is_percent { number / 100.0 } else { number })
}

/// Market capitalization with a unit suffix, e.g. `4兆5,000億円` is not
/// supported but `45,095億円` and `1,234百万円` are.
pub fn parse_market_cap(value: &str) -> Option<f64> {
    let value = value.trim();
    if is_blank(value) {
        return None;
    }
    let normalized = value.replace(',', "");
    for unit in ["千円", "百万円", "億円", "兆円", "円"] {
        if let Some(number) = normalized.strip_suffix(unit) {
            return number
                .trim()
                .parse::<f64>()
                .ok()
                .map(|n| n * unit_multiplier(unit));
        }
    }
    normalized.parse().ok()
}

/// A located results table and the unit its figures are printed in.
struct ResultsTable<'a> {
    table: ElementRef<'a>,
    unit: String,
}

/// Find the `業績推移` table whose row count falls in `rows`, walking the
/// document in order so "the next table after the heading" matches.
fn find_results_table<'a>(document: &'a Html, rows: (usize, usize)) -> Option<ResultsTable<'a>> {
    let mut after_heading = false;
    let mut found: Option<ElementRef<'a>> = None;

    for node in document.select(&OUTLINE) {
        let name = node.value().name();
        match (found, name) {
            (Some(table), "ul") => {
                let info: Vec<String> = node.select(&LI).map(text_of).collect();
                return Some(ResultsTable {
                    table,
                    unit: parse_unit(&info.join(" ")),
                });
            }
            (Some(_), _) => {}
            (None, "h2" | "h3") => after_heading = text_of(node) == RESULTS_HEADING,
            (None, "table") if after_heading => {
                after_heading = false;
                let count = node.select(&TR).count();
                if (rows.0..=rows.1).contains(&count) {
                    found = Some(node);
                }
            }
            _ => {}
        }
    }

    found.map(|table| ResultsTable {
        table,
        unit: DEFAULT_UNIT.to_string(),
    })
}

/// One parsed body row of a results table.
struct ResultRow {
    label: String,
    scope: Option<String>,
    is_forecast: bool,
    revenue: Option<f64>,
    ordinary_income: Option<f64>,
}

fn parse_result_rows(table: &ResultsTable<'_>, skip_markers: &[&str]) -> Vec<ResultRow> {
    let multiplier = unit_multiplier(&table.unit);
    let mut rows = Vec::new();

    for tr in table.table.select(&BODY_ROWS) {
        let cells: Vec<ElementRef<'_>> = tr.select(&CELLS).collect();
        let Some(first) = cells.first() else {
            continue;
        };
        let mut label = text_of(*first);
        if label.is_empty() || skip_markers.iter().any(|m| label.contains(m)) {
            continue;
        }

        let is_forecast = label.contains('予');
        let scope = first
            .select(&SPAN)
            .next()
            .map(text_of)
            .filter(|s| !s.is_empty());
        if let Some(scope) = &scope {
            label = label.replacen(scope.as_str(), "", 1).trim().to_string();
        }
        label = label.replace('予', "").trim().to_string();

        let cell = |i: usize| cells.get(i).map(|c| text_of(*c)).unwrap_or_default();
        rows.push(ResultRow {
            label,
            scope,
            is_forecast,
            revenue: to_number(&cell(1), multiplier),
            ordinary_income: to_number(&cell(3), multiplier),
        });
    }
    rows
}

fn accounting_standard(scope: Option<&str>) -> Option<String> {
    (scope == Some("I")).then(|| "IFRS".to_string())
}

pub fn parse_annual(html: &str, symbol: &str) -> Vec<AnnualRecord> {
    let document = Html::parse_document(html);
    let Some(table) = find_results_table(&document, ANNUAL_ROWS) else {
        warn!(symbol, "kabutan annual table missing");
        return Vec::new();
    };

    parse_result_rows(&table, &["前期比", "前年同期比"])
        .into_iter()
        .filter_map(|row| {
            let Some((year, month)) = parse_year_month(&row.label) else {
                debug!(symbol, label = %row.label, "skipping annual row with unparsable label");
                return None;
            };
            let end_date = last_day_of_month(year, month)?;
            Some(AnnualRecord {
                accounting_standard: accounting_standard(row.scope.as_deref()),
                period_label: row.label,
                end_date,
                revenue: row.revenue,
                ordinary_income: row.ordinary_income,
                scope: row.scope,
                unit: "JPY".into(),
                source: SourceTag::Kabutan,
                is_forecast: row.is_forecast,
            })
        })
        .filter(|r| !r.is_forecast)
        .collect()
}

pub fn parse_quarterly(html: &str, symbol: &str) -> Vec<QuarterlyRecord> {
    let document = Html::parse_document(html);
    let Some(table) = find_results_table(&document, QUARTERLY_ROWS) else {
        warn!(symbol, "kabutan quarterly table missing");
        return Vec::new();
    };

    parse_result_rows(&table, &["前年同期比"])
        .into_iter()
        .filter(|row| !row.is_forecast)
        .filter_map(|row| {
            let Some((year, end_month)) = parse_quarter_range(&row.label) else {
                debug!(symbol, label = %row.label, "skipping quarterly row with unparsable label");
                return None;
            };
            let end_date = last_day_of_month(year, end_month)?;
            Some(QuarterlyRecord {
                accounting_standard: accounting_standard(row.scope.as_deref()),
                period_label: row.label,
                end_date,
                revenue: row.revenue,
                ordinary_income: row.ordinary_income,
                scope: row.scope,
                unit: "JPY".into(),
                source: SourceTag::Kabutan,
            })
        })
        .collect()
}

pub fn parse_company(html: &str, symbol: &str) -> Option<CompanyInfo> {
    let document = Html::parse_document(html);
    let name = document.select(&COMPANY_NAME).next().map(text_of);
    let market_label = document.select(&MARKET).next().map(text_of);
    if name.is_none() && market_label.is_none() {
        return None;
    }

    let mut info = CompanyInfo {
        symbol: symbol.to_string(),
        name,
        market: market_label.as_deref().map(normalize_market),
        market_label,
        source: Some(SourceTag::Kabutan),
        ..CompanyInfo::default()
    };

    let ratio_table = document
        .select(&PER_HEADER)
        .next()
        .and_then(|abbr| {
            abbr.ancestors()
                .filter_map(ElementRef::wrap)
                .find(|e| e.value().name() == "table")
        });
    if let Some(table) = ratio_table {
        let rows: Vec<ElementRef<'_>> = table.select(&BODY_ROWS).collect();
        if let Some(first) = rows.first() {
            let cells: Vec<String> = first.select(&TD).map(text_of).collect();
            if cells.len() >= 4 {
                info.per = parse_ratio(&cells[0], false);
                info.pbr = parse_ratio(&cells[1], false);
                info.dividend_yield = parse_ratio(&cells[2], true);
                info.credit_ratio = parse_ratio(&cells[3], false);
            }
        }
        if let Some(second) = rows.get(1) {
            info.market_cap = second
                .select(&TD)
                .next()
                .and_then(|cell| parse_market_cap(&text_of(cell)));
        }
    }
    Some(info)
}

/// Kabutan uses the bare securities code (`7203` for `7203.T`).
fn code_of(symbol: &str) -> &str {
    symbol.split('.').next().unwrap_or(symbol)
}

pub struct KabutanSource<H> {
    http: H,
    /// Finance page left by the last annual call for its quarterly partner.
    page: RefCell<Option<(String, String)>>,
}

impl<H: HttpFetch> KabutanSource<H> {
    pub fn new(http: H) -> Self {
        Self {
            http,
            page: RefCell::new(None),
        }
    }

    fn fetch_finance_page(&self, symbol: &str) -> Result<String, ScreenerError> {
        fetch(
            &self.http,
            SourceTag::Kabutan,
            symbol,
            FINANCE_URL,
            &[("code", code_of(symbol))],
        )
    }

    /// Always fetches, so a retry after an empty or maintenance page sees
    /// the site again. The page is kept for the quarterly call that follows.
    fn load_finance_page(&self, symbol: &str) -> Result<String, ScreenerError> {
        self.page.borrow_mut().take();
        let html = self.fetch_finance_page(symbol)?;
        *self.page.borrow_mut() = Some((symbol.to_string(), html.clone()));
        Ok(html)
    }

    /// Page left by the preceding annual call, consumed here.
    fn take_finance_page(&self, symbol: &str) -> Result<String, ScreenerError> {
        let kept = self.page.borrow_mut().take();
        match kept {
            Some((cached, html)) if cached == symbol => Ok(html),
            _ => self.fetch_finance_page(symbol),
        }
    }
}

impl<H: HttpFetch> FinancialSource for KabutanSource<H> {
    fn tag(&self) -> SourceTag {
        SourceTag::Kabutan
    }

    fn annual(&self, symbol: &str) -> Result<Vec<AnnualRecord>, ScreenerError> {
        Ok(parse_annual(&self.load_finance_page(symbol)?, symbol))
    }

    fn quarterly(&self, symbol: &str) -> Result<Vec<QuarterlyRecord>, ScreenerError> {
        Ok(parse_quarterly(&self.take_finance_page(symbol)?, symbol))
    }

    fn company_info(&self, symbol: &str) -> Result<Option<CompanyInfo>, ScreenerError> {
        let html = fetch(
            &self.http,
            SourceTag::Kabutan,
            symbol,
            COMPANY_URL,
            &[("code", code_of(symbol))],
        )?;
        Ok(parse_company(&html, symbol))
    }
}
