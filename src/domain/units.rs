//! Parsing helpers for Japanese financial tables: unit labels, blank markers,
//! fiscal period labels and market segment names.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

pub const DEFAULT_UNIT: &str = "百万円";

static UNIT_IN_BRACKETS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"：[^「]*「([^」]+)」").expect("valid unit regex"));
static UNIT_AFTER_COLON: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"単位：\s*([^\s、,)）]+)").expect("valid unit regex"));
static YEAR_MONTH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{2,4})\.(\d{2})").expect("valid year-month regex"));
static QUARTER_RANGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{2,4})\.(\d{2})-(\d{2})").expect("valid quarter regex"));

const BLANK_MARKERS: [&str; 4] = ["-", "—", "－", "- -"];

/// Multiplier that converts a figure printed in `unit` into yen. Unknown
/// labels are taken as already being in the base currency.
pub fn unit_multiplier(unit: &str) -> f64 {
    match unit {
        "円" => 1.0,
        "千円" => 1e3,
        "百万円" => 1e6,
        "億円" => 1e8,
        "兆円" => 1e12,
        _ => 1.0,
    }
}

/// Extract the unit label from a table caption such as `単位：「百万円」`.
pub fn parse_unit(info_text: &str) -> String {
    UNIT_IN_BRACKETS
        .captures(info_text)
        .or_else(|| UNIT_AFTER_COLON.captures(info_text))
        .map(|caps| caps[1].to_string())
        .unwrap_or_else(|| DEFAULT_UNIT.to_string())
}

/// Parse a printed figure, stripping thousands separators and scaling by
/// `multiplier`. Blank markers and unparsable text are absent.
pub fn to_number(value: &str, multiplier: f64) -> Option<f64> {
    let value = value.trim();
    if value.is_empty() || BLANK_MARKERS.contains(&value) {
        return None;
    }
    let cleaned: String = value.chars().filter(|c| *c != ',').collect();
    cleaned
        .parse::<f64>()
        .ok()
        .map(|v| v * multiplier)
        .filter(|v| v.is_finite())
}

fn expand_year(year: i32) -> i32 {
    match year {
        0..=69 => year + 2000,
        70..=99 => year + 1900,
        _ => year,
    }
}

/// `(year, month)` from labels like `2024.03` or `23.07`.
pub fn parse_year_month(label: &str) -> Option<(i32, u32)> {
    let caps = YEAR_MONTH.captures(label)?;
    let year: i32 = caps[1].parse().ok()?;
    let month: u32 = caps[2].parse().ok()?;
    Some((expand_year(year), month))
}

/// `(year, end_month)` from quarter labels like `23.07-09`.
pub fn parse_quarter_range(label: &str) -> Option<(i32, u32)> {
    let caps = QUARTER_RANGE.captures(label)?;
    let year: i32 = caps[1].parse().ok()?;
    let end_month: u32 = caps[3].parse().ok()?;
    Some((expand_year(year), end_month))
}

/// Last calendar day of the month; `None` for an invalid month.
pub fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    if !(1..=12).contains(&month) {
        return None;
    }
    NaiveDate::from_ymd_opt(next_year, next_month, 1)?.pred_opt()
}

/// Normalize Tokyo Stock Exchange segment abbreviations.
pub fn normalize_market(label: &str) -> String {
    let label = label.trim();
    match label {
        "東証Ｐ" | "東証P" => "プライム".to_string(),
        "東証Ｓ" | "東証S" => "スタンダード".to_string(),
        "東証Ｇ" | "東証G" => "グロース".to_string(),
        other => other.to_string(),
    }
}
