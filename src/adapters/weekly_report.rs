//! Weekly rollup: reads daily CSV reports back and renders the highlights.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::adapters::markdown_report::{cell, market_cap, percent};
use crate::domain::error::ScreenerError;
use crate::domain::scoring::MOMENTUM_LABEL_MAX;
use crate::domain::settings::WeeklySettings;
use crate::domain::weekly::{SummaryEntry, WeeklyRow, WeeklySummary, parse_report_date, report_window};

pub const OUTPUT_PREFIX: &str = "weekly_summary";

const EMPTY: &str = "—";

/// Daily report files named `<prefix>_YYYYMMDD.csv` dated inside
/// `[start, end]`, oldest first. A missing directory has no reports.
pub fn find_reports(
    dir: &Path,
    prefix: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<(NaiveDate, PathBuf)>, ScreenerError> {
    if !dir.is_dir() {
        warn!(dir = %dir.display(), "reports directory not found");
        return Ok(Vec::new());
    }
    let mut found = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("csv") {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        match parse_report_date(stem, prefix) {
            Some(date) if date >= start && date <= end => found.push((date, path)),
            _ => {}
        }
    }
    found.sort();
    Ok(found)
}

/// Read one daily report. Rows with an unreadable momentum score are skipped.
pub fn read_rows(path: &Path, report_date: NaiveDate) -> Result<Vec<WeeklyRow>, ScreenerError> {
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
    let headers = rdr.headers()?.clone();
    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result?;
        let field = |name: &str| {
            headers
                .iter()
                .position(|h| h == name)
                .and_then(|i| record.get(i))
        };
        match WeeklyRow::from_fields(report_date, field) {
            Some(row) => rows.push(row),
            None => debug!(path = %path.display(), "skipping row with unreadable score"),
        }
    }
    Ok(rows)
}

/// All rows from the reports inside the trailing window ending at `as_of`.
pub fn load_window(
    dir: &Path,
    prefix: &str,
    as_of: NaiveDate,
    days: u32,
) -> Result<Vec<WeeklyRow>, ScreenerError> {
    let (start, end) = report_window(as_of, days);
    let mut rows = Vec::new();
    for (date, path) in find_reports(dir, prefix, start, end)? {
        let before = rows.len();
        rows.extend(read_rows(&path, date)?);
        debug!(path = %path.display(), rows = rows.len() - before, "loaded daily report");
    }
    Ok(rows)
}

pub struct WeeklyReportAdapter {
    settings: WeeklySettings,
    yen: bool,
}

impl WeeklyReportAdapter {
    pub fn new(settings: WeeklySettings, yen: bool) -> Self {
        Self { settings, yen }
    }

    pub fn output_path(dir: &Path, as_of: NaiveDate) -> PathBuf {
        dir.join(format!("{}_{}.md", OUTPUT_PREFIX, as_of.format("%Y%m%d")))
    }

    fn new_high_label(&self) -> String {
        format!("{}/{}", self.settings.new_high_threshold, MOMENTUM_LABEL_MAX)
    }

    fn official_label(&self) -> String {
        format!("{:.0}%", self.settings.official_ratio_threshold * 100.0)
    }

    fn section(&self, lines: &mut Vec<String>, title: String, score_header: &str, entries: &[SummaryEntry]) {
        lines.push(format!("## {}", title));
        lines.push(String::new());
        if entries.is_empty() {
            lines.push("> 該当なし".to_string());
            lines.push(String::new());
            return;
        }
        lines.push(format!(
            "|日付|Symbol|銘柄名|市場|{}|時価総額|直近1Y YoY|直近2Y CAGR|Q(pretax YoY)|Q(rev YoY)|メモ|",
            score_header
        ));
        lines.push("|---|---|---|---|---:|---:|---:|---:|---:|---:|---|".to_string());
        for entry in entries {
            let row = &entry.row;
            lines.push(format!(
                "|{}|{}|{}|{}|{}|{}|{}|{}|{}|{}|{}|",
                row.report_date,
                cell(&row.symbol, EMPTY),
                cell(&row.name_jp, EMPTY),
                cell(&row.market, EMPTY),
                entry.display,
                market_cap(row.market_cap, self.yen, EMPTY),
                percent(row.annual_last1_yoy, EMPTY),
                percent(row.annual_last2_cagr, EMPTY),
                percent(row.q_last_pretax_yoy, EMPTY),
                percent(row.q_last_revenue_yoy, EMPTY),
                cell(&row.notes, EMPTY),
            ));
        }
        lines.push(String::new());
    }

    pub fn render(&self, summary: &WeeklySummary, as_of: NaiveDate) -> String {
        let (start, _) = report_window(as_of, self.settings.days);
        let new_high = self.new_high_label();
        let official = self.official_label();

        let mut lines = vec![
            format!("# 週間ハイライト（{} JSTまで）", as_of),
            String::new(),
            format!("- 期間: {} 〜 {} (JST)", start, as_of),
            format!("- 閾値（スコア（新高値））: {}", new_high),
            format!("- 閾値（スコア（株の公式））: {}", official),
            format!("- 抽出銘柄数（スコア（新高値））: {}", summary.new_high.len()),
            format!("- 抽出銘柄数（スコア（株の公式））: {}", summary.official.len()),
            String::new(),
        ];
        self.section(
            &mut lines,
            format!("スコア（新高値）ハイライト（{} 以上）", new_high),
            "スコア（新高値）",
            &summary.new_high,
        );
        self.section(
            &mut lines,
            format!("スコア（株の公式）ハイライト（{} 以上）", official),
            "スコア（株の公式）",
            &summary.official,
        );
        lines.push("※ 数値は日次スクリーナーのCSV出力を再掲したもので、四捨五入しています。".to_string());

        let mut out = lines.join("\n");
        out.push('\n');
        out
    }

    /// Render and write `weekly_summary_YYYYMMDD.md` under `dir`.
    pub fn write(
        &self,
        summary: &WeeklySummary,
        as_of: NaiveDate,
        dir: &Path,
    ) -> Result<PathBuf, ScreenerError> {
        let path = Self::output_path(dir, as_of);
        fs::create_dir_all(dir)?;
        fs::write(&path, self.render(summary, as_of)).map_err(|e| ScreenerError::Report {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::weekly::build_summary;
    use tempfile::TempDir;

    const HEADER: &str = "symbol,name_jp,market,market_cap,per,score_0to7,official_score,official_applicable,annual_last1_yoy,annual_last2_cagr,q_last_pretax_yoy,q_last_revenue_yoy,notes\n";

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn write_report(dir: &Path, name: &str, body: &str) {
        fs::write(dir.join(name), format!("{}{}", HEADER, body)).unwrap();
    }

    #[test]
    fn finds_reports_inside_window_only() {
        let dir = TempDir::new().unwrap();
        write_report(dir.path(), "screen_20251015.csv", "");
        write_report(dir.path(), "screen_20251016.csv", "");
        write_report(dir.path(), "screen_20251022.csv", "");
        write_report(dir.path(), "screen_us_20251020.csv", "");
        write_report(dir.path(), "screen_20251023.csv", "");
        fs::write(dir.path().join("screen_20251018.md"), "").unwrap();

        let found = find_reports(dir.path(), "screen", date(2025, 10, 16), date(2025, 10, 22)).unwrap();
        let dates: Vec<_> = found.iter().map(|(d, _)| *d).collect();
        assert_eq!(dates, vec![date(2025, 10, 16), date(2025, 10, 22)]);

        let us = find_reports(dir.path(), "screen_us", date(2025, 10, 16), date(2025, 10, 22)).unwrap();
        assert_eq!(us.len(), 1);
    }

    #[test]
    fn missing_directory_has_no_reports() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");
        assert!(load_window(&missing, "screen", date(2025, 10, 22), 7).unwrap().is_empty());
    }

    #[test]
    fn reads_rows_and_skips_bad_scores() {
        let dir = TempDir::new().unwrap();
        write_report(
            dir.path(),
            "screen_20251020.csv",
            "7203.T,トヨタ自動車,プライム,4.5e13,9.8,6,7,8,0.25,0.21,0.3,0.12,\n\
             9999.T,,,,,n/a,,,,,,,\n",
        );
        // A zero-symbol day leaves an empty file behind.
        fs::write(dir.path().join("screen_20251021.csv"), "").unwrap();

        let rows = load_window(dir.path(), "screen", date(2025, 10, 22), 7).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].symbol, "7203.T");
        assert_eq!(rows[0].report_date, date(2025, 10, 20));
        assert_eq!(rows[0].official_score, Some(7));
        assert_eq!(rows[0].market_cap, Some(4.5e13));
    }

    #[test]
    fn renders_sections() {
        let dir = TempDir::new().unwrap();
        write_report(
            dir.path(),
            "screen_20251020.csv",
            "7203.T,トヨタ自動車,プライム,4.5e13,9.8,6,5,8,0.25,,0.3,0.12,直近1年+20%未満\n",
        );
        let rows = load_window(dir.path(), "screen", date(2025, 10, 22), 7).unwrap();
        let settings = WeeklySettings::default();
        let summary = build_summary(&rows, &settings);
        let adapter = WeeklyReportAdapter::new(settings, true);
        let md = adapter.render(&summary, date(2025, 10, 22));

        assert!(md.starts_with("# 週間ハイライト（2025-10-22 JSTまで）\n"));
        assert!(md.contains("- 期間: 2025-10-16 〜 2025-10-22 (JST)"));
        assert!(md.contains("- 閾値（スコア（新高値））: 6/7"));
        assert!(md.contains("- 閾値（スコア（株の公式））: 75%"));
        assert!(md.contains("## スコア（新高値）ハイライト（6/7 以上）"));
        assert!(md.contains(
            "|2025-10-20|7203.T|トヨタ自動車|プライム|6/7|450000億|25.0%|—|30.0%|12.0%|直近1年+20%未満|"
        ));
        assert!(md.contains("## スコア（株の公式）ハイライト（75% 以上）\n\n> 該当なし"));
        assert!(md.ends_with("四捨五入しています。\n"));

        let path = adapter.write(&summary, date(2025, 10, 22), dir.path()).unwrap();
        assert!(path.ends_with("weekly_summary_20251022.md"));
        assert_eq!(fs::read_to_string(path).unwrap(), md);
    }
}
