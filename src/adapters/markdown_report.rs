//! Markdown daily report writer, plus the cell formatters the weekly
//! summary shares.

use std::fs;
use std::path::Path;

use crate::domain::error::ScreenerError;
use crate::domain::report_row::ScreenRow;
use crate::domain::settings::Market;
use crate::ports::report_port::{DailyReport, ReportPort};

/// Error entries listed before the remainder is summarized.
pub const MAX_LISTED_ERRORS: usize = 50;

const COLUMN_GUIDES: [&str; 16] = [
    "- `Symbol`: ティッカー（例: 2726.T）。",
    "- `銘柄名`: 取得元の銘柄名。",
    "- `市場`: 市場区分（プライム/スタンダード/グロースなど）。",
    "- `時価総額`: 取得元の時価総額（円建ては億円単位）。",
    "- `PER`: 株価収益率。",
    "- `Score`: 年次・四半期チェックの合計スコア（0〜7）。",
    "- `公式`: 株の公式8項目のうち満たした数/判定できた数。",
    "- `直近1Y YoY`: 直近通期の経常利益YoY（前年比）。",
    "- `直近2Y CAGR`: 直近2期の経常利益CAGR。",
    "- `Q(pretax YoY)`: 直近四半期の経常利益YoY。",
    "- `Q(rev YoY)`: 直近四半期の売上高YoY。",
    "- `Q基準達成`: 直近四半期で「経常+20% & 売上+10%」を満たしたか。",
    "- `連続性`: 直近2-3四半期で基準を複数回満たしたか。",
    "- `加速`: 経常YoYが直近で加速しているか。",
    "- `率改善`: 経常利益率が前年同期比で改善しているか。",
    "- `メモ`: 未達項目や注意点のまとめ。",
];

/// `0.254` → `25.4%`; absent values render as `empty`.
pub fn percent(value: Option<f64>, empty: &str) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{:.1}%", v * 100.0),
        _ => empty.to_string(),
    }
}

/// Yen figures in 億 units, other currencies in billions.
pub fn market_cap(value: Option<f64>, yen: bool, empty: &str) -> String {
    match value {
        Some(v) if v.is_finite() && yen => format!("{:.0}億", v / 1e8),
        Some(v) if v.is_finite() => format!("{:.1}B", v / 1e9),
        _ => empty.to_string(),
    }
}

/// Keep free text from breaking the table layout.
pub fn cell(text: &str, empty: &str) -> String {
    let cleaned = text.replace('|', "｜").replace(['\r', '\n'], " ");
    if cleaned.trim().is_empty() {
        empty.to_string()
    } else {
        cleaned
    }
}

fn flag(value: Option<bool>) -> &'static str {
    if value == Some(true) { "✅" } else { "—" }
}

pub struct MarkdownReportAdapter {
    market: Market,
}

impl MarkdownReportAdapter {
    pub fn new(market: Market) -> Self {
        Self { market }
    }

    fn table_row(&self, row: &ScreenRow) -> String {
        let per = row.per.map(|p| format!("{:.1}", p)).unwrap_or_default();
        let official = format!("{}/{}", row.official_score, row.official_applicable);
        let cells = [
            cell(&row.symbol, ""),
            cell(&row.name_jp, ""),
            cell(&row.market, ""),
            market_cap(row.market_cap, self.market == Market::Jp, ""),
            per,
            row.score_0to7.to_string(),
            official,
            percent(row.annual_last1_yoy, ""),
            percent(row.annual_last2_cagr, ""),
            percent(row.q_last_pretax_yoy, ""),
            percent(row.q_last_revenue_yoy, ""),
            flag(row.q_last_ok_20_10).to_string(),
            flag(row.q_seq_ok).to_string(),
            flag(row.q_accelerating).to_string(),
            flag(row.q_improving_margin).to_string(),
            cell(&row.notes, ""),
        ];
        format!("|{}|", cells.join("|"))
    }

    pub fn render(&self, report: &DailyReport) -> String {
        let title = format!("# 日次スクリーナー（{} JST）", report.date);
        if report.input_symbols == 0 {
            return format!("{}\n\nシンボルが0件でした。", title);
        }

        let mut lines = vec![
            title,
            String::new(),
            report.provenance.clone(),
            String::new(),
            format!("- 処理銘柄（表に掲載）: **{}** 件", report.rows.len()),
            format!("- 入力シンボル数: {} 件", report.input_symbols),
            String::new(),
            "### 指標の見方".to_string(),
            String::new(),
        ];
        lines.extend(COLUMN_GUIDES.iter().map(|g| g.to_string()));
        lines.push(String::new());

        if report.rows.is_empty() {
            lines.push("> 表示可能なデータがありませんでした。".to_string());
        } else {
            lines.push(
                "|Symbol|銘柄名|市場|時価総額|PER|Score|公式|直近1Y YoY|直近2Y CAGR|Q(pretax YoY)|Q(rev YoY)|Q基準達成|連続性|加速|率改善|メモ|"
                    .to_string(),
            );
            lines.push(
                "|---|---|---|---:|---:|---:|---:|---:|---:|---:|---:|:---:|:---:|:---:|:---:|---|"
                    .to_string(),
            );
            lines.extend(report.rows.iter().map(|row| self.table_row(row)));
        }

        let digests: Vec<&ScreenRow> = report
            .rows
            .iter()
            .filter(|row| !row.digest.trim().is_empty())
            .collect();
        if !digests.is_empty() {
            lines.push(String::new());
            for row in digests {
                lines.push(format!("**{} 要約**", row.symbol));
                lines.push(String::new());
                lines.push(row.digest.trim().to_string());
                lines.push(String::new());
            }
        }

        if !report.errors.is_empty() {
            lines.push(String::new());
            lines.push("### 注記（処理できなかった銘柄など）".to_string());
            lines.push(String::new());
            lines.extend(
                report
                    .errors
                    .iter()
                    .take(MAX_LISTED_ERRORS)
                    .map(|e| format!("- {}", e)),
            );
            if report.errors.len() > MAX_LISTED_ERRORS {
                lines.push(format!(
                    "- …ほか {} 件",
                    report.errors.len() - MAX_LISTED_ERRORS
                ));
            }
        }

        let mut out = lines.join("\n");
        out.push('\n');
        out
    }
}

impl ReportPort for MarkdownReportAdapter {
    fn write(&self, report: &DailyReport, output_path: &Path) -> Result<(), ScreenerError> {
        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(output_path, self.render(report)).map_err(|e| ScreenerError::Report {
            path: output_path.display().to_string(),
            reason: e.to_string(),
        })
    }

    fn extension(&self) -> &'static str {
        "md"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::metrics::{AnnualChecks, QuarterlyChecks};
    use crate::domain::record::CompanyInfo;
    use crate::domain::scoring::score_symbol;
    use tempfile::TempDir;

    fn row(symbol: &str) -> ScreenRow {
        let info = CompanyInfo {
            symbol: symbol.into(),
            name: Some("パル|グループ".into()),
            market: Some("プライム".into()),
            market_cap: Some(3.2e11),
            per: Some(18.46),
            ..CompanyInfo::default()
        };
        let annual = AnnualChecks {
            periods: 4,
            last1_yoy: Some(0.2543),
            ..AnnualChecks::default()
        };
        let quarterly = QuarterlyChecks {
            last_q_ok: Some(true),
            sequential_ok: Some(false),
            ..QuarterlyChecks::default()
        };
        let card = score_symbol(&annual, &quarterly, Some(&info));
        ScreenRow::build(symbol, &annual, &quarterly, Some(&info), &card)
    }

    fn report(rows: Vec<ScreenRow>, errors: Vec<String>) -> DailyReport {
        DailyReport {
            date: "20251022".into(),
            input_symbols: 3,
            rows,
            errors,
            provenance: Market::Jp.provenance().to_string(),
        }
    }

    #[test]
    fn formatters() {
        assert_eq!(percent(Some(0.2543), ""), "25.4%");
        assert_eq!(percent(None, "—"), "—");
        assert_eq!(market_cap(Some(3.2e11), true, ""), "3200億");
        assert_eq!(market_cap(Some(3.7e12), false, ""), "3700.0B");
        assert_eq!(cell("a|b\nc", ""), "a｜b c");
        assert_eq!(cell("  ", "—"), "—");
    }

    #[test]
    fn renders_table_row() {
        let md = MarkdownReportAdapter::new(Market::Jp).render(&report(vec![row("2726.T")], vec![]));
        assert!(md.starts_with("# 日次スクリーナー（20251022 JST）\n"));
        assert!(md.contains("- 処理銘柄（表に掲載）: **1** 件"));
        assert!(md.contains("- 入力シンボル数: 3 件"));
        assert!(md.contains("### 指標の見方"));
        assert!(md.contains("|2726.T|パル｜グループ|プライム|3200億|18.5|0|"));
        assert!(md.contains("|25.4%|"));
        assert!(md.contains("|✅|—|—|—|"));
        assert!(!md.contains("注記"));
    }

    #[test]
    fn empty_table_and_digests() {
        let md = MarkdownReportAdapter::new(Market::Jp).render(&report(vec![], vec![]));
        assert!(md.contains("> 表示可能なデータがありませんでした。"));

        let with_digest = row("2726.T").with_digest("増収増益が続く。");
        let md = MarkdownReportAdapter::new(Market::Jp).render(&report(vec![with_digest], vec![]));
        assert!(md.contains("**2726.T 要約**\n\n増収増益が続く。"));
    }

    #[test]
    fn errors_are_capped() {
        let errors: Vec<String> = (0..53).map(|i| format!("{:04}.T: failed", i)).collect();
        let md = MarkdownReportAdapter::new(Market::Jp).render(&report(vec![], errors));
        assert!(md.contains("### 注記（処理できなかった銘柄など）"));
        assert!(md.contains("- 0049.T: failed"));
        assert!(!md.contains("- 0050.T: failed"));
        assert!(md.contains("- …ほか 3 件"));
    }

    #[test]
    fn zero_symbols_renders_short_document() {
        let mut empty = report(vec![], vec![]);
        empty.input_symbols = 0;
        assert_eq!(
            MarkdownReportAdapter::new(Market::Us).render(&empty),
            "# 日次スクリーナー（20251022 JST）\n\nシンボルが0件でした。"
        );
    }

    #[test]
    fn write_creates_parent_directory() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("reports/us/screen_us_20251022.md");
        let adapter = MarkdownReportAdapter::new(Market::Us);
        adapter.write(&report(vec![], vec![]), &path).unwrap();
        assert!(fs::read_to_string(&path)
            .unwrap()
            .contains("> 表示可能なデータがありませんでした。"));
        assert_eq!(adapter.extension(), "md");
    }
}
