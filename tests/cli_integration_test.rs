//! CLI integration tests.
//!
//! Tests cover:
//! - `validate` with valid and invalid INI files on disk
//! - `screen --dry-run` plan resolution
//! - A full `screen` run over local CSV data, writing both reports
//! - `weekly` over the reports written by `screen`
//! - Source construction from configuration

use clap::Parser;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::ExitCode;
use takane::adapters::file_config_adapter::FileConfigAdapter;
use takane::cli::{self, Cli};
use takane::domain::error::ScreenerError;
use takane::domain::settings::{Market, ScreenSettings, SourceSettings};
use tempfile::TempDir;

fn write_temp_ini(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn run(args: &[&str]) -> ExitCode {
    let mut argv = vec!["takane"];
    argv.extend_from_slice(args);
    cli::run(Cli::parse_from(argv))
}

fn code(exit: ExitCode) -> String {
    // ExitCode doesn't implement PartialEq, so compare the debug form
    format!("{:?}", exit)
}

fn success() -> String {
    code(ExitCode::SUCCESS)
}

fn local_config(root: &Path) -> String {
    format!(
        "[screen]\n\
         market = jp\n\
         symbols_path = {root}/symbols.txt\n\
         reports_dir = {root}/reports\n\
         sources = local\n\
         retry_attempts = 1\n\
         retry_delay_seconds = 0\n\
         symbol_delay_seconds = 0\n\
         \n\
         [local]\n\
         data_dir = {root}/data\n\
         \n\
         [weekly]\n\
         days = 7\n",
        root = root.display()
    )
}

fn write_local_data(root: &Path) {
    let data = root.join("data");
    fs::create_dir_all(&data).unwrap();
    let header = "period_label,end_date,revenue,ordinary_income\n";

    let mut annual = header.to_string();
    for (year, income) in [(2020, 100), (2021, 125), (2022, 150), (2023, 190), (2024, 240)] {
        annual.push_str(&format!("{}.03,{}-03-31,{},{}\n", year, year, income * 10, income));
    }
    fs::write(data.join("1111.T_annual.csv"), annual).unwrap();

    let mut quarterly = header.to_string();
    for (year, income, revenue) in [(2023, 100, 1000), (2024, 150, 1200)] {
        for (q, day) in [(1, "03-31"), (2, "06-30"), (3, "09-30"), (4, "12-31")] {
            quarterly.push_str(&format!("{}Q{},{}-{},{},{}\n", year, q, year, day, revenue, income));
        }
    }
    fs::write(data.join("1111.T_quarterly.csv"), quarterly).unwrap();

    fs::write(
        data.join("companies.csv"),
        "symbol,name,market,per,market_cap\n1111.T,成長商事,東証Ｐ,15.0,120000000000\n",
    )
    .unwrap();
    fs::write(root.join("symbols.txt"), "# daily list\n1111.T\n\n2222.T\n1111.T\n").unwrap();
}

mod validate {
    use super::*;

    #[test]
    fn valid_config_passes() {
        let dir = TempDir::new().unwrap();
        let ini = write_temp_ini(&local_config(dir.path()));
        assert_eq!(
            code(run(&["validate", "--config", ini.path().to_str().unwrap()])),
            success()
        );
    }

    #[test]
    fn unknown_market_is_a_config_error() {
        let ini = write_temp_ini("[screen]\nmarket = mars\n");
        assert_eq!(
            code(run(&["validate", "--config", ini.path().to_str().unwrap()])),
            code(ExitCode::from(2))
        );
    }

    #[test]
    fn bad_weekly_threshold_is_a_config_error() {
        let ini = write_temp_ini("[weekly]\nofficial_ratio_threshold = 1.5\n");
        assert_eq!(
            code(run(&["validate", "--config", ini.path().to_str().unwrap()])),
            code(ExitCode::from(2))
        );
    }

    #[test]
    fn missing_file_is_reported() {
        let exit = run(&["validate", "--config", "/nonexistent/takane.ini"]);
        assert_ne!(code(exit), success());
    }
}

mod screen {
    use super::*;

    #[test]
    fn dry_run_resolves_plan_without_writing() {
        let dir = TempDir::new().unwrap();
        write_local_data(dir.path());
        let ini = write_temp_ini(&local_config(dir.path()));

        let exit = run(&["screen", "--config", ini.path().to_str().unwrap(), "--dry-run"]);
        assert_eq!(code(exit), success());
        assert!(!dir.path().join("reports").exists());
    }

    #[test]
    fn dry_run_for_alpha_vantage_needs_a_key_when_env_is_unset() {
        if std::env::var("ALPHAVANTAGE_KEY").is_ok() {
            return;
        }
        let dir = TempDir::new().unwrap();
        let ini = write_temp_ini(&format!(
            "[screen]\nmarket = us\nsources = alpha_vantage\nsymbols_path = {}/none.txt\n",
            dir.path().display()
        ));
        let exit = run(&["screen", "--config", ini.path().to_str().unwrap(), "--dry-run"]);
        assert_eq!(code(exit), code(ExitCode::from(2)));
    }

    #[test]
    fn full_run_writes_csv_and_markdown() {
        let dir = TempDir::new().unwrap();
        write_local_data(dir.path());
        let ini = write_temp_ini(&local_config(dir.path()));
        let out = dir.path().join("out");

        let exit = run(&[
            "screen",
            "--config",
            ini.path().to_str().unwrap(),
            "--output-dir",
            out.to_str().unwrap(),
        ]);
        assert_eq!(code(exit), success());

        let entries: Vec<_> = fs::read_dir(&out)
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        let csv_name = entries.iter().find(|n| n.ends_with(".csv")).unwrap();
        let md_name = entries.iter().find(|n| n.ends_with(".md")).unwrap();
        assert!(csv_name.starts_with("screen_"));

        let csv = fs::read_to_string(out.join(csv_name)).unwrap();
        let lines: Vec<_> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("symbol,name_jp,market,"));
        assert!(lines[1].starts_with("1111.T,成長商事,プライム,"));
        assert!(lines[2].starts_with("2222.T,,,"));

        let md = fs::read_to_string(out.join(md_name)).unwrap();
        assert!(md.contains("- 処理銘柄（表に掲載）: **2** 件"));
        assert!(md.contains("- 入力シンボル数: 2 件"));
        assert!(md.contains("- 2222.T: 財務データを取得できませんでした"));
    }

    #[test]
    fn max_symbols_zero_writes_empty_reports() {
        let dir = TempDir::new().unwrap();
        write_local_data(dir.path());
        let ini = write_temp_ini(&local_config(dir.path()));

        let exit = run(&[
            "screen",
            "--config",
            ini.path().to_str().unwrap(),
            "--max-symbols",
            "0",
        ]);
        assert_eq!(code(exit), success());

        let reports = dir.path().join("reports");
        for entry in fs::read_dir(&reports).unwrap() {
            let path = entry.unwrap().path();
            let content = fs::read_to_string(&path).unwrap();
            match path.extension().and_then(|e| e.to_str()) {
                Some("csv") => assert_eq!(content, ""),
                Some("md") => assert!(content.ends_with("シンボルが0件でした。")),
                other => panic!("unexpected report {:?}", other),
            }
        }
    }
}

mod weekly {
    use super::*;

    #[test]
    fn summarizes_reports_in_window() {
        let dir = TempDir::new().unwrap();
        let reports = dir.path().join("reports");
        fs::create_dir_all(&reports).unwrap();
        fs::write(
            reports.join("screen_20251020.csv"),
            "symbol,name_jp,market,market_cap,score_0to7,official_score,official_applicable,notes\n\
             1111.T,成長商事,プライム,120000000000,7,8,8,\n\
             2222.T,停滞工業,スタンダード,,2,3,8,\n",
        )
        .unwrap();
        fs::write(
            reports.join("screen_20251001.csv"),
            "symbol,score_0to7\n3333.T,7\n",
        )
        .unwrap();
        let ini = write_temp_ini(&local_config(dir.path()));

        let exit = run(&[
            "weekly",
            "--config",
            ini.path().to_str().unwrap(),
            "--as-of-date",
            "20251022",
        ]);
        assert_eq!(code(exit), success());

        let md = fs::read_to_string(reports.join("weekly_summary_20251022.md")).unwrap();
        assert!(md.contains("- 抽出銘柄数（スコア（新高値））: 1"));
        assert!(md.contains("- 抽出銘柄数（スコア（株の公式））: 1"));
        assert!(md.contains("|2025-10-20|1111.T|成長商事|プライム|7/7|1200億|"));
        assert!(!md.contains("3333.T"));
        assert!(!md.contains("2222.T"));
    }

    #[test]
    fn reports_dir_flag_overrides_config() {
        let dir = TempDir::new().unwrap();
        let elsewhere = dir.path().join("elsewhere");
        let exit = run(&[
            "weekly",
            "--reports-dir",
            elsewhere.to_str().unwrap(),
            "--as-of-date",
            "20251022",
            "--days",
            "3",
        ]);
        assert_eq!(code(exit), success());
        let md = fs::read_to_string(elsewhere.join("weekly_summary_20251022.md")).unwrap();
        assert!(md.contains("- 期間: 2025-10-20 〜 2025-10-22 (JST)"));
        assert!(md.contains("> 該当なし"));
    }
}

mod sources {
    use super::*;
    use takane::adapters::http::BlockingHttpClient;
    use takane::domain::record::SourceTag;

    #[test]
    fn us_market_defaults() {
        let config = FileConfigAdapter::from_string("[screen]\nmarket = us\n").unwrap();
        let settings = ScreenSettings::from_config(&config, None).unwrap();
        assert_eq!(settings.market, Market::Us);
        assert_eq!(settings.sources, vec![SourceTag::Local, SourceTag::AlphaVantage]);
        assert!(settings.reports_dir.ends_with("reports/us"));
    }

    #[test]
    fn configured_key_builds_alpha_vantage() {
        let config = FileConfigAdapter::from_string(
            "[alpha_vantage]\napi_key = demo\nthrottle_seconds = 0\n",
        )
        .unwrap();
        let source_settings = SourceSettings::from_config(&config);
        let http = BlockingHttpClient::new("takane-test", std::time::Duration::from_secs(1)).unwrap();
        let sources = cli::build_sources(
            &[SourceTag::Kabutan, SourceTag::YahooJp, SourceTag::AlphaVantage],
            &source_settings,
            &http,
        )
        .unwrap();
        let tags: Vec<_> = sources.iter().map(|s| s.tag()).collect();
        assert_eq!(
            tags,
            vec![SourceTag::Kabutan, SourceTag::YahooJp, SourceTag::AlphaVantage]
        );
    }

    #[test]
    fn missing_config_file_is_a_parse_error() {
        let err = cli::load_config(Some(Path::new("/nonexistent/takane.ini"))).unwrap_err();
        assert!(matches!(err, ScreenerError::ConfigParse { .. }));
    }
}
