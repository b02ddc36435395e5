//! CLI definition and dispatch.

use std::env;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use chrono::{FixedOffset, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use tracing::{error, info};

use crate::adapters::alpha_vantage::AlphaVantageSource;
use crate::adapters::csv_report::CsvReportAdapter;
use crate::adapters::csv_source::CsvSource;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::http::BlockingHttpClient;
use crate::adapters::kabutan::KabutanSource;
use crate::adapters::markdown_report::{MarkdownReportAdapter, percent};
use crate::adapters::weekly_report::{WeeklyReportAdapter, load_window};
use crate::adapters::yahoo_jp::YahooJapanSource;
use crate::domain::aggregator::FinancialDataProvider;
use crate::domain::error::ScreenerError;
use crate::domain::record::{FinancialRecord, SourceTag};
use crate::domain::scoring::{MOMENTUM_LABEL_MAX, MomentumCheck, QualityRule, RuleOutcome};
use crate::domain::screen::{RetryPolicy, run_screen, screen_symbol};
use crate::domain::settings::{Market, ScreenSettings, SourceSettings, WeeklySettings};
use crate::domain::symbols::load_symbols;
use crate::domain::weekly::build_summary;
use crate::ports::report_port::ReportPort;
use crate::ports::source_port::FinancialSource;

const JST_OFFSET_SECS: i32 = 9 * 3600;
const ALPHA_VANTAGE_KEY_ENV: &str = "ALPHAVANTAGE_KEY";

#[derive(Parser, Debug)]
#[command(name = "takane", about = "Fundamentals screener for 52-week-high stocks")]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the daily screen and write CSV and Markdown reports
    Screen {
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(long)]
        market: Option<Market>,
        #[arg(long)]
        symbols: Option<PathBuf>,
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
        #[arg(long)]
        max_symbols: Option<usize>,
        #[arg(long)]
        dry_run: bool,
    },
    /// Fetch and score a single symbol
    Inspect {
        #[arg(short, long)]
        symbol: String,
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(long)]
        market: Option<Market>,
    },
    /// Summarize the daily reports of the trailing week
    Weekly {
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(long)]
        reports_dir: Option<PathBuf>,
        /// JST date in YYYYMMDD form; defaults to today
        #[arg(long, value_parser = parse_compact_date)]
        as_of_date: Option<NaiveDate>,
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        days: Option<u32>,
        #[arg(long)]
        prefix: Option<String>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    init_tracing(cli.verbose);

    let result = match cli.command {
        Command::Screen {
            config,
            market,
            symbols,
            output_dir,
            max_symbols,
            dry_run,
        } => load_config(config.as_deref()).and_then(|config| {
            let mut settings = ScreenSettings::from_config(&config, market)?;
            if let Some(path) = symbols {
                settings.symbols_path = path;
            }
            if let Some(dir) = output_dir {
                settings.reports_dir = dir;
            }
            if let Some(max) = max_symbols {
                settings.max_symbols = max;
            }
            let sources = SourceSettings::from_config(&config);
            if dry_run {
                run_dry_run(&settings, &sources)
            } else {
                run_daily(&settings, &sources)
            }
        }),
        Command::Inspect {
            symbol,
            config,
            market,
        } => load_config(config.as_deref()).and_then(|config| {
            let settings = ScreenSettings::from_config(&config, market)?;
            run_inspect(&symbol, &settings, &SourceSettings::from_config(&config))
        }),
        Command::Weekly {
            config,
            reports_dir,
            as_of_date,
            days,
            prefix,
        } => load_config(config.as_deref()).and_then(|config| {
            let screen = ScreenSettings::from_config(&config, None)?;
            let mut weekly = WeeklySettings::from_config(&config)?;
            if let Some(days) = days {
                weekly.days = days;
            }
            run_weekly(
                &weekly,
                screen.market,
                &reports_dir.unwrap_or(screen.reports_dir),
                as_of_date.unwrap_or_else(jst_today),
                prefix.as_deref(),
            )
        }),
        Command::Validate { config } => run_validate(&config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "command failed");
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "takane=debug" } else { "takane=info" };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

fn parse_compact_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, "%Y%m%d")
        .map_err(|e| format!("expected YYYYMMDD, got {:?}: {}", value, e))
}

pub fn jst_today() -> NaiveDate {
    let now = Utc::now();
    match FixedOffset::east_opt(JST_OFFSET_SECS) {
        Some(jst) => now.with_timezone(&jst).date_naive(),
        None => now.date_naive(),
    }
}

/// Load the INI file, or run on built-in defaults when none is given.
pub fn load_config(path: Option<&Path>) -> Result<FileConfigAdapter, ScreenerError> {
    match path {
        Some(path) => {
            info!(path = %path.display(), "loading config");
            FileConfigAdapter::from_file(path)
        }
        None => Ok(FileConfigAdapter::empty()),
    }
}

fn alpha_vantage_key(settings: &SourceSettings) -> Result<String, ScreenerError> {
    settings
        .alpha_vantage_key
        .clone()
        .or_else(|| {
            env::var(ALPHA_VANTAGE_KEY_ENV)
                .ok()
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty())
        })
        .ok_or_else(|| ScreenerError::ConfigMissing {
            section: "alpha_vantage".into(),
            key: "api_key".into(),
        })
}

/// Instantiate the enabled sources in configured order.
pub fn build_sources<'a>(
    tags: &[SourceTag],
    settings: &SourceSettings,
    http: &'a BlockingHttpClient,
) -> Result<Vec<Box<dyn FinancialSource + 'a>>, ScreenerError> {
    let mut sources: Vec<Box<dyn FinancialSource + 'a>> = Vec::with_capacity(tags.len());
    for tag in tags {
        let source: Box<dyn FinancialSource + 'a> = match tag {
            SourceTag::Local => Box::new(CsvSource::new(settings.data_dir.clone())),
            SourceTag::Kabutan => Box::new(KabutanSource::new(http)),
            SourceTag::YahooJp => Box::new(YahooJapanSource::new(http)),
            SourceTag::AlphaVantage => Box::new(AlphaVantageSource::new(
                http,
                alpha_vantage_key(settings)?,
                settings.alpha_vantage_throttle,
            )),
        };
        sources.push(source);
    }
    Ok(sources)
}

fn tag_list(tags: &[SourceTag]) -> String {
    tags.iter()
        .map(SourceTag::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

fn report_path(settings: &ScreenSettings, date: &str, extension: &str) -> PathBuf {
    settings.reports_dir.join(format!(
        "{}_{}.{}",
        settings.market.report_prefix(),
        date,
        extension
    ))
}

fn run_dry_run(settings: &ScreenSettings, sources: &SourceSettings) -> Result<(), ScreenerError> {
    if settings.sources.contains(&SourceTag::AlphaVantage) {
        alpha_vantage_key(sources)?;
    }
    let symbols = load_symbols(&settings.symbols_path, settings.max_symbols)?;
    let date = jst_today().format("%Y%m%d").to_string();

    eprintln!("Config validated successfully");
    eprintln!("\nPlan:");
    eprintln!("  market:       {}", settings.market);
    eprintln!(
        "  symbols:      {} ({} after limit {})",
        settings.symbols_path.display(),
        symbols.len(),
        settings.max_symbols
    );
    eprintln!("  sources:      {}", tag_list(&settings.sources));
    eprintln!("  priority:     {}", tag_list(settings.priority.tags()));
    eprintln!(
        "  retry:        {} attempts, {:.1}s apart",
        settings.retry_attempts,
        settings.retry_delay.as_secs_f64()
    );
    eprintln!("  symbol delay: {:.1}s", settings.symbol_delay.as_secs_f64());
    eprintln!("  csv report:   {}", report_path(settings, &date, "csv").display());
    eprintln!("  md report:    {}", report_path(settings, &date, "md").display());
    eprintln!("\nDry run complete: configuration is valid");
    Ok(())
}

fn run_daily(settings: &ScreenSettings, source_settings: &SourceSettings) -> Result<(), ScreenerError> {
    let date = jst_today().format("%Y%m%d").to_string();
    let symbols = load_symbols(&settings.symbols_path, settings.max_symbols)?;
    let writers: [Box<dyn ReportPort>; 2] = [
        Box::new(CsvReportAdapter::new()),
        Box::new(MarkdownReportAdapter::new(settings.market)),
    ];

    let outcome = if symbols.is_empty() {
        info!("no symbols to screen; writing empty reports");
        Default::default()
    } else {
        let http = BlockingHttpClient::new(&source_settings.user_agent, source_settings.http_timeout)?;
        let sources = build_sources(&settings.sources, source_settings, &http)?;
        let provider = FinancialDataProvider::new(sources, settings.priority.clone());
        info!(
            symbols = symbols.len(),
            sources = provider.source_count(),
            market = %settings.market,
            "starting screen"
        );
        run_screen(&provider, &symbols, settings, None)
    };

    let report = outcome.into_report(&date, settings.market.provenance());
    for writer in &writers {
        let path = report_path(settings, &date, writer.extension());
        writer.write(&report, &path)?;
        eprintln!("Saved: {}", path.display());
    }
    Ok(())
}

fn optional<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".into())
}

fn print_timeline<R: FinancialRecord>(title: &str, records: &[R]) {
    println!("\n{} ({} periods)", title, records.len());
    for r in records {
        println!(
            "  {:<10} {}  revenue={:<16} income={:<16} [{}]",
            r.period_label(),
            r.end_date(),
            optional(r.revenue()),
            optional(r.ordinary_income()),
            r.source()
        );
    }
}

fn run_inspect(
    symbol: &str,
    settings: &ScreenSettings,
    source_settings: &SourceSettings,
) -> Result<(), ScreenerError> {
    let http = BlockingHttpClient::new(&source_settings.user_agent, source_settings.http_timeout)?;
    let sources = build_sources(&settings.sources, source_settings, &http)?;
    let provider = FinancialDataProvider::new(sources, settings.priority.clone());
    let retry = RetryPolicy {
        attempts: settings.retry_attempts,
        delay: settings.retry_delay,
    };
    let evaluation = screen_symbol(&provider, symbol, retry);

    println!("{}", symbol);
    println!(
        "  sources={} priority={}",
        tag_list(&settings.sources),
        tag_list(provider.priority().tags())
    );
    if let Some(info) = &evaluation.info {
        println!(
            "  name={} market={} per={} market_cap={} [{}]",
            optional(info.name.as_deref()),
            optional(info.market.as_deref()),
            optional(info.per),
            optional(info.market_cap),
            optional(info.source)
        );
    } else {
        println!("  no company info");
    }
    print_timeline("Annual", evaluation.annual.records());
    print_timeline("Quarterly", evaluation.quarterly.records());

    let annual = &evaluation.annual_checks;
    let quarterly = &evaluation.quarterly_checks;
    println!("\nAnnual checks");
    println!("  last1_yoy={} last2_cagr={}", percent(annual.last1_yoy, "-"), percent(annual.last2_cagr, "-"));
    println!("  avg_growth={}", percent(annual.avg_growth, "-"));
    println!("\nQuarterly checks");
    println!(
        "  pretax_yoy={} revenue_yoy={} gaps={}",
        percent(quarterly.last_profit_yoy(), "-"),
        percent(quarterly.last_revenue_yoy(), "-"),
        quarterly.has_gaps
    );

    let card = &evaluation.card;
    println!("\nMomentum {}/{}", card.momentum.score, MOMENTUM_LABEL_MAX);
    for check in MomentumCheck::ALL {
        let mark = if card.momentum.passed(check) { "ok" } else { "--" };
        println!("  [{}] {:?}", mark, check);
    }
    println!("\nQuality {}/{}", card.quality.score, card.quality.applicable);
    for rule in QualityRule::ALL {
        let mark = match card.quality.outcome(rule) {
            RuleOutcome::Pass => "ok",
            RuleOutcome::Fail => "--",
            RuleOutcome::Inapplicable => "n/a",
        };
        println!("  [{}] {}", mark, rule.column());
    }
    if !card.notes.is_empty() {
        println!("\nNotes: {}", card.notes);
    }
    Ok(())
}

fn run_weekly(
    settings: &WeeklySettings,
    market: Market,
    reports_dir: &Path,
    as_of: NaiveDate,
    prefix: Option<&str>,
) -> Result<(), ScreenerError> {
    let market = match prefix {
        Some(p) if p == Market::Us.report_prefix() => Market::Us,
        Some(p) if p == Market::Jp.report_prefix() => Market::Jp,
        _ => market,
    };
    let prefix = prefix.unwrap_or(market.report_prefix());

    let rows = load_window(reports_dir, prefix, as_of, settings.days)?;
    let summary = build_summary(&rows, settings);
    info!(
        rows = rows.len(),
        new_high = summary.new_high.len(),
        official = summary.official.len(),
        "weekly summary built"
    );

    let adapter = WeeklyReportAdapter::new(settings.clone(), market == Market::Jp);
    let path = adapter.write(&summary, as_of, reports_dir)?;
    eprintln!("Saved: {}", path.display());
    Ok(())
}

fn run_validate(config_path: &Path) -> Result<(), ScreenerError> {
    eprintln!("Validating config: {}", config_path.display());
    let config = FileConfigAdapter::from_file(config_path)?;
    let screen = ScreenSettings::from_config(&config, None)?;
    let weekly = WeeklySettings::from_config(&config)?;

    eprintln!("\n[screen]");
    eprintln!("  market:   {}", screen.market);
    eprintln!("  sources:  {}", tag_list(&screen.sources));
    eprintln!("  priority: {}", tag_list(screen.priority.tags()));
    eprintln!("\n[weekly]");
    eprintln!(
        "  days: {}, new high >= {}/{}, official >= {:.0}%",
        weekly.days,
        weekly.new_high_threshold,
        MOMENTUM_LABEL_MAX,
        weekly.official_ratio_threshold * 100.0
    );
    eprintln!("\nConfiguration is valid.");
    Ok(())
}
