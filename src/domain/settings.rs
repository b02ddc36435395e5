//! Typed run settings resolved from configuration, with market-specific
//! defaults.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::domain::config_validation::{validate_screen_config, validate_weekly_config};
use crate::domain::error::ScreenerError;
use crate::domain::reconcile::SourcePriority;
use crate::domain::record::{SourceTag, parse_source_list};
use crate::ports::config_port::ConfigPort;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Market {
    Jp,
    Us,
}

impl Market {
    pub fn as_str(&self) -> &'static str {
        match self {
            Market::Jp => "jp",
            Market::Us => "us",
        }
    }

    pub fn default_symbols_path(&self) -> &'static str {
        match self {
            Market::Jp => "config/symbols.txt",
            Market::Us => "config/symbols_us.txt",
        }
    }

    pub fn default_reports_dir(&self) -> &'static str {
        match self {
            Market::Jp => "reports",
            Market::Us => "reports/us",
        }
    }

    pub fn default_sources(&self) -> Vec<SourceTag> {
        match self {
            Market::Jp => vec![SourceTag::Local, SourceTag::Kabutan, SourceTag::YahooJp],
            Market::Us => vec![SourceTag::Local, SourceTag::AlphaVantage],
        }
    }

    /// File name prefix of daily reports, e.g. `screen_us`.
    pub fn report_prefix(&self) -> &'static str {
        match self {
            Market::Jp => "screen",
            Market::Us => "screen_us",
        }
    }

    pub fn provenance(&self) -> &'static str {
        match self {
            Market::Jp => "※ データ出典: Yahoo!ファイナンス / 株探（かぶたん）。",
            Market::Us => "※ データ出典: Alpha Vantage。",
        }
    }
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Market {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "jp" => Ok(Market::Jp),
            "us" => Ok(Market::Us),
            other => Err(format!("unknown market: {} (expected jp or us)", other)),
        }
    }
}

/// Settings for one daily screening run.
#[derive(Debug, Clone, PartialEq)]
pub struct ScreenSettings {
    pub market: Market,
    pub symbols_path: PathBuf,
    pub reports_dir: PathBuf,
    pub max_symbols: usize,
    pub sources: Vec<SourceTag>,
    pub priority: SourcePriority,
    pub retry_attempts: u32,
    pub retry_delay: Duration,
    pub symbol_delay: Duration,
    pub digest_min_score: u8,
}

fn seconds(config: &dyn ConfigPort, section: &str, key: &str, default: f64) -> Duration {
    Duration::from_secs_f64(config.get_double(section, key, default).max(0.0))
}

fn source_list(
    config: &dyn ConfigPort,
    key: &str,
    default: Vec<SourceTag>,
) -> Result<Vec<SourceTag>, ScreenerError> {
    match config.get_string("screen", key) {
        Some(value) => parse_source_list(&value).map_err(|reason| ScreenerError::ConfigInvalid {
            section: "screen".into(),
            key: key.into(),
            reason,
        }),
        None => Ok(default),
    }
}

impl ScreenSettings {
    /// Validate and resolve the `[screen]` section. `market` overrides the
    /// configured market before market-specific defaults are applied.
    pub fn from_config(
        config: &dyn ConfigPort,
        market: Option<Market>,
    ) -> Result<Self, ScreenerError> {
        validate_screen_config(config)?;

        let market = match market {
            Some(m) => m,
            None => config
                .get_string_or("screen", "market", Market::Jp.as_str())
                .parse()
                .map_err(|reason| ScreenerError::ConfigInvalid {
                    section: "screen".into(),
                    key: "market".into(),
                    reason,
                })?,
        };

        Ok(Self {
            market,
            symbols_path: config
                .get_string_or("screen", "symbols_path", market.default_symbols_path())
                .into(),
            reports_dir: config
                .get_string_or("screen", "reports_dir", market.default_reports_dir())
                .into(),
            max_symbols: config.get_int("screen", "max_symbols", 60).max(0) as usize,
            sources: source_list(config, "sources", market.default_sources())?,
            priority: SourcePriority::new(source_list(
                config,
                "source_priority",
                vec![SourceTag::YahooJp],
            )?),
            retry_attempts: config.get_int("screen", "retry_attempts", 3).max(1) as u32,
            retry_delay: seconds(config, "screen", "retry_delay_seconds", 5.0),
            symbol_delay: seconds(config, "screen", "symbol_delay_seconds", 1.0),
            digest_min_score: config.get_int("screen", "digest_min_score", 3).clamp(0, 8) as u8,
        })
    }
}

/// Settings shared by the data source adapters.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceSettings {
    pub data_dir: PathBuf,
    pub http_timeout: Duration,
    pub user_agent: String,
    pub alpha_vantage_key: Option<String>,
    pub alpha_vantage_throttle: Duration,
}

impl SourceSettings {
    pub fn from_config(config: &dyn ConfigPort) -> Self {
        Self {
            data_dir: config.get_string_or("local", "data_dir", "data").into(),
            http_timeout: seconds(config, "http", "timeout_seconds", 30.0),
            user_agent: config.get_string_or("http", "user_agent", DEFAULT_USER_AGENT),
            alpha_vantage_key: config
                .get_string("alpha_vantage", "api_key")
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty()),
            alpha_vantage_throttle: seconds(config, "alpha_vantage", "throttle_seconds", 13.0),
        }
    }
}

/// Settings for the weekly rollup.
#[derive(Debug, Clone, PartialEq)]
pub struct WeeklySettings {
    pub days: u32,
    pub new_high_threshold: u8,
    pub official_ratio_threshold: f64,
}

impl Default for WeeklySettings {
    fn default() -> Self {
        Self {
            days: 7,
            new_high_threshold: 6,
            official_ratio_threshold: 0.75,
        }
    }
}

impl WeeklySettings {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, ScreenerError> {
        validate_weekly_config(config)?;
        let defaults = Self::default();
        Ok(Self {
            days: config.get_int("weekly", "days", defaults.days as i64).max(1) as u32,
            new_high_threshold: config
                .get_int("weekly", "new_high_threshold", defaults.new_high_threshold as i64)
                .clamp(0, 8) as u8,
            official_ratio_threshold: config.get_double(
                "weekly",
                "official_ratio_threshold",
                defaults.official_ratio_threshold,
            ),
        })
    }
}
