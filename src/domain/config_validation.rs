//! Configuration validation.
//!
//! Runs before any fetch so a bad config never produces a partial report.

use crate::domain::error::ScreenerError;
use crate::domain::record::parse_source_list;
use crate::domain::settings::Market;
use crate::ports::config_port::ConfigPort;

pub fn validate_screen_config(config: &dyn ConfigPort) -> Result<(), ScreenerError> {
    validate_market(config)?;
    validate_max_symbols(config)?;
    validate_retry(config)?;
    validate_delays(config)?;
    validate_digest_min_score(config)?;
    validate_sources(config)?;
    validate_http(config)?;
    validate_alpha_vantage(config)?;
    Ok(())
}

pub fn validate_weekly_config(config: &dyn ConfigPort) -> Result<(), ScreenerError> {
    validate_weekly_days(config)?;
    validate_new_high_threshold(config)?;
    validate_official_ratio(config)?;
    Ok(())
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> ScreenerError {
    ScreenerError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn validate_market(config: &dyn ConfigPort) -> Result<(), ScreenerError> {
    match config.get_string("screen", "market") {
        Some(value) if !value.trim().is_empty() => value
            .parse::<Market>()
            .map(|_| ())
            .map_err(|reason| invalid("screen", "market", reason)),
        _ => Ok(()),
    }
}

fn validate_max_symbols(config: &dyn ConfigPort) -> Result<(), ScreenerError> {
    let value = config.get_int("screen", "max_symbols", 60);
    if value < 0 {
        return Err(invalid(
            "screen",
            "max_symbols",
            "max_symbols must be non-negative",
        ));
    }
    Ok(())
}

fn validate_retry(config: &dyn ConfigPort) -> Result<(), ScreenerError> {
    let value = config.get_int("screen", "retry_attempts", 3);
    if value < 1 {
        return Err(invalid(
            "screen",
            "retry_attempts",
            "retry_attempts must be at least 1",
        ));
    }
    Ok(())
}

fn validate_delays(config: &dyn ConfigPort) -> Result<(), ScreenerError> {
    for key in ["retry_delay_seconds", "symbol_delay_seconds"] {
        if config.get_double("screen", key, 0.0) < 0.0 {
            return Err(invalid("screen", key, format!("{} must be non-negative", key)));
        }
    }
    Ok(())
}

fn validate_digest_min_score(config: &dyn ConfigPort) -> Result<(), ScreenerError> {
    let value = config.get_int("screen", "digest_min_score", 3);
    if !(0..=8).contains(&value) {
        return Err(invalid(
            "screen",
            "digest_min_score",
            "digest_min_score must be between 0 and 8",
        ));
    }
    Ok(())
}

fn validate_sources(config: &dyn ConfigPort) -> Result<(), ScreenerError> {
    if let Some(value) = config.get_string("screen", "sources") {
        let tags = parse_source_list(&value).map_err(|reason| invalid("screen", "sources", reason))?;
        if tags.is_empty() {
            return Err(invalid(
                "screen",
                "sources",
                "at least one source must be enabled",
            ));
        }
    }
    if let Some(value) = config.get_string("screen", "source_priority") {
        parse_source_list(&value).map_err(|reason| invalid("screen", "source_priority", reason))?;
    }
    Ok(())
}

fn validate_http(config: &dyn ConfigPort) -> Result<(), ScreenerError> {
    if config.get_double("http", "timeout_seconds", 30.0) <= 0.0 {
        return Err(invalid(
            "http",
            "timeout_seconds",
            "timeout_seconds must be positive",
        ));
    }
    Ok(())
}

fn validate_alpha_vantage(config: &dyn ConfigPort) -> Result<(), ScreenerError> {
    if config.get_double("alpha_vantage", "throttle_seconds", 13.0) < 0.0 {
        return Err(invalid(
            "alpha_vantage",
            "throttle_seconds",
            "throttle_seconds must be non-negative",
        ));
    }
    Ok(())
}

fn validate_weekly_days(config: &dyn ConfigPort) -> Result<(), ScreenerError> {
    if config.get_int("weekly", "days", 7) < 1 {
        return Err(invalid("weekly", "days", "days must be at least 1"));
    }
    Ok(())
}

fn validate_new_high_threshold(config: &dyn ConfigPort) -> Result<(), ScreenerError> {
    let value = config.get_int("weekly", "new_high_threshold", 6);
    if !(0..=8).contains(&value) {
        return Err(invalid(
            "weekly",
            "new_high_threshold",
            "new_high_threshold must be between 0 and 8",
        ));
    }
    Ok(())
}

fn validate_official_ratio(config: &dyn ConfigPort) -> Result<(), ScreenerError> {
    let value = config.get_double("weekly", "official_ratio_threshold", 0.75);
    if value <= 0.0 || value > 1.0 {
        return Err(invalid(
            "weekly",
            "official_ratio_threshold",
            "official_ratio_threshold must be in (0, 1]",
        ));
    }
    Ok(())
}
