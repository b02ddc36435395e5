//! Domain error types.

use crate::domain::record::SourceTag;

/// Top-level error type for takane.
#[derive(Debug, thiserror::Error)]
pub enum ScreenerError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("{provider} failed for {symbol}: {reason}")]
    Source {
        provider: SourceTag,
        symbol: String,
        reason: String,
    },

    #[error("parse error: {reason}")]
    Parse { reason: String },

    #[error("failed to write report {path}: {reason}")]
    Report { path: String, reason: String },

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ScreenerError {
    pub fn source_failure(
        provider: SourceTag,
        symbol: &str,
        reason: impl Into<String>,
    ) -> Self {
        ScreenerError::Source {
            provider,
            symbol: symbol.to_string(),
            reason: reason.into(),
        }
    }

    pub fn parse(reason: impl Into<String>) -> Self {
        ScreenerError::Parse {
            reason: reason.into(),
        }
    }
}

impl From<&ScreenerError> for std::process::ExitCode {
    fn from(err: &ScreenerError) -> Self {
        let code: u8 = match err {
            ScreenerError::Io(_) => 1,
            ScreenerError::ConfigParse { .. }
            | ScreenerError::ConfigMissing { .. }
            | ScreenerError::ConfigInvalid { .. } => 2,
            ScreenerError::Source { .. } => 3,
            ScreenerError::Parse { .. } | ScreenerError::Csv(_) => 4,
            ScreenerError::Report { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_failure_display_names_provider_and_symbol() {
        let err = ScreenerError::source_failure(SourceTag::Kabutan, "5032.T", "HTTP 503");
        assert_eq!(err.to_string(), "kabutan failed for 5032.T: HTTP 503");
    }

    #[test]
    fn config_errors_share_exit_code() {
        let missing = ScreenerError::ConfigMissing {
            section: "alpha_vantage".into(),
            key: "api_key".into(),
        };
        let invalid = ScreenerError::ConfigInvalid {
            section: "screen".into(),
            key: "market".into(),
            reason: "unknown market".into(),
        };
        assert_eq!(
            format!("{:?}", std::process::ExitCode::from(&missing)),
            format!("{:?}", std::process::ExitCode::from(2u8))
        );
        assert_eq!(
            format!("{:?}", std::process::ExitCode::from(&invalid)),
            format!("{:?}", std::process::ExitCode::from(2u8))
        );
    }
}
