//! Financial data source port trait.

use crate::domain::error::ScreenerError;
use crate::domain::record::{AnnualRecord, CompanyInfo, QuarterlyRecord, SourceTag};

/// One provider of per-symbol financial records.
///
/// Implementations return an empty list when they simply have nothing for a
/// symbol; `Err` is reserved for transport or payload failures. The
/// aggregator downgrades those to empty results, so a source never aborts a
/// screening run.
pub trait FinancialSource {
    fn tag(&self) -> SourceTag;

    fn annual(&self, symbol: &str) -> Result<Vec<AnnualRecord>, ScreenerError>;

    fn quarterly(&self, symbol: &str) -> Result<Vec<QuarterlyRecord>, ScreenerError>;

    /// Sources without company metadata keep the default.
    fn company_info(&self, _symbol: &str) -> Result<Option<CompanyInfo>, ScreenerError> {
        Ok(None)
    }
}

impl<T: FinancialSource + ?Sized> FinancialSource for &T {
    fn tag(&self) -> SourceTag {
        (**self).tag()
    }

    fn annual(&self, symbol: &str) -> Result<Vec<AnnualRecord>, ScreenerError> {
        (**self).annual(symbol)
    }

    fn quarterly(&self, symbol: &str) -> Result<Vec<QuarterlyRecord>, ScreenerError> {
        (**self).quarterly(symbol)
    }

    fn company_info(&self, symbol: &str) -> Result<Option<CompanyInfo>, ScreenerError> {
        (**self).company_info(symbol)
    }
}
