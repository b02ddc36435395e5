//! Fan-out over the configured sources with failure isolation.

use std::cell::RefCell;
use std::collections::HashMap;

use tracing::{debug, warn};

use crate::domain::error::ScreenerError;
use crate::domain::reconcile::{SourcePriority, Timeline, merge_records};
use crate::domain::record::{AnnualRecord, CompanyInfo, QuarterlyRecord};
use crate::ports::source_port::FinancialSource;

/// Queries every source in call order and reconciles the results. A failing
/// source is logged and contributes nothing.
pub struct FinancialDataProvider<'a> {
    sources: Vec<Box<dyn FinancialSource + 'a>>,
    priority: SourcePriority,
    info_cache: RefCell<HashMap<String, CompanyInfo>>,
}

impl<'a> FinancialDataProvider<'a> {
    pub fn new(sources: Vec<Box<dyn FinancialSource + 'a>>, priority: SourcePriority) -> Self {
        Self {
            sources,
            priority,
            info_cache: RefCell::new(HashMap::new()),
        }
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    pub fn priority(&self) -> &SourcePriority {
        &self.priority
    }

    fn collect<R>(
        &self,
        symbol: &str,
        kind: &str,
        fetch: impl Fn(&dyn FinancialSource) -> Result<Vec<R>, ScreenerError>,
    ) -> Vec<Vec<R>> {
        self.sources
            .iter()
            .map(|source| match fetch(source.as_ref()) {
                Ok(records) => {
                    debug!(source = %source.tag(), symbol, kind, count = records.len(), "fetched records");
                    records
                }
                Err(e) => {
                    warn!(source = %source.tag(), symbol, kind, error = %e, "source failed, skipping");
                    Vec::new()
                }
            })
            .collect()
    }

    pub fn get_annual(&self, symbol: &str) -> Timeline<AnnualRecord> {
        let sets = self.collect(symbol, "annual", |s| s.annual(symbol));
        merge_records(&self.priority, sets)
    }

    pub fn get_quarterly(&self, symbol: &str) -> Timeline<QuarterlyRecord> {
        let sets = self.collect(symbol, "quarterly", |s| s.quarterly(symbol));
        merge_records(&self.priority, sets)
    }

    /// First source (in call order) that knows the company wins. Only hits
    /// are cached, so a later retry can still find the company.
    pub fn get_company_info(&self, symbol: &str) -> Option<CompanyInfo> {
        if let Some(info) = self.info_cache.borrow().get(symbol) {
            return Some(info.clone());
        }

        for source in &self.sources {
            match source.company_info(symbol) {
                Ok(Some(info)) => {
                    self.info_cache
                        .borrow_mut()
                        .insert(symbol.to_string(), info.clone());
                    return Some(info);
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(source = %source.tag(), symbol, error = %e, "company info lookup failed");
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::record::SourceTag;
    use chrono::NaiveDate;
    use std::cell::Cell;

    struct StubSource {
        tag: SourceTag,
        annual: Result<Vec<AnnualRecord>, String>,
        info: Option<CompanyInfo>,
        info_calls: Cell<usize>,
    }

    impl StubSource {
        fn new(tag: SourceTag) -> Self {
            Self {
                tag,
                annual: Ok(Vec::new()),
                info: None,
                info_calls: Cell::new(0),
            }
        }
    }

    impl FinancialSource for StubSource {
        fn tag(&self) -> SourceTag {
            self.tag
        }

        fn annual(&self, symbol: &str) -> Result<Vec<AnnualRecord>, ScreenerError> {
            self.annual
                .clone()
                .map_err(|reason| ScreenerError::source_failure(self.tag, symbol, reason))
        }

        fn quarterly(&self, _symbol: &str) -> Result<Vec<QuarterlyRecord>, ScreenerError> {
            Ok(Vec::new())
        }

        fn company_info(&self, _symbol: &str) -> Result<Option<CompanyInfo>, ScreenerError> {
            self.info_calls.set(self.info_calls.get() + 1);
            Ok(self.info.clone())
        }
    }

    fn record(year: i32, income: f64, source: SourceTag) -> AnnualRecord {
        AnnualRecord {
            period_label: year.to_string(),
            end_date: NaiveDate::from_ymd_opt(year, 3, 31).unwrap(),
            revenue: Some(1000.0),
            ordinary_income: Some(income),
            scope: None,
            accounting_standard: None,
            unit: "JPY".into(),
            source,
            is_forecast: false,
        }
    }

    #[test]
    fn failing_source_is_skipped() {
        let mut broken = StubSource::new(SourceTag::Kabutan);
        broken.annual = Err("HTTP 503".into());
        let mut yahoo = StubSource::new(SourceTag::YahooJp);
        yahoo.annual = Ok(vec![record(2024, 10.0, SourceTag::YahooJp)]);

        let provider = FinancialDataProvider::new(
            vec![Box::new(&broken), Box::new(&yahoo)],
            SourcePriority::default(),
        );
        let timeline = provider.get_annual("7203.T");
        assert_eq!(timeline.len(), 1);
        assert_eq!(timeline.records()[0].source, SourceTag::YahooJp);
    }

    #[test]
    fn records_are_merged_with_priority() {
        let mut kabutan = StubSource::new(SourceTag::Kabutan);
        kabutan.annual = Ok(vec![
            record(2024, 10.0, SourceTag::Kabutan),
            record(2023, 8.0, SourceTag::Kabutan),
        ]);
        let mut yahoo = StubSource::new(SourceTag::YahooJp);
        yahoo.annual = Ok(vec![record(2024, 11.0, SourceTag::YahooJp)]);

        let provider = FinancialDataProvider::new(
            vec![Box::new(&kabutan), Box::new(&yahoo)],
            SourcePriority::default(),
        );
        let timeline = provider.get_annual("7203.T");
        assert_eq!(timeline.len(), 2);
        assert_eq!(timeline.records()[0].ordinary_income, Some(11.0));
        assert_eq!(timeline.records()[1].source, SourceTag::Kabutan);
    }

    #[test]
    fn company_info_first_hit_wins_and_is_cached() {
        let local = StubSource::new(SourceTag::Local);
        let mut kabutan = StubSource::new(SourceTag::Kabutan);
        kabutan.info = Some(CompanyInfo {
            symbol: "7203.T".into(),
            name: Some("トヨタ自動車".into()),
            ..CompanyInfo::default()
        });

        let provider = FinancialDataProvider::new(
            vec![Box::new(&local), Box::new(&kabutan)],
            SourcePriority::default(),
        );
        let first = provider.get_company_info("7203.T").unwrap();
        let second = provider.get_company_info("7203.T").unwrap();
        assert_eq!(first, second);
        assert_eq!(kabutan.info_calls.get(), 1);
        assert_eq!(local.info_calls.get(), 1);
    }

    #[test]
    fn company_info_miss_is_not_cached() {
        let local = StubSource::new(SourceTag::Local);
        let provider =
            FinancialDataProvider::new(vec![Box::new(&local)], SourcePriority::default());
        assert_eq!(provider.get_company_info("0000.T"), None);
        assert_eq!(provider.get_company_info("0000.T"), None);
        assert_eq!(local.info_calls.get(), 2);
    }

    #[test]
    fn exposes_configured_priority() {
        let priority = SourcePriority::new(vec![SourceTag::Kabutan, SourceTag::YahooJp]);
        let provider = FinancialDataProvider::new(Vec::new(), priority.clone());
        assert_eq!(provider.priority(), &priority);
        assert_eq!(provider.priority().tags(), &[SourceTag::Kabutan, SourceTag::YahooJp]);
    }

    #[test]
    fn no_sources_yield_empty_results() {
        let provider = FinancialDataProvider::new(Vec::new(), SourcePriority::default());
        assert!(provider.get_annual("7203.T").is_empty());
        assert!(provider.get_quarterly("7203.T").is_empty());
        assert_eq!(provider.get_company_info("7203.T"), None);
    }
}
