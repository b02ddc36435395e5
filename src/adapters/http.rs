//! Shared blocking HTTP transport for the web sources.

use std::collections::HashMap;
use std::time::Duration;

use tracing::debug;

use crate::domain::error::ScreenerError;
use crate::domain::record::SourceTag;

/// Minimal GET transport. Returns the body of a 2xx response; anything else
/// is an error message the caller wraps with its provider and symbol.
pub trait HttpFetch {
    fn get_text(&self, url: &str, query: &[(&str, &str)]) -> Result<String, String>;
}

impl<T: HttpFetch + ?Sized> HttpFetch for &T {
    fn get_text(&self, url: &str, query: &[(&str, &str)]) -> Result<String, String> {
        (**self).get_text(url, query)
    }
}

/// Production transport backed by `reqwest::blocking`.
#[derive(Debug, Clone)]
pub struct BlockingHttpClient {
    client: reqwest::blocking::Client,
}

impl BlockingHttpClient {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, ScreenerError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .map_err(|e| ScreenerError::ConfigInvalid {
                section: "http".into(),
                key: "user_agent".into(),
                reason: e.to_string(),
            })?;
        Ok(Self { client })
    }
}

impl HttpFetch for BlockingHttpClient {
    fn get_text(&self, url: &str, query: &[(&str, &str)]) -> Result<String, String> {
        debug!(url, "GET");
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .map_err(|e| format!("request failed: {}", e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(format!("HTTP {} from {}", status.as_u16(), url));
        }
        response
            .text()
            .map_err(|e| format!("failed to read body: {}", e))
    }
}

/// Offline transport answering from canned bodies keyed by URL and query.
#[derive(Debug, Default, Clone)]
pub struct CannedHttp {
    responses: HashMap<String, Result<String, String>>,
}

impl CannedHttp {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(url: &str, query: &[(&str, &str)]) -> String {
        let mut key = url.to_string();
        for (i, (k, v)) in query.iter().enumerate() {
            key.push(if i == 0 { '?' } else { '&' });
            key.push_str(k);
            key.push('=');
            key.push_str(v);
        }
        key
    }

    pub fn with_body(mut self, url: &str, query: &[(&str, &str)], body: &str) -> Self {
        self.responses
            .insert(Self::key(url, query), Ok(body.to_string()));
        self
    }

    pub fn with_failure(mut self, url: &str, query: &[(&str, &str)], reason: &str) -> Self {
        self.responses
            .insert(Self::key(url, query), Err(reason.to_string()));
        self
    }
}

impl HttpFetch for CannedHttp {
    fn get_text(&self, url: &str, query: &[(&str, &str)]) -> Result<String, String> {
        self.responses
            .get(&Self::key(url, query))
            .cloned()
            .unwrap_or_else(|| Err(format!("HTTP 404 from {}", Self::key(url, query))))
    }
}

/// Serves its bodies in order regardless of URL, repeating the last one,
/// and counts requests.
#[cfg(test)]
pub struct SequencedHttp {
    bodies: Vec<String>,
    calls: std::cell::Cell<usize>,
}

#[cfg(test)]
impl SequencedHttp {
    pub fn new(bodies: &[&str]) -> Self {
        Self {
            bodies: bodies.iter().map(|b| b.to_string()).collect(),
            calls: std::cell::Cell::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

#[cfg(test)]
impl HttpFetch for SequencedHttp {
    fn get_text(&self, _url: &str, _query: &[(&str, &str)]) -> Result<String, String> {
        let n = self.calls.get();
        self.calls.set(n + 1);
        self.bodies
            .get(n)
            .or(self.bodies.last())
            .cloned()
            .ok_or_else(|| "no body".to_string())
    }
}

/// Fetch a page and convert transport failures into source errors.
pub fn fetch(
    http: &dyn HttpFetch,
    provider: SourceTag,
    symbol: &str,
    url: &str,
    query: &[(&str, &str)],
) -> Result<String, ScreenerError> {
    http.get_text(url, query)
        .map_err(|reason| ScreenerError::source_failure(provider, symbol, reason))
}
