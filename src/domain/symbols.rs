//! Symbol list loading.
//!
//! The list is one ticker per line, as produced by the 52-week-high fetch
//! job. Blank lines and `#` comments are skipped.

use crate::domain::error::ScreenerError;
use std::collections::HashSet;
use std::path::Path;

/// Parse a symbol list, dropping duplicates (first occurrence wins) and
/// truncating to `max_symbols`.
pub fn parse_symbols(input: &str, max_symbols: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    input
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter(|line| seen.insert(line.to_string()))
        .take(max_symbols)
        .map(str::to_string)
        .collect()
}

/// Load the symbol list from disk. A missing file is an empty list.
pub fn load_symbols(path: &Path, max_symbols: usize) -> Result<Vec<String>, ScreenerError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(parse_symbols(&content, max_symbols)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn skips_blanks_and_comments() {
        let symbols = parse_symbols("# updated daily\n7203.T\n\n  6758.T  \n#9984.T\n", 60);
        assert_eq!(symbols, vec!["7203.T", "6758.T"]);
    }

    #[test]
    fn drops_duplicates_keeping_first() {
        let symbols = parse_symbols("7203.T\n6758.T\n7203.T\n", 60);
        assert_eq!(symbols, vec!["7203.T", "6758.T"]);
    }

    #[test]
    fn truncates_to_max_symbols() {
        let symbols = parse_symbols("A\nB\nC\nD\n", 2);
        assert_eq!(symbols, vec!["A", "B"]);
        assert!(parse_symbols("A\n", 0).is_empty());
    }

    #[test]
    fn missing_file_is_empty() {
        let symbols = load_symbols(Path::new("/nonexistent/symbols.txt"), 60).unwrap();
        assert!(symbols.is_empty());
    }

    #[test]
    fn loads_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "AAPL\nMSFT").unwrap();
        let symbols = load_symbols(file.path(), 60).unwrap();
        assert_eq!(symbols, vec!["AAPL", "MSFT"]);
    }
}
