//! Mapping table loading: fetch a CSV source and read it as positional pairs.

use crate::error::{Error, Result};
use crate::log::Logger;
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

const VERSION: &str = env!("CARGO_PKG_VERSION");
const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Where a mapping table comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableSource {
    Url(String),
    File(PathBuf),
}

impl TableSource {
    /// `http://` and `https://` are fetched; `file://` and anything else is a local path.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.starts_with("http://") || raw.starts_with("https://") {
            return TableSource::Url(raw.to_string());
        }

        let path = raw.strip_prefix("file://").unwrap_or(raw);
        TableSource::File(PathBuf::from(shellexpand::tilde(path).into_owned()))
    }

    pub fn label(&self) -> String {
        match self {
            TableSource::Url(url) => url.clone(),
            TableSource::File(path) => path.display().to_string(),
        }
    }

    /// Retrieve the raw table text.
    pub fn fetch(&self, log: &Logger) -> Result<String> {
        log.info(|| format!("Fetching mapping table {}", self.label()));
        match self {
            TableSource::Url(url) => fetch_url(url),
            TableSource::File(path) => std::fs::read_to_string(path)
                .map_err(|e| Error::table_fetch_failed(self.label(), e.to_string())),
        }
    }
}

fn fetch_url(url: &str) -> Result<String> {
    let client = reqwest::blocking::Client::builder()
        .user_agent(format!("nsmigrate/{}", VERSION))
        .timeout(FETCH_TIMEOUT)
        .build()
        .map_err(|e| Error::table_fetch_failed(url, e.to_string()))?;

    let response = client
        .get(url)
        .send()
        .map_err(|e| Error::table_fetch_failed(url, e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(Error::table_fetch_failed(url, format!("HTTP {}", status)));
    }

    response
        .text()
        .map_err(|e| Error::table_fetch_failed(url, e.to_string()))
}

/// One (from, to) record of a mapping table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRow {
    pub from: String,
    pub to: String,
    /// Line of the record in the source text (1-based, header is line 1).
    pub line: u64,
}

/// Read CSV text as (from, to) pairs. Column order decides the schema: the
/// first header column is "from", the second is "to", names are informational.
pub fn read_rows(source: &str, text: &str, log: &Logger) -> Result<Vec<TableRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| Error::table_invalid(source, Some(1), e.to_string()))?
        .clone();

    if headers.len() < 2 {
        return Err(Error::table_invalid(
            source,
            Some(1),
            format!("header row needs two columns, found {}", headers.len()),
        ));
    }

    log.debug(|| format!("FromKey = {}", &headers[0]));
    log.debug(|| format!("ToKey = {}", &headers[1]));

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| {
            let line = e.position().map(|p| p.line());
            Error::table_invalid(source, line, e.to_string())
        })?;
        let line = record.position().map(|p| p.line()).unwrap_or_default();

        let (Some(from), Some(to)) = (record.get(0), record.get(1)) else {
            return Err(Error::table_invalid(
                source,
                Some(line),
                format!("expected columns '{}' and '{}'", &headers[0], &headers[1]),
            ));
        };

        if from.trim().is_empty() || to.trim().is_empty() {
            return Err(Error::table_invalid(source, Some(line), "empty mapping cell"));
        }

        log.raw(|| format!("rowFrom = {}", from));
        rows.push(TableRow {
            from: from.to_string(),
            to: to.to_string(),
            line,
        });
    }

    Ok(rows)
}

/// A key that appeared more than once with different targets. The later row wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateSymbol {
    pub symbol: String,
    pub previous: String,
    pub current: String,
    pub line: u64,
}

/// Old fully-qualified symbol to new fully-qualified symbol.
#[derive(Debug, Clone, Default)]
pub struct MappingTable {
    entries: HashMap<String, String>,
    duplicates: Vec<DuplicateSymbol>,
}

impl MappingTable {
    pub fn from_rows(rows: &[TableRow], log: &Logger) -> Self {
        let mut table = MappingTable::default();

        for row in rows {
            if let Some(previous) = table.entries.insert(row.from.clone(), row.to.clone()) {
                if previous != row.to {
                    log.warn(|| {
                        format!(
                            "Symbol '{}' mapped twice ('{}', then '{}' at line {}); using the later one",
                            row.from, previous, row.to, row.line
                        )
                    });
                    table.duplicates.push(DuplicateSymbol {
                        symbol: row.from.clone(),
                        previous,
                        current: row.to.clone(),
                        line: row.line,
                    });
                }
            }
        }

        table
    }

    pub fn lookup(&self, symbol: &str) -> Option<&str> {
        self.entries.get(symbol).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn duplicates(&self) -> &[DuplicateSymbol] {
        &self.duplicates
    }

    /// Entries sorted by old symbol.
    pub fn sorted_entries(&self) -> Vec<(&str, &str)> {
        let mut entries: Vec<(&str, &str)> = self
            .entries
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        entries.sort();
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::Verbosity;

    const SYMBOLS: &str = "\
Support Library class,Android X class
android.support.v7.widget.RecyclerView,androidx.recyclerview.widget.RecyclerView
android.support.annotation.NonNull,androidx.annotation.NonNull
";

    #[test]
    fn source_parse_distinguishes_urls_and_paths() {
        assert_eq!(
            TableSource::parse("https://example.com/map.csv"),
            TableSource::Url("https://example.com/map.csv".to_string())
        );
        assert_eq!(
            TableSource::parse("file:///tmp/map.csv"),
            TableSource::File(PathBuf::from("/tmp/map.csv"))
        );
        assert_eq!(
            TableSource::parse("tables/map.csv"),
            TableSource::File(PathBuf::from("tables/map.csv"))
        );
    }

    #[test]
    fn read_rows_uses_column_position_not_header_name() {
        let rows = read_rows("symbols.csv", SYMBOLS, &Logger::quiet()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].from, "android.support.v7.widget.RecyclerView");
        assert_eq!(rows[0].to, "androidx.recyclerview.widget.RecyclerView");
        assert_eq!(rows[0].line, 2);
        assert_eq!(rows[1].line, 3);
    }

    #[test]
    fn read_rows_ignores_extra_columns() {
        let text = "old,new,notes\na.B,x.B,moved\n";
        let rows = read_rows("t.csv", text, &Logger::quiet()).unwrap();
        assert_eq!(rows[0].to, "x.B");
    }

    #[test]
    fn read_rows_rejects_single_column_header() {
        let err = read_rows("t.csv", "old\na.B\n", &Logger::quiet()).unwrap_err();
        assert_eq!(err.code.as_str(), "table.invalid");
        assert_eq!(err.details["line"], 1);
    }

    #[test]
    fn read_rows_rejects_short_record() {
        let err = read_rows("t.csv", "old,new\na.B,x.B\nc.D\n", &Logger::quiet()).unwrap_err();
        assert_eq!(err.code.as_str(), "table.invalid");
        assert_eq!(err.details["line"], 3);
    }

    #[test]
    fn fetch_missing_file_is_fetch_error() {
        let source = TableSource::parse("/nonexistent/nsmigrate/symbols.csv");
        let err = source.fetch(&Logger::quiet()).unwrap_err();
        assert_eq!(err.code.as_str(), "table.fetch_failed");
    }

    #[test]
    fn duplicate_keys_later_row_wins_and_is_reported() {
        let text = "old,new\na.B,x.B\na.B,y.B\nc.D,z.D\nc.D,z.D\n";
        let log = Logger::capture(Verbosity::Warn);
        let rows = read_rows("t.csv", text, &log).unwrap();
        let table = MappingTable::from_rows(&rows, &log);

        assert_eq!(table.lookup("a.B"), Some("y.B"));
        assert_eq!(table.len(), 2);
        // Identical repeats are not conflicts.
        assert_eq!(table.duplicates().len(), 1);
        assert_eq!(table.duplicates()[0].previous, "x.B");
        assert_eq!(table.duplicates()[0].current, "y.B");
        assert_eq!(table.duplicates()[0].line, 3);
        assert_eq!(log.captured().len(), 1);
    }
}
