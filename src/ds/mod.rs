// SPDX-License-Identifier: Apache-2.0

#![warn(missing_docs)]

//! Groups artifacts providing and consuming rows for known kinds of tabular
//! data: delimited text files, JSON records and URL-addressed blobs.
//!

mod csv;
mod http;
mod json;

pub use self::csv::*;
pub use self::http::*;
pub use self::json::*;

use crate::{
    MyError,
    config::config,
    result::{ResultSet, Row, Statistics},
    scope::Scope,
};

/// Options a caller (or the factory, from a path's shape) may pin about a
/// [DataResource].
#[derive(Clone, Debug, PartialEq)]
pub struct Hints {
    /// Field delimiter for delimited-text data.
    pub delimiter: u8,
    /// Whether delimited-text fields honour quoting.
    pub quoted: bool,
    /// Whether the first input record carries column headers.
    pub headers: bool,
    /// Whether the payload is gzip-compressed.
    pub gzip: bool,
    /// Whether a sink appends to an existing file instead of replacing it.
    pub append: bool,
    /// Whether a sink writes a column-header record first.
    pub column_headers: bool,
}

impl Default for Hints {
    fn default() -> Self {
        Self {
            delimiter: config().default_delimiter(),
            quoted: true,
            headers: true,
            gzip: false,
            append: false,
            column_headers: true,
        }
    }
}

/// A path plus the [Hints] needed to resolve it into a concrete source or
/// sink.
#[derive(Clone, Debug, PartialEq)]
pub struct DataResource {
    /// File system path or URL. May carry `${var}` references; expansion
    /// happens against the executing [Scope].
    pub path: String,
    /// Resolution options.
    pub hints: Hints,
}

impl DataResource {
    /// Constructor deriving [Hints] from the path's shape.
    pub fn new(path: &str) -> Self {
        Self {
            path: path.to_owned(),
            hints: DataSourceFactory::hints_for(path),
        }
    }
}

/// Capability of producing rows for a statement.
pub trait InputSource {
    /// Read the whole source, yielding its rows in input order.
    fn execute(&self, scope: &Scope) -> Result<ResultSet, MyError>;
}

/// Capability of receiving rows from a statement. Usage is scoped: `open`
/// before the first `write`, `close` on every exit path -- drivers back this
/// up w/ a `Drop` fallback, so an abandoned sink still releases its file.
pub trait OutputSource {
    /// Acquire the underlying medium.
    fn open(&mut self, scope: &Scope) -> Result<(), MyError>;

    /// Write one row. Fails if the sink was never opened.
    fn write(&mut self, row: &Row) -> Result<(), MyError>;

    /// Flush and release the underlying medium.
    fn close(&mut self) -> Result<(), MyError>;

    /// Counters accumulated so far.
    fn statistics(&self) -> Statistics;
}

/// Resolves paths + [Hints] into concrete drivers, by URL scheme first and
/// file extension second.
pub struct DataSourceFactory;

impl DataSourceFactory {
    /// Derive [Hints] from a path's extension(s): `.tsv` and `.psv` pin the
    /// delimiter, a trailing `.gz` pins compression.
    pub fn hints_for(path: &str) -> Hints {
        let mut hints = Hints::default();
        let base = path.strip_suffix(".gz").inspect(|_| hints.gzip = true).unwrap_or(path);
        match extension(base) {
            "tsv" => hints.delimiter = b'\t',
            "psv" => hints.delimiter = b'|',
            _ => {}
        }
        hints
    }

    /// Resolve a readable driver for the given path, or fail w/ a
    /// [Resolution][MyError::Resolution] error when no driver claims it.
    pub fn input_source(path: &str, hints: Option<Hints>) -> Result<Box<dyn InputSource>, MyError> {
        let hints = hints.unwrap_or_else(|| Self::hints_for(path));
        if path.starts_with("http://") || path.starts_with("https://") {
            return Ok(Box::new(HttpInputSource::new(path, hints)));
        }
        match extension(path.strip_suffix(".gz").unwrap_or(path)) {
            "csv" | "tsv" | "psv" | "txt" => Ok(Box::new(CsvInputSource::new(path, hints))),
            "json" | "jsonl" | "ndjson" => Ok(Box::new(JsonInputSource::new(path, hints))),
            _ => Err(MyError::Resolution(format!("No input driver for '{path}'"))),
        }
    }

    /// Resolve a writable driver for the given path, or fail w/ a
    /// [Resolution][MyError::Resolution] error when no driver claims it.
    pub fn output_source(
        path: &str,
        append: bool,
        hints: Option<Hints>,
    ) -> Result<Box<dyn OutputSource>, MyError> {
        let mut hints = hints.unwrap_or_else(|| Self::hints_for(path));
        hints.append = append;
        match extension(path.strip_suffix(".gz").unwrap_or(path)) {
            "csv" | "tsv" | "psv" | "txt" => Ok(Box::new(CsvOutputSource::new(path, hints))),
            "json" | "jsonl" | "ndjson" => Ok(Box::new(JsonOutputSource::new(path, hints))),
            _ => Err(MyError::Resolution(format!("No output driver for '{path}'"))),
        }
    }
}

// lower-cased final extension of a path, or "" when there is none.
fn extension(path: &str) -> &str {
    path.rsplit('.').next().filter(|x| !x.contains('/')).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hints_from_extension() {
        assert_eq!(DataSourceFactory::hints_for("a/b.tsv").delimiter, b'\t');
        assert_eq!(DataSourceFactory::hints_for("a/b.psv").delimiter, b'|');
        assert!(DataSourceFactory::hints_for("a/b.csv.gz").gzip);
        assert_eq!(DataSourceFactory::hints_for("a/b.csv").delimiter, b',');
    }

    #[test]
    fn test_unknown_extension_is_unresolved() {
        assert!(matches!(
            DataSourceFactory::input_source("./data.parquet", None),
            Err(MyError::Resolution(_))
        ));
        assert!(matches!(
            DataSourceFactory::output_source("./data.xls", false, None),
            Err(MyError::Resolution(_))
        ));
    }

    #[test]
    fn test_known_extensions_resolve() {
        assert!(DataSourceFactory::input_source("./t.csv", None).is_ok());
        assert!(DataSourceFactory::input_source("./t.jsonl", None).is_ok());
        assert!(DataSourceFactory::input_source("http://x/t.csv", None).is_ok());
        assert!(DataSourceFactory::output_source("./t.json", true, None).is_ok());
    }
}
