// SPDX-License-Identifier: Apache-2.0

#![warn(missing_docs)]

//! Rows, result sets and source/sink statistics.
//!

use crate::queryable::Q;
use serde::Serialize;

/// An ordered sequence of `(column name, payload)` pairs.
pub type Row = Vec<(String, Q)>;

/// Look a column up by name w/in a row.
pub(crate) fn row_get<'r>(row: &'r Row, name: &str) -> Option<&'r Q> {
    row.iter().find(|(n, _)| n == name).map(|(_, q)| q)
}

/// Counters reported by source and sink drivers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct Statistics {
    /// Bytes read from the underlying medium.
    pub bytes_in: u64,
    /// Bytes written to the underlying medium.
    pub bytes_out: u64,
    /// Rows read.
    pub rows_in: u64,
    /// Rows written.
    pub rows_out: u64,
    /// Wall-clock duration the driver was open, in milliseconds.
    pub elapsed_ms: u64,
}

/// What executing a [Statement][crate::Statement] returns: a finite ordered
/// sequence of [Row]s plus summary counters. Iterate it to drain the rows.
#[derive(Debug)]
pub struct ResultSet {
    rows: std::vec::IntoIter<Row>,
    inserted: usize,
    statistics: Option<Statistics>,
}

impl ResultSet {
    /// An empty result w/ no counters; e.g. what CREATE VIEW returns.
    pub fn empty() -> Self {
        Self::from_rows(Vec::new())
    }

    /// Wrap already-materialized rows.
    pub fn from_rows(rows: Vec<Row>) -> Self {
        Self {
            rows: rows.into_iter(),
            inserted: 0,
            statistics: None,
        }
    }

    /// Summary result of an INSERT: no rows, a counter and the sink's
    /// statistics.
    pub fn inserted(count: usize, statistics: Statistics) -> Self {
        Self {
            rows: Vec::new().into_iter(),
            inserted: count,
            statistics: Some(statistics),
        }
    }

    /// How many rows the producing statement inserted.
    pub fn inserted_count(&self) -> usize {
        self.inserted
    }

    /// Driver statistics, when the producing statement touched a sink.
    pub fn statistics(&self) -> Option<&Statistics> {
        self.statistics.as_ref()
    }
}

impl Iterator for ResultSet {
    type Item = Row;

    fn next(&mut self) -> Option<Row> {
        self.rows.next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_preserves_order() {
        let rows = vec![
            vec![("a".to_string(), Q::Num(1.0))],
            vec![("a".to_string(), Q::Num(2.0))],
        ];
        let rs = ResultSet::from_rows(rows.clone());
        assert_eq!(rs.collect::<Vec<_>>(), rows);
    }

    #[test]
    fn test_inserted_summary() {
        let stats = Statistics { rows_out: 3, ..Statistics::default() };
        let mut rs = ResultSet::inserted(3, stats);
        assert_eq!(rs.inserted_count(), 3);
        assert_eq!(rs.statistics().map(|s| s.rows_out), Some(3));
        assert!(rs.next().is_none());
    }

    #[test]
    fn test_row_get() {
        let row: Row = vec![
            ("Symbol".to_string(), Q::Str("AAPL".into())),
            ("Price".to_string(), Q::Num(150.25)),
        ];
        assert_eq!(row_get(&row, "Price"), Some(&Q::Num(150.25)));
        assert_eq!(row_get(&row, "ghost"), None);
    }
}
