// SPDX-License-Identifier: Apache-2.0

#![warn(missing_docs)]

//! Tabular data stored in delimited-text (CSV and friends) files.
//!

use crate::{
    MyError,
    ds::{DataResource, Hints, InputSource, OutputSource},
    queryable::Q,
    result::{ResultSet, Row, Statistics},
    scope::Scope,
};
use flate2::{Compression, read::GzDecoder, write::GzEncoder};
use std::{
    fs::{File, OpenOptions},
    io::{Read, Write},
    time::Instant,
};
use tracing::debug;

/// Decode every record a delimited-text reader yields into [Row]s, mapping
/// cell text to typed payloads. Shared by the file and HTTP drivers.
pub(crate) fn rows_from_delimited(input: impl Read, hints: &Hints) -> Result<Vec<Row>, MyError> {
    let mut rdr = ::csv::ReaderBuilder::new()
        .delimiter(hints.delimiter)
        .quoting(hints.quoted)
        .has_headers(hints.headers)
        .flexible(true)
        .from_reader(input);
    let headers: Vec<String> = if hints.headers {
        rdr.headers()?.iter().map(str::to_string).collect()
    } else {
        Vec::new()
    };
    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record?;
        let row: Row = record
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                let name = headers.get(i).cloned().unwrap_or_else(|| format!("column{i}"));
                (name, Q::from_text(cell))
            })
            .collect();
        rows.push(row);
    }
    Ok(rows)
}

/// [InputSource] of rows mapped from delimited-text records.
#[derive(Debug)]
pub struct CsvInputSource {
    resource: DataResource,
}

impl CsvInputSource {
    /// Constructor given the file system location of a readable file.
    pub fn new(path: &str, hints: Hints) -> Self {
        Self {
            resource: DataResource { path: path.to_owned(), hints },
        }
    }
}

impl InputSource for CsvInputSource {
    fn execute(&self, scope: &Scope) -> Result<ResultSet, MyError> {
        let path = scope.expand(&self.resource.path);
        debug!("Reading delimited text from '{path}'");
        let file = File::open(&path)
            .map_err(|x| MyError::Resolution(format!("Cannot open '{path}': {x}")))?;
        let input: Box<dyn Read> = if self.resource.hints.gzip {
            Box::new(GzDecoder::new(file))
        } else {
            Box::new(file)
        };
        let rows = rows_from_delimited(input, &self.resource.hints)?;
        Ok(ResultSet::from_rows(rows))
    }
}

/// [OutputSource] writing rows as delimited-text records, optionally headed
/// by a column-name record and optionally gzip-compressed.
pub struct CsvOutputSource {
    resource: DataResource,
    writer: Option<::csv::Writer<Box<dyn Write + Send>>>,
    wrote_headers: bool,
    statistics: Statistics,
    opened_at: Option<Instant>,
}

impl CsvOutputSource {
    /// Constructor given the file system location of a writable file.
    pub fn new(path: &str, hints: Hints) -> Self {
        Self {
            resource: DataResource { path: path.to_owned(), hints },
            writer: None,
            wrote_headers: false,
            statistics: Statistics::default(),
            opened_at: None,
        }
    }
}

impl OutputSource for CsvOutputSource {
    fn open(&mut self, scope: &Scope) -> Result<(), MyError> {
        let path = scope.expand(&self.resource.path);
        let hints = &self.resource.hints;
        debug!("Opening '{path}' for writing (append={})", hints.append);
        let file = if hints.append {
            OpenOptions::new().create(true).append(true).open(&path)?
        } else {
            File::create(&path)?
        };
        let sink: Box<dyn Write + Send> = if hints.gzip {
            Box::new(GzEncoder::new(file, Compression::default()))
        } else {
            Box::new(file)
        };
        self.writer = Some(
            ::csv::WriterBuilder::new()
                .delimiter(hints.delimiter)
                .from_writer(sink),
        );
        // never head an existing file we are appending to...
        self.wrote_headers = hints.append || !hints.column_headers;
        self.opened_at = Some(Instant::now());
        Ok(())
    }

    fn write(&mut self, row: &Row) -> Result<(), MyError> {
        let Some(writer) = self.writer.as_mut() else {
            return Err(MyError::runtime("Sink was never opened"));
        };
        if !self.wrote_headers {
            writer.write_record(row.iter().map(|(name, _)| name.as_str()))?;
            self.wrote_headers = true;
        }
        let cells: Vec<String> = row.iter().map(|(_, q)| q.to_text()).collect();
        self.statistics.bytes_out +=
            cells.iter().map(|x| x.len() as u64 + 1).sum::<u64>();
        writer.write_record(&cells)?;
        self.statistics.rows_out += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<(), MyError> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
        }
        if let Some(t) = self.opened_at.take() {
            self.statistics.elapsed_ms = t.elapsed().as_millis() as u64;
        }
        Ok(())
    }

    fn statistics(&self) -> Statistics {
        self.statistics
    }
}

impl Drop for CsvOutputSource {
    fn drop(&mut self) {
        if self.writer.is_some() {
            let _ = self.close();
        }
    }
}
