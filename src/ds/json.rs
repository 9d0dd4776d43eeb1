// SPDX-License-Identifier: Apache-2.0

#![warn(missing_docs)]

//! Tabular data stored as line-delimited JSON records.
//!

use crate::{
    MyError,
    ds::{DataResource, Hints, InputSource, OutputSource},
    queryable::Q,
    result::{ResultSet, Row, Statistics},
    scope::Scope,
};
use flate2::read::GzDecoder;
use serde_json::{Map, Value};
use std::{
    fs::{File, OpenOptions},
    io::{BufRead, BufReader, BufWriter, Read, Write},
    time::Instant,
};
use tracing::debug;

fn value_to_q(value: &Value) -> Q {
    match value {
        Value::Null => Q::Null,
        Value::Bool(x) => Q::Bool(*x),
        Value::Number(x) => x.as_f64().map(Q::Num).unwrap_or(Q::Null),
        Value::String(x) => Q::Str(x.to_owned()),
        // nested structures flatten to their JSON text...
        other => Q::Str(other.to_string()),
    }
}

fn q_to_value(q: &Q) -> Value {
    match q {
        Q::Null => Value::Null,
        Q::Bool(x) => Value::Bool(*x),
        Q::Num(x) => serde_json::Number::from_f64(*x).map(Value::Number).unwrap_or(Value::Null),
        Q::Str(x) => Value::String(x.to_owned()),
    }
}

/// Decode one JSON object per non-empty line into [Row]s. Shared by the file
/// and HTTP drivers.
pub(crate) fn rows_from_json(input: impl BufRead) -> Result<Vec<Row>, MyError> {
    let mut rows = Vec::new();
    for line in input.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let value: Value = serde_json::from_str(&line)?;
        let Value::Object(map) = value else {
            return Err(MyError::runtime(format!("Not a JSON object: {line}")));
        };
        let row: Row = map.iter().map(|(k, v)| (k.to_owned(), value_to_q(v))).collect();
        rows.push(row);
    }
    Ok(rows)
}

/// [InputSource] of rows mapped from line-delimited JSON objects.
#[derive(Debug)]
pub struct JsonInputSource {
    resource: DataResource,
}

impl JsonInputSource {
    /// Constructor given the file system location of a readable file.
    pub fn new(path: &str, hints: Hints) -> Self {
        Self {
            resource: DataResource { path: path.to_owned(), hints },
        }
    }
}

impl InputSource for JsonInputSource {
    fn execute(&self, scope: &Scope) -> Result<ResultSet, MyError> {
        let path = scope.expand(&self.resource.path);
        debug!("Reading JSON records from '{path}'");
        let file = File::open(&path)
            .map_err(|x| MyError::Resolution(format!("Cannot open '{path}': {x}")))?;
        let input: Box<dyn Read> = if self.resource.hints.gzip {
            Box::new(GzDecoder::new(file))
        } else {
            Box::new(file)
        };
        let rows = rows_from_json(BufReader::new(input))?;
        Ok(ResultSet::from_rows(rows))
    }
}

/// [OutputSource] writing rows as one JSON object per line.
pub struct JsonOutputSource {
    resource: DataResource,
    writer: Option<BufWriter<File>>,
    statistics: Statistics,
    opened_at: Option<Instant>,
}

impl JsonOutputSource {
    /// Constructor given the file system location of a writable file.
    pub fn new(path: &str, hints: Hints) -> Self {
        Self {
            resource: DataResource { path: path.to_owned(), hints },
            writer: None,
            statistics: Statistics::default(),
            opened_at: None,
        }
    }
}

impl OutputSource for JsonOutputSource {
    fn open(&mut self, scope: &Scope) -> Result<(), MyError> {
        let path = scope.expand(&self.resource.path);
        debug!("Opening '{path}' for writing (append={})", self.resource.hints.append);
        let file = if self.resource.hints.append {
            OpenOptions::new().create(true).append(true).open(&path)?
        } else {
            File::create(&path)?
        };
        self.writer = Some(BufWriter::new(file));
        self.opened_at = Some(Instant::now());
        Ok(())
    }

    fn write(&mut self, row: &Row) -> Result<(), MyError> {
        let Some(writer) = self.writer.as_mut() else {
            return Err(MyError::runtime("Sink was never opened"));
        };
        let mut map = Map::new();
        for (name, q) in row {
            map.insert(name.to_owned(), q_to_value(q));
        }
        let line = serde_json::to_string(&Value::Object(map))?;
        self.statistics.bytes_out += line.len() as u64 + 1;
        writeln!(writer, "{line}")?;
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

impl Drop for JsonOutputSource {
    fn drop(&mut self) {
        if self.writer.is_some() {
            let _ = self.close();
        }
    }
}
