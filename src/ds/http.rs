// SPDX-License-Identifier: Apache-2.0

#![warn(missing_docs)]

//! URL-addressed tabular data, fetched over HTTP(S) then decoded by shape.
//!

use crate::{
    MyError,
    ds::{DataResource, Hints, csv::rows_from_delimited, json::rows_from_json},
    result::ResultSet,
    scope::Scope,
};
use tracing::debug;

use super::InputSource;

/// [InputSource] that downloads a URL body and decodes it as JSON records
/// when the URL path says so, and as delimited text otherwise.
#[derive(Debug)]
pub struct HttpInputSource {
    resource: DataResource,
}

impl HttpInputSource {
    /// Constructor given an `http://` or `https://` URL.
    pub fn new(url: &str, hints: Hints) -> Self {
        Self {
            resource: DataResource { path: url.to_owned(), hints },
        }
    }

    fn is_json(url: &str) -> bool {
        let path = url.split(['?', '#']).next().unwrap_or(url);
        ["json", "jsonl", "ndjson"].iter().any(|x| path.ends_with(&format!(".{x}")))
    }
}

impl InputSource for HttpInputSource {
    fn execute(&self, scope: &Scope) -> Result<ResultSet, MyError> {
        let url = scope.expand(&self.resource.path);
        debug!("Fetching '{url}'");
        let body = ureq::get(&url)
            .call()
            .map_err(|x| MyError::Http(Box::new(x)))?
            .into_string()?;
        let rows = if Self::is_json(&url) {
            rows_from_json(body.as_bytes())?
        } else {
            rows_from_delimited(body.as_bytes(), &self.resource.hints)?
        };
        Ok(ResultSet::from_rows(rows))
    }
}
