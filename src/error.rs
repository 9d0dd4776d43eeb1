// SPDX-License-Identifier: Apache-2.0

#![warn(missing_docs)]

//! Errors raised from this library.
//!

use std::borrow::Cow;
use thiserror::Error;

/// Variants of error raised from this library.
#[derive(Debug, Error)]
pub enum MyError {
    /// Data reading/writing errors.
    #[error("I/O error: {0}")]
    IO(#[from] std::io::Error),

    /// Delimited-text (`csv`) related error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON-encoding (`serde`) related error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Remote fetch (`ureq`) related error.
    #[error("HTTP error: {0}")]
    Http(#[from] Box<ureq::Error>),

    /// Pattern compilation (`regex`) related error.
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    /// Raised by the tokenizer, the expression + conditional parsers and the
    /// template extractor. Always carries the position of the offending
    /// lexeme.
    #[error("Syntax error: {message} at line {line}, column {column}")]
    Syntax {
        /// What was expected, or what went wrong.
        message: String,
        /// 1-based line of the offending token.
        line: u32,
        /// 1-based column of the offending token.
        column: u32,
    },

    /// A name, path or view that could not be resolved in [Scope][crate::Scope].
    #[error("Unresolved name or path: {0}")]
    Resolution(String),

    /// Statement evaluation error.
    #[error("Runtime error: {0}")]
    Runtime(Cow<'static, str>),
}

impl MyError {
    /// Convenience constructor for a positioned syntax error.
    pub(crate) fn syntax(message: impl Into<String>, line: u32, column: u32) -> Self {
        MyError::Syntax {
            message: message.into(),
            line,
            column,
        }
    }

    /// Convenience constructor for a runtime error.
    pub(crate) fn runtime(message: impl Into<Cow<'static, str>>) -> Self {
        MyError::Runtime(message.into())
    }
}
