// SPDX-License-Identifier: Apache-2.0

#![warn(missing_docs)]

//! SQL-dialect query engine + runtime interpreter over tabular data.
//!
//! The next paragraphs explain in more details the elements of this project
//! as well as the rationale behind some of the decisions that shaped its
//! components.
//!
//! # Statements
//!
//! The kernel of this project is SQL-like [`Statement`]s evaluated against
//! paths: delimited-text files, JSON record files, URL-addressed blobs and
//! in-memory views. Parsing user-provided input is done by invoking
//! [`Statement::try_from_text()`] for one statement, or
//! [`Statement::parse_script()`] for a `;`-separated batch, as shown in the
//! following example:
//! ```rust
//! use qwery::prelude::*;
//! use std::error::Error;
//!
//! # fn test() -> Result<(), Box<dyn Error>> {
//! let stmt = Statement::try_from_text(
//!     "SELECT Symbol, LastSale FROM './tickers.csv' \
//!      WHERE LastSale < 1.00 ORDER BY Symbol DESC LIMIT 5",
//! )?;
//! // ...
//! let script = Statement::parse_script(
//!     "CREATE VIEW tech AS SELECT * FROM './tickers.csv' WHERE Sector = 'Tech';
//!      SELECT Symbol FROM tech;",
//! )?;
//! #    Ok(())
//! # }
//! ```
//! An `Ok` result implies a syntactically correct parsed statement!
//!
//! For convenience, a standalone tool is included that can be used from the
//! command line to run statements interactively. Once the library is built
//! (`cargo b↵`), it can be invoked by calling:
//! ```bash
//! cargo r --bin repl↵
//! ```
//!
//! # Templates
//!
//! Statement grammars are not hand-coded: each one is declared as a single
//! *template* string whose whitespace-separated tokens are either literal
//! keywords or typed placeholders -- `@table` for an identifier,
//! `@(fields)` for field names, `@{args}` for expressions, `@[values]` for
//! literal values, `@|sort|` for sort fields, `@<cond>` for a condition,
//! `@/regex/` for an input gate, and `?KEYWORD`/`+?KEYWORD` for optional
//! groups. One extractor walks the template and the token stream together,
//! left to right, in a single pass, and produces a typed bag the per-keyword
//! compiler assembles into a [`Statement`]. Adding a statement shape is
//! writing a template, not writing a parser.
//!
//! # Scopes
//!
//! A [`Statement`] on its own is close to useless unless it is executed
//! w/in a [`Scope`]: a chain of environment frames holding variable
//! bindings, registered views and registered functions. A child frame
//! extends its parent by reference and its writes never escape upward.
//! Executing returns a [`ResultSet`]: a finite sequence of rows plus
//! counters.
//! ```rust,no_run
//! use qwery::prelude::*;
//! use std::error::Error;
//!
//! # fn test() -> Result<(), Box<dyn Error>> {
//! let mut scope = Scope::root();
//! scope.register_builtins();
//! let stmt = Statement::try_from_text("SELECT Symbol FROM './tickers.csv'")?;
//! for row in stmt.execute(&mut scope)? {
//!     println!("{row:?}");
//! }
//! #    Ok(())
//! # }
//! ```
//!
//! # Data sources
//!
//! Concrete drivers are resolved from paths by the [`DataSourceFactory`]:
//! URL scheme first, file extension second. The [`InputSource`] and
//! [`OutputSource`] traits are the only contracts the engine itself relies
//! on, so adding a driver never touches the core.
//!
//! In an earlier incarnation an [`OutputSource`] used to have a `teardown()`
//! hook. Not anymore. Rust's
//! [`Drop` trait](https://doc.rust-lang.org/std/ops/trait.Drop.html) sort of
//! makes that method superfluous -- drivers still honour an explicit
//! `close()`, w/ `Drop` as the safety net on abandoned sinks.
//!
//! # Third-party crates
//!
//! This project relies on few 3<sup>rd</sup> party crates. Here are the most
//! important ones...
//!
//! 1. Data formats:
//!    * [csv](https://crates.io/crates/csv): delimited-text reading + writing.
//!    * [serde](https://crates.io/crates/serde) +
//!      [serde_json](https://crates.io/crates/serde_json): JSON records.
//!    * [flate2](https://crates.io/crates/flate2): gzip-compressed payloads.
//!    * [ureq](https://crates.io/crates/ureq): URL-addressed sources.
//!
//! 2. Text handling:
//!    * [unicase](https://crates.io/crates/unicase): case-insensitive keyword
//!      matching.
//!    * [regex](https://crates.io/crates/regex): template input gates and
//!      `${var}` expansion.
//!
//! 3. Date + Time:
//!    * [jiff](https://crates.io/crates/jiff): the `now()`/`today()`
//!      builtins.
//!

mod cond;
mod config;
mod ds;
mod error;
mod expr;
mod function;
mod op;
mod parser;
mod queryable;
mod result;
mod scope;
mod statement;
mod template;
mod token;

pub use ds::*;
pub use error::MyError;
pub use function::FnInfo;
pub use queryable::Q;
pub use result::{ResultSet, Row, Statistics};
pub use scope::Scope;
pub use statement::{CreateView, Describe, Insert, Select, Statement};
pub use token::{Kind, Token, TokenStream};

pub mod prelude;
