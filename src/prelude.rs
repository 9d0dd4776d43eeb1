// SPDX-License-Identifier: Apache-2.0

#![warn(missing_docs)]

//! One-stop shop for the types a library user usually needs.
//!

pub use crate::{
    DataResource, DataSourceFactory, Hints, InputSource, MyError, OutputSource, Q, ResultSet, Row,
    Scope, Statement, Statistics,
};
