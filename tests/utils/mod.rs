// SPDX-License-Identifier: Apache-2.0

//! Common test fixtures: scratch files under the OS temp directory, uniquely
//! named so parallel test binaries never collide.
//!

#![allow(dead_code)]

use rand::RngExt;
use std::fs;

/// A unique scratch path ending w/ the given file name.
pub fn scratch(name: &str) -> String {
    let tag: u32 = rand::rng().random();
    std::env::temp_dir()
        .join(format!("qwery-{tag:08x}-{name}"))
        .to_string_lossy()
        .into_owned()
}

/// The ticker sample used across the suites.
pub const TICKERS: &str = "\
Symbol,LastSale,Sector
AAPL,150.25,Tech
MSFT,310.10,Tech
XOMO,0.55,Energy
ABCD,0.90,Tech
ZZZ,0.10,Media
QRS,0.75,Energy
";

/// Materialize the ticker sample as a scratch CSV file and return its path.
pub fn tickers_csv() -> String {
    let path = scratch("tickers.csv");
    fs::write(&path, TICKERS).expect("fixture write failed");
    path
}
