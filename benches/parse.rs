// SPDX-License-Identifier: Apache-2.0

//! Statement parsing benchmarks.
//!

use criterion::{Criterion, criterion_group, criterion_main};
use qwery::Statement;
use std::hint::black_box;

const SELECT: &str = "SELECT Symbol, LastSale * 2 AS Doubled FROM './tickers.csv' \
    WHERE LastSale < 1.00 AND Sector IN ('Tech', 'Media') \
    ORDER BY Symbol DESC LIMIT 10";

const INSERT: &str = "INSERT INTO './out.csv' (Symbol, Price) VALUES ('AAPL', 150.25)";

fn bench_parse(c: &mut Criterion) {
    c.bench_function("parse_select", |b| {
        b.iter(|| Statement::try_from_text(black_box(SELECT)).expect("parse failed"))
    });
    c.bench_function("parse_insert", |b| {
        b.iter(|| Statement::try_from_text(black_box(INSERT)).expect("parse failed"))
    });
}

criterion_group!(benches, bench_parse);
criterion_main!(benches);
