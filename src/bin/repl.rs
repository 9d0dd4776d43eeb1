// SPDX-License-Identifier: Apache-2.0

#![warn(missing_docs)]

//! A quick + dirty little REPL (Read + Eval + Print Loop) command line tool
//! to run SQL statements against file, JSON and URL sources.
//!
//! Statements execute against one persistent root scope, so a view created
//! on one line is visible to the next. Entering the sequence of two tildas
//! `~~` followed by `↵` (the \[ENTER\] key) initiates a multi-line mode which
//! ends when `Ctrl-D` is pressed. In this mode consecutive input is
//! concatenated into one string before processing.
//!
//! To start the loop enter...
//! ```bash
//! cargo run --bin repl↵
//! ```
//! To exit the program, press `Ctrl-D`.
//!

use qwery::{MyError, Scope, Statement};
use std::io::{self, Write};

#[doc(hidden)]
const RED: &str = "\x1b[31m";
#[doc(hidden)]
const GREEN: &str = "\x1b[32m";
#[doc(hidden)]
const YELLOW: &str = "\x1b[33m";
#[doc(hidden)]
const RESET: &str = "\x1b[0m";
#[doc(hidden)]
const MULTILINE: &str = "~~";

macro_rules! error {
    ( $( $arg: tt )* ) => {
        {
            let msg = ::std::fmt::format(::core::format_args!($($arg)*));
            eprintln!("{RED}{msg}{RESET}");
        }
    }
}

macro_rules! info {
    ( $( $arg: tt )* ) => {
        {
            let msg = ::std::fmt::format(::core::format_args!($($arg)*));
            println!("{YELLOW}{msg}{RESET}");
        }
    }
}

macro_rules! note {
    ( $( $arg: tt )* ) => {
        {
            let msg = ::std::fmt::format(::core::format_args!($($arg)*));
            println!("{GREEN}{msg}{RESET}");
        }
    }
}

#[doc(hidden)]
fn prompt(s: &str) -> Result<(), MyError> {
    print!("{GREEN}{s} {RESET}");
    io::stdout().flush().map_err(MyError::IO)
}

// run one input chunk -- possibly several `;`-separated statements -- against
// the persistent scope, printing rows and counters as they come.
fn process(input: &str, scope: &mut Scope) {
    let statements = match Statement::parse_script(input) {
        Ok(x) => x,
        Err(x) => {
            error!("Failed: {}", x);
            return;
        }
    };
    for statement in &statements {
        match statement.execute(scope) {
            Ok(result) => {
                let inserted = result.inserted_count();
                let mut n = 0usize;
                for row in result {
                    let cells: Vec<String> =
                        row.iter().map(|(name, q)| format!("{name}: {q}")).collect();
                    println!("{}", cells.join(", "));
                    n += 1;
                }
                if inserted > 0 {
                    note!("OK! {} row(s) inserted.", inserted);
                } else {
                    note!("OK! {} row(s).", n);
                }
            }
            Err(x) => error!("Failed: {}", x),
        }
    }
}

/// Executable main method.
///
/// Invoke it like so...
/// ```bash
/// cargo run --bin repl↵
/// ```
fn main() -> Result<(), MyError> {
    note!("Enter SQL statements, `;`-separated.\nWhen done, hit Ctrl-D.");
    let mut scope = Scope::root();
    scope.register_builtins();
    let stdin = io::stdin();
    loop {
        prompt("> ")?;
        let mut line = String::new();
        match stdin.read_line(&mut line) {
            Ok(0) => {
                note!("\nSee you later...");
                break;
            }

            Ok(_) => {
                let first = line.trim();
                if first.is_empty() {
                    continue;
                }
                let input = if first == MULTILINE {
                    info!("Enter multi-line mode. Exit w/ Ctrl-D");
                    let mut lines = String::new();
                    loop {
                        prompt(">>")?;
                        let mut next = String::new();
                        match stdin.read_line(&mut next) {
                            Ok(0) => break,
                            Ok(_) => lines.push_str(&next),
                            Err(x) => {
                                error!("Failed Read: {}", x);
                                break;
                            }
                        }
                    }
                    lines
                } else {
                    first.to_owned()
                };

                process(&input, &mut scope);
            }
            Err(x) => {
                error!("Failed Read: {}", x);
                break;
            }
        }
    }

    Ok(())
}
