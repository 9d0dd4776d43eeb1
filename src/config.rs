// SPDX-License-Identifier: Apache-2.0

#![warn(missing_docs)]

//! Configuration parameters affecting the behaviour of this library.
//!

use dotenvy::var;
use std::sync::OnceLock;

#[derive(Debug)]
pub struct Config {
    strict_functions: bool,
    strict_math: bool,
    default_delimiter: u8,
}

static CONFIG: OnceLock<Config> = OnceLock::new();
/// This library configuration Singleton.
pub fn config() -> &'static Config {
    CONFIG.get_or_init(Config::default)
}

// interpret common affirmative spellings of a boolean env. variable...
fn truthy(s: &str) -> bool {
    matches!(s.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

impl Default for Config {
    fn default() -> Self {
        let strict_functions = var("QWERY_STRICT_FUNCTIONS").map(|x| truthy(&x)).unwrap_or(false);
        let strict_math = var("QWERY_STRICT_MATH").map(|x| truthy(&x)).unwrap_or(false);
        let default_delimiter = var("QWERY_DEFAULT_DELIMITER")
            .ok()
            .and_then(|x| x.bytes().next())
            .unwrap_or(b',');

        Self {
            strict_functions,
            strict_math,
            default_delimiter,
        }
    }
}

impl Config {
    /// When TRUE, invoking an unregistered function raises a
    /// [Resolution][crate::MyError::Resolution] error instead of quietly
    /// yielding NULL.
    pub fn strict_functions(&self) -> bool {
        self.strict_functions
    }

    /// When TRUE, division by zero raises a
    /// [Runtime][crate::MyError::Runtime] error instead of yielding NULL.
    pub fn strict_math(&self) -> bool {
        self.strict_math
    }

    /// Return the configured default field delimiter to use w/ delimited-text
    /// sources when the path's extension does not imply one.
    pub fn default_delimiter(&self) -> u8 {
        self.default_delimiter
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    #[test]
    #[traced_test]
    fn test_defaults() {
        let cfg = config();
        assert!(!cfg.strict_functions());
        assert!(!cfg.strict_math());
        assert_eq!(cfg.default_delimiter(), b',');
    }

    #[test]
    fn test_truthy() {
        assert!(truthy("1"));
        assert!(truthy(" Yes "));
        assert!(truthy("TRUE"));
        assert!(!truthy("0"));
        assert!(!truthy("nope"));
    }
}
