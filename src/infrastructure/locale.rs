//! Locale providers.

use crate::application::ports::LocaleProvider;
use std::env;

/// Locale used when the environment does not name one.
pub const DEFAULT_LOCALE: &str = "en_US";

const LOCALE_VARS: [&str; 3] = ["LC_ALL", "LC_MESSAGES", "LANG"];

/// Reads the device locale from the process environment.
///
/// Checks `LC_ALL`, `LC_MESSAGES` and `LANG` in that order. Encoding and
/// modifier suffixes are stripped, so `de_DE.UTF-8@euro` becomes `de_DE`.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvLocale;

impl EnvLocale {
    pub fn new() -> Self {
        Self
    }
}

impl LocaleProvider for EnvLocale {
    fn locale(&self) -> String {
        LOCALE_VARS
            .iter()
            .filter_map(|var| env::var(var).ok())
            .find_map(|value| normalize(&value))
            .unwrap_or_else(|| DEFAULT_LOCALE.to_string())
    }
}

/// Always returns the configured locale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedLocale(String);

impl FixedLocale {
    pub fn new(locale: impl Into<String>) -> Self {
        Self(locale.into())
    }
}

impl LocaleProvider for FixedLocale {
    fn locale(&self) -> String {
        self.0.clone()
    }
}

/// Strip encoding and modifier suffixes from a POSIX locale name.
///
/// Returns `None` for empty values and the `C`/`POSIX` pseudo-locales.
fn normalize(value: &str) -> Option<String> {
    let base = value
        .split(['.', '@'])
        .next()
        .unwrap_or_default()
        .trim();
    match base {
        "" | "C" | "POSIX" => None,
        locale => Some(locale.to_string()),
    }
}
