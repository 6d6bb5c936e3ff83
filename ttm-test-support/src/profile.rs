//! Environment-driven property-test tuning.
//!
//! Suites read their case count through [`ProptestRunProfile`] so CI can
//! raise it without touching code.

use std::env;

/// Environment variable overriding the number of property-test cases.
pub const PROPTEST_CASES_ENV_KEY: &str = "TTM_PROPTEST_CASES";

/// Case count for a property suite.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProptestRunProfile {
    cases: u32,
}

impl ProptestRunProfile {
    /// Read the override, falling back to `default_cases`.
    ///
    /// Invalid overrides are logged and ignored.
    ///
    /// # Examples
    /// ```
    /// use ttm_test_support::profile::ProptestRunProfile;
    ///
    /// assert!(ProptestRunProfile::load(32).cases() > 0);
    /// ```
    #[must_use]
    pub fn load(default_cases: u32) -> Self {
        let cases = match env::var(PROPTEST_CASES_ENV_KEY) {
            Ok(raw) => parse_cases(&raw).unwrap_or_else(|reason| {
                tracing::warn!(
                    env = PROPTEST_CASES_ENV_KEY,
                    raw = %raw,
                    reason = %reason,
                    "invalid property-test case override; using default",
                );
                default_cases
            }),
            Err(_) => default_cases,
        };
        Self { cases }
    }

    /// Number of cases per property.
    #[must_use]
    pub const fn cases(self) -> u32 {
        self.cases
    }
}

fn parse_cases(raw: &str) -> Result<u32, String> {
    match raw.trim().parse::<u32>() {
        Ok(0) => Err("cases must be > 0".to_owned()),
        Ok(cases) => Ok(cases),
        Err(error) => Err(format!("parse error: {error}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;

    #[rstest]
    #[case("1", Ok(1))]
    #[case(" 250 ", Ok(250))]
    #[case("0", Err(()))]
    #[case("-3", Err(()))]
    #[case("many", Err(()))]
    fn parses_case_overrides(#[case] raw: &str, #[case] expected: Result<u32, ()>) {
        assert_eq!(parse_cases(raw).map_err(|_| ()), expected);
    }
}
