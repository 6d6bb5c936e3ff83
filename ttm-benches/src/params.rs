//! Benchmark parameter types.

use std::fmt;

/// Shape of a synthetic clustering.
#[derive(Clone, Copy, Debug)]
pub struct BlobBenchParams {
    /// Number of rows.
    pub rows: usize,
    /// Vector dimensionality.
    pub dimensions: usize,
}

impl fmt::Display for BlobBenchParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n={},d={}", self.rows, self.dimensions)
    }
}

/// A clustering method and its command-line options.
#[derive(Clone, Copy, Debug)]
pub struct MethodBenchParams {
    /// Method name as typed on the command line.
    pub method: &'static str,
    /// Options following the method name.
    pub args: &'static [&'static str],
    /// Number of rows.
    pub rows: usize,
}

impl MethodBenchParams {
    /// Owned copies of [`Self::args`], as the method registry expects them.
    #[must_use]
    pub fn owned_args(&self) -> Vec<String> {
        self.args.iter().map(|arg| (*arg).to_owned()).collect()
    }
}

impl fmt::Display for MethodBenchParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},n={}", self.method, self.rows)
    }
}
