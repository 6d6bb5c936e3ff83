//! Distance metrics over dense vectors.

use clap::ValueEnum;

/// Metric accepted by clustering and evaluation methods.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, ValueEnum)]
pub enum Metric {
    /// Straight-line distance.
    #[default]
    #[value(alias = "l2")]
    Euclidean,
    /// Sum of absolute component differences.
    #[value(alias = "l1", alias = "cityblock")]
    Manhattan,
    /// One minus the cosine similarity.
    Cosine,
}

impl Metric {
    /// Distance between `left` and `right`, which must have equal length.
    ///
    /// Cosine distance treats a zero vector as orthogonal to every non-zero
    /// vector.
    ///
    /// # Examples
    /// ```
    /// use ttm_providers_dense::Metric;
    ///
    /// assert_eq!(Metric::Euclidean.distance(&[0.0, 0.0], &[3.0, 4.0]), 5.0);
    /// assert_eq!(Metric::Manhattan.distance(&[0.0, 0.0], &[3.0, 4.0]), 7.0);
    /// ```
    #[must_use]
    pub fn distance(self, left: &[f64], right: &[f64]) -> f64 {
        match self {
            Self::Euclidean => squared_euclidean(left, right).sqrt(),
            Self::Manhattan => left
                .iter()
                .zip(right)
                .map(|(a, b)| (a - b).abs())
                .sum(),
            Self::Cosine => cosine(left, right),
        }
    }

    /// Name as accepted on the command line.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Euclidean => "euclidean",
            Self::Manhattan => "manhattan",
            Self::Cosine => "cosine",
        }
    }
}

/// Squared Euclidean distance.
#[must_use]
pub fn squared_euclidean(left: &[f64], right: &[f64]) -> f64 {
    left.iter()
        .zip(right)
        .map(|(a, b)| (a - b) * (a - b))
        .sum()
}

fn cosine(left: &[f64], right: &[f64]) -> f64 {
    let (mut dot, mut left_norm, mut right_norm) = (0.0, 0.0, 0.0);
    for (a, b) in left.iter().zip(right) {
        dot += a * b;
        left_norm += a * a;
        right_norm += b * b;
    }
    match (left_norm > 0.0, right_norm > 0.0) {
        (true, true) => (1.0 - dot / (left_norm.sqrt() * right_norm.sqrt())).max(0.0),
        (false, false) => 0.0,
        _ => 1.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;

    #[rstest]
    #[case("euclidean", Metric::Euclidean)]
    #[case("l2", Metric::Euclidean)]
    #[case("l1", Metric::Manhattan)]
    #[case("manhattan", Metric::Manhattan)]
    #[case("cosine", Metric::Cosine)]
    fn parses_names_and_aliases(#[case] name: &str, #[case] expected: Metric) {
        assert_eq!(Metric::from_str(name, false), Ok(expected));
    }

    #[rstest]
    #[case(&[1.0, 0.0], &[0.0, 1.0], 1.0)]
    #[case(&[1.0, 1.0], &[2.0, 2.0], 0.0)]
    #[case(&[1.0, 0.0], &[-1.0, 0.0], 2.0)]
    #[case(&[0.0, 0.0], &[1.0, 0.0], 1.0)]
    #[case(&[0.0, 0.0], &[0.0, 0.0], 0.0)]
    fn cosine_distance(#[case] left: &[f64], #[case] right: &[f64], #[case] expected: f64) {
        assert!((Metric::Cosine.distance(left, right) - expected).abs() < 1e-12);
    }
}
