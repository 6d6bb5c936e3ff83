//! Unit tests for the reducers and the `redim` stage.

use std::io::Cursor;

use rstest::rstest;
use ttm_core::{DependencyError, Matrix, TtmError};
use ttm_test_support::fixtures::vector_cell;

use super::*;

type TestResult = core::result::Result<(), Box<dyn std::error::Error>>;

fn words(line: &str) -> Vec<String> {
    line.split_whitespace().map(str::to_owned).collect()
}

fn matrix(rows: &[&[f64]]) -> Matrix {
    Matrix::from_rows("test", rows.iter().map(|row| row.to_vec()).collect()).expect("equal rows")
}

fn embedded(rows: &[&[f64]]) -> TableSource {
    let mut text = String::from("id\thighdim\n");
    for (index, row) in rows.iter().enumerate() {
        text.push_str(&format!("d:{index}\t{}\n", vector_cell(row)));
    }
    TableSource::from_reader("embedded", Box::new(Cursor::new(text.into_bytes())))
}

#[test]
fn identity_copies_vectors() -> TestResult {
    let vectors = matrix(&[&[1.0, 2.0], &[3.0, 4.0]]);
    assert_eq!(Identity.reduce(&vectors)?, vectors);
    Ok(())
}

#[test]
fn svd_recovers_a_rank_one_structure() -> TestResult {
    let vectors = matrix(&[&[1.0, 2.0, 0.0], &[2.0, 4.0, 0.0], &[-1.0, -2.0, 0.0]]);
    let reduced = TruncatedSvd::new(1).reduce(&vectors)?;
    assert_eq!((reduced.rows(), reduced.cols()), (3, 1));
    let norm = 5.0_f64.sqrt();
    let expected = [norm, 2.0 * norm, -norm];
    for (row, want) in expected.iter().enumerate() {
        assert!(
            (reduced.row(row)[0] - want).abs() < 1e-8,
            "row {row}: {} != {want}",
            reduced.row(row)[0]
        );
    }
    Ok(())
}

#[test]
fn svd_is_deterministic() -> TestResult {
    let vectors = matrix(&[&[1.0, 0.5, 0.0, 2.0], &[0.0, 1.0, 3.0, 0.0], &[2.0, 0.0, 1.0, 1.0]]);
    let svd = TruncatedSvd::new(2);
    assert_eq!(svd.reduce(&vectors)?, svd.reduce(&vectors)?);
    Ok(())
}

#[test]
fn svd_rejects_more_components_than_dimensions() {
    let vectors = matrix(&[&[1.0, 2.0]]);
    let err = TruncatedSvd::new(3).reduce(&vectors).expect_err("too many components");
    assert!(matches!(err, TtmError::Algorithm { .. }));
}

#[test]
fn lda_rows_are_topic_distributions() -> TestResult {
    let counts = matrix(&[&[3.0, 0.0, 1.0], &[0.0, 4.0, 0.0], &[0.0, 0.0, 0.0]]);
    let theta = LatentDirichlet::new(2, 5, 7).reduce(&counts)?;
    assert_eq!((theta.rows(), theta.cols()), (3, 2));
    for row in theta.iter_rows() {
        assert!((row.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!(row.iter().all(|&p| p > 0.0));
    }
    // An empty document keeps the uniform prior.
    assert_eq!(theta.row(2), &[0.5, 0.5]);
    Ok(())
}

#[test]
fn lda_is_reproducible_for_a_seed() -> TestResult {
    let counts = matrix(&[&[3.0, 0.0, 1.0], &[0.0, 4.0, 2.0]]);
    let lda = LatentDirichlet::new(3, 4, 11);
    assert_eq!(lda.reduce(&counts)?, lda.reduce(&counts)?);
    Ok(())
}

#[test]
fn lda_rejects_negative_counts() {
    let err = LatentDirichlet::new(2, 1, 0)
        .reduce(&matrix(&[&[1.0, -0.5]]))
        .expect_err("negative count");
    assert!(matches!(err, TtmError::Algorithm { .. }));
}

#[rstest]
#[case("id", 2)]
#[case("svd --components 1", 1)]
#[case("lda --components 3 --max-epochs 2", 3)]
fn stage_appends_reduced_vectors(#[case] line: &str, #[case] dimensions: usize) -> TestResult {
    let stage = RedimStage::from_words("highdim", "lowdim", &words(line))?;
    let mut source = embedded(&[&[1.0, 2.0], &[0.0, 3.0], &[4.0, 0.0]]);
    let cells = stage.derive(&mut source)?;
    assert_eq!(cells.len(), 3);
    for cell in cells {
        let vector = ttm_core::vector::decode_vector(&cell)?;
        assert_eq!(vector.len(), dimensions);
    }
    Ok(())
}

#[rstest]
#[case("umap", "DEPENDENCY_UNAVAILABLE")]
#[case("pca", "DEPENDENCY_UNKNOWN_METHOD")]
fn unsupported_methods_are_dependency_errors(#[case] line: &str, #[case] code: &str) {
    match RedimStage::from_words("highdim", "lowdim", &words(line)) {
        Err(TtmError::Dependency(err)) => assert_eq!(err.code().as_str(), code),
        other => panic!("expected a dependency error, got {other:?}"),
    }
}

#[rstest]
#[case("svd --components 0")]
#[case("svd id")]
#[case("lda --topics 3")]
fn bad_method_lines_are_config_errors(#[case] line: &str) {
    assert!(matches!(
        RedimStage::from_words("highdim", "lowdim", &words(line)),
        Err(TtmError::Config { .. })
    ));
}

#[test]
fn unavailable_methods_name_their_backend() {
    let Err(TtmError::Dependency(DependencyError::Unavailable { dependency, .. })) =
        reducer_registry().resolve("umap", &[])
    else {
        panic!("umap must be reported as unavailable");
    };
    assert_eq!(dependency, "umap-learn");
}
