//! Unit tests for cluster descriptions.

use std::io::Cursor;

use rstest::{fixture, rstest};
use ttm_core::{SchemaError, TtmError};
use ttm_test_support::fixtures::tsv;

use super::*;

type TestResult = core::result::Result<(), Box<dyn std::error::Error>>;

#[fixture]
fn clustered() -> TableSource {
    let text = tsv(
        &["text", "cluster"],
        &[
            ("d:0", &["apple apple", "0"]),
            ("d:1", &["cherry banana", "1"]),
            ("d:2", &["banana", "0"]),
        ],
    );
    TableSource::from_reader("clustered", Box::new(Cursor::new(text.into_bytes())))
}

fn stage(line: &str) -> Result<DescStage> {
    let words: Vec<String> = line.split_whitespace().map(str::to_owned).collect();
    DescStage::from_words(DescColumns::default(), &words)
}

#[rstest]
#[case("tfidf", &["apple, banana", "cherry, banana", "apple, banana"])]
#[case("tfidf --limit 1", &["apple", "cherry", "apple"])]
fn copies_cluster_descriptions_to_rows(
    mut clustered: TableSource,
    #[case] line: &str,
    #[case] expected: &[&str],
) -> TestResult {
    let values = stage(line)?.derive(&mut clustered)?;
    assert_eq!(values, expected);
    Ok(())
}

#[rstest]
fn per_row_clusters_penalise_shared_terms(mut clustered: TableSource) -> TestResult {
    let columns = DescColumns {
        cluster: "id".to_owned(),
        ..DescColumns::default()
    };
    // Every row is its own cluster, so `banana` is shared and ranks lower.
    let desc = DescStage::from_words(columns, &["tfidf".to_owned()])?;
    let values = desc.derive(&mut clustered)?;
    assert_eq!(values, vec!["apple", "cherry, banana", "banana"]);
    Ok(())
}

#[rstest]
fn missing_cluster_column_is_a_schema_error(mut clustered: TableSource) -> TestResult {
    let columns = DescColumns {
        cluster: "topic".to_owned(),
        ..DescColumns::default()
    };
    let err = DescStage::from_words(columns, &["tfidf".to_owned()])?
        .derive(&mut clustered)
        .expect_err("column is absent");
    assert!(matches!(err, TtmError::Schema(SchemaError::MissingColumn { .. })));
    Ok(())
}

#[rstest]
#[case("tfidf tfidf")]
#[case("tfidf --limit many")]
fn rejects_bad_method_lines(#[case] line: &str) {
    assert!(matches!(stage(line), Err(TtmError::Config { .. })));
}
