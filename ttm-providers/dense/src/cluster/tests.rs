//! Unit tests for the clusterers and the `cluster` stage.

use std::io::Cursor;

use rstest::rstest;
use ttm_core::{DependencyError, Matrix, TtmError};
use ttm_test_support::fixtures::vector_cell;

use super::*;
use crate::distance::Metric;

type TestResult = core::result::Result<(), Box<dyn std::error::Error>>;

fn words(line: &str) -> Vec<String> {
    line.split_whitespace().map(str::to_owned).collect()
}

fn matrix(rows: &[&[f64]]) -> Matrix {
    Matrix::from_rows("test", rows.iter().map(|row| row.to_vec()).collect()).expect("equal rows")
}

/// Two tight groups in the plane, three rows each.
fn two_groups() -> Matrix {
    matrix(&[
        &[0.0, 0.0],
        &[0.1, 0.0],
        &[0.0, 0.1],
        &[5.0, 5.0],
        &[5.1, 5.0],
        &[5.0, 5.1],
    ])
}

fn assert_two_groups(labels: &[i64]) {
    assert_eq!(labels.len(), 6);
    assert!(labels[..3].iter().all(|&label| label == labels[0]), "{labels:?}");
    assert!(labels[3..].iter().all(|&label| label == labels[3]), "{labels:?}");
    assert_ne!(labels[0], labels[3]);
}

fn labelled(rows: &[(&str, &[f64])]) -> TableSource {
    let mut text = String::from("id\tcluster\tlowdim\n");
    for (index, (cluster, vector)) in rows.iter().enumerate() {
        text.push_str(&format!("d:{index}\t{cluster}\t{}\n", vector_cell(vector)));
    }
    TableSource::from_reader("labelled", Box::new(Cursor::new(text.into_bytes())))
}

#[test]
fn argmax_picks_the_first_largest_component() -> TestResult {
    let labels = Argmax.cluster(&matrix(&[&[0.1, 0.7, 0.2], &[0.5, 0.5, 0.0], &[0.0, 0.0, 1.0]]))?;
    assert_eq!(labels, vec![1, 0, 2]);
    Ok(())
}

#[rstest]
#[case(Init::KMeansPlusPlus)]
#[case(Init::Random)]
fn kmeans_separates_two_groups(#[case] init: Init) -> TestResult {
    let labels = KMeans::new(2, init, 100, 3).cluster(&two_groups())?;
    assert_two_groups(&labels);
    Ok(())
}

#[test]
fn kmeans_rejects_more_clusters_than_rows() {
    let err = KMeans::new(4, Init::KMeansPlusPlus, 10, 0)
        .cluster(&matrix(&[&[0.0], &[1.0]]))
        .expect_err("too few rows");
    assert!(matches!(err, TtmError::Algorithm { .. }));
}

#[rstest]
#[case(Metric::Euclidean, Linkage::Ward)]
#[case(Metric::Euclidean, Linkage::Single)]
#[case(Metric::Manhattan, Linkage::Complete)]
#[case(Metric::Euclidean, Linkage::Average)]
fn agglomerative_separates_two_groups(#[case] affinity: Metric, #[case] linkage: Linkage) -> TestResult {
    let labels = Agglomerative::new(2, affinity, linkage)?.cluster(&two_groups())?;
    assert_eq!(labels, vec![0, 0, 0, 1, 1, 1]);
    Ok(())
}

#[test]
fn agglomerative_cut_matches_cluster_count() -> TestResult {
    let points = matrix(&[&[0.0], &[1.0], &[10.0], &[11.0], &[30.0]]);
    let labels = Agglomerative::new(3, Metric::Euclidean, Linkage::Single)?.cluster(&points)?;
    assert_eq!(labels, vec![0, 0, 1, 1, 2]);
    let labels = Agglomerative::new(5, Metric::Euclidean, Linkage::Average)?.cluster(&points)?;
    assert_eq!(labels, vec![0, 1, 2, 3, 4]);
    Ok(())
}

#[test]
fn ward_requires_euclidean_affinity() {
    let err = Agglomerative::new(2, Metric::Cosine, Linkage::Ward).expect_err("ward needs l2");
    assert!(matches!(err, TtmError::Config { .. }));
}

#[test]
fn random_labels_follow_the_weights() -> TestResult {
    let rows = Matrix::zeros(200, 1);
    let labels = RandomLabels::new(vec![1.0, 0.0, 3.0], 9)?.cluster(&rows)?;
    assert!(labels.iter().all(|&label| label == 0 || label == 2));
    let heavy = labels.iter().filter(|&&label| label == 2).count();
    assert!(heavy > 100, "{heavy} of 200 draws hit the heavy cluster");
    assert_eq!(labels, RandomLabels::new(vec![1.0, 0.0, 3.0], 9)?.cluster(&rows)?);
    Ok(())
}

#[rstest]
#[case("random --clusters 3 --weights 1,2")]
#[case("random --weights 0,0")]
#[case("kmeans --clusters 0")]
#[case("kmeans --init forgy")]
#[case("aggl --affinity cosine")]
#[case("argmax --clusters 3")]
fn rejects_bad_method_lines(#[case] line: &str) {
    assert!(matches!(
        ClusterStage::from_words("lowdim", "cluster", &words(line)),
        Err(TtmError::Config { .. })
    ));
}

#[test]
fn kmeans_accepts_random_initialisation() -> TestResult {
    let stage = ClusterStage::from_words(
        "lowdim",
        "cluster",
        &words("kmeans --clusters 2 --init random --seed 3"),
    )?;
    assert_eq!(stage.method(), "kmeans --clusters 2 --init random --seed 3");
    let groups = two_groups();
    let rows: Vec<(&str, &[f64])> = groups.iter_rows().map(|row| ("0", row)).collect();
    let labels = stage
        .derive(&mut labelled(&rows))?
        .iter()
        .map(|label| label.parse())
        .collect::<core::result::Result<Vec<i64>, _>>()?;
    assert_two_groups(&labels);
    Ok(())
}

#[test]
fn a_second_method_is_a_stray_argument() {
    assert!(matches!(
        ClusterStage::from_words("lowdim", "cluster", &words("kmeans aggl")),
        Err(TtmError::Config { ref method, .. }) if method == "kmeans"
    ));
}

#[test]
fn random_infers_cluster_count_from_weights() -> TestResult {
    let stage = ClusterStage::from_words("lowdim", "cluster", &words("random --weights 1,1,1,1"))?;
    let origin: &[f64] = &[0.0];
    let rows = vec![("0", origin); 50];
    let labels = stage.derive(&mut labelled(&rows))?;
    assert!(labels.iter().all(|label| ["0", "1", "2", "3"].contains(&label.as_str())));
    Ok(())
}

#[test]
fn unknown_methods_are_dependency_errors() {
    assert!(matches!(
        ClusterStage::from_words("lowdim", "cluster", &words("dbscan")),
        Err(TtmError::Dependency(DependencyError::UnknownMethod { .. }))
    ));
}

#[test]
fn stage_writes_integer_labels() -> TestResult {
    let stage = ClusterStage::from_words("lowdim", "topic", &words("argmax"))?;
    let mut source = labelled(&[("0", &[0.9, 0.1]), ("0", &[0.2, 0.8])]);
    assert_eq!(stage.derive(&mut source)?, vec!["0", "1"]);
    Ok(())
}

#[test]
fn split_relabels_only_the_target_cluster() -> TestResult {
    let stage = ClusterStage::from_words("lowdim", "subcluster", &words("argmax"))?
        .split(SplitTarget::new("3"));
    let mut source = labelled(&[
        ("3", &[0.9, 0.1]),
        ("1", &[0.9, 0.1]),
        ("3", &[0.2, 0.8]),
        ("-1", &[0.5, 0.5]),
    ]);
    assert_eq!(stage.derive(&mut source)?, vec!["3.0", "1", "3.1", "-1"]);
    Ok(())
}

#[test]
fn splitting_a_missing_cluster_fails() -> TestResult {
    let stage = ClusterStage::from_words("lowdim", "subcluster", &words("argmax"))?
        .split(SplitTarget::new("7"));
    let err = stage
        .derive(&mut labelled(&[("3", &[1.0])]))
        .expect_err("cluster 7 does not exist");
    assert!(matches!(err, TtmError::Algorithm { ref message, .. } if message.contains("does not exist")));
    Ok(())
}

#[test]
fn split_column_can_be_overridden() -> TestResult {
    let stage = ClusterStage::from_words("lowdim", "subcluster", &words("argmax"))?
        .split(SplitTarget::new("x").in_column("topic"));
    let err = stage
        .derive(&mut labelled(&[("x", &[1.0])]))
        .expect_err("topic column is absent");
    assert!(matches!(err, TtmError::Schema(ttm_core::SchemaError::MissingColumn { .. })));
    Ok(())
}
